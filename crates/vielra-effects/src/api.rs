//! # API Transport
//!
//! The network collaborator used by effects. Vielra does not ship an HTTP
//! stack; the host provides an [`ApiClient`] and effects speak to it in
//! terms of [`ApiRequest`] / [`ApiResponse`]. Request paths are relative;
//! a client resolves them against its base URL with [`ApiRequest::url`].
//!
//! ## Status Mapping
//! ```text
//! 2xx ──► Ok(response)
//! 401 ──► TransportError::Unauthorized
//! 422 ──► TransportError::Unprocessable { message, errors{field: [..]} }
//! xxx ──► TransportError::Status { status, message }
//! ```

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{ServerValidationError, TransportError};

/// Request paths of the backend API.
pub mod endpoints {
    pub const LOGIN: &str = "/auth/login";
    pub const REGISTER: &str = "/auth/register";
    pub const REVOKE_TOKEN: &str = "/auth/revoke-token";
    pub const AUTHENTICATED_USER: &str = "/auth/user";
    pub const PHRASE_CATEGORIES: &str = "/phrasebook/category";
    pub const PHRASES: &str = "/phrasebook/phrase";
    pub const DELETE_PHRASES: &str = "/phrasebook/phrase/delete";

    /// Social login path for one provider.
    pub fn social_login(provider: &str) -> String {
        format!("{LOGIN}/{provider}")
    }
}

// =============================================================================
// Request / Response
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base URL.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub bearer: Option<String>,
}

impl fmt::Debug for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("has_body", &self.body.is_some())
            .field("bearer", &self.bearer.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        ApiRequest {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            bearer: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    /// Attaches a JSON body.
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self, TransportError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn bearer(mut self, token: Option<String>) -> Self {
        self.bearer = token;
        self
    }

    /// Appends a query parameter.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Absolute URL of this request under `base_url`.
    pub fn url(&self, base_url: &str) -> String {
        let mut url = format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            self.path.trim_start_matches('/')
        );
        for (i, (name, value)) in self.query.iter().enumerate() {
            url.push(if i == 0 { '?' } else { '&' });
            url.push_str(&encode_component(name));
            url.push('=');
            url.push_str(&encode_component(value));
        }
        url
    }
}

fn encode_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(byte as char),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        ApiResponse { status, body }
    }

    pub fn ok(body: Value) -> Self {
        Self::new(200, body)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Converts non-success statuses into a [`TransportError`].
    pub fn into_result(self) -> Result<Self, TransportError> {
        if self.is_success() {
            return Ok(self);
        }
        Err(match self.status {
            401 => TransportError::Unauthorized,
            422 => {
                let mut validation: ServerValidationError =
                    serde_json::from_value(self.body).unwrap_or_default();
                if validation.message.is_empty() {
                    validation.message = "The given data was invalid.".to_string();
                }
                TransportError::Unprocessable(validation)
            }
            status => TransportError::Status {
                status,
                message: self
                    .body
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("Request failed")
                    .to_string(),
            },
        })
    }

    /// Deserializes the body.
    pub fn json<T: DeserializeOwned>(self) -> Result<T, TransportError> {
        Ok(serde_json::from_value(self.body)?)
    }
}

// =============================================================================
// Client
// =============================================================================

/// Network transport implemented by the host.
#[async_trait]
pub trait ApiClient: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;
}

pub type SharedApiClient = Arc<dyn ApiClient>;

/// Client for runs without a network: every request fails as a network error.
#[derive(Debug, Clone)]
pub struct OfflineApiClient {
    base_url: String,
}

impl OfflineApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        OfflineApiClient {
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ApiClient for OfflineApiClient {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = request.url(&self.base_url);
        tracing::debug!(method = %request.method, url = %url, "Offline - request not sent");
        Err(TransportError::Network(format!("offline: {} {url}", request.method)))
    }
}

// =============================================================================
// Test Support
// =============================================================================
