//! Authentication effects: sign-in (password or social provider),
//! registration, token revalidation and token revocation.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use vielra_core::modules::auth::{AuthAction, AuthSession, User};
use vielra_core::root::AppAction;

use crate::api::{endpoints, ApiClient, ApiRequest, SharedApiClient};
use crate::effect::{Effect, EffectContext, FlightPolicy};
use crate::effects::session_token;
use crate::error::{EffectFailure, TransportError};
use crate::token::TokenStore;

/// Upper bound on a startup token check.
pub const REVALIDATE_DEADLINE: Duration = Duration::from_secs(10);

/// Login and register response body. Extra fields (`success`, `token_type`)
/// are ignored.
#[derive(Debug, Deserialize)]
struct SessionResponse {
    token: String,
    user: User,
}

async fn open_session<T: Serialize + Sync>(
    api: &dyn ApiClient,
    path: &str,
    body: &T,
) -> Result<AuthSession, EffectFailure> {
    let request = ApiRequest::post(path).json(body)?;
    let response: SessionResponse = api.send(request).await?.into_result()?.json()?;
    Ok(AuthSession {
        token: response.token,
        user: response.user,
    })
}

// =============================================================================
// Login
// =============================================================================

pub struct LoginEffect {
    api: SharedApiClient,
    tokens: TokenStore,
}

impl LoginEffect {
    pub fn new(api: SharedApiClient, tokens: TokenStore) -> Self {
        LoginEffect { api, tokens }
    }
}

#[async_trait]
impl Effect<AppAction> for LoginEffect {
    fn key(&self) -> &'static str {
        "auth/login"
    }

    fn triggers(&self, action: &AppAction) -> bool {
        matches!(action, AppAction::Auth(AuthAction::LoginRequested(_)))
    }

    fn policy(&self) -> FlightPolicy {
        FlightPolicy::Restart
    }

    async fn run(&self, trigger: AppAction, _ctx: EffectContext<AppAction>) -> Result<Vec<AppAction>, EffectFailure> {
        let AppAction::Auth(AuthAction::LoginRequested(request)) = trigger else {
            return Ok(Vec::new());
        };

        let session = open_session(self.api.as_ref(), endpoints::LOGIN, &request).await?;
        self.tokens.save(&session.token).await;
        info!(username = %session.user.username, "Signed in");

        Ok(vec![AuthAction::LoginSucceeded(session).into()])
    }

    fn on_failure(&self, _trigger: &AppAction, failure: EffectFailure) -> AppAction {
        AuthAction::LoginFailed(failure.to_request_error()).into()
    }
}

// =============================================================================
// Register
// =============================================================================

pub struct RegisterEffect {
    api: SharedApiClient,
    tokens: TokenStore,
}

impl RegisterEffect {
    pub fn new(api: SharedApiClient, tokens: TokenStore) -> Self {
        RegisterEffect { api, tokens }
    }
}

#[async_trait]
impl Effect<AppAction> for RegisterEffect {
    fn key(&self) -> &'static str {
        "auth/register"
    }

    fn triggers(&self, action: &AppAction) -> bool {
        matches!(action, AppAction::Auth(AuthAction::RegisterRequested(_)))
    }

    fn policy(&self) -> FlightPolicy {
        FlightPolicy::Restart
    }

    async fn run(&self, trigger: AppAction, _ctx: EffectContext<AppAction>) -> Result<Vec<AppAction>, EffectFailure> {
        let AppAction::Auth(AuthAction::RegisterRequested(request)) = trigger else {
            return Ok(Vec::new());
        };

        let session = open_session(self.api.as_ref(), endpoints::REGISTER, &request).await?;
        self.tokens.save(&session.token).await;
        info!(username = %session.user.username, "Account registered");

        Ok(vec![AuthAction::RegisterSucceeded(session).into()])
    }

    fn on_failure(&self, _trigger: &AppAction, failure: EffectFailure) -> AppAction {
        AuthAction::RegisterFailed(failure.to_request_error()).into()
    }
}

// =============================================================================
// Social Login
// =============================================================================

#[derive(Serialize)]
struct SocialLoginBody<'a> {
    access_token: &'a str,
}

/// Exchanges a provider credential for a session. Success and failure share
/// the password login actions.
pub struct SocialLoginEffect {
    api: SharedApiClient,
    tokens: TokenStore,
}

impl SocialLoginEffect {
    pub fn new(api: SharedApiClient, tokens: TokenStore) -> Self {
        SocialLoginEffect { api, tokens }
    }
}

#[async_trait]
impl Effect<AppAction> for SocialLoginEffect {
    fn key(&self) -> &'static str {
        "auth/socialLogin"
    }

    fn triggers(&self, action: &AppAction) -> bool {
        matches!(action, AppAction::Auth(AuthAction::SocialLoginRequested(_)))
    }

    fn policy(&self) -> FlightPolicy {
        FlightPolicy::Restart
    }

    async fn run(&self, trigger: AppAction, _ctx: EffectContext<AppAction>) -> Result<Vec<AppAction>, EffectFailure> {
        let AppAction::Auth(AuthAction::SocialLoginRequested(request)) = trigger else {
            return Ok(Vec::new());
        };

        let path = endpoints::social_login(request.provider.as_str());
        let body = SocialLoginBody {
            access_token: &request.access_token,
        };
        let session = open_session(self.api.as_ref(), &path, &body).await?;
        self.tokens.save(&session.token).await;
        info!(username = %session.user.username, provider = %request.provider, "Signed in");

        Ok(vec![AuthAction::LoginSucceeded(session).into()])
    }

    fn on_failure(&self, _trigger: &AppAction, failure: EffectFailure) -> AppAction {
        AuthAction::LoginFailed(failure.to_request_error()).into()
    }
}

// =============================================================================
// Revalidate Token
// =============================================================================

/// Confirms the stored token with the server and refreshes the user.
///
/// A 401 signs the user out; any other failure keeps the persisted session.
pub struct RevalidateTokenEffect {
    api: SharedApiClient,
    tokens: TokenStore,
}

impl RevalidateTokenEffect {
    pub fn new(api: SharedApiClient, tokens: TokenStore) -> Self {
        RevalidateTokenEffect { api, tokens }
    }
}

#[async_trait]
impl Effect<AppAction> for RevalidateTokenEffect {
    fn key(&self) -> &'static str {
        "auth/revalidateToken"
    }

    fn triggers(&self, action: &AppAction) -> bool {
        matches!(action, AppAction::Auth(AuthAction::RevalidateToken))
    }

    fn deadline(&self) -> Option<Duration> {
        Some(REVALIDATE_DEADLINE)
    }

    async fn run(&self, _trigger: AppAction, ctx: EffectContext<AppAction>) -> Result<Vec<AppAction>, EffectFailure> {
        let token = match session_token(&ctx) {
            Some(token) => Some(token),
            None => self.tokens.load().await,
        };
        let Some(token) = token else {
            debug!("No access token - nothing to revalidate");
            return Ok(vec![AuthAction::TokenRejected.into()]);
        };

        let request = ApiRequest::get(endpoints::AUTHENTICATED_USER).bearer(Some(token));
        match self.api.send(request).await?.into_result() {
            Ok(response) => {
                let user: User = response.json()?;
                debug!(username = %user.username, "Access token still valid");
                Ok(vec![AuthAction::TokenRevalidated(user).into()])
            }
            Err(TransportError::Unauthorized) => {
                warn!("Access token rejected - signing out");
                self.tokens.clear().await;
                Ok(vec![AuthAction::TokenRejected.into()])
            }
            Err(e) => Err(e.into()),
        }
    }

    fn on_failure(&self, _trigger: &AppAction, failure: EffectFailure) -> AppAction {
        AuthAction::TokenRevalidationFailed(failure.to_request_error()).into()
    }
}

// =============================================================================
// Revoke Token
// =============================================================================

/// Signs out: revokes the token server-side and forgets it locally.
pub struct RevokeTokenEffect {
    api: SharedApiClient,
    tokens: TokenStore,
}

impl RevokeTokenEffect {
    pub fn new(api: SharedApiClient, tokens: TokenStore) -> Self {
        RevokeTokenEffect { api, tokens }
    }
}

#[async_trait]
impl Effect<AppAction> for RevokeTokenEffect {
    fn key(&self) -> &'static str {
        "auth/revokeToken"
    }

    fn triggers(&self, action: &AppAction) -> bool {
        matches!(action, AppAction::Auth(AuthAction::RevokeTokenRequested))
    }

    async fn run(&self, _trigger: AppAction, ctx: EffectContext<AppAction>) -> Result<Vec<AppAction>, EffectFailure> {
        let token = match session_token(&ctx) {
            Some(token) => Some(token),
            None => self.tokens.load().await,
        };

        if let Some(token) = token {
            let request = ApiRequest::post(endpoints::REVOKE_TOKEN).bearer(Some(token));
            match self.api.send(request).await?.into_result() {
                // Already invalid server-side.
                Ok(_) | Err(TransportError::Unauthorized) => {}
                Err(e) => return Err(e.into()),
            }
        }

        self.tokens.clear().await;
        info!("Signed out");
        Ok(vec![AuthAction::RevokeTokenSucceeded.into()])
    }

    fn on_failure(&self, _trigger: &AppAction, failure: EffectFailure) -> AppAction {
        AuthAction::RevokeTokenFailed(failure.to_request_error()).into()
    }
}
