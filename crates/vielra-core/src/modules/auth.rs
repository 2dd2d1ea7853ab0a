//! # Auth Slice
//!
//! Session state and the status of every auth request.
//!
//! ## Request Flow
//! ```text
//! LoginRequested / SocialLoginRequested ──► login.loading = true
//!      │                    (LoginEffect / SocialLoginEffect runs)
//!      ├── LoginSucceeded(session) ──► token, user, is_authenticated
//!      └── LoginFailed(error)      ──► login.error (field errors kept)
//!
//! RevalidateToken ──► revalidating = true
//!      ├── TokenRevalidated(user)        ──► user refreshed
//!      ├── TokenRejected                 ──► signed out
//!      └── TokenRevalidationFailed(err)  ──► session kept
//! ```
//!
//! The access token itself lives in the token store, so it is excluded
//! from the persisted snapshot together with every transient request status.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::modules::{RequestError, RequestStatus};
use crate::root::AppAction;
use crate::slice::{Persistence, Slice};
use crate::tree::StateTree;

pub const NAME: &str = "auth";

// =============================================================================
// Payload Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AvailabilityStatus {
    #[default]
    #[serde(rename = "available")]
    Available,
    #[serde(rename = "away")]
    Away,
    #[serde(rename = "do not disturb")]
    DoNotDisturb,
    #[serde(rename = "offline")]
    Offline,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub username: String,
    pub email: String,
    #[serde(default, rename = "availableStatusText")]
    pub availability: AvailabilityStatus,
}

/// Token and user returned by a successful login or registration.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub token: String,
    pub user: User,
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("token", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// External identity provider accepted by the login endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocialProvider {
    Google,
    Facebook,
}

impl SocialProvider {
    /// Path segment appended to the login endpoint.
    pub fn as_str(&self) -> &'static str {
        match self {
            SocialProvider::Google => "google",
            SocialProvider::Facebook => "facebook",
        }
    }
}

impl fmt::Display for SocialProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider-issued credential exchanged for a session.
#[derive(Clone, PartialEq, Eq)]
pub struct SocialLoginRequest {
    pub provider: SocialProvider,
    pub access_token: String,
}

impl fmt::Debug for SocialLoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocialLoginRequest")
            .field("provider", &self.provider)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("name", &self.name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// State & Actions
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuthState {
    pub token: Option<String>,
    pub user: Option<User>,
    pub is_authenticated: bool,
    pub login: RequestStatus,
    pub register: RequestStatus,
    pub revoke: RequestStatus,
    pub revalidating: bool,
    pub open_logout_sheet: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthAction {
    LoginRequested(LoginRequest),
    SocialLoginRequested(SocialLoginRequest),
    LoginSucceeded(AuthSession),
    LoginFailed(RequestError),
    RegisterRequested(RegisterRequest),
    RegisterSucceeded(AuthSession),
    RegisterFailed(RequestError),
    SetToken(String),
    RevalidateToken,
    TokenRevalidated(User),
    TokenRejected,
    TokenRevalidationFailed(RequestError),
    RevokeTokenRequested,
    RevokeTokenSucceeded,
    RevokeTokenFailed(RequestError),
    SetLogoutSheetOpen(bool),
    Reset,
}

impl AuthAction {
    pub fn kind(&self) -> &'static str {
        match self {
            AuthAction::LoginRequested(_) => "auth/loginRequested",
            AuthAction::SocialLoginRequested(_) => "auth/socialLoginRequested",
            AuthAction::LoginSucceeded(_) => "auth/loginSucceeded",
            AuthAction::LoginFailed(_) => "auth/loginFailed",
            AuthAction::RegisterRequested(_) => "auth/registerRequested",
            AuthAction::RegisterSucceeded(_) => "auth/registerSucceeded",
            AuthAction::RegisterFailed(_) => "auth/registerFailed",
            AuthAction::SetToken(_) => "auth/setToken",
            AuthAction::RevalidateToken => "auth/revalidateToken",
            AuthAction::TokenRevalidated(_) => "auth/tokenRevalidated",
            AuthAction::TokenRejected => "auth/tokenRejected",
            AuthAction::TokenRevalidationFailed(_) => "auth/tokenRevalidationFailed",
            AuthAction::RevokeTokenRequested => "auth/revokeTokenRequested",
            AuthAction::RevokeTokenSucceeded => "auth/revokeTokenSucceeded",
            AuthAction::RevokeTokenFailed(_) => "auth/revokeTokenFailed",
            AuthAction::SetLogoutSheetOpen(_) => "auth/setLogoutSheetOpen",
            AuthAction::Reset => "auth/reset",
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AuthSlice;

impl AuthSlice {
    fn sign_in(state: &AuthState, session: &AuthSession) -> AuthState {
        AuthState {
            token: Some(session.token.clone()),
            user: Some(session.user.clone()),
            is_authenticated: true,
            login: RequestStatus::idle(),
            register: RequestStatus::idle(),
            ..state.clone()
        }
    }
}

impl Slice<AppAction> for AuthSlice {
    const NAME: &'static str = NAME;
    type State = AuthState;

    fn initial_state(&self) -> AuthState {
        AuthState::default()
    }

    fn reduce(&self, state: &AuthState, action: &AppAction) -> Option<AuthState> {
        let AppAction::Auth(action) = action else {
            return None;
        };

        let next = match action {
            AuthAction::LoginRequested(_) | AuthAction::SocialLoginRequested(_) => AuthState {
                login: RequestStatus::loading(),
                ..state.clone()
            },
            AuthAction::LoginSucceeded(session) | AuthAction::RegisterSucceeded(session) => {
                Self::sign_in(state, session)
            }
            AuthAction::LoginFailed(error) => AuthState {
                login: RequestStatus::failed(error.clone()),
                ..state.clone()
            },
            AuthAction::RegisterRequested(_) => AuthState {
                register: RequestStatus::loading(),
                ..state.clone()
            },
            AuthAction::RegisterFailed(error) => AuthState {
                register: RequestStatus::failed(error.clone()),
                ..state.clone()
            },
            AuthAction::SetToken(token) => AuthState {
                token: Some(token.clone()),
                ..state.clone()
            },
            AuthAction::RevalidateToken => AuthState {
                revalidating: true,
                ..state.clone()
            },
            AuthAction::TokenRevalidated(user) => AuthState {
                user: Some(user.clone()),
                is_authenticated: true,
                revalidating: false,
                ..state.clone()
            },
            AuthAction::TokenRejected => AuthState::default(),
            AuthAction::TokenRevalidationFailed(_) => AuthState {
                revalidating: false,
                ..state.clone()
            },
            AuthAction::RevokeTokenRequested => AuthState {
                revoke: RequestStatus::loading(),
                ..state.clone()
            },
            AuthAction::RevokeTokenSucceeded | AuthAction::Reset => AuthState::default(),
            AuthAction::RevokeTokenFailed(error) => AuthState {
                revoke: RequestStatus::failed(error.clone()),
                ..state.clone()
            },
            AuthAction::SetLogoutSheetOpen(open) => AuthState {
                open_logout_sheet: *open,
                ..state.clone()
            },
        };
        Some(next)
    }

    fn persistence(&self) -> Persistence {
        Persistence::Deny(&[
            "token",
            "login",
            "register",
            "revoke",
            "revalidating",
            "open_logout_sheet",
        ])
    }
}

// =============================================================================
// Selectors
// =============================================================================

pub fn select(tree: &StateTree) -> Option<&AuthState> {
    tree.get::<AuthState>(NAME)
}

pub fn is_authenticated(tree: &StateTree) -> bool {
    select(tree).is_some_and(|s| s.is_authenticated)
}

pub fn token(tree: &StateTree) -> Option<&str> {
    select(tree).and_then(|s| s.token.as_deref())
}

pub fn user(tree: &StateTree) -> Option<&User> {
    select(tree).and_then(|s| s.user.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn session() -> AuthSession {
        AuthSession {
            token: "tok-1".into(),
            user: User {
                name: "Ana".into(),
                username: "ana".into(),
                email: "ana@example.com".into(),
                availability: AvailabilityStatus::Available,
            },
        }
    }

    fn reduce(state: &AuthState, action: AuthAction) -> AuthState {
        AuthSlice.reduce(state, &AppAction::Auth(action)).unwrap()
    }

    #[test]
    fn test_social_login_shares_login_status() {
        let request = SocialLoginRequest {
            provider: SocialProvider::Google,
            access_token: "ya29.secret".into(),
        };
        assert!(!format!("{request:?}").contains("ya29"));

        let loading = reduce(&AuthSlice.initial_state(), AuthAction::SocialLoginRequested(request));
        assert!(loading.login.loading);
        assert_eq!(
            AuthAction::SocialLoginRequested(SocialLoginRequest {
                provider: SocialProvider::Facebook,
                access_token: String::new(),
            })
            .kind(),
            "auth/socialLoginRequested"
        );

        let signed_in = reduce(&loading, AuthAction::LoginSucceeded(session()));
        assert!(signed_in.is_authenticated);
        assert_eq!(signed_in.login, RequestStatus::idle());
    }

    #[test]
    fn test_login_lifecycle() {
        let state = AuthSlice.initial_state();
        let loading = reduce(
            &state,
            AuthAction::LoginRequested(LoginRequest {
                email: "ana@example.com".into(),
                password: "secret".into(),
            }),
        );
        assert!(loading.login.loading);

        let signed_in = reduce(&loading, AuthAction::LoginSucceeded(session()));
        assert!(signed_in.is_authenticated);
        assert_eq!(signed_in.token.as_deref(), Some("tok-1"));
        assert_eq!(signed_in.login, RequestStatus::idle());
    }

    #[test]
    fn test_register_failure_keeps_field_errors() {
        let mut fields = BTreeMap::new();
        fields.insert("email".into(), vec!["The email has already been taken.".into()]);
        let state = reduce(
            &AuthSlice.initial_state(),
            AuthAction::RegisterFailed(RequestError::with_fields("The given data was invalid.", fields)),
        );

        let error = state.register.error.as_ref().unwrap();
        assert_eq!(error.field("email").len(), 1);
        assert!(!state.register.loading);
    }

    #[test]
    fn test_rejected_token_signs_out() {
        let signed_in = reduce(&AuthSlice.initial_state(), AuthAction::LoginSucceeded(session()));
        let out = reduce(&signed_in, AuthAction::TokenRejected);
        assert_eq!(out, AuthState::default());

        let kept = reduce(
            &signed_in,
            AuthAction::TokenRevalidationFailed(RequestError::message("offline")),
        );
        assert!(kept.is_authenticated);
    }

    #[test]
    fn test_secrets_are_not_persisted_or_logged() {
        let policy = AuthSlice.persistence();
        assert!(!policy.permits("token"));
        assert!(!policy.permits("login"));
        assert!(policy.permits("user"));
        assert!(policy.permits("is_authenticated"));

        let debug = format!("{:?}", session());
        assert!(!debug.contains("tok-1"));
    }

    #[test]
    fn test_user_wire_format() {
        let user: User = serde_json::from_str(
            r#"{"name":"Bo","username":"bo","email":"bo@example.com","availableStatusText":"do not disturb"}"#,
        )
        .unwrap();
        assert_eq!(user.availability, AvailabilityStatus::DoNotDisturb);
    }
}
