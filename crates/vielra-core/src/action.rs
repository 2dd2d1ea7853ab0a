//! # Actions
//!
//! An action is a request for a state transition. The application defines a
//! single closed root enum whose variants wrap each feature's own closed enum,
//! so every action type is known at compile time and every `match` over it is
//! checked exhaustively.
//!
//! ```text
//! AppAction::Auth(AuthAction::SetToken(..))   kind() == "auth/setToken"
//! AppAction::App(AppSliceAction::SetLanguage) kind() == "app/setLanguage"
//! ```

use std::fmt::Debug;

/// Contract for the root action type of a store.
pub trait Action: Clone + Debug + Send + Sync + 'static {
    /// Stable `"<slice>/<variant>"` type string.
    ///
    /// Used for logging and for effect trigger diagnostics. It never drives
    /// reducer dispatch; reducers match on the enum itself.
    fn kind(&self) -> &'static str;
}
