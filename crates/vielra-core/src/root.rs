//! # Root Action and Registry
//!
//! Ties the feature slices together: the closed [`AppAction`] enum, the
//! registration order of the application's slices and the cross-slice
//! selectors the presentation layer reads.
//!
//! ```text
//! AppAction
//! ├── App(AppSliceAction)
//! ├── Auth(AuthAction)
//! ├── Settings(SettingsAction)
//! └── Phrasebook(PhrasebookAction)
//!
//! Registration order: app → auth → settings → phrasebook
//! ```

use crate::action::Action;
use crate::error::ConfigurationError;
use crate::modules::app::{AppSlice, AppSliceAction};
use crate::modules::auth::{AuthAction, AuthSlice};
use crate::modules::phrasebook::{PhrasebookAction, PhrasebookSlice};
use crate::modules::settings::{SettingsAction, SettingsSlice};
use crate::reducer::SliceRegistry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    App(AppSliceAction),
    Auth(AuthAction),
    Settings(SettingsAction),
    Phrasebook(PhrasebookAction),
}

impl Action for AppAction {
    fn kind(&self) -> &'static str {
        match self {
            AppAction::App(a) => a.kind(),
            AppAction::Auth(a) => a.kind(),
            AppAction::Settings(a) => a.kind(),
            AppAction::Phrasebook(a) => a.kind(),
        }
    }
}

impl From<AppSliceAction> for AppAction {
    fn from(action: AppSliceAction) -> Self {
        AppAction::App(action)
    }
}

impl From<AuthAction> for AppAction {
    fn from(action: AuthAction) -> Self {
        AppAction::Auth(action)
    }
}

impl From<SettingsAction> for AppAction {
    fn from(action: SettingsAction) -> Self {
        AppAction::Settings(action)
    }
}

impl From<PhrasebookAction> for AppAction {
    fn from(action: PhrasebookAction) -> Self {
        AppAction::Phrasebook(action)
    }
}

/// Registry with every application slice and default preferences.
pub fn app_registry() -> Result<SliceRegistry<AppAction>, ConfigurationError> {
    app_registry_with(AppSlice::default())
}

/// Registry with every application slice, using a configured app slice.
pub fn app_registry_with(app: AppSlice) -> Result<SliceRegistry<AppAction>, ConfigurationError> {
    SliceRegistry::new()
        .with(app)?
        .with(AuthSlice)?
        .with(SettingsSlice)?
        .with(PhrasebookSlice)
}

// =============================================================================
// Selectors
// =============================================================================

/// Cross-slice read access for the presentation layer.
pub mod selectors {
    use crate::i18n::LanguageCode;
    use crate::theme::{derive_theme, PaletteMode, Theme};
    use crate::tree::StateTree;

    pub use crate::modules::app::{is_first_launch, palette_mode};
    pub use crate::modules::auth::{is_authenticated, user};
    pub use crate::modules::phrasebook::{categories, phrases};

    pub fn current_language(tree: &StateTree) -> LanguageCode {
        crate::modules::app::language(tree)
    }

    pub fn is_dark_mode(tree: &StateTree) -> bool {
        palette_mode(tree) == PaletteMode::Dark
    }

    /// Theme for the current palette mode.
    pub fn theme(tree: &StateTree) -> Theme {
        derive_theme(palette_mode(tree))
    }

    /// Category names in the current interface language.
    pub fn localized_category_names(tree: &StateTree) -> Vec<&str> {
        let language = current_language(tree);
        categories(tree).iter().map(|c| c.name.get(language)).collect()
    }

    /// True when a signed-in session exists and is not being revalidated.
    pub fn has_settled_session(tree: &StateTree) -> bool {
        crate::modules::auth::select(tree).is_some_and(|s| s.is_authenticated && !s.revalidating)
    }
}
