//! # App Slice
//!
//! Application chrome and user preferences: splash/bottom-tab visibility,
//! first-launch flag, interface language and palette mode.
//!
//! Changing the language only updates state. The translator reads it back
//! through [`language`]; nothing is switched from inside the reducer.

use serde::{Deserialize, Serialize};

use crate::i18n::LanguageCode;
use crate::root::AppAction;
use crate::slice::{Persistence, Slice};
use crate::theme::PaletteMode;
use crate::tree::StateTree;

pub const NAME: &str = "app";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppState {
    pub splash_screen_visible: bool,
    pub bottom_tab_visible: bool,
    pub already_launched: bool,
    pub language: LanguageCode,
    pub palette_mode: PaletteMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppSliceAction {
    SetSplashScreenVisible(bool),
    SetBottomTabVisible(bool),
    SetAlreadyLaunched(bool),
    SetLanguage(LanguageCode),
    SetPaletteMode(PaletteMode),
    TogglePaletteMode,
}

impl AppSliceAction {
    pub fn kind(&self) -> &'static str {
        match self {
            AppSliceAction::SetSplashScreenVisible(_) => "app/setSplashScreenVisible",
            AppSliceAction::SetBottomTabVisible(_) => "app/setBottomTabVisible",
            AppSliceAction::SetAlreadyLaunched(_) => "app/setAlreadyLaunched",
            AppSliceAction::SetLanguage(_) => "app/setLanguage",
            AppSliceAction::SetPaletteMode(_) => "app/setPaletteMode",
            AppSliceAction::TogglePaletteMode => "app/togglePaletteMode",
        }
    }
}

/// App slice with configurable first-run defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppSlice {
    default_language: LanguageCode,
    default_palette_mode: PaletteMode,
}

impl AppSlice {
    pub fn new(default_language: LanguageCode, default_palette_mode: PaletteMode) -> Self {
        AppSlice {
            default_language,
            default_palette_mode,
        }
    }
}

impl Slice<AppAction> for AppSlice {
    const NAME: &'static str = NAME;
    type State = AppState;

    fn initial_state(&self) -> AppState {
        AppState {
            splash_screen_visible: true,
            bottom_tab_visible: true,
            already_launched: false,
            language: self.default_language,
            palette_mode: self.default_palette_mode,
        }
    }

    fn reduce(&self, state: &AppState, action: &AppAction) -> Option<AppState> {
        let AppAction::App(action) = action else {
            return None;
        };

        let mut next = state.clone();
        match action {
            AppSliceAction::SetSplashScreenVisible(visible) => next.splash_screen_visible = *visible,
            AppSliceAction::SetBottomTabVisible(visible) => next.bottom_tab_visible = *visible,
            AppSliceAction::SetAlreadyLaunched(launched) => next.already_launched = *launched,
            AppSliceAction::SetLanguage(language) => next.language = *language,
            AppSliceAction::SetPaletteMode(mode) => next.palette_mode = *mode,
            AppSliceAction::TogglePaletteMode => next.palette_mode = state.palette_mode.toggled(),
        }
        Some(next)
    }

    fn persistence(&self) -> Persistence {
        Persistence::Allow(&["already_launched", "language", "palette_mode"])
    }
}

// =============================================================================
// Selectors
// =============================================================================

pub fn select(tree: &StateTree) -> Option<&AppState> {
    tree.get::<AppState>(NAME)
}

/// Current interface language, `En` if the slice is absent.
pub fn language(tree: &StateTree) -> LanguageCode {
    select(tree).map(|s| s.language).unwrap_or_default()
}

/// Current palette mode, `Light` if the slice is absent.
pub fn palette_mode(tree: &StateTree) -> PaletteMode {
    select(tree).map(|s| s.palette_mode).unwrap_or_default()
}

pub fn is_first_launch(tree: &StateTree) -> bool {
    select(tree).is_some_and(|s| !s.already_launched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::settings::SettingsAction;

    fn reduce(state: &AppState, action: AppSliceAction) -> Option<AppState> {
        AppSlice::default().reduce(state, &AppAction::App(action))
    }

    #[test]
    fn test_toggle_palette_mode() {
        let initial = AppSlice::default().initial_state();
        let dark = reduce(&initial, AppSliceAction::TogglePaletteMode).unwrap();
        assert_eq!(dark.palette_mode, PaletteMode::Dark);
        let light = reduce(&dark, AppSliceAction::TogglePaletteMode).unwrap();
        assert_eq!(light.palette_mode, PaletteMode::Light);
    }

    #[test]
    fn test_set_language() {
        let initial = AppSlice::new(LanguageCode::Id, PaletteMode::Dark).initial_state();
        assert_eq!(initial.language, LanguageCode::Id);
        let next = reduce(&initial, AppSliceAction::SetLanguage(LanguageCode::Vi)).unwrap();
        assert_eq!(next.language, LanguageCode::Vi);
        assert_eq!(next.palette_mode, PaletteMode::Dark);
    }

    #[test]
    fn test_foreign_actions_are_ignored() {
        let initial = AppSlice::default().initial_state();
        let action = AppAction::Settings(SettingsAction::Reset);
        assert!(AppSlice::default().reduce(&initial, &action).is_none());
    }

    #[test]
    fn test_only_preferences_are_persisted() {
        let policy = AppSlice::default().persistence();
        assert!(policy.permits("language"));
        assert!(policy.permits("palette_mode"));
        assert!(!policy.permits("splash_screen_visible"));
    }
}
