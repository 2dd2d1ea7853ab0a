//! # Settings Slice
//!
//! Transient settings-screen UI state. Never persisted.

use serde::{Deserialize, Serialize};

use crate::root::AppAction;
use crate::slice::Slice;
use crate::tree::StateTree;

pub const NAME: &str = "settings";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SettingsState {
    pub open_language_sheet: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsAction {
    SetLanguageSheetOpen(bool),
    Reset,
}

impl SettingsAction {
    pub fn kind(&self) -> &'static str {
        match self {
            SettingsAction::SetLanguageSheetOpen(_) => "settings/setLanguageSheetOpen",
            SettingsAction::Reset => "settings/reset",
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SettingsSlice;

impl Slice<AppAction> for SettingsSlice {
    const NAME: &'static str = NAME;
    type State = SettingsState;

    fn initial_state(&self) -> SettingsState {
        SettingsState::default()
    }

    fn reduce(&self, _state: &SettingsState, action: &AppAction) -> Option<SettingsState> {
        match action {
            AppAction::Settings(SettingsAction::SetLanguageSheetOpen(open)) => Some(SettingsState {
                open_language_sheet: *open,
            }),
            AppAction::Settings(SettingsAction::Reset) => Some(SettingsState::default()),
            _ => None,
        }
    }
}

pub fn select(tree: &StateTree) -> Option<&SettingsState> {
    tree.get::<SettingsState>(NAME)
}

pub fn is_language_sheet_open(tree: &StateTree) -> bool {
    select(tree).is_some_and(|s| s.open_language_sheet)
}
