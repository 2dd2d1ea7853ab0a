//! # Theme Handle
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Store ── tree changes ──► watcher task                                 │
//! │                               │ palette_mode unchanged? skip            │
//! │                               ▼                                         │
//! │                      derive_theme_with(mode, overrides)                 │
//! │                               │                                         │
//! │                               ▼                                         │
//! │                   watch<Arc<Theme>> ──► current() / subscribe()         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use vielra_core::root::{selectors, AppAction};
use vielra_core::{derive_theme_with, PaletteMode, PaletteOverrides, Theme};
use vielra_store::Store;

/// Keeps a derived theme in step with the store's palette mode.
///
/// The theme is recomputed only when the palette mode changes; every other
/// state change leaves the shared `Arc<Theme>` untouched.
pub struct ThemeHandle {
    theme_rx: watch::Receiver<Arc<Theme>>,
    task: JoinHandle<()>,
}

impl ThemeHandle {
    pub fn spawn(store: &Store<AppAction>, overrides: PaletteOverrides) -> Self {
        let mut tree_rx = store.subscribe();
        let mut mode = selectors::palette_mode(&tree_rx.borrow_and_update());
        let (theme_tx, theme_rx) = watch::channel(Arc::new(derive_theme_with(mode, &overrides)));

        let task = tokio::spawn(async move {
            while tree_rx.changed().await.is_ok() {
                let next = selectors::palette_mode(&tree_rx.borrow_and_update());
                if next == mode {
                    continue;
                }
                mode = next;
                debug!(palette_mode = %mode, "Palette mode changed - deriving theme");
                if theme_tx.send(Arc::new(derive_theme_with(mode, &overrides))).is_err() {
                    break;
                }
            }
        });

        ThemeHandle { theme_rx, task }
    }

    pub fn current(&self) -> Arc<Theme> {
        Arc::clone(&self.theme_rx.borrow())
    }

    pub fn palette_mode(&self) -> PaletteMode {
        self.theme_rx.borrow().palette.mode
    }

    /// Receiver notified once per palette mode change.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Theme>> {
        self.theme_rx.clone()
    }
}

impl Drop for ThemeHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use vielra_core::modules::app::AppSliceAction;
    use vielra_core::modules::settings::SettingsAction;
    use vielra_core::root::app_registry;

    fn store() -> Store<AppAction> {
        Store::ephemeral(app_registry().unwrap().compose())
    }

    #[tokio::test(start_paused = true)]
    async fn test_theme_follows_palette_mode() {
        let store = store();
        let handle = ThemeHandle::spawn(&store, PaletteOverrides::default());
        let mut rx = handle.subscribe();
        assert_eq!(handle.palette_mode(), PaletteMode::Light);

        store.dispatch(AppSliceAction::TogglePaletteMode).unwrap();
        tokio::time::timeout(Duration::from_secs(1), rx.changed())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(handle.palette_mode(), PaletteMode::Dark);
        assert_eq!(*handle.current(), vielra_core::derive_theme(PaletteMode::Dark));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrelated_changes_keep_theme() {
        let store = store();
        let handle = ThemeHandle::spawn(&store, PaletteOverrides::default());
        let before = handle.current();
        let mut rx = handle.subscribe();

        store.dispatch(SettingsAction::SetLanguageSheetOpen(true)).unwrap();
        store.dispatch(AppSliceAction::SetPaletteMode(PaletteMode::Light)).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(!rx.has_changed().unwrap());
        assert!(Arc::ptr_eq(&before, &handle.current()));
    }
}
