//! # Application Context
//!
//! Wires every component together and owns their lifetimes.
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. validate config                                                     │
//! │  2. compose reducers ──► Store (Uninitialized, dispatches buffered)     │
//! │  3. merge translations (collision = startup error)                      │
//! │  4. spawn EffectOrchestrator (listens before anything is replayed)      │
//! │  5. saved token? ──► dispatch SetToken + RevalidateToken (buffered)     │
//! │  6. PersistenceGate::open ──► rehydrate, replay buffer, Ready           │
//! │  7. hide splash screen                                                  │
//! │  8. ThemeHandle + Translator                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Shutdown Sequence
//! Orchestrator first (in-flight effects may still dispatch), then the gate
//! flushes whatever they changed.

use std::sync::Arc;

use tracing::{info, warn};

use vielra_core::modules::app::{AppSlice, AppSliceAction};
use vielra_core::modules::auth::AuthAction;
use vielra_core::root::{app_registry_with, AppAction};
use vielra_core::{PaletteOverrides, StateTree, TranslationBundle};
use vielra_effects::{app_effects, EffectOrchestrator, OrchestratorHandle, SharedApiClient, TokenStore};
use vielra_store::{GateHandle, PersistenceGate, RehydrationReport, SharedStorage, Store};

use crate::config::AppConfig;
use crate::error::AppResult;
use crate::resources::translation_bundle;
use crate::theme::ThemeHandle;
use crate::translator::Translator;

/// Running application: store, persistence, effects, theme and translations.
pub struct AppContext {
    config: AppConfig,
    store: Store<AppAction>,
    gate: GateHandle,
    orchestrator: OrchestratorHandle,
    theme: ThemeHandle,
    translator: Translator,
    report: RehydrationReport,
}

impl AppContext {
    pub async fn start(config: AppConfig, storage: SharedStorage, api: SharedApiClient) -> AppResult<Self> {
        config.validate()?;

        let app_slice = AppSlice::new(config.app.default_language, config.app.default_palette_mode);
        let reducer = app_registry_with(app_slice)?.compose();
        let bundle = Arc::new(translation_bundle(config.app.default_language)?);
        let store = Store::new(reducer, config.store_config());

        let tokens = TokenStore::new(Arc::clone(&storage));
        let effects = app_effects(api, tokens.clone())?;
        let orchestrator = EffectOrchestrator::spawn(&store, effects, config.orchestrator_config());

        if let Some(token) = tokens.load().await {
            info!("Saved access token found - revalidating session");
            store.dispatch(AuthAction::SetToken(token))?;
            store.dispatch(AuthAction::RevalidateToken)?;
        }

        let (gate, report) = PersistenceGate::open(&store, storage, config.gate_config()).await?;
        if !report.is_clean() {
            warn!(
                reset = ?report.reset.iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>(),
                unreadable = report.failure.is_some(),
                "Some persisted state could not be restored"
            );
        }

        store.dispatch(AppSliceAction::SetSplashScreenVisible(false))?;

        let theme = ThemeHandle::spawn(&store, PaletteOverrides::default());
        let translator = Translator::new(bundle, store.clone());

        info!(
            app = %config.app.name,
            api = %config.api.base_url,
            language = %translator.language(),
            palette_mode = %theme.palette_mode(),
            "Application started"
        );

        Ok(AppContext {
            config,
            store,
            gate,
            orchestrator,
            theme,
            translator,
            report,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &Store<AppAction> {
        &self.store
    }

    pub fn state(&self) -> StateTree {
        self.store.state()
    }

    pub fn theme(&self) -> &ThemeHandle {
        &self.theme
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    pub fn translations(&self) -> &TranslationBundle {
        self.translator.bundle()
    }

    pub fn rehydration_report(&self) -> &RehydrationReport {
        &self.report
    }

    pub fn orchestrator(&self) -> &OrchestratorHandle {
        &self.orchestrator
    }

    pub fn gate(&self) -> &GateHandle {
        &self.gate
    }

    /// Stops effects, then flushes pending state to storage.
    pub async fn shutdown(self) -> AppResult<()> {
        info!("Application shutting down");
        if let Err(e) = self.orchestrator.shutdown().await {
            warn!(error = %e, "Effect orchestrator already stopped");
        }
        self.gate.shutdown().await?;
        info!("Application stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use vielra_core::modules::{app, auth};
    use vielra_core::root::selectors;
    use vielra_core::{LanguageCode, PaletteMode};
    use vielra_effects::{OfflineApiClient, ACCESS_TOKEN_KEY};
    use vielra_store::MemoryStorage;

    use crate::error::AppError;

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.storage.debounce_ms = 10;
        config
    }

    async fn start(storage: &Arc<MemoryStorage>) -> AppContext {
        let storage: SharedStorage = storage.clone();
        AppContext::start(config(), storage, Arc::new(OfflineApiClient::new("https://api.vielra.app")))
            .await
            .unwrap()
    }

    async fn settle(ctx: &AppContext, pred: impl Fn(&StateTree) -> bool) {
        let mut rx = ctx.store().subscribe();
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if pred(&rx.borrow_and_update()) {
                    return;
                }
                if rx.changed().await.is_err() {
                    return;
                }
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_fresh_start() {
        let storage = Arc::new(MemoryStorage::new());
        let ctx = start(&storage).await;

        let tree = ctx.state();
        let app_state = app::select(&tree).unwrap();
        assert!(!app_state.splash_screen_visible);
        assert!(app_state.bottom_tab_visible);
        assert!(!selectors::is_authenticated(&tree));
        assert_eq!(ctx.rehydration_report().restored.len(), 0);
        assert_eq!(ctx.translator().t("home.greeting.hi_there"), "Hi there");

        ctx.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_preferences_survive_restart() {
        let storage = Arc::new(MemoryStorage::new());

        let ctx = start(&storage).await;
        ctx.store().dispatch(AppSliceAction::SetLanguage(LanguageCode::Vi)).unwrap();
        ctx.store().dispatch(AppSliceAction::TogglePaletteMode).unwrap();
        ctx.store().dispatch(AppSliceAction::SetAlreadyLaunched(true)).unwrap();
        ctx.shutdown().await.unwrap();

        let ctx = start(&storage).await;
        let tree = ctx.state();
        assert_eq!(selectors::current_language(&tree), LanguageCode::Vi);
        assert_eq!(selectors::palette_mode(&tree), PaletteMode::Dark);
        assert!(!selectors::is_first_launch(&tree));
        assert!(!app::select(&tree).unwrap().splash_screen_visible);
        assert_eq!(ctx.theme().palette_mode(), PaletteMode::Dark);
        assert_eq!(ctx.translator().t("settings.select_language"), "Chọn ngôn ngữ");

        ctx.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_saved_token_is_revalidated() {
        let storage = Arc::new(MemoryStorage::new());
        storage.insert_raw(ACCESS_TOKEN_KEY, "stale-token").await;

        let ctx = start(&storage).await;
        assert!(ctx.rehydration_report().replayed >= 2);

        // Offline, the revalidation fails without rejecting the token.
        settle(&ctx, |tree| auth::select(tree).is_some_and(|s| !s.revalidating)).await;
        assert_eq!(auth::token(&ctx.state()), Some("stale-token"));
        assert_eq!(storage.raw(ACCESS_TOKEN_KEY).await.unwrap(), b"stale-token".to_vec());

        ctx.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let mut config = config();
        config.api.base_url = "not-a-url".into();

        let storage: SharedStorage = Arc::new(MemoryStorage::new());
        let result = AppContext::start(config, storage, Arc::new(OfflineApiClient::new("https://api.vielra.app"))).await;

        assert!(matches!(result, Err(AppError::Configuration(_))));
    }
}
