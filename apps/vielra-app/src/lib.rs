//! # vielra-app: Vielra Application Shell
//!
//! Host-side composition root: loads configuration, opens storage, and runs
//! the store, persistence gate and effect orchestrator as one unit.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          AppContext                                     │
//! │                                                                         │
//! │   AppConfig ──► Store<AppAction> ◄── PersistenceGate ◄── SqliteStorage  │
//! │                     │    ▲                                              │
//! │          subscribe  │    │ dispatch                                     │
//! │                     ▼    │                                              │
//! │   ThemeHandle   Translator   EffectOrchestrator ──► dyn ApiClient       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - TOML config with environment overrides
//! - [`context`] - Startup and shutdown sequencing
//! - [`theme`] - Theme derived from the palette mode
//! - [`translator`] - Message lookup in the current language
//! - [`resources`] - Bundled message modules
//! - [`error`] - Application error type

pub mod config;
pub mod context;
pub mod error;
pub mod resources;
pub mod theme;
pub mod translator;

pub use config::AppConfig;
pub use context::AppContext;
pub use error::{AppError, AppResult};
pub use theme::ThemeHandle;
pub use translator::Translator;

use tracing_subscriber::EnvFilter;

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=vielra_store=trace` - Trace the persistence gate only
/// - Default: INFO, DEBUG for vielra crates
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,vielra_app=debug,vielra_store=debug,vielra_effects=debug,sqlx=warn")
    });

    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();
}
