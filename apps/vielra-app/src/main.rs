//! Headless Vielra runner.
//!
//! Starts the application against the on-disk database and keeps it alive
//! until Ctrl-C, then shuts down cleanly so pending state is flushed.
//!
//! Usage: `vielra [path/to/vielra.toml]`

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use vielra_app::{init_tracing, AppConfig, AppContext};
use vielra_core::root::selectors;
use vielra_store::{SqliteStorage, StorageConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = AppConfig::load(config_path).context("Failed to load configuration")?;

    let db_path = config.database_path()?;
    let storage = SqliteStorage::open(StorageConfig::new(&db_path))
        .await
        .with_context(|| format!("Failed to open database at {}", db_path.display()))?;

    let api = Arc::new(config.api_client());
    let ctx = AppContext::start(config, Arc::new(storage.clone()), api).await?;

    let tree = ctx.state();
    info!(
        revision = tree.revision(),
        first_launch = selectors::is_first_launch(&tree),
        authenticated = selectors::is_authenticated(&tree),
        greeting = %ctx.translator().t("home.greeting.hi_there"),
        "Ready - press Ctrl-C to exit"
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to install Ctrl-C handler")?;
    info!("Shutdown signal received, starting graceful shutdown...");

    ctx.shutdown().await?;
    storage.close().await;
    Ok(())
}
