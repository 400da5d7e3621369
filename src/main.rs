use std::{env, path::PathBuf};

use anyhow::{Context, Result};
use log::{error, info};

use shotclock::{
    cache::{AssetCache, DirSource},
    config::ConfigService,
    model::PageRole,
    store::Database,
    App,
};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let data_dir = env::var("SHOTCLOCK_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"));
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

    let role_marker = env::args()
        .nth(1)
        .or_else(|| env::var("SHOTCLOCK_ROLE").ok())
        .unwrap_or_default();
    let role = PageRole::from_marker(&role_marker);

    let db = Database::new(data_dir.join("shotclock.sqlite3"))?;
    let config_service = ConfigService::new(data_dir.join("config.json"));

    // Opt-in offline cache over a local static asset directory.
    if let Ok(static_dir) = env::var("SHOTCLOCK_STATIC_DIR") {
        let source = DirSource::new(PathBuf::from(static_dir));
        let asset_cache = AssetCache::new(data_dir.join("asset-cache"));
        match asset_cache.install(&source) {
            Ok(()) => asset_cache.activate()?,
            // a failed install leaves this cache version inactive; the page
            // itself keeps running
            Err(err) => error!("asset cache install failed: {err:?}"),
        }
    }

    info!("shotclock starting as {role:?}");
    let app = App::start(role, db, &config_service);

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutting down");
    app.shutdown().await?;

    Ok(())
}
