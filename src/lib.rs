pub mod cache;
pub mod clock;
pub mod config;
pub mod display;
pub mod engine;
pub mod model;
pub mod store;

use anyhow::Result;

use crate::{
    config::{Config, ConfigService, ControlSet},
    display::DisplayLoop,
    engine::CountdownController,
    model::PageRole,
    store::Database,
};

/// One running page instance. The display refresh loop runs regardless of
/// role; only the admin role owns the countdown engine and loads the shared
/// config.
pub struct App {
    role: PageRole,
    db: Database,
    config: Option<Config>,
    engine: Option<CountdownController>,
    display: DisplayLoop,
}

impl App {
    pub fn start(role: PageRole, db: Database, config_service: &ConfigService) -> Self {
        let display = DisplayLoop::spawn(db.clone());

        let (engine, config) = match role {
            PageRole::Admin => (
                Some(CountdownController::new(db.clone())),
                Some(config_service.load()),
            ),
            PageRole::Display | PageRole::Neither => (None, None),
        };

        Self {
            role,
            db,
            config,
            engine,
            display,
        }
    }

    pub fn role(&self) -> PageRole {
        self.role
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> Option<&Config> {
        self.config.as_ref()
    }

    /// Selection controls rendered from the loaded config; admin only.
    pub fn controls(&self) -> Option<ControlSet> {
        self.config.as_ref().map(config::render_controls)
    }

    pub fn engine(&self) -> Option<&CountdownController> {
        self.engine.as_ref()
    }

    pub fn display(&self) -> &DisplayLoop {
        &self.display
    }

    /// Replace the in-memory config after an upload, the way the original
    /// page reloads itself.
    pub fn reload_config(&mut self, config_service: &ConfigService) {
        if self.role == PageRole::Admin {
            self.config = Some(config_service.load());
        }
    }

    /// Tear the page down: record whether a countdown was still live (the
    /// unload-time flag write), then stop both periodic tasks.
    pub async fn shutdown(self) -> Result<()> {
        if let Some(engine) = &self.engine {
            self.db.save_running(engine.is_running()).await?;
            engine.abort_ticker().await;
        }
        self.display.shutdown().await;
        Ok(())
    }
}
