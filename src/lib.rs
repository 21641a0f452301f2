pub mod commands;
pub mod db;
pub mod explanation;
pub mod extraction;
pub mod history;
pub mod protocol;
pub mod settings;
pub mod utils;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use tokio::task::JoinHandle;

use explanation::{ExplainConfig, ExplanationPipeline};
use history::{HistoryStore, HISTORY_DB_FILE};
use settings::{SettingsStore, SETTINGS_FILE};

const ENABLE_LOGS: bool = true;

/// Overrides the platform data directory.
pub const DATA_DIR_ENV: &str = "WORD_TRACKER_DATA_DIR";

pub struct AppState {
    pub history: HistoryStore,
    pub pipeline: Arc<ExplanationPipeline>,
    pub settings: Arc<SettingsStore>,
}

impl AppState {
    /// Open the history database and settings under `data_dir`.
    pub async fn bootstrap(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

        let history = HistoryStore::new(data_dir.join(HISTORY_DB_FILE));
        history.init().await?;

        let settings = SettingsStore::new(data_dir.join(SETTINGS_FILE))?;
        let config = ExplainConfig::from(&settings.get());
        let pipeline = ExplanationPipeline::new(history.clone(), config);

        log_info!("Word Tracker data directory: {}", data_dir.display());

        Ok(Self {
            history,
            pipeline: Arc::new(pipeline),
            settings: Arc::new(settings),
        })
    }

    /// Keep the pipeline configuration in step with saved settings.
    ///
    /// The task ends once the settings store is dropped.
    pub fn spawn_settings_listener(&self) -> JoinHandle<()> {
        let mut changes = self.settings.subscribe();
        let pipeline = Arc::clone(&self.pipeline);
        tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                let config = ExplainConfig::from(&*changes.borrow_and_update());
                pipeline.reload(config);
            }
            log_debug!("Settings listener stopped");
        })
    }
}

/// `$WORD_TRACKER_DATA_DIR`, else the platform data directory.
pub fn default_data_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|dir| !dir.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    dirs::data_dir()
        .map(|dir| dir.join("word-tracker"))
        .context("Could not determine a data directory; set WORD_TRACKER_DATA_DIR")
}
