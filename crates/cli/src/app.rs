//! Stores and services shared by every subcommand.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use {
    tracing::debug,
    vigil_agents::BatchCoordinator,
    vigil_config::VigilConfig,
    vigil_cron::{
        FileStateStore, InFlightSet, ScheduleTable, SchedulerOptions, StateStore, SystemClock,
    },
    vigil_generation::{GeminiGateway, GenerationGateway},
    vigil_kit::{BlobStore, FileBlobStore, FileHistoryStore, HistoryStore, KitAssembler},
};

pub struct App {
    pub config: VigilConfig,
    pub data_dir: PathBuf,
    pub state: Arc<dyn StateStore>,
    pub history: Arc<dyn HistoryStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub table: ScheduleTable,
}

impl App {
    /// Load config from `config_path` (or the standard locations) and open
    /// the stores under the resolved data directory.
    pub fn load(config_path: Option<&Path>, data_dir: Option<&Path>) -> anyhow::Result<Self> {
        let config = match config_path {
            Some(path) => vigil_config::load_config(path)?,
            None => vigil_config::discover_and_load(),
        };
        let data_dir = vigil_config::data_dir(&config, data_dir);
        debug!(data_dir = %data_dir.display(), "opening stores");
        Ok(Self::open(config, data_dir))
    }

    pub fn open(config: VigilConfig, data_dir: PathBuf) -> Self {
        let table = ScheduleTable::new(config.schedule.clone());
        Self {
            state: Arc::new(FileStateStore::new(data_dir.join("state.json"))),
            history: Arc::new(FileHistoryStore::new(data_dir.join("history.json"))),
            blobs: Arc::new(FileBlobStore::new(data_dir.join("blobs"))),
            table,
            config,
            data_dir,
        }
    }

    /// Remote gateway. Fails when no API key is configured.
    pub fn gateway(&self) -> anyhow::Result<Arc<dyn GenerationGateway>> {
        let api_key = self.config.gemini.resolve_api_key()?;
        Ok(Arc::new(GeminiGateway::new(api_key, &self.config.gemini)))
    }

    pub fn coordinator(
        &self,
        gateway: Arc<dyn GenerationGateway>,
        in_flight: InFlightSet,
    ) -> BatchCoordinator {
        let assembler = KitAssembler::new(
            Arc::clone(&gateway),
            Arc::clone(&self.blobs),
            Arc::clone(&self.history),
            self.config.voices.clone(),
            self.config.agent.long_duration_minutes,
        );
        BatchCoordinator::new(gateway, assembler, in_flight, &self.config.agent)
    }

    pub fn clock(&self) -> anyhow::Result<SystemClock> {
        Ok(SystemClock::new(self.config.agent.timezone.as_deref())?)
    }

    pub fn scheduler_options(&self) -> SchedulerOptions {
        SchedulerOptions::from_config(&self.config.agent)
    }
}
