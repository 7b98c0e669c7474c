pub mod aggregate;
pub mod config;
pub mod device;
pub mod error;
pub mod executor;
pub mod orchestrator;
pub mod runner;
pub mod score;
pub mod writer;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{Instrument, info, info_span};

pub use crate::config::{BenchSettings, WorkloadSpec};
pub use crate::device::DeviceInfo;
pub use crate::error::BenchError;
pub use crate::executor::{Executor, ExecutorRegistry};
pub use crate::orchestrator::{BenchmarkOrchestrator, ResultsSummary};
pub use crate::score::{ScoreKeyPath, ScoreRecord};

use crate::config::default_config_path;

/// Settings plus the orchestrator built from them, ready for one benchmark pass.
pub struct BenchSession {
    settings: BenchSettings,
    orchestrator: BenchmarkOrchestrator,
}

impl BenchSession {
    /// Construct a session using explicit settings and executors built from them.
    pub fn from_settings(settings: BenchSettings) -> Result<Self> {
        let registry = ExecutorRegistry::from_settings(&settings);
        Self::with_registry(settings, registry)
    }

    /// Construct a session with an injected executor registry.
    pub fn with_registry(settings: BenchSettings, registry: ExecutorRegistry) -> Result<Self> {
        settings.validate()?;
        let orchestrator = BenchmarkOrchestrator::from_settings(&settings, registry)?;
        Ok(Self {
            settings,
            orchestrator,
        })
    }

    /// Load configuration from the default path (or an override) and build a session.
    pub fn bootstrap(config_path_override: Option<PathBuf>) -> Result<Self> {
        let settings = load_settings(config_path_override)?;
        Self::from_settings(settings)
    }

    pub fn settings(&self) -> &BenchSettings {
        &self.settings
    }

    /// Run every configured workload on `device`.
    pub async fn run(&self, device: &DeviceInfo) -> Result<ResultsSummary> {
        let span = info_span!("bench", cpu = %device.cpu, browser = %device.browser);
        let summary = async {
            info!(
                workloads = self.settings.workloads.len(),
                results = %self.orchestrator.writer().root().display(),
                "Starting benchmark pass"
            );
            self.orchestrator
                .run_all(device, &self.settings.workloads)
                .await
        }
        .instrument(span)
        .await?;
        Ok(summary)
    }
}

/// Read settings from `path_override` or the platform default location.
pub fn load_settings(path_override: Option<PathBuf>) -> Result<BenchSettings> {
    let path = match path_override {
        Some(path) => path,
        None => default_config_path()?,
    };
    BenchSettings::load_or_default(&path)
        .with_context(|| format!("Unable to load benchmark settings from {}", path.display()))
}
