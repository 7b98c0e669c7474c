use std::{
    collections::{BTreeMap, HashSet},
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::device::DeviceInfo;
use crate::error::BenchError;
use crate::score::ScoreKeyPath;
use crate::writer::RESULTS_DIR;

/// Pause between runs of the same workload so device thermals can settle.
pub const DEFAULT_COOLDOWN_MS: u64 = 5_000;

/// A named benchmark and how many times to repeat it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadSpec {
    pub name: String,
    pub run_times: u32,
}

impl WorkloadSpec {
    pub fn new(name: impl Into<String>, run_times: u32) -> Self {
        Self {
            name: name.into(),
            run_times,
        }
    }
}

/// Whether the cooldown also follows the final run of a workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CooldownPolicy {
    /// Only between consecutive runs.
    Between,
    /// After every run, including the last (headroom before the next workload).
    AfterEach,
}

impl Default for CooldownPolicy {
    fn default() -> Self {
        CooldownPolicy::AfterEach
    }
}

/// What the orchestrator does when a workload fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Stop at the first failing workload.
    Abort,
    /// Log the failure and move on to the next workload.
    Continue,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        FailurePolicy::Abort
    }
}

/// External program that performs one run of a workload and prints its score record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandExecutorConfig {
    pub program: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: Vec<EnvVar>,
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub key: String,
    pub value: String,
}

/// Top-level settings persisted as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchSettings {
    #[serde(default = "BenchSettings::default_workloads")]
    pub workloads: Vec<WorkloadSpec>,
    #[serde(default = "BenchSettings::default_cooldown_ms")]
    pub cooldown_ms: u64,
    #[serde(default)]
    pub cooldown_policy: CooldownPolicy,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    #[serde(default)]
    pub score_key: ScoreKeyPath,
    #[serde(default)]
    pub results_root: Option<PathBuf>,
    #[serde(default)]
    pub device: Option<DeviceInfo>,
    #[serde(default)]
    pub executors: BTreeMap<String, CommandExecutorConfig>,
}

impl Default for BenchSettings {
    fn default() -> Self {
        Self {
            workloads: Self::default_workloads(),
            cooldown_ms: Self::default_cooldown_ms(),
            cooldown_policy: CooldownPolicy::default(),
            failure_policy: FailurePolicy::default(),
            score_key: ScoreKeyPath::default(),
            results_root: None,
            device: None,
            executors: BTreeMap::new(),
        }
    }
}

impl BenchSettings {
    fn default_workloads() -> Vec<WorkloadSpec> {
        vec![
            WorkloadSpec::new("Speedometer2", 3),
            WorkloadSpec::new("WebXPRT3", 3),
        ]
    }

    const fn default_cooldown_ms() -> u64 {
        DEFAULT_COOLDOWN_MS
    }

    /// Load settings from disk, writing defaults if missing.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("Unable to read config at {}", path.display()))?;
            let parsed: Self = serde_json::from_str(&raw)
                .with_context(|| format!("Malformed config at {}", path.display()))?;
            parsed
                .validate()
                .with_context(|| format!("Rejected config at {}", path.display()))?;
            Ok(parsed)
        } else {
            let settings = Self::default();
            settings.save(path)?;
            Ok(settings)
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory {}", parent.display())
            })?;
        }
        let serialised = serde_json::to_string_pretty(self)?;
        fs::write(path, serialised)
            .with_context(|| format!("Failed to persist config to {}", path.display()))
    }

    /// Reject settings the pipeline cannot run.
    pub fn validate(&self) -> Result<(), BenchError> {
        let mut seen = HashSet::new();
        for workload in &self.workloads {
            if workload.name.trim().is_empty() {
                return Err(BenchError::Config("workload name must not be empty".into()));
            }
            if workload.name.contains(['/', '\\']) || workload.name.contains("..") {
                return Err(BenchError::Config(format!(
                    "workload name '{}' must not contain path separators or '..'",
                    workload.name
                )));
            }
            if workload.run_times == 0 {
                return Err(BenchError::Config(format!(
                    "workload '{}' must run at least once",
                    workload.name
                )));
            }
            if !seen.insert(workload.name.as_str()) {
                return Err(BenchError::Config(format!(
                    "workload '{}' is listed more than once",
                    workload.name
                )));
            }
        }
        if self.score_key.is_empty() {
            return Err(BenchError::Config("score_key must name at least one field".into()));
        }
        Ok(())
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    /// Resolve the directory results are written under (`<cwd>/results` unless configured).
    pub fn resolve_results_root(&self) -> PathBuf {
        self.results_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(RESULTS_DIR))
    }

    /// Keep only the named workloads, preserving configuration order.
    pub fn retain_workloads(&mut self, names: &[String]) -> Result<(), BenchError> {
        if names.is_empty() {
            return Ok(());
        }
        if let Some(unknown) = names
            .iter()
            .find(|name| !self.workloads.iter().any(|w| &w.name == *name))
        {
            return Err(BenchError::Config(format!(
                "workload '{unknown}' is not configured"
            )));
        }
        self.workloads.retain(|w| names.contains(&w.name));
        Ok(())
    }
}

/// Compute the default path to the benchmark configuration file.
pub fn default_config_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("dev", "webbench", "webbench")
        .context("Unable to resolve platform config directory")?;
    Ok(dirs.config_dir().join("config.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_or_default_writes_defaults() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nested/config.json");
        let settings = BenchSettings::load_or_default(&path).unwrap();
        assert!(path.exists());
        assert_eq!(settings.cooldown_ms, DEFAULT_COOLDOWN_MS);
        assert_eq!(settings.cooldown_policy, CooldownPolicy::AfterEach);
        assert_eq!(settings.failure_policy, FailurePolicy::Abort);
        assert_eq!(settings.workloads.len(), 2);

        let reloaded = BenchSettings::load_or_default(&path).unwrap();
        assert_eq!(reloaded.workloads, settings.workloads);
    }

    #[test]
    fn parses_partial_config() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.json");
        fs::write(
            &path,
            r#"{
                "workloads": [{"name": "WebXPRT3", "run_times": 5}],
                "cooldown_policy": "between",
                "failure_policy": "continue",
                "device": {"CPU": "Example CPU", "Browser": "Chrome", "OS": "Linux"},
                "executors": {"WebXPRT3": {"program": "/usr/bin/run-webxprt"}}
            }"#,
        )
        .unwrap();

        let settings = BenchSettings::load_or_default(&path).unwrap();
        assert_eq!(settings.workloads, vec![WorkloadSpec::new("WebXPRT3", 5)]);
        assert_eq!(settings.cooldown(), Duration::from_millis(5_000));
        assert_eq!(settings.cooldown_policy, CooldownPolicy::Between);
        assert_eq!(settings.failure_policy, FailurePolicy::Continue);
        assert_eq!(settings.score_key, ScoreKeyPath::default());
        assert_eq!(settings.device.unwrap().browser, "Chrome");
        assert!(settings.executors["WebXPRT3"].args.is_empty());
    }

    #[test]
    fn rejects_zero_runs_and_duplicates() {
        let mut settings = BenchSettings::default();
        settings.workloads = vec![WorkloadSpec::new("Speedometer2", 0)];
        assert!(settings.validate().is_err());

        settings.workloads = vec![
            WorkloadSpec::new("Speedometer2", 1),
            WorkloadSpec::new("Speedometer2", 2),
        ];
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn rejects_workload_names_that_escape_results_dir() {
        for name in ["../x", "nested/name", "win\\name", ".."] {
            let mut settings = BenchSettings::default();
            settings.workloads = vec![WorkloadSpec::new(name, 1)];
            let err = settings.validate().unwrap_err();
            assert!(err.to_string().contains("path separators"), "{name}");
        }
    }

    #[test]
    fn malformed_config_reports_path() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        let err = BenchSettings::load_or_default(&path).unwrap_err();
        assert!(err.to_string().contains("Malformed config"));
    }

    #[test]
    fn retain_workloads_filters_in_order() {
        let mut settings = BenchSettings::default();
        settings.retain_workloads(&["WebXPRT3".into()]).unwrap();
        assert_eq!(settings.workloads, vec![WorkloadSpec::new("WebXPRT3", 3)]);
        assert!(settings.retain_workloads(&["Octane".into()]).is_err());
    }

    #[test]
    fn results_root_defaults_to_results_dir() {
        let settings = BenchSettings::default();
        assert_eq!(settings.resolve_results_root(), PathBuf::from("results"));
    }
}
