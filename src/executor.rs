use std::{collections::HashMap, process::Stdio, sync::Arc};

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::config::{BenchSettings, CommandExecutorConfig, WorkloadSpec};
use crate::score::ScoreRecord;

/// Environment variable carrying the workload name to command executors.
pub const WORKLOAD_ENV: &str = "WEBBENCH_WORKLOAD";

/// Environment variable carrying the configured repeat count to command executors.
pub const RUN_TIMES_ENV: &str = "WEBBENCH_RUN_TIMES";

/// Performs one run of a workload and reports its score record.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, spec: &WorkloadSpec) -> Result<ScoreRecord>;
}

/// Name-keyed set of executors, one per workload type.
#[derive(Default, Clone)]
pub struct ExecutorRegistry {
    executors: HashMap<String, Arc<dyn Executor>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build command executors for every entry in the settings' `executors` table.
    pub fn from_settings(settings: &BenchSettings) -> Self {
        let mut registry = Self::new();
        for (name, config) in &settings.executors {
            registry.register(name.clone(), CommandExecutor::new(config.clone()));
        }
        registry
    }

    /// Register `executor` under `name`, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, executor: impl Executor + 'static) {
        self.executors.insert(name.into(), Arc::new(executor));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Executor>> {
        self.executors.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.executors.contains_key(name)
    }

    /// Registered workload names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.executors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for ExecutorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutorRegistry")
            .field("executors", &self.names())
            .finish()
    }
}

/// Runs an external program per benchmark run and parses its stdout as JSON.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    config: CommandExecutorConfig,
}

impl CommandExecutor {
    pub fn new(config: CommandExecutorConfig) -> Self {
        Self { config }
    }

    pub fn describe(&self) -> String {
        let args = self.config.args.join(" ");
        format!("{} {}", self.config.program.display(), args)
            .trim_end()
            .to_string()
    }

    fn command(&self, spec: &WorkloadSpec) -> Command {
        let mut command = Command::new(&self.config.program);
        command
            .args(&self.config.args)
            .env(WORKLOAD_ENV, &spec.name)
            .env(RUN_TIMES_ENV, spec.run_times.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for var in &self.config.env {
            command.env(&var.key, &var.value);
        }
        if let Some(dir) = &self.config.working_dir {
            command.current_dir(dir);
        }
        command
    }
}

#[async_trait]
impl Executor for CommandExecutor {
    async fn execute(&self, spec: &WorkloadSpec) -> Result<ScoreRecord> {
        debug!(workload = %spec.name, command = %self.describe(), "Spawning workload executor");
        let output = self
            .command(spec)
            .output()
            .await
            .with_context(|| format!("Failed to spawn executor `{}`", self.describe()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "executor `{}` exited with {}: {}",
                self.describe(),
                output.status,
                stderr.trim()
            );
        }

        let record: ScoreRecord = serde_json::from_slice(&output.stdout).with_context(|| {
            format!(
                "executor `{}` did not print a JSON score record",
                self.describe()
            )
        })?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnvVar;
    use serde_json::json;

    struct Fixed(f64);

    #[async_trait]
    impl Executor for Fixed {
        async fn execute(&self, _spec: &WorkloadSpec) -> Result<ScoreRecord> {
            Ok(ScoreRecord::new(json!({"scores": {"Total Score": self.0}})))
        }
    }

    #[test]
    fn registry_lookup_by_name() {
        let mut registry = ExecutorRegistry::new();
        registry.register("WebXPRT3", Fixed(1.0));
        registry.register("Speedometer2", Fixed(2.0));
        assert!(registry.contains("Speedometer2"));
        assert!(registry.get("Octane").is_none());
        assert_eq!(registry.names(), vec!["Speedometer2", "WebXPRT3"]);
    }

    #[test]
    fn registry_from_settings_uses_executor_table() {
        let mut settings = BenchSettings::default();
        settings.executors.insert(
            "Speedometer2".into(),
            CommandExecutorConfig {
                program: "/opt/bench/speedometer".into(),
                args: vec!["--headless".into()],
                env: vec![],
                working_dir: None,
            },
        );
        let registry = ExecutorRegistry::from_settings(&settings);
        assert_eq!(registry.names(), vec!["Speedometer2"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_executor_parses_stdout() {
        let executor = CommandExecutor::new(CommandExecutorConfig {
            program: "/bin/sh".into(),
            args: vec![
                "-c".into(),
                r#"printf '{"scores":{"Total Score":"%s"},"date":"%s"}' "$BENCH_SCORE" "$WEBBENCH_WORKLOAD""#
                    .into(),
            ],
            env: vec![EnvVar {
                key: "BENCH_SCORE".into(),
                value: "88.1".into(),
            }],
            working_dir: None,
        });
        let record = executor
            .execute(&WorkloadSpec::new("Speedometer2", 3))
            .await
            .unwrap();
        assert_eq!(record.scores(), Some(&json!({"Total Score": "88.1"})));
        assert_eq!(record.date(), Some(&json!("Speedometer2")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_executor_reports_failure_status() {
        let executor = CommandExecutor::new(CommandExecutorConfig {
            program: "/bin/sh".into(),
            args: vec!["-c".into(), "echo 'browser crashed' >&2; exit 3".into()],
            env: vec![],
            working_dir: None,
        });
        let err = executor
            .execute(&WorkloadSpec::new("WebXPRT3", 1))
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("browser crashed"), "{message}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_executor_rejects_non_json_output() {
        let executor = CommandExecutor::new(CommandExecutorConfig {
            program: "/bin/sh".into(),
            args: vec!["-c".into(), "echo done".into()],
            env: vec![],
            working_dir: None,
        });
        let err = executor
            .execute(&WorkloadSpec::new("WebXPRT3", 1))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("did not print a JSON score record"));
    }
}
