use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{Instrument, error, info, info_span};

use crate::config::{BenchSettings, FailurePolicy, WorkloadSpec};
use crate::device::DeviceInfo;
use crate::error::{BenchError, Result};
use crate::executor::{Executor, ExecutorRegistry};
use crate::runner::WorkloadRunner;
use crate::writer::{ResultRecord, ResultWriter};

/// Artifact location for one workload, in configuration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryEntry {
    pub workload: String,
    pub path: PathBuf,
}

/// Workload that failed under [`FailurePolicy::Continue`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkloadFailure {
    pub workload: String,
    pub error: String,
}

/// Workload name to artifact path for one orchestration pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultsSummary {
    entries: Vec<SummaryEntry>,
    failures: Vec<WorkloadFailure>,
}

impl ResultsSummary {
    pub fn get(&self, workload: &str) -> Option<&Path> {
        self.entries
            .iter()
            .find(|entry| entry.workload == workload)
            .map(|entry| entry.path.as_path())
    }

    pub fn entries(&self) -> &[SummaryEntry] {
        &self.entries
    }

    pub fn failures(&self) -> &[WorkloadFailure] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `{"<workload>": "<absolute path>", ...}` in configuration order.
    pub fn to_json(&self) -> Value {
        let map = self
            .entries
            .iter()
            .map(|entry| {
                (
                    entry.workload.clone(),
                    Value::String(entry.path.to_string_lossy().into_owned()),
                )
            })
            .collect::<serde_json::Map<_, _>>();
        Value::Object(map)
    }
}

/// Drives every configured workload through run, aggregate and persist.
#[derive(Debug, Clone)]
pub struct BenchmarkOrchestrator {
    runner: WorkloadRunner,
    writer: ResultWriter,
    registry: ExecutorRegistry,
    failure_policy: FailurePolicy,
}

impl BenchmarkOrchestrator {
    pub fn new(runner: WorkloadRunner, writer: ResultWriter, registry: ExecutorRegistry) -> Self {
        Self {
            runner,
            writer,
            registry,
            failure_policy: FailurePolicy::default(),
        }
    }

    /// Assemble runner and writer from settings; executors are injected separately.
    pub fn from_settings(
        settings: &BenchSettings,
        registry: ExecutorRegistry,
    ) -> anyhow::Result<Self> {
        let runner = WorkloadRunner::new(
            settings.cooldown(),
            settings.cooldown_policy,
            settings.score_key.clone(),
        );
        let writer = ResultWriter::new(settings.resolve_results_root())?;
        Ok(Self::new(runner, writer, registry).with_failure_policy(settings.failure_policy))
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn writer(&self) -> &ResultWriter {
        &self.writer
    }

    /// Run every workload in order and return where each artifact landed.
    ///
    /// Executors are resolved for all workloads before the first run starts.
    pub async fn run_all(
        &self,
        device: &DeviceInfo,
        workloads: &[WorkloadSpec],
    ) -> Result<ResultsSummary> {
        let executors = self.resolve_executors(workloads)?;
        let mut summary = ResultsSummary::default();

        for (spec, executor) in workloads.iter().zip(executors) {
            let span = info_span!("workload", name = %spec.name, run_times = spec.run_times);
            let outcome = self
                .run_one(device, spec, executor.as_ref())
                .instrument(span)
                .await;

            match outcome {
                Ok(path) => summary.entries.push(SummaryEntry {
                    workload: spec.name.clone(),
                    path,
                }),
                Err(err) if self.failure_policy == FailurePolicy::Continue => {
                    error!(workload = %spec.name, error = %err, "Workload failed; continuing");
                    summary.failures.push(WorkloadFailure {
                        workload: spec.name.clone(),
                        error: error_chain(&err),
                    });
                }
                Err(err) => return Err(err),
            }
        }

        info!(
            completed = summary.entries.len(),
            failed = summary.failures.len(),
            "Benchmark pass finished"
        );
        Ok(summary)
    }

    fn resolve_executors(
        &self,
        workloads: &[WorkloadSpec],
    ) -> Result<Vec<Arc<dyn Executor>>> {
        workloads
            .iter()
            .map(|spec| {
                self.registry
                    .get(&spec.name)
                    .ok_or_else(|| BenchError::MissingExecutor {
                        workload: spec.name.clone(),
                    })
            })
            .collect()
    }

    async fn run_one(
        &self,
        device: &DeviceInfo,
        spec: &WorkloadSpec,
        executor: &dyn Executor,
    ) -> Result<PathBuf> {
        let selected = self.runner.run_workload(spec, executor).await?;
        let record = ResultRecord {
            workload: spec.name.clone(),
            device_info: device.clone(),
            test_result: selected.scores().cloned().unwrap_or(Value::Null),
            execution_date: selected.date().cloned().unwrap_or(Value::Null),
        };

        match serde_json::to_string_pretty(&record) {
            Ok(rendered) => info!(workload = %spec.name, "Result record\n{rendered}"),
            Err(err) => {
                error!(workload = %spec.name, error = %err, "Unable to render result record")
            }
        }

        let path = self.writer.persist(device, spec, &record)?;
        info!(workload = %spec.name, path = %path.display(), "Stored workload result");
        Ok(path)
    }
}

fn error_chain(err: &BenchError) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = std::error::Error::source(cause);
    }
    message
}
