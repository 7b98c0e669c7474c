use std::time::Duration;

use tracing::{debug, info};

use crate::aggregate::select_representative;
use crate::config::{CooldownPolicy, DEFAULT_COOLDOWN_MS, WorkloadSpec};
use crate::error::{BenchError, Result};
use crate::executor::Executor;
use crate::score::{ScoreKeyPath, ScoreRecord};

/// Runs one workload repeatedly and reduces the batch to its lower-median run.
#[derive(Debug, Clone)]
pub struct WorkloadRunner {
    cooldown: Duration,
    cooldown_policy: CooldownPolicy,
    score_key: ScoreKeyPath,
}

impl Default for WorkloadRunner {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_millis(DEFAULT_COOLDOWN_MS),
            cooldown_policy: CooldownPolicy::default(),
            score_key: ScoreKeyPath::default(),
        }
    }
}

impl WorkloadRunner {
    pub fn new(
        cooldown: Duration,
        cooldown_policy: CooldownPolicy,
        score_key: ScoreKeyPath,
    ) -> Self {
        Self {
            cooldown,
            cooldown_policy,
            score_key,
        }
    }

    /// Execute `spec.run_times` sequential runs and return the representative record.
    ///
    /// The first executor failure aborts the batch; nothing is aggregated.
    pub async fn run_workload(
        &self,
        spec: &WorkloadSpec,
        executor: &dyn Executor,
    ) -> Result<ScoreRecord> {
        if spec.run_times == 0 {
            return Err(BenchError::EmptyRuns {
                workload: spec.name.clone(),
            });
        }

        let mut records = Vec::with_capacity(spec.run_times as usize);
        for run in 1..=spec.run_times {
            info!(workload = %spec.name, run, run_times = spec.run_times, "Starting run");
            let record = executor
                .execute(spec)
                .await
                .map_err(|err| BenchError::Executor {
                    workload: spec.name.clone(),
                    run,
                    run_times: spec.run_times,
                    source: err.into(),
                })?;
            debug!(
                workload = %spec.name,
                run,
                score = ?record.sort_key(&self.score_key),
                "Run finished"
            );
            records.push(record);

            if self.should_cool_down(run, spec.run_times) {
                tokio::time::sleep(self.cooldown).await;
            }
        }

        let selected = select_representative(&spec.name, records, &self.score_key)?;
        info!(
            workload = %spec.name,
            score = ?selected.sort_key(&self.score_key),
            "Selected median run"
        );
        Ok(selected)
    }

    fn should_cool_down(&self, run: u32, run_times: u32) -> bool {
        if self.cooldown.is_zero() {
            return false;
        }
        match self.cooldown_policy {
            CooldownPolicy::AfterEach => true,
            CooldownPolicy::Between => run < run_times,
        }
    }
}
