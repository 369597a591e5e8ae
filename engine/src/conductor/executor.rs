//! Research executor
//!
//! Runs a [`ResearchPlan`]: every task concurrently, and within a task every
//! resolved call concurrently. Connector calls share one semaphore so the
//! number of outstanding external requests never exceeds the configured cap;
//! excess calls queue for a permit. Every completed call is written to the
//! context store under the task's owning entity, success or failure alike.

use crate::conductor::resolver::CallResolver;
use crate::conductor::types::{ResearchPlan, ResolvedCall, Task};
use crate::connectors::ConnectorRegistry;
use crate::store::{ContextStore, EntityRef};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Counters for one execution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionStats {
    pub tasks: usize,
    pub resolved_calls: usize,
    pub resolution_misses: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Calls abandoned because the run was cancelled; nothing was written for them
    pub cancelled: usize,
    pub store_write_failures: usize,
}

impl ExecutionStats {
    fn absorb(&mut self, other: &ExecutionStats) {
        self.tasks += other.tasks;
        self.resolved_calls += other.resolved_calls;
        self.resolution_misses += other.resolution_misses;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.cancelled += other.cancelled;
        self.store_write_failures += other.store_write_failures;
    }
}

/// A subtask no connector could serve
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionMiss {
    pub task_id: String,
    pub subtask_seq: u32,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub stats: ExecutionStats,
    pub misses: Vec<ResolutionMiss>,
}

enum CallOutcome {
    Succeeded,
    Failed,
    Cancelled,
}

pub struct Executor {
    registry: Arc<ConnectorRegistry>,
    resolver: Arc<dyn CallResolver>,
    store: Arc<dyn ContextStore>,
    limiter: Arc<Semaphore>,
    call_timeout: Duration,
}

impl Executor {
    pub fn new(
        registry: Arc<ConnectorRegistry>,
        resolver: Arc<dyn CallResolver>,
        store: Arc<dyn ContextStore>,
        max_concurrent_calls: usize,
        call_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            resolver,
            store,
            limiter: Arc::new(Semaphore::new(max_concurrent_calls.max(1))),
            call_timeout,
        }
    }

    /// Execute every task in the plan
    ///
    /// Never fails as a whole: connector failures become failure records,
    /// unresolvable subtasks become misses, and a cancelled run keeps every
    /// record written before cancellation.
    pub async fn execute(
        &self,
        plan: &ResearchPlan,
        cancel: &CancellationToken,
    ) -> ExecutionReport {
        let start = Instant::now();
        info!(
            "Executing {} tasks with up to {} concurrent connector calls (resolver: {})",
            plan.tasks.len(),
            self.limiter.available_permits(),
            self.resolver.name()
        );

        let reports = join_all(plan.tasks.iter().map(|task| self.run_task(task, cancel))).await;

        let mut report = ExecutionReport::default();
        for task_report in reports {
            report.stats.absorb(&task_report.stats);
            report.misses.extend(task_report.misses);
        }

        info!(
            "Execution finished in {:.1}s: {} calls, {} succeeded, {} failed, {} cancelled, {} unresolved subtasks",
            start.elapsed().as_secs_f64(),
            report.stats.resolved_calls,
            report.stats.succeeded,
            report.stats.failed,
            report.stats.cancelled,
            report.stats.resolution_misses
        );
        if report.stats.store_write_failures > 0 {
            error!(
                "{} connector outcomes could not be stored",
                report.stats.store_write_failures
            );
        }

        report
    }

    async fn run_task(&self, task: &Task, cancel: &CancellationToken) -> ExecutionReport {
        let mut report = ExecutionReport::default();
        report.stats.tasks = 1;

        if cancel.is_cancelled() {
            return report;
        }

        let resolution = tokio::select! {
            _ = cancel.cancelled() => return report,
            resolution = self.resolver.resolve(task, &self.registry) => resolution,
        };

        for seq in &resolution.misses {
            let description = task
                .subtasks
                .iter()
                .find(|s| s.seq == *seq)
                .map(|s| s.description.clone())
                .unwrap_or_default();
            warn!(
                task = %task.id,
                degradation = "resolution_miss",
                "No connector for subtask {} of {}: {}",
                seq,
                task.label(),
                description
            );
            report.misses.push(ResolutionMiss {
                task_id: task.id.clone(),
                subtask_seq: *seq,
                description,
            });
        }
        report.stats.resolution_misses = resolution.misses.len();
        report.stats.resolved_calls = resolution.calls.len();

        let owner = task.owner();
        let outcomes = join_all(
            resolution
                .calls
                .iter()
                .map(|call| self.run_call(&owner, call, cancel)),
        )
        .await;

        for (outcome, write_failed) in outcomes {
            match outcome {
                CallOutcome::Succeeded => report.stats.succeeded += 1,
                CallOutcome::Failed => report.stats.failed += 1,
                CallOutcome::Cancelled => report.stats.cancelled += 1,
            }
            if write_failed {
                report.stats.store_write_failures += 1;
            }
        }

        debug!(
            "{} done: {} succeeded, {} failed",
            task.label(),
            report.stats.succeeded,
            report.stats.failed
        );
        report
    }

    /// Run one call and record its outcome; returns whether the store write failed
    async fn run_call(
        &self,
        owner: &EntityRef,
        call: &ResolvedCall,
        cancel: &CancellationToken,
    ) -> (CallOutcome, bool) {
        let permit = tokio::select! {
            _ = cancel.cancelled() => return (CallOutcome::Cancelled, false),
            permit = Arc::clone(&self.limiter).acquire_owned() => permit,
        };
        // The semaphore is never closed
        let Ok(_permit) = permit else {
            return (CallOutcome::Cancelled, false);
        };

        let output = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Abandoned {} for {} on cancellation", call.connector, owner);
                return (CallOutcome::Cancelled, false);
            }
            output = self.registry.invoke(&call.connector, &call.args, self.call_timeout) => output,
        };

        let outcome = match output.failure() {
            None => CallOutcome::Succeeded,
            Some(failure) => {
                warn!(
                    entity = %owner,
                    connector = %call.connector,
                    degradation = "connector_failure",
                    "{} failed for {}: {}",
                    call.connector,
                    owner,
                    failure
                );
                CallOutcome::Failed
            }
        };

        let write_failed = match self
            .store
            .put(owner, &call.connector, &call.args, &output)
            .await
        {
            Ok(key) => {
                debug!("Recorded {}", key);
                false
            }
            Err(e) => {
                error!("Failed to store {} result for {}: {}", call.connector, owner, e);
                true
            }
        };

        (outcome, write_failed)
    }
}
