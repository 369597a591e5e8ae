//! Batch pipeline
//!
//! plan -> execute -> per lead (concurrently): aggregate -> qualify -> copy.
//! A lead's qualification starts only after execution has finished, so it
//! always sees every record the plan produced for it.

use crate::conductor::copywriter::CopyGenerator;
use crate::conductor::executor::{ExecutionReport, ExecutionStats, Executor, ResolutionMiss};
use crate::conductor::planner::Planner;
use crate::conductor::qualifier::Qualifier;
use crate::conductor::resolver::CallResolver;
use crate::conductor::signals::{self, ACTIVITY, COMPANY, PROFILE};
use crate::conductor::types::{
    ConnectorReport, CopyStatus, FailedConnector, Lead, LeadResult, PlanStats, Priority,
    ResearchPlan, ResearchSummary,
};
use crate::config::Config;
use crate::connectors::ConnectorRegistry;
use crate::llm::LLMRouter;
use crate::store::{AggregatedContext, ContextStore};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Run-level knobs
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub campaign: String,
    /// Minimum score that triggers copy generation (inclusive)
    pub threshold: u8,
    pub max_concurrent_calls: usize,
    pub connector_timeout: Duration,
}

impl PipelineOptions {
    pub fn from_config(config: &Config, campaign: impl Into<String>) -> Self {
        Self {
            campaign: campaign.into(),
            threshold: config.qualification.threshold,
            max_concurrent_calls: config.research.max_concurrent_calls,
            connector_timeout: Duration::from_secs(config.research.connector_timeout_secs),
        }
    }
}

/// Everything one batch produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub namespace: String,
    pub results: Vec<LeadResult>,
    pub total_processed: usize,
    /// Leads that received copy, fallback copy included
    pub total_qualified: usize,
    pub plan: PlanStats,
    pub execution: ExecutionStats,
    pub unresolved_subtasks: Vec<ResolutionMiss>,
    /// The run was cancelled; `results` covers only leads finished before that
    pub cancelled: bool,
}

impl BatchReport {
    pub fn count_priority(&self, priority: Priority) -> usize {
        self.results
            .iter()
            .filter(|r| r.qualification.priority == priority)
            .count()
    }
}

pub struct Pipeline {
    planner: Planner,
    executor: Executor,
    qualifier: Qualifier,
    copywriter: CopyGenerator,
    store: Arc<dyn ContextStore>,
    campaign: String,
    threshold: u8,
}

impl Pipeline {
    pub fn new(
        router: Arc<LLMRouter>,
        registry: Arc<ConnectorRegistry>,
        resolver: Arc<dyn CallResolver>,
        store: Arc<dyn ContextStore>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            planner: Planner::new(Arc::clone(&router), Arc::clone(&registry)),
            executor: Executor::new(
                Arc::clone(&registry),
                resolver,
                Arc::clone(&store),
                options.max_concurrent_calls,
                options.connector_timeout,
            ),
            qualifier: Qualifier::new(Arc::clone(&router), &options.campaign, &registry),
            copywriter: CopyGenerator::new(router, &options.campaign),
            store,
            campaign: options.campaign,
            threshold: options.threshold,
        }
    }

    /// Plan only, without touching connectors or the store
    pub async fn plan(&self, leads: &[Lead]) -> ResearchPlan {
        self.planner.plan(leads, &self.campaign).await
    }

    /// Process a batch end to end
    pub async fn run(&self, leads: &[Lead], cancel: &CancellationToken) -> BatchReport {
        let start = Instant::now();
        info!(
            "Processing {} leads in namespace '{}'",
            leads.len(),
            self.store.namespace()
        );

        let plan = tokio::select! {
            _ = cancel.cancelled() => {
                info!("Run cancelled during planning");
                ResearchPlan::default()
            }
            plan = self.plan(leads) => plan,
        };
        let execution = if cancel.is_cancelled() {
            ExecutionReport::default()
        } else {
            self.executor.execute(&plan, cancel).await
        };

        let results: Vec<LeadResult> = if cancel.is_cancelled() {
            Vec::new()
        } else {
            join_all(leads.iter().map(|lead| async move {
                tokio::select! {
                    _ = cancel.cancelled() => None,
                    result = self.process_lead(lead) => Some(result),
                }
            }))
            .await
            .into_iter()
            .flatten()
            .collect()
        };

        let total_qualified = results
            .iter()
            .filter(|r| r.personalized_copy.is_some())
            .count();

        let report = BatchReport {
            namespace: self.store.namespace().to_string(),
            total_processed: results.len(),
            total_qualified,
            plan: plan.stats(),
            execution: execution.stats,
            unresolved_subtasks: execution.misses,
            cancelled: cancel.is_cancelled(),
            results,
        };

        info!(
            "Processed {} leads in {:.1}s: {} high, {} medium, {} low priority, copy for {}",
            report.total_processed,
            start.elapsed().as_secs_f64(),
            report.count_priority(Priority::High),
            report.count_priority(Priority::Medium),
            report.count_priority(Priority::Low),
            report.total_qualified
        );
        if report.cancelled {
            info!("Run cancelled; stored records up to cancellation remain valid");
        }

        report
    }

    async fn process_lead(&self, lead: &Lead) -> LeadResult {
        let company = lead.company_key();
        let ctx = match self.store.aggregate(&lead.id, company.as_ref()).await {
            Ok(ctx) => ctx,
            Err(e) => {
                error!("Failed to read context for {}: {}", lead.id, e);
                AggregatedContext::default()
            }
        };

        let qualification = self.qualifier.qualify(lead, &ctx).await;

        let (personalized_copy, copy_status) = if qualification.score >= self.threshold {
            let copy = self.copywriter.generate(lead, &qualification, &ctx).await;
            let status = if copy.fallback {
                CopyStatus::Fallback
            } else {
                CopyStatus::Generated
            };
            (Some(copy), status)
        } else {
            (None, CopyStatus::BelowThreshold)
        };

        info!(
            "{}: {}/100 ({} priority), copy {}",
            lead.name, qualification.score, qualification.priority, copy_status
        );

        LeadResult {
            lead: lead.clone(),
            qualification,
            personalized_copy,
            copy_status,
            research_summary: research_summary(&ctx),
            connectors: connector_report(&ctx),
        }
    }
}

pub fn research_summary(ctx: &AggregatedContext) -> ResearchSummary {
    let or_placeholder = |items: Vec<String>, placeholder: &str| {
        if items.is_empty() {
            vec![placeholder.to_string()]
        } else {
            items
        }
    };

    ResearchSummary {
        profile_highlights: or_placeholder(
            ctx.payload(PROFILE)
                .map(signals::profile_highlights)
                .unwrap_or_default(),
            "No profile data",
        ),
        company_highlights: or_placeholder(
            ctx.payload(COMPANY)
                .map(signals::company_highlights)
                .unwrap_or_default(),
            "No company data",
        ),
        recent_activity: or_placeholder(
            ctx.payload(ACTIVITY)
                .map(|p| signals::post_snippets(p, 2, 100))
                .unwrap_or_default(),
            "No recent activity",
        ),
    }
}

pub fn connector_report(ctx: &AggregatedContext) -> ConnectorReport {
    ConnectorReport {
        succeeded: ctx.succeeded().into_iter().map(String::from).collect(),
        failed: ctx
            .failed()
            .into_iter()
            .map(|(name, failure)| FailedConnector::new(name, failure))
            .collect(),
    }
}
