//! Research planner
//!
//! Turns a lead batch into a [`ResearchPlan`]: one company task per distinct
//! employer (shared by every lead there) and one profile task per lead. The
//! model only fills in subtask descriptions; task structure is decided here
//! so it never depends on model output.

use crate::conductor::prompts::{planning_prompt, PLANNING_SYSTEM};
use crate::conductor::types::{CompanyKey, Lead, LeadId, ResearchPlan, Subtask, Task, TaskKind};
use crate::connectors::ConnectorRegistry;
use crate::llm::{GenerationOptions, LLMRouter};
use futures::future::join_all;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

const PLANNING_TEMPERATURE: f32 = 0.2;
const MAX_SUBTASKS: usize = 8;

/// Subtask list as the model may phrase it
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawSubtaskList {
    Wrapped { subtasks: Vec<RawSubtask> },
    Bare(Vec<RawSubtask>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawSubtask {
    Text(String),
    Described { description: String },
}

impl RawSubtaskList {
    fn into_subtasks(self) -> Vec<Subtask> {
        let items = match self {
            Self::Wrapped { subtasks } => subtasks,
            Self::Bare(items) => items,
        };

        items
            .into_iter()
            .map(|item| match item {
                RawSubtask::Text(text) => text,
                RawSubtask::Described { description } => description,
            })
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .take(MAX_SUBTASKS)
            .enumerate()
            .map(|(i, description)| Subtask {
                seq: i as u32 + 1,
                description,
            })
            .collect()
    }
}

pub struct Planner {
    router: Arc<LLMRouter>,
    registry: Arc<ConnectorRegistry>,
}

impl Planner {
    pub fn new(router: Arc<LLMRouter>, registry: Arc<ConnectorRegistry>) -> Self {
        Self { router, registry }
    }

    /// Plan research for a batch
    ///
    /// An empty batch yields an empty plan. Subtask generation runs once per
    /// task, concurrently; any failure falls back to the fixed subtask list
    /// for that task, so a non-empty batch always yields a non-empty plan.
    pub async fn plan(&self, leads: &[Lead], campaign: &str) -> ResearchPlan {
        let skeleton = skeleton(leads);
        if skeleton.is_empty() {
            return ResearchPlan::default();
        }

        let tasks = join_all(skeleton.into_iter().map(|task| self.detail(task, campaign))).await;
        let plan = ResearchPlan { tasks };

        let stats = plan.stats();
        info!(
            "Planned {} tasks ({} company, {} profile, {} degraded) for {} leads",
            plan.tasks.len(),
            stats.company_tasks,
            stats.profile_tasks,
            stats.degraded_tasks,
            leads.len()
        );

        plan
    }

    async fn detail(&self, mut task: Task, campaign: &str) -> Task {
        let sources = self.registry.describe_for_prompt(task.scope());
        let prompt = planning_prompt(&task, campaign, &sources);

        let generated = self
            .router
            .complete_json::<RawSubtaskList>(
                PLANNING_SYSTEM,
                &prompt,
                &GenerationOptions::structured(PLANNING_TEMPERATURE),
            )
            .await;

        match generated.map(RawSubtaskList::into_subtasks) {
            Ok(subtasks) if !subtasks.is_empty() => {
                debug!("{} planned with {} subtasks", task.id, subtasks.len());
                task.subtasks = subtasks;
                task.degraded = false;
            }
            Ok(_) => {
                warn!(
                    task = %task.id,
                    degradation = "planning_degraded",
                    "Model returned no subtasks for {}, using fallback list",
                    task.label()
                );
            }
            Err(e) => {
                warn!(
                    task = %task.id,
                    degradation = "planning_degraded",
                    "Subtask generation failed for {}: {}, using fallback list",
                    task.label(),
                    e
                );
            }
        }

        task
    }
}

/// Task structure for a batch, every task carrying its fallback subtasks
///
/// Company tasks come first, in order of each company's first lead; profile
/// tasks follow in lead order. Leads with a blank employer get no company task.
pub fn skeleton(leads: &[Lead]) -> Vec<Task> {
    let mut companies: Vec<(CompanyKey, String, Vec<LeadId>)> = Vec::new();
    let mut index: HashMap<CompanyKey, usize> = HashMap::new();

    for lead in leads {
        let Some(key) = lead.company_key() else {
            continue;
        };
        match index.get(&key) {
            Some(&i) => companies[i].2.push(lead.id.clone()),
            None => {
                index.insert(key.clone(), companies.len());
                let display_name = lead.company_name.trim().to_string();
                companies.push((key, display_name, vec![lead.id.clone()]));
            }
        }
    }

    let company_tasks = companies
        .into_iter()
        .map(|(company, display_name, lead_ids)| TaskKind::Company {
            company,
            display_name,
            lead_ids,
        });

    let profile_tasks = leads.iter().map(|lead| TaskKind::Profile {
        lead_id: lead.id.clone(),
        name: lead.name.clone(),
        linkedin_url: lead.linkedin_url.trim().to_string(),
        company_name: lead.company_name.clone(),
    });

    company_tasks
        .chain(profile_tasks)
        .enumerate()
        .map(|(i, kind)| Task {
            id: format!("task_{}", i + 1),
            subtasks: fallback_subtasks(&kind),
            kind,
            degraded: true,
        })
        .collect()
}

/// Fixed minimal subtasks for a task kind
pub fn fallback_subtasks(kind: &TaskKind) -> Vec<Subtask> {
    let descriptions = match kind {
        TaskKind::Company { display_name, .. } => vec![
            format!("Get LinkedIn company page for {}", display_name),
            format!("Get recent company posts for {}", display_name),
            format!("Get company news for {}", display_name),
        ],
        TaskKind::Profile {
            name, linkedin_url, ..
        } => {
            let target = if linkedin_url.is_empty() { name } else { linkedin_url };
            vec![
                format!("Get LinkedIn profile for {}", target),
                format!("Get recent activity for {}", target),
            ]
        }
    };

    descriptions
        .into_iter()
        .enumerate()
        .map(|(i, description)| Subtask {
            seq: i as u32 + 1,
            description,
        })
        .collect()
}
