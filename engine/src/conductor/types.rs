//! Shared data model for a research run
//!
//! Leads are owned by the caller for the lifetime of a batch. Plans,
//! qualifications and copy are produced once per run and never mutated
//! after construction.

use crate::store::EntityRef;
use sdk::types::{ConnectorFailure, EntityScope, FailureKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Opaque, stable lead identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeadId(String);

impl LeadId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LeadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalized company identity used to share research across leads
///
/// Built from an employer name by case-folding, deleting periods and
/// apostrophes, collapsing whitespace, trimming trailing punctuation and
/// dropping at most one trailing legal-form token. "Acme, Inc." and
/// "ACME inc" map to the same key `acme`; "Smith & Co. Ltd" keeps its
/// "& co" and becomes `smith & co`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompanyKey(String);

// "co" and "company" are left out: they are usually part of the brand
const LEGAL_SUFFIXES: &[&str] = &[
    "inc",
    "incorporated",
    "llc",
    "llp",
    "ltd",
    "limited",
    "gmbh",
    "corp",
    "corporation",
    "plc",
    "ag",
    "sa",
    "bv",
    "pty",
];

fn trim_trailing_punctuation(s: &str) -> &str {
    s.trim_end_matches(|c: char| !c.is_alphanumeric())
}

impl CompanyKey {
    /// Derive the key for an employer name; `None` for a blank name
    pub fn from_name(name: &str) -> Option<Self> {
        let folded: String = name
            .to_lowercase()
            .chars()
            .filter(|c| !matches!(c, '.' | '\''))
            .collect();
        let collapsed = folded.split_whitespace().collect::<Vec<_>>().join(" ");
        let mut key = trim_trailing_punctuation(&collapsed);

        if let Some((head, last)) = key.rsplit_once(' ') {
            let head = trim_trailing_punctuation(head);
            if LEGAL_SUFFIXES.contains(&last) && !head.is_empty() {
                key = head;
            }
        }

        if key.is_empty() {
            None
        } else {
            Some(Self(key.to_string()))
        }
    }

    /// Wrap an already-normalized key (e.g. read back from storage)
    pub fn from_normalized(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CompanyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A sales lead
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub linkedin_url: String,
}

impl Lead {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        title: impl Into<String>,
        company_name: impl Into<String>,
        linkedin_url: impl Into<String>,
    ) -> Self {
        Self {
            id: LeadId::new(id),
            name: name.into(),
            title: title.into(),
            company_name: company_name.into(),
            linkedin_url: linkedin_url.into(),
        }
    }

    /// Normalized employer identity, if the lead names an employer
    pub fn company_key(&self) -> Option<CompanyKey> {
        CompanyKey::from_name(&self.company_name)
    }

    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or("there")
    }
}

/// One described unit of research inside a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    pub seq: u32,
    pub description: String,
}

/// What a task researches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskKind {
    /// Company-level research shared by every lead at that company
    Company {
        company: CompanyKey,
        display_name: String,
        lead_ids: Vec<LeadId>,
    },
    /// Person-level research for one lead
    Profile {
        lead_id: LeadId,
        name: String,
        linkedin_url: String,
        company_name: String,
    },
}

/// A planned unit of research
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(flatten)]
    pub kind: TaskKind,
    pub subtasks: Vec<Subtask>,
    /// Subtasks came from the fixed fallback list
    pub degraded: bool,
}

impl Task {
    /// Which connectors may serve this task
    pub fn scope(&self) -> EntityScope {
        match self.kind {
            TaskKind::Company { .. } => EntityScope::Company,
            TaskKind::Profile { .. } => EntityScope::Profile,
        }
    }

    /// Entity that owns every record this task produces
    pub fn owner(&self) -> EntityRef {
        match &self.kind {
            TaskKind::Company { company, .. } => EntityRef::Company(company.clone()),
            TaskKind::Profile { lead_id, .. } => EntityRef::Lead(lead_id.clone()),
        }
    }

    /// Short human label, e.g. `company "Acme"` or `profile "Alice Smith"`
    pub fn label(&self) -> String {
        match &self.kind {
            TaskKind::Company { display_name, .. } => format!("company \"{}\"", display_name),
            TaskKind::Profile { name, .. } => format!("profile \"{}\"", name),
        }
    }
}

/// Plan-level counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStats {
    pub company_tasks: usize,
    pub profile_tasks: usize,
    /// Tasks whose subtasks fell back to the fixed list
    pub degraded_tasks: usize,
}

/// The research plan for one batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResearchPlan {
    pub tasks: Vec<Task>,
}

impl ResearchPlan {
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn company_tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks
            .iter()
            .filter(|t| matches!(t.kind, TaskKind::Company { .. }))
    }

    pub fn profile_tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks
            .iter()
            .filter(|t| matches!(t.kind, TaskKind::Profile { .. }))
    }

    pub fn stats(&self) -> PlanStats {
        PlanStats {
            company_tasks: self.company_tasks().count(),
            profile_tasks: self.profile_tasks().count(),
            degraded_tasks: self.tasks.iter().filter(|t| t.degraded).count(),
        }
    }
}

/// A subtask mapped onto one concrete connector invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedCall {
    pub subtask_seq: u32,
    pub connector: String,
    /// Schema-validated arguments, defaults filled in
    pub args: Value,
}

/// Priority tier derived from score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub const HIGH_MIN: u8 = 75;
    pub const MEDIUM_MIN: u8 = 50;

    pub fn from_score(score: u8) -> Self {
        if score >= Self::HIGH_MIN {
            Self::High
        } else if score >= Self::MEDIUM_MIN {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

/// Scored fit assessment for one lead
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Qualification {
    pub score: u8,
    pub priority: Priority,
    pub reasons: Vec<String>,
    pub concerns: Vec<String>,
    pub hooks: Vec<String>,
    /// Set when scoring failed and this is the default qualification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl Qualification {
    /// Default qualification emitted when scoring fails
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            score: 0,
            priority: Priority::Low,
            reasons: vec!["qualification failed".to_string()],
            concerns: Vec::new(),
            hooks: Vec::new(),
            failure: Some(reason.into()),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }
}

/// Generated outreach artifacts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalizedCopy {
    pub subject_line: String,
    pub email_body: String,
    pub linkedin_message: String,
    pub talking_points: Vec<String>,
    /// Generic template used because generation failed
    pub fallback: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

/// Why a lead does or does not carry copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CopyStatus {
    BelowThreshold,
    Generated,
    Fallback,
}

impl fmt::Display for CopyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BelowThreshold => write!(f, "below_threshold"),
            Self::Generated => write!(f, "generated"),
            Self::Fallback => write!(f, "fallback"),
        }
    }
}

/// Short human-readable digest of what research found
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchSummary {
    pub profile_highlights: Vec<String>,
    pub company_highlights: Vec<String>,
    pub recent_activity: Vec<String>,
}

/// A connector that failed for this lead
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedConnector {
    pub connector: String,
    pub kind: FailureKind,
    pub reason: String,
}

impl FailedConnector {
    pub fn new(connector: &str, failure: &ConnectorFailure) -> Self {
        Self {
            connector: connector.to_string(),
            kind: failure.kind,
            reason: failure.reason.clone(),
        }
    }
}

/// Which connectors produced data for a lead
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectorReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<FailedConnector>,
}

/// Final per-lead output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadResult {
    pub lead: Lead,
    pub qualification: Qualification,
    pub personalized_copy: Option<PersonalizedCopy>,
    pub copy_status: CopyStatus,
    pub research_summary: ResearchSummary,
    pub connectors: ConnectorReport,
}
