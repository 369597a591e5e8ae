//! Research conductor
//!
//! Plans research for a lead batch, executes it against the connectors,
//! then qualifies each lead and drafts outreach from what was stored.

pub mod copywriter;
pub mod executor;
pub mod pipeline;
pub mod planner;
pub mod prompts;
pub mod qualifier;
pub mod resolver;
pub mod signals;
pub mod types;

pub use copywriter::CopyGenerator;
pub use executor::{ExecutionReport, ExecutionStats, Executor};
pub use pipeline::{BatchReport, Pipeline, PipelineOptions};
pub use planner::Planner;
pub use qualifier::Qualifier;
pub use resolver::{CallResolver, KeywordResolver, ModelResolver, Resolution};
pub use types::{
    CompanyKey, CopyStatus, Lead, LeadId, LeadResult, PersonalizedCopy, Priority, Qualification,
    ResearchPlan, Task, TaskKind,
};
