//! Model prompts used by the conductor stages
//!
//! Every prompt asks for a JSON object, since the OpenAI backend runs in
//! JSON-object mode and rejects bare arrays.

use crate::conductor::types::{Lead, Qualification, Task, TaskKind};

/// Campaign used when the caller supplies none
pub const DEFAULT_CAMPAIGN: &str = "\
We sell a managed data platform that replaces hand-maintained ETL pipelines.

Target profile:
- Roles: CTOs, VPs of Engineering, Heads of Data, Data Platform leads
- Companies: 200+ employees, B2B SaaS, fintech, e-commerce, healthcare
- Signals: growing data team, recent funding, migration to a cloud warehouse

Pain points:
1. Pipelines break silently and data teams spend their week firefighting
2. Warehouse costs grow faster than usage
3. Hiring senior data engineers is slow and expensive

Offer: a free two-week pipeline reliability assessment with a fixed-price migration plan.";

pub const PLANNING_SYSTEM: &str = "\
You plan research for a B2B sales qualification workflow.

You receive ONE research task, either about a company or about a person, and the \
data sources that can serve it. Break the task into short, specific research steps. \
Each step must describe exactly ONE data fetch that one of the listed data sources can perform. \
Only plan what helps judge fit for the campaign or personalize outreach.

Respond with a JSON object and nothing else:
{\"subtasks\": [\"Get LinkedIn company page for Acme\", \"Get recent news about Acme\"]}";

pub const RESOLUTION_SYSTEM: &str = "\
You map research steps onto data source calls.

For every numbered step, choose the single data source that performs it and fill in its \
arguments exactly as the signature declares. Use the entity details given; never invent \
URLs or names. Skip a step when no listed data source fits it.

Respond with a JSON object and nothing else:
{\"calls\": [{\"subtask\": 1, \"connector\": \"get_linkedin_company\", \"arguments\": {\"company_name\": \"Acme\"}}]}";

pub const QUALIFICATION_SYSTEM: &str = "\
You are a B2B lead qualification analyst.

Judge how well the lead fits the campaign below using ONLY the signals provided. \
Signals marked unavailable were not collected: do not guess what they would contain, \
and mention missing data as a concern when it matters.

Scoring guide:
- 80-100: strong fit with clear timing signals
- 60-79: matches the target profile with some relevant signals
- 40-59: partial match, needs more research
- 0-39: poor fit or clear red flags

Respond with a JSON object and nothing else:
{\"score\": 0-100, \"reasons\": [\"...\"], \"concerns\": [\"...\"], \"hooks\": [\"personalization angle\"]}

Campaign:
";

pub const COPY_SYSTEM: &str = "\
You write personalized B2B outreach that sounds like a person, not a template.

Principles: lead with value for the reader, reference specific recent activity or company \
news, keep the email to two or three short paragraphs, keep the LinkedIn message to three \
or four casual sentences, end with one concrete next step.

Respond with a JSON object and nothing else:
{\"subject_line\": \"...\", \"email_body\": \"...\", \"linkedin_message\": \"...\", \"talking_points\": [\"...\"]}

Campaign:
";

/// User prompt asking for one task's subtasks
pub fn planning_prompt(task: &Task, campaign: &str, sources: &str) -> String {
    let subject = match &task.kind {
        TaskKind::Company {
            display_name,
            lead_ids,
            ..
        } => format!(
            "Company research for \"{}\" ({} lead{} work here)",
            display_name,
            lead_ids.len(),
            if lead_ids.len() == 1 { "" } else { "s" }
        ),
        TaskKind::Profile {
            name,
            linkedin_url,
            company_name,
            ..
        } => format!(
            "Profile research for {} at {} (LinkedIn: {})",
            name,
            if company_name.trim().is_empty() { "an unknown company" } else { company_name },
            if linkedin_url.trim().is_empty() { "not provided" } else { linkedin_url }
        ),
    };

    format!(
        "Campaign:\n{}\n\nTask: {}\n\nAvailable data sources:\n{}\n\nList the research steps.",
        campaign, subject, sources
    )
}

/// User prompt asking for the calls that serve a task's subtasks
pub fn resolution_prompt(task: &Task, sources: &str) -> String {
    let entity = match &task.kind {
        TaskKind::Company { display_name, .. } => format!("Company name: {}", display_name),
        TaskKind::Profile {
            name, linkedin_url, ..
        } => format!("Person: {}\nLinkedIn profile URL: {}", name, linkedin_url),
    };

    let steps: Vec<String> = task
        .subtasks
        .iter()
        .map(|s| format!("{}. {}", s.seq, s.description))
        .collect();

    format!(
        "{}\n\nSteps:\n{}\n\nData sources:\n{}",
        entity,
        steps.join("\n"),
        sources
    )
}

pub fn qualification_prompt(lead: &Lead, signals: &str) -> String {
    format!(
        "Lead:\nName: {}\nTitle: {}\nCompany: {}\nLinkedIn: {}\n\nSignals:\n{}\n\nScore this lead.",
        lead.name, lead.title, lead.company_name, lead.linkedin_url, signals
    )
}

pub fn copy_prompt(lead: &Lead, qualification: &Qualification, hooks: &[String]) -> String {
    let hooks = if hooks.is_empty() {
        "- none found".to_string()
    } else {
        hooks
            .iter()
            .map(|h| format!("- {}", h))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "Lead:\nName: {}\nTitle: {}\nCompany: {}\n\nQualification: {}/100 ({} priority)\nWhy they fit: {}\n\n\
         Personalization hooks:\n{}\n\nWrite the outreach.",
        lead.name,
        lead.title,
        lead.company_name,
        qualification.score,
        qualification.priority,
        qualification.reasons.join("; "),
        hooks
    )
}
