//! Outreach copy generation
//!
//! Runs only for leads at or above the qualification threshold. A failed
//! generation produces a generic template flagged as a fallback, so a
//! reviewer can tell personalization did not happen.

use crate::conductor::prompts::{copy_prompt, COPY_SYSTEM};
use crate::conductor::signals::{headlines, post_snippets, ACTIVITY, COMPANY_POSTS, NEWS};
use crate::conductor::types::{Lead, PersonalizedCopy, Qualification};
use crate::llm::{GenerationOptions, LLMRouter};
use crate::store::AggregatedContext;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

const COPY_TEMPERATURE: f32 = 0.8;
const ACTIVITY_HOOKS: usize = 2;
const COMPANY_HOOKS: usize = 2;

#[derive(Debug, Deserialize)]
struct RawCopy {
    subject_line: String,
    email_body: String,
    #[serde(default)]
    linkedin_message: String,
    #[serde(default)]
    talking_points: Vec<String>,
}

impl RawCopy {
    fn validate(self) -> Result<PersonalizedCopy, String> {
        if self.subject_line.trim().is_empty() || self.email_body.trim().is_empty() {
            return Err("empty subject line or email body".to_string());
        }

        Ok(PersonalizedCopy {
            subject_line: self.subject_line.trim().to_string(),
            email_body: self.email_body.trim().to_string(),
            linkedin_message: self.linkedin_message.trim().to_string(),
            talking_points: self
                .talking_points
                .into_iter()
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
            fallback: false,
            fallback_reason: None,
        })
    }
}

/// Personalization hooks: the qualification's own plus recent activity and company news
pub fn collect_hooks(qualification: &Qualification, ctx: &AggregatedContext) -> Vec<String> {
    let mut hooks = qualification.hooks.clone();

    if let Some(activity) = ctx.payload(ACTIVITY) {
        hooks.extend(
            post_snippets(activity, ACTIVITY_HOOKS, 200)
                .into_iter()
                .map(|s| format!("Recent post: {}", s)),
        );
    }

    let mut company: Vec<String> = ctx
        .payload(NEWS)
        .map(|news| headlines(news, COMPANY_HOOKS))
        .unwrap_or_default()
        .into_iter()
        .map(|h| format!("Company news: {}", h))
        .collect();
    if company.len() < COMPANY_HOOKS {
        if let Some(posts) = ctx.payload(COMPANY_POSTS) {
            company.extend(
                post_snippets(posts, COMPANY_HOOKS - company.len(), 150)
                    .into_iter()
                    .map(|s| format!("Company update: {}", s)),
            );
        }
    }
    hooks.extend(company);

    hooks
}

/// Generic copy used when generation fails
pub fn fallback_copy(lead: &Lead, reason: impl Into<String>) -> PersonalizedCopy {
    let company = if lead.company_name.trim().is_empty() {
        "your team"
    } else {
        lead.company_name.trim()
    };
    let first_name = lead.first_name();

    PersonalizedCopy {
        subject_line: format!("Quick question about {}", company),
        email_body: format!(
            "Hi {},\n\nI came across your work at {} and wanted to reach out. \
             Would you be open to a short call next week to compare notes?\n\nBest regards",
            first_name, company
        ),
        linkedin_message: format!(
            "Hi {}, I'd love to connect and learn more about your work at {}.",
            first_name, company
        ),
        talking_points: vec![
            format!("Ask about their role at {}", company),
            "Discuss current industry challenges".to_string(),
            "Share a relevant case study".to_string(),
        ],
        fallback: true,
        fallback_reason: Some(reason.into()),
    }
}

pub struct CopyGenerator {
    router: Arc<LLMRouter>,
    system_prompt: String,
}

impl CopyGenerator {
    pub fn new(router: Arc<LLMRouter>, campaign: &str) -> Self {
        Self {
            router,
            system_prompt: format!("{}{}", COPY_SYSTEM, campaign),
        }
    }

    pub async fn generate(
        &self,
        lead: &Lead,
        qualification: &Qualification,
        ctx: &AggregatedContext,
    ) -> PersonalizedCopy {
        let hooks = collect_hooks(qualification, ctx);
        let prompt = copy_prompt(lead, qualification, &hooks);

        let answer = self
            .router
            .complete_json::<RawCopy>(
                &self.system_prompt,
                &prompt,
                &GenerationOptions::copy(COPY_TEMPERATURE),
            )
            .await
            .map_err(|e| e.to_string())
            .and_then(RawCopy::validate);

        match answer {
            Ok(copy) => {
                debug!("Generated copy for {}", lead.name);
                copy
            }
            Err(reason) => {
                warn!(
                    lead = %lead.id,
                    degradation = "copy_failure",
                    "Copy generation failed for {}: {}",
                    lead.name,
                    reason
                );
                fallback_copy(lead, reason)
            }
        }
    }
}
