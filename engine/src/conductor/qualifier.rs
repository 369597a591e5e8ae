//! Lead qualification
//!
//! Scores one lead against the campaign from its aggregated context. Any
//! failure, whether a model error or an out-of-range answer, yields the
//! default failed qualification instead of an error.

use crate::conductor::prompts::{qualification_prompt, QUALIFICATION_SYSTEM};
use crate::conductor::signals::signal_summary;
use crate::conductor::types::{Lead, Priority, Qualification};
use crate::connectors::ConnectorRegistry;
use crate::llm::{GenerationOptions, LLMRouter};
use crate::store::AggregatedContext;
use sdk::types::EntityScope;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

const SCORING_TEMPERATURE: f32 = 0.3;
const MAX_SCORE: i64 = 100;

#[derive(Debug, Deserialize)]
struct RawQualification {
    score: i64,
    #[serde(default, alias = "fit_reasons")]
    reasons: Vec<String>,
    #[serde(default, alias = "red_flags")]
    concerns: Vec<String>,
    #[serde(default, alias = "key_insights")]
    hooks: Vec<String>,
}

impl RawQualification {
    fn validate(self) -> Result<Qualification, String> {
        if !(0..=MAX_SCORE).contains(&self.score) {
            return Err(format!("score {} outside 0-{}", self.score, MAX_SCORE));
        }
        let score = self.score as u8;

        Ok(Qualification {
            score,
            priority: Priority::from_score(score),
            reasons: clean(self.reasons),
            concerns: clean(self.concerns),
            hooks: clean(self.hooks),
            failure: None,
        })
    }
}

fn clean(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

pub struct Qualifier {
    router: Arc<LLMRouter>,
    system_prompt: String,
    known: Vec<(String, EntityScope)>,
}

impl Qualifier {
    pub fn new(router: Arc<LLMRouter>, campaign: &str, registry: &ConnectorRegistry) -> Self {
        let known = registry
            .schemas()
            .into_iter()
            .map(|s| (s.name.clone(), s.scope))
            .collect();

        Self {
            router,
            system_prompt: format!("{}{}", QUALIFICATION_SYSTEM, campaign),
            known,
        }
    }

    pub async fn qualify(&self, lead: &Lead, ctx: &AggregatedContext) -> Qualification {
        let signals = signal_summary(ctx, &self.known);
        let prompt = qualification_prompt(lead, &signals);

        let answer = self
            .router
            .complete_json::<RawQualification>(
                &self.system_prompt,
                &prompt,
                &GenerationOptions::structured(SCORING_TEMPERATURE),
            )
            .await
            .map_err(|e| e.to_string())
            .and_then(RawQualification::validate);

        match answer {
            Ok(qualification) => {
                debug!(
                    "Qualified {}: {}/100 ({})",
                    lead.name, qualification.score, qualification.priority
                );
                qualification
            }
            Err(reason) => {
                warn!(
                    lead = %lead.id,
                    degradation = "qualification_failure",
                    "Qualification failed for {}: {}",
                    lead.name,
                    reason
                );
                Qualification::failed(reason)
            }
        }
    }
}
