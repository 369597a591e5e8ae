//! Subtask resolution
//!
//! Maps a task's free-text subtasks onto concrete connector calls. Two
//! resolvers share one interface: [`ModelResolver`] asks the model,
//! [`KeywordResolver`] matches words deterministically. Both route their
//! candidates through the same validation, so only in-scope,
//! schema-conformant, de-duplicated calls ever reach the executor.

use crate::conductor::prompts::{resolution_prompt, RESOLUTION_SYSTEM};
use crate::conductor::types::{ResolvedCall, Task, TaskKind};
use crate::connectors::ConnectorRegistry;
use crate::llm::{GenerationOptions, LLMRouter};
use crate::store::args_hash;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Calls for one task plus the subtasks nothing could serve
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub calls: Vec<ResolvedCall>,
    /// Sequence numbers of subtasks left without a call
    pub misses: Vec<u32>,
    /// Candidates dropped for scope, schema or duplication reasons
    pub rejected: usize,
}

#[async_trait]
pub trait CallResolver: Send + Sync {
    fn name(&self) -> &str;

    /// Resolve every subtask of `task`; never fails, unresolvable work is a miss
    async fn resolve(&self, task: &Task, registry: &ConnectorRegistry) -> Resolution;
}

/// Unvalidated call proposed for a subtask
#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    #[serde(alias = "subtask_seq", alias = "seq")]
    pub subtask: u32,
    #[serde(alias = "name", alias = "tool")]
    pub connector: String,
    #[serde(default, alias = "args")]
    pub arguments: Value,
}

/// Validate candidates against the registry and the task
pub fn finalize(
    task: &Task,
    registry: &ConnectorRegistry,
    candidates: Vec<Candidate>,
) -> Resolution {
    let scope = task.scope();
    let known_seqs: HashSet<u32> = task.subtasks.iter().map(|s| s.seq).collect();
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut served: HashSet<u32> = HashSet::new();
    let mut resolution = Resolution::default();

    for candidate in candidates {
        if !known_seqs.contains(&candidate.subtask) {
            debug!("{}: call for unknown subtask {}", task.id, candidate.subtask);
            resolution.rejected += 1;
            continue;
        }

        let Some(connector) = registry.get(&candidate.connector) else {
            debug!("{}: unknown connector '{}'", task.id, candidate.connector);
            resolution.rejected += 1;
            continue;
        };

        if connector.scope() != scope {
            debug!(
                "{}: connector '{}' serves {} tasks, not {}",
                task.id,
                candidate.connector,
                connector.scope(),
                scope
            );
            resolution.rejected += 1;
            continue;
        }

        let args = match connector.schema().validate(&candidate.arguments) {
            Ok(args) => args,
            Err(e) => {
                debug!("{}: invalid arguments for '{}': {}", task.id, candidate.connector, e);
                resolution.rejected += 1;
                continue;
            }
        };

        if has_blank_string(&args) {
            debug!("{}: blank argument for '{}'", task.id, candidate.connector);
            resolution.rejected += 1;
            continue;
        }

        // Another subtask already asked for this exact call
        let identity = (candidate.connector.clone(), args_hash(&args));
        if !seen.insert(identity) {
            served.insert(candidate.subtask);
            resolution.rejected += 1;
            continue;
        }

        served.insert(candidate.subtask);
        resolution.calls.push(ResolvedCall {
            subtask_seq: candidate.subtask,
            connector: candidate.connector,
            args,
        });
    }

    resolution.misses = task
        .subtasks
        .iter()
        .map(|s| s.seq)
        .filter(|seq| !served.contains(seq))
        .collect();

    resolution
}

fn has_blank_string(args: &Value) -> bool {
    args.as_object()
        .map(|m| m.values().any(|v| v.as_str().is_some_and(|s| s.trim().is_empty())))
        .unwrap_or(false)
}

/// Arguments a task can fill for a connector without model help
fn entity_args(task: &Task) -> Value {
    match &task.kind {
        TaskKind::Company { display_name, .. } => json!({ "company_name": display_name }),
        TaskKind::Profile { linkedin_url, .. } => json!({ "linkedin_url": linkedin_url }),
    }
}

/// Deterministic resolver matching subtask words to connectors
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordResolver;

/// (connector, trigger words); earlier rules win
const COMPANY_RULES: &[(&str, &[&str])] = &[
    (
        "get_company_news",
        &["news", "press", "article", "articles", "funding", "announcement", "announcements"],
    ),
    ("get_company_posts", &["posts", "post", "updates", "update"]),
    (
        "get_linkedin_company",
        &["company", "page", "overview", "industry", "size", "headquarters"],
    ),
];

const PROFILE_RULES: &[(&str, &[&str])] = &[
    ("get_linkedin_activity", &["activity", "posts", "post", "recent", "engagement"]),
    (
        "get_linkedin_profile",
        &["profile", "background", "experience", "career", "skills", "education"],
    ),
];

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Words of a subtask with the task's own entity names cut out
///
/// Names and URLs are removed as whole word runs, longest first, so an
/// employer called "Fox News" leaves the "news" of "company news" intact.
fn intent_words(task: &Task, description: &str) -> HashSet<String> {
    let names: Vec<&str> = match &task.kind {
        TaskKind::Company { display_name, .. } => vec![display_name.as_str()],
        TaskKind::Profile {
            name,
            linkedin_url,
            company_name,
            ..
        } => vec![linkedin_url.as_str(), name.as_str(), company_name.as_str()],
    };
    let mut entities: Vec<Vec<String>> = names
        .into_iter()
        .map(tokenize)
        .filter(|words| !words.is_empty())
        .collect();
    entities.sort_by_key(|words| std::cmp::Reverse(words.len()));

    let mut words = tokenize(description);
    for entity in &entities {
        let mut i = 0;
        while i + entity.len() <= words.len() {
            if words[i..i + entity.len()] == entity[..] {
                words.drain(i..i + entity.len());
            } else {
                i += 1;
            }
        }
    }

    words.into_iter().collect()
}

impl KeywordResolver {
    fn match_connector(task: &Task, description: &str) -> Option<&'static str> {
        let words = intent_words(task, description);

        let rules = match task.kind {
            TaskKind::Company { .. } => COMPANY_RULES,
            TaskKind::Profile { .. } => PROFILE_RULES,
        };

        rules
            .iter()
            .find(|(_, triggers)| triggers.iter().any(|t| words.contains(*t)))
            .map(|(connector, _)| *connector)
    }

    /// Candidates without validation
    pub fn candidates(&self, task: &Task) -> Vec<Candidate> {
        let args = entity_args(task);
        task.subtasks
            .iter()
            .filter_map(|subtask| {
                Self::match_connector(task, &subtask.description).map(|connector| Candidate {
                    subtask: subtask.seq,
                    connector: connector.to_string(),
                    arguments: args.clone(),
                })
            })
            .collect()
    }
}

#[async_trait]
impl CallResolver for KeywordResolver {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn resolve(&self, task: &Task, registry: &ConnectorRegistry) -> Resolution {
        finalize(task, registry, self.candidates(task))
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawCalls {
    Wrapped { calls: Vec<Candidate> },
    Bare(Vec<Candidate>),
}

/// Resolver asking the model to pick connectors and fill arguments
///
/// When the model call fails the keyword resolver stands in, so a model
/// outage degrades resolution quality instead of skipping all research.
pub struct ModelResolver {
    router: Arc<LLMRouter>,
    fallback: KeywordResolver,
}

impl ModelResolver {
    pub fn new(router: Arc<LLMRouter>) -> Self {
        Self {
            router,
            fallback: KeywordResolver,
        }
    }
}

#[async_trait]
impl CallResolver for ModelResolver {
    fn name(&self) -> &str {
        "model"
    }

    async fn resolve(&self, task: &Task, registry: &ConnectorRegistry) -> Resolution {
        if task.subtasks.is_empty() {
            return Resolution::default();
        }

        let sources = registry.describe_for_prompt(task.scope());
        let prompt = resolution_prompt(task, &sources);

        let options = GenerationOptions::structured(0.0);
        let proposed = self
            .router
            .complete_json::<RawCalls>(RESOLUTION_SYSTEM, &prompt, &options)
            .await;

        match proposed {
            Ok(RawCalls::Wrapped { calls }) | Ok(RawCalls::Bare(calls)) => {
                finalize(task, registry, calls)
            }
            Err(e) => {
                warn!(
                    task = %task.id,
                    "Call resolution failed for {}: {}, matching by keyword",
                    task.label(),
                    e
                );
                self.fallback.resolve(task, registry).await
            }
        }
    }
}
