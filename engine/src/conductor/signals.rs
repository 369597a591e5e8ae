//! Reading connector payloads
//!
//! Scraper responses arrive in several envelopes (`{"data": {...}}`,
//! `{"posts": [...]}`, a bare array). These helpers dig the useful fields out
//! for prompts, hooks and the research summary without caring which envelope
//! a backend used.

use crate::store::AggregatedContext;
use sdk::types::EntityScope;
use serde_json::Value;

pub const PROFILE: &str = "get_linkedin_profile";
pub const ACTIVITY: &str = "get_linkedin_activity";
pub const COMPANY: &str = "get_linkedin_company";
pub const COMPANY_POSTS: &str = "get_company_posts";
pub const NEWS: &str = "get_company_news";

/// Longest payload rendered verbatim for connectors without a digest
const RAW_PAYLOAD_CHARS: usize = 600;

/// Unwrap a `{"data": {...}}` envelope
fn body(payload: &Value) -> &Value {
    match payload.get("data") {
        Some(inner) if inner.is_object() => inner,
        _ => payload,
    }
}

fn text<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| value.get(*k))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max).collect();
        format!("{}...", cut.trim_end())
    }
}

/// First array found under the usual list keys, or the payload itself
pub fn items<'a>(payload: &'a Value, keys: &[&str]) -> &'a [Value] {
    if let Some(list) = payload.as_array() {
        return list;
    }
    keys.iter()
        .filter_map(|k| payload.get(*k).or_else(|| body(payload).get(*k)))
        .find_map(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Post texts, each with its date when known
pub fn post_snippets(payload: &Value, limit: usize, max_chars: usize) -> Vec<String> {
    items(payload, &["posts", "data", "items"])
        .iter()
        .filter_map(|post| {
            let body = text(post, &["text", "commentary", "content", "title"])?;
            let snippet = truncate(body, max_chars);
            Some(match text(post, &["date", "posted_at", "postedAt", "time"]) {
                Some(date) => format!("{} ({})", snippet, date),
                None => snippet,
            })
        })
        .take(limit)
        .collect()
}

/// News headlines, each with its date when known
pub fn headlines(payload: &Value, limit: usize) -> Vec<String> {
    items(payload, &["articles"])
        .iter()
        .filter_map(|article| {
            let title = text(article, &["title"])?;
            Some(match text(article, &["date", "publishedAt"]) {
                Some(date) => format!("{} ({})", title, date),
                None => title.to_string(),
            })
        })
        .take(limit)
        .collect()
}

/// Headline plus the most recent position, e.g. `CTO at TechCorp`
pub fn profile_highlights(payload: &Value) -> Vec<String> {
    let profile = body(payload);
    let mut out = Vec::new();

    if let Some(headline) = text(profile, &["headline"]) {
        out.push(headline.to_string());
    }

    let latest = items(profile, &["experience", "experiences", "positions"]).first();
    if let Some(position) = latest {
        let title = text(position, &["title"]);
        let company = text(position, &["company", "company_name", "companyName"]);
        match (title, company) {
            (Some(t), Some(c)) => out.push(format!("{} at {}", t, c)),
            (Some(t), None) => out.push(t.to_string()),
            (None, Some(c)) => out.push(format!("Works at {}", c)),
            (None, None) => {}
        }
    }

    out
}

pub fn company_highlights(payload: &Value) -> Vec<String> {
    let company = body(payload);
    let mut out = Vec::new();

    if let Some(size) = text(company, &["company_size", "staffCountRange", "size"]) {
        out.push(format!("Size: {}", size));
    } else if let Some(count) = company.get("staffCount").and_then(Value::as_u64) {
        out.push(format!("Size: {} employees", count));
    }
    if let Some(industry) = text(company, &["industry"]) {
        out.push(format!("Industry: {}", industry));
    } else if let Some(first) = items(company, &["industries"]).first().and_then(Value::as_str) {
        out.push(format!("Industry: {}", first));
    }

    out
}

/// Multi-line digest of one successful payload for the scoring prompt
pub fn describe(connector: &str, payload: &Value) -> String {
    let lines: Vec<String> = match connector {
        PROFILE => {
            let profile = body(payload);
            let mut lines = profile_highlights(payload);
            if let Some(summary) = text(profile, &["summary", "about"]) {
                lines.push(format!("Summary: {}", truncate(summary, 300)));
            }
            if let Some(location) = text(profile, &["location"]) {
                lines.push(format!("Location: {}", location));
            }
            let skills: Vec<&str> = items(profile, &["skills"])
                .iter()
                .filter_map(|s| s.as_str().or_else(|| text(s, &["name"])))
                .take(10)
                .collect();
            if !skills.is_empty() {
                lines.push(format!("Skills: {}", skills.join(", ")));
            }
            lines
        }
        ACTIVITY | COMPANY_POSTS => post_snippets(payload, 3, 150),
        COMPANY => {
            let company = body(payload);
            let mut lines = company_highlights(payload);
            if let Some(description) = text(company, &["description", "tagline"]) {
                lines.push(format!("Description: {}", truncate(description, 300)));
            }
            if let Some(founded) = company.get("founded").filter(|v| !v.is_null()) {
                let founded = founded
                    .as_str()
                    .map(String::from)
                    .unwrap_or_else(|| founded.to_string());
                lines.push(format!("Founded: {}", founded));
            }
            lines
        }
        NEWS => headlines(payload, 5),
        _ => vec![truncate(&payload.to_string(), RAW_PAYLOAD_CHARS)],
    };

    if lines.is_empty() {
        "collected, but nothing notable".to_string()
    } else {
        lines.join("\n    ")
    }
}

/// Signal summary for the scoring prompt
///
/// Lists every known connector under its scope. Connectors without data are
/// marked unavailable, with the failure reason when a call failed, so the
/// scorer never mistakes missing data for a negative signal.
pub fn signal_summary(ctx: &AggregatedContext, known: &[(String, EntityScope)]) -> String {
    let mut sections = Vec::new();

    for (scope, heading) in [
        (EntityScope::Profile, "Profile signals"),
        (EntityScope::Company, "Company signals"),
    ] {
        let mut lines = vec![format!("{}:", heading)];
        for (name, _) in known.iter().filter(|(_, s)| *s == scope) {
            let line = match (ctx.payload(name), ctx.failure(name)) {
                (Some(payload), _) => format!("- {}: {}", name, describe(name, payload)),
                (None, Some(failure)) => {
                    format!("- {}: unavailable ({}: {})", name, failure.kind, failure.reason)
                }
                (None, None) => format!("- {}: unavailable (no data collected)", name),
            };
            lines.push(line);
        }
        sections.push(lines.join("\n"));
    }

    sections.join("\n\n")
}
