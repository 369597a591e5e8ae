//! Command handlers for CLI operations
//!
//! This module implements the handlers for all CLI commands:
//! - run: Research, qualify and draft outreach for a lead batch
//! - plan: Show the research plan and the calls it would make
//! - context: Show stored research for a lead
//! - purge: Delete a namespace
//! - connectors: List registered connectors
//! - doctor: Validate configuration, credentials and model backends
//! - secret: Store or remove keychain credentials

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::cli::{ResolverChoice, SecretAction};
use crate::conductor::prompts::DEFAULT_CAMPAIGN;
use crate::conductor::{
    BatchReport, CallResolver, CompanyKey, KeywordResolver, Lead, LeadId, ModelResolver, Pipeline,
    PipelineOptions, Planner, Priority,
};
use crate::config::{validate_namespace, Config};
use crate::connectors::{default_registry, ConnectorRegistry};
use crate::llm::{build_router, LLMRouter};
use crate::secrets::{SecretCache, SecretManager, NEWSAPI_KEY, OPENAI_API_KEY, RAPIDAPI_KEY};
use crate::store::{ContextStore, EntityRef, MemoryContextStore, SqliteContextStore};
use sdk::errors::{EngineError, ScoutErrorExt};

/// Keychain service name credentials are stored under
pub const KEYCHAIN_SERVICE: &str = "scout";

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Arguments of `scout run`
#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    pub leads: PathBuf,
    pub campaign: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub csv: Option<PathBuf>,
    pub namespace: Option<String>,
    pub threshold: Option<u8>,
    pub resolver: Option<ResolverChoice>,
    pub ephemeral: bool,
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One lead as it appears in an input file
#[derive(Debug, Deserialize)]
struct LeadRow {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    title: String,
    #[serde(default, alias = "company")]
    company_name: String,
    #[serde(default, alias = "linkedin")]
    linkedin_url: String,
}

impl LeadRow {
    fn into_lead(self, row: usize) -> Lead {
        let id = self
            .id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| format!("lead_{}", row));

        Lead::new(
            id,
            self.name.trim(),
            self.title.trim(),
            self.company_name.trim(),
            self.linkedin_url.trim(),
        )
    }
}

/// Operator hint for the first engine error in a failure chain
pub fn error_hint(err: &anyhow::Error) -> Option<&str> {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<EngineError>())
        .map(|e| e.user_hint())
}

/// Parse leads from CSV text; a missing id becomes `lead_<row>` (0-based)
pub fn parse_leads_csv(contents: &str) -> Result<Vec<Lead>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(contents.as_bytes());

    let mut leads = Vec::new();
    for (row, record) in reader.deserialize::<LeadRow>().enumerate() {
        let record = record.map_err(|e| {
            EngineError::InvalidInput(format!("Invalid lead on row {}: {}", row + 1, e))
        })?;
        leads.push(record.into_lead(row));
    }
    check_leads(leads)
}

/// Parse leads from a JSON array
pub fn parse_leads_json(contents: &str) -> Result<Vec<Lead>> {
    let rows: Vec<LeadRow> = serde_json::from_str(contents).map_err(|e| {
        EngineError::InvalidInput(format!("Leads file must be a JSON array of leads: {}", e))
    })?;
    check_leads(
        rows.into_iter()
            .enumerate()
            .map(|(row, record)| record.into_lead(row))
            .collect(),
    )
}

fn check_leads(leads: Vec<Lead>) -> Result<Vec<Lead>> {
    let mut seen = HashSet::new();
    for lead in &leads {
        let problem = if lead.name.is_empty() {
            format!("Lead '{}' has no name", lead.id)
        } else if !seen.insert(lead.id.clone()) {
            format!("Duplicate lead id '{}'", lead.id)
        } else {
            continue;
        };
        return Err(EngineError::InvalidInput(problem).into());
    }
    Ok(leads)
}

/// Load leads from a `.csv` or `.json` file
pub fn load_leads(path: &Path) -> Result<Vec<Lead>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read leads file {}", path.display()))?;

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    if is_json {
        parse_leads_json(&contents)
    } else {
        parse_leads_csv(&contents)
    }
}

/// Campaign text from a file, or the built-in campaign
pub fn load_campaign(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read campaign file {}", path.display()))?;
            if text.trim().is_empty() {
                bail!("Campaign file {} is empty", path.display());
            }
            Ok(text.trim().to_string())
        }
        None => Ok(DEFAULT_CAMPAIGN.trim().to_string()),
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// One row of the CSV summary
#[derive(Debug, Serialize)]
struct SummaryRow<'a> {
    name: &'a str,
    title: &'a str,
    company: &'a str,
    linkedin_url: &'a str,
    score: u8,
    priority: Priority,
    copy_status: String,
    subject_line: &'a str,
    linkedin_message: &'a str,
}

/// Write the CSV summary, one row per processed lead
pub fn write_csv_summary<W: Write>(report: &BatchReport, writer: W) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);

    for result in &report.results {
        let copy = result.personalized_copy.as_ref();
        out.serialize(SummaryRow {
            name: &result.lead.name,
            title: &result.lead.title,
            company: &result.lead.company_name,
            linkedin_url: &result.lead.linkedin_url,
            score: result.qualification.score,
            priority: result.qualification.priority,
            copy_status: result.copy_status.to_string(),
            subject_line: copy.map(|c| c.subject_line.as_str()).unwrap_or(""),
            linkedin_message: copy.map(|c| c.linkedin_message.as_str()).unwrap_or(""),
        })?;
    }

    out.flush()?;
    Ok(())
}

fn write_json_report(report: &BatchReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}

fn write_csv_report(report: &BatchReport, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    write_csv_summary(report, file)
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

/// Credentials from the environment and the OS keychain
pub fn secret_cache() -> Arc<SecretCache> {
    Arc::new(SecretCache::new(Arc::new(SecretManager::new(
        KEYCHAIN_SERVICE,
    ))))
}

/// Fresh per-run namespace, e.g. `run-20240120-101500-3f2a9c0d`
pub fn fresh_namespace() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "run-{}-{}",
        chrono::Utc::now().format("%Y%m%d-%H%M%S"),
        &id[..8]
    )
}

/// The context store a command works against
pub enum StoreHandle {
    Sqlite(Arc<SqliteContextStore>),
    Memory(Arc<MemoryContextStore>),
}

impl StoreHandle {
    /// Open the configured backend scoped to `namespace`
    pub async fn open(config: &Config, namespace: &str, ephemeral: bool) -> Result<Self> {
        validate_namespace(namespace)?;

        if ephemeral || config.store.backend == "memory" {
            return Ok(Self::Memory(Arc::new(MemoryContextStore::new(namespace))));
        }

        let store = SqliteContextStore::open(&config.context_db_path(), namespace)
            .await
            .context("Failed to open context store")?;
        Ok(Self::Sqlite(Arc::new(store)))
    }

    pub fn shared(&self) -> Arc<dyn ContextStore> {
        match self {
            Self::Sqlite(store) => Arc::clone(store) as Arc<dyn ContextStore>,
            Self::Memory(store) => Arc::clone(store) as Arc<dyn ContextStore>,
        }
    }

    pub fn is_persistent(&self) -> bool {
        matches!(self, Self::Sqlite(_))
    }

    /// Flush pending writes
    pub async fn close(&self) -> Result<()> {
        if let Self::Sqlite(store) = self {
            store.close().await?;
        }
        Ok(())
    }
}

/// Resolver for this run: the flag wins over configuration
pub fn build_resolver(
    choice: Option<ResolverChoice>,
    config: &Config,
    router: Arc<LLMRouter>,
) -> Arc<dyn CallResolver> {
    let keyword = match choice {
        Some(choice) => choice == ResolverChoice::Keyword,
        None => config.research.resolver == "keyword",
    };

    if keyword {
        Arc::new(KeywordResolver)
    } else {
        Arc::new(ModelResolver::new(router))
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Research, qualify and draft outreach for a batch of leads
///
/// Model backend and namespace problems abort before any lead is touched.
/// Everything after that degrades per lead and the run always completes.
/// Ctrl-C cancels outstanding work; records already stored stay valid.
pub async fn handle_run(args: RunArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let leads = load_leads(&args.leads)?;
    let campaign = load_campaign(args.campaign.as_deref())?;

    let namespace = args
        .namespace
        .clone()
        .or_else(|| config.store.namespace.clone())
        .unwrap_or_else(fresh_namespace);

    let secrets = secret_cache();
    let router = Arc::new(
        build_router(&config.llm, Arc::clone(&secrets)).context("No usable model backend")?,
    );
    let registry = Arc::new(default_registry(&config.connectors, secrets));
    let store = StoreHandle::open(config, &namespace, args.ephemeral).await?;
    let resolver = build_resolver(args.resolver, config, Arc::clone(&router));

    let mut options = PipelineOptions::from_config(config, campaign);
    if let Some(threshold) = args.threshold {
        options.threshold = threshold;
    }

    tracing::info!(
        "Run: {} leads, namespace '{}', resolver '{}', threshold {}",
        leads.len(),
        namespace,
        resolver.name(),
        options.threshold
    );

    let pipeline = Pipeline::new(router, registry, resolver, store.shared(), options);

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, cancelling run");
                cancel.cancel();
            }
        })
    };

    let report = pipeline.run(&leads, &cancel).await;
    interrupt.abort();

    if let Err(e) = store.close().await {
        tracing::error!("Failed to close context store: {:#}", e);
    }

    if let Some(path) = &args.output {
        write_json_report(&report, path)?;
        tracing::info!("Report written to {}", path.display());
    }
    if let Some(path) = &args.csv {
        write_csv_report(&report, path)?;
        tracing::info!("CSV summary written to {}", path.display());
    }

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => print_report(&report, store.is_persistent()),
    }

    if report.cancelled {
        return Err(EngineError::Cancelled.into());
    }
    Ok(())
}

fn print_report(report: &BatchReport, persistent: bool) {
    println!("Scout Run: {}", report.namespace);
    println!("============================");
    println!();

    if report.results.is_empty() {
        println!("No leads processed.");
    } else {
        println!(
            "{:<24} {:<20} {:>5}  {:<8} {}",
            "Lead", "Company", "Score", "Priority", "Copy"
        );
        println!("{}", "-".repeat(72));
        for result in &report.results {
            println!(
                "{:<24} {:<20} {:>5}  {:<8} {}",
                truncate(&result.lead.name, 24),
                truncate(&result.lead.company_name, 20),
                result.qualification.score,
                result.qualification.priority.to_string(),
                result.copy_status
            );
            if let Some(failure) = &result.qualification.failure {
                println!("  ! qualification failed: {}", failure);
            }
            for failed in &result.connectors.failed {
                println!("  - {} unavailable ({})", failed.connector, failed.kind);
            }
        }
    }

    println!();
    println!(
        "Processed {} leads: {} high, {} medium, {} low priority; copy for {}",
        report.total_processed,
        report.count_priority(Priority::High),
        report.count_priority(Priority::Medium),
        report.count_priority(Priority::Low),
        report.total_qualified
    );
    println!(
        "Research: {} company + {} profile tasks, {} calls ({} ok, {} failed), {} unresolved subtasks",
        report.plan.company_tasks,
        report.plan.profile_tasks,
        report.execution.resolved_calls,
        report.execution.succeeded,
        report.execution.failed,
        report.unresolved_subtasks.len()
    );
    if report.execution.store_write_failures > 0 {
        println!(
            "⚠ {} results could not be stored",
            report.execution.store_write_failures
        );
    }
    if persistent {
        println!(
            "Inspect with: scout context --namespace {} --lead <id>",
            report.namespace
        );
    }
    if report.cancelled {
        println!("⚠ Run was cancelled before every lead finished");
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

/// Show the research plan without calling any connector
///
/// Calls are previewed with the keyword resolver so no extra model calls
/// are made.
pub async fn handle_plan(
    leads: PathBuf,
    campaign: Option<PathBuf>,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let leads = load_leads(&leads)?;
    let campaign = load_campaign(campaign.as_deref())?;

    let secrets = secret_cache();
    let router = Arc::new(
        build_router(&config.llm, Arc::clone(&secrets)).context("No usable model backend")?,
    );
    let registry = Arc::new(default_registry(&config.connectors, secrets));

    let plan = Planner::new(router, Arc::clone(&registry))
        .plan(&leads, &campaign)
        .await;

    let resolver = KeywordResolver;
    let mut previews = Vec::with_capacity(plan.tasks.len());
    for task in &plan.tasks {
        previews.push(resolver.resolve(task, &registry).await);
    }

    match format {
        OutputFormat::Json => {
            let tasks: Vec<_> = plan
                .tasks
                .iter()
                .zip(&previews)
                .map(|(task, preview)| {
                    json!({
                        "task": task,
                        "calls": preview.calls,
                        "unresolved": preview.misses,
                    })
                })
                .collect();
            let output = json!({ "stats": plan.stats(), "tasks": tasks });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            let stats = plan.stats();
            println!(
                "Research plan: {} company tasks, {} profile tasks ({} degraded)",
                stats.company_tasks, stats.profile_tasks, stats.degraded_tasks
            );
            for (task, preview) in plan.tasks.iter().zip(&previews) {
                println!();
                println!(
                    "[{}] {}{}",
                    task.id,
                    task.label(),
                    if task.degraded { " (fallback subtasks)" } else { "" }
                );
                for subtask in &task.subtasks {
                    let calls: Vec<&str> = preview
                        .calls
                        .iter()
                        .filter(|c| c.subtask_seq == subtask.seq)
                        .map(|c| c.connector.as_str())
                        .collect();
                    let target = if calls.is_empty() {
                        "unresolved".to_string()
                    } else {
                        calls.join(", ")
                    };
                    println!("  {}. {} -> {}", subtask.seq, subtask.description, target);
                }
            }
        }
    }

    Ok(())
}

/// Show stored research for one lead and, optionally, its company
pub async fn handle_context(
    namespace: String,
    lead: String,
    company: Option<String>,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let store = StoreHandle::open(config, &namespace, false).await?;
    if !store.is_persistent() {
        bail!("The memory backend keeps nothing between runs; nothing to inspect");
    }
    let shared = store.shared();

    let lead_id = LeadId::new(lead);
    let company_key = company.as_deref().and_then(CompanyKey::from_name);

    let mut records = shared.records_for(&EntityRef::Lead(lead_id.clone())).await?;
    if let Some(key) = &company_key {
        records.extend(shared.records_for(&EntityRef::Company(key.clone())).await?);
    }
    let aggregated = shared.aggregate(&lead_id, company_key.as_ref()).await?;
    store.close().await?;

    match format {
        OutputFormat::Json => {
            let output = json!({
                "namespace": namespace,
                "lead": lead_id,
                "company": company_key,
                "records": records,
                "aggregated": aggregated,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            println!("Context for {} in '{}'", lead_id, namespace);
            if let Some(key) = &company_key {
                println!("Company key: {}", key);
            }
            println!();

            if records.is_empty() {
                println!("No records stored.");
                return Ok(());
            }

            println!("Records ({}):", records.len());
            for record in &records {
                let outcome = match record.outcome.failure() {
                    Some(failure) => format!("failed ({})", failure),
                    None => "ok".to_string(),
                };
                println!(
                    "  {} [{}] {}",
                    record.key,
                    record.created_at.format("%Y-%m-%d %H:%M:%S"),
                    outcome
                );
            }

            println!();
            println!("Aggregated view:");
            for (connector, entry) in aggregated.iter() {
                let state = if entry.outcome.is_success() { "ok" } else { "failed" };
                println!("  {:<24} {:<7} from {}", connector, state, entry.source);
            }
        }
    }

    Ok(())
}

/// Delete every stored record in a namespace
pub async fn handle_purge(namespace: String, config: &Config, format: OutputFormat) -> Result<()> {
    let store = StoreHandle::open(config, &namespace, false).await?;
    let removed = store.shared().purge_namespace().await?;
    store.close().await?;

    match format {
        OutputFormat::Json => {
            let body = json!({ "namespace": namespace, "removed": removed });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        OutputFormat::Text => println!("Removed {} records from '{}'", removed, namespace),
    }
    Ok(())
}

/// List registered connectors
pub async fn handle_connectors(config: &Config, format: OutputFormat) -> Result<()> {
    let registry = default_registry(&config.connectors, secret_cache());
    print_connectors(&registry, format)
}

fn print_connectors(registry: &ConnectorRegistry, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&registry.schemas())?);
        }
        OutputFormat::Text => {
            println!("Connectors ({}):", registry.len());
            for schema in registry.schemas() {
                println!();
                println!("  {} [{}]", schema.signature(), schema.scope);
                println!("    {}", schema.description);
            }
        }
    }
    Ok(())
}

/// Validate configuration, credentials and model backends
pub async fn handle_doctor(config: &Config, format: OutputFormat) -> Result<()> {
    let mut issues = Vec::new();
    let mut checks: Vec<(String, String)> = Vec::new();

    // Check 1: Configuration validation
    // Config is already validated when loaded
    checks.push(("Configuration".into(), "Valid".into()));

    // Check 2: Data directory
    let data_dir = &config.core.data_dir;
    if data_dir.exists() {
        checks.push(("Data directory".into(), "Exists".into()));
    } else {
        checks.push(("Data directory".into(), "Missing (created on first run)".into()));
    }

    // Check 3: Context store
    if config.store.backend == "sqlite" {
        let db_path = config.context_db_path();
        if db_path.exists() {
            match crate::db::Database::new(&db_path).await {
                Ok(db) => {
                    checks.push(("Context store".into(), "OK".into()));
                    db.close().await.ok();
                }
                Err(e) => {
                    checks.push(("Context store".into(), "Failed".into()));
                    issues.push(format!("Cannot open context store: {:#}", e));
                }
            }
        } else {
            checks.push(("Context store".into(), "Not initialized".into()));
        }
    } else {
        checks.push(("Context store".into(), "In memory".into()));
    }

    // Check 4: Credentials
    let secrets = secret_cache();
    for (key, purpose) in [
        (OPENAI_API_KEY, "model backend"),
        (RAPIDAPI_KEY, "LinkedIn connectors"),
        (NEWSAPI_KEY, "news connector"),
    ] {
        if secrets.lookup(key).is_some() {
            checks.push((key.to_string(), "Configured".into()));
        } else {
            checks.push((key.to_string(), "Not configured".into()));
            issues.push(format!(
                "{} is not set; the {} will be unavailable. Run 'scout secret set {}'.",
                key, purpose, key
            ));
        }
    }

    // Check 5: Model backends
    match build_router(&config.llm, secrets) {
        Ok(router) => {
            for (name, healthy) in router.check_health().await {
                let status = if healthy { "Available" } else { "Not available" };
                checks.push((format!("Provider {}", name), status.into()));
                if !healthy {
                    issues.push(format!("Provider '{}' did not answer a health check", name));
                }
            }
        }
        Err(e) => {
            checks.push(("Model backend".into(), "None".into()));
            issues.push(format!("No usable model backend: {}", e));
        }
    }

    // Output results
    match format {
        OutputFormat::Text => {
            println!("Scout System Diagnostics");
            println!("============================");
            println!();

            println!("System Checks:");
            for (check, status) in &checks {
                println!("  {:<25} {}", format!("{}:", check), status);
            }

            println!();

            if issues.is_empty() {
                println!("✓ All checks passed!");
            } else {
                println!("⚠ Issues found:");
                println!();
                for (i, issue) in issues.iter().enumerate() {
                    println!("  {}. {}", i + 1, issue);
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "checks": checks.iter().map(|(name, status)| {
                    json!({
                        "name": name,
                        "status": status
                    })
                }).collect::<Vec<_>>(),
                "issues": issues,
                "healthy": issues.is_empty()
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Store or remove a keychain credential
pub async fn handle_secret(action: SecretAction, format: OutputFormat) -> Result<()> {
    let manager = SecretManager::new(KEYCHAIN_SERVICE);

    let (key, verb) = match action {
        SecretAction::Set { key } => {
            manager.prompt_and_store(&key)?;
            (key, "stored")
        }
        SecretAction::Delete { key } => {
            manager.delete_secret(&key)?;
            (key, "deleted")
        }
    };

    match format {
        OutputFormat::Json => println!("{}", json!({ "key": key.to_uppercase(), "status": verb })),
        OutputFormat::Text => println!("Secret '{}' {}.", key.to_uppercase(), verb),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conductor::types::{
        ConnectorReport, CopyStatus, LeadResult, PersonalizedCopy, Qualification, ResearchSummary,
    };

    #[test]
    fn test_parse_csv_defaults_missing_ids() {
        let csv = "id,name,linkedin_url,company_name,title\n\
                   alice,Alice Smith,https://linkedin.com/in/alice,TechCorp,CTO\n\
                   ,Bob Jones,https://linkedin.com/in/bob,TechCorp,VP Engineering\n";
        let leads = parse_leads_csv(csv).unwrap();
        assert_eq!(leads.len(), 2);
        assert_eq!(leads[0].id.as_str(), "alice");
        assert_eq!(leads[1].id.as_str(), "lead_1");
        assert_eq!(leads[1].company_name, "TechCorp");
    }

    #[test]
    fn test_parse_csv_without_id_column() {
        let csv = "name,title,company_name,linkedin_url\nCarol White,Head of Data,OtherCo,\n";
        let leads = parse_leads_csv(csv).unwrap();
        assert_eq!(leads[0].id.as_str(), "lead_0");
        assert_eq!(leads[0].linkedin_url, "");
    }

    #[test]
    fn test_parse_json_leads() {
        let json = r#"[
            {"id": "a", "name": "Alice", "company": "TechCorp"},
            {"name": "Bob", "company_name": "TechCorp", "title": "VP"}
        ]"#;
        let leads = parse_leads_json(json).unwrap();
        assert_eq!(leads[0].company_name, "TechCorp");
        assert_eq!(leads[1].id.as_str(), "lead_1");
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let csv = "id,name\nx,Alice\nx,Bob\n";
        assert!(parse_leads_csv(csv).is_err());
    }

    #[test]
    fn test_nameless_lead_rejected() {
        assert!(parse_leads_json(r#"[{"id": "a"}]"#).is_err());
    }

    #[test]
    fn test_bad_leads_carry_input_hint() {
        let err = parse_leads_csv("id,name\nx,Alice\nx,Bob\n").unwrap_err();
        assert!(err.to_string().contains("Duplicate lead id 'x'"));
        assert_eq!(error_hint(&err), Some("Check the leads file format"));

        let err = parse_leads_json("{\"name\": \"Alice\"}")
            .context("Failed to load leads")
            .unwrap_err();
        assert_eq!(error_hint(&err), Some("Check the leads file format"));

        assert_eq!(error_hint(&anyhow::anyhow!("unrelated")), None);
    }

    #[test]
    fn test_default_campaign() {
        let campaign = load_campaign(None).unwrap();
        assert!(!campaign.is_empty());
    }

    #[test]
    fn test_fresh_namespace_is_valid() {
        let a = fresh_namespace();
        assert!(a.starts_with("run-"));
        assert!(validate_namespace(&a).is_ok());
        assert_ne!(a, fresh_namespace());
    }

    #[test]
    fn test_csv_summary() {
        let lead = Lead::new(
            "alice",
            "Alice Smith",
            "CTO",
            "TechCorp",
            "https://linkedin.com/in/alice",
        );
        let summary = ResearchSummary {
            profile_highlights: vec![],
            company_highlights: vec![],
            recent_activity: vec![],
        };
        let report = BatchReport {
            namespace: "test".into(),
            results: vec![
                LeadResult {
                    lead: lead.clone(),
                    qualification: Qualification {
                        score: 82,
                        priority: Priority::High,
                        reasons: vec![],
                        concerns: vec![],
                        hooks: vec![],
                        failure: None,
                    },
                    personalized_copy: Some(PersonalizedCopy {
                        subject_line: "Pipelines at TechCorp".into(),
                        email_body: "Hi Alice".into(),
                        linkedin_message: "Hi Alice, let's connect".into(),
                        talking_points: vec![],
                        fallback: false,
                        fallback_reason: None,
                    }),
                    copy_status: CopyStatus::Generated,
                    research_summary: summary.clone(),
                    connectors: ConnectorReport::default(),
                },
                LeadResult {
                    lead: Lead::new("bob", "Bob Jones", "VP", "TechCorp", ""),
                    qualification: Qualification::failed("timeout"),
                    personalized_copy: None,
                    copy_status: CopyStatus::BelowThreshold,
                    research_summary: summary,
                    connectors: ConnectorReport::default(),
                },
            ],
            total_processed: 2,
            total_qualified: 1,
            plan: Default::default(),
            execution: Default::default(),
            unresolved_subtasks: vec![],
            cancelled: false,
        };

        let mut buf = Vec::new();
        write_csv_summary(&report, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "name,title,company,linkedin_url,score,priority,copy_status,subject_line,linkedin_message"
        );
        assert!(lines[1].starts_with("Alice Smith,CTO,TechCorp,"));
        assert!(lines[1].contains(",82,high,generated,Pipelines at TechCorp,"));
        assert_eq!(lines[2], "Bob Jones,VP,TechCorp,,0,low,below_threshold,,");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Alice", 10), "Alice");
        assert_eq!(truncate("Alexandria Ocasio", 6), "Alexa…");
    }
}
