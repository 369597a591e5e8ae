//! CLI interface for Scout
//!
//! This module provides the command-line interface using clap's derive API.
//! It defines all commands and global flags for running lead research.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Scout lead research engine
///
/// Researches a batch of sales leads through external data sources, scores
/// each lead against a campaign and drafts outreach for the good fits.
#[derive(Parser, Debug)]
#[command(name = "scout")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Subtask resolution strategy
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverChoice {
    /// One model call per task picks connectors and arguments
    Model,
    /// Deterministic keyword rules, no model involved
    Keyword,
}

impl ResolverChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Keyword => "keyword",
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Research, qualify and draft outreach for a batch of leads
    Run {
        /// Leads file (.csv or .json)
        #[arg(long, value_name = "FILE")]
        leads: PathBuf,

        /// Campaign description file; a built-in campaign is used when omitted
        #[arg(long, value_name = "FILE")]
        campaign: Option<PathBuf>,

        /// Write the full JSON report here
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Also write a CSV summary
        #[arg(long, value_name = "FILE")]
        csv: Option<PathBuf>,

        /// Context store namespace (defaults to a fresh one per run)
        #[arg(long)]
        namespace: Option<String>,

        /// Minimum score that gets outreach copy
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        threshold: Option<u8>,

        /// Override the configured resolver
        #[arg(long, value_enum)]
        resolver: Option<ResolverChoice>,

        /// Keep research in memory only
        #[arg(long)]
        ephemeral: bool,
    },

    /// Show the research plan for a batch without calling any connector
    Plan {
        /// Leads file (.csv or .json)
        #[arg(long, value_name = "FILE")]
        leads: PathBuf,

        /// Campaign description file
        #[arg(long, value_name = "FILE")]
        campaign: Option<PathBuf>,
    },

    /// Inspect stored research for a lead
    Context {
        /// Namespace the run wrote to
        #[arg(long)]
        namespace: String,

        /// Lead id
        #[arg(long)]
        lead: String,

        /// Employer name, to include shared company research
        #[arg(long)]
        company: Option<String>,
    },

    /// Delete every stored record in a namespace
    Purge {
        /// Namespace to delete
        #[arg(long)]
        namespace: String,
    },

    /// List registered connectors and their parameters
    Connectors,

    /// Run system diagnostics
    Doctor,

    /// Manage credentials in the OS keychain
    Secret {
        #[command(subcommand)]
        action: SecretAction,
    },
}

/// Credential management actions
#[derive(Subcommand, Debug)]
pub enum SecretAction {
    /// Store a credential (prompts for the value)
    Set {
        /// Credential name, e.g. RAPIDAPI_KEY
        key: String,
    },

    /// Remove a stored credential
    Delete {
        /// Credential name
        key: String,
    },
}
