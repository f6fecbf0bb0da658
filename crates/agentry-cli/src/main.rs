//! Agentry - operator CLI for the recruitment orchestrator
//!
//! ## Commands
//!
//! - `seed`: Load candidate listings from a JSON file
//! - `discover`: Run discovery sources and report what landed
//! - `qualify`: Score and rank contactable candidates
//! - `preview`: Build the exact invitations a candidate set would get
//! - `execute`: Send invitations to an explicit candidate set
//! - `pipeline`: Discover, qualify, preview, and (with --live) execute
//! - `status`: Ledger aggregates, funnel, and recent attempts
//! - `opt-out`: Manage the do-not-contact registry

use std::path::PathBuf;
use std::sync::Arc;

use agentry_core::{
    execute_messages, preview_messages, qualify_candidates, run_discover, run_pipeline,
    CandidateSource, DiscoveryReport, Orchestrator, PipelineOptions, RecruitConfig, Stores,
};
use agentry_state::{CandidateDraft, CandidateStore, OptOutRegistry, SurrealStore};
use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use tracing::Level;

#[derive(Parser)]
#[command(name = "agentry")]
#[command(author = "Agentry Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Agentry recruitment orchestrator", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load candidate listings from a JSON file into the store
    Seed {
        /// Path to a JSON array of candidate drafts
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Run discovery sources and report imported listings
    Discover {
        /// JSON file of candidate drafts to use as a discovery source
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Score and rank contactable candidates
    Qualify {
        /// Maximum candidates to return (1-300)
        #[arg(short, long)]
        limit: Option<usize>,

        /// Minimum score to qualify (default 1)
        #[arg(long)]
        min_score: Option<i32>,
    },

    /// Build the invitations a candidate set would receive, without sending
    Preview {
        /// Candidate ids
        #[arg(long, required = true, num_args = 1..)]
        ids: Vec<String>,

        /// Campaign tag recorded on invites and attempts
        #[arg(short, long, default_value = "manual")]
        campaign: String,
    },

    /// Send invitations to an explicit candidate set
    Execute {
        /// Candidate ids
        #[arg(long, required = true, num_args = 1..)]
        ids: Vec<String>,

        /// Campaign tag recorded on invites and attempts
        #[arg(short, long, default_value = "manual")]
        campaign: String,
    },

    /// Discover, qualify, preview, and (with --live) execute
    Pipeline {
        /// Actually send invitations instead of previewing
        #[arg(long)]
        live: bool,

        /// Maximum candidates to process (1-100)
        #[arg(short, long)]
        limit: Option<usize>,

        /// Campaign tag
        #[arg(short, long, default_value = "auto")]
        campaign: String,

        /// Optional JSON file used as a discovery source
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Show ledger aggregates, funnel, and recent attempts
    Status,

    /// Manage the do-not-contact registry
    OptOut {
        #[command(subcommand)]
        action: OptOutAction,
    },
}

#[derive(Subcommand)]
enum OptOutAction {
    /// Register a domain as do-not-contact and retire its attempts
    Add {
        /// Domain or URL (normalized to its host)
        domain: String,

        /// Reason recorded with the entry
        #[arg(short, long)]
        reason: Option<String>,
    },

    /// Remove a domain from the registry
    Remove {
        /// Domain or URL
        domain: String,
    },

    /// List all do-not-contact domains, newest first
    List,
}

/// Discovery source backed by a JSON file of candidate drafts.
struct JsonFileSource {
    path: PathBuf,
}

#[async_trait]
impl CandidateSource for JsonFileSource {
    fn name(&self) -> &str {
        "json-file"
    }

    async fn discover(
        &self,
        store: &dyn CandidateStore,
    ) -> agentry_core::Result<DiscoveryReport> {
        let drafts = read_drafts(&self.path).map_err(|e| {
            agentry_core::RecruitError::InvalidInput(format!(
                "failed to read {}: {e}",
                self.path.display()
            ))
        })?;

        let scanned = drafts.len() as u64;
        let mut imported = 0;
        for draft in drafts {
            store.upsert(draft).await?;
            imported += 1;
        }

        Ok(DiscoveryReport {
            source: format!("json-file:{}", self.path.display()),
            scanned,
            imported,
        })
    }
}

fn read_drafts(path: &PathBuf) -> Result<Vec<CandidateDraft>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading candidate file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("parsing candidate drafts from {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn build_orchestrator() -> Result<Orchestrator> {
    let store = Arc::new(
        SurrealStore::from_env()
            .await
            .context("Failed to connect to the Agentry database")?,
    );
    let stores = Stores {
        candidates: store.clone(),
        ledger: store.clone(),
        opt_outs: store.clone(),
        invites: store.clone(),
        principals: store,
    };
    Ok(Orchestrator::live(RecruitConfig::from_env(), stores))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let format = if cli.json {
        agentry_core::LogFormat::Json
    } else {
        agentry_core::LogFormat::from_env()
    };
    agentry_core::init_tracing(format, level);

    let orchestrator = build_orchestrator().await?;

    match cli.command {
        Commands::Seed { file } => cmd_seed(&orchestrator, &file).await,
        Commands::Discover { file } => cmd_discover(&orchestrator, &file).await,
        Commands::Qualify { limit, min_score } => {
            cmd_qualify(&orchestrator, limit, min_score).await
        }
        Commands::Preview { ids, campaign } => cmd_preview(&orchestrator, &ids, &campaign).await,
        Commands::Execute { ids, campaign } => cmd_execute(&orchestrator, &ids, &campaign).await,
        Commands::Pipeline {
            live,
            limit,
            campaign,
            file,
        } => cmd_pipeline(&orchestrator, live, limit, &campaign, file).await,
        Commands::Status => cmd_status(&orchestrator).await,
        Commands::OptOut { action } => match action {
            OptOutAction::Add { domain, reason } => {
                cmd_opt_out_add(&orchestrator, &domain, reason).await
            }
            OptOutAction::Remove { domain } => cmd_opt_out_remove(&orchestrator, &domain).await,
            OptOutAction::List => cmd_opt_out_list(&orchestrator).await,
        },
    }
}

async fn cmd_seed(orchestrator: &Orchestrator, file: &PathBuf) -> Result<()> {
    let drafts = read_drafts(file)?;
    let total = drafts.len();
    let mut ids = Vec::with_capacity(total);
    for draft in drafts {
        let candidate = orchestrator.stores().candidates.upsert(draft).await?;
        ids.push(candidate.id);
    }
    print_json(&json!({ "seeded": total, "candidate_ids": ids }))
}

async fn cmd_discover(orchestrator: &Orchestrator, file: &PathBuf) -> Result<()> {
    let sources: Vec<Box<dyn CandidateSource>> = vec![Box::new(JsonFileSource {
        path: file.clone(),
    })];
    let summary = run_discover(&sources, orchestrator.stores().candidates.as_ref()).await?;
    print_json(&summary)
}

async fn cmd_qualify(
    orchestrator: &Orchestrator,
    limit: Option<usize>,
    min_score: Option<i32>,
) -> Result<()> {
    let stores = orchestrator.stores();
    let qualified = qualify_candidates(
        stores.candidates.as_ref(),
        stores.ledger.as_ref(),
        stores.opt_outs.as_ref(),
        orchestrator.config(),
        limit,
        min_score,
    )
    .await?;

    let rows: Vec<_> = qualified
        .iter()
        .map(|q| {
            json!({
                "candidate_id": q.candidate.id,
                "name": q.candidate.name,
                "source_url": q.candidate.source_url,
                "source": q.candidate.source_platform,
                "score": q.score,
                "reasons": q.reasons,
                "strategies": q.strategies.iter().map(|s| {
                    json!({ "channel": s.channel, "url": s.url, "priority": s.priority })
                }).collect::<Vec<_>>(),
            })
        })
        .collect();
    print_json(&json!({ "qualified": rows.len(), "candidates": rows }))
}

async fn cmd_preview(orchestrator: &Orchestrator, ids: &[String], campaign: &str) -> Result<()> {
    let messages = preview_messages(orchestrator, ids, campaign).await?;
    print_json(&json!({ "prepared": messages.len(), "messages": messages }))
}

async fn cmd_execute(orchestrator: &Orchestrator, ids: &[String], campaign: &str) -> Result<()> {
    let report = execute_messages(orchestrator, ids, campaign).await?;
    print_json(&report)
}

async fn cmd_pipeline(
    orchestrator: &Orchestrator,
    live: bool,
    limit: Option<usize>,
    campaign: &str,
    file: Option<PathBuf>,
) -> Result<()> {
    let sources: Vec<Box<dyn CandidateSource>> = file
        .into_iter()
        .map(|path| Box::new(JsonFileSource { path }) as Box<dyn CandidateSource>)
        .collect();

    let report = run_pipeline(
        orchestrator,
        &sources,
        &PipelineOptions {
            limit,
            dry_run: Some(!live),
            campaign: Some(campaign.to_string()),
        },
    )
    .await?;
    print_json(&report)
}

async fn cmd_status(orchestrator: &Orchestrator) -> Result<()> {
    let report = orchestrator.status().await?;
    print_json(&report)
}

async fn cmd_opt_out_add(
    orchestrator: &Orchestrator,
    domain: &str,
    reason: Option<String>,
) -> Result<()> {
    let stores = orchestrator.stores();
    let record = agentry_core::record_opt_out(
        stores.opt_outs.as_ref(),
        stores.ledger.as_ref(),
        domain,
        reason,
    )
    .await?;
    print_json(&record)
}

async fn cmd_opt_out_remove(orchestrator: &Orchestrator, domain: &str) -> Result<()> {
    let normalized = agentry_core::util::domain_from_url(domain);
    let removed = orchestrator.stores().opt_outs.remove(&normalized).await?;
    print_json(&json!({ "domain": normalized, "removed": removed }))
}

async fn cmd_opt_out_list(orchestrator: &Orchestrator) -> Result<()> {
    let entries = orchestrator.stores().opt_outs.list().await?;
    print_json(&json!({ "count": entries.len(), "domains": entries }))
}
