//! Deployment announcement composer for GitLab projects.
//!
//! Prints announcements to stdout; logs and prompts go to stderr. Reads the
//! GitLab token from `--token`, `GITLAB_TOKEN`, or the token stored with
//! `shipnote token set`.
//!
//! # Examples
//!
//! ```sh
//! shipnote refs acme/web-app
//! shipnote announce acme/web-app --summarize --format all
//! shipnote ai-status
//! ```

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Local, TimeDelta};
use clap::{Parser, Subcommand, ValueEnum};
use shipnote::ai::local::{DEFAULT_MODEL, DEFAULT_MODEL_URL};
use shipnote::format::{
    DEFAULT_ISSUE_BASE_URL, DEPLOY_INTERVAL_MINUTES, DEPLOY_MIN_OFFSET_MINUTES, parse_deploy_time,
};
use shipnote::gitlab::DEFAULT_GITLAB_URL;
use shipnote::prelude::*;
use shipnote::store::GITLAB_TOKEN_KEY;
use shipnote_cli::config::{mask_token, resolve_project};
use shipnote_cli::select::{pick_pipeline, pick_range};
use shipnote_cli::{CliConfig, ConsentOutcome, summarize_with_consent};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Deployment announcement composer for GitLab projects.
#[derive(Parser)]
#[command(name = "shipnote", version)]
struct Cli {
    /// GitLab instance URL.
    #[arg(long, global = true, env = "SHIPNOTE_GITLAB_URL", default_value = DEFAULT_GITLAB_URL)]
    gitlab_url: String,

    /// GitLab access token (overrides the stored token).
    #[arg(long, global = true, env = "GITLAB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Data directory for the store. Defaults to ~/.shipnote.
    #[arg(long, global = true, env = "SHIPNOTE_HOME")]
    home: Option<PathBuf>,

    /// Local model used for summaries.
    #[arg(long, global = true, env = "SHIPNOTE_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Base URL of the local model server.
    #[arg(long, global = true, env = "SHIPNOTE_MODEL_URL", default_value = DEFAULT_MODEL_URL)]
    model_url: String,

    /// Issue tracker base URL for linking issue keys.
    #[arg(long, global = true, env = "SHIPNOTE_JIRA_URL", default_value = DEFAULT_ISSUE_BASE_URL)]
    jira_url: String,

    /// Disable AI summarization entirely.
    #[arg(long, global = true)]
    no_ai: bool,

    /// Debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List tags (newest first) and tag pipelines of a project.
    Refs {
        /// Project URL or namespace/project path.
        project: String,
    },
    /// Compose the deployment announcement.
    Announce(AnnounceArgs),
    /// Print only the AI summary of a tag range.
    Summarize {
        project: String,
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
        /// Consent to a model download without asking.
        #[arg(long)]
        yes: bool,
    },
    /// Show whether on-device summarization is usable.
    AiStatus,
    /// Inspect or clear cached summaries.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Manage the stored GitLab token.
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
}

#[derive(clap::Args)]
struct AnnounceArgs {
    /// Project URL or namespace/project path.
    project: String,
    /// Start of the range. Defaults to the tag before --to.
    #[arg(long)]
    from: Option<String>,
    /// End of the range. Defaults to the newest tag.
    #[arg(long)]
    to: Option<String>,
    /// Pipeline id. Defaults to the newest pipeline for --to.
    #[arg(long)]
    pipeline: Option<u64>,
    /// Deploy time as YYYY-MM-DDTHH:MM. Defaults to the next quarter hour
    /// at least ten minutes away.
    #[arg(long)]
    at: Option<String>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Slack)]
    format: OutputFormat,
    /// Add an on-device AI summary.
    #[arg(long)]
    summarize: bool,
    /// Consent to a model download without asking.
    #[arg(long)]
    yes: bool,
    /// Write the HTML notes into the GitLab release for --to.
    #[arg(long)]
    publish: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Slack,
    Changelog,
    Wiki,
    Html,
    All,
}

#[derive(Subcommand)]
enum CacheAction {
    /// List cached summaries and their age.
    Stats,
    /// Remove the summary for one tag range.
    Clear {
        project: String,
        from: String,
        to: String,
    },
    /// Remove every cached summary.
    ClearAll,
}

#[derive(Subcommand)]
enum TokenAction {
    /// Store a token. Reads it from stdin when omitted.
    Set { token: Option<String> },
    /// Show the stored token, masked.
    Show,
    /// Remove the stored token.
    Clear,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "warn,shipnote=debug,shipnote_cli=debug"
    } else {
        "warn,shipnote=info,shipnote_cli=info"
    };
    let filter =
        EnvFilter::try_from_env("SHIPNOTE_LOG").unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    let config = CliConfig {
        gitlab_url: cli.gitlab_url,
        token: cli.token,
        data_dir: cli.home.unwrap_or_else(shipnote_cli::config::default_data_dir),
        model: cli.model,
        model_url: cli.model_url,
        issue_base_url: cli.jira_url,
        ai_enabled: !cli.no_ai,
    };
    let store = config.build_store()?;

    match cli.command {
        Command::Refs { project } => {
            let gitlab = config.build_gitlab_client(store.as_ref())?;
            let slug = resolve_project(&project, &gitlab)?;
            let refs = gitlab.fetch_refs(&slug).await?;
            println!("Tags ({}):", refs.tags.len());
            for tag in &refs.tags {
                println!("  {tag}");
            }
            println!("Pipelines ({}):", refs.pipelines.len());
            for pipeline in &refs.pipelines {
                println!("  {}  {}", pipeline.label(), pipeline.web_url);
            }
            Ok(())
        }
        Command::Announce(args) => announce(&config, store, args).await,
        Command::Summarize {
            project,
            from,
            to,
            yes,
        } => {
            let gitlab = config.build_gitlab_client(store.as_ref())?;
            let slug = resolve_project(&project, &gitlab)?;
            let tags = gitlab.fetch_tags(&slug).await?;
            let (from, to) = pick_range(&tags, from, to)?;
            let commits = gitlab.fetch_comparison(&slug, &from, &to).await?;

            let workflow = config.build_workflow(store)?;
            let key = SummaryKey::new(slug.path(), from, to);
            let outcome = consent_on_terminal(&workflow, &commits, &key, &config.model, yes).await;
            workflow.cleanup().await;

            match outcome.map_err(|e| e.to_string())? {
                ConsentOutcome::Summary { text, from_cache } => {
                    if from_cache {
                        info!("Using cached summary");
                    }
                    println!("{text}");
                }
                ConsentOutcome::Declined => eprintln!("Summary skipped."),
            }
            Ok(())
        }
        Command::AiStatus => {
            let workflow = config.build_workflow(store)?;
            let status = workflow.check_availability().await;
            println!("Model:     {} at {}", config.model, config.model_url);
            println!("Available: {}", if status.available { "yes" } else { "no" });
            println!(
                "Summarize: {}",
                if status.button_enabled {
                    "enabled"
                } else {
                    "disabled"
                }
            );
            println!("Status:    {}", status.status_message);
            Ok(())
        }
        Command::Cache { action } => {
            let cache = SummaryCache::new(store);
            match action {
                CacheAction::Stats => print_cache_stats(&cache),
                CacheAction::Clear { project, from, to } => {
                    cache.clear(&project, &from, &to);
                    println!("Cleared cached summary for {project} {from}...{to}");
                }
                CacheAction::ClearAll => {
                    let removed = cache.clear_all();
                    println!("Cleared {removed} cached summaries");
                }
            }
            Ok(())
        }
        Command::Token { action } => match action {
            TokenAction::Set { token } => {
                let token = match token {
                    Some(token) => token,
                    None => read_token_from_stdin()?,
                };
                let token = token.trim();
                if token.is_empty() {
                    return Err("token is empty".to_string());
                }
                store.set(GITLAB_TOKEN_KEY, token)?;
                println!("Token saved.");
                Ok(())
            }
            TokenAction::Show => {
                match store.get(GITLAB_TOKEN_KEY)? {
                    Some(token) => println!("{}", mask_token(&token)),
                    None => println!("No token stored."),
                }
                Ok(())
            }
            TokenAction::Clear => {
                if store.remove(GITLAB_TOKEN_KEY)? {
                    println!("Token cleared.");
                } else {
                    println!("No token stored.");
                }
                Ok(())
            }
        },
    }
}

async fn announce(
    config: &CliConfig,
    store: Arc<dyn KvStore>,
    args: AnnounceArgs,
) -> Result<(), String> {
    let gitlab = config.build_gitlab_client(store.as_ref())?;
    let slug = resolve_project(&args.project, &gitlab)?;

    let (project, refs) = tokio::try_join!(gitlab.fetch_project(&slug), gitlab.fetch_refs(&slug))?;
    let (from, to) = pick_range(&refs.tags, args.from, args.to)?;
    let pipeline = pick_pipeline(&refs.pipelines, args.pipeline, &to)?;
    let commits = gitlab.fetch_comparison(&slug, &from, &to).await?;
    if commits.is_empty() {
        warn!("No commits between {from} and {to}");
    }

    let deploy_time = match args.at.as_deref() {
        Some(at) => parse_deploy_time(at)?,
        None => suggest_deploy_time(
            Local::now().naive_local(),
            DEPLOY_INTERVAL_MINUTES,
            DEPLOY_MIN_OFFSET_MINUTES,
        ),
    };

    let summary = if args.summarize {
        summary_for(config, store, &slug, &commits, &from, &to, args.yes).await
    } else {
        None
    };

    let announcement = Announcement {
        project_name: project.name,
        project_url: project.web_url.trim_end_matches('/').to_string(),
        pipeline,
        from_tag: from,
        to_tag: to,
        commits,
        deploy_time,
        summary,
        issue_base_url: config.issue_base_url.clone(),
    };

    let sections: Vec<(&str, String)> = match args.format {
        OutputFormat::Slack => vec![("Slack", announcement.slack_message())],
        OutputFormat::Changelog => vec![("Changelog", announcement.changelog())],
        OutputFormat::Wiki => vec![("Wiki", announcement.wiki_markdown())],
        OutputFormat::Html => vec![("Release notes", announcement.html_release_notes())],
        OutputFormat::All => vec![
            ("Slack", announcement.slack_message()),
            ("Changelog", announcement.changelog()),
            ("Wiki", announcement.wiki_markdown()),
            ("Release notes", announcement.html_release_notes()),
        ],
    };
    let titled = sections.len() > 1;
    for (title, body) in sections {
        if titled {
            println!("===== {title} =====");
        }
        println!("{body}");
    }

    if args.publish {
        gitlab
            .publish_release_notes(&slug, &announcement.to_tag, &announcement.html_release_notes())
            .await?;
        eprintln!("Published release notes for {}", announcement.to_tag);
    }
    Ok(())
}

/// Summary for the announcement. Failures are reported and yield `None`:
/// the announcement is still worth printing without one.
async fn summary_for(
    config: &CliConfig,
    store: Arc<dyn KvStore>,
    slug: &RepoSlug,
    commits: &[String],
    from: &str,
    to: &str,
    pre_confirmed: bool,
) -> Option<String> {
    let workflow = match config.build_workflow(store) {
        Ok(workflow) => workflow,
        Err(e) => {
            eprintln!("Warning: AI summary unavailable: {e}");
            return None;
        }
    };
    let key = SummaryKey::new(slug.path(), from, to);
    let outcome = consent_on_terminal(&workflow, commits, &key, &config.model, pre_confirmed).await;
    workflow.cleanup().await;

    match outcome {
        Ok(ConsentOutcome::Summary { text, from_cache }) => {
            if from_cache {
                info!("Using cached summary");
            }
            Some(text)
        }
        Ok(ConsentOutcome::Declined) => {
            eprintln!("Summary skipped.");
            None
        }
        Err(e) => {
            eprintln!("Warning: {e}");
            None
        }
    }
}

async fn consent_on_terminal(
    workflow: &SummarizationWorkflow,
    commits: &[String],
    key: &SummaryKey,
    model: &str,
    pre_confirmed: bool,
) -> Result<ConsentOutcome, SummarizeError> {
    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut output = std::io::stderr();
    summarize_with_consent(
        workflow,
        commits,
        key,
        model,
        pre_confirmed,
        &mut input,
        &mut output,
    )
    .await
}

fn print_cache_stats(cache: &SummaryCache) {
    let stats = cache.stats();
    println!("Cached summaries: {}", stats.total_cached);
    for entry in &stats.entries {
        let age = TimeDelta::milliseconds(entry.age);
        let created = DateTime::from_timestamp_millis(entry.created_at)
            .map(|t| t.with_timezone(&Local).format("%d %b %Y, %H:%M").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        println!(
            "  {} {}...{}  created {created} ({}d {}h ago)",
            entry.project,
            entry.from_tag,
            entry.to_tag,
            age.num_days(),
            age.num_hours() % 24,
        );
    }
    let unreadable = stats.total_cached.saturating_sub(stats.entries.len());
    if unreadable > 0 {
        println!("  ({unreadable} unreadable)");
    }
}

fn read_token_from_stdin() -> Result<String, String> {
    eprint!("GitLab token: ");
    std::io::stderr()
        .flush()
        .map_err(|e| format!("failed to write prompt: {e}"))?;
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| format!("failed to read token: {e}"))?;
    Ok(line)
}
