//! repomap CLI - Main entry point
//!
//! 결과는 stdout 에 JSON 으로, 로그는 stderr 로 출력한다.

use clap::{Args as ClapArgs, Parser, Subcommand};
use repomap_core::repomap::{CacheStatus, InitOutcome, UpdateOutcome};
use repomap_core::{EvidenceOptions, InitOptions, RepoMapper, SummaryOptions, UpdateOptions};
use repomap_foundation::RepoMapSettings;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// repomap - repository symbol map for drift detection
#[derive(Parser, Debug)]
#[command(name = "repomap")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Repository root
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Log level (RUST_LOG overrides)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the repo map from scratch
    Init {
        /// Rebuild even if a map already exists
        #[arg(short, long)]
        force: bool,

        /// Scan only these languages instead of detecting them
        #[arg(long = "language", value_name = "LANG")]
        languages: Vec<String>,

        /// Maximum files scanned per language
        #[arg(long, allow_negative_numbers = true)]
        max_files_per_language: Option<i64>,
    },
    /// Refresh the map from git changes since the recorded commit
    Update {
        /// Full rebuild instead of incremental update
        #[arg(long)]
        full: bool,
    },
    /// Show stored map status and staleness
    Status,
    /// Bounded overview of the map for drift detection
    Summary {
        #[arg(long, allow_negative_numbers = true)]
        max_files: Option<i64>,

        #[arg(long, allow_negative_numbers = true)]
        max_symbols_per_type: Option<i64>,

        #[arg(long, allow_negative_numbers = true)]
        max_dependencies_per_file: Option<i64>,

        /// Skip the git staleness check
        #[arg(long)]
        no_staleness: bool,
    },
    /// Find files and symbols matching terms
    Evidence {
        #[arg(required = true)]
        terms: Vec<String>,

        #[command(flatten)]
        limits: EvidenceArgs,
    },
    /// Find files related to feature descriptions
    Feature {
        #[arg(required = true)]
        features: Vec<String>,

        #[command(flatten)]
        limits: EvidenceArgs,
    },
}

#[derive(ClapArgs, Debug)]
struct EvidenceArgs {
    #[arg(long, allow_negative_numbers = true)]
    max_terms: Option<i64>,

    #[arg(long, allow_negative_numbers = true)]
    max_matches_per_term: Option<i64>,

    #[arg(long, allow_negative_numbers = true)]
    max_symbols_per_type: Option<i64>,

    #[arg(long, allow_negative_numbers = true)]
    max_symbols_per_match: Option<i64>,
}

impl From<EvidenceArgs> for EvidenceOptions {
    fn from(args: EvidenceArgs) -> Self {
        EvidenceOptions {
            max_terms: args.max_terms,
            max_matches_per_term: args.max_matches_per_term,
            max_symbols_per_type: args.max_symbols_per_type,
            max_symbols_per_match: args.max_symbols_per_match,
        }
    }
}

/// init/update 출력 (맵 전체 대신 요약)
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MutationReport<'a> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<CacheStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    map_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    changes: Option<&'a repomap_core::ChangeSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    staleness: Option<&'a repomap_core::Staleness>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    install_suggestion: Option<&'a str>,
}

impl<'a> MutationReport<'a> {
    fn from_init(outcome: &'a InitOutcome, map_path: String) -> Self {
        Self {
            success: outcome.success,
            status: outcome.map.as_ref().map(CacheStatus::from_map),
            map_path: outcome.success.then_some(map_path),
            changes: None,
            staleness: None,
            error: outcome.error.as_deref(),
            install_suggestion: outcome.install_suggestion.as_deref(),
        }
    }

    fn from_update(outcome: &'a UpdateOutcome, map_path: String) -> Self {
        Self {
            success: outcome.success,
            status: outcome.map.as_ref().map(CacheStatus::from_map),
            map_path: outcome.success.then_some(map_path),
            changes: outcome.changes.as_ref(),
            staleness: outcome.staleness.as_ref(),
            error: outcome.error.as_deref(),
            install_suggestion: outcome.install_suggestion.as_deref(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    // Initialize logging (stderr, stdout 은 JSON 전용)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let root = args.root.canonicalize().unwrap_or_else(|_| args.root.clone());
    let settings = RepoMapSettings::load(&root)?;
    debug!("Settings: {:?}", settings);

    let map_path = repomap_core::CacheStore::new(settings.storage.clone())
        .map_path(&root)
        .display()
        .to_string();
    let mapper = RepoMapper::with_defaults(settings);

    let success = match args.command {
        Command::Init {
            force,
            languages,
            max_files_per_language,
        } => {
            let options = InitOptions {
                force,
                languages: (!languages.is_empty()).then_some(languages),
                max_files_per_language,
            };
            let outcome = mapper.init(&root, &options).await;
            print_json(&MutationReport::from_init(&outcome, map_path))?;
            outcome.success
        }
        Command::Update { full } => {
            let outcome = mapper.update(&root, &UpdateOptions { full }).await;
            print_json(&MutationReport::from_update(&outcome, map_path))?;
            outcome.success
        }
        Command::Status => {
            print_json(&mapper.status(&root))?;
            true
        }
        Command::Summary {
            max_files,
            max_symbols_per_type,
            max_dependencies_per_file,
            no_staleness,
        } => {
            let options = SummaryOptions {
                max_files,
                max_symbols_per_type,
                max_dependencies_per_file,
                include_staleness: Some(!no_staleness),
            };
            let summary = mapper.summarize_for_drift(&root, &options);
            print_json(&summary)?;
            summary.available
        }
        Command::Evidence { terms, limits } => {
            let report = mapper.find_evidence(&root, &terms, &limits.into());
            print_json(&report)?;
            report.available
        }
        Command::Feature { features, limits } => {
            let report = mapper.find_feature_evidence(&root, &features, &limits.into());
            print_json(&report)?;
            report.available
        }
    };

    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
