mod profile;
mod registry;

use std::path::PathBuf;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use seedbed_core::{Error as CoreError, InsertStrategy, RowTarget};
use seedbed_generate::{CancelFlag, FakeValueSource, Orchestrator, RunFailure, workforce};
use seedbed_store::{ConnectionConfig, Connector, MemoryConnector, PgConnector, StoreError};
use thiserror::Error;
use uuid::Uuid;

use profile::{RunProfile, parse_count, parse_strategy};
use registry::{RunContext, init_console_logging, init_run_logging, start_run, write_report};

/// Exit status after a second Ctrl-C (128 + SIGINT).
const INTERRUPTED_EXIT_CODE: i32 = 130;

#[derive(Debug, Error)]
enum CliError {
    #[error("registry error: {0}")]
    Registry(#[from] registry::RegistryError),
    #[error("{0}")]
    Core(#[from] CoreError),
    #[error("{0}")]
    Store(#[from] StoreError),
    #[error("{0}")]
    Run(#[from] Box<RunFailure>),
    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "seedbed", version, about = "Populate a workforce database with synthetic data")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate and insert rows.
    Populate(PopulateArgs),
    /// Print the resolved order and strategies without touching a database.
    Plan(PlanArgs),
    /// List the entity catalog.
    Entities,
}

#[derive(Args, Debug, Default)]
struct SelectionArgs {
    /// TOML run profile; flags given here take precedence.
    #[arg(long, value_name = "FILE")]
    profile: Option<PathBuf>,
    /// Entities to populate (comma separated). Defaults to the whole catalog.
    #[arg(long, value_delimiter = ',', value_name = "ENTITY")]
    only: Vec<String>,
    /// Per-entity insert strategy override.
    #[arg(long = "strategy", value_name = "ENTITY=atomic|tolerant", value_parser = parse_strategy)]
    strategies: Vec<(String, InsertStrategy)>,
    /// Row count override for fixed-count entities.
    #[arg(long = "count", value_name = "ENTITY=N", value_parser = parse_count)]
    counts: Vec<(String, u64)>,
    /// Seed for every random draw.
    #[arg(long)]
    seed: Option<u64>,
    /// Load existing ids for referenced entities outside the selection.
    #[arg(long, default_value_t = false)]
    preload_external: bool,
}

impl SelectionArgs {
    /// Profile file (if any) with the command-line flags layered on top.
    fn resolve(&self, locale: Option<String>) -> Result<RunProfile, CliError> {
        let base = match &self.profile {
            Some(path) => RunProfile::load(path)?,
            None => RunProfile::default(),
        };
        let flags = RunProfile {
            seed: self.seed,
            only: (!self.only.is_empty()).then(|| self.only.clone()),
            strategies: self.strategies.iter().cloned().collect(),
            counts: self.counts.iter().cloned().collect(),
            preload_external: self.preload_external.then_some(true),
            locale,
        };
        Ok(base.merge(flags))
    }
}

#[derive(Args, Debug)]
struct PopulateArgs {
    #[command(flatten)]
    selection: SelectionArgs,
    /// Run against an in-memory database instead of PostgreSQL.
    #[arg(long, default_value_t = false)]
    dry_run: bool,
    /// Locale for names, addresses and text (en_US or pt_BR).
    #[arg(long)]
    locale: Option<String>,
    /// Output directory for runs.
    #[arg(long, default_value = "runs")]
    run_dir: PathBuf,
    /// Database URL; falls back to DATABASE_URL, then DB_HOST/DB_PORT/DB_NAME/DB_USER/DB_PASSWORD.
    #[arg(long, value_name = "CONNECTION_STRING")]
    conn: Option<String>,
}

#[derive(Args, Debug)]
struct PlanArgs {
    #[command(flatten)]
    selection: SelectionArgs,
    /// Print the plan as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Populate(args) => run_populate(args).await,
        Command::Plan(args) => run_plan(args),
        Command::Entities => run_entities(),
    }
}

async fn run_populate(args: PopulateArgs) -> Result<(), CliError> {
    let PopulateArgs {
        selection,
        dry_run,
        locale,
        run_dir,
        conn,
    } = args;

    let profile = selection.resolve(locale)?;
    let locale = profile.locale()?;
    let options = profile.run_options();

    let connector: Box<dyn Connector> = if dry_run {
        Box::new(MemoryConnector::new().enforce_references(&workforce::descriptors()))
    } else {
        Box::new(PgConnector::new(ConnectionConfig::from_env(conn.as_deref())?))
    };

    let orchestrator = Orchestrator::new(workforce::catalog(), options.clone())
        .with_value_source(FakeValueSource::new(locale))
        .with_run_id(Uuid::new_v4().to_string());
    let plan = orchestrator.plan()?;

    let run_ctx = RunContext {
        run_id: orchestrator.run_id().to_string(),
        started_at: chrono::Utc::now(),
        run_dir,
        dry_run,
        locale: locale.to_string(),
        profile: selection.profile.clone(),
        options,
        connection: connector.describe(),
    };
    let run_paths = start_run(&run_ctx)?;
    init_run_logging(&run_paths.logs_path)?;

    tracing::info!(
        event = "run_started",
        run_id = %run_ctx.run_id,
        target = %run_ctx.connection,
        entities = plan.steps.len(),
        dry_run,
    );

    let cancel = orchestrator.cancel_flag();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            match interrupt(&cancel) {
                Interrupt::Cancel => {
                    tracing::warn!(event = "cancel_requested", "press Ctrl-C again to abort immediately");
                }
                Interrupt::Abort => {
                    tracing::error!(event = "cancel_forced");
                    std::process::exit(INTERRUPTED_EXIT_CODE);
                }
            }
        }
    });

    let timer = Instant::now();
    let outcome = orchestrator.run(connector.as_ref()).await;
    let report = match &outcome {
        Ok(report) => report,
        Err(failure) => &failure.report,
    };
    write_report(&run_paths, report)?;
    tracing::info!(event = "report_written", path = %run_paths.report_path.display());

    tracing::info!(
        event = "run_finished",
        state = %report.state,
        inserted = report.total_inserted(),
        rejected = report.total_rejected(),
        duration_ms = timer.elapsed().as_millis() as u64,
    );

    outcome.map(|_| ()).map_err(|failure| CliError::Run(Box::new(failure)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    /// Stop at the next entity boundary.
    Cancel,
    /// A cancellation was already pending; leave without waiting.
    Abort,
}

fn interrupt(cancel: &CancelFlag) -> Interrupt {
    if cancel.is_cancelled() {
        return Interrupt::Abort;
    }
    cancel.cancel();
    Interrupt::Cancel
}

fn run_plan(args: PlanArgs) -> Result<(), CliError> {
    init_console_logging()?;
    let profile = args.selection.resolve(None)?;
    let orchestrator = Orchestrator::new(workforce::catalog(), profile.run_options());
    let graph = orchestrator.catalog().graph()?.report();
    let plan = orchestrator.plan()?;

    if args.json {
        let output = serde_json::json!({ "graph": graph, "plan": plan });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!(
        "catalog: {} entities, {} references",
        graph.summary.nodes, graph.summary.edges
    );

    for (idx, step) in plan.steps.iter().enumerate() {
        let after = if step.dependencies.is_empty() {
            String::new()
        } else {
            format!("  after {}", step.dependencies.join(", "))
        };
        println!(
            "{:>2}. {:<32} {:<8} {}{after}",
            idx + 1,
            step.descriptor.name,
            step.strategy,
            describe_target(&step.descriptor.target),
        );
    }
    if !plan.external.is_empty() {
        println!("external: {}", plan.external.join(", "));
    }
    Ok(())
}

fn run_entities() -> Result<(), CliError> {
    for descriptor in workforce::descriptors() {
        println!(
            "{:<32} {:<8} {}",
            descriptor.name,
            descriptor.strategy,
            describe_target(&descriptor.target)
        );
    }
    Ok(())
}

fn describe_target(target: &RowTarget) -> String {
    match target {
        RowTarget::Fixed { rows } => format!("{rows} rows"),
        RowTarget::PerParent {
            parent,
            coverage,
            fan_out,
        } => {
            let (min, max) = (fan_out.min(), fan_out.max());
            let per = if min == max {
                min.to_string()
            } else {
                format!("{min}-{max}")
            };
            format!("{per} per {parent} ({:.0}% covered)", coverage * 100.0)
        }
    }
}
