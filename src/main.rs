use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use label_allocator::allocation::{fingerprint, validate_plan, AllocationPlan, Allocator};
use label_allocator::config::Config;
use label_allocator::model::{TimeModel, WorkBatch, WorkerRegistry};
use label_allocator::persistence::{load_plan, render_plan, PlanWriter, WriteOutcome};
use label_allocator::utils::format_hours;

#[derive(Parser)]
#[command(name = "label-allocator")]
#[command(version, about = "Plan labeling work across the labeler pool", long_about = None)]
struct Cli {
    /// Config file (default: <config dir>/label-allocator/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Allocate the prompt batch and write the plan
    Allocate {
        #[command(flatten)]
        inputs: InputArgs,
        /// Plan output path
        #[arg(long)]
        out: Option<PathBuf>,
        /// Print the plan instead of writing it
        #[arg(long)]
        dry_run: bool,
    },
    /// Check a written plan against the current inputs
    Check {
        #[command(flatten)]
        inputs: InputArgs,
        /// Plan to check
        #[arg(long)]
        plan: Option<PathBuf>,
    },
    /// Show configuration
    Config {
        /// Print the effective configuration
        #[arg(short, long)]
        show: bool,
    },
    /// Write sample roster and time model files
    Init {
        /// Directory to initialize (default: current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

/// Input file overrides shared by `allocate` and `check`
#[derive(Args)]
struct InputArgs {
    /// Prompt batch (JSONL)
    #[arg(long)]
    prompts: Option<PathBuf>,
    /// Labeler roster (YAML)
    #[arg(long)]
    labelers: Option<PathBuf>,
    /// Time model (YAML)
    #[arg(long)]
    time_model: Option<PathBuf>,
}

struct Inputs {
    time_model: TimeModel,
    registry: WorkerRegistry,
    batch: WorkBatch,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "label_allocator=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config_path = match cli.config {
        Some(path) => path,
        None => Config::config_path()?,
    };
    let config = Config::load_from(&config_path)?;

    match cli.command {
        Commands::Allocate {
            inputs,
            out,
            dry_run,
        } => {
            let out = out.unwrap_or_else(|| config.paths.out.clone());
            run_allocate(&config, inputs, &out, dry_run).await?;
        }
        Commands::Check { inputs, plan } => {
            let plan = plan.unwrap_or_else(|| config.paths.out.clone());
            run_check(&config, inputs, &plan).await?;
        }
        Commands::Config { show } => {
            handle_config(&config, &config_path, show)?;
        }
        Commands::Init { path } => {
            init_project(&path)?;
        }
    }

    Ok(())
}

async fn load_inputs(config: &Config, args: InputArgs) -> Result<Inputs> {
    let prompts = args.prompts.unwrap_or_else(|| config.paths.prompts.clone());
    let labelers = args.labelers.unwrap_or_else(|| config.paths.labelers.clone());
    let time_model = args.time_model.unwrap_or_else(|| config.paths.time_model.clone());

    let (batch, registry, time_model) = tokio::try_join!(
        WorkBatch::load(&prompts),
        WorkerRegistry::load(&labelers),
        TimeModel::load(&time_model),
    )?;

    info!(
        items = batch.len(),
        labelers = registry.len(),
        "Loaded allocation inputs"
    );
    if registry.is_empty() {
        warn!(path = %labelers.display(), "Labeler roster is empty");
    }

    Ok(Inputs {
        time_model,
        registry,
        batch,
    })
}

async fn run_allocate(config: &Config, args: InputArgs, out: &Path, dry_run: bool) -> Result<()> {
    let Inputs {
        time_model,
        registry,
        batch,
    } = load_inputs(config, args).await?;

    let mut allocator = Allocator::new(&time_model, &registry);
    if let Some(moves) = config.allocation.max_repair_moves {
        allocator = allocator.with_max_repair_moves(moves);
    }

    let plan = match allocator.allocate(&batch) {
        Ok(plan) => plan,
        Err(e) if e.is_defect() => {
            error!("{}", e);
            return Err(anyhow::Error::new(e)
                .context("Allocator produced an invalid plan; this is a bug, please report it"));
        }
        Err(e) => {
            return Err(anyhow::Error::new(e)
                .context("Allocation failed; adjust the labeler roster or prompt batch and retry"));
        }
    };

    info!(
        "Allocated {} hours of work across {} hours of capacity",
        format_hours(plan.totals.required_minutes),
        format_hours(plan.totals.capacity_minutes),
    );
    if !plan.repairs.is_empty() {
        info!(moves = plan.repairs.len(), "Repair pass rebalanced overloaded labelers");
    }

    if dry_run {
        print!("{}", render_plan(&plan)?);
        return Ok(());
    }

    match PlanWriter::new(out).write(&plan)? {
        WriteOutcome::Written => println!("✓ Plan written to {}", out.display()),
        WriteOutcome::Unchanged => println!("Plan unchanged at {}", out.display()),
    }
    println!("{}", plan.summary());

    Ok(())
}

async fn run_check(config: &Config, args: InputArgs, plan_path: &Path) -> Result<()> {
    let plan: AllocationPlan = load_plan(plan_path)?;
    let Inputs {
        time_model,
        registry,
        batch,
    } = load_inputs(config, args).await?;

    let current = fingerprint(&time_model, &registry, &batch);
    if current != plan.fingerprint {
        warn!(
            plan = %plan.fingerprint,
            inputs = %current,
            "Plan fingerprint does not match inputs"
        );
        anyhow::bail!(
            "Plan {} is stale: inputs changed since it was written; re-run allocate",
            plan_path.display()
        );
    }

    validate_plan(&plan, &time_model, &registry, &batch)
        .with_context(|| format!("Plan {} failed validation", plan_path.display()))?;

    println!("✓ Plan {} is current and valid", plan_path.display());
    println!("{}", plan.summary());
    Ok(())
}

fn handle_config(config: &Config, path: &Path, show: bool) -> Result<()> {
    if show {
        println!("Current configuration:");
        println!("{}", toml::to_string_pretty(config)?);
        return Ok(());
    }

    println!("Configuration file: {}", path.display());
    println!("Use --show to view the effective configuration.");
    Ok(())
}

const SAMPLE_LABELERS: &str = "\
labelers:
  - id: lb-01
    name: Labeler One
    hours_available: 10
    focus: [A, B]
  - id: lb-02
    name: Labeler Two
    hours_available: 5
    focus: [B, C]
";

const SAMPLE_TIME_MODEL: &str = "\
A: 20
B: 35
C: 50
C-Extended: 90
";

fn init_project(path: &Path) -> Result<()> {
    let config_dir = path.join("config");
    std::fs::create_dir_all(&config_dir)
        .with_context(|| format!("Failed to create {}", config_dir.display()))?;

    for (name, content) in [
        ("labelers.yml", SAMPLE_LABELERS),
        ("time_model.yml", SAMPLE_TIME_MODEL),
    ] {
        let target = config_dir.join(name);
        if target.exists() {
            println!("  {} already exists, leaving it alone", target.display());
            continue;
        }
        std::fs::write(&target, content)
            .with_context(|| format!("Failed to write {}", target.display()))?;
        println!("  wrote {}", target.display());
    }

    println!("✓ Initialized label-allocator project at: {}", path.display());
    println!("\nNext steps:");
    println!("  1. Edit config/labelers.yml with your labeler roster");
    println!("  2. Allocate: label-allocator allocate --prompts data/prompts/prompts.jsonl");

    Ok(())
}
