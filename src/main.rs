use anyhow::Context;
use clap::{Parser, Subcommand};
use devstats::config::{ConfigOverrides, JobConfig};
use devstats::error::{describe_error_code, ErrorCode, StatsError};
use devstats::job::run_job;
use devstats::pipeline::JobPreset;
use std::path::PathBuf;
use tracing::{debug, error, trace};
use tracing_subscriber::EnvFilter;

/// Device statistics over comma-separated readings
#[derive(Parser)]
#[command(name = "devstats", version)]
#[command(about = "Join readings against a device table and aggregate them per category", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a statistics job
    Run {
        /// Path to a YAML job file
        #[arg(short = 'c', long)]
        config: Option<PathBuf>,

        /// Job name shown in logs and the summary
        #[arg(long)]
        name: Option<String>,

        /// Built-in job to run
        #[arg(short, long, value_enum)]
        preset: Option<JobPreset>,

        /// Reference table (`id,category` per line)
        #[arg(short, long)]
        reference: Option<PathBuf>,

        /// Input file or directory of shards
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output file or directory, or `-` for stdout
        #[arg(short, long)]
        output: Option<String>,

        /// Number of map workers
        #[arg(short = 'w', long)]
        workers: Option<usize>,

        /// Number of reduce partitions
        #[arg(long)]
        reducers: Option<usize>,

        /// Disable the map-side combiner
        #[arg(long)]
        no_combiner: bool,

        /// Entries buffered per worker before a combine pass
        #[arg(long)]
        spill_threshold: Option<usize>,

        /// Field directions replacing the preset ordering, e.g. "desc, asc"
        #[arg(long)]
        order: Option<String>,

        /// Print the run summary as JSON on stderr
        #[arg(long)]
        summary: bool,
    },
    /// List the built-in jobs
    Presets,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(cli.verbose >= 2)
        .with_thread_ids(cli.verbose >= 2)
        .with_line_number(cli.verbose >= 2)
        .init();

    debug!("devstats started with verbosity level: {}", cli.verbose);
    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());

    let result = match cli.command {
        Commands::Run {
            config,
            name,
            preset,
            reference,
            input,
            output,
            workers,
            reducers,
            no_combiner,
            spill_threshold,
            order,
            summary,
        } => {
            let overrides = ConfigOverrides {
                name,
                preset,
                reference,
                input,
                output,
                workers,
                reducers,
                no_combiner,
                spill_threshold,
                order,
            };
            run(config, overrides, summary).await
        }
        Commands::Presets => {
            list_presets();
            Ok(())
        }
    };

    if let Err(e) = result {
        error!("Fatal error: {:#}", e);
        let exit_code = match e.downcast_ref::<StatsError>() {
            Some(stats_error) => {
                debug!(
                    code = stats_error.code(),
                    "{}",
                    describe_error_code(stats_error.code())
                );
                eprintln!("Error: {}", stats_error.user_message());
                stats_error.exit_code()
            }
            None => {
                eprintln!("Error: {e:#}");
                1
            }
        };
        std::process::exit(exit_code);
    }
}

async fn run(
    config: Option<PathBuf>,
    overrides: ConfigOverrides,
    print_summary: bool,
) -> anyhow::Result<()> {
    let job_config = match config {
        Some(path) => JobConfig::load(&path).await?,
        None => JobConfig::default(),
    };
    let plan = job_config.apply_overrides(overrides).resolve()?;
    debug!(?plan, "Resolved job plan");

    let summary = tokio::task::spawn_blocking(move || run_job(&plan))
        .await
        .map_err(|e| {
            StatsError::internal_with_code(ErrorCode::INTERNAL_TASK_JOIN, "Job task failed")
                .with_source(e)
        })??;

    if print_summary {
        let json =
            serde_json::to_string_pretty(&summary).context("Failed to serialize run summary")?;
        eprintln!("{}", json);
    }
    Ok(())
}

fn list_presets() {
    for preset in JobPreset::ALL {
        println!("{:<8} {}", preset.name(), preset.default_job_name());
        println!("         {}", preset.description());
    }
}
