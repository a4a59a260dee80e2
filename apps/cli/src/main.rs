//! keel CLI - build experiments from the schema and launch them on HPC systems
//!
//! The `keel` command lists and describes the types synthesized from the
//! experiment schema, turns JSON descriptions into experiment files, and
//! writes, runs or submits the batch script that trains on them.

mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::types::{LaunchArgs, OptimizerArgs, ProfilingArgs, SchemaArgs};
use commands::{build, catalog, describe, launch, platform};
use keel_launcher::{LauncherConfig, Scheduler};

/// keel - schema-driven experiments for HPC trainers
#[derive(Parser, Debug)]
#[command(
    name = "keel",
    author,
    version,
    about = "keel - schema-driven experiments for HPC trainers",
    long_about = "keel builds training experiments from a Protobuf schema and launches them through Slurm, LSF or mpirun.\nTypes are synthesized at runtime from the built-in schema or a descriptor set."
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    #[command(flatten)]
    schema: SchemaArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the synthesized types
    ///
    /// Types are grouped by the container message they were generated from
    /// (Layer, Callback, Optimizer, ...).
    Types {
        /// Only list this family
        #[arg(long)]
        family: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the fields, enums and base parameters of a type
    Describe {
        /// Type name (e.g. FullyConnected)
        name: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Build an experiment file from a JSON description
    Build {
        /// JSON experiment description ("-" reads stdin)
        input: PathBuf,

        /// Output file (default: text format on stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the binary encoding instead of text format
        #[arg(long)]
        binary: bool,

        #[command(flatten)]
        optimizer: OptimizerArgs,

        #[command(flatten)]
        profiling: ProfilingArgs,
    },

    /// Build an experiment and write, run or submit its batch script
    ///
    /// The script is only written with --setup-only, run directly inside an
    /// existing allocation, and submitted to the scheduler otherwise.
    Launch(Box<LaunchArgs>),

    /// Show the known HPC systems and their tuning
    Platform {
        /// System to show (default: list all)
        system: Option<String>,

        /// Processes per node used for tuning
        #[arg(long)]
        procs_per_node: Option<u32>,

        /// Scheduler used for tuning (default: the system's)
        #[arg(long)]
        scheduler: Option<Scheduler>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();
    let launcher_config = config::load_config();

    let configured_level = launcher_config.as_ref().ok().and_then(|c| c.log_level.as_deref());
    let level = match args.log_level.as_deref().or(configured_level).unwrap_or("info") {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to install logger: {e}");
    }

    let result = launcher_config.map_err(anyhow::Error::from).and_then(|config| run(args, &config));
    match result {
        Ok(0) => ExitCode::SUCCESS,
        Ok(status) => ExitCode::from(u8::try_from(status).unwrap_or(1)),
        Err(e) => {
            eprintln!("{} {e:#}", "Error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args, launcher_config: &LauncherConfig) -> anyhow::Result<i32> {
    if let Command::Platform { system, procs_per_node, scheduler, json } = &args.command {
        platform::execute(system.as_deref(), *procs_per_node, *scheduler, *json)?;
        return Ok(0);
    }

    let registry = commands::load_registry(&args.schema)?;
    match args.command {
        Command::Types { family, json } => catalog::execute(&registry, family.as_deref(), json)?,
        Command::Describe { name, json } => describe::execute(&registry, &name, json)?,
        Command::Build { input, output, binary, optimizer, profiling } => {
            build::execute(&registry, &input, output.as_deref(), binary, &optimizer, &profiling)?;
        }
        Command::Launch(launch_args) => return launch::execute(&registry, &launch_args, launcher_config),
        Command::Platform { .. } => {}
    }
    Ok(0)
}
