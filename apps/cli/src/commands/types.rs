//! Argument groups shared between subcommands.

use clap::Args;
use keel_launcher::{LaunchOptions, Scheduler, distconv_environment, profiling_args};
use keel_schema::OptimizerPreset;
use keel_schema::presets::DEFAULT_LEARNING_RATE;
use std::path::PathBuf;

/// Where type definitions come from.
#[derive(Args, Debug, Clone, Default)]
pub struct SchemaArgs {
    /// Encoded FileDescriptorSet to use instead of the built-in schema
    /// (e.g. from `protoc --descriptor_set_out`)
    #[arg(long, global = true, value_name = "PATH")]
    pub descriptor_set: Option<PathBuf>,

    /// Package searched for type names; repeat for several. Defaults to
    /// every package in the schema
    #[arg(long = "package", global = true, value_name = "NAME")]
    pub packages: Vec<String>,
}

/// Allocation settings.
#[derive(Args, Debug, Clone, Default)]
pub struct SchedulerArgs {
    /// Number of compute nodes
    #[arg(long, value_name = "NUM")]
    pub nodes: Option<u32>,

    /// Number of processes per compute node
    #[arg(long, value_name = "NUM")]
    pub procs_per_node: Option<u32>,

    /// Scheduler partition
    #[arg(long, value_name = "NAME")]
    pub partition: Option<String>,

    /// Scheduler account
    #[arg(long, value_name = "NAME")]
    pub account: Option<String>,

    /// Scheduler reservation
    #[arg(long, value_name = "NAME")]
    pub reservation: Option<String>,

    /// Time limit (in minutes)
    #[arg(long, value_name = "MIN")]
    pub time_limit: Option<u32>,

    /// Set up (but do not run) the experiment
    #[arg(long)]
    pub setup_only: bool,
}

impl SchedulerArgs {
    /// Override `options` with the values given on the command line.
    pub fn apply(&self, mut options: LaunchOptions) -> LaunchOptions {
        if let Some(nodes) = self.nodes {
            options.nodes = nodes;
        }
        if let Some(procs) = self.procs_per_node {
            options.procs_per_node = procs;
        }
        if let Some(ref partition) = self.partition {
            options.partition = Some(partition.clone());
        }
        if let Some(ref account) = self.account {
            options.account = Some(account.clone());
        }
        if let Some(ref reservation) = self.reservation {
            options.reservation = Some(reservation.clone());
        }
        if let Some(minutes) = self.time_limit {
            options.time_limit = Some(minutes);
        }
        if self.setup_only {
            options.setup_only = true;
        }
        options
    }
}

#[derive(Args, Debug, Clone)]
pub struct OptimizerArgs {
    /// Replace the experiment's optimizer (momentum, sgd, adam, adagrad, rmsprop)
    #[arg(long, value_name = "TYPE")]
    pub optimizer: Option<OptimizerPreset>,

    /// Optimizer learning rate
    #[arg(long, default_value_t = DEFAULT_LEARNING_RATE, value_name = "RATE")]
    pub optimizer_learning_rate: f64,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ProfilingArgs {
    /// Enable profiling instrumentation and markers
    #[arg(long)]
    pub profile: bool,

    /// Enable profiling initialization
    #[arg(long)]
    pub profile_init: bool,

    /// Enable Caliper
    #[arg(long)]
    pub caliper: bool,

    /// Configuration string for Caliper; implies --caliper
    #[arg(long, value_name = "CONFIG")]
    pub caliper_config: Option<String>,
}

impl ProfilingArgs {
    /// Trainer arguments for the Caliper settings.
    pub fn trainer_args(&self) -> Vec<String> {
        profiling_args(self.caliper, self.caliper_config.as_deref())
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct DistconvArgs {
    /// Export the recommended Distconv environment
    #[arg(long)]
    pub distconv: bool,

    /// Read a single sample in parallel
    #[arg(long, requires = "distconv")]
    pub parallel_io: bool,

    /// Number of processes reading a single sample
    #[arg(long, default_value_t = 1, value_name = "NUM")]
    pub num_io_partitions: u32,

    /// Initialize NVSHMEM
    #[arg(long, requires = "distconv")]
    pub init_nvshmem: bool,
}

impl DistconvArgs {
    pub fn apply(&self, mut options: LaunchOptions) -> LaunchOptions {
        if self.distconv {
            for (key, value) in distconv_environment(self.parallel_io, self.num_io_partitions, self.init_nvshmem) {
                options.environment.entry(key).or_insert(value);
            }
        }
        options
    }
}

/// Arguments of `keel launch`.
#[derive(Args, Debug, Clone)]
pub struct LaunchArgs {
    /// JSON experiment description ("-" reads stdin)
    pub input: PathBuf,

    /// Work directory (default: ./<timestamp>_<job name>)
    #[arg(long, value_name = "DIR")]
    pub work_dir: Option<PathBuf>,

    /// Batch script path (default: <work dir>/batch.sh)
    #[arg(long, value_name = "PATH")]
    pub script_file: Option<PathBuf>,

    /// Job name
    #[arg(long, value_name = "NAME")]
    pub job_name: Option<String>,

    /// Scheduler (slurm, lsf, shell)
    #[arg(long, value_name = "NAME")]
    pub scheduler: Option<Scheduler>,

    /// System to tune for (default: detected from the hostname)
    #[arg(long, value_name = "NAME")]
    pub system: Option<String>,

    /// Training executable
    #[arg(long, value_name = "PATH")]
    pub trainer: Option<String>,

    /// Parallel launcher program (default: srun, jsrun or mpirun)
    #[arg(long, value_name = "PROGRAM")]
    pub launcher: Option<String>,

    /// Extra launcher argument; repeat for several
    #[arg(long = "launcher-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub launcher_args: Vec<String>,

    /// Environment variable exported in the script (KEY=VALUE)
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_env)]
    pub environment: Vec<(String, String)>,

    /// Replace an existing batch script
    #[arg(long)]
    pub overwrite: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub scheduler_args: SchedulerArgs,

    #[command(flatten)]
    pub optimizer: OptimizerArgs,

    #[command(flatten)]
    pub profiling: ProfilingArgs,

    #[command(flatten)]
    pub distconv: DistconvArgs,

    /// Arguments passed to the training executable
    #[arg(last = true, value_name = "TRAINER_ARGS")]
    pub trainer_args: Vec<String>,
}

fn parse_env(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got {s:?}")),
    }
}
