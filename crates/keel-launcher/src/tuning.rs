//! Per-platform launcher arguments and environment.

use crate::options::Scheduler;
use crate::platform::{Platform, Topology};
use std::collections::BTreeMap;

/// Launcher arguments and environment derived from the platform table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tuning {
    pub launcher_args: Vec<String>,
    pub environment: BTreeMap<String, String>,
}

impl Tuning {
    fn env(&mut self, key: &str, value: impl ToString) {
        self.environment.insert(key.to_string(), value.to_string());
    }
}

/// Tuning for `platform` under `scheduler` with `procs_per_node` ranks per
/// node. Unknown platforms get none.
#[must_use]
pub fn tune(platform: Option<&Platform>, scheduler: Scheduler, procs_per_node: u32) -> Tuning {
    let mut tuning = Tuning::default();
    let Some(platform) = platform else {
        return tuning;
    };
    let procs_per_node = procs_per_node.max(1);

    // Each rank picks the GPU matching its node-local rank, which mpibind
    // would pin to GPU 0. Exclusive compute mode breaks GPU discovery.
    if scheduler == Scheduler::Slurm && platform.has_gpu() {
        tuning.launcher_args.push("--mpibind=off".to_string());
        tuning.launcher_args.push("--nvidia_compute_mode=default".to_string());
    }

    match platform.topology {
        Topology::Standard => {}
        Topology::GpuSocketZero => {
            let cores_per_proc = (platform.cores_per_node / 2) / procs_per_node;
            tuning.env("AL_PROGRESS_RANKS_PER_NUMA_NODE", procs_per_node);
            tuning.env("OMP_NUM_THREADS", cores_per_proc.saturating_sub(1));
            if scheduler == Scheduler::Slurm {
                tuning.launcher_args.push(format!("--cpu_bind=mask_cpu:{}", cpu_masks(cores_per_proc, procs_per_node)));
            }
        }
        Topology::SplitSockets => {
            let cores_per_socket = platform.cores_per_node / 2;
            let procs_per_socket = procs_per_node.div_ceil(2);
            let cores_per_proc = cores_per_socket / procs_per_socket;
            tuning.env("AL_PROGRESS_RANKS_PER_NUMA_NODE", procs_per_socket);
            tuning.env("OMP_NUM_THREADS", cores_per_proc.saturating_sub(1));
            // OpenMPI over InfiniBand can fail when an MPI process forks.
            tuning.env("IBV_FORK_SAFE", 1);
        }
    }

    for (key, value) in platform.environment {
        tuning.env(key, value);
    }

    tuning
}

/// Comma-separated hex masks giving each rank its own block of
/// `cores_per_proc` consecutive cores.
fn cpu_masks(cores_per_proc: u32, procs: u32) -> String {
    let block = (1_u128 << cores_per_proc.min(64)) - 1;
    (0..procs)
        .map(|rank| {
            let shift = (rank * cores_per_proc).min(127);
            format!("{:#x}", block << shift)
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Platform arguments first, then the caller's.
#[must_use]
pub fn merge_launcher_args(tuned: &[String], caller: &[String]) -> Vec<String> {
    tuned.iter().chain(caller).cloned().collect()
}

/// Platform environment overlaid with the caller's; the caller wins on
/// collisions and every such override is logged.
#[must_use]
pub fn merge_environment(
    tuned: &BTreeMap<String, String>,
    caller: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged = tuned.clone();
    for (key, value) in caller {
        if let Some(previous) = merged.insert(key.clone(), value.clone()) {
            if previous != *value {
                tracing::warn!(key = %key, platform = %previous, caller = %value, "caller overrides platform environment");
            }
        }
    }
    merged
}

/// Recommended environment for distributed convolutions.
#[must_use]
pub fn distconv_environment(parallel_io: bool, num_io_partitions: u32, init_nvshmem: bool) -> BTreeMap<String, String> {
    let mut env: BTreeMap<String, String> = [
        ("DISTCONV_WS_CAPACITY_FACTOR", "0.8"),
        ("LBANN_DISTCONV_HALO_EXCHANGE", "AL"),
        ("LBANN_DISTCONV_TENSOR_SHUFFLER", "AL"),
        ("LBANN_DISTCONV_CONVOLUTION_FWD_ALGORITHM", "AUTOTUNE"),
        ("LBANN_DISTCONV_CONVOLUTION_BWD_DATA_ALGORITHM", "AUTOTUNE"),
        ("LBANN_DISTCONV_CONVOLUTION_BWD_FILTER_ALGORITHM", "AUTOTUNE"),
        ("LBANN_DISTCONV_RANK_STRIDE", "1"),
        ("LBANN_KEEP_ERROR_SIGNALS", "1"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    env.insert(
        "LBANN_DISTCONV_COSMOFLOW_PARALLEL_IO".to_string(),
        if parallel_io { "True" } else { "False" }.to_string(),
    );
    env.insert("LBANN_DISTCONV_NUM_IO_PARTITIONS".to_string(), num_io_partitions.to_string());
    if init_nvshmem {
        env.insert("LBANN_INIT_NVSHMEM".to_string(), "1".to_string());
    }
    env
}
