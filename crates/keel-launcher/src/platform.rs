//! Static description of the supported HPC systems.
//!
//! Tuning logic lives in [`crate::tuning`]; this module only holds data and
//! system detection.

use crate::options::Scheduler;

/// Environment variable overriding hostname-based detection.
pub const SYSTEM_ENV: &str = "KEEL_SYSTEM";

/// Processes per node on systems without GPUs, one per socket.
pub const CPU_PROCS_PER_NODE: u32 = 2;

/// Partition used when a system does not name one.
pub const DEFAULT_PARTITION: &str = "pbatch";

/// Hardware topology quirks that need process placement tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    /// No special placement.
    Standard,
    /// Every GPU hangs off socket 0; only its cores are used.
    GpuSocketZero,
    /// Two sockets with GPUs split evenly; hwloc misreports GPUs as NUMA
    /// domains so thread affinity is set by hand.
    SplitSockets,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub name: &'static str,
    pub cores_per_node: u32,
    pub gpus_per_node: u32,
    pub scheduler: Scheduler,
    pub partition: &'static str,
    pub topology: Topology,
    /// Environment applied to every job on this system.
    pub environment: &'static [(&'static str, &'static str)],
}

impl Platform {
    #[must_use]
    pub fn has_gpu(&self) -> bool {
        self.gpus_per_node > 0
    }

    /// One process per GPU, or one per socket without GPUs.
    #[must_use]
    pub fn default_procs_per_node(&self) -> u32 {
        if self.has_gpu() {
            self.gpus_per_node
        } else {
            CPU_PROCS_PER_NODE
        }
    }
}

// MPI_Init in MVAPICH2-2.3 hangs with more than 35 processes unless RDMA
// connection management is disabled.
const MVAPICH_ENV: &[(&str, &str)] = &[("MV2_USE_RDMA_CM", "0")];

pub static PLATFORMS: &[Platform] = &[
    Platform {
        name: "catalyst",
        cores_per_node: 24,
        gpus_per_node: 0,
        scheduler: Scheduler::Slurm,
        partition: DEFAULT_PARTITION,
        topology: Topology::Standard,
        environment: MVAPICH_ENV,
    },
    Platform {
        name: "corona",
        cores_per_node: 48,
        gpus_per_node: 8,
        scheduler: Scheduler::Slurm,
        partition: DEFAULT_PARTITION,
        topology: Topology::Standard,
        environment: MVAPICH_ENV,
    },
    Platform {
        name: "lassen",
        cores_per_node: 44,
        gpus_per_node: 4,
        scheduler: Scheduler::Lsf,
        partition: DEFAULT_PARTITION,
        topology: Topology::SplitSockets,
        environment: MVAPICH_ENV,
    },
    Platform {
        name: "pascal",
        cores_per_node: 36,
        gpus_per_node: 2,
        scheduler: Scheduler::Slurm,
        partition: DEFAULT_PARTITION,
        topology: Topology::GpuSocketZero,
        environment: MVAPICH_ENV,
    },
    Platform {
        name: "quartz",
        cores_per_node: 36,
        gpus_per_node: 0,
        scheduler: Scheduler::Slurm,
        partition: DEFAULT_PARTITION,
        topology: Topology::Standard,
        environment: MVAPICH_ENV,
    },
    Platform {
        name: "ray",
        cores_per_node: 20,
        gpus_per_node: 4,
        scheduler: Scheduler::Lsf,
        partition: DEFAULT_PARTITION,
        topology: Topology::Standard,
        environment: MVAPICH_ENV,
    },
    Platform {
        name: "sierra",
        cores_per_node: 44,
        gpus_per_node: 4,
        scheduler: Scheduler::Lsf,
        partition: DEFAULT_PARTITION,
        topology: Topology::SplitSockets,
        environment: MVAPICH_ENV,
    },
];

#[must_use]
pub fn lookup(system: &str) -> Option<&'static Platform> {
    PLATFORMS.iter().find(|p| p.name == system)
}

/// System name from a hostname: `lassen709` becomes `lassen`.
#[must_use]
pub fn system_from_hostname(hostname: &str) -> String {
    let short = hostname.split('.').next().unwrap_or(hostname);
    short.chars().filter(|c| !c.is_ascii_digit()).collect()
}

/// Name of the system this process runs on.
///
/// `KEEL_SYSTEM` wins over the hostname. Returns `None` when neither is
/// available.
#[must_use]
pub fn detect_system() -> Option<String> {
    if let Ok(system) = std::env::var(SYSTEM_ENV) {
        if !system.is_empty() {
            return Some(system);
        }
    }
    let host = hostname::get().ok()?;
    let system = system_from_hostname(&host.to_string_lossy());
    if system.is_empty() {
        None
    } else {
        Some(system)
    }
}
