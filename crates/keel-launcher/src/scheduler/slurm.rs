use super::script::{hms, BatchScript, ScriptCore};
use crate::error::LaunchResult;
use crate::options::{LaunchOptions, Scheduler};
use std::path::PathBuf;

pub const SUBMIT: &str = "sbatch";
pub const LAUNCHER: &str = "srun";
pub const ALLOCATION_ENV: &str = "SLURM_JOB_ID";

#[derive(Debug, Clone)]
pub struct SlurmScript {
    core: ScriptCore,
    nodes: u32,
    procs_per_node: u32,
    total_procs: u32,
    launcher: String,
    launcher_args: Vec<String>,
}

impl SlurmScript {
    pub fn new(
        script_file: PathBuf,
        work_dir: PathBuf,
        options: &LaunchOptions,
        launcher_args: Vec<String>,
    ) -> LaunchResult<Self> {
        let mut core = ScriptCore::new(script_file, work_dir);
        core.push_header(format!("#SBATCH --chdir={}", core.work_dir.display()));
        core.push_header(format!("#SBATCH --output={}", core.out_log().display()));
        core.push_header(format!("#SBATCH --error={}", core.err_log().display()));
        core.push_header(format!("#SBATCH --nodes={}", options.nodes));
        if let Some(minutes) = options.time_limit {
            core.push_header(format!("#SBATCH --time={}", hms(minutes)));
        }
        core.push_header(format!("#SBATCH --job-name={}", options.job_name));
        if let Some(partition) = &options.partition {
            core.push_header(format!("#SBATCH --partition={partition}"));
        }
        if let Some(account) = &options.account {
            core.push_header(format!("#SBATCH --account={account}"));
        }
        if let Some(reservation) = &options.reservation {
            core.push_header(format!("#SBATCH --reservation={reservation}"));
        }

        Ok(Self {
            core,
            nodes: options.nodes,
            procs_per_node: options.procs_per_node,
            total_procs: options.total_procs()?,
            launcher: options.launcher.clone().unwrap_or_else(|| LAUNCHER.to_string()),
            launcher_args,
        })
    }
}

impl BatchScript for SlurmScript {
    fn scheduler(&self) -> Scheduler {
        Scheduler::Slurm
    }

    fn core(&self) -> &ScriptCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ScriptCore {
        &mut self.core
    }

    fn allocation_env(&self) -> Option<&'static str> {
        Some(ALLOCATION_ENV)
    }

    fn parallel_command(&self, command: &[String]) -> Vec<String> {
        let mut line = vec![self.launcher.clone()];
        line.extend(self.launcher_args.iter().cloned());
        line.push(format!("--nodes={}", self.nodes));
        line.push(format!("--ntasks={}", self.total_procs));
        line.extend(command.iter().cloned());
        line
    }

    fn submit(&self, overwrite: bool) -> LaunchResult<i32> {
        self.core.write(overwrite)?;
        let script = self.core.script_file.display().to_string();
        self.core.submit_with(SUBMIT, &[script], false)
    }
}
