use super::script::{hm, BatchScript, ScriptCore};
use crate::error::LaunchResult;
use crate::options::{LaunchOptions, Scheduler};
use std::path::PathBuf;

pub const SUBMIT: &str = "bsub";
pub const LAUNCHER: &str = "jsrun";
pub const ALLOCATION_ENV: &str = "LSB_JOBID";

#[derive(Debug, Clone)]
pub struct LsfScript {
    core: ScriptCore,
    nodes: u32,
    procs_per_node: u32,
    launcher: String,
    launcher_args: Vec<String>,
}

impl LsfScript {
    pub fn new(script_file: PathBuf, work_dir: PathBuf, options: &LaunchOptions, launcher_args: Vec<String>) -> Self {
        let mut core = ScriptCore::new(script_file, work_dir);
        core.push_header(format!("#BSUB -cwd {}", core.work_dir.display()));
        core.push_header(format!("#BSUB -o {}", core.out_log().display()));
        core.push_header(format!("#BSUB -e {}", core.err_log().display()));
        core.push_header(format!("#BSUB -nnodes {}", options.nodes));
        if let Some(minutes) = options.time_limit {
            core.push_header(format!("#BSUB -W {}", hm(minutes)));
        }
        core.push_header(format!("#BSUB -J {}", options.job_name));
        if let Some(partition) = &options.partition {
            core.push_header(format!("#BSUB -q {partition}"));
        }
        if let Some(account) = &options.account {
            core.push_header(format!("#BSUB -G {account}"));
        }
        if let Some(reservation) = &options.reservation {
            core.push_header(format!("#BSUB -U {reservation}"));
        }

        Self {
            core,
            nodes: options.nodes,
            procs_per_node: options.procs_per_node,
            launcher: options.launcher.clone().unwrap_or_else(|| LAUNCHER.to_string()),
            launcher_args,
        }
    }
}

impl BatchScript for LsfScript {
    fn scheduler(&self) -> Scheduler {
        Scheduler::Lsf
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

    /// One resource set per node holding every rank of that node.
    fn parallel_command(&self, command: &[String]) -> Vec<String> {
        let mut line = vec![
            self.launcher.clone(),
            format!("--nrs={}", self.nodes),
            "--rs_per_host=1".to_string(),
            format!("--tasks_per_rs={}", self.procs_per_node),
            "--launch_distribution=packed".to_string(),
            "--cpu_per_rs=ALL_CPUS".to_string(),
            "--gpu_per_rs=ALL_GPUS".to_string(),
        ];
        line.extend(self.launcher_args.iter().cloned());
        line.extend(command.iter().cloned());
        line
    }

    /// `bsub < script`.
    fn submit(&self, overwrite: bool) -> LaunchResult<i32> {
        self.core.write(overwrite)?;
        self.core.submit_with(SUBMIT, &[], true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(options: &LaunchOptions) -> LsfScript {
        LsfScript::new(PathBuf::from("/w/batch.sh"), PathBuf::from("/w"), options, Vec::new())
    }

    #[test]
    fn test_header() {
        let options = LaunchOptions::default().with_nodes(4).with_time_limit(30).with_reservation("dat");
        let header = script(&options).core.header().to_vec();
        assert_eq!(header[0], "#!/bin/bash");
        assert!(header.contains(&"#BSUB -nnodes 4".to_string()));
        assert!(header.contains(&"#BSUB -W 0:30".to_string()));
        assert!(header.contains(&"#BSUB -J keel".to_string()));
        assert!(header.contains(&"#BSUB -U dat".to_string()));
        assert!(!header.iter().any(|l| l.starts_with("#BSUB -G")));
    }

    #[test]
    fn test_parallel_command() {
        let options = LaunchOptions::default().with_nodes(2).with_procs_per_node(4);
        let line = script(&options).parallel_command(&["lbann".to_string()]).join(" ");
        assert!(line.starts_with("jsrun --nrs=2 --rs_per_host=1 --tasks_per_rs=4"));
        assert!(line.ends_with(" lbann"));
    }
}
