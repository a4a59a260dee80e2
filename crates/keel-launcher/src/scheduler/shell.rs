use super::script::{BatchScript, ScriptCore};
use crate::error::LaunchResult;
use crate::options::{LaunchOptions, Scheduler};
use std::path::PathBuf;

pub const LAUNCHER: &str = "mpirun";

/// Plain shell script launching with `mpirun`; there is no scheduler, so
/// it always runs inline.
#[derive(Debug, Clone)]
pub struct ShellScript {
    core: ScriptCore,
    procs_per_node: u32,
    total_procs: u32,
    launcher: String,
    launcher_args: Vec<String>,
}

impl ShellScript {
    pub fn new(
        script_file: PathBuf,
        work_dir: PathBuf,
        options: &LaunchOptions,
        launcher_args: Vec<String>,
    ) -> LaunchResult<Self> {
        Ok(Self {
            core: ScriptCore::new(script_file, work_dir),
            procs_per_node: options.procs_per_node,
            total_procs: options.total_procs()?,
            launcher: options.launcher.clone().unwrap_or_else(|| LAUNCHER.to_string()),
            launcher_args,
        })
    }
}

impl BatchScript for ShellScript {
    fn scheduler(&self) -> Scheduler {
        Scheduler::Shell
    }

    fn core(&self) -> &ScriptCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ScriptCore {
        &mut self.core
    }

    fn allocation_env(&self) -> Option<&'static str> {
        None
    }

    fn parallel_command(&self, command: &[String]) -> Vec<String> {
        let mut line = vec![
            self.launcher.clone(),
            "-np".to_string(),
            self.total_procs.to_string(),
            "-N".to_string(),
            self.procs_per_node.to_string(),
        ];
        line.extend(self.launcher_args.iter().cloned());
        line.extend(command.iter().cloned());
        line
    }

    fn submit(&self, overwrite: bool) -> LaunchResult<i32> {
        self.run(overwrite)
    }
}
