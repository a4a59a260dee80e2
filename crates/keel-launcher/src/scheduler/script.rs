//! Batch-script abstraction shared by every scheduler.

use crate::error::{LaunchError, LaunchResult};
use crate::options::Scheduler;
use std::borrow::Cow;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

/// Interpreter named in the shebang and used to run scripts inline.
pub const INTERPRETER: &str = "/bin/bash";

pub const OUT_LOG: &str = "out.log";
pub const ERR_LOG: &str = "err.log";

/// Lines of a script and where it lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptCore {
    pub script_file: PathBuf,
    pub work_dir: PathBuf,
    pub interpreter: String,
    header: Vec<String>,
    body: Vec<String>,
}

impl ScriptCore {
    #[must_use]
    pub fn new(script_file: PathBuf, work_dir: PathBuf) -> Self {
        Self {
            script_file,
            work_dir,
            interpreter: INTERPRETER.to_string(),
            header: vec![format!("#!{INTERPRETER}")],
            body: Vec::new(),
        }
    }

    #[must_use]
    pub fn out_log(&self) -> PathBuf {
        self.work_dir.join(OUT_LOG)
    }

    #[must_use]
    pub fn err_log(&self) -> PathBuf {
        self.work_dir.join(ERR_LOG)
    }

    #[must_use]
    pub fn header(&self) -> &[String] {
        &self.header
    }

    #[must_use]
    pub fn body(&self) -> &[String] {
        &self.body
    }

    pub fn push_header(&mut self, line: impl Into<String>) {
        self.header.push(line.into());
    }

    pub fn push_body(&mut self, line: impl Into<String>) {
        self.body.push(line.into());
    }

    /// Full script text: header, a blank line, then the body.
    #[must_use]
    pub fn render(&self) -> String {
        let mut text = self.header.join("\n");
        text.push_str("\n\n");
        for line in &self.body {
            text.push_str(line);
            text.push('\n');
        }
        text
    }

    /// Write the script, creating the work directory.
    pub fn write(&self, overwrite: bool) -> LaunchResult<&Path> {
        if self.script_file.exists() && !overwrite {
            return Err(LaunchError::ScriptExists(self.script_file.clone()));
        }
        fs::create_dir_all(&self.work_dir)?;
        if let Some(parent) = self.script_file.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.script_file, self.render())?;
        tracing::info!(path = %self.script_file.display(), "wrote batch script");
        Ok(&self.script_file)
    }

    /// Execute the script with the interpreter, sending output to the logs
    /// in the work directory.
    pub fn run(&self, overwrite: bool) -> LaunchResult<i32> {
        self.write(overwrite)?;
        let stdout = File::create(self.out_log())?;
        let stderr = File::create(self.err_log())?;

        tracing::info!(script = %self.script_file.display(), "running batch script");
        let mut command = Command::new(&self.interpreter);
        command.arg(&self.script_file).current_dir(&self.work_dir).stdout(stdout).stderr(stderr);
        let status = command.status().map_err(|source| LaunchError::Spawn { program: self.interpreter.clone(), source })?;
        Ok(exit_code(&self.interpreter, status))
    }

    /// Run `program args...`, optionally feeding the script on stdin.
    pub fn submit_with(&self, program: &str, args: &[String], script_on_stdin: bool) -> LaunchResult<i32> {
        let mut command = Command::new(program);
        command.args(args).current_dir(&self.work_dir);
        if script_on_stdin {
            command.stdin(Stdio::from(File::open(&self.script_file)?));
        }
        tracing::info!(program, script = %self.script_file.display(), "submitting batch script");
        let status = command.status().map_err(|source| LaunchError::Spawn { program: program.to_string(), source })?;
        Ok(exit_code(program, status))
    }
}

/// Process exit code; termination by signal maps to -1.
pub(crate) fn exit_code(program: &str, status: ExitStatus) -> i32 {
    status.code().unwrap_or_else(|| {
        tracing::warn!(program, %status, "process terminated by signal");
        -1
    })
}

/// Scheduler-specific batch script.
pub trait BatchScript: std::fmt::Debug {
    fn scheduler(&self) -> Scheduler;

    fn core(&self) -> &ScriptCore;

    fn core_mut(&mut self) -> &mut ScriptCore;

    /// Environment variable set inside an existing job allocation, or
    /// `None` when the script can always run inline.
    fn allocation_env(&self) -> Option<&'static str>;

    /// Command line launching `command` on every allocated process.
    fn parallel_command(&self, command: &[String]) -> Vec<String>;

    /// Hand the script to the scheduler and return its exit status.
    fn submit(&self, overwrite: bool) -> LaunchResult<i32>;

    fn has_allocation(&self) -> bool {
        self.allocation_env().map_or(true, |var| std::env::var_os(var).is_some())
    }

    fn add_header_line(&mut self, line: &str) {
        self.core_mut().push_header(line);
    }

    fn add_command(&mut self, command: &str) {
        self.core_mut().push_body(command);
    }

    fn add_parallel_command(&mut self, command: &[String]) {
        let line = self.parallel_command(command).join(" ");
        self.core_mut().push_body(line);
    }

    fn add_environment(&mut self, key: &str, value: &str) {
        self.core_mut().push_body(format!("export {key}={}", shell_quote(value)));
    }

    fn script_file(&self) -> &Path {
        &self.core().script_file
    }

    fn work_dir(&self) -> &Path {
        &self.core().work_dir
    }

    fn render(&self) -> String {
        self.core().render()
    }

    fn write(&self, overwrite: bool) -> LaunchResult<()> {
        self.core().write(overwrite).map(|_| ())
    }

    fn run(&self, overwrite: bool) -> LaunchResult<i32> {
        self.core().run(overwrite)
    }
}

/// `H:MM:SS` from minutes.
pub(crate) fn hms(minutes: u32) -> String {
    format!("{}:{:02}:00", minutes / 60, minutes % 60)
}

/// `H:MM` from minutes.
pub(crate) fn hm(minutes: u32) -> String {
    format!("{}:{:02}", minutes / 60, minutes % 60)
}

/// Single-quote `value` for bash unless it is made of characters the shell
/// never interprets.
pub fn shell_quote(value: &str) -> Cow<'_, str> {
    let plain = |c: char| c.is_ascii_alphanumeric() || "_-.,:/=@%+".contains(c);
    if !value.is_empty() && value.chars().all(plain) {
        Cow::Borrowed(value)
    } else {
        Cow::Owned(format!("'{}'", value.replace('\'', r"'\''")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn core(dir: &Path) -> ScriptCore {
        ScriptCore::new(dir.join("batch.sh"), dir.to_path_buf())
    }

    #[test]
    fn test_render_layout() {
        let mut core = ScriptCore::new(PathBuf::from("/w/batch.sh"), PathBuf::from("/w"));
        core.push_header("#SBATCH --nodes=1");
        core.push_body("echo hi");
        assert_eq!(core.render(), "#!/bin/bash\n#SBATCH --nodes=1\n\necho hi\n");
    }

    #[test]
    fn test_write_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let core = core(dir.path());
        core.write(false).unwrap();
        assert!(matches!(core.write(false), Err(LaunchError::ScriptExists(_))));
        assert!(core.write(true).is_ok());
    }

    #[test]
    fn test_run_returns_status_and_captures_output() {
        let dir = TempDir::new().unwrap();
        let mut core = core(dir.path());
        core.push_body("echo hello");
        core.push_body("echo oops >&2");
        core.push_body("exit 3");

        assert_eq!(core.run(false).unwrap(), 3);
        assert_eq!(fs::read_to_string(core.out_log()).unwrap(), "hello\n");
        assert_eq!(fs::read_to_string(core.err_log()).unwrap(), "oops\n");
    }

    #[test]
    fn test_submit_missing_program() {
        let dir = TempDir::new().unwrap();
        let core = core(dir.path());
        core.write(false).unwrap();
        let err = core.submit_with("keel-no-such-submitter", &[], false).unwrap_err();
        assert!(matches!(err, LaunchError::Spawn { .. }));
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("0x1ff,0x3fe00"), "0x1ff,0x3fe00");
        assert_eq!(shell_quote("/opt/lib:/usr/lib"), "/opt/lib:/usr/lib");
        assert_eq!(shell_quote("a b"), "'a b'");
        assert_eq!(shell_quote(""), "''");
        assert_eq!(shell_quote("$HOME"), "'$HOME'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }

    #[test]
    fn test_exported_values_survive_bash() {
        let temp_dir = TempDir::new().unwrap();
        let mut core = core(temp_dir.path());
        let value = "a b 'c' $HOME; d";
        core.push_body(format!("export MSG={}", shell_quote(value)));
        core.push_body("printf '%s' \"$MSG\"");

        core.run(false).unwrap();
        assert_eq!(fs::read_to_string(temp_dir.path().join(OUT_LOG)).unwrap(), value);
    }

    #[test]
    fn test_time_strings() {
        assert_eq!(hms(90), "1:30:00");
        assert_eq!(hms(5), "0:05:00");
        assert_eq!(hm(125), "2:05");
    }
}
