//! Synchronous execution of the external media tool.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tracing::{debug, error};

use crate::error::StudioError;

/// A fully assembled external-tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FfmpegCommand {
    program: String,
    args: Vec<OsString>,
}

impl FfmpegCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(&mut self, arg: impl AsRef<OsStr>) -> &mut Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in args {
            self.arg(arg);
        }
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    /// Arguments as UTF-8 strings (lossy), convenient for assertions and logging.
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }
}

/// Renders the command as a copy-pasteable POSIX shell line.
impl fmt::Display for FfmpegCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&shell_quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", shell_quote(&arg.to_string_lossy()))?;
        }
        Ok(())
    }
}

fn shell_quote(value: &str) -> String {
    let plain = !value.is_empty()
        && value
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || "-_./:=,%+@".contains(ch));
    if plain {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

/// Executes tool invocations. The returned string is the tool's diagnostic (stderr) output.
pub trait ToolRunner: Send + Sync {
    fn run(&self, command: &FfmpegCommand) -> Result<String, StudioError>;
}

/// Runs commands as child processes and waits for them to exit.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl ToolRunner for ProcessRunner {
    fn run(&self, command: &FfmpegCommand) -> Result<String, StudioError> {
        debug!(command = %command, "spawning external tool");
        let started = Instant::now();

        let output = Command::new(command.program())
            .args(command.get_args())
            .stdin(Stdio::null())
            .output()
            .map_err(|source| StudioError::Spawn {
                program: command.program().to_string(),
                source,
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            error!(
                program = command.program(),
                status = ?output.status.code(),
                stderr = %stderr,
                "external tool failed"
            );
            return Err(StudioError::ToolFailed {
                program: command.program().to_string(),
                status: output.status.code(),
                stderr,
            });
        }

        debug!(
            program = command.program(),
            elapsed_ms = started.elapsed().as_secs_f64() * 1_000.0,
            "external tool finished"
        );
        Ok(stderr)
    }
}

/// Records commands instead of executing them. Backs `--dry-run` and the test suites.
#[derive(Debug, Default, Clone)]
pub struct RecordingRunner {
    commands: Arc<Mutex<Vec<FfmpegCommand>>>,
    failure: Option<String>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// A runner whose every invocation fails with the given diagnostic text.
    pub fn failing(stderr: impl Into<String>) -> Self {
        Self {
            commands: Arc::default(),
            failure: Some(stderr.into()),
        }
    }

    pub fn commands(&self) -> Vec<FfmpegCommand> {
        self.commands
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn last(&self) -> Option<FfmpegCommand> {
        self.commands().pop()
    }
}

impl ToolRunner for RecordingRunner {
    fn run(&self, command: &FfmpegCommand) -> Result<String, StudioError> {
        if let Ok(mut guard) = self.commands.lock() {
            guard.push(command.clone());
        }
        match &self.failure {
            Some(stderr) => Err(StudioError::ToolFailed {
                program: command.program().to_string(),
                status: Some(1),
                stderr: stderr.clone(),
            }),
            None => Ok(String::new()),
        }
    }
}
