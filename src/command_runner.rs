//! External command execution.
//!
//! Every privileged step of the installation goes through a [`CommandRunner`].
//! Commands are argument vectors, never formatted shell lines; the only shell
//! involvement is an explicit `bash -c` argument where a heredoc is required.
//!
//! The runner echoes `=> <command>` on stdout before each invocation and
//! reports a non-zero exit on stderr, but it never decides whether a failure is
//! fatal. That policy belongs to the caller.

use std::fmt;
use std::io::Write;
use std::process::{Command, Stdio};

use crate::error::{InstallError, Result};
use crate::process_guard::{ChildRegistry, CommandProcessGroup};
use crate::shell::quote_word;

/// One external command: program plus arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: String,
    args: Vec<String>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// `bash -c <script>`, for the few steps that need shell syntax.
    pub fn shell(script: impl Into<String>) -> Self {
        Self::new("bash").arg("-c").arg(script)
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for CommandLine {
    /// Renders a copy-pasteable shell line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&quote_word(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", quote_word(arg))?;
        }
        Ok(())
    }
}

/// Outcome of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// Exit code, `-1` when the process was killed by a signal.
    pub exit_status: i32,
    /// Raw standard output, present only for [`CommandRunner::capture`].
    pub captured_output: Option<Vec<u8>>,
}

impl CommandResult {
    pub fn success() -> Self {
        Self {
            exit_status: 0,
            captured_output: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_status == 0
    }

    /// Turn a non-zero exit into [`InstallError::CommandFailed`].
    pub fn ensure_success(self, command: &CommandLine) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(InstallError::CommandFailed {
                command: command.to_string(),
                status: self.exit_status,
            })
        }
    }
}

/// Seam between the orchestrator and the operating system.
pub trait CommandRunner {
    /// Run with inherited stdout/stderr and return the exit status.
    ///
    /// `Err` means the command could not be started; a non-zero exit is `Ok`.
    fn run(&mut self, command: &CommandLine) -> Result<CommandResult>;

    /// Run and capture stdout into [`CommandResult::captured_output`].
    fn capture(&mut self, command: &CommandLine) -> Result<CommandResult>;
}

/// Echo a command line to the operator before it runs.
pub fn announce(command: &CommandLine) {
    println!("\n=> {}", command);
    let _ = std::io::stdout().flush();
}

/// Report a non-zero exit on stderr.
pub fn report_failure(command: &CommandLine, result: &CommandResult) {
    if !result.is_success() {
        eprintln!("Command failed with code {}: {}", result.exit_status, command);
    }
}

/// Runs commands on the live system.
///
/// Children get their own process group and are tracked in the global
/// [`ChildRegistry`] for the lifetime of the call. Stdin is always null: no
/// external step is interactive.
#[derive(Debug, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }

    fn execute(&self, command: &CommandLine, capture: bool) -> Result<CommandResult> {
        announce(command);
        log::debug!("exec: {:?} {:?}", command.program(), command.arguments());

        let mut cmd = Command::new(command.program());
        cmd.args(command.arguments())
            .stdin(Stdio::null())
            .stdout(if capture { Stdio::piped() } else { Stdio::inherit() })
            .stderr(Stdio::inherit())
            .in_new_process_group();

        let child = cmd.spawn().map_err(|source| InstallError::Spawn {
            command: command.to_string(),
            source,
        })?;
        let pid = child.id();
        if let Ok(mut registry) = ChildRegistry::global().lock() {
            registry.register(pid);
        }

        let output = child.wait_with_output();

        if let Ok(mut registry) = ChildRegistry::global().lock() {
            registry.unregister(pid);
        }

        let output = output.map_err(|source| InstallError::Spawn {
            command: command.to_string(),
            source,
        })?;

        let result = CommandResult {
            exit_status: output.status.code().unwrap_or(-1),
            captured_output: capture.then_some(output.stdout),
        };
        report_failure(command, &result);
        log::info!("{} exited with {}", command.program(), result.exit_status);
        Ok(result)
    }
}

impl CommandRunner for SystemRunner {
    fn run(&mut self, command: &CommandLine) -> Result<CommandResult> {
        self.execute(command, false)
    }

    fn capture(&mut self, command: &CommandLine) -> Result<CommandResult> {
        self.execute(command, true)
    }
}

/// Echoes and records commands without executing anything.
///
/// Every command "succeeds"; captured output is empty.
#[derive(Debug, Default)]
pub struct DryRunRunner {
    history: Vec<CommandLine>,
}

impl DryRunRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands in the order they would have run.
    pub fn history(&self) -> &[CommandLine] {
        &self.history
    }

    /// Human-readable summary of the recorded plan.
    pub fn summary(&self) -> String {
        let mut lines = vec![format!("Dry run: {} command(s) would run", self.history.len())];
        for (i, command) in self.history.iter().enumerate() {
            lines.push(format!("  {:>2}. {}", i + 1, command));
        }
        lines.join("\n")
    }

    fn record(&mut self, command: &CommandLine) {
        println!("\n=> [dry-run] {}", command);
        self.history.push(command.clone());
    }
}

impl CommandRunner for DryRunRunner {
    fn run(&mut self, command: &CommandLine) -> Result<CommandResult> {
        self.record(command);
        Ok(CommandResult::success())
    }

    fn capture(&mut self, command: &CommandLine) -> Result<CommandResult> {
        self.record(command);
        Ok(CommandResult {
            exit_status: 0,
            captured_output: Some(Vec::new()),
        })
    }
}
