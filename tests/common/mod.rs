//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};

use archsetup::command_runner::{CommandLine, CommandResult, CommandRunner};
use archsetup::error::{InstallError, Result};
use archsetup::prompt::Prompter;
use archsetup::sanity::HostProbe;

pub const FSTAB: &str = "# /dev/sda3\nUUID=1234 / btrfs rw,noatime,subvol=/@ 0 0\n";

/// Records every command; fails those whose rendered line contains a marker.
#[derive(Default)]
pub struct FakeRunner {
    pub commands: Vec<String>,
    failing: Vec<(String, i32)>,
    unstartable: Vec<String>,
    captured: Option<Vec<u8>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Any command whose line contains `marker` exits with `status`.
    pub fn fail_on(mut self, marker: &str, status: i32) -> Self {
        self.failing.push((marker.to_string(), status));
        self
    }

    /// Stdout returned by `capture` instead of [`FSTAB`].
    pub fn with_capture(mut self, bytes: &[u8]) -> Self {
        self.captured = Some(bytes.to_vec());
        self
    }

    /// Any command whose program is `program` cannot be spawned.
    pub fn unstartable(mut self, program: &str) -> Self {
        self.unstartable.push(program.to_string());
        self
    }

    pub fn programs(&self) -> Vec<&str> {
        self.commands
            .iter()
            .map(|c| c.split_whitespace().next().unwrap_or(""))
            .collect()
    }

    pub fn position(&self, needle: &str) -> Option<usize> {
        self.commands.iter().position(|c| c.contains(needle))
    }

    pub fn ran(&self, needle: &str) -> bool {
        self.position(needle).is_some()
    }

    fn status_for(&mut self, command: &CommandLine) -> Result<i32> {
        let line = command.to_string();
        self.commands.push(line.clone());
        if self.unstartable.iter().any(|p| p == command.program()) {
            return Err(InstallError::Spawn {
                command: line,
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
            });
        }
        Ok(self
            .failing
            .iter()
            .find(|(marker, _)| line.contains(marker.as_str()))
            .map(|(_, status)| *status)
            .unwrap_or(0))
    }
}

impl CommandRunner for FakeRunner {
    fn run(&mut self, command: &CommandLine) -> Result<CommandResult> {
        let status = self.status_for(command)?;
        Ok(CommandResult {
            exit_status: status,
            captured_output: None,
        })
    }

    fn capture(&mut self, command: &CommandLine) -> Result<CommandResult> {
        let status = self.status_for(command)?;
        Ok(CommandResult {
            exit_status: status,
            captured_output: Some(
                self.captured
                    .clone()
                    .unwrap_or_else(|| FSTAB.as_bytes().to_vec()),
            ),
        })
    }
}

/// Feeds queued answers to prompts in order; `None` once exhausted.
#[derive(Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    pub prompts: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            prompts: Vec::new(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

impl Prompter for ScriptedPrompter {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        self.prompts.push(prompt.to_string());
        Ok(self.answers.pop_front())
    }

    fn read_secret(&mut self, prompt: &str) -> Result<Option<String>> {
        self.read_line(prompt)
    }
}

/// Host whose facts are set by the test.
pub struct FakeHost {
    pub root: bool,
    pub uefi: bool,
    pub missing: HashSet<String>,
}

impl FakeHost {
    pub fn ready() -> Self {
        Self {
            root: true,
            uefi: true,
            missing: HashSet::new(),
        }
    }

    pub fn without(mut self, binary: &str) -> Self {
        self.missing.insert(binary.to_string());
        self
    }
}

impl HostProbe for FakeHost {
    fn is_elevated(&self) -> bool {
        self.root
    }

    fn is_uefi(&self) -> bool {
        self.uefi
    }

    fn has_binary(&self, name: &str) -> bool {
        !self.missing.contains(name)
    }
}

/// Answers for a complete interactive run up to and including the disk confirmation.
pub fn interactive_answers(disk: &str, confirm: &str) -> Vec<String> {
    [
        "Germany",
        "alice",
        "archbox",
        "pw",
        "pw",
        "rpw",
        "rpw",
        "Europe/Berlin",
        "0",
        disk,
        confirm,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
