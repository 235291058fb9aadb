//! Operator input.
//!
//! Line-oriented prompts on stdin/stdout. Secrets are read with terminal echo
//! switched off for that single read only.

use std::io::{self, BufRead, Write};
use std::sync::Mutex;

use nix::sys::termios::{self, LocalFlags, SetArg, Termios};

use crate::error::{InstallError, Result};

/// Source of operator answers.
pub trait Prompter {
    /// Show `prompt` and read one line. `None` on end of input.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;

    /// Like [`Prompter::read_line`] but without echoing the typed characters.
    fn read_secret(&mut self, prompt: &str) -> Result<Option<String>>;

    /// Read a required answer; end of input is an error.
    fn ask(&mut self, prompt: &str) -> Result<String> {
        self.read_line(prompt)?
            .ok_or_else(|| InstallError::input("unexpected end of input"))
    }

    /// Read a required secret; end of input is an error.
    fn ask_secret(&mut self, prompt: &str) -> Result<String> {
        self.read_secret(prompt)?
            .ok_or_else(|| InstallError::input("unexpected end of input"))
    }

    /// `<question> [y/N]: `. Only `y` or `yes` (any case) confirm; end of input declines.
    fn confirm(&mut self, question: &str) -> Result<bool> {
        let answer = self.read_line(&format!("{} [y/N]: ", question))?;
        Ok(answer.is_some_and(|a| is_affirmative(&a)))
    }
}

pub fn is_affirmative(answer: &str) -> bool {
    let answer = answer.to_ascii_lowercase();
    answer == "y" || answer == "yes"
}

/// Drop the line terminator, keep every other byte.
pub fn trim_newline(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}

/// Decode one raw input line. Answers, passwords included, must be UTF-8:
/// the generated script is UTF-8 text and `chpasswd` reads it as such.
pub fn decode_line(bytes: Vec<u8>) -> Result<String> {
    let line = String::from_utf8(bytes).map_err(|e| {
        let at = e.utf8_error().valid_up_to();
        InstallError::input(format!("input is not valid UTF-8 (byte {})", at))
    })?;
    Ok(trim_newline(&line).to_string())
}

/// A value that must be put back if the process exits while it is set.
pub struct PendingRestore<T> {
    slot: Mutex<Option<T>>,
}

impl<T> PendingRestore<T> {
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    pub fn set(&self, value: T) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(value);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = None;
        }
    }

    /// Remove and return the pending value, if any.
    pub fn take(&self) -> Option<T> {
        self.slot.lock().ok().and_then(|mut slot| slot.take())
    }

    pub fn is_pending(&self) -> bool {
        self.slot.lock().map(|slot| slot.is_some()).unwrap_or(false)
    }
}

impl<T> Default for PendingRestore<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Terminal attributes saved by a secret read that is still in progress.
static SAVED_TERMINAL: PendingRestore<Termios> = PendingRestore::new();

/// Re-enable echo if a secret read was interrupted. Safe to call at any time.
pub fn restore_terminal() {
    if let Some(saved) = SAVED_TERMINAL.take() {
        if let Err(e) = termios::tcsetattr(io::stdin(), SetArg::TCSANOW, &saved) {
            log::warn!("Failed to restore terminal echo: {}", e);
        }
    }
}

/// Restores the saved terminal attributes when dropped.
struct EchoGuard {
    saved: Termios,
}

impl EchoGuard {
    /// `None` when stdin is not a terminal.
    fn disable() -> Option<Self> {
        let stdin = io::stdin();
        let saved = termios::tcgetattr(&stdin).ok()?;
        let mut silent = saved.clone();
        silent.local_flags.remove(LocalFlags::ECHO);
        SAVED_TERMINAL.set(saved.clone());
        if let Err(e) = termios::tcsetattr(&stdin, SetArg::TCSANOW, &silent) {
            SAVED_TERMINAL.clear();
            log::debug!("Could not disable echo: {}", e);
            return None;
        }
        Some(Self { saved })
    }
}

impl Drop for EchoGuard {
    fn drop(&mut self) {
        SAVED_TERMINAL.clear();
        if let Err(e) = termios::tcsetattr(&io::stdin(), SetArg::TCSANOW, &self.saved) {
            log::warn!("Failed to restore terminal echo: {}", e);
        }
    }
}

/// Prompts on the controlling terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

impl TerminalPrompter {
    pub fn new() -> Self {
        Self
    }

    fn read_stdin_line() -> Result<Option<String>> {
        let mut line = Vec::new();
        let read = io::stdin().lock().read_until(b'\n', &mut line)?;
        if read == 0 {
            return Ok(None);
        }
        decode_line(line).map(Some)
    }
}

impl Prompter for TerminalPrompter {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        print!("{}", prompt);
        io::stdout().flush()?;
        Self::read_stdin_line()
    }

    fn read_secret(&mut self, prompt: &str) -> Result<Option<String>> {
        print!("{}", prompt);
        io::stdout().flush()?;
        let line = {
            let _guard = EchoGuard::disable();
            Self::read_stdin_line()
        };
        println!();
        line
    }
}
