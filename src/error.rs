//! Error handling module for archsetup
//!
//! Provides centralized error handling with proper error types using thiserror.
//! Every fatal condition in the installer surfaces as an `InstallError`; the
//! binary turns it into a message on stderr and a process exit code.

use std::path::PathBuf;

use thiserror::Error;

use crate::install_state::InstallTransitionError;
use crate::shell::EncodeError;
use crate::validation::ValidationError;

/// Exit code for a required external command missing from PATH.
pub const EXIT_MISSING_DEPENDENCY: i32 = 127;

/// Exit code for every other fatal failure.
pub const EXIT_FAILURE: i32 = 1;

/// Main error type for archsetup
#[derive(Error, Debug)]
pub enum InstallError {
    /// Not running with EUID 0
    #[error("This program must be run as root.")]
    NotElevated,

    /// Booted in legacy BIOS mode
    #[error("This program requires UEFI boot mode.")]
    NotUefi,

    /// A required external binary could not be resolved in PATH
    #[error("required command '{0}' not found in PATH.")]
    MissingDependency(String),

    /// Operator input failed its grammar
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Standard input closed or unreadable during a prompt
    #[error("Input error: {0}")]
    Input(String),

    /// External command exited non-zero on a fatal step
    #[error("Command failed with code {status}: {command}")]
    CommandFailed { command: String, status: i32 },

    /// External command could not be started at all
    #[error("Failed to start command `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Writing fstab or a generated script failed
    #[error("{}: {source}", path.display())]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A secret could not be embedded into the generated script
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// Answer file could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),

    /// Install state machine transition errors
    #[error("Install transition error: {0}")]
    Transition(#[from] InstallTransitionError),

    /// Other IO errors (terminal, stdout)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for installer operations
pub type Result<T> = std::result::Result<T, InstallError>;

impl InstallError {
    /// Create an input error
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a file write error for `path`
    pub fn file_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileWrite {
            path: path.into(),
            source,
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::MissingDependency(_) => EXIT_MISSING_DEPENDENCY,
            _ => EXIT_FAILURE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = InstallError::CommandFailed {
            command: "mkfs.fat -F32 /dev/sda1".to_string(),
            status: 1,
        };
        assert_eq!(
            err.to_string(),
            "Command failed with code 1: mkfs.fat -F32 /dev/sda1"
        );

        let err = InstallError::MissingDependency("pacstrap".to_string());
        assert_eq!(err.to_string(), "required command 'pacstrap' not found in PATH.");
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(InstallError::MissingDependency("btrfs".into()).exit_code(), 127);
        assert_eq!(InstallError::NotElevated.exit_code(), 1);
        assert_eq!(InstallError::NotUefi.exit_code(), 1);
        assert_eq!(InstallError::input("eof").exit_code(), 1);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: InstallError = io_err.into();
        assert!(matches!(err, InstallError::Io(_)));
    }

    #[test]
    fn test_file_write_names_path() {
        let err = InstallError::file_write(
            "/mnt/etc/fstab",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().starts_with("/mnt/etc/fstab: "));
    }
}
