//! archsetup Library
//!
//! Core of the interactive Arch Linux installer: input validation, shell-safe
//! encoding, command execution, partition naming, second-stage script
//! generation, and the orchestrator that sequences them.

pub mod chroot_script;
pub mod cli;
pub mod command_runner;
pub mod config;
pub mod config_file;
pub mod engine;
pub mod error;
pub mod install_state;
pub mod installer;
pub mod process_guard;
pub mod prompt;
pub mod sanity;
pub mod shell;
pub mod types;
pub mod validation;

// Re-export main types for convenience
pub use command_runner::{CommandLine, CommandResult, CommandRunner, DryRunRunner, SystemRunner};
pub use config::{InstallConfig, Secret};
pub use config_file::AnswerFile;
pub use engine::{DiskSelection, StorageOp, StoragePlan, calculate_storage_plan};
pub use error::{InstallError, Result};
pub use install_state::{InstallStage, InstallTransitionError, InstallerContext};
pub use installer::{InstallOutcome, Installer, InstallerSettings, Step};
pub use process_guard::{ChildRegistry, CommandProcessGroup};
pub use prompt::{Prompter, TerminalPrompter};
pub use sanity::{HostProbe, SanityCheckResult, SystemHost};
pub use shell::{EncodeError, escape_single_quoted};
pub use types::GpuDriver;
pub use validation::{Country, DiskName, Hostname, Timezone, Username, ValidationError};
