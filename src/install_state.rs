//! Install State Machine
//!
//! Authoritative record of how far an installation has progressed. The
//! orchestrator moves through the stages strictly in order; skipping a stage,
//! going backwards, or entering `Partitioning` without a recorded operator
//! confirmation is a programming error reported as [`InstallTransitionError`].
//!
//! # Stage Flow
//!
//! ```text
//! Preconditions
//!     ↓
//! Prompting
//!     ↓
//! MirrorSetup ──(operator declines)──> Aborted
//!     ↓
//! KeyringInit
//!     ↓
//! DiskInspection
//!     ↓
//! DiskConfirmation ──(operator declines)──> Aborted
//!     ↓
//! Partitioning   (destructive, requires confirmation)
//!     ↓
//! Filesystems
//!     ↓
//! MountLayout
//!     ↓
//! BaseInstall
//!     ↓
//! FstabCapture
//!     ↓
//! ScriptGeneration
//!     ↓
//! ChrootExecution
//!     ↓
//! Cleanup
//!     ↓
//! Done
//!
//! (Any non-terminal stage can transition to Failed)
//! ```

use std::fmt;
use thiserror::Error;

/// Installation stages in sequential order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum InstallStage {
    /// Root, UEFI and dependency checks
    Preconditions = 0,
    /// Reading the configuration from the operator
    Prompting = 1,
    /// Mirror list refresh (tolerant)
    MirrorSetup = 2,
    /// Package database sync and keyring
    KeyringInit = 3,
    /// Block device listing and disk selection
    DiskInspection = 4,
    /// Operator confirms the disk wipe
    DiskConfirmation = 5,
    /// GPT creation. DESTRUCTIVE, requires explicit confirmation
    Partitioning = 6,
    /// FAT32, swap and btrfs formatting
    Filesystems = 7,
    /// Subvolumes and the target mount hierarchy
    MountLayout = 8,
    /// pacstrap into the target root
    BaseInstall = 9,
    /// genfstab output written to the target
    FstabCapture = 10,
    /// Second-stage script rendered into the target root
    ScriptGeneration = 11,
    /// Second-stage script executed inside the target root
    ChrootExecution = 12,
    /// Generated scripts removed
    Cleanup = 13,
    /// Installation completed successfully (terminal state)
    Done = 14,
    /// Operator declined a confirmation (terminal state)
    Aborted = 254,
    /// A fatal step failed (terminal state)
    Failed = 255,
}

impl InstallStage {
    #[inline]
    pub const fn order(self) -> u8 {
        self as u8
    }

    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Aborted | Self::Failed)
    }

    /// True for stages that destroy data on the target disk.
    #[inline]
    pub const fn is_destructive(self) -> bool {
        matches!(self, Self::Partitioning)
    }

    /// Stages from which the operator may still back out cleanly.
    #[inline]
    pub const fn is_abortable(self) -> bool {
        matches!(self, Self::MirrorSetup | Self::DiskConfirmation)
    }

    /// Returns the next stage in the sequence, or None if at a terminal state
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Preconditions => Some(Self::Prompting),
            Self::Prompting => Some(Self::MirrorSetup),
            Self::MirrorSetup => Some(Self::KeyringInit),
            Self::KeyringInit => Some(Self::DiskInspection),
            Self::DiskInspection => Some(Self::DiskConfirmation),
            Self::DiskConfirmation => Some(Self::Partitioning),
            Self::Partitioning => Some(Self::Filesystems),
            Self::Filesystems => Some(Self::MountLayout),
            Self::MountLayout => Some(Self::BaseInstall),
            Self::BaseInstall => Some(Self::FstabCapture),
            Self::FstabCapture => Some(Self::ScriptGeneration),
            Self::ScriptGeneration => Some(Self::ChrootExecution),
            Self::ChrootExecution => Some(Self::Cleanup),
            Self::Cleanup => Some(Self::Done),
            Self::Done | Self::Aborted | Self::Failed => None,
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::Preconditions => "Checking preconditions",
            Self::Prompting => "Collecting configuration",
            Self::MirrorSetup => "Refreshing mirror list",
            Self::KeyringInit => "Initializing keyring",
            Self::DiskInspection => "Selecting disk",
            Self::DiskConfirmation => "Confirming disk",
            Self::Partitioning => "Partitioning disk",
            Self::Filesystems => "Creating filesystems",
            Self::MountLayout => "Mounting subvolumes",
            Self::BaseInstall => "Installing base system",
            Self::FstabCapture => "Generating fstab",
            Self::ScriptGeneration => "Writing configuration script",
            Self::ChrootExecution => "Configuring system",
            Self::Cleanup => "Cleaning up",
            Self::Done => "Installation complete",
            Self::Aborted => "Installation aborted",
            Self::Failed => "Installation failed",
        }
    }

    /// Returns all stages in order (excluding Aborted and Failed)
    pub const fn all_stages() -> &'static [Self] {
        &[
            Self::Preconditions,
            Self::Prompting,
            Self::MirrorSetup,
            Self::KeyringInit,
            Self::DiskInspection,
            Self::DiskConfirmation,
            Self::Partitioning,
            Self::Filesystems,
            Self::MountLayout,
            Self::BaseInstall,
            Self::FstabCapture,
            Self::ScriptGeneration,
            Self::ChrootExecution,
            Self::Cleanup,
            Self::Done,
        ]
    }
}

impl fmt::Display for InstallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur during state transitions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InstallTransitionError {
    #[error("Cannot skip from {from} to {to} (must transition through intermediate stages)")]
    SkippedStage { from: InstallStage, to: InstallStage },

    #[error("Cannot go backwards from {from} to {to} (installation is forward-only)")]
    BackwardTransition { from: InstallStage, to: InstallStage },

    #[error("Cannot transition from terminal state {from}")]
    FromTerminalState { from: InstallStage },

    #[error("Stage {stage} requires explicit confirmation (destructive operation)")]
    MissingConfirmation { stage: InstallStage },

    #[error("Already at stage {stage}")]
    AlreadyAtStage { stage: InstallStage },

    #[error("Cannot abort during {stage} (no confirmation point)")]
    NotAbortable { stage: InstallStage },
}

/// Owns the current stage and validates every transition.
///
/// ```
/// use archsetup::install_state::{InstallerContext, InstallStage};
///
/// let mut ctx = InstallerContext::new();
/// assert_eq!(ctx.current_stage(), InstallStage::Preconditions);
///
/// ctx.advance().unwrap();
/// assert_eq!(ctx.current_stage(), InstallStage::Prompting);
///
/// // Cannot skip stages
/// assert!(ctx.transition_to(InstallStage::Partitioning).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct InstallerContext {
    current: InstallStage,
    /// Stage at which the run failed or was aborted
    stopped_at: Option<InstallStage>,
    /// (stage, unix timestamp) for every stage entered
    stage_history: Vec<(InstallStage, u64)>,
    destructive_confirmed: bool,
}

impl Default for InstallerContext {
    fn default() -> Self {
        Self::new()
    }
}

impl InstallerContext {
    pub fn new() -> Self {
        let mut ctx = Self {
            current: InstallStage::Preconditions,
            stopped_at: None,
            stage_history: Vec::with_capacity(InstallStage::all_stages().len()),
            destructive_confirmed: false,
        };
        ctx.record_stage_transition(InstallStage::Preconditions);
        ctx
    }

    #[inline]
    pub fn current_stage(&self) -> InstallStage {
        self.current
    }

    /// Stage at which the run failed or was aborted, if any
    #[inline]
    pub fn stopped_at(&self) -> Option<InstallStage> {
        self.stopped_at
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.current == InstallStage::Done
    }

    pub fn stage_history(&self) -> &[(InstallStage, u64)] {
        &self.stage_history
    }

    /// Record that the operator authorized wiping the disk. Cannot be revoked.
    pub fn confirm_destructive_operations(&mut self) {
        self.destructive_confirmed = true;
    }

    /// Advance to the next stage in sequence.
    pub fn advance(&mut self) -> Result<InstallStage, InstallTransitionError> {
        let Some(next_stage) = self.current.next() else {
            return Err(InstallTransitionError::FromTerminalState { from: self.current });
        };
        self.transition_to(next_stage)
    }

    /// Transition to `target`, which must be the immediate next stage.
    pub fn transition_to(
        &mut self,
        target: InstallStage,
    ) -> Result<InstallStage, InstallTransitionError> {
        if self.current.is_terminal() {
            return Err(InstallTransitionError::FromTerminalState { from: self.current });
        }

        if target == self.current {
            return Err(InstallTransitionError::AlreadyAtStage { stage: target });
        }

        // Terminal side exits have their own entry points
        if matches!(target, InstallStage::Failed | InstallStage::Aborted) {
            return Err(InstallTransitionError::SkippedStage {
                from: self.current,
                to: target,
            });
        }

        if target.order() < self.current.order() {
            return Err(InstallTransitionError::BackwardTransition {
                from: self.current,
                to: target,
            });
        }

        if self.current.next() != Some(target) {
            return Err(InstallTransitionError::SkippedStage {
                from: self.current,
                to: target,
            });
        }

        if target.is_destructive() && !self.destructive_confirmed {
            return Err(InstallTransitionError::MissingConfirmation { stage: target });
        }

        log::info!("Stage: {}", target);
        self.record_stage_transition(target);
        self.current = target;

        Ok(target)
    }

    /// Mark the installation as failed at the current stage.
    pub fn fail(&mut self) -> Result<(), InstallTransitionError> {
        if self.current.is_terminal() {
            return Err(InstallTransitionError::FromTerminalState { from: self.current });
        }

        log::warn!("Installation failed during: {}", self.current);
        self.stopped_at = Some(self.current);
        self.record_stage_transition(InstallStage::Failed);
        self.current = InstallStage::Failed;

        Ok(())
    }

    /// Record an operator-declined confirmation. Only valid at a confirmation point.
    pub fn abort(&mut self) -> Result<(), InstallTransitionError> {
        if self.current.is_terminal() {
            return Err(InstallTransitionError::FromTerminalState { from: self.current });
        }
        if !self.current.is_abortable() {
            return Err(InstallTransitionError::NotAbortable { stage: self.current });
        }

        log::info!("Operator aborted during: {}", self.current);
        self.stopped_at = Some(self.current);
        self.record_stage_transition(InstallStage::Aborted);
        self.current = InstallStage::Aborted;

        Ok(())
    }

    fn record_stage_transition(&mut self, stage: InstallStage) {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        self.stage_history.push((stage, timestamp));
    }
}
