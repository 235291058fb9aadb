//! Engine modules: translate a selected disk into the commands that lay it out.
//!
//! Everything here is pure plan generation. Nothing is executed; the
//! orchestrator hands the resulting [`CommandLine`](crate::command_runner::CommandLine)s
//! to a runner.

pub mod partition;
pub mod storage;

pub use partition::{DiskSelection, FDISK_TRANSCRIPT};
pub use storage::{StorageOp, StoragePlan, calculate_storage_plan};
