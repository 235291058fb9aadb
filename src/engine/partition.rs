//! Partition naming and the partition table transcript.
//!
//! Disk layout:
//! ```text
//! <disk>[p]1 - EFI System Partition (256M, FAT32)
//! <disk>[p]2 - Linux swap (4G)
//! <disk>[p]3 - Linux filesystem, btrfs (remaining space)
//! ```

use std::fmt;

use crate::command_runner::CommandLine;
use crate::validation::DiskName;

/// Keystrokes fed to fdisk: new GPT, three partitions, types EFI/swap/Linux, write.
pub const FDISK_TRANSCRIPT: &str = concat!(
    "g\n",
    "n\n1\n\n+256M\n",
    "n\n2\n\n+4G\n",
    "n\n3\n\n\n",
    "t\n1\n1\n",
    "t\n2\n19\n",
    "t\n3\n20\n",
    "p\n",
    "w\n",
);

/// The target disk and the three partition devices derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskSelection {
    device: String,
    efi: String,
    swap: String,
    root: String,
}

impl DiskSelection {
    pub fn new(name: DiskName) -> Self {
        let device = format!("/dev/{}", name);
        // nvme namespaces end in a digit, so partitions need a `p` separator
        let separator = if name.is_short() { "" } else { "p" };
        let part = |n: u8| format!("{}{}{}", device, separator, n);
        Self {
            efi: part(1),
            swap: part(2),
            root: part(3),
            device,
        }
    }

    /// `/dev/<name>`
    pub fn device(&self) -> &str {
        &self.device
    }

    /// `(efi, swap, root)`
    pub fn partitions(&self) -> (&str, &str, &str) {
        (&self.efi, &self.swap, &self.root)
    }

    /// `fdisk -l <device>`
    pub fn list_command(&self) -> CommandLine {
        CommandLine::new("fdisk").arg("-l").arg(&self.device)
    }

    /// Pipe [`FDISK_TRANSCRIPT`] into fdisk through a quoted heredoc.
    pub fn partition_command(&self) -> CommandLine {
        CommandLine::shell(format!(
            "cat <<'EOF' | fdisk {}\n{}EOF\n",
            self.device, FDISK_TRANSCRIPT
        ))
    }
}

impl fmt::Display for DiskSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}", self.efi, self.swap, self.root)
    }
}
