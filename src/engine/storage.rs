//! Storage Stack Engine
//!
//! Translates a [`DiskSelection`] and a target root into the ordered
//! `StorageOp` sequence that formats the three partitions and builds the btrfs
//! subvolume mount hierarchy.
//!
//! | Phase       | Operations |
//! |-------------|------------|
//! | filesystems | FAT32 on p1, mkswap + swapon p2, btrfs on p3 |
//! | layout      | mount p3, 4 subvolumes, umount, remount `@`, mkdir, mount subvolumes, mount ESP |
//!
//! Pure logic: no I/O, only the plan.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::command_runner::CommandLine;
use crate::engine::partition::DiskSelection;

/// Mount options for every btrfs subvolume, `subvol=` is appended per mount.
pub const BTRFS_MOUNT_OPTIONS: &str = "noatime,compress=lzo,space_cache=v2";

/// Subvolume name and its mountpoint relative to the target root.
pub const SUBVOLUMES: &[(&str, &str)] = &[
    ("@", ""),
    ("@home", "home"),
    ("@var", "var"),
    ("@snapshots", ".snapshots"),
];

/// A single atomic storage operation in the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageOp {
    /// `mkfs.fat -F32`
    FormatFat32 { device: String },
    /// `mkswap`
    MakeSwap { device: String },
    /// `swapon`
    SwapOn { device: String },
    /// `mkfs.btrfs`
    FormatBtrfs { device: String },
    Mount {
        device: String,
        mountpoint: PathBuf,
        options: Option<String>,
    },
    CreateSubvolume { path: PathBuf },
    Unmount { mountpoint: PathBuf },
    /// `mkdir -p` for every path
    MakeDirs { paths: Vec<PathBuf> },
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

impl StorageOp {
    /// The argv that performs this operation.
    pub fn to_command(&self) -> CommandLine {
        match self {
            Self::FormatFat32 { device } => CommandLine::new("mkfs.fat").arg("-F32").arg(device),
            Self::MakeSwap { device } => CommandLine::new("mkswap").arg(device),
            Self::SwapOn { device } => CommandLine::new("swapon").arg(device),
            Self::FormatBtrfs { device } => CommandLine::new("mkfs.btrfs").arg(device),
            Self::Mount { device, mountpoint, options } => {
                let cmd = CommandLine::new("mount");
                let cmd = match options {
                    Some(opts) => cmd.arg("-o").arg(opts),
                    None => cmd,
                };
                cmd.arg(device).arg(path_arg(mountpoint))
            }
            Self::CreateSubvolume { path } => CommandLine::new("btrfs")
                .args(["subvolume", "create"])
                .arg(path_arg(path)),
            Self::Unmount { mountpoint } => CommandLine::new("umount").arg(path_arg(mountpoint)),
            Self::MakeDirs { paths } => {
                CommandLine::new("mkdir").arg("-p").args(paths.iter().map(|p| path_arg(p)))
            }
        }
    }
}

impl fmt::Display for StorageOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FormatFat32 { device } => write!(f, "FormatFat32({})", device),
            Self::MakeSwap { device } => write!(f, "MakeSwap({})", device),
            Self::SwapOn { device } => write!(f, "SwapOn({})", device),
            Self::FormatBtrfs { device } => write!(f, "FormatBtrfs({})", device),
            Self::Mount { device, mountpoint, options } => {
                write!(f, "Mount({} -> {}, opts={:?})", device, mountpoint.display(), options)
            }
            Self::CreateSubvolume { path } => write!(f, "CreateSubvolume({})", path.display()),
            Self::Unmount { mountpoint } => write!(f, "Unmount({})", mountpoint.display()),
            Self::MakeDirs { paths } => write!(f, "MakeDirs({} paths)", paths.len()),
        }
    }
}

/// Ordered operations, split at the Filesystems / MountLayout boundary.
#[derive(Debug, Clone)]
pub struct StoragePlan {
    pub filesystems: Vec<StorageOp>,
    pub layout: Vec<StorageOp>,
    pub disk: String,
    pub target: PathBuf,
}

impl StoragePlan {
    pub fn ops(&self) -> impl Iterator<Item = &StorageOp> {
        self.filesystems.iter().chain(self.layout.iter())
    }

    /// Returns a summary of the plan for logging/display.
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!("Storage Plan for {}", self.disk),
            format!("  Target root: {}", self.target.display()),
        ];
        for (i, op) in self.ops().enumerate() {
            lines.push(format!("    {}. {}", i + 1, op));
        }
        lines.join("\n")
    }
}

fn subvolume_options(subvolume: &str) -> String {
    format!("{},subvol={}", BTRFS_MOUNT_OPTIONS, subvolume)
}

/// Calculate the storage operation plan for `disk`, mounted under `target`.
pub fn calculate_storage_plan(disk: &DiskSelection, target: &Path) -> StoragePlan {
    let (efi, swap, root) = disk.partitions();

    let filesystems = vec![
        StorageOp::FormatFat32 { device: efi.to_string() },
        StorageOp::MakeSwap { device: swap.to_string() },
        StorageOp::SwapOn { device: swap.to_string() },
        StorageOp::FormatBtrfs { device: root.to_string() },
    ];

    let mut layout = vec![StorageOp::Mount {
        device: root.to_string(),
        mountpoint: target.to_path_buf(),
        options: None,
    }];
    layout.extend(SUBVOLUMES.iter().map(|(name, _)| StorageOp::CreateSubvolume {
        path: target.join(name),
    }));
    layout.push(StorageOp::Unmount { mountpoint: target.to_path_buf() });

    // Root subvolume first, then the mountpoints inside it
    let (root_subvol, _) = SUBVOLUMES[0];
    layout.push(StorageOp::Mount {
        device: root.to_string(),
        mountpoint: target.to_path_buf(),
        options: Some(subvolume_options(root_subvol)),
    });
    layout.push(StorageOp::MakeDirs {
        paths: vec![
            target.join("boot"),
            target.join("var"),
            target.join("home"),
            target.join(".snapshots"),
        ],
    });
    for (name, mountpoint) in &SUBVOLUMES[1..] {
        layout.push(StorageOp::Mount {
            device: root.to_string(),
            mountpoint: target.join(mountpoint),
            options: Some(subvolume_options(name)),
        });
    }
    layout.push(StorageOp::Mount {
        device: efi.to_string(),
        mountpoint: target.join("boot"),
        options: None,
    });

    StoragePlan {
        filesystems,
        layout,
        disk: disk.device().to_string(),
        target: target.to_path_buf(),
    }
}
