//! Pre-flight sanity checks for the runtime environment
//!
//! Verifies, before anything is prompted or touched:
//! - Running with root privileges (EUID 0)
//! - Booted in UEFI mode (`/sys/firmware/efi` exists)
//! - Every external binary the installation calls is in PATH
//!
//! The probes sit behind [`HostProbe`] so the orchestrator can be driven
//! against a fake host in tests.

use std::path::Path;

use crate::error::InstallError;

/// Binaries invoked on the live system or inside the target root.
pub const REQUIRED_BINARIES: &[&str] = &[
    "bash",
    "reflector",
    "pacman",
    "pacman-key",
    "lsblk",
    "fdisk",
    "mkfs.fat",
    "mkswap",
    "swapon",
    "mkfs.btrfs",
    "mount",
    "btrfs",
    "umount",
    "mkdir",
    "rm",
    "pacstrap",
    "genfstab",
    "arch-chroot",
    "ln",
    "hwclock",
    "sed",
    "locale-gen",
    "chpasswd",
    "systemctl",
    "useradd",
    "grub-install",
    "grub-mkconfig",
];

const EFI_FIRMWARE_DIR: &str = "/sys/firmware/efi";

/// Environment facts the installer needs before it may touch a disk.
pub trait HostProbe {
    fn is_elevated(&self) -> bool;
    fn is_uefi(&self) -> bool;
    fn has_binary(&self, name: &str) -> bool;
}

/// Probes the machine the installer is running on.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemHost;

impl HostProbe for SystemHost {
    fn is_elevated(&self) -> bool {
        nix::unistd::geteuid().is_root()
    }

    fn is_uefi(&self) -> bool {
        // The kernel only exposes this directory when booted through UEFI
        Path::new(EFI_FIRMWARE_DIR).exists()
    }

    fn has_binary(&self, name: &str) -> bool {
        which::which(name).is_ok()
    }
}

/// Result of environment verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanityCheckResult {
    pub is_root: bool,
    pub is_uefi: bool,
    pub missing_binaries: Vec<String>,
}

impl SanityCheckResult {
    pub fn is_ok(&self) -> bool {
        self.is_root && self.is_uefi && self.missing_binaries.is_empty()
    }

    /// First failed check, in the order root, UEFI, dependencies.
    pub fn first_error(&self) -> Option<InstallError> {
        if !self.is_root {
            Some(InstallError::NotElevated)
        } else if !self.is_uefi {
            Some(InstallError::NotUefi)
        } else {
            self.missing_binaries
                .first()
                .map(|name| InstallError::MissingDependency(name.clone()))
        }
    }

    pub fn into_result(self) -> Result<(), InstallError> {
        match self.first_error() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Perform all sanity checks and return the result
pub fn verify_environment(host: &dyn HostProbe) -> SanityCheckResult {
    let missing_binaries: Vec<String> = REQUIRED_BINARIES
        .iter()
        .filter(|binary| !host.has_binary(binary))
        .map(|binary| (*binary).to_string())
        .collect();

    for binary in &missing_binaries {
        log::debug!("Required binary not found: {}", binary);
    }

    SanityCheckResult {
        is_root: host.is_elevated(),
        is_uefi: host.is_uefi(),
        missing_binaries,
    }
}

/// `<binary> (install: pacman -S <package>)`, shown next to a missing-dependency error.
pub fn install_hint(binary: &str) -> String {
    format!("{} (install: pacman -S {})", binary, package_for_binary(binary))
}

/// Map binary names to their Arch Linux package names
pub fn package_for_binary(binary: &str) -> &'static str {
    match binary {
        "bash" => "bash",
        "reflector" => "reflector",
        "pacman" | "pacman-key" => "pacman",
        "pacstrap" | "genfstab" | "arch-chroot" => "arch-install-scripts",
        "mkfs.fat" => "dosfstools",
        "mkfs.btrfs" | "btrfs" => "btrfs-progs",
        "grub-install" | "grub-mkconfig" => "grub",
        "sed" => "sed",
        "locale-gen" => "glibc",
        "systemctl" => "systemd",
        "useradd" | "chpasswd" => "shadow",
        "mkdir" | "rm" | "ln" => "coreutils",
        _ => "util-linux",
    }
}
