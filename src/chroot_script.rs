//! Second-stage configuration scripts.
//!
//! The main script is rendered from a fixed template and run once inside the
//! target root. Rendering is a pure function of [`InstallConfig`]: the same
//! configuration always yields byte-identical text.
//!
//! Passwords and the hostname are embedded inside single-quoted literals via
//! [`escape_single_quoted_bounded`]. Every other interpolated value has already
//! passed a grammar that excludes shell metacharacters.

use std::fmt::Write as _;
use std::fs;
use std::io::Write as _;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::Path;

use crate::config::InstallConfig;
use crate::error::{InstallError, Result};
use crate::shell::{EncodeError, MAX_ENCODED_LEN, escape_single_quoted_bounded};
use crate::types::GpuDriver;

/// File name of the main script inside the target root.
pub const CHROOT_SCRIPT_NAME: &str = "chroot.sh";

/// File name of the resume-from-swap script inside the target root.
pub const RESUME_SCRIPT_NAME: &str = "resume_setup.sh";

const SCRIPT_MODE: u32 = 0o755;

/// Installed in the target after pacstrap.
pub const BASE_PACKAGES: &[&str] = &[
    "mtools", "cmake", "docker", "yt-dlp", "python", "fastfetch", "whois", "zsh", "git",
    "dosfstools", "man", "less", "xclip", "linux-headers", "reflector", "hyprland", "sddm",
    "kitty", "kate", "7zip", "firefox", "btop", "vlc", "smplayer", "unrar", "pipewire",
    "pipewire-alsa", "dolphin", "pipewire-pulse",
];

pub const ENABLED_SERVICES: &[&str] = &[
    "sddm",
    "NetworkManager",
    "snapper-timeline.timer",
    "snapper-cleanup.timer",
    "grub-btrfsd.service",
];

pub const USER_GROUPS: &str = "wheel,storage,power,audio,video";

const NO_GPU_NOTICE: &str = "echo \"no gpu driver was installed.\"\n";

fn pacman_install(packages: &[&str]) -> String {
    format!("pacman -S {} --noconfirm --needed\n", packages.join(" "))
}

/// Driver installation block. `None` renders only a notice.
pub fn render_gpu_section(gpu: Option<GpuDriver>) -> String {
    let mut section = String::from("# GPU drivers\n");
    match gpu {
        Some(driver) => section.push_str(&pacman_install(driver.packages())),
        None => section.push_str(NO_GPU_NOTICE),
    }
    section
}

/// Render the main second-stage script.
pub fn render_chroot_script(config: &InstallConfig) -> std::result::Result<String, EncodeError> {
    let esc_root_pass = escape_single_quoted_bounded(config.root_password().expose(), MAX_ENCODED_LEN)?;
    let esc_user_pass = escape_single_quoted_bounded(config.user_password().expose(), MAX_ENCODED_LEN)?;
    let esc_host = escape_single_quoted_bounded(config.hostname().as_str(), MAX_ENCODED_LEN)?;
    let host = config.hostname().as_str();
    let user = config.username().as_str();

    let mut s = String::with_capacity(2048);
    s.push_str("#!/usr/bin/env bash\n");
    s.push_str("set -e\n");

    // Clock and locale
    let _ = writeln!(s, "ln -sf /usr/share/zoneinfo/{} /etc/localtime", config.timezone());
    s.push_str("hwclock --systohc\n");
    s.push_str("sed -i 's/^#en_US.UTF-8 UTF-8/en_US.UTF-8 UTF-8/' /etc/locale.gen\n");
    s.push_str("locale-gen\n");
    s.push_str("echo \"LANG=en_US.UTF-8\" >> /etc/locale.conf\n");

    // Identity
    let _ = writeln!(s, "echo '{}' > /etc/hostname", esc_host);
    let _ = writeln!(s, "printf '%s' 'root:{}' | chpasswd", esc_root_pass);
    s.push_str("cat <<EOF > /etc/hosts\n");
    s.push_str("127.0.0.1 localhost\n");
    s.push_str("::1       localhost\n");
    let _ = writeln!(s, "127.0.1.1\t{host}.localdomain\t{host}");
    s.push_str("EOF\n");

    // Packages
    s.push_str(&pacman_install(BASE_PACKAGES));
    s.push_str(&render_gpu_section(Some(config.gpu())));

    for service in ENABLED_SERVICES {
        let _ = writeln!(s, "systemctl enable {}", service);
    }

    // Login account with passwordless sudo for wheel
    let _ = writeln!(s, "useradd -m -G {} {}", USER_GROUPS, user);
    s.push_str(
        "sed -i 's/^# %wheel ALL=(ALL:ALL) NOPASSWD: ALL/%wheel ALL=(ALL:ALL) NOPASSWD: ALL/' /etc/sudoers\n",
    );
    let _ = writeln!(s, "printf '%s' '{}:{}' | chpasswd", user, esc_user_pass);

    // Bootloader
    s.push_str("grub-install --target=x86_64-efi --efi-directory=/boot --bootloader-id=GRUB\n");
    s.push_str("grub-mkconfig -o /boot/grub/grub.cfg\n");

    Ok(s)
}

/// Script that enables hibernation to the swap partition.
pub fn render_resume_script() -> String {
    r##"#!/usr/bin/env bash
set -euo pipefail

SWAP_UUID=$(blkid -t TYPE=swap -o value -s UUID | head -n1 || true)
if [[ -z "${SWAP_UUID}" ]]; then
  echo "No swap UUID detected; skipping resume configuration."
  exit 0
fi

echo "Detected swap UUID: ${SWAP_UUID}"

if grep -q '^GRUB_CMDLINE_LINUX=' /etc/default/grub; then
  if grep -q 'resume=UUID=' /etc/default/grub; then
    sed -i -E "s#resume=UUID=[^\" ]+#resume=UUID=${SWAP_UUID}#" /etc/default/grub
  else
    sed -i -E "s#^(GRUB_CMDLINE_LINUX=\".*)\"\$#\1 resume=UUID=${SWAP_UUID}\"#" /etc/default/grub
  fi
else
  echo "GRUB_CMDLINE_LINUX=\"resume=UUID=${SWAP_UUID}\"" >> /etc/default/grub
fi

if grep -q '^HOOKS=' /etc/mkinitcpio.conf; then
  if ! grep -qE '^HOOKS=.*\bbtrfs\b' /etc/mkinitcpio.conf; then
    sed -i -E '/^HOOKS=/ s/( filesystems)/ btrfs\1/' /etc/mkinitcpio.conf
  fi
  if ! grep -qE '^HOOKS=.*\bresume\b' /etc/mkinitcpio.conf; then
    sed -i -E '/^HOOKS=/ s/( filesystems)/ resume\1/' /etc/mkinitcpio.conf
  fi
fi

mkinitcpio -P
grub-mkconfig -o /boot/grub/grub.cfg
"##
    .to_string()
}

/// Write `contents` to `path` with mode 0755, replacing any existing file.
pub fn write_executable(path: &Path, contents: impl AsRef<[u8]>) -> Result<()> {
    let contents = contents.as_ref();
    let write = || -> std::io::Result<()> {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(SCRIPT_MODE)
            .open(path)?;
        file.write_all(contents)?;
        // mode() is filtered by the umask
        file.set_permissions(fs::Permissions::from_mode(SCRIPT_MODE))?;
        Ok(())
    };
    write().map_err(|e| InstallError::file_write(path, e))?;
    log::debug!("Wrote {} ({} bytes)", path.display(), contents.len());
    Ok(())
}
