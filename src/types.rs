//! Type-safe choice types for archsetup
//!
//! Replaces the raw numeric menu answer with an enum that provides
//! exhaustive matching when the chroot script selects driver packages.

use strum::{Display, EnumIter, IntoEnumIterator};

use crate::validation::{ValidationError, is_valid_gpu_choice};

/// Graphics driver stack, selected by the single-digit menu answer `0`-`4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Display, EnumIter)]
pub enum GpuDriver {
    /// 0 -> open-source Mesa + nouveau
    #[strum(serialize = "Mesa (open-source)")]
    Mesa,
    /// 1 -> NVIDIA open kernel modules
    #[strum(serialize = "NVIDIA (open kernel)")]
    NvidiaOpen,
    /// 2 -> NVIDIA proprietary modules
    #[strum(serialize = "NVIDIA (proprietary)")]
    NvidiaProprietary,
    /// 3 -> Intel media + Vulkan
    #[strum(serialize = "Intel")]
    Intel,
    /// 4 -> VirtualBox guest (plain Mesa)
    #[strum(serialize = "VirtualBox")]
    VirtualBox,
}

impl GpuDriver {
    /// Parse the raw menu answer. Only the exact strings `"0"`..`"4"` are accepted.
    pub fn from_choice(raw: &str) -> Result<Self, ValidationError> {
        if !is_valid_gpu_choice(raw) {
            return Err(ValidationError::GpuChoice(raw.to_string()));
        }
        match raw {
            "0" => Ok(Self::Mesa),
            "1" => Ok(Self::NvidiaOpen),
            "2" => Ok(Self::NvidiaProprietary),
            "3" => Ok(Self::Intel),
            "4" => Ok(Self::VirtualBox),
            _ => Err(ValidationError::GpuChoice(raw.to_string())),
        }
    }

    /// The menu digit for this driver.
    pub const fn choice(self) -> u8 {
        match self {
            Self::Mesa => 0,
            Self::NvidiaOpen => 1,
            Self::NvidiaProprietary => 2,
            Self::Intel => 3,
            Self::VirtualBox => 4,
        }
    }

    /// Packages installed inside the target root for this driver.
    pub const fn packages(self) -> &'static [&'static str] {
        match self {
            Self::Mesa => &[
                "libva-mesa-driver",
                "vulkan-nouveau",
                "xf86-video-nouveau",
                "xorg-server",
                "xorg-xinit",
                "mesa-utils",
                "mesa",
            ],
            Self::NvidiaOpen => &[
                "dkms",
                "libva-nvidia-driver",
                "nvidia-open-dkms",
                "xorg-server",
                "xorg-xinit",
            ],
            Self::NvidiaProprietary => &[
                "dkms",
                "libva-nvidia-driver",
                "nvidia-dkms",
                "xorg-server",
                "xorg-xinit",
            ],
            Self::Intel => &[
                "intel-media-driver",
                "libva-intel-driver",
                "mesa",
                "vulkan-intel",
                "xorg-server",
                "xorg-xinit",
            ],
            Self::VirtualBox => &["mesa", "xorg-server", "xorg-xinit"],
        }
    }

    /// Menu text shown when prompting for the driver.
    pub fn menu() -> String {
        let mut text = String::from("Select the graphics driver (0-4):\n");
        for driver in Self::iter() {
            text.push_str(&format!("{} -> {}\n", driver.choice(), driver));
        }
        text.push_str("Your choice: ");
        text
    }
}

impl std::str::FromStr for GpuDriver {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_choice(s)
    }
}
