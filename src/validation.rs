//! Input grammars for every operator-supplied value.
//!
//! Each field has a pure predicate (`is_valid_*`) and an owned newtype whose
//! only constructor runs that predicate. Anything interpolated into a command
//! line or into the chroot script goes through one of these types first.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Validation failures, one per field. Messages are shown to the operator verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid country string. Letters and spaces only (1-64 characters).")]
    Country(String),

    #[error("Invalid username. Use a-z, 0-9, -, _ (1-32 characters).")]
    Username(String),

    #[error(
        "Invalid hostname. Use dot-separated labels of 1-63 letters, digits or '-', \
         not starting or ending with '-' (253 characters max)."
    )]
    Hostname(String),

    #[error("Invalid timezone. Expected Region/City using letters, digits, '_', '-' and '/'.")]
    Timezone(String),

    #[error("Invalid GPU choice. Enter a single digit between 0 and 4.")]
    GpuChoice(String),

    #[error("The drive name was incorrect, try again.")]
    DiskName(String),

    #[error("Password cannot be empty.")]
    EmptyPassword,

    #[error("Passwords do not match.")]
    PasswordMismatch,
}

// ============================================================================
// Predicates
// ============================================================================

/// 1-32 ASCII alphanumerics, `-` or `_`.
pub fn is_valid_username(s: &str) -> bool {
    (1..=32).contains(&s.len())
        && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// 1-253 characters of dot-separated labels.
///
/// Every label is 1-63 ASCII alphanumerics or `-` and may neither start nor
/// end with `-`. This holds for the first label too, so `-bad.com` is rejected.
pub fn is_valid_hostname(s: &str) -> bool {
    if !(1..=253).contains(&s.len()) {
        return false;
    }
    s.split('.').all(|label| {
        (1..=63).contains(&label.len())
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
    })
}

/// 1-64 ASCII letters and spaces.
pub fn is_valid_country(s: &str) -> bool {
    (1..=64).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_alphabetic() || b == b' ')
}

/// 1-128 characters of ASCII alphanumerics, `_`, `/`, `-`, with at least one `/`.
///
/// Only the character set and the presence of a slash are checked; the
/// string is not looked up in the zoneinfo database.
pub fn is_valid_timezone(s: &str) -> bool {
    (1..=128).contains(&s.len())
        && s.contains('/')
        && s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'/' | b'-'))
}

/// Exactly one of `0`, `1`, `2`, `3`, `4`.
pub fn is_valid_gpu_choice(s: &str) -> bool {
    matches!(s.as_bytes(), [b'0'..=b'4'])
}

/// `sd` + one lowercase letter, or `nvme<digits>n<digits>`.
pub fn is_valid_disk_name(s: &str) -> bool {
    is_short_disk_name(s) || is_nvme_disk_name(s)
}

/// `sd` followed by exactly one letter `a`-`z`.
pub fn is_short_disk_name(s: &str) -> bool {
    matches!(s.as_bytes(), [b's', b'd', b'a'..=b'z'])
}

/// `nvme` + one or more digits + `n` + one or more digits, nothing else.
pub fn is_nvme_disk_name(s: &str) -> bool {
    let Some(rest) = s.strip_prefix("nvme") else {
        return false;
    };
    let Some((controller, namespace)) = rest.split_once('n') else {
        return false;
    };
    let all_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    all_digits(controller) && all_digits(namespace)
}

// ============================================================================
// Validated newtypes
// ============================================================================

macro_rules! validated_string {
    ($(#[$meta:meta])* $name:ident, $check:path, $variant:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(String);

        impl $name {
            /// Validate `raw` and take ownership of it.
            pub fn parse(raw: impl Into<String>) -> Result<Self, ValidationError> {
                let raw = raw.into();
                if $check(&raw) {
                    Ok(Self(raw))
                } else {
                    Err(ValidationError::$variant(raw))
                }
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

validated_string!(
    /// Mirror country passed to reflector.
    Country,
    is_valid_country,
    Country
);
validated_string!(
    /// Login name of the account created in the target system.
    Username,
    is_valid_username,
    Username
);
validated_string!(
    /// Hostname written to `/etc/hostname` and `/etc/hosts`.
    Hostname,
    is_valid_hostname,
    Hostname
);
validated_string!(
    /// IANA-style zone, linked to `/etc/localtime`.
    Timezone,
    is_valid_timezone,
    Timezone
);
validated_string!(
    /// Kernel block device name without `/dev/`, e.g. `sda` or `nvme0n1`.
    DiskName,
    is_valid_disk_name,
    DiskName
);

impl DiskName {
    /// True for the `sdX` naming convention.
    pub fn is_short(&self) -> bool {
        is_short_disk_name(&self.0)
    }
}
