//! Installation configuration.
//!
//! [`InstallConfig`] is assembled once by the orchestrator from validated
//! values and never mutated afterwards.

use std::fmt;

use crate::types::GpuDriver;
use crate::validation::{Country, Hostname, Timezone, Username, ValidationError};

/// A password: any non-empty UTF-8 text, quotes and newlines included.
/// `Debug` never shows the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Reject empty passwords; everything else is accepted as-is.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.is_empty() {
            return Err(ValidationError::EmptyPassword);
        }
        Ok(Self(value))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Everything the second-stage script needs.
#[derive(Debug, Clone)]
pub struct InstallConfig {
    country: Country,
    username: Username,
    hostname: Hostname,
    user_password: Secret,
    root_password: Secret,
    timezone: Timezone,
    gpu: GpuDriver,
}

impl InstallConfig {
    pub fn new(
        country: Country,
        username: Username,
        hostname: Hostname,
        user_password: Secret,
        root_password: Secret,
        timezone: Timezone,
        gpu: GpuDriver,
    ) -> Self {
        Self {
            country,
            username,
            hostname,
            user_password,
            root_password,
            timezone,
            gpu,
        }
    }

    pub fn country(&self) -> &Country {
        &self.country
    }

    pub fn username(&self) -> &Username {
        &self.username
    }

    pub fn hostname(&self) -> &Hostname {
        &self.hostname
    }

    pub fn user_password(&self) -> &Secret {
        &self.user_password
    }

    pub fn root_password(&self) -> &Secret {
        &self.root_password
    }

    pub fn timezone(&self) -> &Timezone {
        &self.timezone
    }

    pub fn gpu(&self) -> GpuDriver {
        self.gpu
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = Secret::new("hunter2").expect("non-empty");
        assert_eq!(format!("{secret:?}"), "Secret(***)");
        assert_eq!(secret.expose(), "hunter2");
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert_eq!(Secret::new(""), Err(ValidationError::EmptyPassword));
    }

    #[test]
    fn test_config_debug_hides_passwords() {
        let config = InstallConfig::new(
            Country::parse("Germany").expect("valid"),
            Username::parse("alice").expect("valid"),
            Hostname::parse("archbox").expect("valid"),
            Secret::new("userpw").expect("valid"),
            Secret::new("rootpw").expect("valid"),
            Timezone::parse("Europe/Berlin").expect("valid"),
            GpuDriver::Mesa,
        );
        let dump = format!("{config:?}");
        assert!(dump.contains("alice"));
        assert!(!dump.contains("userpw"));
        assert!(!dump.contains("rootpw"));
    }
}
