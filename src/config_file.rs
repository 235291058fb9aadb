//! Answer file handling.
//!
//! An answer file is a JSON object that pre-fills some or all of the
//! interactive prompts. Every field is optional; missing fields are asked for
//! on the terminal. Pre-filled values go through the same validators as typed
//! ones.
//!
//! ```json
//! {
//!   "country": "Germany",
//!   "username": "alice",
//!   "hostname": "archbox",
//!   "user_password": "CHANGE_ME",
//!   "root_password": "CHANGE_ME",
//!   "timezone": "Europe/Berlin",
//!   "gpu": "0",
//!   "disk": "sda"
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::types::GpuDriver;
use crate::validation::{Country, DiskName, Hostname, Timezone, Username};

/// Password value that means "ask me instead".
pub const PASSWORD_PLACEHOLDER: &str = "CHANGE_ME";

/// GPU choice written either as `"2"` or `2`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChoiceValue {
    Number(u64),
    Text(String),
}

impl ChoiceValue {
    fn as_choice(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.trim().to_string(),
        }
    }
}

/// Pre-filled answers. Unknown keys are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerFile {
    pub country: Option<String>,
    pub username: Option<String>,
    #[serde(alias = "host_name")]
    pub hostname: Option<String>,
    #[serde(alias = "user_pass")]
    pub user_password: Option<String>,
    #[serde(alias = "root_pass")]
    pub root_password: Option<String>,
    pub timezone: Option<String>,
    pub gpu: Option<ChoiceValue>,
    pub disk: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn password(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .filter(|s| !s.is_empty() && *s != PASSWORD_PLACEHOLDER)
}

impl AnswerFile {
    /// Load answers from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read answer file {:?}", path.as_ref()))?;

        let answers: Self =
            serde_json::from_str(&content).context("Failed to parse answer file JSON")?;

        log::debug!("Loaded answer file {:?}", path.as_ref());
        Ok(answers)
    }

    pub fn country(&self) -> Option<&str> {
        present(&self.country)
    }

    pub fn username(&self) -> Option<&str> {
        present(&self.username)
    }

    pub fn hostname(&self) -> Option<&str> {
        present(&self.hostname)
    }

    pub fn timezone(&self) -> Option<&str> {
        present(&self.timezone)
    }

    pub fn disk(&self) -> Option<&str> {
        present(&self.disk)
    }

    pub fn gpu(&self) -> Option<String> {
        self.gpu.as_ref().map(ChoiceValue::as_choice).filter(|s| !s.is_empty())
    }

    /// User password, unless absent or left as the placeholder.
    pub fn user_password(&self) -> Option<&str> {
        password(&self.user_password)
    }

    /// Root password, unless absent or left as the placeholder.
    pub fn root_password(&self) -> Option<&str> {
        password(&self.root_password)
    }

    /// Check every present field against its grammar.
    pub fn validate(&self) -> Result<()> {
        if let Some(country) = self.country() {
            Country::parse(country).context("country")?;
        }
        if let Some(username) = self.username() {
            Username::parse(username).context("username")?;
        }
        if let Some(hostname) = self.hostname() {
            Hostname::parse(hostname).context("hostname")?;
        }
        if let Some(timezone) = self.timezone() {
            Timezone::parse(timezone).context("timezone")?;
        }
        if let Some(gpu) = self.gpu() {
            GpuDriver::from_choice(&gpu).context("gpu")?;
        }
        if let Some(disk) = self.disk() {
            DiskName::parse(disk).context("disk")?;
        }
        Ok(())
    }

    /// Number of prompts this file answers.
    pub fn answered_count(&self) -> usize {
        [
            self.country().is_some(),
            self.username().is_some(),
            self.hostname().is_some(),
            self.user_password().is_some(),
            self.root_password().is_some(),
            self.timezone().is_some(),
            self.gpu().is_some(),
            self.disk().is_some(),
        ]
        .into_iter()
        .filter(|answered| *answered)
        .count()
    }
}
