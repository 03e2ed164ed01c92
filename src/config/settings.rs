//! Operator configuration document and startup environment.
//!
//! The YAML document is deserialized with every field optional: presence
//! checks are a validation concern (see [`crate::domain`]), not a parsing
//! concern, so one malformed entry never fails the whole document. Only a
//! missing file, unparseable YAML, an empty document, or empty profile or
//! subaccount sections are fatal.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use serde::Deserialize;

use crate::domain::{resolve_timezone, DEFAULT_TIME_FORMAT};

/// Schedule mask applied when neither the subaccount nor the global
/// settings define one.
pub const DEFAULT_REPORT_DAYS: &str = "01234";

/// Date-only format for the subject line when no global time format is set.
const DEFAULT_SUBJECT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Errors raised while resolving startup configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is absent.
    #[error("environment variable {0} is not set")]
    MissingEnv(&'static str),

    /// The config file path does not exist.
    #[error("config file {path} not found")]
    NotFound {
        /// The path that was looked up.
        path: PathBuf,
    },

    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid YAML.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The config file parses to an empty document.
    #[error("config file is empty")]
    Empty,

    /// The document has no profiles.
    #[error("no profiles found in config file")]
    NoProfiles,

    /// The document has no subaccount report entries.
    #[error("no subaccount reports found in config file, nothing to report")]
    NoSubaccountReports,
}

/// Startup configuration taken from the environment.
///
/// Built once in `main` and passed down explicitly so tests can construct
/// it directly instead of mutating process state.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Master API key id.
    pub api_id: String,
    /// Master API key secret.
    pub api_secret: String,
    /// Path to the YAML configuration document.
    pub config_path: PathBuf,
    /// Path to the persisted watermark state file.
    pub state_path: PathBuf,
}

impl RunConfig {
    /// Reads the startup configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_id: require_env("MAILJET_APP_ID")?,
            api_secret: require_env("MAILJET_APP_SECRET")?,
            config_path: require_env("CONFIG_FILE")?.into(),
            state_path: require_env("SYNC_STATE")?.into(),
        })
    }
}

fn require_env(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingEnv(name))
}

/// The full operator configuration document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Run-wide settings.
    #[serde(default)]
    pub global_settings: GlobalSettings,
    /// Status code and field header translations for rendered reports.
    #[serde(default)]
    pub status_translations: BTreeMap<String, String>,
    /// Report profiles keyed by name.
    #[serde(default)]
    pub profiles: BTreeMap<String, ProfileConfig>,
    /// Per-subaccount report entries.
    #[serde(default)]
    pub subaccount_reports: Vec<SubaccountConfig>,
}

/// Run-wide settings, all optional with documented defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GlobalSettings {
    /// IANA timezone name for all rendered timestamps.
    pub timezone: Option<String>,
    /// Default display format for timestamps.
    pub time_format: Option<String>,
    /// Default schedule mask of ISO weekday digits.
    pub report_days: Option<String>,
    /// Initial reporting window, in days, for subaccounts without a
    /// watermark.
    pub default_max_report_days: Option<i64>,
}

impl GlobalSettings {
    /// The report timezone, defaulting to Europe/Amsterdam.
    pub fn timezone(&self) -> Tz {
        resolve_timezone(self.timezone.as_deref())
    }

    /// The display format for window bounds and report timestamps.
    pub fn time_format(&self) -> &str {
        self.time_format.as_deref().unwrap_or(DEFAULT_TIME_FORMAT)
    }

    /// The format for the date interpolated into the subject line.
    ///
    /// Uses the global time format when one is set, otherwise a date-only
    /// default.
    pub fn subject_date_format(&self) -> &str {
        self.time_format
            .as_deref()
            .unwrap_or(DEFAULT_SUBJECT_DATE_FORMAT)
    }

    /// The schedule mask used by subaccounts without their own.
    pub fn report_days(&self) -> &str {
        self.report_days.as_deref().unwrap_or(DEFAULT_REPORT_DAYS)
    }

    /// Days of history to report for a subaccount with no watermark.
    pub fn default_max_report_days(&self) -> i64 {
        self.default_max_report_days.unwrap_or(1)
    }
}

/// A raw profile entry. Required fields are checked during validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileConfig {
    /// Provider template id.
    pub template_id: Option<i64>,
    /// Subject template with positional `{}` placeholders.
    pub subject: Option<String>,
    /// Sender address.
    pub from_email: Option<String>,
    /// Sender display name.
    pub from_name: Option<String>,
    /// Per-profile time format for detail rows.
    pub time_format: Option<String>,
    /// Statuses to itemize in detail tables.
    #[serde(default)]
    pub report_in_detail: Vec<String>,
    /// Profile-level default skip policy for empty detail maps.
    pub skip_if_no_details: Option<bool>,
    /// Profile-level default skip policy for empty stats.
    pub skip_if_no_data: Option<bool>,
}

/// A raw subaccount report entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubaccountConfig {
    /// Subaccount name as registered with the provider.
    pub name: Option<String>,
    /// Name of the assigned profile.
    pub profile: Option<String>,
    /// Schedule mask override.
    pub report_days: Option<String>,
    /// Skip policy override for empty detail maps.
    pub skip_if_no_details: Option<bool>,
    /// Skip policy override for empty stats.
    pub skip_if_no_data: Option<bool>,
    /// Report recipients.
    pub recipients: Option<Vec<RecipientConfig>>,
}

/// A raw recipient entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipientConfig {
    /// Destination address.
    pub to_email: Option<String>,
    /// Display name.
    pub to_name: Option<String>,
}

/// Loads and parses the configuration document.
///
/// Fatal conditions: missing file, unreadable file, invalid YAML, empty
/// document, no profiles, no subaccount reports.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigError::NotFound {
                path: path.to_owned(),
            });
        }
        Err(err) => return Err(err.into()),
    };

    let config: Option<Config> = serde_yaml::from_str(&text)?;
    let config = config.ok_or(ConfigError::Empty)?;

    if config.profiles.is_empty() {
        return Err(ConfigError::NoProfiles);
    }
    if config.subaccount_reports.is_empty() {
        return Err(ConfigError::NoSubaccountReports);
    }
    Ok(config)
}
