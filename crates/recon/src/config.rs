use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ReconError;
use crate::load::tables;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub join: JoinConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            input: InputConfig::default(),
            output: OutputConfig::default(),
            join: JoinConfig::default(),
        }
    }
}

fn default_name() -> String {
    "referral audit".into()
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputConfig {
    #[serde(default = "default_input_dir")]
    pub dir: PathBuf,
    #[serde(default)]
    pub files: InputFiles,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            dir: default_input_dir(),
            files: InputFiles::default(),
        }
    }
}

fn default_input_dir() -> PathBuf {
    PathBuf::from("data")
}

/// File name per source table, relative to `input.dir`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputFiles {
    pub referrals: String,
    pub referral_logs: String,
    pub user_logs: String,
    pub lead_logs: String,
    pub statuses: String,
    pub rewards: String,
    pub transactions: String,
}

impl Default for InputFiles {
    fn default() -> Self {
        Self {
            referrals: "user_referrals.csv".into(),
            referral_logs: "user_referral_logs.csv".into(),
            user_logs: "user_logs.csv".into(),
            lead_logs: "lead_logs.csv".into(),
            statuses: "user_referral_statuses.csv".into(),
            rewards: "referral_rewards.csv".into(),
            transactions: "paid_transactions.csv".into(),
        }
    }
}

impl InputFiles {
    /// (table name, file name) pairs in load order.
    pub fn entries(&self) -> [(&'static str, &str); 7] {
        [
            (tables::REFERRALS, self.referrals.as_str()),
            (tables::REFERRAL_LOGS, self.referral_logs.as_str()),
            (tables::USER_LOGS, self.user_logs.as_str()),
            (tables::LEAD_LOGS, self.lead_logs.as_str()),
            (tables::STATUSES, self.statuses.as_str()),
            (tables::REWARDS, self.rewards.as_str()),
            (tables::TRANSACTIONS, self.transactions.as_str()),
        ]
    }
}

// ---------------------------------------------------------------------------
// Output + Join
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_report")]
    pub report: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            report: default_report(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_report() -> String {
    "referral_report.csv".into()
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JoinConfig {
    #[serde(default)]
    pub on_duplicate: DuplicatePolicy,
}

/// What to do when a right-hand join key occurs more than once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Log and fan out (one master row per match).
    #[default]
    Warn,
    /// Abort before any row is produced.
    Error,
}

impl std::fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl PipelineConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: PipelineConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        let entries = self.input.files.entries();
        for (i, (table, file)) in entries.iter().enumerate() {
            if file.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "input.files: empty file name for table '{table}'"
                )));
            }
            if let Some((other, _)) = entries[..i].iter().find(|(_, f)| f == file) {
                return Err(ReconError::ConfigValidation(format!(
                    "input.files: tables '{other}' and '{table}' both read '{file}'"
                )));
            }
        }

        if self.output.report.trim().is_empty() {
            return Err(ReconError::ConfigValidation("output.report must not be empty".into()));
        }
        if self.output.report.contains(['/', '\\']) {
            return Err(ReconError::ConfigValidation(format!(
                "output.report must be a file name, got '{}'",
                self.output.report
            )));
        }

        Ok(())
    }

    /// Resolve relative directories against the config file's directory.
    pub fn rebase(&mut self, base_dir: &Path) {
        if self.input.dir.is_relative() {
            self.input.dir = base_dir.join(&self.input.dir);
        }
        if self.output.dir.is_relative() {
            self.output.dir = base_dir.join(&self.output.dir);
        }
    }

    pub fn input_path(&self, file: &str) -> PathBuf {
        self.input.dir.join(file)
    }

    /// Full path of the file a source table is read from.
    pub fn table_path(&self, table: &str) -> Option<PathBuf> {
        self.input
            .files
            .entries()
            .iter()
            .find(|(name, _)| *name == table)
            .map(|(_, file)| self.input_path(file))
    }

    pub fn report_path(&self) -> PathBuf {
        self.output.dir.join(&self.output.report)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
