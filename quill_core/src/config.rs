//! TOML-based configuration for the Quill core.
//!
//! Every section and field has a default, so an empty document is a valid
//! configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{Error, Result};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CoreConfig {
    /// Structured diff settings.
    #[serde(default)]
    pub diff: DiffConfig,
    /// Branch review settings.
    #[serde(default)]
    pub review: ReviewConfig,
    /// Cherry-pick and merge settings.
    #[serde(default)]
    pub integration: IntegrationConfig,
    /// Tracing settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl CoreConfig {
    /// Load and validate configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] when the file cannot be read and
    /// [`Error::Config`] when it cannot be parsed or fails validation.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");
        let contents = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the text cannot be parsed or fails
    /// validation.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).map_err(|err| Error::Config {
            message: err.to_string(),
        })?;
        config.validate()?;
        debug!(?config, "configuration parsed");
        Ok(config)
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.diff.max_line_tokens == 0 {
            return Err(config_error("diff.max_line_tokens must be at least 1"));
        }
        if self.review.default_limit == Some(0) {
            return Err(config_error("review.default_limit must be at least 1"));
        }
        if self.integration.committer_name.trim().is_empty() {
            return Err(config_error("integration.committer_name must not be empty"));
        }
        if !self.integration.committer_email.contains('@') {
            return Err(config_error(
                "integration.committer_email must be an email address",
            ));
        }
        Ok(())
    }
}

fn config_error(message: &str) -> Error {
    Error::Config {
        message: message.to_owned(),
    }
}

/// `[diff]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffConfig {
    /// Refine paired lines into word segments.
    #[serde(default = "default_true")]
    pub word_diff: bool,
    /// Lines with more tokens than this are left unrefined.
    #[serde(default = "default_max_line_tokens")]
    pub max_line_tokens: u32,
    /// Context lines around each hunk.
    #[serde(default = "default_context_lines")]
    pub context_lines: u32,
    /// Pair deleted/added files into renames.
    #[serde(default = "default_true")]
    pub detect_renames: bool,
    /// Detect files copied from unmodified sources.
    #[serde(default = "default_true")]
    pub detect_copies: bool,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            word_diff: true,
            max_line_tokens: default_max_line_tokens(),
            context_lines: default_context_lines(),
            detect_renames: true,
            detect_copies: true,
        }
    }
}

/// `[review]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ReviewConfig {
    /// Limit applied when a caller does not pass one.
    #[serde(default)]
    pub default_limit: Option<u32>,
}

/// What a mutation does when another mutation holds the repository.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusyPolicy {
    /// Fail immediately with [`Error::RepositoryBusy`].
    #[default]
    Reject,
    /// Queue behind the running mutation.
    Wait,
}

/// `[integration]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationConfig {
    /// Committer name recorded on cherry-picks and merges.
    #[serde(default = "default_committer_name")]
    pub committer_name: String,
    /// Committer email recorded on cherry-picks and merges.
    #[serde(default = "default_committer_email")]
    pub committer_email: String,
    /// Append a `(cherry picked from commit …)` line to picked messages.
    #[serde(default = "default_true")]
    pub record_origin: bool,
    /// Behaviour when the repository is already being mutated.
    #[serde(default)]
    pub busy_policy: BusyPolicy,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            committer_name: default_committer_name(),
            committer_email: default_committer_email(),
            record_origin: true,
            busy_policy: BusyPolicy::default(),
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber` filter directive, e.g. `info` or `quill_core=debug`.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

const fn default_true() -> bool {
    true
}
const fn default_max_line_tokens() -> u32 {
    512
}
const fn default_context_lines() -> u32 {
    3
}
fn default_committer_name() -> String {
    "Quill".into()
}
fn default_committer_email() -> String {
    "quill@localhost".into()
}
fn default_log_level() -> String {
    "info".into()
}
