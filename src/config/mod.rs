//! Monitor configuration loaded from CLI, environment, and files.
//!
//! Values are merged with ortho-config's layered approach.
//!
//! # Precedence
//!
//! Configuration values are loaded with the following precedence (lowest to
//! highest):
//!
//! 1. **Defaults** – Built-in application defaults
//! 2. **Configuration file** – `.stalewatch.toml` in current directory, home
//!    directory, or XDG config directory
//! 3. **Environment variables** – `STALEWATCH_*`, plus the legacy
//!    `BITBUCKET_APP_PASSWORD`
//! 4. **Command-line arguments** – `--project`, `--repositories`, ...
//!
//! # Configuration File
//!
//! ```toml
//! bitbucket_domain = "bitbucket.example.com"
//! project = "PLAT"
//! user = "svc-stalewatch"
//! repositories = ["api", "web"]
//! ignore_keywords = ["wip", "do not merge"]
//! stale_after_days = 7
//! interval_hours = 24
//! smtp_host = "smtp.example.com"
//! smtp_from = "stalewatch@example.com"
//! smtp_to = ["team@example.com"]
//! teams_webhook_url = "https://example.webhook.office.com/..."
//! log_file = "logs/stalewatch.log"
//! log_max_size_mb = 50
//! log_max_backups = 5
//! log_compress = true
//! ```

use std::env;
use std::time::Duration;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

use crate::bitbucket::{BasicCredentials, ServerLocator};
use crate::error::MonitorError;
use crate::logging::{LogFormat, LogRotation, LoggingOptions};
use crate::notify::SmtpSettings;
use crate::review::KeywordFilter;
use crate::schedule::DEFAULT_CHECKPOINT_PATH;

/// Legacy environment variable holding the Bitbucket app password.
pub const APP_PASSWORD_ENV: &str = "BITBUCKET_APP_PASSWORD";

const DEFAULT_BITBUCKET_PORT: u16 = 443;
const DEFAULT_STALE_AFTER_DAYS: i64 = 7;
const DEFAULT_INTERVAL_HOURS: u64 = 24;
const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 15;
const DEFAULT_SMTP_PORT: u16 = 587;
const SECONDS_PER_HOUR: u64 = 3_600;

/// Monitor configuration supporting CLI, environment, and file sources.
///
/// Every field can be set with `--field-name`, `STALEWATCH_FIELD_NAME`, or
/// `field_name = ...` in a configuration file. Boolean flags are not read
/// from the environment.
///
/// # Example
///
/// ```no_run
/// use ortho_config::OrthoConfig;
/// use stalewatch::StalewatchConfig;
///
/// let config = StalewatchConfig::load().expect("failed to load configuration");
/// config.validate().expect("configuration should be complete");
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, OrthoConfig)]
#[serde(default)]
#[ortho_config(
    prefix = "STALEWATCH",
    discovery(
        dotfile_name = ".stalewatch.toml",
        config_file_name = "stalewatch.toml",
        app_name = "stalewatch"
    )
)]
pub struct StalewatchConfig {
    /// Full Bitbucket Server base URL; overrides domain and port.
    #[ortho_config()]
    pub bitbucket_url: Option<String>,

    /// Bitbucket Server host name.
    #[ortho_config(cli_short = 'd')]
    pub bitbucket_domain: Option<String>,

    /// Bitbucket Server HTTPS port.
    #[ortho_config()]
    pub bitbucket_port: u16,

    /// Project key owning the monitored repositories.
    #[ortho_config(cli_short = 'p')]
    pub project: Option<String>,

    /// User for HTTP basic authentication.
    #[ortho_config(cli_short = 'u')]
    pub user: Option<String>,

    /// App password for HTTP basic authentication.
    ///
    /// Falls back to `BITBUCKET_APP_PASSWORD` when unset.
    #[ortho_config()]
    pub app_password: Option<String>,

    /// Repository slugs to monitor. Entries may be comma-separated.
    #[ortho_config(cli_short = 'r')]
    pub repositories: Vec<String>,

    /// Title keywords that exclude a pull request (case-insensitive,
    /// matched verbatim).
    #[ortho_config()]
    pub ignore_keywords: Vec<String>,

    /// Days without activity after which a pull request is stale.
    #[ortho_config()]
    pub stale_after_days: i64,

    /// Hours between notifications, and between loop iterations.
    #[ortho_config()]
    pub interval_hours: u64,

    /// Timeout for each HTTP request, in seconds.
    #[ortho_config()]
    pub request_timeout_seconds: u64,

    /// Location of the JSON checkpoint file.
    #[ortho_config()]
    pub checkpoint_path: String,

    /// `SQLite` database path; when set the checkpoint is kept there instead
    /// of in the JSON file.
    #[ortho_config()]
    pub database_url: Option<String>,

    /// Applies pending database migrations and exits.
    #[ortho_config()]
    pub migrate_db: bool,

    /// Runs a single iteration and exits.
    #[ortho_config()]
    pub once: bool,

    /// SMTP host; email is disabled when unset.
    #[ortho_config()]
    pub smtp_host: Option<String>,

    /// SMTP port (465 implicit TLS, 587 STARTTLS, otherwise plaintext).
    #[ortho_config()]
    pub smtp_port: u16,

    /// SMTP login user.
    #[ortho_config()]
    pub smtp_user: Option<String>,

    /// SMTP login password.
    #[ortho_config()]
    pub smtp_password: Option<String>,

    /// Sender address.
    #[ortho_config()]
    pub smtp_from: Option<String>,

    /// Recipient addresses. Entries may be comma-separated.
    #[ortho_config()]
    pub smtp_to: Vec<String>,

    /// Custom minijinja template for the email body.
    #[ortho_config()]
    pub email_template_path: Option<String>,

    /// Teams incoming webhook URL; Teams is disabled when unset.
    #[ortho_config()]
    pub teams_webhook_url: Option<String>,

    /// Log level or `EnvFilter` directive, used when `RUST_LOG` is unset.
    #[ortho_config()]
    pub log_level: String,

    /// Log line format: `text` or `json`.
    #[ortho_config()]
    pub log_format: String,

    /// Also append logs to this file.
    #[ortho_config()]
    pub log_file: Option<String>,

    /// Rotate the log file once it grows past this many megabytes; 0 never
    /// rotates.
    #[ortho_config()]
    pub log_max_size_mb: u64,

    /// Rotated log files to keep; 0 keeps all.
    #[ortho_config()]
    pub log_max_backups: usize,

    /// Days to keep rotated log files; 0 keeps them regardless of age.
    #[ortho_config()]
    pub log_max_age_days: u64,

    /// Gzip rotated log files.
    #[ortho_config()]
    pub log_compress: bool,

    /// Also write logs to stdout.
    #[ortho_config()]
    pub log_stdout: bool,
}

impl Default for StalewatchConfig {
    fn default() -> Self {
        Self {
            bitbucket_url: None,
            bitbucket_domain: None,
            bitbucket_port: DEFAULT_BITBUCKET_PORT,
            project: None,
            user: None,
            app_password: None,
            repositories: Vec::new(),
            ignore_keywords: Vec::new(),
            stale_after_days: DEFAULT_STALE_AFTER_DAYS,
            interval_hours: DEFAULT_INTERVAL_HOURS,
            request_timeout_seconds: DEFAULT_REQUEST_TIMEOUT_SECONDS,
            checkpoint_path: DEFAULT_CHECKPOINT_PATH.to_owned(),
            database_url: None,
            migrate_db: false,
            once: false,
            smtp_host: None,
            smtp_port: DEFAULT_SMTP_PORT,
            smtp_user: None,
            smtp_password: None,
            smtp_from: None,
            smtp_to: Vec::new(),
            email_template_path: None,
            teams_webhook_url: None,
            log_level: "info".to_owned(),
            log_format: "text".to_owned(),
            log_file: None,
            log_max_size_mb: LogRotation::default().max_size_mb,
            log_max_backups: 0,
            log_max_age_days: 0,
            log_compress: false,
            log_stdout: false,
        }
    }
}

impl StalewatchConfig {
    /// Checks that the monitor can run with this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Configuration`] naming the first missing or
    /// invalid setting.
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.repository_list().is_empty() {
            return Err(configuration(
                "at least one repository is required (use --repositories or -r)",
            ));
        }
        if non_blank(self.project.as_deref()).is_none() {
            return Err(configuration("project key is required (use --project or -p)"));
        }
        if non_blank(self.bitbucket_url.as_deref()).is_none()
            && non_blank(self.bitbucket_domain.as_deref()).is_none()
        {
            return Err(configuration(
                "a Bitbucket server is required (use --bitbucket-url or --bitbucket-domain)",
            ));
        }
        if self.interval_hours == 0 {
            return Err(configuration("interval_hours must be greater than zero"));
        }
        if self.request_timeout_seconds == 0 {
            return Err(configuration(
                "request_timeout_seconds must be greater than zero",
            ));
        }
        if self.stale_after_days < 0 {
            return Err(configuration("stale_after_days must not be negative"));
        }
        if non_blank(self.user.as_deref()).is_none() {
            return Err(configuration("Bitbucket user is required (use --user or -u)"));
        }
        if self.resolve_app_password().is_none() {
            return Err(configuration(
                "Bitbucket app password is required (use --app-password or BITBUCKET_APP_PASSWORD)",
            ));
        }
        self.log_format.parse::<LogFormat>().map(drop)
    }

    /// Resolves the app password from configuration or the legacy
    /// `BITBUCKET_APP_PASSWORD` environment variable.
    #[must_use]
    pub fn resolve_app_password(&self) -> Option<String> {
        non_blank(self.app_password.as_deref())
            .map(str::to_owned)
            .or_else(|| {
                env::var(APP_PASSWORD_ENV)
                    .ok()
                    .filter(|value| !value.trim().is_empty())
            })
    }

    /// Repository slugs with comma-separated entries split and blanks
    /// removed.
    #[must_use]
    pub fn repository_list(&self) -> Vec<String> {
        split_list(&self.repositories)
    }

    /// Email recipients with comma-separated entries split and blanks
    /// removed.
    #[must_use]
    pub fn recipient_list(&self) -> Vec<String> {
        split_list(&self.smtp_to)
    }

    /// Keyword filter built from `ignore_keywords`.
    ///
    /// Keywords are taken verbatim, since a comma or surrounding space can be
    /// part of a keyword. Blank entries are dropped.
    #[must_use]
    pub fn keyword_filter(&self) -> KeywordFilter {
        KeywordFilter::new(
            self.ignore_keywords
                .iter()
                .filter(|keyword| !keyword.trim().is_empty()),
        )
    }

    /// Bitbucket server location.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Bitbucket`] when the URL, domain, or project
    /// is invalid.
    pub fn server_locator(&self) -> Result<ServerLocator, MonitorError> {
        let project = self.project.as_deref().unwrap_or_default();
        let locator = match non_blank(self.bitbucket_url.as_deref()) {
            Some(url) => ServerLocator::new(url, project)?,
            None => ServerLocator::from_domain(
                self.bitbucket_domain.as_deref().unwrap_or_default(),
                self.bitbucket_port,
                project,
            )?,
        };
        Ok(locator)
    }

    /// Basic-auth credentials for Bitbucket.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Bitbucket`] when the user or password is
    /// missing.
    pub fn credentials(&self) -> Result<BasicCredentials, MonitorError> {
        let password = self.resolve_app_password().unwrap_or_default();
        Ok(BasicCredentials::new(
            self.user.as_deref().unwrap_or_default(),
            password,
        )?)
    }

    /// Wait between loop iterations.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Configuration`] when the interval overflows.
    pub fn interval(&self) -> Result<Duration, MonitorError> {
        self.interval_hours
            .checked_mul(SECONDS_PER_HOUR)
            .map(Duration::from_secs)
            .ok_or_else(|| configuration("interval_hours is too large"))
    }

    /// Timeout applied to each HTTP request.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// SMTP settings, or `None` when email is not configured.
    ///
    /// Email needs a host, a sender, and at least one recipient.
    #[must_use]
    pub fn smtp_settings(&self) -> Option<SmtpSettings> {
        let host = non_blank(self.smtp_host.as_deref())?;
        let from = non_blank(self.smtp_from.as_deref())?;
        let to = self.recipient_list();
        if to.is_empty() {
            return None;
        }
        Some(SmtpSettings {
            host: host.to_owned(),
            port: self.smtp_port,
            user: self.smtp_user.clone(),
            password: self.smtp_password.clone(),
            from: from.to_owned(),
            to,
        })
    }

    /// Teams webhook URL, or `None` when Teams is not configured.
    #[must_use]
    pub fn teams_webhook(&self) -> Option<&str> {
        non_blank(self.teams_webhook_url.as_deref())
    }

    /// Custom email template location, if any.
    #[must_use]
    pub fn email_template(&self) -> Option<Utf8PathBuf> {
        non_blank(self.email_template_path.as_deref()).map(Utf8PathBuf::from)
    }

    /// Logging options derived from the `log_*` fields.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Configuration`] when `log_format` is unknown.
    pub fn logging_options(&self) -> Result<LoggingOptions, MonitorError> {
        Ok(LoggingOptions {
            level: self.log_level.clone(),
            format: self.log_format.parse()?,
            stdout: self.log_stdout,
            file: non_blank(self.log_file.as_deref()).map(Utf8PathBuf::from),
            rotation: LogRotation {
                max_size_mb: self.log_max_size_mb,
                max_backups: self.log_max_backups,
                max_age_days: self.log_max_age_days,
                compress: self.log_compress,
            },
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn split_list(entries: &[String]) -> Vec<String> {
    entries
        .iter()
        .flat_map(|entry| entry.split(','))
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_owned)
        .collect()
}

fn configuration(message: &str) -> MonitorError {
    MonitorError::Configuration {
        message: message.to_owned(),
    }
}

#[cfg(test)]
mod tests;
