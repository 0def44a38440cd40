//! Email notifications over SMTP.
//!
//! The plain-text body is rendered with `minijinja`. The built-in template
//! can be replaced by a user file; it receives the fields of
//! [`NotificationSummary`]:
//!
//! - `total_prs`, `stale_days`, `generated_at`
//! - `repositories`, each with `name` and `pull_requests`
//! - per pull request: `id`, `title`, `author_name`, `author_username`,
//!   `link`, `created`, `updated`, `last_activity`, `inactive_days`,
//!   `approved`, `reviewers`
//!
//! Port 465 uses implicit TLS, port 587 uses STARTTLS, and any other port
//! talks plaintext SMTP (local relays such as `MailHog`).

use std::time::Duration;

use async_trait::async_trait;
use camino::Utf8Path;
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use chrono::{DateTime, Utc};
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use minijinja::{AutoEscape, Environment};

use crate::review::batch::StaleBatch;

use super::summary::NotificationSummary;
use super::{Notifier, NotifyError};

const TEMPLATE_NAME: &str = "email";
const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Built-in plain-text body template.
pub const DEFAULT_TEMPLATE: &str = "\
Stale Pull Requests Alert

The following {{ total_prs }} pull requests have been inactive for {{ stale_days }} days or more:
{% for repo in repositories %}
Repository: {{ repo.name }}
{% for pr in repo.pull_requests %}
- PR #{{ pr.id }}: {{ pr.title }}
  Author: {{ pr.author_name }} ({{ pr.author_username }})
  Link: {{ pr.link }}
  Created: {{ pr.created }}
  Updated: {{ pr.updated }}
  Approvals: {{ pr.approved }}/{{ pr.reviewers }} reviewers
{% endfor %}{% endfor %}
Total stale PRs: {{ total_prs }}

This is an automated notification from the stalewatch service.
";

/// How the SMTP connection is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode {
    /// TLS from the first byte (SMTPS).
    Implicit,
    /// Plaintext upgraded with `STARTTLS`.
    StartTls,
    /// No encryption.
    Plain,
}

impl TlsMode {
    /// Chooses the mode conventionally associated with `port`.
    #[must_use]
    pub const fn for_port(port: u16) -> Self {
        match port {
            465 => Self::Implicit,
            587 => Self::StartTls,
            _ => Self::Plain,
        }
    }
}

/// SMTP connection and addressing settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    /// Server host name.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Login user; authentication is used only with a password as well.
    pub user: Option<String>,
    /// Login password.
    pub password: Option<String>,
    /// Sender address.
    pub from: String,
    /// Recipient addresses.
    pub to: Vec<String>,
}

impl SmtpSettings {
    fn credentials(&self) -> Option<Credentials> {
        let user = self.user.as_deref().map(str::trim).filter(|user| !user.is_empty())?;
        let password = self
            .password
            .as_deref()
            .filter(|password| !password.is_empty())?;
        Some(Credentials::new(user.to_owned(), password.to_owned()))
    }
}

/// Sends stale batches as plain-text email.
pub struct EmailNotifier {
    from: Mailbox,
    to: Vec<Mailbox>,
    template: String,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl EmailNotifier {
    /// Validates the settings and template and prepares the SMTP transport.
    ///
    /// No connection is opened until the first delivery.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Configuration`] when the host is blank, an
    /// address cannot be parsed, no recipients are given, the template does
    /// not compile, or the TLS transport cannot be prepared.
    pub fn new(settings: &SmtpSettings, template: Option<String>) -> Result<Self, NotifyError> {
        let host = settings.host.trim();
        if host.is_empty() {
            return Err(configuration("SMTP host must not be blank"));
        }
        let from = parse_mailbox(&settings.from)?;
        let to = settings
            .to
            .iter()
            .map(|address| parse_mailbox(address))
            .collect::<Result<Vec<_>, _>>()?;
        if to.is_empty() {
            return Err(configuration("at least one email recipient is required"));
        }

        let template_source = template.unwrap_or_else(|| DEFAULT_TEMPLATE.to_owned());
        validate_template(&template_source)?;

        let builder = match TlsMode::for_port(settings.port) {
            TlsMode::Implicit => AsyncSmtpTransport::<Tokio1Executor>::relay(host),
            TlsMode::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host),
            TlsMode::Plain => Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)),
        }
        .map_err(|error| configuration(&format!("failed to prepare SMTP transport: {error}")))?
        .port(settings.port)
        .timeout(Some(SMTP_TIMEOUT));

        let transport = match settings.credentials() {
            Some(credentials) => builder.credentials(credentials).build(),
            None => builder.build(),
        };

        Ok(Self {
            from,
            to,
            template: template_source,
            transport,
        })
    }

    /// Subject line for a batch of `total` stale pull requests.
    #[must_use]
    pub fn subject(total: usize) -> String {
        format!("Stale Pull Requests Alert - {total} PRs need attention")
    }

    /// Renders the body for `summary`.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Render`] when the template fails at runtime.
    pub fn render_body(&self, summary: &NotificationSummary) -> Result<String, NotifyError> {
        render_template(&self.template, summary)
    }

    /// Builds the message for `batch` without sending it.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Render`] when the body cannot be rendered or
    /// the message cannot be assembled.
    pub fn compose(
        &self,
        batch: &StaleBatch,
        generated_at: DateTime<Utc>,
    ) -> Result<Message, NotifyError> {
        let summary = NotificationSummary::from_batch(batch, generated_at);
        let body = self.render_body(&summary)?;

        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(Self::subject(summary.total_prs))
            .header(ContentType::TEXT_PLAIN);
        for recipient in &self.to {
            builder = builder.to(recipient.clone());
        }
        builder.body(body).map_err(|error| NotifyError::Render {
            message: format!("failed to assemble email: {error}"),
        })
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    fn channel(&self) -> &str {
        "email"
    }

    async fn notify(&self, batch: &StaleBatch) -> Result<(), NotifyError> {
        if batch.is_empty() {
            return Ok(());
        }
        let message = self.compose(batch, Utc::now())?;
        self.transport
            .send(message)
            .await
            .map(drop)
            .map_err(|error| NotifyError::Delivery {
                message: format!("SMTP delivery failed: {error}"),
            })
    }
}

/// Reads a user template from `path`.
///
/// # Errors
///
/// Returns [`NotifyError::Configuration`] when the file cannot be read or the
/// template does not compile.
pub fn load_template(path: &Utf8Path) -> Result<String, NotifyError> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| configuration(&format!("email template path '{path}' has no file name")))?;

    let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(|error| {
        configuration(&format!(
            "failed to open email template directory '{parent}': {error}"
        ))
    })?;
    let source = dir.read_to_string(file_name).map_err(|error| {
        configuration(&format!("failed to read email template '{path}': {error}"))
    })?;
    validate_template(&source)?;
    Ok(source)
}

fn validate_template(source: &str) -> Result<(), NotifyError> {
    let mut env = Environment::new();
    env.add_template(TEMPLATE_NAME, source)
        .map_err(|error| configuration(&format!("invalid email template syntax: {error}")))
}

fn render_template(source: &str, summary: &NotificationSummary) -> Result<String, NotifyError> {
    let mut env = Environment::new();

    // Plain-text output; nothing to escape.
    env.set_auto_escape_callback(|_| AutoEscape::None);

    env.add_template(TEMPLATE_NAME, source)
        .map_err(|error| NotifyError::Render {
            message: format!("invalid email template syntax: {error}"),
        })?;
    let template = env
        .get_template(TEMPLATE_NAME)
        .map_err(|error| NotifyError::Render {
            message: format!("failed to retrieve email template: {error}"),
        })?;
    template.render(summary).map_err(|error| NotifyError::Render {
        message: format!("email template rendering failed: {error}"),
    })
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address
        .trim()
        .parse::<Mailbox>()
        .map_err(|error| configuration(&format!("invalid email address '{address}': {error}")))
}

fn configuration(message: &str) -> NotifyError {
    NotifyError::Configuration {
        message: message.to_owned(),
    }
}

#[cfg(test)]
#[path = "email_tests.rs"]
mod tests;
