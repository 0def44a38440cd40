//! Microsoft Teams notifications through an incoming webhook.
//!
//! The batch is posted as a legacy `MessageCard`: a header section, one
//! section per repository with a fact per pull request, and a closing
//! summary section.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use url::Url;

use crate::review::batch::StaleBatch;

use super::summary::{NotificationSummary, PullRequestSummary};
use super::{Notifier, NotifyError};

const THEME_COLOR: &str = "FF0000";
const MAX_RESPONSE_CHARS: usize = 200;

/// Posts stale batches to a Teams webhook.
#[derive(Debug, Clone)]
pub struct TeamsNotifier {
    client: Client,
    webhook: Url,
}

impl TeamsNotifier {
    /// Creates a notifier for `webhook_url` whose requests time out after
    /// `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Configuration`] when the URL is not an absolute
    /// http(s) URL or the HTTP client cannot be built.
    pub fn new(webhook_url: &str, timeout: Duration) -> Result<Self, NotifyError> {
        let webhook = Url::parse(webhook_url.trim()).map_err(|error| NotifyError::Configuration {
            message: format!("invalid Teams webhook URL: {error}"),
        })?;
        if !matches!(webhook.scheme(), "http" | "https") {
            return Err(NotifyError::Configuration {
                message: format!("Teams webhook must use http or https, got '{}'", webhook.scheme()),
            });
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| NotifyError::Configuration {
                message: format!("failed to configure Teams HTTP client: {error}"),
            })?;
        Ok(Self { client, webhook })
    }

    /// Builds the card posted for `batch`.
    #[must_use]
    pub fn card(batch: &StaleBatch, generated_at: DateTime<Utc>) -> MessageCard {
        MessageCard::from_summary(&NotificationSummary::from_batch(batch, generated_at))
    }
}

#[async_trait]
impl Notifier for TeamsNotifier {
    fn channel(&self) -> &str {
        "teams"
    }

    async fn notify(&self, batch: &StaleBatch) -> Result<(), NotifyError> {
        if batch.is_empty() {
            return Ok(());
        }
        let card = Self::card(batch, Utc::now());

        let response = self
            .client
            .post(self.webhook.clone())
            .json(&card)
            .send()
            .await
            .map_err(|error| NotifyError::Delivery {
                message: format!("Teams webhook request failed: {error}"),
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        let detail: String = body.trim().chars().take(MAX_RESPONSE_CHARS).collect();
        Err(NotifyError::Rejected {
            message: format!("Teams webhook returned {status}: {detail}"),
        })
    }
}

/// A Teams `MessageCard` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageCard {
    #[serde(rename = "@type")]
    card_type: &'static str,
    #[serde(rename = "@context")]
    context: &'static str,
    theme_color: &'static str,
    summary: String,
    sections: Vec<CardSection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
struct CardSection {
    activity_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    activity_subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    facts: Vec<CardFact>,
    markdown: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct CardFact {
    name: String,
    value: String,
}

impl MessageCard {
    fn from_summary(summary: &NotificationSummary) -> Self {
        let header = CardSection {
            activity_title: "🚨 Stale Pull Requests Alert".to_owned(),
            activity_subtitle: Some(format!(
                "{} pull requests have been inactive for {} days or more",
                summary.total_prs, summary.stale_days
            )),
            text: Some("The following pull requests need attention:".to_owned()),
            facts: Vec::new(),
            markdown: true,
        };

        let repositories = summary.repositories.iter().map(|repository| CardSection {
            activity_title: format!("Repository: {}", repository.name),
            activity_subtitle: None,
            text: None,
            facts: repository.pull_requests.iter().map(pull_request_fact).collect(),
            markdown: true,
        });

        let totals = CardSection {
            activity_title: "📊 Summary".to_owned(),
            activity_subtitle: None,
            text: None,
            facts: vec![
                CardFact {
                    name: "Total Stale PRs".to_owned(),
                    value: summary.total_prs.to_string(),
                },
                CardFact {
                    name: "Stale Threshold".to_owned(),
                    value: format!("{} days", summary.stale_days),
                },
            ],
            markdown: true,
        };

        let sections = std::iter::once(header)
            .chain(repositories)
            .chain(std::iter::once(totals))
            .collect();

        Self {
            card_type: "MessageCard",
            context: "http://schema.org/extensions",
            theme_color: THEME_COLOR,
            summary: format!("{} stale pull requests need attention", summary.total_prs),
            sections,
        }
    }
}

fn pull_request_fact(pr: &PullRequestSummary) -> CardFact {
    let title = if pr.link.is_empty() {
        pr.title.clone()
    } else {
        format!("[{}]({})", pr.title, pr.link)
    };
    CardFact {
        name: format!("PR #{}", pr.id),
        value: format!(
            "{title} by {} ({}/{} approvals)",
            pr.author_name, pr.approved, pr.reviewers
        ),
    }
}

#[cfg(test)]
#[path = "teams_tests.rs"]
mod tests;
