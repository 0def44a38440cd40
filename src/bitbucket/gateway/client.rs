//! Reqwest-backed Bitbucket Server gateway.

use std::time::Duration;

use async_trait::async_trait;
use http::header::ACCEPT;
use reqwest::Client;
use serde::de::DeserializeOwned;
use url::Url;

use crate::bitbucket::error::BitbucketError;
use crate::bitbucket::locator::{BasicCredentials, ServerLocator};
use crate::bitbucket::models::{
    ApiActivity, ApiParticipant, ApiPullRequest, Comment, Participant, PullRequest, PullRequestId,
};
use crate::bitbucket::pagination::{ApiPage, PageCursor};

use super::PullRequestSource;
use super::error_mapping::{map_decode_error, map_http_error, map_transport_error};

/// HTTP gateway for the Bitbucket Server REST API (version 1.0).
#[derive(Debug, Clone)]
pub struct BitbucketGateway {
    client: Client,
    locator: ServerLocator,
    credentials: BasicCredentials,
}

impl BitbucketGateway {
    /// Creates a gateway whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`BitbucketError::Network`] when the HTTP client cannot be
    /// configured (for example when no TLS backend is available).
    pub fn new(
        locator: ServerLocator,
        credentials: BasicCredentials,
        timeout: Duration,
    ) -> Result<Self, BitbucketError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| BitbucketError::Network {
                message: format!("failed to configure Bitbucket HTTP client: {error}"),
            })?;
        Ok(Self {
            client,
            locator,
            credentials,
        })
    }

    /// Server location this gateway talks to.
    #[must_use]
    pub const fn locator(&self) -> &ServerLocator {
        &self.locator
    }

    /// Verifies connectivity and credentials by listing one repository of the
    /// configured project.
    ///
    /// # Errors
    ///
    /// Returns [`BitbucketError::Authentication`] when the credentials are
    /// rejected, [`BitbucketError::Network`] when the server is unreachable,
    /// and [`BitbucketError::Api`] for other unexpected statuses.
    pub async fn probe(&self) -> Result<(), BitbucketError> {
        let url = self.locator.probe_url()?;
        self.fetch_body("probe connection", url).await.map(drop)
    }

    async fn fetch_body(&self, operation: &str, url: Url) -> Result<String, BitbucketError> {
        let response = self
            .client
            .get(url)
            .basic_auth(self.credentials.user(), Some(self.credentials.password()))
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|error| map_transport_error(operation, &error))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| map_transport_error(operation, &error))?;

        if !status.is_success() {
            return Err(map_http_error(operation, status, &body));
        }
        Ok(body)
    }

    async fn fetch_page<T: DeserializeOwned>(
        &self,
        operation: &str,
        url: Url,
    ) -> Result<ApiPage<T>, BitbucketError> {
        let body = self.fetch_body(operation, url).await?;
        serde_json::from_str(&body).map_err(|error| map_decode_error(operation, &error))
    }

    /// Follows every page of a listing and concatenates the values.
    async fn fetch_all<T: DeserializeOwned>(
        &self,
        operation: &str,
        first: Url,
    ) -> Result<Vec<T>, BitbucketError> {
        let mut cursor = PageCursor::new(first.clone());
        let mut next_url = Some(first);
        let mut values = Vec::new();

        while let Some(url) = next_url {
            let page: ApiPage<T> = self.fetch_page(operation, url).await?;
            let next = page.next_page();
            values.extend(page.values);
            next_url = cursor.advance(&self.locator, next)?;
        }

        Ok(values)
    }
}

#[async_trait]
impl PullRequestSource for BitbucketGateway {
    async fn open_pull_requests(
        &self,
        repository: &str,
    ) -> Result<Vec<PullRequest>, BitbucketError> {
        let url = self.locator.open_pull_requests_url(repository)?;
        let pulls: Vec<ApiPullRequest> = self.fetch_all("list pull requests", url).await?;
        Ok(pulls.into_iter().map(PullRequest::from).collect())
    }

    async fn participants(
        &self,
        repository: &str,
        id: PullRequestId,
    ) -> Result<Vec<Participant>, BitbucketError> {
        let url = self.locator.participants_url(repository, id)?;
        let participants: Vec<ApiParticipant> = self.fetch_all("list participants", url).await?;
        Ok(participants.into_iter().map(Participant::from).collect())
    }

    async fn comments(
        &self,
        repository: &str,
        id: PullRequestId,
    ) -> Result<Vec<Comment>, BitbucketError> {
        let url = self.locator.activities_url(repository, id)?;
        let activities: Vec<ApiActivity> = self.fetch_all("list activities", url).await?;
        Ok(activities.into_iter().map(Comment::from).collect())
    }
}
