//! Gateways for loading pull request data from Bitbucket Server.
//!
//! The review pipeline depends only on the [`PullRequestSource`] trait so it
//! can be exercised against mocks; [`BitbucketGateway`] is the HTTP
//! implementation used by the binary.

mod client;
mod error_mapping;

pub use client::BitbucketGateway;

use async_trait::async_trait;

use crate::bitbucket::error::BitbucketError;
use crate::bitbucket::models::{Comment, Participant, PullRequest, PullRequestId};

/// Source of open pull requests and their review state.
///
/// Every listing is returned fully paginated.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PullRequestSource: Send + Sync {
    /// List the open pull requests of `repository`.
    async fn open_pull_requests(&self, repository: &str)
    -> Result<Vec<PullRequest>, BitbucketError>;

    /// List the participants of pull request `id` in `repository`.
    async fn participants(
        &self,
        repository: &str,
        id: PullRequestId,
    ) -> Result<Vec<Participant>, BitbucketError>;

    /// List the activity records of pull request `id` in `repository`.
    async fn comments(
        &self,
        repository: &str,
        id: PullRequestId,
    ) -> Result<Vec<Comment>, BitbucketError>;
}
