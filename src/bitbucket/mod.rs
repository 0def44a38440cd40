//! Bitbucket Server integration.
//!
//! This module exposes the pull request data model, the
//! [`PullRequestSource`] gateway trait consumed by the review pipeline, and
//! the reqwest-backed [`BitbucketGateway`] used in production.

pub mod error;
pub mod gateway;
pub mod locator;
pub mod models;
pub mod pagination;

pub use error::BitbucketError;
pub use gateway::{BitbucketGateway, PullRequestSource};
pub use locator::{BasicCredentials, ServerLocator};
pub use models::{
    Comment, EpochMillis, Participant, ParticipantRole, PullRequest, PullRequestId,
    PullRequestKey, User,
};
