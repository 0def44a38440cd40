//! Test helpers for constructing pull request, participant, and comment
//! fixtures.
//!
//! # Examples
//!
//! ```
//! use stalewatch::bitbucket::models::test_support::{pull_request, reviewer};
//!
//! let pr = pull_request(7, "Add caching")
//!     .with_updated_at(1_700_000_000_000)
//!     .build();
//! assert_eq!(pr.id.value(), 7);
//!
//! let bob = reviewer("bob", true);
//! assert!(bob.approved);
//! ```

use super::{
    Comment, EpochMillis, Participant, ParticipantRole, PullRequest, PullRequestId, User,
};

/// Builds a user whose display name is the capitalised login.
#[must_use]
pub fn user(username: &str) -> User {
    let mut chars = username.chars();
    let display_name = chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    });
    User {
        username: username.to_owned(),
        display_name,
    }
}

/// Builds a participant with the reviewer role.
#[must_use]
pub fn reviewer(username: &str, approved: bool) -> Participant {
    participant(username, ParticipantRole::Reviewer, approved)
}

/// Builds a participant with an explicit role.
#[must_use]
pub fn participant(username: &str, role: ParticipantRole, approved: bool) -> Participant {
    Participant {
        user: user(username),
        role,
        approved,
        status: Some(if approved { "APPROVED" } else { "UNAPPROVED" }.to_owned()),
    }
}

/// Builds a comment whose only meaningful field is its update time.
#[must_use]
pub fn comment_updated_at(id: u64, updated_at_millis: i64) -> Comment {
    Comment {
        id,
        content: Some(format!("Comment {id}")),
        created_at: EpochMillis::new(updated_at_millis),
        updated_at: EpochMillis::new(updated_at_millis),
        user: Some(user("commenter")),
    }
}

/// Starts a pull request builder with the given id and title.
#[must_use]
pub fn pull_request(id: u64, title: &str) -> PullRequestBuilder {
    PullRequestBuilder {
        pull_request: PullRequest {
            id: PullRequestId::new(id),
            title: title.to_owned(),
            description: None,
            state: Some("OPEN".to_owned()),
            open: true,
            closed: false,
            created_at: EpochMillis::ABSENT,
            updated_at: EpochMillis::ABSENT,
            author: user("author"),
            participants: Vec::new(),
            link: Some(format!("https://bitbucket.example.com/pull-requests/{id}")),
        },
    }
}

/// Fluent builder for [`PullRequest`] fixtures.
#[derive(Debug, Clone)]
pub struct PullRequestBuilder {
    pull_request: PullRequest,
}

impl PullRequestBuilder {
    /// Sets the creation time in epoch milliseconds.
    #[must_use]
    pub fn with_created_at(mut self, millis: i64) -> Self {
        self.pull_request.created_at = EpochMillis::new(millis);
        self
    }

    /// Sets the last update time in epoch milliseconds.
    #[must_use]
    pub fn with_updated_at(mut self, millis: i64) -> Self {
        self.pull_request.updated_at = EpochMillis::new(millis);
        self
    }

    /// Sets the author login.
    #[must_use]
    pub fn with_author(mut self, username: &str) -> Self {
        self.pull_request.author = user(username);
        self
    }

    /// Appends an embedded participant.
    #[must_use]
    pub fn with_participant(mut self, participant: Participant) -> Self {
        self.pull_request.participants.push(participant);
        self
    }

    /// Finishes the builder.
    #[must_use]
    pub fn build(self) -> PullRequest {
        self.pull_request
    }
}
