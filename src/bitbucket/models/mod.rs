//! Data models for pull requests, participants, and activity records.
//!
//! Types prefixed with `Api` are internal deserialisation targets shaped like
//! the Bitbucket Server REST payloads. They convert into the public domain
//! types consumed by the review pipeline.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Deserialize;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Millisecond Unix timestamp as reported by Bitbucket.
///
/// Zero means the server did not supply a value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(transparent)]
pub struct EpochMillis(i64);

impl EpochMillis {
    /// The "no value" timestamp.
    pub const ABSENT: Self = Self(0);

    /// Wraps a raw millisecond value.
    #[must_use]
    pub const fn new(millis: i64) -> Self {
        Self(millis)
    }

    /// Converts a UTC instant into milliseconds since the epoch.
    #[must_use]
    pub fn from_datetime(instant: DateTime<Utc>) -> Self {
        Self(instant.timestamp_millis())
    }

    /// Raw millisecond value.
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }

    /// Returns `true` when the server supplied no timestamp.
    #[must_use]
    pub const fn is_absent(self) -> bool {
        self.0 == 0
    }

    /// Converts to a UTC instant, or `None` when absent or out of range.
    #[must_use]
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        if self.is_absent() {
            return None;
        }
        DateTime::from_timestamp_millis(self.0)
    }
}

/// Pull request identifier, unique only within a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(transparent)]
pub struct PullRequestId(u64);

impl PullRequestId {
    /// Wraps a raw identifier.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw identifier value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PullRequestId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Repository-qualified pull request identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PullRequestKey {
    repository: String,
    id: PullRequestId,
}

impl PullRequestKey {
    /// Creates a key for pull request `id` in `repository`.
    #[must_use]
    pub fn new(repository: impl Into<String>, id: PullRequestId) -> Self {
        Self {
            repository: repository.into(),
            id,
        }
    }

    /// Repository slug.
    #[must_use]
    pub const fn repository(&self) -> &str {
        self.repository.as_str()
    }

    /// Pull request identifier.
    #[must_use]
    pub const fn id(&self) -> PullRequestId {
        self.id
    }
}

impl fmt::Display for PullRequestKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}#{}", self.repository, self.id)
    }
}

/// A Bitbucket user as it appears on pull requests and activities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct User {
    /// Login name (Bitbucket `name`).
    pub username: String,
    /// Human-readable display name.
    pub display_name: String,
}

/// Role a participant plays on a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParticipantRole {
    /// Assigned reviewer whose approval counts towards sign-off.
    Reviewer,
    /// Author of the pull request.
    Author,
    /// Anyone else who has interacted with the pull request.
    Participant,
    /// A role this client does not recognise.
    Other(String),
}

impl ParticipantRole {
    /// Parses the upper-case role string used by the REST API.
    #[must_use]
    pub fn from_api(role: &str) -> Self {
        match role.trim().to_ascii_uppercase().as_str() {
            "REVIEWER" => Self::Reviewer,
            "AUTHOR" => Self::Author,
            "PARTICIPANT" => Self::Participant,
            _ => Self::Other(role.to_owned()),
        }
    }
}

/// A user's involvement in a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    /// Participating user.
    pub user: User,
    /// Role on the pull request.
    pub role: ParticipantRole,
    /// Whether this participant has approved.
    pub approved: bool,
    /// Review status (`APPROVED`, `UNAPPROVED`, `NEEDS_WORK`) when reported.
    pub status: Option<String>,
}

impl Participant {
    /// Returns `true` for participants with the reviewer role.
    #[must_use]
    pub const fn is_reviewer(&self) -> bool {
        matches!(self.role, ParticipantRole::Reviewer)
    }
}

/// Snapshot of an open pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    /// Identifier within the repository.
    pub id: PullRequestId,
    /// Title.
    pub title: String,
    /// Description, if any.
    pub description: Option<String>,
    /// Lifecycle state such as `OPEN`.
    pub state: Option<String>,
    /// Whether the pull request is open.
    pub open: bool,
    /// Whether the pull request is closed.
    pub closed: bool,
    /// Creation time.
    pub created_at: EpochMillis,
    /// Last update time.
    pub updated_at: EpochMillis,
    /// Author.
    pub author: User,
    /// Reviewers followed by other participants, as embedded in the listing.
    pub participants: Vec<Participant>,
    /// Web link for people to follow.
    pub link: Option<String>,
}

/// A timestamped activity record on a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    /// Activity identifier.
    pub id: u64,
    /// Comment text, when the activity carries one.
    pub content: Option<String>,
    /// Creation time.
    pub created_at: EpochMillis,
    /// Last edit time.
    pub updated_at: EpochMillis,
    /// Acting user.
    pub user: Option<User>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ApiUser {
    #[serde(default)]
    pub(super) name: Option<String>,
    #[serde(default)]
    pub(super) display_name: Option<String>,
}

impl From<ApiUser> for User {
    fn from(api: ApiUser) -> Self {
        Self {
            username: api.name.unwrap_or_default(),
            display_name: api.display_name.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ApiParticipant {
    #[serde(default)]
    pub(super) user: ApiUser,
    #[serde(default)]
    pub(super) role: Option<String>,
    #[serde(default)]
    pub(super) approved: bool,
    #[serde(default)]
    pub(super) status: Option<String>,
}

impl From<ApiParticipant> for Participant {
    fn from(api: ApiParticipant) -> Self {
        Self {
            user: api.user.into(),
            role: ParticipantRole::from_api(api.role.as_deref().unwrap_or_default()),
            approved: api.approved,
            status: api.status,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(super) struct ApiLink {
    pub(super) href: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(super) struct ApiLinks {
    #[serde(default, rename = "self")]
    pub(super) self_links: Vec<ApiLink>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ApiPullRequest {
    pub(super) id: PullRequestId,
    #[serde(default)]
    pub(super) title: Option<String>,
    #[serde(default)]
    pub(super) description: Option<String>,
    #[serde(default)]
    pub(super) state: Option<String>,
    #[serde(default)]
    pub(super) open: bool,
    #[serde(default)]
    pub(super) closed: bool,
    #[serde(default)]
    pub(super) created_date: EpochMillis,
    #[serde(default)]
    pub(super) updated_date: EpochMillis,
    #[serde(default)]
    pub(super) author: Option<ApiParticipant>,
    #[serde(default)]
    pub(super) reviewers: Vec<ApiParticipant>,
    #[serde(default)]
    pub(super) participants: Vec<ApiParticipant>,
    #[serde(default)]
    pub(super) links: ApiLinks,
}

impl From<ApiPullRequest> for PullRequest {
    fn from(api: ApiPullRequest) -> Self {
        let link = api
            .links
            .self_links
            .into_iter()
            .find_map(|link| link.href.filter(|href| !href.is_empty()));
        let participants = api
            .reviewers
            .into_iter()
            .chain(api.participants)
            .map(Participant::from)
            .collect();

        Self {
            id: api.id,
            title: api.title.unwrap_or_default(),
            description: api.description,
            state: api.state,
            open: api.open,
            closed: api.closed,
            created_at: api.created_date,
            updated_at: api.updated_date,
            author: api.author.map(|author| author.user.into()).unwrap_or_default(),
            participants,
            link,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ApiActivityComment {
    #[serde(default)]
    pub(super) text: Option<String>,
    #[serde(default)]
    pub(super) author: Option<ApiUser>,
    #[serde(default)]
    pub(super) created_date: EpochMillis,
    #[serde(default)]
    pub(super) updated_date: EpochMillis,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ApiActivity {
    pub(super) id: u64,
    #[serde(default)]
    pub(super) created_date: EpochMillis,
    #[serde(default)]
    pub(super) updated_date: EpochMillis,
    #[serde(default)]
    pub(super) user: Option<ApiUser>,
    #[serde(default)]
    pub(super) comment: Option<ApiActivityComment>,
}

impl From<ApiActivity> for Comment {
    fn from(api: ApiActivity) -> Self {
        let nested_updated = api
            .comment
            .as_ref()
            .map_or(EpochMillis::ABSENT, |comment| comment.updated_date);
        let updated_at = if api.updated_date.is_absent() {
            nested_updated
        } else {
            api.updated_date
        };
        let created_at = if api.created_date.is_absent() {
            api.comment
                .as_ref()
                .map_or(EpochMillis::ABSENT, |comment| comment.created_date)
        } else {
            api.created_date
        };
        let (content, comment_author) = api
            .comment
            .map_or((None, None), |comment| (comment.text, comment.author));

        Self {
            id: api.id,
            content,
            created_at,
            updated_at,
            user: api.user.or(comment_author).map(User::from),
        }
    }
}
