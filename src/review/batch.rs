//! The result of one check cycle.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::bitbucket::models::{Participant, PullRequest, PullRequestKey};

use super::approval::{ApprovalCount, approval_count};

/// A pull request classified as stale, tagged with its repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StalePullRequest {
    /// Repository slug.
    pub repository: String,
    /// Pull request snapshot.
    pub pull_request: PullRequest,
    /// Resolved last activity.
    pub last_activity: DateTime<Utc>,
    /// Whole days since the last activity.
    pub inactive_days: i64,
}

impl StalePullRequest {
    /// Repository-qualified key of this pull request.
    #[must_use]
    pub fn key(&self) -> PullRequestKey {
        PullRequestKey::new(self.repository.as_str(), self.pull_request.id)
    }
}

/// Stale pull requests found in one cycle, plus the participant lists
/// fetched along the way.
///
/// Participants are recorded for every pull request whose participants were
/// fetched, stale or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleBatch {
    stale_after_days: i64,
    stale: Vec<StalePullRequest>,
    participants: BTreeMap<PullRequestKey, Vec<Participant>>,
}

impl StaleBatch {
    /// Creates an empty batch for the given threshold.
    #[must_use]
    pub const fn new(stale_after_days: i64) -> Self {
        Self {
            stale_after_days,
            stale: Vec::new(),
            participants: BTreeMap::new(),
        }
    }

    /// Threshold used to classify this batch.
    #[must_use]
    pub const fn stale_after_days(&self) -> i64 {
        self.stale_after_days
    }

    /// Appends a stale pull request in discovery order.
    pub fn push_stale(&mut self, stale: StalePullRequest) {
        self.stale.push(stale);
    }

    /// Records the participant list of a pull request.
    pub fn record_participants(&mut self, key: PullRequestKey, participants: Vec<Participant>) {
        self.participants.insert(key, participants);
    }

    /// Every stale pull request in discovery order.
    #[must_use]
    pub fn stale(&self) -> &[StalePullRequest] {
        &self.stale
    }

    /// Number of stale pull requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stale.len()
    }

    /// Returns `true` when nothing is stale.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stale.is_empty()
    }

    /// Stale pull requests grouped by repository, sorted by repository name,
    /// each group in discovery order.
    #[must_use]
    pub fn by_repository(&self) -> BTreeMap<&str, Vec<&StalePullRequest>> {
        let mut grouped: BTreeMap<&str, Vec<&StalePullRequest>> = BTreeMap::new();
        for stale in &self.stale {
            grouped
                .entry(stale.repository.as_str())
                .or_default()
                .push(stale);
        }
        grouped
    }

    /// Participant lists keyed by pull request.
    #[must_use]
    pub const fn participants_by_key(&self) -> &BTreeMap<PullRequestKey, Vec<Participant>> {
        &self.participants
    }

    /// Participants recorded for `key`, if they were fetched.
    #[must_use]
    pub fn participants(&self, key: &PullRequestKey) -> Option<&[Participant]> {
        self.participants.get(key).map(Vec::as_slice)
    }

    /// Reviewer approval counts for `key`; zero when participants are
    /// unknown.
    #[must_use]
    pub fn approval_counts(&self, key: &PullRequestKey) -> ApprovalCount {
        self.participants(key)
            .map(approval_count)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{StaleBatch, StalePullRequest};
    use crate::bitbucket::models::test_support::{pull_request, reviewer};
    use crate::bitbucket::models::{PullRequestId, PullRequestKey};
    use crate::review::approval::ApprovalCount;

    fn stale(repository: &str, id: u64) -> StalePullRequest {
        StalePullRequest {
            repository: repository.to_owned(),
            pull_request: pull_request(id, &format!("PR {id}")).build(),
            last_activity: Utc
                .with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
                .single()
                .expect("valid date"),
            inactive_days: 10,
        }
    }

    #[test]
    fn by_repository_groups_in_discovery_order() {
        let mut batch = StaleBatch::new(7);
        batch.push_stale(stale("web", 3));
        batch.push_stale(stale("api", 9));
        batch.push_stale(stale("web", 1));

        let grouped = batch.by_repository();

        let repositories: Vec<&str> = grouped.keys().copied().collect();
        assert_eq!(repositories, vec!["api", "web"]);
        let web_ids: Vec<u64> = grouped
            .get("web")
            .expect("web group")
            .iter()
            .map(|entry| entry.pull_request.id.value())
            .collect();
        assert_eq!(web_ids, vec![3, 1]);
        assert_eq!(batch.len(), 3);
    }

    #[test]
    fn participants_are_keyed_by_repository_and_id() {
        let mut batch = StaleBatch::new(7);
        let api_key = PullRequestKey::new("api", PullRequestId::new(1));
        let web_key = PullRequestKey::new("web", PullRequestId::new(1));
        batch.record_participants(api_key.clone(), vec![reviewer("a", true)]);
        batch.record_participants(
            web_key.clone(),
            vec![reviewer("b", false), reviewer("c", true)],
        );

        assert_eq!(
            batch.approval_counts(&api_key),
            ApprovalCount { approved: 1, total: 1 }
        );
        assert_eq!(
            batch.approval_counts(&web_key),
            ApprovalCount { approved: 1, total: 2 }
        );
    }

    #[test]
    fn approval_counts_default_to_zero_for_unknown_keys() {
        let batch = StaleBatch::new(7);

        let key = PullRequestKey::new("api", PullRequestId::new(5));

        assert!(batch.is_empty());
        assert_eq!(batch.participants(&key), None);
        assert_eq!(batch.approval_counts(&key), ApprovalCount::default());
    }
}
