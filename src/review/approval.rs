//! Reviewer approval evaluation.

use serde::Serialize;

use crate::bitbucket::models::Participant;

/// Approved and total reviewer counts for display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApprovalCount {
    /// Reviewers who approved.
    pub approved: usize,
    /// All reviewers.
    pub total: usize,
}

/// Returns `true` when no reviewer is still withholding approval.
///
/// Non-reviewer participants are ignored, so a pull request without
/// reviewers counts as approved.
#[must_use]
pub fn is_approved(participants: &[Participant]) -> bool {
    !participants
        .iter()
        .any(|participant| participant.is_reviewer() && !participant.approved)
}

/// Counts reviewers and how many of them approved.
#[must_use]
pub fn approval_count(participants: &[Participant]) -> ApprovalCount {
    participants
        .iter()
        .filter(|participant| participant.is_reviewer())
        .fold(ApprovalCount::default(), |count, reviewer| ApprovalCount {
            approved: count.approved + usize::from(reviewer.approved),
            total: count.total + 1,
        })
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{ApprovalCount, approval_count, is_approved};
    use crate::bitbucket::models::ParticipantRole;
    use crate::bitbucket::models::test_support::{participant, reviewer};

    #[test]
    fn empty_participant_list_is_approved() {
        assert!(is_approved(&[]));
        assert_eq!(approval_count(&[]), ApprovalCount::default());
    }

    #[rstest]
    #[case::all_approved(vec![reviewer("a", true), reviewer("b", true)], true)]
    #[case::one_pending(vec![reviewer("a", true), reviewer("b", false)], false)]
    #[case::only_pending(vec![reviewer("a", false)], false)]
    #[case::non_reviewers_ignored(
        vec![
            reviewer("a", true),
            participant("author", ParticipantRole::Author, false),
            participant("watcher", ParticipantRole::Participant, false),
        ],
        true
    )]
    #[case::no_reviewers(
        vec![participant("author", ParticipantRole::Author, false)],
        true
    )]
    fn is_approved_checks_reviewers_only(
        #[case] participants: Vec<crate::bitbucket::models::Participant>,
        #[case] expected: bool,
    ) {
        assert_eq!(is_approved(&participants), expected);
    }

    #[test]
    fn approval_count_counts_reviewers_only() {
        let participants = vec![
            reviewer("a", true),
            reviewer("b", false),
            reviewer("c", true),
            participant("author", ParticipantRole::Author, true),
            participant("x", ParticipantRole::Other("WATCHER".to_owned()), true),
        ];

        let count = approval_count(&participants);

        assert_eq!(count, ApprovalCount { approved: 2, total: 3 });
        assert!(count.approved <= count.total);
    }
}
