//! Title keyword filtering.
//!
//! Pull requests whose title contains any configured keyword (compared
//! case-insensitively) are excluded before any further network calls.

use crate::bitbucket::models::PullRequest;

/// Returns `true` when `title` contains any of `keywords`, ignoring case.
///
/// An empty keyword list excludes nothing, and empty keywords are ignored.
///
/// # Examples
///
/// ```
/// use stalewatch::review::keyword::is_excluded;
///
/// assert!(is_excluded("[WIP] Add caching", &["wip"]));
/// assert!(!is_excluded("Add caching", &["wip", "draft"]));
/// ```
#[must_use]
pub fn is_excluded<S: AsRef<str>>(title: &str, keywords: &[S]) -> bool {
    let lowered = title.to_lowercase();
    keywords
        .iter()
        .map(|keyword| keyword.as_ref().to_lowercase())
        .any(|keyword| !keyword.is_empty() && lowered.contains(&keyword))
}

/// Keyword list lowercased once and reused across a cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordFilter {
    keywords: Vec<String>,
}

impl KeywordFilter {
    /// Builds a filter, dropping empty keywords.
    ///
    /// Keywords are matched exactly as given after lowercasing, surrounding
    /// whitespace included.
    #[must_use]
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let lowered = keywords
            .into_iter()
            .map(|keyword| keyword.as_ref().to_lowercase())
            .filter(|keyword| !keyword.is_empty())
            .collect();
        Self { keywords: lowered }
    }

    /// Lowercased keywords in configuration order.
    #[must_use]
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Returns `true` when `title` matches any keyword.
    #[must_use]
    pub fn excludes(&self, title: &str) -> bool {
        if self.keywords.is_empty() {
            return false;
        }
        let lowered = title.to_lowercase();
        self.keywords
            .iter()
            .any(|keyword| lowered.contains(keyword.as_str()))
    }

    /// Keeps the pull requests whose titles match no keyword, preserving
    /// order.
    #[must_use]
    pub fn retain_eligible(&self, mut pull_requests: Vec<PullRequest>) -> Vec<PullRequest> {
        pull_requests.retain(|pr| !self.excludes(&pr.title));
        pull_requests
    }
}
