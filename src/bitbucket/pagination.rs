//! Paged response envelopes and cursor tracking for Bitbucket listings.
//!
//! Bitbucket Server wraps list endpoints in an envelope carrying `values`,
//! `isLastPage`, and `nextPageStart`. Some proxies and newer servers also
//! include a `next` link. [`PageCursor`] turns those hints into the URL of the
//! following page and refuses to loop forever on servers that never finish.

use std::collections::HashSet;

use serde::Deserialize;
use url::Url;

use super::error::BitbucketError;
use super::locator::ServerLocator;

/// Upper bound on pages fetched for a single listing.
pub const MAX_PAGES: usize = 1000;

const START_PARAM: &str = "start";

/// One page of a Bitbucket listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ApiPage<T> {
    #[serde(default = "Vec::new")]
    pub(super) values: Vec<T>,
    #[serde(default)]
    pub(super) is_last_page: Option<bool>,
    #[serde(default)]
    pub(super) next_page_start: Option<u64>,
    #[serde(default)]
    pub(super) next: Option<String>,
}

/// Where the following page lives, as advertised by a page envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextPage {
    /// Follow an explicit link.
    Link(String),
    /// Reissue the first request with `start=<offset>`.
    Start(u64),
    /// The listing is complete.
    Done,
}

impl<T> ApiPage<T> {
    pub(super) fn next_page(&self) -> NextPage {
        if let Some(link) = self.next.as_deref().map(str::trim)
            && !link.is_empty()
        {
            return NextPage::Link(link.to_owned());
        }
        match (self.is_last_page, self.next_page_start) {
            (Some(false), Some(start)) => NextPage::Start(start),
            _ => NextPage::Done,
        }
    }
}

/// Tracks visited pages of a single listing.
#[derive(Debug)]
pub struct PageCursor {
    first: Url,
    visited: HashSet<String>,
}

impl PageCursor {
    /// Starts a cursor at `first`, counting it as visited.
    #[must_use]
    pub fn new(first: Url) -> Self {
        let mut visited = HashSet::new();
        visited.insert(first.as_str().to_owned());
        Self { first, visited }
    }

    /// Number of pages requested so far.
    #[must_use]
    pub fn pages(&self) -> usize {
        self.visited.len()
    }

    /// Resolves the next page URL, or `None` when the listing is complete.
    ///
    /// # Errors
    ///
    /// Returns [`BitbucketError::InvalidPagination`] when the link cannot be
    /// resolved, the server points back at a page already fetched, or the
    /// listing exceeds [`MAX_PAGES`].
    pub fn advance(
        &mut self,
        locator: &ServerLocator,
        next: NextPage,
    ) -> Result<Option<Url>, BitbucketError> {
        let url = match next {
            NextPage::Done => return Ok(None),
            NextPage::Link(link) => locator.resolve_link(&link)?,
            NextPage::Start(start) => self.with_start(start),
        };

        if self.visited.len() >= MAX_PAGES {
            return Err(BitbucketError::InvalidPagination {
                message: format!("listing exceeded {MAX_PAGES} pages"),
            });
        }
        if !self.visited.insert(url.as_str().to_owned()) {
            return Err(BitbucketError::InvalidPagination {
                message: format!("server repeated page {url}"),
            });
        }
        Ok(Some(url))
    }

    fn with_start(&self, start: u64) -> Url {
        let mut url = self.first.clone();
        let retained: Vec<(String, String)> = self
            .first
            .query_pairs()
            .filter(|(name, _)| name != START_PARAM)
            .map(|(name, value)| (name.into_owned(), value.into_owned()))
            .collect();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.clear();
            for (name, value) in &retained {
                pairs.append_pair(name, value);
            }
            pairs.append_pair(START_PARAM, &start.to_string());
        }
        url
    }
}
