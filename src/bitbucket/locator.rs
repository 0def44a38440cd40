//! Server location, endpoint construction, and credential wrappers.

use std::fmt;

use url::Url;

use super::error::BitbucketError;
use super::models::PullRequestId;

const REST_API_SEGMENTS: [&str; 3] = ["rest", "api", "1.0"];

/// Bitbucket Server base URL plus the project key that owns the monitored
/// repositories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerLocator {
    base: Url,
    project: String,
}

impl ServerLocator {
    /// Parses a base URL such as `https://bitbucket.example.com:8443`.
    ///
    /// A context path (`https://host/bitbucket`) is preserved and REST paths
    /// are appended beneath it.
    ///
    /// # Errors
    ///
    /// Returns [`BitbucketError::InvalidUrl`] when the URL cannot be parsed or
    /// is not `http`/`https`, and [`BitbucketError::MissingProject`] when the
    /// project key is blank.
    pub fn new(base_url: &str, project: &str) -> Result<Self, BitbucketError> {
        let base = Url::parse(base_url.trim())
            .map_err(|error| BitbucketError::InvalidUrl(error.to_string()))?;

        if !matches!(base.scheme(), "http" | "https") {
            return Err(BitbucketError::InvalidUrl(format!(
                "unsupported scheme '{}'",
                base.scheme()
            )));
        }
        if base.host_str().is_none() {
            return Err(BitbucketError::InvalidUrl(
                "URL must include a host".to_owned(),
            ));
        }

        let project_key = project.trim();
        if project_key.is_empty() {
            return Err(BitbucketError::MissingProject);
        }

        Ok(Self {
            base,
            project: project_key.to_owned(),
        })
    }

    /// Builds an `https://{domain}:{port}` locator.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`ServerLocator::new`].
    pub fn from_domain(domain: &str, port: u16, project: &str) -> Result<Self, BitbucketError> {
        let host = domain.trim();
        if host.is_empty() {
            return Err(BitbucketError::InvalidUrl(
                "Bitbucket domain must not be blank".to_owned(),
            ));
        }
        Self::new(&format!("https://{host}:{port}"), project)
    }

    /// Borrow the base URL.
    #[must_use]
    pub const fn base(&self) -> &Url {
        &self.base
    }

    /// Borrow the project key.
    #[must_use]
    pub const fn project(&self) -> &str {
        self.project.as_str()
    }

    /// Endpoint used to verify connectivity and credentials.
    ///
    /// # Errors
    ///
    /// Returns [`BitbucketError::InvalidUrl`] when the base cannot carry a
    /// path.
    pub fn probe_url(&self) -> Result<Url, BitbucketError> {
        let mut url = self.rest_url(&["projects", self.project.as_str(), "repos"])?;
        url.query_pairs_mut().append_pair("limit", "1");
        Ok(url)
    }

    /// Endpoint listing the open pull requests of `repository`.
    ///
    /// # Errors
    ///
    /// Returns [`BitbucketError::InvalidUrl`] when the base cannot carry a
    /// path.
    pub fn open_pull_requests_url(&self, repository: &str) -> Result<Url, BitbucketError> {
        let mut url = self.repository_url(repository, &["pull-requests"])?;
        url.query_pairs_mut().append_pair("state", "OPEN");
        Ok(url)
    }

    /// Endpoint listing the participants of a pull request.
    ///
    /// # Errors
    ///
    /// Returns [`BitbucketError::InvalidUrl`] when the base cannot carry a
    /// path.
    pub fn participants_url(
        &self,
        repository: &str,
        id: PullRequestId,
    ) -> Result<Url, BitbucketError> {
        let id_segment = id.to_string();
        self.repository_url(
            repository,
            &["pull-requests", id_segment.as_str(), "participants"],
        )
    }

    /// Endpoint listing the activities (comments, approvals, updates) of a
    /// pull request.
    ///
    /// # Errors
    ///
    /// Returns [`BitbucketError::InvalidUrl`] when the base cannot carry a
    /// path.
    pub fn activities_url(&self, repository: &str, id: PullRequestId) -> Result<Url, BitbucketError> {
        let id_segment = id.to_string();
        self.repository_url(
            repository,
            &["pull-requests", id_segment.as_str(), "activities"],
        )
    }

    /// Resolves a pagination link returned by the server.
    ///
    /// Absolute links are used as-is; server-relative links (`/rest/...`) are
    /// resolved against the base URL's origin.
    ///
    /// # Errors
    ///
    /// Returns [`BitbucketError::InvalidPagination`] when the link cannot be
    /// resolved.
    pub fn resolve_link(&self, link: &str) -> Result<Url, BitbucketError> {
        self.base
            .join(link)
            .map_err(|error| BitbucketError::InvalidPagination {
                message: format!("cannot resolve next page link '{link}': {error}"),
            })
    }

    fn repository_url(&self, repository: &str, tail: &[&str]) -> Result<Url, BitbucketError> {
        let mut segments = vec!["projects", self.project.as_str(), "repos", repository];
        segments.extend_from_slice(tail);
        self.rest_url(&segments)
    }

    fn rest_url(&self, segments: &[&str]) -> Result<Url, BitbucketError> {
        let mut url = self.base.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.path_segments_mut()
            .map_err(|()| BitbucketError::InvalidUrl("URL cannot be a base".to_owned()))?
            .pop_if_empty()
            .extend(REST_API_SEGMENTS)
            .extend(segments);
        Ok(url)
    }
}

/// HTTP basic credentials for the Bitbucket API.
///
/// Both values are trimmed; the password is redacted from `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    user: String,
    password: String,
}

impl BasicCredentials {
    /// Validates and trims the user name and app password.
    ///
    /// # Errors
    ///
    /// Returns [`BitbucketError::MissingCredentials`] when either value is
    /// blank.
    pub fn new(user: impl AsRef<str>, password: impl AsRef<str>) -> Result<Self, BitbucketError> {
        let user_trimmed = user.as_ref().trim();
        if user_trimmed.is_empty() {
            return Err(BitbucketError::MissingCredentials {
                message: "user is blank".to_owned(),
            });
        }
        let password_trimmed = password.as_ref().trim();
        if password_trimmed.is_empty() {
            return Err(BitbucketError::MissingCredentials {
                message: "app password is blank".to_owned(),
            });
        }
        Ok(Self {
            user: user_trimmed.to_owned(),
            password: password_trimmed.to_owned(),
        })
    }

    /// Borrow the user name.
    #[must_use]
    pub const fn user(&self) -> &str {
        self.user.as_str()
    }

    /// Borrow the app password.
    #[must_use]
    pub const fn password(&self) -> &str {
        self.password.as_str()
    }
}

impl fmt::Debug for BasicCredentials {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("BasicCredentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}
