//! Error types exposed by the Bitbucket access layer.

use thiserror::Error;

/// Errors surfaced while talking to the Bitbucket Server REST API.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BitbucketError {
    /// The configured server URL could not be parsed or is unsupported.
    #[error("Bitbucket URL is invalid: {0}")]
    InvalidUrl(String),

    /// No project key was configured.
    #[error("Bitbucket project key is required")]
    MissingProject,

    /// The API user or app password was missing.
    #[error("Bitbucket credentials are required: {message}")]
    MissingCredentials {
        /// Which credential was absent.
        message: String,
    },

    /// Bitbucket rejected the credentials.
    #[error("Bitbucket rejected the credentials: {message}")]
    Authentication {
        /// Status line and server message returned with the 401/403 response.
        message: String,
    },

    /// Bitbucket returned a non-authentication API error.
    #[error("Bitbucket API error: {message}")]
    Api {
        /// Status and response body describing the failure.
        message: String,
    },

    /// Networking failed while calling Bitbucket.
    #[error("network error talking to Bitbucket: {message}")]
    Network {
        /// Transport-level error detail.
        message: String,
    },

    /// The response body did not match the expected JSON shape.
    #[error("failed to decode Bitbucket response: {message}")]
    Decode {
        /// Decoder error detail.
        message: String,
    },

    /// The server kept returning pages past the safety limit or repeated a
    /// cursor.
    #[error("invalid pagination: {message}")]
    InvalidPagination {
        /// Description of the pagination fault.
        message: String,
    },
}
