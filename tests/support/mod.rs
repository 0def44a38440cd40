//! Shared test utilities.

pub mod bitbucket;
pub mod runtime;
