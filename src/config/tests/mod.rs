//! Unit tests for configuration loading and precedence.
//!
//! Tests are organised into modules by functional area:
//! - `helpers`: Shared test utilities
//! - `precedence`: Layer precedence tests
//! - `derived_settings`: Locator, credential, channel, and logging settings
//! - `validation`: Required settings and value checks

mod derived_settings;
mod helpers;
