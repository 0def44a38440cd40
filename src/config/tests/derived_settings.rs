//! Tests for settings derived from the raw configuration fields.

use std::time::Duration;

use camino::Utf8PathBuf;
use rstest::rstest;

use super::helpers::complete_config;
use crate::StalewatchConfig;
use crate::bitbucket::BitbucketError;
use crate::config::APP_PASSWORD_ENV;
use crate::error::MonitorError;
use crate::logging::{LogFormat, LogRotation};

#[rstest]
fn domain_and_port_build_the_locator() {
    let config = StalewatchConfig {
        bitbucket_port: 8443,
        ..complete_config()
    };

    let locator = config.server_locator().expect("locator should build");

    assert_eq!(locator.base().as_str(), "https://bitbucket.example.com:8443/");
    assert_eq!(locator.project(), "PLAT");
}

#[rstest]
fn url_overrides_domain() {
    let config = StalewatchConfig {
        bitbucket_url: Some("http://localhost:7990".to_owned()),
        ..complete_config()
    };

    let locator = config.server_locator().expect("locator should build");

    assert_eq!(locator.base().as_str(), "http://localhost:7990/");
}

#[rstest]
fn missing_project_is_a_bitbucket_error() {
    let config = StalewatchConfig {
        project: None,
        ..complete_config()
    };

    assert_eq!(
        config.server_locator().map(drop),
        Err(MonitorError::Bitbucket(BitbucketError::MissingProject))
    );
}

#[rstest]
fn credentials_are_trimmed() {
    let _guard = env_lock::lock_env([(APP_PASSWORD_ENV, None::<&str>)]);
    let config = StalewatchConfig {
        user: Some("  svc  ".to_owned()),
        app_password: Some(" secret ".to_owned()),
        ..complete_config()
    };

    let credentials = config.credentials().expect("credentials should build");

    assert_eq!(credentials.user(), "svc");
    assert_eq!(credentials.password(), "secret");
}

#[rstest]
fn lists_split_on_commas() {
    let config = StalewatchConfig {
        repositories: vec!["api, web".to_owned(), " ".to_owned(), "jobs".to_owned()],
        ..complete_config()
    };

    assert_eq!(config.repository_list(), vec!["api", "web", "jobs"]);
}

#[rstest]
fn keywords_are_taken_verbatim() {
    let config = StalewatchConfig {
        ignore_keywords: vec![
            "WIP,Do Not Merge".to_owned(),
            " fix".to_owned(),
            "   ".to_owned(),
        ],
        ..complete_config()
    };

    let filter = config.keyword_filter();

    assert_eq!(filter.keywords(), ["wip,do not merge", " fix"]);
    assert!(!filter.excludes("prefix cleanup"));
    assert!(filter.excludes("hot fix for login"));
}

#[rstest]
fn durations_convert_units() {
    let config = StalewatchConfig {
        interval_hours: 2,
        request_timeout_seconds: 30,
        ..complete_config()
    };

    assert_eq!(config.interval(), Ok(Duration::from_secs(7_200)));
    assert_eq!(config.request_timeout(), Duration::from_secs(30));
}

#[rstest]
fn oversized_interval_is_rejected() {
    let config = StalewatchConfig {
        interval_hours: u64::MAX,
        ..complete_config()
    };

    assert!(matches!(
        config.interval(),
        Err(MonitorError::Configuration { .. })
    ));
}

#[rstest]
#[case::no_host(None, Some("from@example.com"), vec!["to@example.com"])]
#[case::no_sender(Some("smtp.example.com"), None, vec!["to@example.com"])]
#[case::no_recipients(Some("smtp.example.com"), Some("from@example.com"), Vec::new())]
fn email_is_disabled_without_host_sender_or_recipients(
    #[case] host: Option<&str>,
    #[case] from: Option<&str>,
    #[case] to: Vec<&str>,
) {
    let config = StalewatchConfig {
        smtp_host: host.map(str::to_owned),
        smtp_from: from.map(str::to_owned),
        smtp_to: to.into_iter().map(str::to_owned).collect(),
        ..complete_config()
    };

    assert!(config.smtp_settings().is_none());
}

#[rstest]
fn email_settings_carry_connection_details() {
    let config = StalewatchConfig {
        smtp_host: Some("smtp.example.com".to_owned()),
        smtp_port: 465,
        smtp_user: Some("mailer".to_owned()),
        smtp_password: Some("pw".to_owned()),
        smtp_from: Some("from@example.com".to_owned()),
        smtp_to: vec!["a@example.com,b@example.com".to_owned()],
        ..complete_config()
    };

    let settings = config.smtp_settings().expect("email should be enabled");

    assert_eq!(settings.host, "smtp.example.com");
    assert_eq!(settings.port, 465);
    assert_eq!(settings.user.as_deref(), Some("mailer"));
    assert_eq!(settings.to, vec!["a@example.com", "b@example.com"]);
}

#[rstest]
#[case(None, None)]
#[case(Some("  "), None)]
#[case(Some("https://hooks.example.com/x"), Some("https://hooks.example.com/x"))]
fn teams_webhook_is_optional(#[case] url: Option<&str>, #[case] expected: Option<&str>) {
    let config = StalewatchConfig {
        teams_webhook_url: url.map(str::to_owned),
        ..complete_config()
    };

    assert_eq!(config.teams_webhook(), expected);
}

#[rstest]
fn logging_options_follow_log_fields() {
    let config = StalewatchConfig {
        log_level: "debug".to_owned(),
        log_format: "json".to_owned(),
        log_file: Some("logs/stalewatch.log".to_owned()),
        log_stdout: true,
        ..complete_config()
    };

    let options = config.logging_options().expect("options should build");

    assert_eq!(options.level, "debug");
    assert_eq!(options.format, LogFormat::Json);
    assert!(options.stdout);
    assert_eq!(options.file, Some(Utf8PathBuf::from("logs/stalewatch.log")));
}

#[rstest]
fn log_rotation_follows_rotation_fields() {
    let config = StalewatchConfig {
        log_file: Some("logs/stalewatch.log".to_owned()),
        log_max_size_mb: 50,
        log_max_backups: 5,
        log_max_age_days: 30,
        log_compress: true,
        ..complete_config()
    };

    let options = config.logging_options().expect("options should build");

    assert_eq!(
        options.rotation,
        LogRotation {
            max_size_mb: 50,
            max_backups: 5,
            max_age_days: 30,
            compress: true,
        }
    );
}

#[rstest]
fn log_rotation_defaults_to_size_cap_only() {
    let options = complete_config()
        .logging_options()
        .expect("options should build");

    assert_eq!(options.rotation, LogRotation::default());
    assert_eq!(options.rotation.max_size_mb, 100);
}
