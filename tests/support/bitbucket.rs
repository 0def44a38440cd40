//! Bitbucket Server responses served by Wiremock.

use chrono::{DateTime, Duration, Utc};
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::runtime::SharedRuntime;

/// Project key used by every scenario.
pub const PROJECT: &str = "PLAT";

fn repository_path(repository: &str) -> String {
    format!("/rest/api/1.0/projects/{PROJECT}/repos/{repository}/pull-requests")
}

fn last_page(values: Vec<Value>) -> Value {
    json!({ "values": values, "isLastPage": true })
}

/// Millisecond timestamp `days` before `now`.
pub fn days_before(now: DateTime<Utc>, days: i64) -> i64 {
    (now - Duration::days(days)).timestamp_millis()
}

/// An open pull request as returned by the pull request listing.
pub fn pull_request_json(id: u64, title: &str, updated_millis: i64) -> Value {
    json!({
        "id": id,
        "title": title,
        "state": "OPEN",
        "open": true,
        "closed": false,
        "createdDate": updated_millis,
        "updatedDate": updated_millis,
        "author": {"user": {"name": "dana", "displayName": "Dana"}, "role": "AUTHOR"},
        "links": {"self": [{"href": format!("https://bitbucket.example.com/pr/{id}")}]}
    })
}

/// A reviewer entry of the participants listing.
pub fn reviewer_json(name: &str, approved: bool) -> Value {
    json!({
        "user": {"name": name, "displayName": name},
        "role": "REVIEWER",
        "approved": approved,
        "status": if approved { "APPROVED" } else { "UNAPPROVED" }
    })
}

/// Serves the open pull requests of `repository`.
pub fn mount_open_pull_requests(
    runtime: &SharedRuntime,
    server: &MockServer,
    repository: &str,
    pulls: Vec<Value>,
) {
    runtime.block_on(
        Mock::given(method("GET"))
            .and(path(repository_path(repository)))
            .and(query_param("state", "OPEN"))
            .respond_with(ResponseTemplate::new(200).set_body_json(last_page(pulls)))
            .mount(server),
    );
}

/// Serves the participants of one pull request.
pub fn mount_participants(
    runtime: &SharedRuntime,
    server: &MockServer,
    repository: &str,
    id: u64,
    participants: Vec<Value>,
) {
    runtime.block_on(
        Mock::given(method("GET"))
            .and(path(format!("{}/{id}/participants", repository_path(repository))))
            .respond_with(ResponseTemplate::new(200).set_body_json(last_page(participants)))
            .mount(server),
    );
}

/// Serves an empty activity stream for one pull request.
pub fn mount_no_activities(runtime: &SharedRuntime, server: &MockServer, repository: &str, id: u64) {
    runtime.block_on(
        Mock::given(method("GET"))
            .and(path(format!("{}/{id}/activities", repository_path(repository))))
            .respond_with(ResponseTemplate::new(200).set_body_json(last_page(Vec::new())))
            .mount(server),
    );
}
