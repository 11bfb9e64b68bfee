//! Mock server helpers for the release registry and asset downloads

use serde_json::Value;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::constants::*;

/// Serve `release` from the latest-release endpoint
pub async fn mock_latest_release(server: &MockServer, release: &Value) {
    Mock::given(method("GET"))
        .and(path(LATEST_RELEASE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(release))
        .mount(server)
        .await;
}

/// Serve `release` and verify the endpoint is hit exactly `times` times
pub async fn mock_latest_release_expect(server: &MockServer, release: &Value, times: u64) {
    Mock::given(method("GET"))
        .and(path(LATEST_RELEASE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(release))
        .expect(times)
        .mount(server)
        .await;
}

/// Answer the latest-release endpoint with a status and raw body
pub async fn mock_latest_release_raw(server: &MockServer, status: u16, body: &str) {
    Mock::given(method("GET"))
        .and(path(LATEST_RELEASE_PATH))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

/// Serve an asset at `/download/{name}`
pub async fn mock_asset(server: &MockServer, name: &str, content: &[u8]) {
    Mock::given(method("GET"))
        .and(path(format!("/download/{}", name)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content))
        .mount(server)
        .await;
}

/// Serve an asset and verify it is downloaded exactly `times` times
pub async fn mock_asset_expect(server: &MockServer, name: &str, content: &[u8], times: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/download/{}", name)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content))
        .expect(times)
        .mount(server)
        .await;
}

/// Serve an asset after a delay
pub async fn mock_slow_asset(server: &MockServer, name: &str, content: &[u8], delay: Duration) {
    Mock::given(method("GET"))
        .and(path(format!("/download/{}", name)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(content)
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

/// Answer an asset download with an error status
pub async fn mock_failing_asset(server: &MockServer, name: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(format!("/download/{}", name)))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}
