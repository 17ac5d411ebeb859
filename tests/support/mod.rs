//! Shared fixtures for the integration suites: a mock upstream clinic API plus relay builders.

#![allow(dead_code)]

// crates.io
use httpmock::{Mock, prelude::*};
// self
use clinic_relay::{
	acquire::TokenManager, config::UpstreamConfig, http::RelayHttpClient, relay::Relay, url::Url,
};

pub const CLIENT_ID: &str = "relay-client";
pub const CLIENT_SECRET: &str = "relay-secret";
pub const BOOTSTRAP_REFRESH: &str = "boot-refresh";

/// Builds a configuration pointing at the mock server, with no credential source.
pub fn base_config(server: &MockServer) -> UpstreamConfig {
	let base = Url::parse(&server.url("/")).expect("Mock server URL should parse.");

	UpstreamConfig::new(base, CLIENT_ID, CLIENT_SECRET).with_probe_path("probe")
}

/// Builds a configuration seeded with the bootstrap refresh token.
pub fn config_with_bootstrap(server: &MockServer) -> UpstreamConfig {
	base_config(server).with_bootstrap_refresh_token(BOOTSTRAP_REFRESH)
}

/// Builds a token manager for the given configuration.
pub fn manager(config: UpstreamConfig) -> TokenManager {
	let http_client = RelayHttpClient::new().expect("Test HTTP client should build successfully.");

	TokenManager::new(config, http_client).expect("Token manager fixture should build.")
}

/// Builds a relay for the given configuration.
pub fn relay(config: UpstreamConfig) -> Relay {
	Relay::new(config).expect("Relay fixture should build.")
}

/// Mounts a validation probe endpoint that accepts any bearer token.
pub async fn mount_probe_ok(server: &MockServer) -> Mock<'_> {
	server
		.mock_async(|when, then| {
			when.method(GET).path("/probe");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"id\":\"relay-account\"}");
		})
		.await
}

/// Mounts a validation probe endpoint that rejects every token with the given status.
pub async fn mount_probe_rejecting(server: &MockServer, status: u16) -> Mock<'_> {
	server
		.mock_async(move |when, then| {
			when.method(GET).path("/probe");
			then.status(status);
		})
		.await
}

/// Renders a standard token endpoint success body.
pub fn token_body(access: &str, refresh: Option<&str>, expires_in: u64) -> String {
	match refresh {
		Some(refresh) => format!(
			"{{\"access_token\":\"{access}\",\"refresh_token\":\"{refresh}\",\"token_type\":\"bearer\",\"expires_in\":{expires_in}}}"
		),
		None => format!(
			"{{\"access_token\":\"{access}\",\"token_type\":\"bearer\",\"expires_in\":{expires_in}}}"
		),
	}
}

/// Mounts a token endpoint answering every grant with the given token.
pub async fn mount_token_success<'a>(
	server: &'a MockServer,
	access: &str,
	refresh: Option<&str>,
	expires_in: u64,
) -> Mock<'a> {
	let body = token_body(access, refresh, expires_in);

	server
		.mock_async(move |when, then| {
			when.method(POST).path("/oauth2/token");
			then.status(200).header("content-type", "application/json").body(&body);
		})
		.await
}
