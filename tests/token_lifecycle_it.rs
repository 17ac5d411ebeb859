mod support;

// std
use std::time::Duration;
// crates.io
use httpmock::prelude::*;
// self
use clinic_relay::{config::UpstreamConfig, error::Error, url::Url};
use support::*;

#[tokio::test]
async fn bootstrap_refresh_grant_populates_the_cache() {
	let server = MockServer::start_async().await;
	let body = token_body("access-1", Some("rotated-1"), 3600);
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/oauth2/token")
				.body_includes("grant_type=refresh_token")
				.body_includes(BOOTSTRAP_REFRESH);
			then.status(200).header("content-type", "application/json").body(&body);
		})
		.await;
	let probe_mock = mount_probe_ok(&server).await;
	let manager = manager(config_with_bootstrap(&server));
	let token = manager
		.ensure_token(false)
		.await
		.expect("Acquisition via the bootstrap refresh token should succeed.");

	assert_eq!(token.expose(), "access-1");

	let cached = manager
		.ensure_token(false)
		.await
		.expect("A fresh cached token should be returned without a new grant.");

	assert_eq!(cached.expose(), "access-1");

	token_mock.assert_calls_async(1).await;
	probe_mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn password_grant_is_used_when_no_refresh_token_exists() {
	let server = MockServer::start_async().await;
	let body = token_body("access-pw", Some("refresh-pw"), 3600);
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/oauth2/token")
				.body_includes("grant_type=password")
				.body_includes("username=front-desk");
			then.status(200).header("content-type", "application/json").body(&body);
		})
		.await;
	let probe_mock = mount_probe_ok(&server).await;
	let manager = manager(base_config(&server).with_password_fallback("front-desk", "hunter2"));
	let token =
		manager.ensure_token(false).await.expect("The password fallback grant should succeed.");

	assert_eq!(token.expose(), "access-pw");

	token_mock.assert_calls_async(1).await;
	probe_mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn missing_credentials_fail_fast_without_any_upstream_call() {
	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token");
			then.status(200);
		})
		.await;
	let probe_mock = mount_probe_ok(&server).await;
	let manager = manager(base_config(&server));
	let err = manager
		.ensure_token(false)
		.await
		.expect_err("Acquisition must fail fast when no credential source exists.");

	assert!(matches!(err, Error::NoCredentialAvailable));

	token_mock.assert_calls_async(0).await;
	probe_mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn granted_token_that_fails_validation_is_not_committed() {
	let server = MockServer::start_async().await;
	let token_mock = mount_token_success(&server, "access-bad", Some("refresh-bad"), 3600).await;
	let probe_mock = mount_probe_rejecting(&server, 403).await;
	let manager = manager(config_with_bootstrap(&server));
	let err = manager
		.ensure_token(false)
		.await
		.expect_err("A token rejected by the validation probe must not be committed.");

	assert!(matches!(err, Error::TokenInvalid { status: 403 }));
	assert!(manager.cache().is_empty(), "A failed acquisition must leave the cache fully empty.");

	// The next attempt starts over with a full acquisition instead of reusing anything.
	let _ = manager
		.ensure_token(false)
		.await
		.expect_err("Repeat acquisition should fail the same way while the probe rejects.");

	token_mock.assert_calls_async(2).await;
	probe_mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn rejected_grant_clears_the_cache_and_reports_the_status() {
	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token");
			then.status(400)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_grant\",\"error_description\":\"refresh token expired\"}");
		})
		.await;
	let probe_mock = mount_probe_ok(&server).await;
	let manager = manager(config_with_bootstrap(&server));
	let err = manager
		.ensure_token(false)
		.await
		.expect_err("A rejected grant must surface as an error.");

	match err {
		Error::GrantRejected { status, detail, .. } => {
			assert_eq!(status, Some(400));
			assert!(detail.contains("refresh token expired"));
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}

	assert!(manager.cache().is_empty());

	token_mock.assert_calls_async(1).await;
	probe_mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn embedded_error_object_in_http_200_is_a_rejection() {
	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_grant\",\"error_description\":\"token not bound to an account\"}");
		})
		.await;
	let manager = manager(config_with_bootstrap(&server));
	let err = manager
		.ensure_token(false)
		.await
		.expect_err("An embedded error object must be treated as a failed grant.");

	match err {
		Error::GrantRejected { status, detail, .. } => {
			assert_eq!(status, Some(200));
			assert!(detail.contains("token not bound to an account"));
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}

	assert!(manager.cache().is_empty());

	token_mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn concurrent_callers_collapse_onto_one_token_request() {
	let server = MockServer::start_async().await;
	let token_mock = mount_token_success(&server, "access-sf", Some("refresh-sf"), 3600).await;
	let probe_mock = mount_probe_ok(&server).await;
	let manager = manager(config_with_bootstrap(&server));
	let (first, second, third, fourth) = tokio::join!(
		manager.ensure_token(false),
		manager.ensure_token(false),
		manager.ensure_token(false),
		manager.ensure_token(false),
	);

	for token in [first, second, third, fourth] {
		assert_eq!(
			token.expect("Every concurrent caller should receive the token.").expose(),
			"access-sf"
		);
	}

	token_mock.assert_calls_async(1).await;
	probe_mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn refresh_token_is_retained_when_a_grant_omits_it() {
	let server = MockServer::start_async().await;
	let boot_body = token_body("access-1", Some("rotated-1"), 3600);
	let boot_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token").body_includes(BOOTSTRAP_REFRESH);
			then.status(200).header("content-type", "application/json").body(&boot_body);
		})
		.await;
	let rotated_body = token_body("access-2", None, 3600);
	let rotated_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token").body_includes("rotated-1");
			then.status(200).header("content-type", "application/json").body(&rotated_body);
		})
		.await;
	let _probe_mock = mount_probe_ok(&server).await;
	let manager = manager(config_with_bootstrap(&server));

	let _ = manager.ensure_token(false).await.expect("Initial acquisition should succeed.");
	let _ = manager.ensure_token(true).await.expect("Forced refresh should use the rotated token.");

	// The forced refresh response omitted refresh_token, so the next forced refresh must still
	// present the previously rotated secret.
	let _ = manager.ensure_token(true).await.expect("Second forced refresh should succeed.");

	boot_mock.assert_calls_async(1).await;
	rotated_mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn tokens_inside_the_renewal_window_are_reacquired() {
	let server = MockServer::start_async().await;
	// 60s lifetime is inside the default five-minute renewal skew, so the cached token is
	// already stale the moment it is committed.
	let token_mock = mount_token_success(&server, "access-short", Some("refresh-short"), 60).await;
	let probe_mock = mount_probe_ok(&server).await;
	let manager = manager(config_with_bootstrap(&server));

	let _ = manager.ensure_token(false).await.expect("First acquisition should succeed.");
	let _ = manager.ensure_token(false).await.expect("Second acquisition should succeed.");

	token_mock.assert_calls_async(2).await;
	probe_mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn unreachable_token_endpoint_surfaces_and_leaves_the_cache_empty() {
	// Port 9 (discard) refuses connections; the bounded timeout guards the refused-vs-hang race.
	let base = Url::parse("http://127.0.0.1:9/").expect("Dead-endpoint URL fixture should parse.");
	let config = UpstreamConfig::new(base, CLIENT_ID, CLIENT_SECRET)
		.with_bootstrap_refresh_token(BOOTSTRAP_REFRESH)
		.with_token_timeout(Duration::from_millis(250));
	let manager = manager(config);
	let err = manager
		.ensure_token(false)
		.await
		.expect_err("An unreachable token endpoint must surface as a transport failure.");

	assert!(matches!(err, Error::UpstreamUnreachable { .. }));
	assert!(
		manager.cache().is_empty(),
		"Inability to confirm a credential must leave the cache fully empty."
	);
}

#[tokio::test]
async fn warm_up_failure_is_not_fatal() {
	let server = MockServer::start_async().await;
	let manager = manager(base_config(&server));

	manager.warm_up().await;

	let err = manager
		.ensure_token(false)
		.await
		.expect_err("Lazy acquisition should still fail after a failed warm-up.");

	assert!(matches!(err, Error::NoCredentialAvailable));
}
