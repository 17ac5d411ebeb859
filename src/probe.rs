//! Validation probe that confirms a freshly granted token is actually usable.
//!
//! The token endpoint can return a syntactically valid token that is not bound to a usable
//! account/session. The probe issues a cheap read-only call with the candidate token before the
//! cache is allowed to commit it; skipping this step would let a useless token poison the cache
//! and silently fail every call until expiry.

// crates.io
use reqwest::StatusCode;
// self
use crate::{_prelude::*, config::UpstreamConfig, credential::TokenSecret, http::RelayHttpClient};

/// Outcome of a validation probe round-trip.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbeOutcome {
	/// The upstream accepted the token (HTTP 200).
	Valid,
	/// The upstream answered with any other status; the token must not be committed.
	Rejected {
		/// HTTP status returned by the probe endpoint.
		status: u16,
	},
}

/// Read-only authenticated call against a known-good upstream endpoint.
pub struct TokenProbe {
	http_client: RelayHttpClient,
	endpoint: Url,
	timeout: StdDuration,
}
impl TokenProbe {
	/// Builds a probe for the configured validation endpoint.
	pub fn new(config: &UpstreamConfig, http_client: RelayHttpClient) -> Result<Self> {
		Ok(Self { http_client, endpoint: config.probe_endpoint()?, timeout: config.probe_timeout })
	}

	/// Confirms the candidate token is authorized.
	///
	/// Any HTTP status is a normal outcome and never an error; only network-level failures
	/// propagate, and the caller treats those identically to an invalid token.
	pub async fn validate(&self, token: &TokenSecret) -> Result<ProbeOutcome> {
		let response = self
			.http_client
			.get(self.endpoint.clone())
			.bearer_auth(token.expose())
			.timeout(self.timeout)
			.send()
			.await
			.map_err(Error::unreachable)?;
		let status = response.status();

		if status == StatusCode::OK {
			Ok(ProbeOutcome::Valid)
		} else {
			tracing::debug!(status = status.as_u16(), "validation probe rejected the candidate token");

			Ok(ProbeOutcome::Rejected { status: status.as_u16() })
		}
	}
}
