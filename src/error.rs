//! Relay error taxonomy shared by the credential lifecycle and the dispatch path.

// self
use crate::{_prelude::*, oauth::GrantKind};

/// Relay-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical relay error surfaced by the credential manager and dispatcher.
///
/// Every credential-layer failure clears the cached credential before it reaches the caller, so
/// matching on a variant never observes a half-updated cache.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),

	/// No refresh token is cached or configured and no password fallback exists; acquisition
	/// cannot even attempt a token request.
	#[error("No credential is available: no refresh token is cached or configured and no password fallback is set.")]
	NoCredentialAvailable,
	/// Token endpoint refused the grant, either via an error status or an error object embedded
	/// in an HTTP 200 body.
	#[error("Token endpoint rejected the {grant} grant: {detail}.")]
	GrantRejected {
		/// Grant mechanism that was attempted.
		grant: GrantKind,
		/// HTTP status returned by the token endpoint, when one was observed.
		status: Option<u16>,
		/// Upstream-supplied failure detail, truncated and free of secret material.
		detail: String,
	},
	/// Token endpoint nominally succeeded but the issued token failed the validation probe.
	#[error("Granted token failed the validation probe with status {status}.")]
	TokenInvalid {
		/// HTTP status returned by the probe endpoint.
		status: u16,
	},
	/// Network-level failure (timeout, DNS, connection refused) reaching the token, probe, or
	/// business endpoint.
	#[error("Upstream API is unreachable.")]
	UpstreamUnreachable {
		/// Underlying transport failure.
		#[source]
		source: BoxError,
	},
	/// Business call failed after a verified token was attached; distinguished from the
	/// credential-layer failures above.
	#[error("Upstream call failed with status {status}: {body}.")]
	UpstreamCallFailed {
		/// HTTP status returned by the business endpoint.
		status: u16,
		/// Truncated upstream body preview.
		body: String,
	},
}
impl Error {
	/// Wraps a transport-level failure as [`Error::UpstreamUnreachable`].
	pub fn unreachable(source: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::UpstreamUnreachable { source: Box::new(source) }
	}
}

/// Configuration and token response shape failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Required environment variable is absent.
	#[error("Environment variable `{name}` is not set.")]
	MissingEnv {
		/// Variable name, including the `CLINIC_RELAY_` prefix.
		name: String,
	},
	/// Only one half of the username/password fallback pair is configured.
	#[error("Password fallback requires both the username and password variables to be set.")]
	PartialPasswordFallback,
	/// Upstream base URL cannot be parsed.
	#[error("Upstream base URL is invalid.")]
	InvalidBaseUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Relative endpoint path cannot be joined to the base URL.
	#[error("Endpoint path `{path}` cannot be joined to the upstream base URL.")]
	InvalidEndpointPath {
		/// Offending relative path.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},

	/// Token endpoint URL was rejected by the OAuth client.
	#[error("Token endpoint URL is invalid.")]
	InvalidTokenEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},

	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: Box<dyn std::error::Error + Send + Sync>,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Token endpoint response omitted `expires_in`.
	#[error("Token endpoint response is missing expires_in.")]
	MissingExpiresIn,
	/// Token endpoint returned an excessively large `expires_in`.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
	/// Token endpoint returned a non-positive duration.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(source: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(source) }
	}
}
impl From<reqwest::Error> for ConfigError {
	fn from(e: reqwest::Error) -> Self {
		Self::http_client_build(e)
	}
}
