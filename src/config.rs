//! Upstream connection settings resolved once at startup.

// std
use std::env;
// self
use crate::{_prelude::*, credential::TokenSecret, error::ConfigError};

const ENV_BASE_URL: &str = "CLINIC_RELAY_BASE_URL";
const ENV_CLIENT_ID: &str = "CLINIC_RELAY_CLIENT_ID";
const ENV_CLIENT_SECRET: &str = "CLINIC_RELAY_CLIENT_SECRET";
const ENV_REFRESH_TOKEN: &str = "CLINIC_RELAY_REFRESH_TOKEN";
const ENV_USERNAME: &str = "CLINIC_RELAY_USERNAME";
const ENV_PASSWORD: &str = "CLINIC_RELAY_PASSWORD";
const ENV_PROBE_PATH: &str = "CLINIC_RELAY_PROBE_PATH";

/// Proactive renewal margin subtracted from the reported token expiry.
pub const DEFAULT_RENEWAL_SKEW: Duration = Duration::minutes(5);
/// Token endpoint timeout. The upstream responds slowly under load, so this is generous but
/// always terminates.
pub const DEFAULT_TOKEN_TIMEOUT: StdDuration = StdDuration::from_secs(60);
/// Timeout for the validation probe round-trip.
pub const DEFAULT_PROBE_TIMEOUT: StdDuration = StdDuration::from_secs(10);
/// Timeout for relayed business calls.
pub const DEFAULT_CALL_TIMEOUT: StdDuration = StdDuration::from_secs(30);

const DEFAULT_PROBE_PATH: &str = "users/me";
const TOKEN_ENDPOINT_PATH: &str = "oauth2/token";

/// Username/password pair used as a last-resort grant when no refresh token exists.
#[derive(Clone, Debug)]
pub struct PasswordCredentials {
	/// Resource owner username.
	pub username: String,
	/// Resource owner password.
	pub password: TokenSecret,
}

/// Static upstream connection settings. Supplied once at startup and never mutated by the core.
#[derive(Clone, Debug)]
pub struct UpstreamConfig {
	base_url: Url,
	/// OAuth 2.0 client identifier sent with every grant.
	pub client_id: String,
	/// Confidential OAuth 2.0 client secret; sent in the form body, never exposed to browsers.
	pub client_secret: TokenSecret,
	/// Long-lived bootstrap refresh token used when the cache holds none.
	pub bootstrap_refresh_token: Option<TokenSecret>,
	/// Optional username/password fallback attempted when no refresh token exists at all.
	pub password_fallback: Option<PasswordCredentials>,
	/// Relative path of the cheap read-only endpoint used to validate freshly granted tokens.
	pub probe_path: String,
	/// Renewal margin subtracted from the token expiry before it is considered stale.
	pub renewal_skew: Duration,
	/// Bounded timeout for token endpoint requests.
	pub token_timeout: StdDuration,
	/// Bounded timeout for validation probe requests.
	pub probe_timeout: StdDuration,
	/// Bounded timeout for relayed business calls.
	pub call_timeout: StdDuration,
}
impl UpstreamConfig {
	/// Creates a configuration with default timeouts, skew, and probe path.
	///
	/// The base URL is normalized to a trailing slash so endpoint joins behave predictably.
	pub fn new(
		base_url: Url,
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
	) -> Self {
		Self {
			base_url: normalize_base_url(base_url),
			client_id: client_id.into(),
			client_secret: TokenSecret::new(client_secret),
			bootstrap_refresh_token: None,
			password_fallback: None,
			probe_path: DEFAULT_PROBE_PATH.into(),
			renewal_skew: DEFAULT_RENEWAL_SKEW,
			token_timeout: DEFAULT_TOKEN_TIMEOUT,
			probe_timeout: DEFAULT_PROBE_TIMEOUT,
			call_timeout: DEFAULT_CALL_TIMEOUT,
		}
	}

	/// Resolves the configuration from `CLINIC_RELAY_*` environment variables.
	///
	/// `BASE_URL`, `CLIENT_ID`, and `CLIENT_SECRET` are required. `REFRESH_TOKEN` seeds the
	/// bootstrap refresh token; `USERNAME`/`PASSWORD` must be set together to enable the
	/// password fallback; `PROBE_PATH` overrides the validation endpoint.
	pub fn from_env() -> Result<Self, ConfigError> {
		let base_url = Url::parse(&require_env(ENV_BASE_URL)?)
			.map_err(|source| ConfigError::InvalidBaseUrl { source })?;
		let mut config =
			Self::new(base_url, require_env(ENV_CLIENT_ID)?, require_env(ENV_CLIENT_SECRET)?);

		if let Ok(token) = env::var(ENV_REFRESH_TOKEN) {
			config.bootstrap_refresh_token = Some(TokenSecret::new(token));
		}

		match (env::var(ENV_USERNAME), env::var(ENV_PASSWORD)) {
			(Ok(username), Ok(password)) => {
				config.password_fallback =
					Some(PasswordCredentials { username, password: TokenSecret::new(password) });
			},
			(Err(_), Err(_)) => {},
			_ => return Err(ConfigError::PartialPasswordFallback),
		}

		if let Ok(path) = env::var(ENV_PROBE_PATH) {
			config.probe_path = path;
		}

		Ok(config)
	}

	/// Sets the bootstrap refresh token.
	pub fn with_bootstrap_refresh_token(mut self, token: impl Into<String>) -> Self {
		self.bootstrap_refresh_token = Some(TokenSecret::new(token));

		self
	}

	/// Sets the username/password fallback pair.
	pub fn with_password_fallback(
		mut self,
		username: impl Into<String>,
		password: impl Into<String>,
	) -> Self {
		self.password_fallback = Some(PasswordCredentials {
			username: username.into(),
			password: TokenSecret::new(password),
		});

		self
	}

	/// Overrides the validation probe path.
	pub fn with_probe_path(mut self, path: impl Into<String>) -> Self {
		self.probe_path = path.into();

		self
	}

	/// Overrides the renewal skew. Negative values are clamped to zero.
	pub fn with_renewal_skew(mut self, skew: Duration) -> Self {
		self.renewal_skew = if skew.is_negative() { Duration::ZERO } else { skew };

		self
	}

	/// Overrides the token endpoint timeout.
	pub fn with_token_timeout(mut self, timeout: StdDuration) -> Self {
		self.token_timeout = timeout;

		self
	}

	/// Overrides the validation probe timeout.
	pub fn with_probe_timeout(mut self, timeout: StdDuration) -> Self {
		self.probe_timeout = timeout;

		self
	}

	/// Overrides the business call timeout.
	pub fn with_call_timeout(mut self, timeout: StdDuration) -> Self {
		self.call_timeout = timeout;

		self
	}

	/// Returns the normalized upstream base URL.
	pub fn base_url(&self) -> &Url {
		&self.base_url
	}

	/// Joins a relative path onto the base URL.
	pub fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
		let relative = path.trim_start_matches('/');

		self.base_url
			.join(relative)
			.map_err(|source| ConfigError::InvalidEndpointPath { path: path.into(), source })
	}

	/// Returns the OAuth 2.0 token endpoint URL.
	pub fn token_endpoint(&self) -> Result<Url, ConfigError> {
		self.endpoint(TOKEN_ENDPOINT_PATH)
	}

	/// Returns the validation probe endpoint URL.
	pub fn probe_endpoint(&self) -> Result<Url, ConfigError> {
		self.endpoint(&self.probe_path)
	}
}

fn require_env(name: &str) -> Result<String, ConfigError> {
	env::var(name).map_err(|_| ConfigError::MissingEnv { name: name.into() })
}

fn normalize_base_url(mut url: Url) -> Url {
	if !url.path().ends_with('/') {
		let path = format!("{}/", url.path());

		url.set_path(&path);
	}

	url
}
