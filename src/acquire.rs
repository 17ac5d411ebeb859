//! Credential acquisition state machine with a single-flight guard.
//!
//! [`TokenManager::ensure_token`] is the only mutation path for the process-wide credential:
//! fast path on a fresh cache, otherwise one grant attempt (refresh token preferred, password as
//! a last resort), a mandatory validation probe, and an atomic commit. Every failure path clears
//! the cache entirely so a half-updated credential is never observable. Concurrent callers that
//! all find the cache invalid collapse onto a single upstream token request: the guard serializes
//! acquisition and late arrivals re-check the cache before starting their own.

// self
use crate::{
	_prelude::*,
	config::UpstreamConfig,
	credential::{CredentialCache, TokenSecret},
	http::RelayHttpClient,
	oauth::{GrantFacade, GrantRequest},
	probe::{ProbeOutcome, TokenProbe},
};

/// Orchestrates grant selection, token requests, validation, and cache updates.
pub struct TokenManager {
	config: UpstreamConfig,
	cache: CredentialCache,
	facade: GrantFacade,
	probe: TokenProbe,
	acquiring: AsyncMutex<()>,
}
impl TokenManager {
	/// Creates a manager with an empty credential cache.
	pub fn new(config: UpstreamConfig, http_client: RelayHttpClient) -> Result<Self> {
		let facade = GrantFacade::new(&config, http_client.clone())?;
		let probe = TokenProbe::new(&config, http_client)?;

		Ok(Self {
			config,
			cache: CredentialCache::default(),
			facade,
			probe,
			acquiring: AsyncMutex::new(()),
		})
	}

	/// Returns the credential cache. Read-only for callers; only the manager mutates it.
	pub fn cache(&self) -> &CredentialCache {
		&self.cache
	}

	/// Returns a token that is verified fresh, acquiring one if needed.
	///
	/// `force` bypasses the cache check and is used by the dispatch layer after an upstream 401.
	/// A failed acquisition is never retried within this call; the next caller retries lazily.
	pub async fn ensure_token(&self, force: bool) -> Result<TokenSecret> {
		if !force && let Some(token) = self.cache.fresh_token(self.config.renewal_skew) {
			return Ok(token);
		}

		let _singleflight = self.acquiring.lock().await;

		// A concurrent caller may have completed an acquisition while we waited on the guard.
		if !force && let Some(token) = self.cache.fresh_token(self.config.renewal_skew) {
			return Ok(token);
		}

		self.acquire().await
	}

	/// Startup acquisition attempt. Failure is logged, not fatal; requests retry lazily.
	pub async fn warm_up(&self) {
		if let Err(err) = self.ensure_token(false).await {
			tracing::warn!(error = %err, "startup token acquisition failed; will retry on demand");
		}
	}

	async fn acquire(&self) -> Result<TokenSecret> {
		let grant = match self.select_grant() {
			Ok(grant) => grant,
			Err(err) => {
				// A stale access token without a refresh token must not linger either.
				self.cache.clear();

				return Err(err);
			},
		};
		let kind = grant.kind();

		tracing::info!(grant = kind.as_str(), "requesting a new upstream access token");

		let granted = match self.facade.run(&grant).await {
			Ok(granted) => granted,
			Err(err) => {
				self.cache.clear();
				tracing::warn!(grant = kind.as_str(), error = %err, "token grant failed");

				return Err(err);
			},
		};

		// A grant response is not trusted until the token survives a validation round-trip.
		match self.probe.validate(&granted.access_token).await {
			Ok(ProbeOutcome::Valid) => {},
			Ok(ProbeOutcome::Rejected { status }) => {
				self.cache.clear();
				tracing::warn!(
					grant = kind.as_str(),
					status,
					"granted token failed validation; credential cache cleared"
				);

				return Err(Error::TokenInvalid { status });
			},
			Err(err) => {
				self.cache.clear();
				tracing::warn!(grant = kind.as_str(), error = %err, "validation probe unreachable");

				return Err(err);
			},
		}

		self.cache.commit(
			granted.access_token.clone(),
			granted.refresh_token,
			granted.expires_in,
		);
		tracing::info!(
			grant = kind.as_str(),
			expires_in = granted.expires_in.whole_seconds(),
			"upstream access token refreshed"
		);

		Ok(granted.access_token)
	}

	// Deterministic grant selection: cached refresh token, then the configured bootstrap one,
	// then the password fallback. A rejected refresh grant is terminal for the attempt; the
	// manager never silently switches grant types, which would mask a configuration problem.
	fn select_grant(&self) -> Result<GrantRequest> {
		if let Some(refresh) =
			self.cache.refresh_token().or_else(|| self.config.bootstrap_refresh_token.clone())
		{
			return Ok(GrantRequest::Refresh(refresh));
		}
		if let Some(fallback) = &self.config.password_fallback {
			return Ok(GrantRequest::Password {
				username: fallback.username.clone(),
				password: fallback.password.clone(),
			});
		}

		Err(Error::NoCredentialAvailable)
	}
}
