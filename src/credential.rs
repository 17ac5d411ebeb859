//! Process-wide credential state: the redacting secret wrapper and the in-memory token cache.

// self
use crate::_prelude::*;

/// Access or refresh token material.
///
/// Both formatters render `<redacted>`, so the wrapper is safe to carry through tracing fields
/// and error chains. The raw value is only reachable through [`Self::expose`].
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps token material.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the raw token value for header injection or form encoding. Never log it.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Cached credential fields. All three are absent until the first successful acquisition and all
/// three are emptied together on any failed one.
#[derive(Clone, Debug, Default)]
struct Credential {
	access_token: Option<TokenSecret>,
	refresh_token: Option<TokenSecret>,
	expires_at: Option<OffsetDateTime>,
}

/// In-memory holder of the process-wide upstream credential.
///
/// The cache itself contains no acquisition logic; it is mutated only by the token manager.
/// Freshness is evaluated against the caller-supplied renewal skew so an access token is never
/// handed out inside its proactive-renewal window.
#[derive(Debug, Default)]
pub struct CredentialCache(RwLock<Credential>);
impl CredentialCache {
	/// Returns the access token if it is present and still fresh at `now` under the given skew.
	pub fn fresh_token_at(&self, skew: Duration, now: OffsetDateTime) -> Option<TokenSecret> {
		let credential = self.0.read();
		let expires_at = credential.expires_at?;

		if now < expires_at - skew { credential.access_token.clone() } else { None }
	}

	/// Returns the access token if it is fresh relative to the current clock.
	pub fn fresh_token(&self, skew: Duration) -> Option<TokenSecret> {
		self.fresh_token_at(skew, OffsetDateTime::now_utc())
	}

	/// Returns the cached refresh token, if any.
	pub fn refresh_token(&self) -> Option<TokenSecret> {
		self.0.read().refresh_token.clone()
	}

	/// Commits a validated grant atomically.
	///
	/// The refresh token is replaced only when the grant supplied a new one; grant servers that
	/// omit it mean "keep using the previous one". Crate-private: only the token manager mutates
	/// the cache.
	pub(crate) fn commit(
		&self,
		access_token: TokenSecret,
		refresh_token: Option<TokenSecret>,
		expires_in: Duration,
	) {
		let mut credential = self.0.write();

		credential.access_token = Some(access_token);
		credential.expires_at = Some(OffsetDateTime::now_utc() + expires_in);

		if refresh_token.is_some() {
			credential.refresh_token = refresh_token;
		}
	}

	/// Empties all three fields, forcing full re-acquisition on the next attempt.
	pub(crate) fn clear(&self) {
		*self.0.write() = Credential::default();
	}

	/// Returns `true` when no field is populated.
	pub fn is_empty(&self) -> bool {
		let credential = self.0.read();

		credential.access_token.is_none()
			&& credential.refresh_token.is_none()
			&& credential.expires_at.is_none()
	}
}
