//! Token endpoint facade built on the `oauth2` crate.
//!
//! The upstream clinic API is a nonstandard OAuth 2.0 server: credentials go in the form body,
//! and a failed grant is sometimes signaled by an error object embedded in an HTTP 200 response.
//! The facade normalizes both shapes into a tagged outcome—[`GrantedToken`] on success, a
//! taxonomy [`Error`] otherwise—so the acquisition state machine never inspects raw responses.

pub use oauth2;

// crates.io
use oauth2::{
	AuthType, ClientId, ClientSecret, EndpointNotSet, EndpointSet, HttpClientError, RefreshToken,
	RequestTokenError, ResourceOwnerPassword, ResourceOwnerUsername, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicRequestTokenError, BasicTokenResponse},
};
use reqwest::Error as ReqwestError;
// self
use crate::{
	_prelude::*,
	config::UpstreamConfig,
	credential::TokenSecret,
	error::ConfigError,
	http::{RelayHttpClient, StatusSlot},
};

type ConfiguredTokenClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Grant mechanisms the relay can attempt against the token endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GrantKind {
	/// Exchange a long-lived refresh token for a new access token.
	RefreshToken,
	/// Resource owner username/password grant, used only as a last resort.
	Password,
}
impl GrantKind {
	/// Returns the OAuth 2.0 `grant_type` label.
	pub const fn as_str(self) -> &'static str {
		match self {
			GrantKind::RefreshToken => "refresh_token",
			GrantKind::Password => "password",
		}
	}
}
impl Display for GrantKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Concrete grant selected for one acquisition attempt.
#[derive(Clone, Debug)]
pub(crate) enum GrantRequest {
	/// Refresh token exchange.
	Refresh(TokenSecret),
	/// Username/password exchange.
	Password {
		/// Resource owner username.
		username: String,
		/// Resource owner password.
		password: TokenSecret,
	},
}
impl GrantRequest {
	pub(crate) fn kind(&self) -> GrantKind {
		match self {
			GrantRequest::Refresh(_) => GrantKind::RefreshToken,
			GrantRequest::Password { .. } => GrantKind::Password,
		}
	}
}

/// Fields extracted from a successful token endpoint response.
///
/// An absent `refresh_token` means the previous one stays in use; rotation is opportunistic.
#[derive(Debug)]
pub(crate) struct GrantedToken {
	pub access_token: TokenSecret,
	pub refresh_token: Option<TokenSecret>,
	pub expires_in: Duration,
}

/// Performs OAuth 2.0 token requests against the upstream token endpoint.
pub(crate) struct GrantFacade {
	oauth_client: ConfiguredTokenClient,
	http_client: RelayHttpClient,
	timeout: StdDuration,
}
impl GrantFacade {
	pub(crate) fn new(config: &UpstreamConfig, http_client: RelayHttpClient) -> Result<Self> {
		let token_url = TokenUrl::new(config.token_endpoint()?.to_string())
			.map_err(|source| ConfigError::InvalidTokenEndpoint { source })?;
		// The upstream expects client_id/client_secret in the form body, not basic auth.
		let oauth_client = BasicClient::new(ClientId::new(config.client_id.clone()))
			.set_client_secret(ClientSecret::new(config.client_secret.expose().to_owned()))
			.set_token_uri(token_url)
			.set_auth_type(AuthType::RequestBody);

		Ok(Self { oauth_client, http_client, timeout: config.token_timeout })
	}

	/// Issues a single token request for the selected grant. Never retries.
	pub(crate) async fn run(&self, grant: &GrantRequest) -> Result<GrantedToken> {
		let kind = grant.kind();
		let slot = StatusSlot::default();
		let handle = self.http_client.token_handle(slot.clone(), self.timeout);
		let response = match grant {
			GrantRequest::Refresh(secret) => {
				let refresh = RefreshToken::new(secret.expose().to_owned());

				self.oauth_client.exchange_refresh_token(&refresh).request_async(&handle).await
			},
			GrantRequest::Password { username, password } => {
				let username = ResourceOwnerUsername::new(username.clone());
				let password = ResourceOwnerPassword::new(password.expose().to_owned());

				self.oauth_client.exchange_password(&username, &password).request_async(&handle).await
			},
		}
		.map_err(|err| map_grant_error(kind, slot.take(), err))?;

		granted_from_response(response)
	}
}

fn granted_from_response(response: BasicTokenResponse) -> Result<GrantedToken> {
	let expires_in = response.expires_in().ok_or(ConfigError::MissingExpiresIn)?.as_secs();
	let expires_in = i64::try_from(expires_in).map_err(|_| ConfigError::ExpiresInOutOfRange)?;

	if expires_in <= 0 {
		return Err(ConfigError::NonPositiveExpiresIn.into());
	}

	Ok(GrantedToken {
		access_token: TokenSecret::new(response.access_token().secret().to_owned()),
		refresh_token: response.refresh_token().map(|token| TokenSecret::new(token.secret().to_owned())),
		expires_in: Duration::seconds(expires_in),
	})
}

/// Error object some upstream deployments embed in an HTTP 200 token response.
#[derive(Deserialize)]
struct EmbeddedGrantError {
	error: String,
	#[serde(default)]
	error_description: Option<String>,
}

fn map_grant_error(
	grant: GrantKind,
	status: Option<u16>,
	err: BasicRequestTokenError<HttpClientError<ReqwestError>>,
) -> Error {
	match err {
		RequestTokenError::ServerResponse(response) =>
			map_server_response_error(grant, status, &response),
		RequestTokenError::Parse(source, body) => {
			// An HTTP 200 whose body carries an error object instead of a token shows up here
			// as a parse failure of the standard token response shape.
			if let Ok(embedded) = serde_json::from_slice::<EmbeddedGrantError>(&body) {
				let detail = match embedded.error_description {
					Some(description) => format!("{} ({description})", embedded.error),
					None => embedded.error,
				};

				Error::GrantRejected { grant, status, detail }
			} else {
				Error::GrantRejected {
					grant,
					status,
					detail: format!("malformed token response: {source}"),
				}
			}
		},
		RequestTokenError::Request(error) => map_transport_error(error),
		RequestTokenError::Other(message) => Error::GrantRejected { grant, status, detail: message },
	}
}

fn map_server_response_error(
	grant: GrantKind,
	status: Option<u16>,
	response: &BasicErrorResponse,
) -> Error {
	let detail = match response.error_description() {
		Some(description) => format!("{} ({description})", response.error().as_ref()),
		None => response.error().as_ref().to_owned(),
	};

	Error::GrantRejected { grant, status, detail }
}

fn map_transport_error(err: HttpClientError<ReqwestError>) -> Error {
	match err {
		HttpClientError::Reqwest(inner) => map_reqwest_error(*inner),
		HttpClientError::Http(inner) => ConfigError::from(inner).into(),
		HttpClientError::Io(inner) => Error::unreachable(inner),
		HttpClientError::Other(message) => Error::unreachable(std::io::Error::other(message)),
		_ => Error::unreachable(std::io::Error::other("unknown HTTP client failure")),
	}
}

fn map_reqwest_error(err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}

	// Timeouts, DNS failures, and refused connections all count as unreachable; the caller
	// treats inability to confirm exactly like a failed grant.
	Error::unreachable(err)
}
