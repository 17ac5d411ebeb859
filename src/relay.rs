//! Authorized dispatch to the upstream clinic API with a one-shot retry on HTTP 401.
//!
//! No outbound business call is ever made without a verified-fresh bearer token. When the
//! upstream rejects a previously valid token with 401, the relay forces exactly one
//! re-acquisition and retries the original request exactly once; a second failure is surfaced.

// crates.io
use reqwest::Method;
use serde_json::Value;
// self
use crate::{
	_prelude::*, acquire::TokenManager, config::UpstreamConfig, credential::TokenSecret,
	http::RelayHttpClient,
};

const BODY_PREVIEW_LIMIT: usize = 256;

/// Upstream business request resolved by the routing layer.
#[derive(Clone, Debug)]
pub struct UpstreamRequest {
	/// HTTP method of the upstream endpoint.
	pub method: Method,
	/// Path relative to the upstream base URL.
	pub path: String,
	/// Optional JSON body.
	pub body: Option<Value>,
}
impl UpstreamRequest {
	/// Builds a GET request for the given relative path.
	pub fn get(path: impl Into<String>) -> Self {
		Self { method: Method::GET, path: path.into(), body: None }
	}

	/// Builds a POST request carrying a JSON body.
	pub fn post(path: impl Into<String>, body: Value) -> Self {
		Self { method: Method::POST, path: path.into(), body: Some(body) }
	}
}

/// Per-request gate and dispatcher for upstream-bound calls.
pub struct Relay {
	manager: Arc<TokenManager>,
	http_client: RelayHttpClient,
	config: UpstreamConfig,
}
impl Relay {
	/// Creates a relay with its own HTTP client.
	pub fn new(config: UpstreamConfig) -> Result<Self> {
		let http_client = RelayHttpClient::new()?;

		Self::with_http_client(config, http_client)
	}

	/// Creates a relay reusing a caller-provided HTTP client.
	pub fn with_http_client(config: UpstreamConfig, http_client: RelayHttpClient) -> Result<Self> {
		let manager = Arc::new(TokenManager::new(config.clone(), http_client.clone())?);

		Ok(Self { manager, http_client, config })
	}

	/// Returns the token manager, e.g. for the startup warm-up.
	pub fn manager(&self) -> &Arc<TokenManager> {
		&self.manager
	}

	/// Ensures a verified-fresh token exists before an upstream call proceeds.
	pub async fn ensure_authorized(&self) -> Result<TokenSecret> {
		self.manager.ensure_token(false).await
	}

	/// Dispatches an upstream call with the bearer header attached.
	///
	/// A 401 triggers one forced re-acquisition and one retry; every other failure is surfaced
	/// directly. Never loops more than one retry.
	pub async fn call(&self, request: &UpstreamRequest) -> Result<Value> {
		let token = self.ensure_authorized().await?;

		match self.dispatch(request, &token).await {
			Err(Error::UpstreamCallFailed { status: 401, .. }) => {
				tracing::warn!(
					path = %request.path,
					"upstream rejected the bearer token; forcing one re-acquisition"
				);

				let token = self.manager.ensure_token(true).await?;

				self.dispatch(request, &token).await
			},
			outcome => outcome,
		}
	}

	async fn dispatch(&self, request: &UpstreamRequest, token: &TokenSecret) -> Result<Value> {
		let url = self.config.endpoint(&request.path)?;
		let mut builder = self
			.http_client
			.request(request.method.clone(), url)
			.bearer_auth(token.expose())
			.timeout(self.config.call_timeout);

		if let Some(body) = &request.body {
			builder = builder.json(body);
		}

		let response = builder.send().await.map_err(Error::unreachable)?;
		let status = response.status();
		let bytes = response.bytes().await.map_err(Error::unreachable)?;

		if !status.is_success() {
			return Err(Error::UpstreamCallFailed {
				status: status.as_u16(),
				body: preview(&bytes),
			});
		}
		if bytes.is_empty() {
			return Ok(Value::Null);
		}

		let deserializer = &mut serde_json::Deserializer::from_slice(&bytes);

		serde_path_to_error::deserialize(deserializer).map_err(|source| {
			Error::UpstreamCallFailed {
				status: status.as_u16(),
				body: format!("unparseable JSON body: {source}"),
			}
		})
	}
}

/// Truncated, lossy body preview safe to log and embed in errors.
fn preview(bytes: &[u8]) -> String {
	let text = String::from_utf8_lossy(bytes);

	if text.chars().count() <= BODY_PREVIEW_LIMIT {
		text.into_owned()
	} else {
		let truncated: String = text.chars().take(BODY_PREVIEW_LIMIT).collect();

		format!("{truncated}…")
	}
}
