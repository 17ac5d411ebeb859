//! Transport primitives shared by the token, probe, and relay calls.
//!
//! Every outbound request carries a bounded timeout; there is no unbounded wait anywhere in the
//! relay. The token endpoint goes through [`TokenEndpointHandle`], an [`AsyncHttpClient`] adapter
//! that records the response status in a [`StatusSlot`] so grant failures can be classified even
//! after the `oauth2` crate has consumed the response.

// std
use std::ops::Deref;
// crates.io
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse};
use reqwest::redirect::Policy;
// self
use crate::{_prelude::*, error::ConfigError};

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Redirect following is disabled: the token endpoint must return results directly per OAuth 2.0
/// guidance, and the clinic API never redirects business calls. Callers supplying a custom
/// [`ReqwestClient`] should configure it the same way.
#[derive(Clone)]
pub struct RelayHttpClient(ReqwestClient);
impl RelayHttpClient {
	/// Builds the relay's default client.
	pub fn new() -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder().redirect(Policy::none()).build()?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a token endpoint handle that bounds requests with `timeout` and records the
	/// response status in `slot`.
	pub(crate) fn token_handle(&self, slot: StatusSlot, timeout: StdDuration) -> TokenEndpointHandle {
		TokenEndpointHandle { client: self.0.clone(), slot, timeout }
	}
}
impl AsRef<ReqwestClient> for RelayHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
impl Deref for RelayHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

/// Thread-safe slot capturing the HTTP status of the most recent token endpoint response.
///
/// A fresh slot is created for each grant attempt and read immediately after `oauth2` resolves,
/// so statuses never leak across attempts.
#[derive(Clone, Debug, Default)]
pub struct StatusSlot(Arc<Mutex<Option<u16>>>);
impl StatusSlot {
	/// Stores the status of the current request.
	pub fn store(&self, status: u16) {
		*self.0.lock() = Some(status);
	}

	/// Returns the captured status, if any, consuming it from the slot.
	pub fn take(&self) -> Option<u16> {
		self.0.lock().take()
	}
}

/// [`AsyncHttpClient`] adapter used for token endpoint exchanges.
pub struct TokenEndpointHandle {
	client: ReqwestClient,
	slot: StatusSlot,
	timeout: StdDuration,
}
impl<'c> AsyncHttpClient<'c> for TokenEndpointHandle {
	type Error = HttpClientError<reqwest::Error>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let client = self.client.clone();
		let slot = self.slot.clone();
		let timeout = self.timeout;

		Box::pin(async move {
			slot.take();

			let mut request: reqwest::Request = request.try_into().map_err(Box::new)?;

			*request.timeout_mut() = Some(timeout);

			let response = client.execute(request).await.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();

			slot.store(status.as_u16());

			let mut mapped = HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*mapped.status_mut() = status;
			*mapped.headers_mut() = headers;

			Ok(mapped)
		})
	}
}
