//! Server-side relay that lets a voice-assistant platform invoke a clinic-management REST API it
//! cannot call directly. The crate owns the credential lifecycle—acquisition, caching, proactive
//! renewal, and failure recovery of the OAuth 2.0 bearer token that authorizes every upstream
//! call—plus the authorized dispatch path with its one-shot retry on HTTP 401.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod acquire;
pub mod config;
pub mod credential;
pub mod envelope;
pub mod error;
pub mod http;
pub mod oauth;
pub mod probe;
pub mod relay;

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
		time::Duration as StdDuration,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::Client as ReqwestClient;
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;

#[cfg(test)] use {httpmock as _, tokio as _};
