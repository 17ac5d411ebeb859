//! Response envelope returned to the voice-assistant platform.
//!
//! The platform boundary always answers HTTP 200 with a well-formed `results` array—one entry
//! per tool call, each carrying either a `result` string or an `error` string—so the platform
//! never retry-storms the relay. Credential and upstream failures are mapped onto entries here
//! rather than surfaced as transport errors.

// crates.io
use serde_json::Value;
// self
use crate::_prelude::*;

/// Resolved tool invocation handed over by the routing layer.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
	/// Call-correlation identifier echoed back in the reply.
	pub correlation_id: String,
	/// Tool name selected by the platform.
	pub tool: String,
	/// Named arguments for the tool.
	#[serde(default)]
	pub arguments: serde_json::Map<String, Value>,
}

/// Single entry of the envelope's `results` array.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolReply {
	/// Correlation identifier of the originating tool call.
	pub correlation_id: String,
	/// Successful outcome, rendered as a string.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub result: Option<String>,
	/// Failure outcome, rendered as a string.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}
impl ToolReply {
	/// Builds a success entry.
	pub fn success(correlation_id: impl Into<String>, result: impl Into<String>) -> Self {
		Self { correlation_id: correlation_id.into(), result: Some(result.into()), error: None }
	}

	/// Builds a failure entry from a relay error.
	pub fn failure(correlation_id: impl Into<String>, error: &Error) -> Self {
		Self { correlation_id: correlation_id.into(), result: None, error: Some(error.to_string()) }
	}

	/// Maps a dispatch outcome onto the envelope shape.
	///
	/// JSON strings pass through verbatim; any other value is rendered as compact JSON.
	pub fn from_outcome(correlation_id: impl Into<String>, outcome: Result<Value>) -> Self {
		match outcome {
			Ok(Value::String(text)) => Self::success(correlation_id, text),
			Ok(value) => Self::success(correlation_id, value.to_string()),
			Err(err) => Self::failure(correlation_id, &err),
		}
	}
}

/// Envelope wrapper delivered with HTTP 200 regardless of underlying success or failure.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ResponseEnvelope {
	/// One entry per tool call, in request order.
	pub results: Vec<ToolReply>,
}
impl ResponseEnvelope {
	/// Wraps a set of replies.
	pub fn new(results: Vec<ToolReply>) -> Self {
		Self { results }
	}

	/// Convenience constructor for the common single-call case.
	pub fn single(reply: ToolReply) -> Self {
		Self { results: vec![reply] }
	}

	/// Appends a reply.
	pub fn push(&mut self, reply: ToolReply) {
		self.results.push(reply);
	}
}
