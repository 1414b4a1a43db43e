//! Message shapes exchanged over the bus.
//!
//! Inbound payloads are deserialized into these types at the bus boundary.
//! A payload that does not fit its channel's shape is dropped with a log
//! line by the delivery handlers; it never reaches a caller.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Command published on the global command channel.
///
/// `request_id` correlates the eventual completion back to the caller;
/// `tab_id` addresses a session, and is absent for the legacy
/// whole-browser conversation. Command-specific parameters are flattened
/// alongside the envelope fields, matching what the application expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Command {
	pub command: String,
	pub request_id: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub tab_id: Option<String>,
	#[serde(flatten)]
	pub params: Map<String, Value>,
}

/// Free-form message for signalling an already-running application.
///
/// The launch path delivers the first query as a command-line argument;
/// when an instance is already up, the query travels as one of these on
/// the command channel instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserMessage {
	pub message: String,
}

impl UserMessage {
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
		}
	}
}

/// Partial result streamed on a request channel while a command runs.
///
/// The application uses whichever text key fits the fragment; [`text`]
/// applies the same precedence the application does. Partial results are
/// addressed by session only - they carry no correlation id, because the
/// agent may stream output before the final completion signal.
///
/// [`text`]: PartialResult::text
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartialResult {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub response: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub query: Option<String>,
	/// Base64-encoded image blob.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub image: Option<String>,
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

impl PartialResult {
	/// The text fragment carried by this delivery, if any.
	/// Precedence: `response`, then `message`, then `query`.
	pub fn text(&self) -> Option<&str> {
		self.response
			.as_deref()
			.or(self.message.as_deref())
			.or(self.query.as_deref())
	}

	/// Decodes the attached image blob. Empty strings count as absent.
	pub fn image_bytes(&self) -> Option<Result<Vec<u8>, base64::DecodeError>> {
		match self.image.as_deref() {
			Some(data) if !data.is_empty() => Some(BASE64.decode(data)),
			_ => None,
		}
	}
}

/// Completion delivered on a completion channel.
///
/// The full payload is the result the waiting caller receives;
/// `request_id` links it back to the command that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
	pub request_id: String,
	#[serde(flatten)]
	pub info: Map<String, Value>,
}
