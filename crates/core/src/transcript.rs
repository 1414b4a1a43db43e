//! Accumulated per-conversation output and the delivery handlers that
//! feed it.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Map, Value};

use simular_protocol::{Completion, PartialResult};
use simular_runtime::{BusHandler, Connection};

/// Output gathered while a command runs: streamed text fragments, image
/// blobs, and the metadata map delivered with the completion.
///
/// A timed-out query yields whatever fragments arrived before the
/// deadline, with an empty metadata map.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryResult {
	/// Text fragments in delivery order.
	pub responses: Vec<String>,
	/// Decoded image blobs in delivery order.
	pub images: Vec<Vec<u8>>,
	/// Metadata from the completion signal.
	pub info: Map<String, Value>,
}

impl QueryResult {
	/// The last text fragment, usually the agent's final answer.
	pub fn final_response(&self) -> Option<&str> {
		self.responses.last().map(String::as_str)
	}

	pub fn is_empty(&self) -> bool {
		self.responses.is_empty() && self.images.is_empty() && self.info.is_empty()
	}
}

/// Accumulation buffer behind the delivery handlers.
///
/// Owned by exactly one session and mutated only under its lock: partial
/// results arrive on the publisher's context, snapshots are taken on the
/// caller's.
#[derive(Default)]
pub(crate) struct Transcript {
	responses: Vec<String>,
	images: Vec<Vec<u8>>,
}

impl Transcript {
	/// Clears accumulated state. Called at the start of each query so
	/// stale fragments from a prior query never leak into a new result.
	pub(crate) fn reset(&mut self) {
		self.responses.clear();
		self.images.clear();
	}

	/// Appends one partial result, in delivery order.
	pub(crate) fn absorb(&mut self, partial: &PartialResult) {
		let mut recognized = false;
		if let Some(text) = partial.text() {
			self.responses.push(text.to_string());
			recognized = true;
		}
		match partial.image_bytes() {
			Some(Ok(bytes)) => {
				self.images.push(bytes);
				recognized = true;
			}
			Some(Err(err)) => {
				tracing::warn!(%err, "discarding undecodable image blob");
				recognized = true;
			}
			None => {}
		}
		if !recognized {
			tracing::debug!("partial result with no recognized fields");
		}
	}

	/// Snapshot of the accumulated state, paired with completion metadata.
	pub(crate) fn snapshot_with(&self, info: Map<String, Value>) -> QueryResult {
		QueryResult {
			responses: self.responses.clone(),
			images: self.images.clone(),
			info,
		}
	}
}

/// Handler for a partial-result channel: validates the payload shape and
/// appends to the transcript. Partial results are matched by session, not
/// correlation id - they accumulate whatever command is in flight.
pub(crate) fn partial_handler(transcript: Arc<Mutex<Transcript>>) -> BusHandler {
	Arc::new(move |payload| match serde_json::from_value::<PartialResult>(payload) {
		Ok(partial) => transcript.lock().absorb(&partial),
		Err(err) => tracing::warn!(%err, "unparseable partial result (dropped)"),
	})
}

/// Handler for a completion channel: validates the payload shape and
/// resolves the matching pending slot. Unmatched ids are logged and
/// dropped inside [`Connection::resolve`].
pub(crate) fn completion_handler(connection: Arc<Connection>) -> BusHandler {
	Arc::new(move |payload| {
		let completion: Completion = match serde_json::from_value(payload.clone()) {
			Ok(completion) => completion,
			Err(err) => {
				tracing::warn!(%err, "unparseable completion (dropped)");
				return;
			}
		};
		connection.resolve(&completion.request_id, payload);
	})
}
