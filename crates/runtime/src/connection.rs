//! Command/completion correlation over the broadcast bus.
//!
//! This module implements the request/response layer on top of the
//! fire-and-forget transport. It handles:
//! - Generating correlation ids
//! - Registering a pending slot per outstanding command
//! - Resolving slots from completion deliveries
//! - Timeout-bound waiting with guaranteed slot cleanup
//!
//! # Message Flow
//!
//! 1. Caller invokes `post()` with a command name and parameters
//! 2. Connection generates a correlation id and creates a oneshot channel
//! 3. The command envelope is published on the shared command channel
//! 4. Caller awaits the oneshot receiver under a deadline
//! 5. The session's completion handler receives a delivery from the bus
//! 6. The delivery is correlated by id and sent through the oneshot
//! 7. Caller receives the completion payload, or `None` on deadline
//!
//! The central correctness property: every pending slot that is created
//! is removed on every exit path - resolution, timeout, publish failure,
//! or cancellation - enforced by an RAII guard rather than by call-site
//! discipline.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{Map, Value};
use tokio::sync::oneshot;
use uuid::Uuid;

use simular_protocol::Command;

use crate::bus::Bus;
use crate::error::{Error, Result};

/// Pending completion slots keyed by correlation id.
type PendingMap = Arc<Mutex<HashMap<String, oneshot::Sender<Value>>>>;

/// RAII guard ensuring a pending slot is removed on every exit path.
///
/// Removal is idempotent against the resolution path: `resolve` takes the
/// entry out under the lock, so whichever side runs second finds nothing.
struct PendingGuard {
	id: String,
	pending: PendingMap,
}

impl Drop for PendingGuard {
	fn drop(&mut self) {
		self.pending.lock().remove(&self.id);
	}
}

/// Correlates commands published on the shared command channel with the
/// completion deliveries that answer them.
///
/// One Connection belongs to one session; correlation ids only need to be
/// unique within it. Multiple sessions, and multiple concurrent `post`
/// calls across sessions, never share pending state.
pub struct Connection {
	bus: Arc<dyn Bus>,
	command_channel: String,
	pending: PendingMap,
}

impl Connection {
	pub fn new(bus: Arc<dyn Bus>, command_channel: impl Into<String>) -> Self {
		Self {
			bus,
			command_channel: command_channel.into(),
			pending: Arc::new(Mutex::new(HashMap::new())),
		}
	}

	/// The bus this connection publishes on.
	pub fn bus(&self) -> &Arc<dyn Bus> {
		&self.bus
	}

	/// Number of in-flight commands. Returns to zero at quiescence.
	pub fn pending_len(&self) -> usize {
		self.pending.lock().len()
	}

	/// Resolves the pending slot registered under `request_id` with `info`.
	///
	/// First resolution wins: the slot is taken out of the table before the
	/// send, so a second delivery for the same id finds nothing and is
	/// dropped. A delivery with no matching slot is expected when the
	/// waiter already timed out and gave up; it is logged, never raised.
	///
	/// Returns true if a slot was found.
	pub fn resolve(&self, request_id: &str, info: Value) -> bool {
		let slot = self.pending.lock().remove(request_id);
		match slot {
			Some(sender) => {
				if sender.send(info).is_err() {
					// Waiter vanished between the lookup and the send.
					tracing::debug!(request_id, "waiter gone before completion arrived");
				}
				true
			}
			None => {
				tracing::warn!(request_id, "completion with no pending request (dropped)");
				false
			}
		}
	}

	/// Publishes `command` and waits for its correlated completion.
	///
	/// Returns `Ok(Some(info))` when the completion arrives within
	/// `timeout`, and `Ok(None)` when the deadline elapses first. A missed
	/// deadline is not an error: the application may still be working, and
	/// the caller decides whether an absent result is fatal. A late
	/// completion finds no pending slot and is dropped by [`resolve`].
	///
	/// Errors mean the command was never sent ([`Error::Transport`],
	/// [`Error::Json`]) or the slot was torn down externally
	/// ([`Error::ChannelClosed`]); in every case the pending table is left
	/// clean.
	///
	/// [`resolve`]: Connection::resolve
	pub async fn post(
		&self,
		command: &str,
		tab_id: Option<&str>,
		timeout: Duration,
		params: Map<String, Value>,
	) -> Result<Option<Value>> {
		let request_id = next_request_id(tab_id);

		let (sender, receiver) = oneshot::channel();
		self.pending.lock().insert(request_id.clone(), sender);
		let _guard = PendingGuard {
			id: request_id.clone(),
			pending: Arc::clone(&self.pending),
		};

		let envelope = Command {
			command: command.to_string(),
			request_id: request_id.clone(),
			tab_id: tab_id.map(str::to_string),
			params,
		};

		tracing::debug!(command, request_id = %request_id, "posting command");
		self.bus
			.publish(&self.command_channel, serde_json::to_value(&envelope)?)?;

		match tokio::time::timeout(timeout, receiver).await {
			Ok(Ok(info)) => {
				tracing::debug!(request_id = %request_id, "command completed");
				Ok(Some(info))
			}
			Ok(Err(_)) => Err(Error::ChannelClosed),
			Err(_) => {
				tracing::debug!(request_id = %request_id, ?timeout, "command timed out");
				Ok(None)
			}
		}
	}
}

/// Correlation ids only need to be unique within one session: the session
/// id plus a fresh random suffix is sufficient.
fn next_request_id(tab_id: Option<&str>) -> String {
	let suffix = Uuid::new_v4().simple().to_string();
	match tab_id {
		Some(id) => format!("{id}_{}", &suffix[..8]),
		None => format!("browser_{}", &suffix[..8]),
	}
}
