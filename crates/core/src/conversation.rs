//! [`Conversation`] - the legacy whole-browser exchange.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{Map, Value, json};

use simular_protocol::{DEFAULT_QUERY_TIMEOUT, channels};
use simular_runtime::{Connection, Result, Subscription, subscribe_guarded};

use crate::browser::Browser;
use crate::transcript::{QueryResult, Transcript, completion_handler, partial_handler};

/// Single global conversation with the application, used when per-tab
/// multiplexing is not needed.
///
/// Carries the same message shapes as a [`Tab`] over the whole-browser
/// `response`/`completed` channels, and posts commands without a tab id.
/// At most one conversation per browser makes sense; a second one would
/// receive the same deliveries.
///
/// [`Tab`]: crate::Tab
pub struct Conversation {
	connection: Arc<Connection>,
	transcript: Arc<Mutex<Transcript>>,
	_subscriptions: Vec<Subscription>,
}

impl Conversation {
	pub fn new(browser: &Browser) -> Self {
		let bus = Arc::clone(browser.bus());
		let connection = Arc::new(Connection::new(
			Arc::clone(&bus),
			channels::command_channel(browser.bundle_id()),
		));
		let transcript = Arc::new(Mutex::new(Transcript::default()));

		let subscriptions = vec![
			subscribe_guarded(
				&bus,
				&channels::response_channel(browser.bundle_id()),
				partial_handler(Arc::clone(&transcript)),
			),
			subscribe_guarded(
				&bus,
				&channels::completed_channel(browser.bundle_id()),
				completion_handler(Arc::clone(&connection)),
			),
		];

		Self {
			connection,
			transcript,
			_subscriptions: subscriptions,
		}
	}

	/// Runs a query over the global channels with the default timeout.
	pub async fn ask(&self, query: &str) -> Result<QueryResult> {
		self.ask_with_timeout(query, DEFAULT_QUERY_TIMEOUT).await
	}

	/// Runs a query over the global channels.
	///
	/// Same contract as [`Tab::query_with`] minus the option plumbing:
	/// accumulated output is cleared, the command is posted without a tab
	/// id, and a timed-out wait returns the fragments gathered so far.
	///
	/// [`Tab::query_with`]: crate::Tab::query_with
	pub async fn ask_with_timeout(&self, query: &str, timeout: Duration) -> Result<QueryResult> {
		self.transcript.lock().reset();

		let mut params = Map::new();
		params.insert("query".to_string(), json!(query));

		let completion = self.connection.post("query", None, timeout, params).await?;
		let info = match completion {
			Some(Value::Object(map)) => map,
			Some(_) | None => Map::new(),
		};
		Ok(self.transcript.lock().snapshot_with(info))
	}

	/// Number of commands currently awaiting completion.
	pub fn in_flight(&self) -> usize {
		self.connection.pending_len()
	}
}
