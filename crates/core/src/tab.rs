//! [`Tab`] - one addressable conversation with the Simular application.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{Map, Value};
use uuid::Uuid;

use simular_protocol::{
	DEFAULT_CLOSE_TIMEOUT, DEFAULT_OPEN_TIMEOUT, DEFAULT_QUERY_TIMEOUT, QueryOptions, QueryParams,
	channels,
};
use simular_runtime::{Connection, Error, Result, Subscription, subscribe_guarded};

use crate::browser::{Browser, BrowserConfig};
use crate::transcript::{QueryResult, Transcript, completion_handler, partial_handler};

/// One logical session with the application, multiplexed over a private
/// pair of bus channels derived from the tab id.
///
/// A tab observes its channels from the moment it is constructed, but only
/// counts as open - and only appears in the browser's live-tab map - once
/// the `open_tab` handshake succeeds. A timed-out or failed command leaves
/// the tab open; failure of one command never implies failure of the
/// session. Dropping the tab releases its subscriptions whatever state it
/// is in, so a dead object cannot keep receiving deliveries.
///
/// Callers should treat one tab as single-command-at-a-time: partial
/// results are matched by session, not correlation id, so fragments from
/// concurrently in-flight queries would interleave.
pub struct Tab {
	id: String,
	browser: Arc<Browser>,
	connection: Arc<Connection>,
	transcript: Arc<Mutex<Transcript>>,
	_subscriptions: Vec<Subscription>,
}

impl Tab {
	/// Creates a tab with a fresh unique id. The open handshake is a
	/// separate step; see [`open`].
	///
	/// [`open`]: Tab::open
	pub fn new(browser: Arc<Browser>) -> Arc<Self> {
		let id = Uuid::new_v4().to_string();
		Self::with_id(browser, id)
	}

	/// Creates a tab with an explicitly supplied id. The id must be unique
	/// on the bus or deliveries will cross between sessions.
	pub fn with_id(browser: Arc<Browser>, id: impl Into<String>) -> Arc<Self> {
		let id = id.into();
		let bus = Arc::clone(browser.bus());
		let connection = Arc::new(Connection::new(
			Arc::clone(&bus),
			channels::command_channel(browser.bundle_id()),
		));
		let transcript = Arc::new(Mutex::new(Transcript::default()));

		let subscriptions = vec![
			subscribe_guarded(
				&bus,
				&channels::tab_request_channel(browser.bundle_id(), &id),
				partial_handler(Arc::clone(&transcript)),
			),
			subscribe_guarded(
				&bus,
				&channels::tab_completion_channel(browser.bundle_id(), &id),
				completion_handler(Arc::clone(&connection)),
			),
		];

		Arc::new(Self {
			id,
			browser,
			connection,
			transcript,
			_subscriptions: subscriptions,
		})
	}

	pub fn id(&self) -> &str {
		&self.id
	}

	/// True while this tab is in the browser's live-tab map.
	pub fn is_open(&self) -> bool {
		self.browser.tab(&self.id).is_some()
	}

	/// Number of commands currently awaiting completion.
	pub fn in_flight(&self) -> usize {
		self.connection.pending_len()
	}

	/// Opens the tab with the default handshake timeout.
	pub async fn open(self: &Arc<Self>) -> Result<Option<String>> {
		self.open_with_timeout(DEFAULT_OPEN_TIMEOUT).await
	}

	/// Issues the `open_tab` handshake.
	///
	/// On success the tab registers itself in the browser's live-tab map
	/// and its id is returned. On timeout the tab stays unregistered and
	/// `Ok(None)` is returned; the caller may retry or discard.
	pub async fn open_with_timeout(self: &Arc<Self>, timeout: Duration) -> Result<Option<String>> {
		match self.post("open_tab", timeout, Map::new()).await? {
			Some(_) => {
				self.browser.register_tab(Arc::clone(self));
				Ok(Some(self.id.clone()))
			}
			None => {
				tracing::debug!(tab_id = %self.id, "open_tab timed out; tab stays unregistered");
				Ok(None)
			}
		}
	}

	/// Closes the tab with the default handshake timeout.
	pub async fn close(&self) -> Result<String> {
		self.close_with_timeout(DEFAULT_CLOSE_TIMEOUT).await
	}

	/// Issues the `close_tab` handshake.
	///
	/// Close is best-effort cleanup: whether the application acknowledges
	/// or the command times out, the tab leaves the live-tab map and its
	/// id is returned. Only a command that could not be sent at all
	/// surfaces as an error - and the tab is deregistered even then.
	pub async fn close_with_timeout(&self, timeout: Duration) -> Result<String> {
		let outcome = self.post("close_tab", timeout, Map::new()).await;
		self.browser.deregister_tab(&self.id);
		outcome.map(|_| self.id.clone())
	}

	/// Runs an agent query with default options and timeout.
	pub async fn query(&self, query: &str) -> Result<QueryResult> {
		self.query_with(query, QueryOptions::default(), DEFAULT_QUERY_TIMEOUT)
			.await
	}

	/// Runs an agent query.
	///
	/// Options are validated and merged with the browser defaults before
	/// anything is published; invalid values fail fast with
	/// [`Error::InvalidArgument`]. Accumulated output from any prior query
	/// is cleared, then the command is posted and partial results stream
	/// into the transcript until the completion arrives or `timeout`
	/// elapses. A timed-out query still returns the fragments gathered
	/// during the wait, with empty completion metadata.
	pub async fn query_with(
		&self,
		query: &str,
		options: QueryOptions,
		timeout: Duration,
	) -> Result<QueryResult> {
		let params = resolve_query(query, &options, self.browser.config())?;

		self.transcript.lock().reset();

		let completion = self.post("query", timeout, params).await?;
		let info = match completion {
			Some(Value::Object(map)) => map,
			Some(_) | None => Map::new(),
		};
		Ok(self.transcript.lock().snapshot_with(info))
	}

	/// Sends a raw command carrying this tab's id and waits for its
	/// correlated completion. Building block for [`open`], [`close`] and
	/// [`query`]; exposed for commands this crate does not model.
	///
	/// [`open`]: Tab::open
	/// [`close`]: Tab::close
	/// [`query`]: Tab::query
	pub async fn post(
		&self,
		command: &str,
		timeout: Duration,
		params: Map<String, Value>,
	) -> Result<Option<Value>> {
		self.connection
			.post(command, Some(&self.id), timeout, params)
			.await
	}
}

/// Merges per-query overrides with browser defaults into the wire shape,
/// rejecting out-of-range values before any bus activity.
fn resolve_query(
	query: &str,
	options: &QueryOptions,
	defaults: &BrowserConfig,
) -> Result<Map<String, Value>> {
	if options.max_steps == Some(0) {
		return Err(Error::InvalidArgument(
			"max_steps must be at least 1".to_string(),
		));
	}
	if options.max_parallelism == Some(0) {
		return Err(Error::InvalidArgument(
			"max_parallelism must be at least 1".to_string(),
		));
	}

	let params = QueryParams {
		query: query.to_string(),
		model: options.model.clone(),
		planner_mode: options.planner_mode.unwrap_or(defaults.planner_mode),
		max_steps: options.max_steps.unwrap_or(defaults.max_steps),
		allow_parallelism: options
			.allow_parallelism
			.unwrap_or(defaults.allow_parallelism),
		max_parallelism: options.max_parallelism.unwrap_or(defaults.max_parallelism),
		allow_replan: options.allow_replan.unwrap_or(defaults.allow_replan),
		test_env: options.test_env.clone().or_else(|| defaults.test_env.clone()),
	};

	match serde_json::to_value(&params)? {
		Value::Object(map) => Ok(map),
		_ => Err(Error::Protocol(
			"query parameters must serialize to an object".to_string(),
		)),
	}
}
