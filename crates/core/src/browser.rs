//! [`Browser`] - shared configuration and the set of live tabs.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;

use simular_protocol::{PlannerMode, UserMessage, channels};
use simular_runtime::{AppLauncher, Bus, Error, Result};

use crate::tab::Tab;

/// Default bus identifier of the Simular application.
pub const SIMULAR_BUNDLE_ID: &str = "com.simular.SimularBrowser";

/// Browser-wide defaults applied to every query that does not override
/// them.
#[derive(Debug, Clone)]
pub struct BrowserConfig {
	pub planner_mode: PlannerMode,
	pub allow_parallelism: bool,
	pub max_parallelism: u32,
	pub max_steps: u32,
	pub allow_replan: bool,
	/// Free-form tag forwarded to test environments.
	pub test_env: Option<String>,
}

impl Default for BrowserConfig {
	fn default() -> Self {
		Self {
			planner_mode: PlannerMode::AgentS1,
			allow_parallelism: false,
			max_parallelism: 4,
			max_steps: 50,
			allow_replan: true,
			test_env: None,
		}
	}
}

impl BrowserConfig {
	/// Sets the planner mode.
	pub fn planner_mode(mut self, mode: PlannerMode) -> Self {
		self.planner_mode = mode;
		self
	}

	/// Enables or disables parallel browsing.
	pub fn allow_parallelism(mut self, allow: bool) -> Self {
		self.allow_parallelism = allow;
		self
	}

	/// Sets the bound on concurrently browsing sessions. Governs sessions,
	/// not commands per session.
	pub fn max_parallelism(mut self, max_parallelism: u32) -> Self {
		self.max_parallelism = max_parallelism;
		self
	}

	/// Sets the agent step bound.
	pub fn max_steps(mut self, max_steps: u32) -> Self {
		self.max_steps = max_steps;
		self
	}

	/// Enables or disables replanning.
	pub fn allow_replan(mut self, allow: bool) -> Self {
		self.allow_replan = allow;
		self
	}

	/// Sets the test-environment tag.
	pub fn test_env(mut self, tag: impl Into<String>) -> Self {
		self.test_env = Some(tag.into());
		self
	}

	/// Rejects out-of-range values before they can reach the wire.
	pub fn validate(&self) -> Result<()> {
		if self.max_parallelism == 0 {
			return Err(Error::InvalidArgument(
				"max_parallelism must be at least 1".to_string(),
			));
		}
		if self.max_steps == 0 {
			return Err(Error::InvalidArgument(
				"max_steps must be at least 1".to_string(),
			));
		}
		Ok(())
	}
}

/// Client handle for one Simular application on the bus.
///
/// Owns the configuration defaults, the shared bus identity that
/// namespaces every channel, and the map of live tabs. Created once per
/// process; tabs register themselves when their open handshake succeeds
/// and deregister when they close. The browser owns no subscriptions of
/// its own - those belong to the tabs and the legacy [`Conversation`].
///
/// [`Conversation`]: crate::Conversation
pub struct Browser {
	bundle_id: String,
	bus: Arc<dyn Bus>,
	launcher: AppLauncher,
	config: BrowserConfig,
	tabs: DashMap<String, Arc<Tab>>,
}

impl Browser {
	/// Creates a browser with the default bundle id and configuration.
	pub fn new(app_path: impl Into<PathBuf>, bus: Arc<dyn Bus>) -> Result<Arc<Self>> {
		Self::with_config(app_path, bus, SIMULAR_BUNDLE_ID, BrowserConfig::default())
	}

	/// Creates a browser with an explicit bundle id and configuration.
	/// The configuration is validated up front.
	pub fn with_config(
		app_path: impl Into<PathBuf>,
		bus: Arc<dyn Bus>,
		bundle_id: impl Into<String>,
		config: BrowserConfig,
	) -> Result<Arc<Self>> {
		config.validate()?;
		let bundle_id = bundle_id.into();
		Ok(Arc::new(Self {
			launcher: AppLauncher::new(app_path.into(), bundle_id.clone()),
			bundle_id,
			bus,
			config,
			tabs: DashMap::new(),
		}))
	}

	pub fn bundle_id(&self) -> &str {
		&self.bundle_id
	}

	pub fn bus(&self) -> &Arc<dyn Bus> {
		&self.bus
	}

	pub fn config(&self) -> &BrowserConfig {
		&self.config
	}

	pub fn app_path(&self) -> &Path {
		self.launcher.app_path()
	}

	/// Number of tabs currently open.
	pub fn tab_count(&self) -> usize {
		self.tabs.len()
	}

	/// Looks up a live tab by id.
	pub fn tab(&self, id: &str) -> Option<Arc<Tab>> {
		self.tabs.get(id).map(|entry| Arc::clone(entry.value()))
	}

	/// Creates a tab and runs its open handshake. Returns `None` if the
	/// application never acknowledged.
	pub async fn open_tab(self: &Arc<Self>) -> Result<Option<Arc<Tab>>> {
		let tab = Tab::new(Arc::clone(self));
		Ok(tab.open().await?.map(|_| tab))
	}

	/// Closes a live tab by id. Returns `None` if no such tab is open.
	pub async fn close_tab(&self, id: &str) -> Result<Option<String>> {
		match self.tab(id) {
			Some(tab) => tab.close().await.map(Some),
			None => {
				tracing::debug!(tab_id = id, "close_tab: no live tab with this id");
				Ok(None)
			}
		}
	}

	/// Runs `query` against the application, launching it if necessary.
	///
	/// If an instance is already running the query is delivered over the
	/// command channel; otherwise the application is launched with the
	/// query as a command-line argument. Fire-and-forget either way -
	/// replies, if any, arrive on the legacy conversation channels.
	pub fn run(&self, query: &str) -> Result<()> {
		if self.launcher.is_running() {
			tracing::debug!("app already running, signalling over the command channel");
			self.bus.publish(
				&channels::command_channel(&self.bundle_id),
				serde_json::to_value(UserMessage::new(query))?,
			)
		} else {
			self.launcher.launch(query)
		}
	}

	pub(crate) fn register_tab(&self, tab: Arc<Tab>) {
		self.tabs.insert(tab.id().to_string(), tab);
	}

	pub(crate) fn deregister_tab(&self, id: &str) {
		if self.tabs.remove(id).is_none() {
			// Expected when close follows a failed or timed-out open.
			tracing::debug!(tab_id = id, "deregister: tab was not in the live map");
		}
	}
}
