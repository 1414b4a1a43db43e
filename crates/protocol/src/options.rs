//! Option types for browser configuration and queries.
//!
//! Per-query options follow the builder-method pattern: every field is
//! optional, `None` falls back to the browser-wide default at send time,
//! and absent fields never reach the wire.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default timeout for a generic command round-trip.
pub const DEFAULT_POST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for the open handshake.
pub const DEFAULT_OPEN_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for the close handshake. Shorter than open: close is
/// best-effort cleanup and callers should not hang on it.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for a full agent query. Agent runs routinely take
/// minutes, so this is deliberately generous.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(600);

/// Planning strategy the agent uses for a query.
///
/// The set of accepted values depends on the installed application
/// version; [`parse`] rejects anything outside the known set before it
/// can be published.
///
/// [`parse`]: PlannerMode::parse
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlannerMode {
	#[default]
	AgentS1,
	AgentS2,
}

impl PlannerMode {
	/// Parses a wire-format mode name. Returns `None` for unknown values.
	pub fn parse(name: &str) -> Option<Self> {
		match name {
			"agent_s1" => Some(Self::AgentS1),
			"agent_s2" => Some(Self::AgentS2),
			_ => None,
		}
	}

	/// The wire-format name of this mode.
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::AgentS1 => "agent_s1",
			Self::AgentS2 => "agent_s2",
		}
	}
}

/// Per-query overrides for the browser-wide defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryOptions {
	/// Model the agent should answer with.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub model: Option<String>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub planner_mode: Option<PlannerMode>,

	/// Upper bound on agent steps for this query.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub max_steps: Option<u32>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub allow_parallelism: Option<bool>,

	/// Upper bound on concurrently browsing sessions.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub max_parallelism: Option<u32>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub allow_replan: Option<bool>,

	/// Free-form tag forwarded to test environments.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub test_env: Option<String>,
}

impl QueryOptions {
	/// Creates new default options.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the model.
	pub fn model(mut self, model: impl Into<String>) -> Self {
		self.model = Some(model.into());
		self
	}

	/// Sets the planner mode.
	pub fn planner_mode(mut self, mode: PlannerMode) -> Self {
		self.planner_mode = Some(mode);
		self
	}

	/// Sets the step bound.
	pub fn max_steps(mut self, max_steps: u32) -> Self {
		self.max_steps = Some(max_steps);
		self
	}

	/// Enables or disables parallel browsing.
	pub fn allow_parallelism(mut self, allow: bool) -> Self {
		self.allow_parallelism = Some(allow);
		self
	}

	/// Sets the parallel-session bound.
	pub fn max_parallelism(mut self, max_parallelism: u32) -> Self {
		self.max_parallelism = Some(max_parallelism);
		self
	}

	/// Enables or disables replanning.
	pub fn allow_replan(mut self, allow: bool) -> Self {
		self.allow_replan = Some(allow);
		self
	}

	/// Sets the test-environment tag.
	pub fn test_env(mut self, tag: impl Into<String>) -> Self {
		self.test_env = Some(tag.into());
		self
	}
}

/// Fully-resolved query parameters as they go on the wire, after per-query
/// overrides have been merged with the browser defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryParams {
	pub query: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub model: Option<String>,
	pub planner_mode: PlannerMode,
	pub max_steps: u32,
	pub allow_parallelism: bool,
	pub max_parallelism: u32,
	pub allow_replan: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub test_env: Option<String>,
}
