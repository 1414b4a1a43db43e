//! Error types for the Simular runtime.

use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the Simular runtime.
///
/// Timeouts are deliberately absent: a command that never receives its
/// completion resolves to an empty result, not an error. Callers that
/// need to treat "no result within the deadline" as fatal do so
/// explicitly.
#[derive(Debug, Error)]
pub enum Error {
	/// The application bundle was not found at the configured path.
	#[error("Simular app not found at {0}")]
	AppNotFound(String),

	/// Failed to launch the application process.
	#[error("Failed to launch Simular app: {0}")]
	LaunchFailed(String),

	/// Failure handing a message to the bus; the command was never sent.
	#[error("Bus transport error: {0}")]
	Transport(String),

	/// Malformed or unexpected protocol traffic.
	#[error("Protocol error: {0}")]
	Protocol(String),

	/// Invalid argument provided to a method. Raised before any bus
	/// activity.
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),

	/// The pending slot was torn down before a completion arrived.
	#[error("Completion channel closed unexpectedly")]
	ChannelClosed,

	/// I/O error.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl Error {
	/// Returns true if the command never reached the bus.
	pub fn is_transport(&self) -> bool {
		matches!(self, Error::Transport(_))
	}

	/// Returns true if this is a pre-publish validation failure.
	pub fn is_validation(&self) -> bool {
		matches!(self, Error::InvalidArgument(_))
	}
}
