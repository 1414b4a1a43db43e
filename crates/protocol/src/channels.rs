//! Channel name derivation.
//!
//! Every channel is namespaced by the application's bus identifier; the
//! per-tab channels additionally embed the tab id, so deliveries for one
//! tab can never land in another.

/// Global command channel shared by every session: the bus identifier
/// itself. Commands published here carry their own addressing
/// (`request_id`, optional `tab_id`).
pub fn command_channel(bundle_id: &str) -> String {
	bundle_id.to_string()
}

/// Per-tab channel for partial results streamed while a command runs.
pub fn tab_request_channel(bundle_id: &str, tab_id: &str) -> String {
	format!("{bundle_id}.tab_request.{tab_id}")
}

/// Per-tab channel for completion signals.
pub fn tab_completion_channel(bundle_id: &str, tab_id: &str) -> String {
	format!("{bundle_id}.tab_completion.{tab_id}")
}

/// Whole-browser partial-result channel, used by the single global
/// conversation when no per-tab multiplexing is needed.
pub fn response_channel(bundle_id: &str) -> String {
	format!("{bundle_id}.response")
}

/// Whole-browser completion channel, counterpart of [`response_channel`].
pub fn completed_channel(bundle_id: &str) -> String {
	format!("{bundle_id}.completed")
}
