//! Shared helpers: a browser wired to an in-process bus and a scripted
//! stand-in for the Simular application.

use std::sync::Arc;

use serde_json::{Value, json};

use simular::{Browser, BrowserConfig, Bus, Command, LocalBus, Subscription, subscribe_guarded};

pub const TEST_BUNDLE: &str = "ai.simular.test";

/// Opt-in protocol tracing for debugging test runs: set `SIMULAR_LOG=1`.
pub fn init_tracing() {
	if std::env::var_os("SIMULAR_LOG").is_some() {
		let _ = tracing_subscriber::fmt()
			.with_max_level(tracing::Level::DEBUG)
			.try_init();
	}
}

pub fn test_browser(bus: &Arc<LocalBus>) -> Arc<Browser> {
	let bus_dyn: Arc<dyn Bus> = Arc::clone(bus) as Arc<dyn Bus>;
	Browser::with_config(
		"/Applications/SimularBrowser.app",
		bus_dyn,
		TEST_BUNDLE,
		BrowserConfig::default(),
	)
	.expect("default config is valid")
}

/// Subscribes a scripted agent to the command channel. The script receives
/// every parsed command envelope together with a bus handle to reply on.
/// Dropping the returned guard silences the agent.
pub fn spawn_agent(
	bus: &Arc<LocalBus>,
	script: impl Fn(Arc<dyn Bus>, Command) + Send + Sync + 'static,
) -> Subscription {
	let bus_dyn: Arc<dyn Bus> = Arc::clone(bus) as Arc<dyn Bus>;
	let bus_for_script = Arc::clone(&bus_dyn);
	subscribe_guarded(
		&bus_dyn,
		TEST_BUNDLE,
		Arc::new(move |payload| {
			let command: Command =
				serde_json::from_value(payload).expect("well-formed command envelope");
			script(Arc::clone(&bus_for_script), command);
		}),
	)
}

/// Builds a completion payload answering `command`, merging `extra` result
/// fields next to the correlation id.
pub fn completion_payload(command: &Command, extra: Value) -> Value {
	let mut payload = serde_json::Map::new();
	payload.insert("request_id".to_string(), json!(command.request_id));
	if let Value::Object(extra) = extra {
		payload.extend(extra);
	}
	Value::Object(payload)
}
