//! End-to-end exercises of the command/completion protocol over the
//! in-process bus, with a scripted agent standing in for the application.

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{Map, Value, json};

use simular::{Bus, BusHandler, Error, LocalBus, Result, Tab, channels};

use common::{TEST_BUNDLE, completion_payload, spawn_agent, test_browser};

#[tokio::test]
async fn completed_command_returns_info_and_clears_pending() -> anyhow::Result<()> {
	common::init_tracing();
	let bus = LocalBus::new();
	let browser = test_browser(&bus);

	// Agent answers every command 100ms later.
	let _agent = spawn_agent(&bus, |bus, command| {
		let channel =
			channels::tab_completion_channel(TEST_BUNDLE, command.tab_id.as_deref().unwrap());
		let payload = completion_payload(&command, json!({"response": "pong"}));
		tokio::spawn(async move {
			tokio::time::sleep(Duration::from_millis(100)).await;
			bus.publish(&channel, payload).unwrap();
		});
	});

	let tab = Tab::new(browser);
	let started = Instant::now();
	let mut params = Map::new();
	params.insert("query".to_string(), json!("ping"));
	let info = tab
		.post("query", Duration::from_secs(1), params)
		.await?
		.expect("completion arrived well before the deadline");

	assert_eq!(info["response"], "pong");
	// Resolved by the delivery, not by the 1s deadline.
	assert!(started.elapsed() < Duration::from_millis(900));
	assert_eq!(tab.in_flight(), 0);
	Ok(())
}

#[tokio::test]
async fn unanswered_command_times_out_to_none() -> anyhow::Result<()> {
	let bus = LocalBus::new();
	let browser = test_browser(&bus);
	let tab = Tab::new(browser);

	let started = Instant::now();
	let result = tab
		.post("query", Duration::from_millis(200), Map::new())
		.await?;

	assert!(result.is_none());
	let elapsed = started.elapsed();
	assert!(elapsed >= Duration::from_millis(200));
	assert!(elapsed < Duration::from_millis(800), "deadline overshot: {elapsed:?}");
	assert_eq!(tab.in_flight(), 0);
	Ok(())
}

#[tokio::test]
async fn unmatched_completion_is_dropped_quietly() -> anyhow::Result<()> {
	let bus = LocalBus::new();
	let browser = test_browser(&bus);
	let tab = Tab::new(browser);

	let channel = channels::tab_completion_channel(TEST_BUNDLE, tab.id());
	bus.publish(
		&channel,
		json!({"request_id": "nobody-waits-for-this", "response": "late"}),
	)?;

	assert_eq!(tab.in_flight(), 0);
	// The tab is still fully usable afterwards.
	let result = tab
		.post("query", Duration::from_millis(100), Map::new())
		.await?;
	assert!(result.is_none());
	Ok(())
}

#[tokio::test]
async fn late_completion_after_timeout_is_dropped() -> anyhow::Result<()> {
	let bus = LocalBus::new();
	let browser = test_browser(&bus);

	// Agent replies long after the caller's deadline.
	let _agent = spawn_agent(&bus, |bus, command| {
		let channel =
			channels::tab_completion_channel(TEST_BUNDLE, command.tab_id.as_deref().unwrap());
		let payload = completion_payload(&command, json!({"response": "too late"}));
		tokio::spawn(async move {
			tokio::time::sleep(Duration::from_millis(250)).await;
			bus.publish(&channel, payload).unwrap();
		});
	});

	let tab = Tab::new(browser);
	let result = tab
		.post("query", Duration::from_millis(100), Map::new())
		.await?;
	assert!(result.is_none());

	// Let the late delivery land; it must find no pending slot and vanish.
	tokio::time::sleep(Duration::from_millis(300)).await;
	assert_eq!(tab.in_flight(), 0);
	Ok(())
}

#[tokio::test]
async fn partials_accumulate_in_order_and_reset_per_query() -> anyhow::Result<()> {
	let bus = LocalBus::new();
	let browser = test_browser(&bus);

	// Agent streams two fragments, then completes.
	let _agent = spawn_agent(&bus, |bus, command| {
		let tab_id = command.tab_id.clone().unwrap();
		let request_channel = channels::tab_request_channel(TEST_BUNDLE, &tab_id);
		let completion_channel = channels::tab_completion_channel(TEST_BUNDLE, &tab_id);
		let query = command.params["query"].as_str().unwrap_or_default().to_string();
		let payload = completion_payload(&command, json!({"steps": 2}));
		bus.publish(&request_channel, json!({"message": format!("working on {query}")}))
			.unwrap();
		bus.publish(&request_channel, json!({"response": format!("answer to {query}")}))
			.unwrap();
		bus.publish(&completion_channel, payload).unwrap();
	});

	let tab = Tab::new(browser);

	let first = tab.query("one").await?;
	assert_eq!(
		first.responses,
		vec!["working on one".to_string(), "answer to one".to_string()]
	);
	assert_eq!(first.info["steps"], 2);
	assert_eq!(first.final_response(), Some("answer to one"));

	// A second query must not see the first query's fragments.
	let second = tab.query("two").await?;
	assert_eq!(
		second.responses,
		vec!["working on two".to_string(), "answer to two".to_string()]
	);
	assert_eq!(tab.in_flight(), 0);
	Ok(())
}

#[tokio::test]
async fn timed_out_query_keeps_fragments_gathered_during_the_wait() -> anyhow::Result<()> {
	let bus = LocalBus::new();
	let browser = test_browser(&bus);

	// Agent streams a fragment but never completes.
	let _agent = spawn_agent(&bus, |bus, command| {
		let channel =
			channels::tab_request_channel(TEST_BUNDLE, command.tab_id.as_deref().unwrap());
		bus.publish(&channel, json!({"message": "got partway"})).unwrap();
	});

	let tab = Tab::new(browser);
	let result = tab
		.query_with("stalling", Default::default(), Duration::from_millis(150))
		.await?;

	assert_eq!(result.responses, vec!["got partway".to_string()]);
	assert!(result.info.is_empty());
	assert_eq!(tab.in_flight(), 0);
	Ok(())
}

#[tokio::test]
async fn concurrent_tabs_do_not_interfere() -> anyhow::Result<()> {
	let bus = LocalBus::new();
	let browser = test_browser(&bus);

	// Agent echoes each tab's own id back as the response.
	let _agent = spawn_agent(&bus, |bus, command| {
		let tab_id = command.tab_id.clone().unwrap();
		let channel = channels::tab_completion_channel(TEST_BUNDLE, &tab_id);
		let payload = completion_payload(&command, json!({"response": tab_id}));
		tokio::spawn(async move {
			tokio::time::sleep(Duration::from_millis(50)).await;
			bus.publish(&channel, payload).unwrap();
		});
	});

	let first = Tab::new(Arc::clone(&browser));
	let second = Tab::new(Arc::clone(&browser));

	let (a, b) = tokio::join!(
		first.post("query", Duration::from_secs(1), Map::new()),
		second.post("query", Duration::from_secs(1), Map::new()),
	);

	assert_eq!(a?.unwrap()["response"], first.id());
	assert_eq!(b?.unwrap()["response"], second.id());
	assert_eq!(first.in_flight(), 0);
	assert_eq!(second.in_flight(), 0);
	Ok(())
}

#[tokio::test]
async fn publish_failure_surfaces_as_transport_error_without_leaking() -> anyhow::Result<()> {
	struct DeadBus;
	impl Bus for DeadBus {
		fn publish(&self, _channel: &str, _payload: Value) -> Result<()> {
			Err(Error::Transport("bridge down".to_string()))
		}
		fn subscribe(&self, _channel: &str, _handler: BusHandler) -> u64 {
			0
		}
		fn unsubscribe(&self, _id: u64) {}
	}

	let bus: Arc<dyn Bus> = Arc::new(DeadBus);
	let browser = simular::Browser::with_config(
		"/Applications/SimularBrowser.app",
		bus,
		TEST_BUNDLE,
		Default::default(),
	)?;
	let tab = Tab::new(browser);

	let err = tab
		.post("query", Duration::from_secs(1), Map::new())
		.await
		.unwrap_err();
	assert!(err.is_transport());
	assert_eq!(tab.in_flight(), 0);
	Ok(())
}

#[tokio::test]
async fn streamed_images_are_decoded_in_delivery_order() -> anyhow::Result<()> {
	use base64::Engine as _;
	use base64::engine::general_purpose::STANDARD;

	let bus = LocalBus::new();
	let browser = test_browser(&bus);

	// Agent streams two screenshots, then completes.
	let _agent = spawn_agent(&bus, |bus, command| {
		let tab_id = command.tab_id.clone().unwrap();
		let request_channel = channels::tab_request_channel(TEST_BUNDLE, &tab_id);
		bus.publish(
			&request_channel,
			json!({"image": STANDARD.encode(b"frame-1")}),
		)
		.unwrap();
		bus.publish(
			&request_channel,
			json!({"image": STANDARD.encode(b"frame-2")}),
		)
		.unwrap();
		bus.publish(
			&channels::tab_completion_channel(TEST_BUNDLE, &tab_id),
			completion_payload(&command, json!({})),
		)
		.unwrap();
	});

	let tab = Tab::new(browser);
	let result = tab.query("screenshot please").await?;

	assert_eq!(result.images, vec![b"frame-1".to_vec(), b"frame-2".to_vec()]);
	Ok(())
}

#[tokio::test]
async fn dropping_a_tab_releases_its_subscriptions() -> anyhow::Result<()> {
	let bus = LocalBus::new();
	let browser = test_browser(&bus);

	let tab = Tab::new(browser);
	let request_channel = channels::tab_request_channel(TEST_BUNDLE, tab.id());
	let completion_channel = channels::tab_completion_channel(TEST_BUNDLE, tab.id());
	assert_eq!(bus.subscriber_count(&request_channel), 1);
	assert_eq!(bus.subscriber_count(&completion_channel), 1);

	drop(tab);
	assert_eq!(bus.subscriber_count(&request_channel), 0);
	assert_eq!(bus.subscriber_count(&completion_channel), 0);
	Ok(())
}
