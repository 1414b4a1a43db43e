//! Bus adapter: the publish/subscribe seam to the system-wide transport.
//!
//! The Simular application listens and replies on a broadcast notification
//! bus owned by the platform. This module defines the contract the rest of
//! the client programs against, RAII subscription guards, and [`LocalBus`],
//! an in-process broker for tests and single-process embeddings.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::Result;

/// Unique identifier for one bus registration.
pub type SubscriptionId = u64;

static NEXT_SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(1);

/// Returns a new process-unique subscription id.
pub fn next_subscription_id() -> SubscriptionId {
	NEXT_SUBSCRIPTION_ID.fetch_add(1, Ordering::SeqCst)
}

/// Callback invoked once per message delivered on a subscribed channel.
///
/// Handlers may run on a different execution context than the subscriber's,
/// so any state they touch needs its own mutual exclusion.
pub type BusHandler = Arc<dyn Fn(Value) + Send + Sync>;

/// System-wide publish/subscribe transport.
///
/// Delivery is fire-and-forget: no acknowledgment, no cross-channel
/// ordering. Within one channel, deliveries to one subscriber are FIFO,
/// matching the underlying transport's guarantee.
pub trait Bus: Send + Sync {
	/// Publishes `payload` on `channel` to all current subscribers.
	///
	/// An error means the message never left this process; "sent but no
	/// reply" is a different situation and is handled by the caller's
	/// timeout.
	fn publish(&self, channel: &str, payload: Value) -> Result<()>;

	/// Registers `handler` for every message published on `channel`.
	fn subscribe(&self, channel: &str, handler: BusHandler) -> SubscriptionId;

	/// Releases one registration. Safe to call with ids that were already
	/// released or never existed.
	fn unsubscribe(&self, id: SubscriptionId);
}

/// RAII guard for one bus registration.
///
/// Dropping the guard releases the registration, so a session that is
/// discarded - open, closed, or never opened - cannot keep receiving
/// deliveries into dead state. Holds a weak reference to the bus, so
/// dropping after the bus itself is gone is a no-op.
pub struct Subscription {
	id: SubscriptionId,
	bus: Weak<dyn Bus>,
}

impl Subscription {
	pub fn new(id: SubscriptionId, bus: &Arc<dyn Bus>) -> Self {
		Self {
			id,
			bus: Arc::downgrade(bus),
		}
	}

	/// The registration this guard owns.
	pub fn id(&self) -> SubscriptionId {
		self.id
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		if let Some(bus) = self.bus.upgrade() {
			bus.unsubscribe(self.id);
		}
	}
}

/// Subscribes and wraps the registration in a [`Subscription`] guard.
pub fn subscribe_guarded(bus: &Arc<dyn Bus>, channel: &str, handler: BusHandler) -> Subscription {
	let id = bus.subscribe(channel, handler);
	Subscription::new(id, bus)
}

/// Per-channel subscriber table. [`IndexMap`] keeps registration order
/// stable so fan-out is deterministic, with O(1) removal.
type ChannelSubscribers = IndexMap<SubscriptionId, BusHandler>;

/// In-process broker implementing [`Bus`].
///
/// Fan-out runs synchronously on the publisher's thread, which preserves
/// FIFO order per channel per subscriber. Handlers are invoked outside the
/// registry lock, so a handler may publish back onto the bus without
/// deadlocking - the test suite's scripted agents rely on this.
#[derive(Default)]
pub struct LocalBus {
	channels: Mutex<HashMap<String, ChannelSubscribers>>,
}

impl LocalBus {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	/// Number of live registrations on `channel`.
	pub fn subscriber_count(&self, channel: &str) -> usize {
		self.channels
			.lock()
			.get(channel)
			.map(IndexMap::len)
			.unwrap_or(0)
	}
}

impl Bus for LocalBus {
	fn publish(&self, channel: &str, payload: Value) -> Result<()> {
		let handlers: Vec<BusHandler> = {
			let channels = self.channels.lock();
			channels
				.get(channel)
				.map(|subscribers| subscribers.values().cloned().collect())
				.unwrap_or_default()
		};

		tracing::trace!(channel, subscribers = handlers.len(), "publishing");
		for handler in handlers {
			handler(payload.clone());
		}
		Ok(())
	}

	fn subscribe(&self, channel: &str, handler: BusHandler) -> SubscriptionId {
		let id = next_subscription_id();
		self.channels
			.lock()
			.entry(channel.to_string())
			.or_default()
			.insert(id, handler);
		id
	}

	fn unsubscribe(&self, id: SubscriptionId) {
		let mut channels = self.channels.lock();
		channels.retain(|_, subscribers| {
			subscribers.shift_remove(&id);
			!subscribers.is_empty()
		});
	}
}
