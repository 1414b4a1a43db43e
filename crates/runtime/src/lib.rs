//! Simular Runtime - Bus transport, correlation, and app lifecycle
//!
//! This crate provides the low-level runtime infrastructure for talking to
//! the Simular application over the broadcast notification bus:
//!
//! - **Bus adapter**: The publish/subscribe seam between this client and
//!   the system-wide transport, plus an in-process broker
//! - **Connection**: Command/completion correlation with timeout-bound
//!   waits
//! - **Launcher**: Starting the application, or detecting a running
//!   instance to signal instead
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │   simular-rs     │  Session objects (Browser, Tab, Conversation)
//! └────────┬─────────┘
//!          │ owns per-session Connections and Subscriptions
//! ┌────────▼─────────┐
//! │ simular-runtime  │  This crate
//! │  ┌────────────┐  │
//! │  │ Connection │  │  correlation id -> pending slot
//! │  └────────────┘  │
//! │  ┌────────────┐  │
//! │  │    Bus     │  │  broadcast publish/subscribe
//! │  └────────────┘  │
//! │  ┌────────────┐  │
//! │  │  Launcher  │  │  process management
//! │  └────────────┘  │
//! └──────────────────┘
//! ```
//!
//! # Decoupling via the Bus trait
//!
//! The system-wide notification transport is platform-owned and externally
//! supplied; the [`Bus`] trait is the seam. [`LocalBus`] is the in-process
//! implementation used by the test suite and by hosts that embed client
//! and agent in one process.
//!
//! [`Bus`]: bus::Bus
//! [`LocalBus`]: bus::LocalBus

pub mod bus;
pub mod connection;
pub mod error;
pub mod launcher;

pub use bus::{Bus, BusHandler, LocalBus, Subscription, SubscriptionId, subscribe_guarded};
pub use connection::Connection;
pub use error::{Error, Result};
pub use launcher::AppLauncher;
