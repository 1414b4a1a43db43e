//! Wire types for the Simular notification protocol.
//!
//! This crate contains the serde-serializable types exchanged with the
//! Simular application over the broadcast notification bus. These types
//! represent the "protocol layer" - the shapes of data as they appear on
//! the wire.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! - **Pure data**: No behavior beyond serialization/deserialization
//! - **1:1 with the bus payloads**: Match what the application publishes
//! - **Validated at the boundary**: Handlers deserialize into these types
//!   instead of probing raw maps for keys
//!
//! Higher-level ergonomic APIs are built on top of these types in
//! `simular-rs`.

pub mod channels;
pub mod messages;
pub mod options;

pub use messages::{Command, Completion, PartialResult, UserMessage};
pub use options::{
	DEFAULT_CLOSE_TIMEOUT, DEFAULT_OPEN_TIMEOUT, DEFAULT_POST_TIMEOUT, DEFAULT_QUERY_TIMEOUT,
	PlannerMode, QueryOptions, QueryParams,
};
