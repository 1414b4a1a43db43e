//! Rust client for the Simular agent browser.
//!
//! The Simular application does the browsing and the reasoning; this
//! library drives it from another process by exchanging messages over a
//! broadcast notification bus. Commands go out on a shared channel with a
//! correlation id; partial results stream back on per-tab channels while
//! a command runs; a completion signal resolves the waiting caller.
//!
//! # Example
//!
//! ```ignore
//! use simular::{Browser, LocalBus, Tab};
//!
//! # #[tokio::main]
//! # async fn main() -> simular::Result<()> {
//! let bus = LocalBus::new();
//! let browser = Browser::new("/Applications/SimularBrowser.app", bus)?;
//!
//! let tab = Tab::new(browser.clone());
//! if tab.open().await?.is_some() {
//!     let result = tab.query("what's on hacker news today?").await?;
//!     println!("{:?}", result.final_response());
//!     tab.close().await?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Timeouts are results, not errors: a command that never hears back
//! yields `None` (or an empty [`QueryResult`]), and the session stays
//! usable. See [`Tab::post`] for the underlying send/await primitive.

pub mod browser;
pub mod conversation;
pub mod tab;

mod transcript;

pub use browser::{Browser, BrowserConfig, SIMULAR_BUNDLE_ID};
pub use conversation::Conversation;
pub use simular_protocol::{
	Command, Completion, DEFAULT_CLOSE_TIMEOUT, DEFAULT_OPEN_TIMEOUT, DEFAULT_POST_TIMEOUT,
	DEFAULT_QUERY_TIMEOUT, PartialResult, PlannerMode, QueryOptions, UserMessage, channels,
};
pub use simular_runtime::{
	AppLauncher, Bus, BusHandler, Connection, Error, LocalBus, Result, Subscription,
	subscribe_guarded,
};
pub use tab::Tab;
pub use transcript::QueryResult;
