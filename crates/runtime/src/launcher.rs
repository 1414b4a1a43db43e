//! Simular application process control.
//!
//! Launching passes the initial query on the command line; once an
//! instance is up, further work is delivered over the command channel
//! instead. The launcher only establishes the precondition for using the
//! channels - it takes no part in the protocol itself.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{Error, Result};

/// Launches the Simular application, or detects a running instance to
/// signal over the bus instead.
pub struct AppLauncher {
	app_path: PathBuf,
	bundle_id: String,
}

impl AppLauncher {
	pub fn new(app_path: impl Into<PathBuf>, bundle_id: impl Into<String>) -> Self {
		Self {
			app_path: app_path.into(),
			bundle_id: bundle_id.into(),
		}
	}

	pub fn app_path(&self) -> &Path {
		&self.app_path
	}

	/// Returns true if an instance of the application is already running.
	///
	/// Matches on the bundle identifier, which covers both direct binaries
	/// and `open`-launched app bundles.
	pub fn is_running(&self) -> bool {
		Command::new("pgrep")
			.arg("-f")
			.arg(&self.bundle_id)
			.stdout(Stdio::null())
			.stderr(Stdio::null())
			.status()
			.map(|status| status.success())
			.unwrap_or(false)
	}

	/// Launches the application with `query` as its initial argument.
	///
	/// # Errors
	///
	/// Returns [`Error::AppNotFound`] if nothing exists at the configured
	/// path, and [`Error::LaunchFailed`] if the spawn itself fails.
	pub fn launch(&self, query: &str) -> Result<()> {
		if !self.app_path.exists() {
			return Err(Error::AppNotFound(self.app_path.display().to_string()));
		}

		tracing::debug!(app = %self.app_path.display(), "launching app with initial query");
		let status = Command::new("open")
			.arg(&self.app_path)
			.arg("--args")
			.arg("--query")
			.arg(query)
			.status()
			.map_err(|e| Error::LaunchFailed(format!("failed to spawn open: {e}")))?;

		if !status.success() {
			return Err(Error::LaunchFailed(format!("open exited with {status}")));
		}
		Ok(())
	}
}
