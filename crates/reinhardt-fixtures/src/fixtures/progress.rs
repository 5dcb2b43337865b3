//! Progress reporting for fixture loads.

use indicatif::{ProgressBar, ProgressStyle};

const PROGRESS_TEMPLATE: &str = "{msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})";

/// Observer notified while fixtures load.
///
/// Sinks are purely observational. They are shared across concurrently
/// loading fixtures, so every method takes `&self`.
pub trait LoadProgress: Send + Sync {
	/// Called once with the number of fixtures about to load.
	fn start(&self, total: u64);

	/// Called before a fixture starts loading.
	fn describe(&self, fixture: &str);

	/// Called after a fixture finished loading.
	fn advance(&self);

	/// Called once after the last fixture loaded.
	fn finish(&self);
}

/// Terminal progress bar backed by [`indicatif`].
#[derive(Debug, Clone)]
pub struct ProgressBarReporter {
	bar: ProgressBar,
}

impl ProgressBarReporter {
	/// Creates a reporter drawing to stderr.
	pub fn new() -> Self {
		Self::with_bar(ProgressBar::new(0))
	}

	/// Creates a reporter drawing through an existing bar.
	pub fn with_bar(bar: ProgressBar) -> Self {
		let style = ProgressStyle::default_bar()
			.template(PROGRESS_TEMPLATE)
			.unwrap_or_else(|_| ProgressStyle::default_bar())
			.progress_chars("#>-");
		bar.set_style(style);
		Self { bar }
	}

	/// The underlying bar.
	pub fn bar(&self) -> &ProgressBar {
		&self.bar
	}
}

impl Default for ProgressBarReporter {
	fn default() -> Self {
		Self::new()
	}
}

impl LoadProgress for ProgressBarReporter {
	fn start(&self, total: u64) {
		self.bar.set_length(total);
		self.bar.set_position(0);
		self.bar.set_message("Loading fixtures");
	}

	fn describe(&self, fixture: &str) {
		self.bar.set_message(format!("Loading {}", fixture));
	}

	fn advance(&self) {
		self.bar.inc(1);
	}

	fn finish(&self) {
		self.bar.finish_with_message("Done");
	}
}
