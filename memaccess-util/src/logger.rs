//! Logger
//!
//! Logs to stderr, filtered by `RUST_LOG` (defaults to `info`), and optionally
//! to a file, filtered by `RUST_LOG_FILE` (defaults to `debug`).

// Imports
use {
	std::{fs, io, path::Path, sync::Mutex},
	tracing::metadata::LevelFilter,
	tracing_subscriber::{fmt, prelude::*, EnvFilter},
};

/// Initializes the logger.
///
/// Any messages logged with [`pre_init`] before this call are emitted afterwards.
/// If the logger was already initialized, this only emits a warning.
pub fn init(log_file: Option<&Path>, log_file_append: bool) {
	let term_layer = fmt::layer()
		.with_writer(io::stderr)
		.with_filter(self::env_filter("RUST_LOG", LevelFilter::INFO));

	let file_layer = log_file.and_then(|log_file| match self::open_log_file(log_file, log_file_append) {
		Ok(file) => Some(
			fmt::layer()
				.with_ansi(false)
				.with_writer(Mutex::new(file))
				.with_filter(self::env_filter("RUST_LOG_FILE", LevelFilter::DEBUG)),
		),
		Err(err) => {
			pre_init::warn(format!("Unable to open log file {log_file:?}: {err}"));
			None
		},
	});

	if let Err(err) = tracing_subscriber::registry()
		.with(term_layer)
		.with(file_layer)
		.try_init()
	{
		pre_init::warn(format!("Unable to initialize logger: {err}"));
	}

	for (level, msg) in pre_init::take() {
		match level {
			pre_init::Level::Debug => tracing::debug!("{msg}"),
			pre_init::Level::Warn => tracing::warn!("{msg}"),
		}
	}
}

/// Creates an env filter from `var`, defaulting to `default`
fn env_filter(var: &str, default: LevelFilter) -> EnvFilter {
	EnvFilter::builder()
		.with_default_directive(default.into())
		.with_env_var(var)
		.from_env_lossy()
}

/// Opens the log file
fn open_log_file(path: &Path, append: bool) -> Result<fs::File, io::Error> {
	let mut options = fs::OpenOptions::new();
	match append {
		true => options.append(true),
		false => options.write(true).truncate(true),
	};
	options.create(true).open(path)
}

/// Logging before the logger is initialized
pub mod pre_init {
	// Imports
	use std::sync::Mutex;

	/// Level of a pending message
	#[derive(PartialEq, Eq, Clone, Copy, Debug)]
	pub enum Level {
		Debug,
		Warn,
	}

	/// Messages pending until the logger is initialized
	static PENDING: Mutex<Vec<(Level, String)>> = Mutex::new(Vec::new());

	/// Logs a debug message once the logger is initialized
	pub fn debug(msg: impl Into<String>) {
		self::push(Level::Debug, msg.into());
	}

	/// Logs a warning once the logger is initialized
	pub fn warn(msg: impl Into<String>) {
		self::push(Level::Warn, msg.into());
	}

	fn push(level: Level, msg: String) {
		// Note: A poisoned lock only means someone panicked while pushing, the messages are still fine
		PENDING
			.lock()
			.unwrap_or_else(|err| err.into_inner())
			.push((level, msg));
	}

	/// Takes all pending messages
	pub(super) fn take() -> Vec<(Level, String)> {
		std::mem::take(&mut *PENDING.lock().unwrap_or_else(|err| err.into_inner()))
	}

}
