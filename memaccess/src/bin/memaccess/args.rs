//! Arguments

// Imports
use std::path::PathBuf;

/// Arguments
#[derive(Debug)]
#[derive(clap::Parser)]
#[clap(about = "Compares ways of reading and writing `i32`s in native memory")]
pub struct Args {
	/// Log file
	///
	/// Specifies a file to perform verbose logging to.
	/// You can use `RUST_LOG_FILE` to set filtering options
	#[clap(long = "log-file")]
	pub log_file: Option<PathBuf>,

	/// Whether to append to the log file
	#[clap(long = "log-file-append")]
	pub log_file_append: bool,

	/// Config file
	///
	/// Json file with the warmup / measurement iterations and region sizes.
	/// Any missing values use their defaults.
	#[clap(long = "config")]
	pub config_file: Option<PathBuf>,

	/// Filters
	///
	/// Only runs cases whose name contains any of these.
	#[clap(long = "filter")]
	pub filters: Vec<String>,

	/// Lists all selected cases, without running them
	#[clap(long = "list")]
	pub list: bool,

	/// Output file
	///
	/// Writes the run report as json.
	#[clap(long = "output")]
	pub output_file: Option<PathBuf>,
}
