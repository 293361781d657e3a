//! Memory access micro-benchmarks (`memaccess`)

// Modules
mod args;

// Imports
use {
	self::args::Args,
	anyhow::Context,
	clap::Parser,
	memaccess::{registry, Config, Driver, SystemAllocator},
	memaccess_util::{logger, DisplayWrapper},
	std::fs,
};

fn main() -> Result<(), anyhow::Error> {
	// Get arguments
	let args = Args::parse();
	logger::pre_init::debug(format!("Args: {args:?}"));

	// Initialize logging
	logger::init(args.log_file.as_deref(), args.log_file_append);

	// Read the config file, if any
	let config = match &args.config_file {
		Some(config_path) => {
			let config_file = fs::File::open(config_path).context("Unable to open config file")?;
			serde_json::from_reader::<_, Config>(config_file).context("Unable to parse config file")?
		},
		None => Config::default(),
	};
	config.validate().context("Invalid config")?;
	tracing::debug!(?config, "Config");

	// Then select all cases
	let mut cases = registry::cases(&SystemAllocator, &config);
	cases.retain(|case| registry::matches_filters(&case.id().to_string(), &args.filters));
	if args.list {
		for case in &cases {
			println!("{}", case.id());
		}
		return Ok(());
	}
	anyhow::ensure!(!cases.is_empty(), "No cases matched filters {:?}", args.filters);

	let case_time = config.warmup.total_time() + config.measurement.total_time();
	tracing::info!(
		"Running {} cases, taking at least {:.1}s",
		cases.len(),
		case_time.as_secs_f64() * cases.len() as f64
	);

	// Run them all
	let driver = Driver::new(config);
	let report = driver.run(&cases);

	println!("{}", DisplayWrapper::new(|f| report.fmt_table(f)));
	if !report.failures.is_empty() {
		println!("Failed cases:");
		println!("{}", DisplayWrapper::new(|f| report.fmt_failures(f)));
	}

	if let Some(output_path) = &args.output_file {
		let output_file = fs::File::create(output_path).context("Unable to create output file")?;
		serde_json::to_writer_pretty(output_file, &report).context("Unable to write to output file")?;
	}

	Ok(())
}
