//! Configuration

// Imports
use {
	crate::region::{DEFAULT_REGION_SIZE, INT_SIZE},
	anyhow::Context,
	std::time::Duration,
};

/// Default number of elements each case touches
pub const DEFAULT_ELEMENT_COUNT: usize = 1024;

/// Configuration
#[derive(Clone, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Config {
	/// Warmup iterations
	pub warmup: IterationConfig,

	/// Measurement iterations
	pub measurement: IterationConfig,

	/// Region size, in bytes
	pub region_size: usize,

	/// Number of `i32` elements each invocation reads or writes
	pub element_count: usize,
}

impl Config {
	/// Validates this configuration
	pub fn validate(&self) -> Result<(), anyhow::Error> {
		anyhow::ensure!(self.measurement.iterations > 0, "Must have at least 1 measurement iteration");
		self.warmup.validate_time().context("Invalid warmup time")?;
		self.measurement.validate_time().context("Invalid measurement time")?;

		anyhow::ensure!(self.region_size > 0, "Region size must not be 0");
		let elements_size = self
			.element_count
			.checked_mul(INT_SIZE)
			.context("Element count is too large")?;
		anyhow::ensure!(
			elements_size <= self.region_size,
			"{} elements ({elements_size} bytes) don't fit in a region of {} bytes",
			self.element_count,
			self.region_size,
		);

		Ok(())
	}
}

impl Default for Config {
	fn default() -> Self {
		Self {
			warmup:        IterationConfig::default(),
			measurement:   IterationConfig::default(),
			region_size:   DEFAULT_REGION_SIZE,
			element_count: DEFAULT_ELEMENT_COUNT,
		}
	}
}

/// Iteration configuration
#[derive(Clone, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct IterationConfig {
	/// Number of iterations
	pub iterations: usize,

	/// Duration of each iteration (in seconds)
	pub time_secs: f64,
}

impl IterationConfig {
	/// Returns the duration of each iteration
	///
	/// # Panics
	/// Panics if the duration is negative or not finite. See [`Config::validate`].
	pub fn time(&self) -> Duration {
		Duration::from_secs_f64(self.time_secs)
	}

	/// Returns the minimum total time these iterations take
	pub fn total_time(&self) -> Duration {
		self.time() * u32::try_from(self.iterations).unwrap_or(u32::MAX)
	}

	/// Validates the iteration time
	fn validate_time(&self) -> Result<(), anyhow::Error> {
		anyhow::ensure!(
			self.time_secs.is_finite() && self.time_secs > 0.0,
			"Iteration time must be positive, found {}",
			self.time_secs
		);
		Duration::try_from_secs_f64(self.time_secs).context("Iteration time is too long")?;

		Ok(())
	}
}

impl Default for IterationConfig {
	fn default() -> Self {
		Self {
			iterations: 5,
			time_secs:  5.0,
		}
	}
}
