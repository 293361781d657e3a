//! Benchmark driver

// Imports
use {
	crate::{
		case::{Case, CaseError, CaseId, Context},
		config::Config,
		sink::Sink,
	},
	anyhow::Context as _,
	itertools::Itertools,
	std::{
		fmt,
		time::{Duration, Instant},
	},
};

/// Benchmark driver.
///
/// Runs cases one at a time, to completion.
#[derive(Debug)]
pub struct Driver {
	/// Configuration
	config: Config,
}

impl Driver {
	/// Creates a new driver
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Returns the configuration
	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Runs all cases.
	///
	/// Cases that fail don't stop the remaining cases from running.
	pub fn run(&self, cases: &[Box<dyn Case>]) -> RunReport {
		let mut report = RunReport::default();
		for case in cases {
			match self.run_case(case.as_ref()) {
				Ok(result) => report.results.push(result),
				Err(failure) => {
					tracing::warn!(case = %failure.case, stage = ?failure.stage, "Case failed: {}", failure.cause);
					report.failures.push(failure);
				},
			}
		}

		report
	}

	/// Runs a single case
	pub fn run_case(&self, case: &dyn Case) -> Result<TimingResult, CaseFailure> {
		let id = case.id();
		let mut ctx = Context::new();
		let mut sink = Sink::new();
		let mut state = CaseState::Defined;
		tracing::debug!(case = %id, ?state, "Running case");

		case.setup(&mut ctx)
			.map_err(|err| CaseFailure::new(id, FailureStage::Setup, err))?;

		// Note: Whatever happens during the timed body, we still need to tear down
		//       the case, so that any region acquired during setup is released.
		let res = self.run_phases(case, &mut ctx, &mut sink, &mut state);
		let teardown_res = case.teardown(&mut ctx);
		tracing::trace!(case = %id, consumed = sink.consumed(), last = ?sink.last(), "Sink");

		let result = res.map_err(|err| CaseFailure::new(id, FailureStage::Body, err))?;
		teardown_res.map_err(|err| CaseFailure::new(id, FailureStage::Teardown, err))?;

		Ok(result)
	}

	/// Runs the warmup and measurement phases of a case
	fn run_phases(
		&self,
		case: &dyn Case,
		ctx: &mut Context,
		sink: &mut Sink,
		state: &mut CaseState,
	) -> Result<TimingResult, CaseError> {
		let id = case.id();

		state.advance(id);
		for iteration_idx in 0..self.config.warmup.iterations {
			let sample = self::run_iteration(case, ctx, sink, self.config.warmup.time())
				.with_context(|| format!("Unable to run warmup iteration {}", iteration_idx + 1))?;
			tracing::info!(
				"{id}: Warmup iteration {:>2}/{}: {:.3} ns/op",
				iteration_idx + 1,
				self.config.warmup.iterations,
				sample.ns_per_op()
			);
		}

		state.advance(id);
		let samples = (0..self.config.measurement.iterations)
			.map(|iteration_idx| {
				let sample = self::run_iteration(case, ctx, sink, self.config.measurement.time())
					.with_context(|| format!("Unable to run measurement iteration {}", iteration_idx + 1))?;
				tracing::info!(
					"{id}: Iteration {:>2}/{}: {:.3} ns/op",
					iteration_idx + 1,
					self.config.measurement.iterations,
					sample.ns_per_op()
				);

				Ok::<_, anyhow::Error>(sample)
			})
			.collect::<Result<Vec<_>, _>>()?;

		state.advance(id);
		let result = TimingResult::from_samples(id.clone(), &samples);
		tracing::debug!(?result, "Reported case");

		Ok(result)
	}
}

/// Fraction of an iteration's duration a single batch may take
const MAX_BATCH_FRACTION: u32 = 64;

/// Runs a single iteration of `case`, invoking it until `duration` has elapsed.
///
/// Invocations are made in batches, only reading the clock after each batch.
/// Batches double in size until one would take more than `1 / MAX_BATCH_FRACTION`
/// of `duration`.
fn run_iteration(
	case: &dyn Case,
	ctx: &mut Context,
	sink: &mut Sink,
	duration: Duration,
) -> Result<IterationSample, CaseError> {
	let max_batch_time = duration / MAX_BATCH_FRACTION;
	let start_time = Instant::now();
	let mut invocations = 0;
	let mut clock_reads = 0;
	let mut batch_size = 1u64;
	loop {
		for _ in 0..batch_size {
			case.invoke(ctx, sink)?;
		}
		invocations += batch_size;

		let elapsed = start_time.elapsed();
		clock_reads += 1;
		if elapsed >= duration {
			return Ok(IterationSample {
				invocations,
				elapsed,
				clock_reads,
			});
		}

		// Note: Estimated from the average of all invocations so far
		let next_batch_nanos = elapsed.as_nanos() * u128::from(2 * batch_size) / u128::from(invocations);
		if next_batch_nanos <= max_batch_time.as_nanos() {
			batch_size *= 2;
		}
	}
}

/// Case state
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum CaseState {
	/// Registered, but not yet run
	Defined,

	/// Running warmup iterations
	Warming,

	/// Running measurement iterations
	Measuring,

	/// Result is finalized
	Reported,
}

impl CaseState {
	/// Returns the state after this one, if any
	pub fn next(self) -> Option<Self> {
		match self {
			Self::Defined => Some(Self::Warming),
			Self::Warming => Some(Self::Measuring),
			Self::Measuring => Some(Self::Reported),
			Self::Reported => None,
		}
	}

	/// Advances to the next state
	///
	/// # Panics
	/// Panics if already reported.
	fn advance(&mut self, id: &CaseId) {
		let next = self.next().expect("Case was already reported");
		tracing::debug!(case = %id, prev = ?self, ?next, "Advancing case state");
		*self = next;
	}
}

/// Iteration sample
#[derive(Clone, Copy, Debug)]
pub struct IterationSample {
	/// Number of invocations
	pub invocations: u64,

	/// Elapsed time
	pub elapsed: Duration,

	/// Number of times the clock was read after starting
	pub clock_reads: u64,
}

impl IterationSample {
	/// Returns the average time per invocation, in nanoseconds
	pub fn ns_per_op(&self) -> f64 {
		self.elapsed.as_nanos() as f64 / self.invocations as f64
	}
}

/// Timing result
#[derive(Clone, Debug)]
#[derive(serde::Serialize)]
pub struct TimingResult {
	/// Case
	pub case: CaseId,

	/// Number of measurement iterations
	pub iterations: usize,

	/// Total number of measured invocations
	pub invocations: u64,

	/// Average time per invocation (in nanoseconds)
	pub score_ns: f64,

	/// Standard error of `score_ns` (in nanoseconds)
	pub error_ns: f64,

	// Fastest / slowest iteration (in nanoseconds)
	pub min_ns: f64,
	pub max_ns: f64,
}

impl TimingResult {
	/// Creates a timing result from all measurement samples
	pub fn from_samples(case: CaseId, samples: &[IterationSample]) -> Self {
		let scores = samples.iter().map(IterationSample::ns_per_op).collect::<average::Variance>();
		let (min_ns, max_ns) = samples
			.iter()
			.map(IterationSample::ns_per_op)
			.minmax_by(f64::total_cmp)
			.into_option()
			.unwrap_or((f64::NAN, f64::NAN));

		Self {
			case,
			iterations: samples.len(),
			invocations: samples.iter().map(|sample| sample.invocations).sum(),
			score_ns: scores.mean(),
			error_ns: scores.error(),
			min_ns,
			max_ns,
		}
	}
}

/// Stage at which a case failed
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[derive(serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
	/// During setup
	Setup,

	/// During the timed body (including acquiring the region, for local cases)
	Body,

	/// During teardown
	Teardown,
}

/// Case failure
#[derive(Clone, Debug)]
#[derive(serde::Serialize)]
pub struct CaseFailure {
	/// Case
	pub case: CaseId,

	/// Stage
	pub stage: FailureStage,

	/// Whether the failure was due to being unable to acquire a region
	pub allocation: bool,

	/// Cause, with its whole chain
	pub cause: String,
}

impl CaseFailure {
	/// Creates a new failure from an error
	fn new(case: &CaseId, stage: FailureStage, err: CaseError) -> Self {
		let allocation = self::is_allocation_error(&err);
		let err = anyhow::Error::new(err);
		Self {
			case: case.clone(),
			stage,
			allocation,
			cause: format!("{err:#}"),
		}
	}
}

/// Returns if `err` was caused by an allocation error
fn is_allocation_error(err: &CaseError) -> bool {
	match err {
		CaseError::Allocation(_) => true,
		CaseError::ReleaseOrdering(_) => false,
		CaseError::Other(err) => err
			.chain()
			.any(|err| matches!(err.downcast_ref::<CaseError>(), Some(CaseError::Allocation(_)))),
	}
}

/// Run report
#[derive(Clone, Default, Debug)]
#[derive(serde::Serialize)]
pub struct RunReport {
	/// Results of all successful cases
	pub results: Vec<TimingResult>,

	/// All failed cases
	pub failures: Vec<CaseFailure>,
}

impl RunReport {
	/// Formats the results as a table to `f`
	pub fn fmt_table(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name_width = self
			.results
			.iter()
			.map(|result| result.case.to_string().len())
			.max()
			.unwrap_or(0)
			.max("Benchmark".len());

		writeln!(
			f,
			"{:<name_width$}  {:>4}  {:>3}  {:>12}   {:>10}  {:>5}",
			"Benchmark", "Mode", "Cnt", "Score", "Error", "Units"
		)?;
		for result in &self.results {
			writeln!(
				f,
				"{:<name_width$}  {:>4}  {:>3}  {:>12.3} ± {:>10.3}  {:>5}",
				result.case, "avgt", result.iterations, result.score_ns, result.error_ns, "ns/op"
			)?;
		}

		Ok(())
	}

	/// Formats the failures to `f`
	pub fn fmt_failures(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for failure in &self.failures {
			let kind = match failure.allocation {
				true => "allocation failure",
				false => "failure",
			};
			writeln!(f, "{}: {kind} during {:?}: {}", failure.case, failure.stage, failure.cause)?;
		}

		Ok(())
	}
}
