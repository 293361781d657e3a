//! Driver tests

// Imports
use {
	memaccess::{
		case::CaseError,
		config::IterationConfig,
		driver::FailureStage,
		registry,
		strategy::{BufferStrategy, RawStrategy, SegmentArrayHandleStrategy, SegmentIntHandleStrategy},
		BenchCase,
		Case,
		CaseId,
		Config,
		Context,
		Driver,
		Mode,
		Scope,
		Sink,
		TrackingAllocator,
	},
	std::cell::Cell,
};

/// Returns a config with very short iterations
fn quick_config() -> Config {
	Config {
		warmup: IterationConfig {
			iterations: 1,
			time_secs:  0.001,
		},
		measurement: IterationConfig {
			iterations: 2,
			time_secs:  0.002,
		},
		..Config::default()
	}
}

/// Creates a case with the default region size and element count
fn bench_case<S: memaccess::Strategy + 'static>(strategy: S, mode: Mode, scope: Scope) -> Box<dyn Case> {
	let config = Config::default();
	Box::new(BenchCase::new(
		strategy,
		mode,
		scope,
		config.region_size,
		config.element_count,
	))
}

#[test]
fn failing_acquire_is_reported() {
	let allocator = TrackingAllocator::new();
	let failing_allocator = TrackingAllocator::failing();
	let cases = vec![
		bench_case(BufferStrategy::new(allocator.clone()), Mode::Read, Scope::Local),
		bench_case(RawStrategy::new(failing_allocator.clone(), true), Mode::Read, Scope::Global),
		bench_case(SegmentArrayHandleStrategy::new(allocator.clone()), Mode::Write, Scope::Local),
		bench_case(SegmentIntHandleStrategy::new(allocator.clone()), Mode::Write, Scope::Global),
	];

	let report = Driver::new(quick_config()).run(&cases);

	assert_eq!(report.results.len(), 3);
	assert_eq!(report.failures.len(), 1);

	let failure = &report.failures[0];
	assert_eq!(failure.case.to_string(), "global/raw_clean_read");
	assert_eq!(failure.stage, FailureStage::Setup);
	assert!(failure.allocation);
	assert!(failure.cause.contains("Unable to acquire region"), "{}", failure.cause);
	assert!(
		!report.results.iter().any(|result| result.case == failure.case),
		"Failed case should have no result"
	);

	// Note: The results stay in the order the cases were given
	let names = report.results.iter().map(|result| result.case.to_string()).collect::<Vec<_>>();
	assert_eq!(names, [
		"local/buffer_read",
		"local/segment_array_handle_write",
		"global/segment_int_handle_write"
	]);
	for result in &report.results {
		assert_eq!(result.iterations, 2);
		assert!(result.invocations >= 2);
		assert!(result.score_ns > 0.0);
		assert!(result.min_ns <= result.score_ns && result.score_ns <= result.max_ns);
	}

	assert_eq!(failing_allocator.allocations(), 0);
	assert_eq!(failing_allocator.failures(), 1);
	assert!(allocator.allocations() > 0);
	assert_eq!(allocator.live(), 0);
}

#[test]
fn local_acquire_failure_is_reported() {
	let cases = vec![bench_case(
		BufferStrategy::new(TrackingAllocator::failing()),
		Mode::Write,
		Scope::Local,
	)];

	let report = Driver::new(quick_config()).run(&cases);
	assert!(report.results.is_empty());

	let failure = &report.failures[0];
	assert_eq!(failure.stage, FailureStage::Body);
	assert!(failure.allocation);
	assert!(failure.cause.contains("warmup iteration 1"), "{}", failure.cause);
}

#[test]
fn all_registered_cases() {
	let allocator = TrackingAllocator::new();
	let config = quick_config();
	let cases = registry::cases(&allocator, &config);

	let report = Driver::new(config).run(&cases);
	assert!(report.failures.is_empty(), "Failures: {:?}", report.failures);
	assert_eq!(report.results.len(), cases.len());

	// Every acquire was paired with a release, with global cases only acquiring once
	assert_eq!(allocator.live(), 0);
	let global_cases = cases.iter().filter(|case| case.id().scope == Scope::Global).count();
	let local_invocations = report
		.results
		.iter()
		.filter(|result| result.case.scope == Scope::Local)
		.map(|result| result.invocations)
		.sum::<u64>();
	assert!(allocator.allocations() as u64 >= global_cases as u64 + local_invocations);
}

/// Case whose body fails after a few invocations
struct FailingBody {
	id:          CaseId,
	invocations: Cell<usize>,
	teardowns:   Cell<usize>,
}

impl Case for FailingBody {
	fn id(&self) -> &CaseId {
		&self.id
	}

	fn setup(&self, _ctx: &mut Context) -> Result<(), CaseError> {
		Ok(())
	}

	fn invoke(&self, _ctx: &mut Context, sink: &mut Sink) -> Result<(), CaseError> {
		self.invocations.set(self.invocations.get() + 1);
		if self.invocations.get() >= 3 {
			return Err(anyhow::anyhow!("Body gave up").into());
		}
		sink.consume(0);
		Ok(())
	}

	fn teardown(&self, _ctx: &mut Context) -> Result<(), CaseError> {
		self.teardowns.set(self.teardowns.get() + 1);
		Ok(())
	}
}

#[test]
fn failing_body_doesnt_stop_siblings() {
	let allocator = TrackingAllocator::new();
	let failing = FailingBody {
		id:          CaseId {
			strategy: "failing",
			mode:     Mode::Read,
			scope:    Scope::Global,
		},
		invocations: Cell::new(0),
		teardowns:   Cell::new(0),
	};

	// Note: Run the failing case on its own first, so we can inspect it
	let driver = Driver::new(quick_config());
	let failure = driver.run_case(&failing).expect_err("Case should fail");
	assert_eq!(failure.stage, FailureStage::Body);
	assert!(!failure.allocation);
	assert!(failure.cause.contains("Body gave up"), "{}", failure.cause);
	assert_eq!(failing.invocations.get(), 3);
	assert_eq!(failing.teardowns.get(), 1);

	let cases = vec![
		Box::new(FailingBody {
			invocations: Cell::new(0),
			teardowns: Cell::new(0),
			..failing
		}) as Box<dyn Case>,
		bench_case(BufferStrategy::new(allocator.clone()), Mode::Read, Scope::Global),
	];
	let report = driver.run(&cases);
	assert_eq!(report.failures.len(), 1);
	assert_eq!(report.results.len(), 1);
	assert_eq!(report.results[0].case.to_string(), "global/buffer_read");
	assert_eq!(allocator.live(), 0);
}

#[test]
fn report_table() {
	let allocator = TrackingAllocator::new();
	let cases = vec![
		bench_case(BufferStrategy::new(allocator.clone()), Mode::Write, Scope::Local),
		bench_case(RawStrategy::new(TrackingAllocator::failing(), false), Mode::Write, Scope::Global),
	];
	let report = Driver::new(quick_config()).run(&cases);

	let table = memaccess_util::DisplayWrapper::new(|f| report.fmt_table(f)).to_string();
	let lines = table.lines().collect::<Vec<_>>();
	assert_eq!(lines.len(), 2);
	assert!(lines[0].starts_with("Benchmark"));
	assert!(lines[1].starts_with("local/buffer_write"));
	assert!(lines[1].ends_with("ns/op"));

	let failures = memaccess_util::DisplayWrapper::new(|f| report.fmt_failures(f)).to_string();
	assert!(failures.starts_with("global/raw_noclean_write: allocation failure"), "{failures}");

	let json = serde_json::to_value(&report).expect("Unable to serialize report");
	assert_eq!(json["results"][0]["case"]["strategy"], "buffer");
	assert_eq!(json["results"][0]["case"]["scope"], "local");
	assert_eq!(json["failures"][0]["stage"], "setup");
}
