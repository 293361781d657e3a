//! Benchmark cases

// Imports
use {
	crate::{
		region::{AllocationError, Region, ReleaseOrderingError, INT_SIZE},
		sink::Sink,
		strategy::{Scoped, Strategy},
	},
	std::{fmt, hint},
};

/// Value written by all write cases
pub const WRITTEN_VALUE: i32 = 42;

/// Case mode
#[derive(PartialEq, Eq, Clone, Copy, Hash, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
	Read,
	Write,
}

impl fmt::Display for Mode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Read => f.pad("read"),
			Self::Write => f.pad("write"),
		}
	}
}

/// Case scope
#[derive(PartialEq, Eq, Clone, Copy, Hash, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
	/// Region is acquired once, before warming up, and released once, after reporting.
	Global,

	/// Region is acquired and released on every invocation.
	Local,
}

impl fmt::Display for Scope {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Global => f.pad("global"),
			Self::Local => f.pad("local"),
		}
	}
}

/// Case id
#[derive(PartialEq, Eq, Clone, Hash, Debug)]
#[derive(serde::Serialize)]
pub struct CaseId {
	/// Strategy name
	pub strategy: &'static str,

	/// Mode
	pub mode: Mode,

	/// Scope
	pub scope: Scope,
}

impl fmt::Display for CaseId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		// Note: We format to a string first so the padding applies to the whole id
		f.pad(&format!("{}/{}_{}", self.scope, self.strategy, self.mode))
	}
}

/// Case context.
///
/// Holds the region of a global case between its setup and teardown.
#[derive(Default, Debug)]
pub struct Context {
	/// Region
	region: Option<Region>,
}

impl Context {
	/// Creates a new, empty, context
	pub fn new() -> Self {
		Self::default()
	}

	/// Holds `region` until it's taken.
	///
	/// # Errors
	/// Returns an error, without taking `region`, if a region is already held.
	pub fn hold(&mut self, region: Region) -> Result<(), (Region, ReleaseOrderingError)> {
		match self.region {
			Some(_) => Err((region, ReleaseOrderingError::AlreadyHeld)),
			None => {
				self.region = Some(region);
				Ok(())
			},
		}
	}

	/// Returns the held region
	pub fn region(&self) -> Result<&Region, ReleaseOrderingError> {
		self.region.as_ref().ok_or(ReleaseOrderingError::NotHeld)
	}

	/// Returns the held region mutably
	#[inline]
	pub fn region_mut(&mut self) -> Result<&mut Region, ReleaseOrderingError> {
		self.region.as_mut().ok_or(ReleaseOrderingError::NotHeld)
	}

	/// Takes the held region
	pub fn take(&mut self) -> Result<Region, ReleaseOrderingError> {
		self.region.take().ok_or(ReleaseOrderingError::NotHeld)
	}

	/// Returns if a region is held
	pub fn is_holding(&self) -> bool {
		self.region.is_some()
	}
}

/// Case error
#[derive(Debug)]
#[derive(thiserror::Error)]
pub enum CaseError {
	/// Unable to acquire the region
	#[error("Unable to acquire region")]
	Allocation(#[from] AllocationError),

	/// Region was released out of order
	#[error("Region was released out of order")]
	ReleaseOrdering(#[from] ReleaseOrderingError),

	/// Other error
	#[error(transparent)]
	Other(#[from] anyhow::Error),
}

/// Benchmark case
pub trait Case {
	/// Returns this case's id
	fn id(&self) -> &CaseId;

	/// Sets up the case, before warming up
	fn setup(&self, ctx: &mut Context) -> Result<(), CaseError>;

	/// Invokes the timed body once
	fn invoke(&self, ctx: &mut Context, sink: &mut Sink) -> Result<(), CaseError>;

	/// Tears down the case, after reporting
	fn teardown(&self, ctx: &mut Context) -> Result<(), CaseError>;
}

/// Benchmark case over a strategy
#[derive(Debug)]
pub struct BenchCase<S> {
	/// Id
	id: CaseId,

	/// Strategy
	strategy: S,

	/// Region size, in bytes
	region_size: usize,

	/// Number of elements to access
	element_count: usize,
}

impl<S: Strategy> BenchCase<S> {
	/// Creates a new case
	///
	/// # Panics
	/// Panics if `element_count` elements don't fit in `region_size` bytes.
	/// Panics if reading from a strategy that doesn't zero-fill its regions.
	pub fn new(strategy: S, mode: Mode, scope: Scope, region_size: usize, element_count: usize) -> Self {
		// Note: The bodies don't check any bounds, so this is what keeps them in bounds.
		assert!(
			element_count
				.checked_mul(INT_SIZE)
				.is_some_and(|elements_size| elements_size <= region_size),
			"{element_count} elements don't fit in a region of {region_size} bytes"
		);
		assert!(
			mode == Mode::Write || strategy.zero_fills(),
			"Cannot read from uninitialized regions of strategy {:?}",
			strategy.name()
		);

		Self {
			id: CaseId {
				strategy: strategy.name(),
				mode,
				scope,
			},
			strategy,
			region_size,
			element_count,
		}
	}

	/// Returns the strategy
	pub fn strategy(&self) -> &S {
		&self.strategy
	}

	/// Runs the body of this case on `region`, without acquiring or releasing it.
	///
	/// # Panics
	/// Panics if `region` is smaller than this case's region size.
	#[inline]
	pub fn run_body(&self, region: &mut Region, sink: &mut Sink) {
		assert!(region.size() >= self.region_size, "Region is too small");

		match self.id.mode {
			Mode::Read => sink.consume(self.read_all(region)),
			Mode::Write => self.write_all(region),
		}
	}

	/// Reads all elements and returns their sum
	#[inline]
	fn read_all(&self, region: &Region) -> i32 {
		let mut sum = 0i32;
		for idx in 0..self.element_count {
			// SAFETY: All elements fit in the region, checked on construction, and we
			//         only read from strategies that zero-fill.
			sum = sum.wrapping_add(unsafe { self.strategy.read_i32(region, idx) });
		}

		sum
	}

	/// Writes [`WRITTEN_VALUE`] to all elements
	#[inline]
	fn write_all(&self, region: &mut Region) {
		for idx in 0..self.element_count {
			// SAFETY: All elements fit in the region, checked on construction.
			unsafe { self.strategy.write_i32(region, idx, WRITTEN_VALUE) };
		}

		// Note: The region may be released right after, which would
		//       otherwise let the optimizer elide the writes.
		hint::black_box(region.as_ptr());
	}
}

impl<S: Strategy> Case for BenchCase<S> {
	fn id(&self) -> &CaseId {
		&self.id
	}

	fn setup(&self, ctx: &mut Context) -> Result<(), CaseError> {
		match self.id.scope {
			Scope::Global => {
				let region = self.strategy.acquire(self.region_size)?;
				if let Err((region, err)) = ctx.hold(region) {
					// Note: The held region is someone else's, so only release ours
					self.strategy.release(region)?;
					return Err(err.into());
				}

				Ok(())
			},
			Scope::Local => Ok(()),
		}
	}

	#[inline]
	fn invoke(&self, ctx: &mut Context, sink: &mut Sink) -> Result<(), CaseError> {
		match self.id.scope {
			Scope::Global => {
				let region = ctx.region_mut()?;
				self.run_body(region, sink);
			},
			Scope::Local => {
				let mut scoped = Scoped::acquire(&self.strategy, self.region_size)?;
				self.run_body(scoped.region_mut(), sink);
				scoped.release()?;
			},
		}

		Ok(())
	}

	fn teardown(&self, ctx: &mut Context) -> Result<(), CaseError> {
		match self.id.scope {
			Scope::Global => {
				let owner = ctx.region()?.kind();
				let released_by = self.strategy.kind();
				if owner != released_by {
					return Err(ReleaseOrderingError::NotOwned { owner, released_by }.into());
				}

				let region = ctx.take()?;
				self.strategy.release(region)?;
				Ok(())
			},
			Scope::Local => Ok(()),
		}
	}
}
