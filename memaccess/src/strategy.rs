//! Memory access strategies

// Modules
pub mod buffer;
pub mod raw;
pub mod segment;

// Exports
pub use self::{
	buffer::BufferStrategy,
	raw::RawStrategy,
	segment::{SegmentArrayHandleStrategy, SegmentIntHandleStrategy},
};

// Imports
use crate::{
	allocator::NativeAllocator,
	region::{self, AllocationError, Region, ReleaseOrderingError, StrategyKind, INT_SIZE},
};

/// Memory access strategy.
///
/// Every strategy accesses `i32`s in native byte order with a stride of [`INT_SIZE`],
/// so they only differ in the access mechanism itself.
pub trait Strategy {
	/// Returns this strategy's kind
	fn kind(&self) -> StrategyKind;

	/// Returns this strategy's name
	fn name(&self) -> &'static str;

	/// Returns if regions are zero-filled when acquired
	fn zero_fills(&self) -> bool;

	/// Acquires a region of `size` bytes
	fn acquire(&self, size: usize) -> Result<Region, AllocationError>;

	/// Reads the `i32` at `idx`.
	///
	/// # Safety
	/// `idx * INT_SIZE + INT_SIZE` must not exceed the region size, and the slot
	/// must have been written to, unless this strategy zero-fills.
	unsafe fn read_i32(&self, region: &Region, idx: usize) -> i32;

	/// Writes `value` to the `i32` at `idx`.
	///
	/// # Safety
	/// `idx * INT_SIZE + INT_SIZE` must not exceed the region size.
	unsafe fn write_i32(&self, region: &mut Region, idx: usize, value: i32);

	/// Releases a region.
	///
	/// # Errors
	/// Returns an error, along with the region, if it was acquired by another kind of strategy.
	fn release(&self, region: Region) -> Result<(), ReleaseOrderingError>;
}

/// Acquires a region of `size` bytes of kind `kind` from `allocator`
fn acquire_with<A: NativeAllocator>(
	allocator: &A,
	kind: StrategyKind,
	size: usize,
	zeroed: bool,
) -> Result<Region, AllocationError> {
	let layout = region::region_layout(size)?;
	let ptr = allocator.allocate(layout, zeroed)?;

	Ok(Region::new(kind, ptr, layout))
}

/// Releases a region of kind `kind` to `allocator`
fn release_with<A: NativeAllocator>(
	allocator: &A,
	kind: StrategyKind,
	region: Region,
) -> Result<(), ReleaseOrderingError> {
	if region.kind() != kind {
		return Err(ReleaseOrderingError::ForeignRegion {
			region,
			released_by: kind,
		});
	}

	let (ptr, layout) = region.into_raw();

	// SAFETY: Regions of `kind` are only created by `acquire_with` with the same allocator
	//         and layout, and `region` was consumed, so this is the only free.
	unsafe { allocator.free(ptr, layout) };

	Ok(())
}

/// Asserts, in debug builds only, that `idx` is a valid slot of `region`
#[inline(always)]
fn debug_assert_in_bounds(region: &Region, idx: usize) {
	debug_assert!(
		idx * INT_SIZE + INT_SIZE <= region.size(),
		"Index {idx} is out of bounds for a region of {} bytes",
		region.size()
	);
}

/// Scoped region.
///
/// Releases the region on drop if it wasn't explicitly released, so that
/// early returns and unwinding never leak it.
pub struct Scoped<'s, S: Strategy + ?Sized> {
	/// Strategy that acquired the region
	strategy: &'s S,

	/// Region, until released
	region: Option<Region>,
}

impl<'s, S: Strategy + ?Sized> Scoped<'s, S> {
	/// Acquires a scoped region of `size` bytes from `strategy`
	pub fn acquire(strategy: &'s S, size: usize) -> Result<Self, AllocationError> {
		let region = strategy.acquire(size)?;
		Ok(Self {
			strategy,
			region: Some(region),
		})
	}

	/// Returns the region
	#[inline]
	pub fn region(&self) -> &Region {
		self.region.as_ref().expect("Region was already released")
	}

	/// Returns the region mutably
	#[inline]
	pub fn region_mut(&mut self) -> &mut Region {
		self.region.as_mut().expect("Region was already released")
	}

	/// Releases the region
	pub fn release(mut self) -> Result<(), ReleaseOrderingError> {
		let region = self.region.take().expect("Region was already released");
		self.strategy.release(region)
	}
}

impl<S: Strategy + ?Sized> Drop for Scoped<'_, S> {
	fn drop(&mut self) {
		if let Some(region) = self.region.take() {
			tracing::trace!(?region, "Releasing scoped region on drop");
			if let Err(err) = self.strategy.release(region) {
				tracing::error!(?err, "Unable to release scoped region, leaking it");
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use {
		super::*,
		crate::{allocator::TrackingAllocator, region::DEFAULT_REGION_SIZE},
		rand::Rng,
	};

	/// Number of elements the cases touch
	const ELEMENTS: usize = 1024;

	/// Returns all strategies, over `allocator`
	fn strategies(allocator: &TrackingAllocator) -> Vec<Box<dyn Strategy>> {
		vec![
			Box::new(BufferStrategy::new(allocator.clone())),
			Box::new(RawStrategy::new(allocator.clone(), false)),
			Box::new(RawStrategy::new(allocator.clone(), true)),
			Box::new(SegmentArrayHandleStrategy::new(allocator.clone())),
			Box::new(SegmentIntHandleStrategy::new(allocator.clone())),
		]
	}

	#[test]
	fn write_read_round_trip() {
		let allocator = TrackingAllocator::new();
		let mut rng = rand::thread_rng();
		for strategy in strategies(&allocator) {
			let mut region = strategy.acquire(DEFAULT_REGION_SIZE).expect("Unable to acquire");
			for idx in 0..ELEMENTS {
				let value = rng.gen::<i32>();
				// SAFETY: `idx` is within the region
				unsafe {
					strategy.write_i32(&mut region, idx, value);
					assert_eq!(strategy.read_i32(&region, idx), value, "{}: index {idx}", strategy.name());
				}
			}
			strategy.release(region).expect("Unable to release");
		}

		assert_eq!(allocator.allocations(), 5);
		assert_eq!(allocator.live(), 0);
	}

	#[test]
	fn repeated_writes() {
		let allocator = TrackingAllocator::new();
		for strategy in strategies(&allocator) {
			let mut region = strategy.acquire(DEFAULT_REGION_SIZE).expect("Unable to acquire");
			for value in [7, 42] {
				for idx in 0..ELEMENTS {
					// SAFETY: `idx` is within the region
					unsafe { strategy.write_i32(&mut region, idx, value) };
				}
			}

			// SAFETY: `idx` is within the region and was written
			let values = (0..ELEMENTS)
				.map(|idx| unsafe { strategy.read_i32(&region, idx) })
				.collect::<Vec<_>>();
			assert!(values.iter().all(|&value| value == 42), "{}", strategy.name());
			strategy.release(region).expect("Unable to release");
		}

		assert_eq!(allocator.live(), 0);
	}

	#[test]
	fn native_byte_order() {
		let allocator = TrackingAllocator::new();
		for strategy in strategies(&allocator) {
			let mut region = strategy.acquire(DEFAULT_REGION_SIZE).expect("Unable to acquire");

			// SAFETY: Index 3 is within the region, and the byte range `12..16` was just written
			let bytes = unsafe {
				strategy.write_i32(&mut region, 3, 0x1234_5678);
				std::slice::from_raw_parts(region.as_ptr().add(12), INT_SIZE).to_vec()
			};
			assert_eq!(bytes, 0x1234_5678i32.to_ne_bytes(), "{}", strategy.name());
			strategy.release(region).expect("Unable to release");
		}
	}

	#[test]
	fn last_slot() {
		let allocator = TrackingAllocator::new();
		for strategy in strategies(&allocator) {
			let mut region = strategy.acquire(DEFAULT_REGION_SIZE).expect("Unable to acquire");
			assert_eq!(region.int_len(), 2048);

			// SAFETY: Index 2047 is the last slot of the region
			unsafe {
				strategy.write_i32(&mut region, 2047, -1);
				assert_eq!(strategy.read_i32(&region, 2047), -1, "{}", strategy.name());
			}
			strategy.release(region).expect("Unable to release");
		}
	}

	#[test]
	fn zero_filled() {
		let allocator = TrackingAllocator::new();
		for strategy in strategies(&allocator).into_iter().filter(|strategy| strategy.zero_fills()) {
			let region = strategy.acquire(DEFAULT_REGION_SIZE).expect("Unable to acquire");
			for idx in 0..region.int_len() {
				// SAFETY: `idx` is within the region, which was zero-filled
				assert_eq!(unsafe { strategy.read_i32(&region, idx) }, 0, "{}", strategy.name());
			}
			strategy.release(region).expect("Unable to release");
		}
	}

	#[test]
	fn release_foreign() {
		let allocator = TrackingAllocator::new();
		let buffer = BufferStrategy::new(allocator.clone());
		let raw = RawStrategy::new(allocator.clone(), true);

		let region = buffer.acquire(DEFAULT_REGION_SIZE).expect("Unable to acquire");
		let region = match raw.release(region) {
			Err(ReleaseOrderingError::ForeignRegion { region, released_by }) => {
				assert_eq!(released_by, StrategyKind::Raw);
				region
			},
			res => panic!("Expected foreign region error, found {res:?}"),
		};
		assert_eq!(allocator.live(), 1);

		buffer.release(region).expect("Unable to release");
		assert_eq!(allocator.live(), 0);
	}

	#[test]
	fn acquire_failure() {
		let allocator = TrackingAllocator::failing();
		for strategy in strategies(&allocator) {
			assert_eq!(
				strategy.acquire(DEFAULT_REGION_SIZE).map(drop),
				Err(AllocationError::OutOfMemory { size: DEFAULT_REGION_SIZE })
			);
		}
		assert_eq!(allocator.failures(), 5);
	}

	#[test]
	fn scoped_releases_on_drop() {
		let allocator = TrackingAllocator::new();
		let strategy = SegmentIntHandleStrategy::new(allocator.clone());

		let res = (|| -> Result<(), &'static str> {
			let _scoped = Scoped::acquire(&strategy, DEFAULT_REGION_SIZE).map_err(|_| "acquire")?;
			Err("early exit")
		})();
		assert_eq!(res, Err("early exit"));
		assert_eq!(allocator.allocations(), 1);
		assert_eq!(allocator.frees(), 1);

		let scoped = Scoped::acquire(&strategy, DEFAULT_REGION_SIZE).expect("Unable to acquire");
		assert_eq!(scoped.region().kind(), StrategyKind::SegmentIntHandle);
		scoped.release().expect("Unable to release");
		assert_eq!(allocator.frees(), 2);
	}
}
