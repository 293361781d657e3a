//! Raw pointer strategy

// Imports
use {
	super::Strategy,
	crate::{
		allocator::NativeAllocator,
		region::{AllocationError, Region, ReleaseOrderingError, StrategyKind, INT_SIZE},
	},
};

/// Raw pointer strategy.
///
/// Accesses the region through unchecked pointer arithmetic on its base address.
#[derive(Clone, Debug)]
pub struct RawStrategy<A> {
	/// Allocator
	allocator: A,

	/// Whether to zero-fill regions when acquiring them
	zeroed: bool,
}

impl<A> RawStrategy<A> {
	/// Creates a new raw strategy
	pub fn new(allocator: A, zeroed: bool) -> Self {
		Self { allocator, zeroed }
	}
}

impl<A: NativeAllocator> Strategy for RawStrategy<A> {
	fn kind(&self) -> StrategyKind {
		StrategyKind::Raw
	}

	fn name(&self) -> &'static str {
		match self.zeroed {
			true => "raw_clean",
			false => "raw_noclean",
		}
	}

	fn zero_fills(&self) -> bool {
		self.zeroed
	}

	fn acquire(&self, size: usize) -> Result<Region, AllocationError> {
		super::acquire_with(&self.allocator, StrategyKind::Raw, size, self.zeroed)
	}

	#[inline]
	unsafe fn read_i32(&self, region: &Region, idx: usize) -> i32 {
		super::debug_assert_in_bounds(region, idx);

		// Note: Regions are aligned to 8 and `idx * 4` keeps the address aligned for `i32`
		region.as_ptr().add(idx * INT_SIZE).cast::<i32>().read()
	}

	#[inline]
	unsafe fn write_i32(&self, region: &mut Region, idx: usize, value: i32) {
		super::debug_assert_in_bounds(region, idx);
		region.as_ptr().add(idx * INT_SIZE).cast::<i32>().write(value);
	}

	fn release(&self, region: Region) -> Result<(), ReleaseOrderingError> {
		super::release_with(&self.allocator, StrategyKind::Raw, region)
	}
}
