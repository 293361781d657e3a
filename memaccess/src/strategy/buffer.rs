//! Buffer strategy

// Imports
use {
	super::Strategy,
	crate::{
		allocator::NativeAllocator,
		region::{AllocationError, Region, ReleaseOrderingError, StrategyKind, INT_SIZE},
	},
	memaccess_util::NativeInt32Bytes,
};

/// Buffer strategy.
///
/// Accesses the region as a byte buffer through checked accessors.
/// Regions are always zero-filled.
#[derive(Clone, Debug)]
pub struct BufferStrategy<A> {
	/// Allocator
	allocator: A,
}

impl<A> BufferStrategy<A> {
	/// Creates a new buffer strategy
	pub fn new(allocator: A) -> Self {
		Self { allocator }
	}
}

impl<A: NativeAllocator> Strategy for BufferStrategy<A> {
	fn kind(&self) -> StrategyKind {
		StrategyKind::Buffer
	}

	fn name(&self) -> &'static str {
		"buffer"
	}

	fn zero_fills(&self) -> bool {
		true
	}

	fn acquire(&self, size: usize) -> Result<Region, AllocationError> {
		super::acquire_with(&self.allocator, StrategyKind::Buffer, size, true)
	}

	#[inline]
	unsafe fn read_i32(&self, region: &Region, idx: usize) -> i32 {
		// SAFETY: Buffer regions are zero-filled on acquire
		region.bytes().read_i32_at(idx * INT_SIZE)
	}

	#[inline]
	unsafe fn write_i32(&self, region: &mut Region, idx: usize, value: i32) {
		// SAFETY: Buffer regions are zero-filled on acquire
		region.bytes_mut().write_i32_at(idx * INT_SIZE, value);
	}

	fn release(&self, region: Region) -> Result<(), ReleaseOrderingError> {
		super::release_with(&self.allocator, StrategyKind::Buffer, region)
	}
}
