//! Segment strategies
//!
//! A [`Segment`] views a region as a base [`Address`] plus a length, and is
//! accessed through typed handles. The two strategies only differ in how the
//! element offset is computed: [`IntArrayHandle`] has the stride built in,
//! while [`IntHandle`] requires the caller to offset the address by hand.

// Imports
use {
	super::Strategy,
	crate::{
		allocator::NativeAllocator,
		region::{AllocationError, Region, ReleaseOrderingError, StrategyKind, INT_SIZE},
	},
	std::marker::PhantomData,
};

/// Native memory segment
#[derive(Clone, Copy, Debug)]
pub struct Segment<'a> {
	/// Base address
	base: Address<'a>,

	/// Length, in bytes
	len: usize,
}

impl<'a> Segment<'a> {
	/// Views a region as a segment
	#[inline]
	pub fn of(region: &'a Region) -> Self {
		Self {
			base: Address {
				ptr:     region.as_ptr(),
				_region: PhantomData,
			},
			len:  region.size(),
		}
	}

	/// Returns the base address of this segment
	#[inline]
	pub fn base_address(self) -> Address<'a> {
		self.base
	}

	/// Returns the length of this segment, in bytes
	#[inline]
	pub fn len(self) -> usize {
		self.len
	}

	/// Returns if this segment is empty
	#[inline]
	pub fn is_empty(self) -> bool {
		self.len == 0
	}
}

/// Address within a segment
#[derive(Clone, Copy, Debug)]
pub struct Address<'a> {
	/// Pointer
	ptr: *mut u8,

	/// Region this address points into
	_region: PhantomData<&'a Region>,
}

impl<'a> Address<'a> {
	/// Offsets this address by `offset` bytes.
	///
	/// # Safety
	/// The resulting address must stay within the segment.
	#[inline]
	pub unsafe fn add_offset(self, offset: usize) -> Self {
		Self {
			ptr:     self.ptr.add(offset),
			_region: PhantomData,
		}
	}
}

/// Handle to a single native-endian `i32`
#[derive(Clone, Copy, Default, Debug)]
pub struct IntHandle;

impl IntHandle {
	/// Creates an array handle from this handle with `stride` bytes between elements
	#[must_use]
	pub const fn with_stride(self, stride: usize) -> IntArrayHandle {
		IntArrayHandle { stride }
	}

	/// Gets the `i32` at `addr`.
	///
	/// # Safety
	/// `addr` must be valid for an `i32` read and aligned to it, and the `i32` must be initialized.
	#[inline]
	pub unsafe fn get(self, addr: Address<'_>) -> i32 {
		addr.ptr.cast::<i32>().read()
	}

	/// Sets the `i32` at `addr`.
	///
	/// # Safety
	/// `addr` must be valid for an `i32` write and aligned to it.
	/// No other references may exist to the `i32`.
	#[inline]
	pub unsafe fn set(self, addr: Address<'_>, value: i32) {
		addr.ptr.cast::<i32>().write(value);
	}
}

/// Handle to a strided array of native-endian `i32`s
#[derive(Clone, Copy, Debug)]
pub struct IntArrayHandle {
	/// Stride, in bytes
	stride: usize,
}

impl IntArrayHandle {
	/// Returns the stride of this handle
	pub const fn stride(self) -> usize {
		self.stride
	}

	/// Gets the `i32` at `idx`, starting at `base`.
	///
	/// # Safety
	/// Same as [`IntHandle::get`], for the address of the element.
	#[inline]
	pub unsafe fn get(self, base: Address<'_>, idx: usize) -> i32 {
		IntHandle.get(base.add_offset(idx * self.stride))
	}

	/// Sets the `i32` at `idx`, starting at `base`.
	///
	/// # Safety
	/// Same as [`IntHandle::set`], for the address of the element.
	#[inline]
	pub unsafe fn set(self, base: Address<'_>, idx: usize, value: i32) {
		IntHandle.set(base.add_offset(idx * self.stride), value);
	}
}

/// Array handle shared by all segment array handle strategies
const INT_ARRAY_HANDLE: IntArrayHandle = IntHandle.with_stride(INT_SIZE);

/// Segment strategy with a strided array handle.
///
/// Regions are always zero-filled.
#[derive(Clone, Debug)]
pub struct SegmentArrayHandleStrategy<A> {
	/// Allocator
	allocator: A,
}

impl<A> SegmentArrayHandleStrategy<A> {
	/// Creates a new strategy
	pub fn new(allocator: A) -> Self {
		Self { allocator }
	}
}

impl<A: NativeAllocator> Strategy for SegmentArrayHandleStrategy<A> {
	fn kind(&self) -> StrategyKind {
		StrategyKind::SegmentArrayHandle
	}

	fn name(&self) -> &'static str {
		"segment_array_handle"
	}

	fn zero_fills(&self) -> bool {
		true
	}

	fn acquire(&self, size: usize) -> Result<Region, AllocationError> {
		super::acquire_with(&self.allocator, StrategyKind::SegmentArrayHandle, size, true)
	}

	#[inline]
	unsafe fn read_i32(&self, region: &Region, idx: usize) -> i32 {
		super::debug_assert_in_bounds(region, idx);
		INT_ARRAY_HANDLE.get(Segment::of(region).base_address(), idx)
	}

	#[inline]
	unsafe fn write_i32(&self, region: &mut Region, idx: usize, value: i32) {
		super::debug_assert_in_bounds(region, idx);
		INT_ARRAY_HANDLE.set(Segment::of(region).base_address(), idx, value);
	}

	fn release(&self, region: Region) -> Result<(), ReleaseOrderingError> {
		super::release_with(&self.allocator, StrategyKind::SegmentArrayHandle, region)
	}
}

/// Segment strategy with a single element handle.
///
/// Regions are always zero-filled.
#[derive(Clone, Debug)]
pub struct SegmentIntHandleStrategy<A> {
	/// Allocator
	allocator: A,
}

impl<A> SegmentIntHandleStrategy<A> {
	/// Creates a new strategy
	pub fn new(allocator: A) -> Self {
		Self { allocator }
	}
}

impl<A: NativeAllocator> Strategy for SegmentIntHandleStrategy<A> {
	fn kind(&self) -> StrategyKind {
		StrategyKind::SegmentIntHandle
	}

	fn name(&self) -> &'static str {
		"segment_int_handle"
	}

	fn zero_fills(&self) -> bool {
		true
	}

	fn acquire(&self, size: usize) -> Result<Region, AllocationError> {
		super::acquire_with(&self.allocator, StrategyKind::SegmentIntHandle, size, true)
	}

	#[inline]
	unsafe fn read_i32(&self, region: &Region, idx: usize) -> i32 {
		super::debug_assert_in_bounds(region, idx);
		let addr = Segment::of(region).base_address().add_offset(idx * INT_SIZE);
		IntHandle.get(addr)
	}

	#[inline]
	unsafe fn write_i32(&self, region: &mut Region, idx: usize, value: i32) {
		super::debug_assert_in_bounds(region, idx);
		let addr = Segment::of(region).base_address().add_offset(idx * INT_SIZE);
		IntHandle.set(addr, value);
	}

	fn release(&self, region: Region) -> Result<(), ReleaseOrderingError> {
		super::release_with(&self.allocator, StrategyKind::SegmentIntHandle, region)
	}
}
