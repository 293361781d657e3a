//! Memory regions

// Imports
use std::{alloc::Layout, fmt, ptr::NonNull, slice};

/// Size of an `i32` element, in bytes.
///
/// All strategies access elements with this stride.
pub const INT_SIZE: usize = 4;

/// Alignment of every region
pub const REGION_ALIGN: usize = 8;

/// Default region size, in bytes
pub const DEFAULT_REGION_SIZE: usize = 8192;

/// Strategy kind.
///
/// Tags each region with the strategy that acquired it.
#[derive(PartialEq, Eq, Clone, Copy, Hash, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
	/// Buffer with checked accessors
	Buffer,

	/// Raw pointer
	Raw,

	/// Segment with a strided array handle
	SegmentArrayHandle,

	/// Segment with a single element handle
	SegmentIntHandle,
}

impl fmt::Display for StrategyKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::Buffer => "buffer",
			Self::Raw => "raw",
			Self::SegmentArrayHandle => "segment_array_handle",
			Self::SegmentIntHandle => "segment_int_handle",
		};

		f.pad(name)
	}
}

/// Memory region.
///
/// Owns a block of native memory until it's released by the strategy that acquired it.
#[must_use = "Regions must be released by the strategy that acquired them"]
pub struct Region {
	/// Strategy that acquired this region
	kind: StrategyKind,

	/// Base pointer
	ptr: NonNull<u8>,

	/// Layout the memory was allocated with
	layout: Layout,
}

// SAFETY: Regions uniquely own their memory, like a `Box<[u8]>`, and
//         only allow writing to it through `&mut self` or `unsafe` methods.
unsafe impl Send for Region {}
unsafe impl Sync for Region {}

impl Region {
	/// Creates a region from memory allocated with `layout`
	pub(crate) fn new(kind: StrategyKind, ptr: NonNull<u8>, layout: Layout) -> Self {
		Self { kind, ptr, layout }
	}

	/// Returns the strategy that acquired this region
	pub fn kind(&self) -> StrategyKind {
		self.kind
	}

	/// Returns the size of this region, in bytes
	pub fn size(&self) -> usize {
		self.layout.size()
	}

	/// Returns the number of `i32` slots in this region
	pub fn int_len(&self) -> usize {
		self.size() / INT_SIZE
	}

	/// Returns the base pointer of this region
	#[inline]
	pub fn as_ptr(&self) -> *mut u8 {
		self.ptr.as_ptr()
	}

	/// Returns this region as bytes.
	///
	/// # Safety
	/// The whole region must be initialized.
	#[inline]
	pub unsafe fn bytes(&self) -> &[u8] {
		slice::from_raw_parts(self.ptr.as_ptr(), self.layout.size())
	}

	/// Returns this region as mutable bytes.
	///
	/// # Safety
	/// The whole region must be initialized.
	#[inline]
	pub unsafe fn bytes_mut(&mut self) -> &mut [u8] {
		slice::from_raw_parts_mut(self.ptr.as_ptr(), self.layout.size())
	}

	/// Decomposes this region into its pointer and layout
	pub(crate) fn into_raw(self) -> (NonNull<u8>, Layout) {
		(self.ptr, self.layout)
	}
}

impl fmt::Debug for Region {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Region")
			.field("kind", &self.kind)
			.field("ptr", &format_args!("{:#010x}", self.ptr.as_ptr() as usize))
			.field("size", &self.layout.size())
			.finish()
	}
}

/// Returns the layout of a region with `size` bytes
pub fn region_layout(size: usize) -> Result<Layout, AllocationError> {
	match size {
		0 => Err(AllocationError::InvalidLayout { size }),
		_ => Layout::from_size_align(size, REGION_ALIGN).map_err(|_| AllocationError::InvalidLayout { size }),
	}
}

/// Allocation error
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[derive(thiserror::Error)]
pub enum AllocationError {
	/// No region may have this size
	#[error("Invalid region size {size}")]
	InvalidLayout { size: usize },

	/// The allocator couldn't provide the memory
	#[error("Allocator was unable to provide {size} bytes")]
	OutOfMemory { size: usize },
}

/// Release ordering error.
///
/// Always a harness defect.
#[derive(Debug)]
#[derive(thiserror::Error)]
pub enum ReleaseOrderingError {
	/// Region was acquired by another strategy.
	///
	/// The region is returned so it may be released by its owner.
	#[error("Region acquired by {} was released by {released_by}", .region.kind())]
	ForeignRegion { region: Region, released_by: StrategyKind },

	/// Held region was acquired by another strategy.
	///
	/// The region stays held, so it may be released by its owner.
	#[error("Held region was acquired by {owner}, not {released_by}")]
	NotOwned { owner: StrategyKind, released_by: StrategyKind },

	/// No region was held
	#[error("No region is currently held")]
	NotHeld,

	/// A region was already held
	#[error("A region is already held")]
	AlreadyHeld,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn layout() {
		let layout = region_layout(DEFAULT_REGION_SIZE).expect("Unable to create layout");
		assert_eq!(layout.size(), 8192);
		assert_eq!(layout.align(), REGION_ALIGN);

		assert_eq!(region_layout(0), Err(AllocationError::InvalidLayout { size: 0 }));
		assert_eq!(
			region_layout(usize::MAX),
			Err(AllocationError::InvalidLayout { size: usize::MAX })
		);
	}

	#[test]
	fn int_slots() {
		// Note: Index 2047 is the last slot of a default region, 2048 is already out of range
		let last_idx = DEFAULT_REGION_SIZE / INT_SIZE - 1;
		assert_eq!(last_idx, 2047);
		assert!(last_idx * INT_SIZE + INT_SIZE <= DEFAULT_REGION_SIZE);
		assert!((last_idx + 1) * INT_SIZE + INT_SIZE > DEFAULT_REGION_SIZE);
	}

	#[test]
	fn kind_names() {
		assert_eq!(StrategyKind::Buffer.to_string(), "buffer");
		assert_eq!(StrategyKind::SegmentIntHandle.to_string(), "segment_int_handle");
		assert_eq!(format!("{:>8}", StrategyKind::Raw), "     raw");
	}
}
