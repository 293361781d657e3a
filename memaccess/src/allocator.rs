//! Native allocators

// Imports
use {
	crate::region::AllocationError,
	std::{
		alloc::{self, Layout},
		cell::Cell,
		ptr::NonNull,
		rc::Rc,
	},
};

/// Native allocator.
///
/// Provides raw memory to the strategies. Memory isn't zero-filled unless requested.
pub trait NativeAllocator {
	/// Allocates memory for `layout`, zero-filling it if `zeroed`.
	fn allocate(&self, layout: Layout, zeroed: bool) -> Result<NonNull<u8>, AllocationError>;

	/// Frees memory.
	///
	/// # Safety
	/// `ptr` must have been returned by [`Self::allocate`] on this allocator with `layout`,
	/// and must not have been freed yet.
	unsafe fn free(&self, ptr: NonNull<u8>, layout: Layout);
}

/// System allocator
#[derive(Clone, Copy, Default, Debug)]
pub struct SystemAllocator;

impl NativeAllocator for SystemAllocator {
	fn allocate(&self, layout: Layout, zeroed: bool) -> Result<NonNull<u8>, AllocationError> {
		if layout.size() == 0 {
			return Err(AllocationError::InvalidLayout { size: 0 });
		}

		// SAFETY: `layout` has a non-zero size
		let ptr = unsafe {
			match zeroed {
				true => alloc::alloc_zeroed(layout),
				false => alloc::alloc(layout),
			}
		};

		NonNull::new(ptr).ok_or(AllocationError::OutOfMemory { size: layout.size() })
	}

	unsafe fn free(&self, ptr: NonNull<u8>, layout: Layout) {
		alloc::dealloc(ptr.as_ptr(), layout);
	}
}

/// Tracking allocator.
///
/// Counts all allocations and frees made through it (and all of its clones),
/// and may be told to fail all allocations.
#[derive(Clone, Debug)]
pub struct TrackingAllocator<A = SystemAllocator> {
	/// Inner allocator
	inner: A,

	/// Counters, shared between clones
	counters: Rc<Counters>,
}

#[derive(Default, Debug)]
struct Counters {
	allocations: Cell<usize>,
	frees:       Cell<usize>,
	failures:    Cell<usize>,
	fail:        Cell<bool>,
}

impl TrackingAllocator {
	/// Creates a tracking allocator over the system allocator
	pub fn new() -> Self {
		Self::with_inner(SystemAllocator)
	}

	/// Creates a tracking allocator that fails every allocation
	pub fn failing() -> Self {
		let allocator = Self::new();
		allocator.set_fail(true);
		allocator
	}
}

impl Default for TrackingAllocator {
	fn default() -> Self {
		Self::new()
	}
}

impl<A> TrackingAllocator<A> {
	/// Creates a tracking allocator over `inner`
	pub fn with_inner(inner: A) -> Self {
		Self {
			inner,
			counters: Rc::new(Counters::default()),
		}
	}

	/// Sets whether all allocations should fail
	pub fn set_fail(&self, fail: bool) {
		self.counters.fail.set(fail);
	}

	/// Returns the number of successful allocations
	pub fn allocations(&self) -> usize {
		self.counters.allocations.get()
	}

	/// Returns the number of frees
	pub fn frees(&self) -> usize {
		self.counters.frees.get()
	}

	/// Returns the number of failed allocations
	pub fn failures(&self) -> usize {
		self.counters.failures.get()
	}

	/// Returns the number of allocations not yet freed
	pub fn live(&self) -> usize {
		self.allocations() - self.frees()
	}
}

impl<A: NativeAllocator> NativeAllocator for TrackingAllocator<A> {
	fn allocate(&self, layout: Layout, zeroed: bool) -> Result<NonNull<u8>, AllocationError> {
		let res = match self.counters.fail.get() {
			true => Err(AllocationError::OutOfMemory { size: layout.size() }),
			false => self.inner.allocate(layout, zeroed),
		};

		match res {
			Ok(_) => self.counters.allocations.set(self.counters.allocations.get() + 1),
			Err(_) => self.counters.failures.set(self.counters.failures.get() + 1),
		}

		res
	}

	unsafe fn free(&self, ptr: NonNull<u8>, layout: Layout) {
		assert!(self.live() > 0, "Freed more memory than was allocated");
		self.counters.frees.set(self.counters.frees.get() + 1);
		self.inner.free(ptr, layout);
	}
}
