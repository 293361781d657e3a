//! Utilities

// Modules
pub mod logger;

// Imports
use {
	byteorder::{ByteOrder, NativeEndian},
	std::{cell::RefCell, fmt},
};

/// Extension trait for `[u8]` to access native-endian `i32`s by byte offset
#[extend::ext(name = NativeInt32Bytes)]
pub impl [u8] {
	/// Reads the `i32` at `byte_offset`.
	///
	/// # Panics
	/// Panics if `byte_offset..byte_offset + 4` is out of bounds.
	#[inline]
	fn read_i32_at(&self, byte_offset: usize) -> i32 {
		NativeEndian::read_i32(&self[byte_offset..byte_offset + 4])
	}

	/// Writes `value` at `byte_offset`.
	///
	/// # Panics
	/// Panics if `byte_offset..byte_offset + 4` is out of bounds.
	#[inline]
	fn write_i32_at(&mut self, byte_offset: usize, value: i32) {
		NativeEndian::write_i32(&mut self[byte_offset..byte_offset + 4], value);
	}
}

/// [`fmt::Display`] helper to display using a `FnMut(&mut fmt::Formatter)`
pub struct DisplayWrapper<F: FnMut(&mut fmt::Formatter) -> fmt::Result>(RefCell<F>);

impl<F: FnMut(&mut fmt::Formatter) -> fmt::Result> DisplayWrapper<F> {
	/// Creates a new display wrapper
	#[must_use]
	pub const fn new(func: F) -> Self {
		Self(RefCell::new(func))
	}
}


impl<F: FnMut(&mut fmt::Formatter) -> fmt::Result> fmt::Display for DisplayWrapper<F> {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		// Note: `f` cannot be re-entrant, so this cannot fail
		self.0.borrow_mut()(f)
	}
}
