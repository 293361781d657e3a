//! Result sink

// Imports
use std::hint;

/// Result sink.
///
/// Consumes values produced by the cases so that the work producing them
/// can't be optimized away.
#[derive(Clone, Default, Debug)]
pub struct Sink {
	/// Number of values consumed
	consumed: u64,

	/// Last value consumed
	last: Option<i32>,
}

impl Sink {
	/// Creates a new, empty, sink
	pub fn new() -> Self {
		Self::default()
	}

	/// Consumes a value
	#[inline]
	pub fn consume(&mut self, value: i32) {
		self.last = Some(hint::black_box(value));
		self.consumed += 1;
	}

	/// Returns the number of values consumed
	pub fn consumed(&self) -> u64 {
		self.consumed
	}

	/// Returns the last value consumed
	pub fn last(&self) -> Option<i32> {
		self.last
	}
}
