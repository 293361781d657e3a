//! Case registry

// Imports
use crate::{
	allocator::NativeAllocator,
	case::{BenchCase, Case, Mode, Scope},
	config::Config,
	strategy::{BufferStrategy, RawStrategy, SegmentArrayHandleStrategy, SegmentIntHandleStrategy, Strategy},
};

/// Returns all cases, with all strategies allocating from `allocator`.
///
/// # Panics
/// Panics if `config` is invalid. See [`Config::validate`].
pub fn cases<A: NativeAllocator + Clone + 'static>(allocator: &A, config: &Config) -> Vec<Box<dyn Case>> {
	let mut cases = vec![];
	for scope in [Scope::Local, Scope::Global] {
		for mode in [Mode::Read, Mode::Write] {
			cases.push(self::case(BufferStrategy::new(allocator.clone()), mode, scope, config));

			// Note: Uninitialized regions may only be written to. For reads we zero-fill them
			//       when acquiring, which for global cases happens outside of the timed body.
			match (scope, mode) {
				(_, Mode::Read) => cases.push(self::case(RawStrategy::new(allocator.clone(), true), mode, scope, config)),
				(Scope::Local, Mode::Write) => {
					cases.push(self::case(RawStrategy::new(allocator.clone(), false), mode, scope, config));
					cases.push(self::case(RawStrategy::new(allocator.clone(), true), mode, scope, config));
				},
				(Scope::Global, Mode::Write) => {
					cases.push(self::case(RawStrategy::new(allocator.clone(), false), mode, scope, config));
				},
			}

			cases.push(self::case(SegmentArrayHandleStrategy::new(allocator.clone()), mode, scope, config));
			cases.push(self::case(SegmentIntHandleStrategy::new(allocator.clone()), mode, scope, config));
		}
	}

	cases
}

/// Creates a case over `strategy`
fn case<S: Strategy + 'static>(strategy: S, mode: Mode, scope: Scope, config: &Config) -> Box<dyn Case> {
	Box::new(BenchCase::new(
		strategy,
		mode,
		scope,
		config.region_size,
		config.element_count,
	))
}

/// Returns if a case named `name` is selected by `filters`.
///
/// Every case is selected when there are no filters.
pub fn matches_filters(name: &str, filters: &[String]) -> bool {
	filters.is_empty() || filters.iter().any(|filter| name.contains(filter.as_str()))
}

#[cfg(test)]
mod tests {
	use {
		super::*,
		crate::allocator::TrackingAllocator,
		std::collections::HashSet,
	};

	#[test]
	fn all_cases() {
		let allocator = TrackingAllocator::new();
		let cases = self::cases(&allocator, &Config::default());
		let names = cases.iter().map(|case| case.id().to_string()).collect::<Vec<_>>();

		assert_eq!(names.len(), 17);
		assert_eq!(names.iter().collect::<HashSet<_>>().len(), 17, "Duplicate case names: {names:?}");
		for name in [
			"local/buffer_read",
			"local/raw_clean_read",
			"local/segment_array_handle_read",
			"local/segment_int_handle_read",
			"local/buffer_write",
			"local/raw_noclean_write",
			"local/raw_clean_write",
			"local/segment_array_handle_write",
			"local/segment_int_handle_write",
			"global/buffer_read",
			"global/raw_clean_read",
			"global/segment_array_handle_read",
			"global/segment_int_handle_read",
			"global/buffer_write",
			"global/raw_noclean_write",
			"global/segment_array_handle_write",
			"global/segment_int_handle_write",
		] {
			assert!(names.iter().any(|case_name| case_name == name), "Missing case {name}");
		}

		// Note: Defining cases doesn't acquire anything
		assert_eq!(allocator.allocations(), 0);
	}

	#[test]
	fn filters() {
		assert!(matches_filters("local/buffer_read", &[]));
		assert!(matches_filters("local/buffer_read", &["buffer".to_owned()]));
		assert!(matches_filters("global/raw_clean_read", &[
			"buffer".to_owned(),
			"global/raw".to_owned()
		]));
		assert!(!matches_filters("global/raw_clean_read", &["local/".to_owned()]));
	}
}
