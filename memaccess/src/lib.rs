//! Memory access micro-benchmarks (`memaccess`)
//!
//! Compares reading and writing `i32`s in a block of native memory through
//! a byte buffer, raw pointers and typed segment handles, with and without
//! acquiring and releasing the memory inside the timed region.

// Modules
pub mod allocator;
pub mod case;
pub mod config;
pub mod driver;
pub mod region;
pub mod registry;
pub mod sink;
pub mod strategy;

// Exports
pub use self::{
	allocator::{NativeAllocator, SystemAllocator, TrackingAllocator},
	case::{BenchCase, Case, CaseId, Context, Mode, Scope},
	config::Config,
	driver::{Driver, RunReport},
	region::{Region, StrategyKind},
	sink::Sink,
	strategy::Strategy,
};
