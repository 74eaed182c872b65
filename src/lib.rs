//! Nested per-thread timing spans and Arm Mali hardware counter sampling.
//!
//! ## Spans
//!
//! Each profiled thread registers once, then brackets work with named spans.
//! Finished spans land in the thread's bounded event ring without any
//! allocation, and another thread drains them for display.
//!
//! ```rust
//! use mali_spans::capture::{self, Registry};
//!
//! let slot = capture::init_capture_for_this_thread(1, "main");
//! for _ in 0..3 {
//!     mali_spans::scope!("frame");
//!     {
//!         mali_spans::scope!("update");
//!     }
//! }
//!
//! let mut events = vec![];
//! Registry::global().drain(slot, &mut events);
//! assert_eq!(events.len(), 6);
//! assert_eq!(events[1].name.as_str(), "update");
//! assert_eq!(events[1].depth, 2);
//!
//! capture::stop_capture_for_this_thread();
//! ```
//!
//! ## GPU counters
//!
//! On devices with a Mali GPU and the kbase driver, [`hwc`] samples a fixed
//! set of hardware counters. Every counter reads 0 when the GPU is absent or
//! unsupported.
//!
//! ```rust,no_run
//! use mali_spans::hwc::{self, GpuCounter};
//!
//! hwc::init_hardware_counters(&[GpuCounter::GpuCycles]);
//! hwc::sample();
//! println!("{}", hwc::get_counter_value(GpuCounter::GpuCycles));
//! ```

pub mod capture;
pub mod clock;
pub mod config;
pub mod drain;
mod ffi;
pub mod hwc;
