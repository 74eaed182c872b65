use std::path::PathBuf;
use std::time::Duration;

use crate::hwc::GpuCounter;

/// Maximum number of threads registered for capture at the same time.
pub const THREADS_CAP: usize = 32;

/// Slots per thread ring-buffer.
///
/// One slot always stays empty to tell a full ring from an empty one,
/// so at most `EVENTS_CAP - 1` events can be outstanding per thread.
pub const EVENTS_CAP: usize = 4096;

/// Maximum span and capture name length in bytes, longer names are truncated.
pub const NAME_CAP: usize = 32;

/// Capacity of [`UnpackedCapture`][crate::drain::UnpackedCapture].
pub const SAVED_EVENTS: usize = 1024;

/// Byte budget of the per-thread span arena.
pub const SPAN_ARENA_BYTES: usize = 8 << 20;

/// Path of the first Mali device node.
pub const MALI_DEVICE_PATH: &str = "/dev/mali0";

/// Sample buffers requested from the counter reader.
pub const BUFFER_COUNT: u32 = 16;

/// Hardware counter engine options.
#[derive(Clone, Debug)]
pub struct Opts {
    /// Device node to open.
    pub device: PathBuf,

    /// Number of sample buffers the kernel keeps for the reader.
    pub buffer_count: u32,

    /// Counters to resolve, the others always read as 0.
    pub counters: Vec<GpuCounter>,

    /// How long [`sample`][crate::hwc::Engine::sample] waits for the kernel
    /// to deliver a dump, `None` waits forever.
    pub poll_timeout: Option<Duration>,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            device: PathBuf::from(MALI_DEVICE_PATH),
            buffer_count: BUFFER_COUNT,
            counters: vec![
                GpuCounter::GpuCycles,
                GpuCounter::FragmentCycles,
                GpuCounter::TilerCycles,
                GpuCounter::Varying16Bits,
                GpuCounter::Varying32Bits,
            ],
            poll_timeout: Some(Duration::from_secs(1)),
        }
    }
}

impl Opts {
    // Rounds up, a sub-millisecond timeout must not turn into a non-blocking poll.
    pub(crate) fn poll_timeout_ms(&self) -> i32 {
        match self.poll_timeout {
            Some(d) => d.as_micros().div_ceil(1000).min(i32::MAX as u128) as i32,
            None => -1,
        }
    }
}
