//! Arm Mali hardware counter sampling through the kbase driver.
//!
//! The [`Engine`] talks to the driver through the [`Device`] and [`Reader`]
//! traits, [`KbaseDevice`] being the real implementation on top of
//! `/dev/mali0`. A process-wide instance is exposed through
//! [`init_hardware_counters`], [`sample`] and [`get_counter_value`], which
//! never fail loudly: if the GPU cannot be set up every counter reads 0.
//!
//! # Examples
//!
//! ```rust,no_run
//! use mali_spans::hwc::{self, GpuCounter};
//!
//! if hwc::init_hardware_counters(&[GpuCounter::GpuCycles, GpuCounter::FragmentCycles]) {
//!     hwc::sample();
//!     println!("{} GPU cycles", hwc::get_counter_value(GpuCounter::GpuCycles));
//! }
//! hwc::stop_hardware_counters();
//! ```

#[cfg(test)]
mod test;

mod block;
mod driver;
mod engine;
mod global;
mod kbase;
mod mapping;
mod names;
mod product;
mod props;

use std::io;
use std::path::PathBuf;

pub use block::*;
pub use driver::*;
pub use engine::*;
pub use global::*;
pub use kbase::{KbaseDevice, KbaseReader, Mapping};
pub use mapping::*;
pub use names::NameTable;
pub use product::*;
pub use props::*;
use thiserror::Error;

/// Abstract counters, resolved to a hardware counter per GPU family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GpuCounter {
    GpuCycles,
    FragmentCycles,
    TilerCycles,
    FragElim,
    Tiles,

    ShaderCycles,
    ShaderArithmeticCycles,
    ShaderTextureCycles,
    Varying16Bits,
    Varying32Bits,

    ExternalMemoryReadBytes,
    ExternalMemoryWriteBytes,
}

impl GpuCounter {
    pub const COUNT: usize = 12;

    pub const ALL: [GpuCounter; Self::COUNT] = [
        GpuCounter::GpuCycles,
        GpuCounter::FragmentCycles,
        GpuCounter::TilerCycles,
        GpuCounter::FragElim,
        GpuCounter::Tiles,
        GpuCounter::ShaderCycles,
        GpuCounter::ShaderArithmeticCycles,
        GpuCounter::ShaderTextureCycles,
        GpuCounter::Varying16Bits,
        GpuCounter::Varying32Bits,
        GpuCounter::ExternalMemoryReadBytes,
        GpuCounter::ExternalMemoryWriteBytes,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Hardware counter blocks, in the order of the driver's name tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Block {
    /// Job manager.
    Jm = 0,
    Tiler = 1,
    /// Shader cores, summed over every present core.
    Shader = 2,
    /// MMU and L2 cache slices, summed over every slice.
    Mmu = 3,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to open {}: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },
    #[error("{op} failed: {source}")]
    Ioctl { op: &'static str, source: io::Error },
    #[error("unsupported kernel ABI version {major}.{minor}")]
    UnsupportedAbi { major: u16, minor: u16 },
    #[error("unexpected counter reader API version {0}")]
    ReaderApi(u32),
    #[error("invalid sample buffer size {0}")]
    BufferSize(usize),
    #[error("unsupported hardware version {0}")]
    HwVersion(u32),
    #[error("failed to map sample buffers: {0}")]
    Map(#[source] io::Error),
    #[error("unidentified GPU product {0:#x}")]
    UnknownProduct(u32),
    #[error("truncated GPU property blob at byte {0}")]
    TruncatedProps(usize),
    #[error("timed out waiting for a counter dump")]
    Timeout,
    #[error("counter reader hung up")]
    HungUp,
    #[error("kernel returned sample buffer {0} out of range")]
    BufferIndex(u32),
}

impl Error {
    pub(crate) fn ioctl(op: &'static str) -> impl FnOnce(io::Error) -> Self {
        move |source| Self::Ioctl { op, source }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
