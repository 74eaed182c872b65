use super::{GpuProps, Result};

/// Kernel interface version reported by the version handshake.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AbiVersion {
    pub major: u16,
    pub minor: u16,
    /// Whether the driver answered on the legacy single-ioctl interface.
    pub legacy: bool,
}

/// Counter reader setup, one enable bitmask per block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReaderConfig {
    pub buffer_count: u32,
    pub jm_bm: u32,
    pub shader_bm: u32,
    pub tiler_bm: u32,
    pub mmu_l2_bm: u32,
}

impl ReaderConfig {
    /// Every counter of every block enabled.
    pub const fn all(buffer_count: u32) -> Self {
        Self {
            buffer_count,
            jm_bm: u32::MAX,
            shader_bm: u32::MAX,
            tiler_bm: u32::MAX,
            mmu_l2_bm: u32::MAX,
        }
    }
}

/// Outcome of waiting on the reader.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    TimedOut,
    HungUp,
}

/// Sample buffer handed out by [`Reader::get_buffer`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BufferMeta {
    pub timestamp: u64,
    pub event_id: u32,
    pub buffer_idx: u32,
}

/// A GPU device context.
pub trait Device {
    type Reader: Reader;

    fn check_version(&mut self) -> Result<AbiVersion>;

    /// Marks the context as a kernel-side one.
    fn set_flags(&mut self) -> Result<()>;

    fn gpu_props(&mut self) -> Result<GpuProps>;

    fn setup_reader(&mut self, config: &ReaderConfig) -> Result<Self::Reader>;
}

/// The hardware counter reader of a [`Device`].
///
/// Samples land in a ring of `buffer_count` equally sized buffers, mapped
/// read-only into the process with [`map`][Self::map].
pub trait Reader {
    type Mapping: AsRef<[u8]>;

    fn api_version(&self) -> Result<u32>;

    /// Size in bytes of one sample buffer.
    fn buffer_size(&self) -> Result<usize>;

    fn hw_version(&self) -> Result<u32>;

    fn map(&self, len: usize) -> Result<Self::Mapping>;

    /// Requests a manual dump of every enabled counter.
    fn dump(&self) -> Result<()>;

    /// Waits for a dump to become readable, `timeout_ms < 0` waits forever.
    fn wait(&self, timeout_ms: i32) -> Result<Readiness>;

    fn get_buffer(&self) -> Result<BufferMeta>;

    /// Hands a buffer obtained from [`get_buffer`][Self::get_buffer] back to the kernel.
    fn put_buffer(&self, meta: &BufferMeta) -> Result<()>;
}
