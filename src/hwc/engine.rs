use std::time::Duration;

use super::{
    identify, resolve, Device, EnabledCounter, Error, GpuCounter, HardwareInfo, Product,
    Readiness, Reader, ReaderConfig, Result, SampleLayout,
};
use crate::config::Opts;
use crate::ffi::kbase::HWCNT_READER_API;

/// Oldest kernel ABI the engine talks to.
pub const MIN_ABI_MAJOR: u16 = 10;

/// Oldest counter hardware version with the block layout the engine reads.
pub const MIN_HW_VERSION: u32 = 5;

/// Lifecycle of the counters.
///
/// An [`Engine`] only ever reports the last three, the others are seen
/// through [`HardwareCounters::state`][super::HardwareCounters::state].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum State {
    Uninitialized,
    Initializing,
    Ready,
    Sampling,
    Stopped,
}

/// Samples the hardware counters of one GPU.
///
/// Values are deltas: the kernel resets the counters on every dump, so each
/// [`sample`][Self::sample] reports the activity since the previous one.
pub struct Engine<D: Device> {
    state: State,
    product: &'static Product,
    info: HardwareInfo,
    counters: [EnabledCounter; GpuCounter::COUNT],
    values: [u64; GpuCounter::COUNT],
    raw: Vec<u32>,
    timestamp: u64,
    buffer_size: usize,
    buffer_count: u32,
    poll_timeout: i32,
    // Field order is drop order: unmap before closing the reader, then the device.
    mapping: Option<<D::Reader as Reader>::Mapping>,
    reader: Option<D::Reader>,
    device: Option<D>,
}

impl<D: Device> Engine<D> {
    /// Negotiates with `device`, sets up and maps the counter reader, and
    /// resolves `opts.counters` for the detected product.
    ///
    /// Everything acquired so far is released if any step fails.
    pub fn new(mut device: D, opts: &Opts) -> Result<Self> {
        let version = device.check_version()?;
        if version.major < MIN_ABI_MAJOR {
            return Err(Error::UnsupportedAbi {
                major: version.major,
                minor: version.minor,
            });
        }
        device.set_flags()?;

        let props = device.gpu_props()?;
        let info = HardwareInfo::new(&props);
        let product = identify(info.product_id).ok_or(Error::UnknownProduct(info.product_id))?;
        log::info!(
            "Mali {} r{}p{}: {} shader cores ({:#x}), {} L2 slices, ABI {}.{}{}",
            product.name,
            info.major_revision,
            info.minor_revision,
            info.num_cores,
            info.core_mask,
            info.num_l2_slices,
            version.major,
            version.minor,
            if version.legacy { " (legacy)" } else { "" },
        );

        let reader = device.setup_reader(&ReaderConfig::all(opts.buffer_count))?;
        let api = reader.api_version()?;
        if api != HWCNT_READER_API {
            return Err(Error::ReaderApi(api));
        }
        let buffer_size = reader.buffer_size()?;
        if buffer_size == 0 || buffer_size % 4 != 0 {
            return Err(Error::BufferSize(buffer_size));
        }
        let hw_version = reader.hw_version()?;
        if hw_version < MIN_HW_VERSION {
            return Err(Error::HwVersion(hw_version));
        }
        let mapping = reader.map(opts.buffer_count as usize * buffer_size)?;

        let counters = resolve(product, &opts.counters);

        Ok(Self {
            state: State::Ready,
            product,
            info,
            counters,
            values: [0; GpuCounter::COUNT],
            raw: vec![0; buffer_size / 4],
            timestamp: 0,
            buffer_size,
            buffer_count: opts.buffer_count,
            poll_timeout: opts.poll_timeout_ms(),
            mapping: Some(mapping),
            reader: Some(reader),
            device: Some(device),
        })
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == State::Ready
    }

    pub fn product(&self) -> &'static Product {
        self.product
    }

    pub fn info(&self) -> &HardwareInfo {
        &self.info
    }

    pub fn counter(&self, counter: GpuCounter) -> &EnabledCounter {
        &self.counters[counter.index()]
    }

    /// Kernel timestamp of the last collected dump.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// The last collected dump.
    pub fn raw(&self) -> &[u32] {
        &self.raw
    }

    pub fn poll_timeout(&self) -> Option<Duration> {
        u64::try_from(self.poll_timeout).ok().map(Duration::from_millis)
    }

    /// Last sampled value of `counter`, 0 if it is disabled or nothing was sampled yet.
    pub fn value(&self, counter: GpuCounter) -> u64 {
        self.values[counter.index()]
    }

    /// Collects one dump without updating the values, to start the first
    /// [`sample`][Self::sample] from freshly reset counters.
    pub fn start(&mut self) -> Result<()> {
        if self.state != State::Ready {
            return Ok(());
        }
        self.state = State::Sampling;
        let collected = self.collect();
        self.state = State::Ready;
        collected
    }

    /// Requests a dump, waits for it and updates every enabled counter.
    ///
    /// No-op unless the engine is ready. On error the values keep their
    /// previous sample.
    pub fn sample(&mut self) -> Result<()> {
        self.start()?;
        self.update();
        Ok(())
    }

    fn collect(&mut self) -> Result<()> {
        let (Some(reader), Some(mapping)) = (&self.reader, &self.mapping) else {
            return Ok(());
        };

        reader.dump()?;
        match reader.wait(self.poll_timeout)? {
            Readiness::Ready => {}
            Readiness::TimedOut => return Err(Error::Timeout),
            Readiness::HungUp => return Err(Error::HungUp),
        }

        let meta = reader.get_buffer()?;
        let copied = copy_buffer(
            &mut self.raw,
            mapping.as_ref(),
            meta.buffer_idx,
            self.buffer_count,
            self.buffer_size,
        );
        // Hand the buffer back even if it was unusable.
        reader.put_buffer(&meta)?;
        copied?;

        self.timestamp = meta.timestamp;
        Ok(())
    }

    fn update(&mut self) {
        if self.state != State::Ready {
            return;
        }
        let layout = SampleLayout::new(&self.info);
        for c in &self.counters {
            if let Some(index) = c.index {
                let raw = layout.read(&self.raw, c.block, index);
                self.values[c.counter.index()] = c.transform.apply(raw);
            }
        }
    }

    /// Unmaps the sample buffers and closes the reader and the device.
    ///
    /// Values read as 0 afterwards and sampling becomes a no-op.
    pub fn stop(&mut self) {
        if self.state == State::Stopped {
            return;
        }
        self.mapping = None;
        self.reader = None;
        self.device = None;
        self.values = [0; GpuCounter::COUNT];
        self.state = State::Stopped;
        log::debug!("Mali {} counters stopped", self.product.name);
    }
}

fn copy_buffer(
    raw: &mut [u32],
    mapping: &[u8],
    buffer_idx: u32,
    buffer_count: u32,
    buffer_size: usize,
) -> Result<()> {
    if buffer_idx >= buffer_count {
        return Err(Error::BufferIndex(buffer_idx));
    }
    let start = buffer_idx as usize * buffer_size;
    let buffer = mapping
        .get(start..start + buffer_size)
        .ok_or(Error::BufferIndex(buffer_idx))?;
    for (word, bytes) in raw.iter_mut().zip(buffer.chunks_exact(4)) {
        *word = u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    }
    Ok(())
}
