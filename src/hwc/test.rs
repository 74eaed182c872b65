use std::cell::Cell;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::names::{THEX, TMIX};
use super::*;
use crate::config::Opts;

const THEX_ID: u32 = 0x6001;
const TMIX_ID: u32 = 0x6000;
const T76X_ID: u32 = 0x0750;

struct FakeDevice {
    abi_major: u16,
    props: GpuProps,
    api: u32,
    hw_version: u32,
    buffer_size: usize,
    samples: Vec<Vec<u32>>,
    readiness: Arc<Mutex<Readiness>>,
    live_readers: Arc<AtomicUsize>,
}

impl FakeDevice {
    fn new(product_id: u32, core_mask: u64, num_l2_slices: u32) -> Self {
        let mut core_masks = [0; 16];
        core_masks[0] = core_mask;
        let core_positions = 64 - core_mask.leading_zeros() as usize;
        Self {
            abi_major: 11,
            props: GpuProps {
                product_id,
                num_l2_slices,
                num_groups: 1,
                num_core_groups: 1,
                core_masks,
                ..Default::default()
            },
            api: 1,
            hw_version: 5,
            buffer_size: (2 + num_l2_slices as usize + core_positions) * 64 * 4,
            samples: vec![],
            readiness: Arc::new(Mutex::new(Readiness::Ready)),
            live_readers: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn zeroed(&self) -> Vec<u32> {
        vec![0; self.buffer_size / 4]
    }

    fn with_sample(mut self, raw: Vec<u32>) -> Self {
        self.samples.push(raw);
        self
    }
}

impl Device for FakeDevice {
    type Reader = FakeReader;

    fn check_version(&mut self) -> Result<AbiVersion> {
        Ok(AbiVersion {
            major: self.abi_major,
            minor: 0,
            legacy: false,
        })
    }

    fn set_flags(&mut self) -> Result<()> {
        Ok(())
    }

    fn gpu_props(&mut self) -> Result<GpuProps> {
        Ok(self.props.clone())
    }

    fn setup_reader(&mut self, config: &ReaderConfig) -> Result<FakeReader> {
        assert_eq!(*config, ReaderConfig::all(config.buffer_count));
        self.live_readers.fetch_add(1, Ordering::SeqCst);
        Ok(FakeReader {
            api: self.api,
            hw_version: self.hw_version,
            buffer_size: self.buffer_size,
            buffer_count: config.buffer_count,
            samples: self.samples.clone(),
            next: Cell::new(0),
            readiness: Arc::clone(&self.readiness),
            live: Arc::clone(&self.live_readers),
        })
    }
}

struct FakeReader {
    api: u32,
    hw_version: u32,
    buffer_size: usize,
    buffer_count: u32,
    samples: Vec<Vec<u32>>,
    next: Cell<u32>,
    readiness: Arc<Mutex<Readiness>>,
    live: Arc<AtomicUsize>,
}

impl Drop for FakeReader {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Reader for FakeReader {
    type Mapping = Vec<u8>;

    fn api_version(&self) -> Result<u32> {
        Ok(self.api)
    }

    fn buffer_size(&self) -> Result<usize> {
        Ok(self.buffer_size)
    }

    fn hw_version(&self) -> Result<u32> {
        Ok(self.hw_version)
    }

    fn map(&self, len: usize) -> Result<Vec<u8>> {
        assert_eq!(len, self.buffer_count as usize * self.buffer_size);
        let mut bytes = vec![0; len];
        for (i, sample) in self.samples.iter().enumerate() {
            let base = i * self.buffer_size;
            for (j, word) in sample.iter().enumerate() {
                let at = base + j * 4;
                bytes[at..at + 4].copy_from_slice(&word.to_ne_bytes());
            }
        }
        Ok(bytes)
    }

    fn dump(&self) -> Result<()> {
        Ok(())
    }

    fn wait(&self, _: i32) -> Result<Readiness> {
        Ok(*self.readiness.lock().unwrap())
    }

    fn get_buffer(&self) -> Result<BufferMeta> {
        let idx = self.next.get();
        self.next.set((idx + 1) % self.buffer_count);
        Ok(BufferMeta {
            timestamp: 1000 * (idx as u64 + 1),
            event_id: 0,
            buffer_idx: idx,
        })
    }

    fn put_buffer(&self, _: &BufferMeta) -> Result<()> {
        Ok(())
    }
}

fn set(raw: &mut [u32], position: usize, index: usize, value: u32) {
    raw[position * 64 + index] = value;
}

fn opts(counters: &[GpuCounter]) -> Opts {
    Opts {
        buffer_count: 4,
        counters: counters.to_vec(),
        ..Default::default()
    }
}

// THEx with cores at positions 0, 1 and 3 and two L2 slices, whose second
// buffer holds known counter values.
fn thex() -> FakeDevice {
    let dev = FakeDevice::new(THEX_ID, 0b1011, 2);
    let mut raw = dev.zeroed();
    set(&mut raw, 0, 6, 1000); // GPU_ACTIVE
    set(&mut raw, 0, 10, 800); // JS0_ACTIVE
    set(&mut raw, 2, 32, 3); // L2_EXT_READ_BEATS, slice 0
    set(&mut raw, 3, 32, 5); // L2_EXT_READ_BEATS, slice 1
    set(&mut raw, 4, 26, 10); // EXEC_CORE_ACTIVE, core 0
    set(&mut raw, 5, 26, 20); // core 1
    set(&mut raw, 6, 26, 999); // absent core 2
    set(&mut raw, 7, 26, 30); // core 3
    let first = dev.zeroed();
    dev.with_sample(first).with_sample(raw)
}

#[test]
fn test_parse_blob() {
    let mut blob = vec![];
    let mut put = |id: u32, size: u32, value: &[u8]| {
        blob.extend_from_slice(&(id << 2 | size).to_le_bytes());
        blob.extend_from_slice(value);
    };
    put(1, 2, &THEX_ID.to_le_bytes());
    put(3, 0, &[2]);
    put(4, 1, &1u16.to_le_bytes());
    put(15, 0, &[2]);
    put(99, 2, &7u32.to_le_bytes());
    put(62, 2, &2u32.to_le_bytes());
    put(64, 3, &0b0011u64.to_le_bytes());
    put(65, 3, &0b1000u64.to_le_bytes());

    let props = parse_blob(&blob).unwrap();
    assert_eq!(props.product_id, THEX_ID);
    assert_eq!(props.minor_revision, 2);
    assert_eq!(props.major_revision, 1);
    assert_eq!(props.num_l2_slices, 2);
    assert_eq!(props.num_core_groups, 2);
    assert_eq!(props.core_mask(), 0b1011);
}

#[test]
fn test_parse_blob_truncated() {
    let mut blob = vec![];
    blob.extend_from_slice(&(1u32 << 2 | 2).to_le_bytes());
    blob.extend_from_slice(&THEX_ID.to_le_bytes());
    blob.extend_from_slice(&(15u32 << 2 | 3).to_le_bytes());
    blob.extend_from_slice(&[1, 2, 3]);

    match parse_blob(&blob) {
        Err(Error::TruncatedProps(8)) => {}
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(parse_blob(&[]).unwrap(), GpuProps::default());
}

#[test]
fn test_core_remap() {
    assert_eq!(core_remap(0b1011_0100), vec![2, 4, 5, 7]);
    assert!(core_remap(0).is_empty());

    let props = FakeDevice::new(THEX_ID, 0b1011, 2).props;
    let info = HardwareInfo::new(&props);
    assert_eq!(info.core_mask, 0b1011);
    assert_eq!(info.num_cores, 3);
    assert_eq!(info.core_remap, vec![0, 1, 3]);
}

#[test]
fn test_identify() {
    let p = identify(THEX_ID).unwrap();
    assert_eq!(p.name, "THEx");
    assert_eq!(p.family, Family::Bifrost);
    assert_eq!(identify(TMIX_ID).unwrap().names.prefix(), "TMIx");

    // Revision bits are outside the product mask.
    assert_eq!(identify(0x6001 | 0x0230).unwrap().name, "THEx");
    assert_eq!(identify(0x1234_0750).unwrap().family, Family::Midgard);

    assert!(identify(0x9999).is_none());
    assert_eq!(family(0x9999), Family::Bifrost);
    assert_eq!(family(T76X_ID), Family::Midgard);
}

#[test]
fn test_mapping() {
    let m = mapping(Family::Bifrost, GpuCounter::GpuCycles).unwrap();
    assert_eq!(m.block, Block::Jm);
    assert_eq!(m.name, "GPU_ACTIVE");
    assert_eq!(m.transform, Transform::Identity);

    let m = mapping(Family::Midgard, GpuCounter::ExternalMemoryWriteBytes).unwrap();
    assert_eq!(m.block, Block::Mmu);
    assert_eq!(m.transform.apply(10), 160);

    assert!(mapping(Family::Midgard, GpuCounter::ShaderCycles).is_none());
    assert_eq!(
        mapping(Family::Midgard, GpuCounter::Tiles).unwrap().name,
        "FRAG_NUM_TILES"
    );
    assert_eq!(
        mapping(Family::Bifrost, GpuCounter::Tiles).unwrap().name,
        "FRAG_PTILES"
    );
}

#[test]
fn test_name_table() {
    assert_eq!(THEX.find(Block::Jm, "GPU_ACTIVE"), Some(6));
    assert_eq!(THEX.find(Block::Mmu, "L2_EXT_READ_BEATS"), Some(32));
    assert_eq!(THEX.find(Block::Shader, "TEX_FILT_NUM_OPERATIONS"), Some(43));
    assert_eq!(TMIX.find(Block::Shader, "TEX_FILT_NUM_OPERATIONS"), None);
    // Full names carry the product prefix.
    assert_eq!(THEX.find(Block::Jm, "THEx_JS0_ACTIVE"), Some(10));
    assert_eq!(THEX.name(Block::Tiler, 4).as_deref(), Some("THEx_TILER_ACTIVE"));
    assert_eq!(THEX.name(Block::Tiler, 0), None);
}

#[test]
fn test_resolve() {
    let product = identify(T76X_ID).unwrap();
    let counters = resolve(
        product,
        &[
            GpuCounter::TilerCycles,
            GpuCounter::ShaderCycles,
            GpuCounter::Varying16Bits,
        ],
    );

    let tiler = counters[GpuCounter::TilerCycles.index()];
    assert_eq!(tiler.block, Block::Tiler);
    assert_eq!(tiler.index, Some(45));
    // No Midgard equivalent.
    assert!(!counters[GpuCounter::ShaderCycles.index()].is_enabled());
    // Mapped, but the name is absent from the table.
    assert!(!counters[GpuCounter::Varying16Bits.index()].is_enabled());
    // Not requested.
    assert!(!counters[GpuCounter::GpuCycles.index()].is_enabled());
}

#[test]
fn test_sample_layout() {
    let info = HardwareInfo::new(&FakeDevice::new(THEX_ID, 0b1011, 2).props);
    let layout = SampleLayout::new(&info);

    assert_eq!(layout.offset(Block::Jm, 0), Some(0));
    assert_eq!(layout.offset(Block::Tiler, 0), Some(64));
    assert_eq!(layout.offset(Block::Mmu, 1), Some(3 * 64));
    assert_eq!(layout.offset(Block::Mmu, 2), None);
    assert_eq!(layout.offset(Block::Shader, 2), Some(7 * 64));
    assert_eq!(layout.offset(Block::Shader, 3), None);

    let raw = thex().samples.pop().unwrap();
    assert_eq!(layout.read(&raw, Block::Shader, 26), 60);
    assert_eq!(layout.read(&raw, Block::Mmu, 32), 8);
    // Short samples read as 0 past their end.
    assert_eq!(layout.read(&raw[..64], Block::Shader, 26), 0);
}

#[test]
fn test_engine_sample() {
    let dev = thex();
    let mut engine = Engine::new(
        dev,
        &opts(&[
            GpuCounter::GpuCycles,
            GpuCounter::FragmentCycles,
            GpuCounter::ShaderCycles,
            GpuCounter::ExternalMemoryReadBytes,
        ]),
    )
    .unwrap();
    assert_eq!(engine.state(), State::Ready);
    assert_eq!(engine.product().name, "THEx");
    assert_eq!(engine.info().num_cores, 3);

    let gpu_cycles = engine.counter(GpuCounter::GpuCycles);
    assert_eq!(gpu_cycles.block, Block::Jm);
    assert_eq!(gpu_cycles.index, Some(6));

    engine.start().unwrap();
    assert_eq!(engine.value(GpuCounter::GpuCycles), 0);
    assert_eq!(engine.timestamp(), 1000);

    engine.sample().unwrap();
    assert_eq!(engine.state(), State::Ready);
    assert_eq!(engine.timestamp(), 2000);
    assert_eq!(engine.value(GpuCounter::GpuCycles), 1000);
    assert_eq!(engine.value(GpuCounter::FragmentCycles), 800);
    assert_eq!(engine.value(GpuCounter::ShaderCycles), 60);
    assert_eq!(engine.value(GpuCounter::ExternalMemoryReadBytes), 8 * 16);
    // Present in the sample, but not requested.
    assert_eq!(engine.value(GpuCounter::TilerCycles), 0);
}

#[test]
fn test_engine_stop() {
    let dev = thex();
    let live = Arc::clone(&dev.live_readers);
    let mut engine = Engine::new(dev, &opts(&[GpuCounter::GpuCycles])).unwrap();
    engine.start().unwrap();
    engine.sample().unwrap();
    assert_eq!(live.load(Ordering::SeqCst), 1);

    engine.stop();
    assert_eq!(engine.state(), State::Stopped);
    assert_eq!(live.load(Ordering::SeqCst), 0);
    assert_eq!(engine.value(GpuCounter::GpuCycles), 0);

    engine.sample().unwrap();
    assert_eq!(engine.value(GpuCounter::GpuCycles), 0);
}

#[test]
fn test_engine_timeout() {
    let dev = thex();
    let readiness = Arc::clone(&dev.readiness);
    let mut engine = Engine::new(dev, &opts(&[GpuCounter::GpuCycles])).unwrap();
    engine.start().unwrap();
    engine.sample().unwrap();

    *readiness.lock().unwrap() = Readiness::TimedOut;
    assert!(matches!(engine.sample(), Err(Error::Timeout)));
    assert_eq!(engine.state(), State::Ready);
    assert_eq!(engine.value(GpuCounter::GpuCycles), 1000);

    *readiness.lock().unwrap() = Readiness::HungUp;
    assert!(matches!(engine.sample(), Err(Error::HungUp)));
}

#[test]
fn test_poll_timeout() {
    let mut opts = opts(&[GpuCounter::GpuCycles]);
    let engine = Engine::new(thex(), &opts).unwrap();
    assert_eq!(engine.poll_timeout(), Some(Duration::from_secs(1)));

    opts.poll_timeout = Some(Duration::from_micros(300));
    let engine = Engine::new(thex(), &opts).unwrap();
    assert_eq!(engine.poll_timeout(), Some(Duration::from_millis(1)));

    opts.poll_timeout = Some(Duration::from_micros(2001));
    assert_eq!(opts.poll_timeout_ms(), 3);

    opts.poll_timeout = None;
    let engine = Engine::new(thex(), &opts).unwrap();
    assert_eq!(engine.poll_timeout(), None);
}

#[test]
fn test_engine_init_failures() {
    let opts = opts(&[GpuCounter::GpuCycles]);

    let mut dev = thex();
    dev.abi_major = 9;
    assert!(matches!(
        Engine::new(dev, &opts),
        Err(Error::UnsupportedAbi { major: 9, .. })
    ));

    let mut dev = thex();
    dev.api = 2;
    let live = Arc::clone(&dev.live_readers);
    assert!(matches!(Engine::new(dev, &opts), Err(Error::ReaderApi(2))));
    assert_eq!(live.load(Ordering::SeqCst), 0);

    let mut dev = thex();
    dev.hw_version = 4;
    assert!(matches!(Engine::new(dev, &opts), Err(Error::HwVersion(4))));

    let mut dev = thex();
    dev.buffer_size = 0;
    assert!(matches!(Engine::new(dev, &opts), Err(Error::BufferSize(0))));

    let dev = FakeDevice::new(0x9999, 0b1, 1);
    assert!(matches!(
        Engine::new(dev, &opts),
        Err(Error::UnknownProduct(0x9999))
    ));
}

#[test]
fn test_hardware_counters() {
    let counters = HardwareCounters::<FakeDevice>::new();
    let opts = opts(&[
        GpuCounter::GpuCycles,
        GpuCounter::ShaderCycles,
        GpuCounter::ExternalMemoryReadBytes,
    ]);
    assert_eq!(counters.state(), State::Uninitialized);
    assert_eq!(counters.value(GpuCounter::GpuCycles), 0);
    counters.sample().unwrap();

    let missing = counters.init(
        || {
            Err(Error::Open {
                path: PathBuf::from("/dev/mali0"),
                source: io::Error::from(io::ErrorKind::NotFound),
            })
        },
        &opts,
    );
    assert!(missing.is_err());
    assert!(!counters.is_ready());
    assert_eq!(counters.state(), State::Uninitialized);

    let dev = thex();
    let live = Arc::clone(&dev.live_readers);
    counters.init(|| Ok(dev), &opts).unwrap();
    assert!(counters.is_ready());
    // Primed on the first buffer.
    assert_eq!(counters.with_engine(Engine::timestamp), Some(1000));

    // A snapshot samples first, so it sees the second buffer right away.
    let mut snapshot = CounterSnapshot::default();
    counters.snapshot(&mut snapshot);
    assert_eq!(counters.with_engine(Engine::timestamp), Some(2000));
    assert_eq!(snapshot.gpu_cycles, 1000.0);
    assert_eq!(snapshot.get(GpuCounter::ExternalMemoryReadBytes), 128.0);
    assert_eq!(snapshot.fragment_cycles, 0.0);

    assert_eq!(counters.value(GpuCounter::GpuCycles), 1000);
    assert_eq!(counters.value(GpuCounter::ExternalMemoryReadBytes), 128);
    // Cores 0, 1 and 3 of the mask, the absent core 2 is skipped.
    assert_eq!(counters.value(GpuCounter::ShaderCycles), 60);

    counters.stop();
    assert!(!counters.is_ready());
    assert_eq!(counters.state(), State::Stopped);
    assert_eq!(counters.value(GpuCounter::GpuCycles), 0);
    assert_eq!(live.load(Ordering::SeqCst), 0);
    counters.sample().unwrap();
    assert_eq!(counters.value(GpuCounter::GpuCycles), 0);

    counters.init(|| Ok(thex()), &opts).unwrap();
    assert_eq!(counters.state(), State::Ready);
    counters.sample().unwrap();
    assert_eq!(counters.value(GpuCounter::GpuCycles), 1000);
}

#[test]
fn test_fill_columns() {
    let counters = HardwareCounters::<FakeDevice>::new();
    counters
        .init(|| Ok(thex()), &opts(&[GpuCounter::GpuCycles]))
        .unwrap();

    let mut gpu = [0.0; 4];
    let mut short = [-1.0; 2];
    let mut columns = CounterColumns::new()
        .with(GpuCounter::GpuCycles, &mut gpu)
        .with(GpuCounter::FragmentCycles, &mut short);
    counters.fill(&mut columns, 2);
    drop(columns);

    assert_eq!(gpu, [0.0, 0.0, 1000.0, 0.0]);
    assert_eq!(short, [-1.0, -1.0]);
}

#[test]
fn test_global_uninitialized() {
    assert!(!is_ready());
    assert_eq!(get_counter_value(GpuCounter::GpuCycles), 0);
    sample();

    let mut snapshot = CounterSnapshot::default();
    snapshot.set(GpuCounter::Tiles, 3.0);
    capture_counters_into(&mut snapshot);
    assert_eq!(snapshot, CounterSnapshot::default());
}
