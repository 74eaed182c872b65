use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{Device, Engine, GpuCounter, KbaseDevice, Result, State};
use crate::config::Opts;

/// A shared [`Engine`] whose latest values can be read from any thread.
///
/// Sampling and lifecycle changes are serialized by a lock, reads only touch
/// atomics and never block.
pub struct HardwareCounters<D: Device> {
    engine: Mutex<Option<Engine<D>>>,
    state: AtomicU8,
    values: [AtomicU64; GpuCounter::COUNT],
}

impl<D: Device> Default for HardwareCounters<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Device> HardwareCounters<D> {
    pub const fn new() -> Self {
        Self {
            engine: Mutex::new(None),
            state: AtomicU8::new(State::Uninitialized as u8),
            values: [const { AtomicU64::new(0) }; GpuCounter::COUNT],
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Engine<D>>> {
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: State) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Builds the engine on the device returned by `open` and primes it.
    ///
    /// No-op if already ready. On failure nothing is kept and every counter
    /// keeps reading 0.
    pub fn init<F>(&self, open: F, opts: &Opts) -> Result<()>
    where
        F: FnOnce() -> Result<D>,
    {
        let mut engine = self.lock();
        if engine.is_some() {
            return Ok(());
        }

        let previous = self.state();
        self.set_state(State::Initializing);
        let mut new = match open().and_then(|device| Engine::new(device, opts)) {
            Ok(new) => new,
            Err(e) => {
                self.set_state(previous);
                return Err(e);
            }
        };

        if let Err(e) = new.start() {
            log::warn!("failed to prime hardware counters: {}", e);
        }
        *engine = Some(new);
        self.set_state(State::Ready);
        Ok(())
    }

    /// Releases the engine, every counter reads 0 until the next [`init`][Self::init].
    pub fn stop(&self) {
        let mut engine = self.lock();
        if let Some(mut engine) = engine.take() {
            self.set_state(State::Stopped);
            engine.stop();
        }
        for v in &self.values {
            v.store(0, Ordering::Relaxed);
        }
    }

    /// Samples once and publishes the new values, no-op if not ready.
    pub fn sample(&self) -> Result<()> {
        let mut engine = self.lock();
        let Some(engine) = engine.as_mut() else {
            return Ok(());
        };

        self.set_state(State::Sampling);
        let sampled = engine.sample();
        self.set_state(State::Ready);
        sampled?;

        for (v, c) in self.values.iter().zip(GpuCounter::ALL) {
            v.store(engine.value(c), Ordering::Relaxed);
        }
        Ok(())
    }

    pub fn state(&self) -> State {
        match self.state.load(Ordering::Acquire) {
            s if s == State::Initializing as u8 => State::Initializing,
            s if s == State::Ready as u8 => State::Ready,
            s if s == State::Sampling as u8 => State::Sampling,
            s if s == State::Stopped as u8 => State::Stopped,
            _ => State::Uninitialized,
        }
    }

    /// Whether values are being published, including during a sample.
    pub fn is_ready(&self) -> bool {
        matches!(self.state(), State::Ready | State::Sampling)
    }

    /// Last published value of `counter`, 0 when not ready.
    pub fn value(&self, counter: GpuCounter) -> u64 {
        if !self.is_ready() {
            return 0;
        }
        self.values[counter.index()].load(Ordering::Relaxed)
    }

    /// Runs `f` on the engine, `None` if there is none.
    pub fn with_engine<F, R>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&Engine<D>) -> R,
    {
        self.lock().as_ref().map(f)
    }

    /// Samples, then copies the published values into `snapshot`.
    ///
    /// A failed sample copies the previous values.
    pub fn snapshot(&self, snapshot: &mut CounterSnapshot) {
        if let Err(e) = self.sample() {
            log::warn!("hardware counter sample failed: {}", e);
        }
        for c in GpuCounter::ALL {
            snapshot.set(c, self.value(c) as f32);
        }
    }

    /// Samples, then writes each published value at `offset` of its column.
    ///
    /// Columns shorter than `offset + 1` are left untouched. A failed sample
    /// writes the previous values.
    pub fn fill(&self, columns: &mut CounterColumns<'_>, offset: usize) {
        if let Err(e) = self.sample() {
            log::warn!("hardware counter sample failed: {}", e);
        }
        for c in GpuCounter::ALL {
            let value = self.value(c) as f32;
            if let Some(slot) = columns.get_mut(c).and_then(|col| col.get_mut(offset)) {
                *slot = value;
            }
        }
    }
}

macro_rules! snapshot {
    ($($counter:ident => $field:ident),+ $(,)?) => {
        /// Published counter values, as floats for plotting.
        #[derive(Clone, Copy, Debug, Default, PartialEq)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct CounterSnapshot {
            $(pub $field: f32,)+
        }

        impl CounterSnapshot {
            pub fn get(&self, counter: GpuCounter) -> f32 {
                match counter {
                    $(GpuCounter::$counter => self.$field,)+
                }
            }

            pub fn set(&mut self, counter: GpuCounter, value: f32) {
                match counter {
                    $(GpuCounter::$counter => self.$field = value,)+
                }
            }
        }
    };
}

snapshot! {
    GpuCycles => gpu_cycles,
    FragmentCycles => fragment_cycles,
    TilerCycles => tiler_cycles,
    FragElim => frag_elim,
    Tiles => tiles,
    ShaderCycles => shader_cycles,
    ShaderArithmeticCycles => shader_arithmetic_cycles,
    ShaderTextureCycles => shader_texture_cycles,
    Varying16Bits => varying_16_bits,
    Varying32Bits => varying_32_bits,
    ExternalMemoryReadBytes => external_memory_read_bytes,
    ExternalMemoryWriteBytes => external_memory_write_bytes,
}

/// Per-counter output columns for [`capture_and_fill_counters_into`].
#[derive(Default)]
pub struct CounterColumns<'a> {
    columns: [Option<&'a mut [f32]>; GpuCounter::COUNT],
}

impl<'a> CounterColumns<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes `counter` into `column`.
    pub fn with(mut self, counter: GpuCounter, column: &'a mut [f32]) -> Self {
        self.columns[counter.index()] = Some(column);
        self
    }

    pub fn get_mut(&mut self, counter: GpuCounter) -> Option<&mut [f32]> {
        self.columns[counter.index()].as_deref_mut()
    }
}

static GLOBAL: HardwareCounters<KbaseDevice> = HardwareCounters::new();

/// The process-wide counters behind the free functions of this module.
pub fn global() -> &'static HardwareCounters<KbaseDevice> {
    &GLOBAL
}

/// Initializes the process-wide counters on the default device, enabling `counters`.
///
/// Returns whether they are ready. Failures are logged, never propagated.
pub fn init_hardware_counters(counters: &[GpuCounter]) -> bool {
    init_hardware_counters_with(&Opts {
        counters: counters.to_vec(),
        ..Default::default()
    })
}

/// Same as [`init_hardware_counters`] with explicit options.
pub fn init_hardware_counters_with(opts: &Opts) -> bool {
    match GLOBAL.init(|| KbaseDevice::open(&opts.device), opts) {
        Ok(()) => true,
        Err(e) => {
            log::error!("hardware counters unavailable: {}", e);
            false
        }
    }
}

pub fn stop_hardware_counters() {
    GLOBAL.stop();
}

/// Samples the process-wide counters, no-op when not initialized.
pub fn sample() {
    if let Err(e) = GLOBAL.sample() {
        log::warn!("hardware counter sample failed: {}", e);
    }
}

/// Last sampled value of `counter`, 0 before init, after stop, or if disabled.
pub fn get_counter_value(counter: GpuCounter) -> u64 {
    GLOBAL.value(counter)
}

pub fn is_ready() -> bool {
    GLOBAL.is_ready()
}

/// Samples, then copies every value into `snapshot`.
pub fn capture_counters_into(snapshot: &mut CounterSnapshot) {
    GLOBAL.snapshot(snapshot);
}

/// Samples, then stores each value at `offset` of its column in `columns`.
pub fn capture_and_fill_counters_into(columns: &mut CounterColumns<'_>, offset: usize) {
    GLOBAL.fill(columns, offset);
}
