use super::{Block, Family, GpuCounter, Product};

/// Conversion from the raw counter sum to the reported value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transform {
    Identity,
    /// Multiply by a constant, e.g. bus beats to bytes.
    Scale(u64),
}

impl Transform {
    pub fn apply(self, raw: u64) -> u64 {
        match self {
            Transform::Identity => raw,
            Transform::Scale(k) => raw.saturating_mul(k),
        }
    }
}

/// Where a [`GpuCounter`] is read from on one GPU family.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CounterMapping {
    pub block: Block,
    /// Matched as a substring of the product's counter names.
    pub name: &'static str,
    pub transform: Transform,
}

// Bytes per external bus beat.
const BEAT_BYTES: u64 = 16;

const fn read(block: Block, name: &'static str) -> Option<CounterMapping> {
    Some(CounterMapping {
        block,
        name,
        transform: Transform::Identity,
    })
}

const fn beats(block: Block, name: &'static str) -> Option<CounterMapping> {
    Some(CounterMapping {
        block,
        name,
        transform: Transform::Scale(BEAT_BYTES),
    })
}

// Both tables are indexed by `GpuCounter::index`.

static MIDGARD: [Option<CounterMapping>; GpuCounter::COUNT] = [
    read(Block::Jm, "GPU_ACTIVE"),
    read(Block::Jm, "JS0_ACTIVE"),
    read(Block::Tiler, "TI_ACTIVE"),
    read(Block::Shader, "FRAG_TRANS_ELIM"),
    read(Block::Shader, "FRAG_NUM_TILES"),
    None,
    None,
    read(Block::Shader, "TEX_ISSUES"),
    read(Block::Shader, "VARY_SLOT_16"),
    read(Block::Shader, "VARY_SLOT_32"),
    beats(Block::Mmu, "L2_EXT_READ_BEATS"),
    beats(Block::Mmu, "L2_EXT_WRITE_BEATS"),
];

static BIFROST: [Option<CounterMapping>; GpuCounter::COUNT] = [
    read(Block::Jm, "GPU_ACTIVE"),
    read(Block::Jm, "JS0_ACTIVE"),
    read(Block::Tiler, "TILER_ACTIVE"),
    read(Block::Shader, "FRAG_TRANS_ELIM"),
    read(Block::Shader, "FRAG_PTILES"),
    read(Block::Shader, "EXEC_CORE_ACTIVE"),
    read(Block::Shader, "EXEC_INSTR_COUNT"),
    read(Block::Shader, "TEX_FILT_NUM_OPERATIONS"),
    read(Block::Shader, "VARY_SLOT_16"),
    read(Block::Shader, "VARY_SLOT_32"),
    beats(Block::Mmu, "L2_EXT_READ_BEATS"),
    beats(Block::Mmu, "L2_EXT_WRITE_BEATS"),
];

/// The mapping of `counter` on `family`, `None` if the family has no equivalent.
pub fn mapping(family: Family, counter: GpuCounter) -> Option<CounterMapping> {
    let table = match family {
        Family::Midgard => &MIDGARD,
        Family::Bifrost => &BIFROST,
    };
    table[counter.index()]
}

/// A counter as resolved against a product's name table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnabledCounter {
    pub counter: GpuCounter,
    pub block: Block,
    /// Position in the block, `None` if the counter is disabled.
    pub index: Option<usize>,
    pub transform: Transform,
}

impl EnabledCounter {
    pub const fn disabled(counter: GpuCounter) -> Self {
        Self {
            counter,
            block: Block::Jm,
            index: None,
            transform: Transform::Identity,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.index.is_some()
    }
}

/// Resolves `requested` on `product`, indexed by [`GpuCounter::index`].
///
/// Counters that were not requested, have no mapping on the product's
/// family, or whose name is absent from its table stay disabled.
pub fn resolve(product: &Product, requested: &[GpuCounter]) -> [EnabledCounter; GpuCounter::COUNT] {
    let mut counters = GpuCounter::ALL.map(EnabledCounter::disabled);

    for &counter in requested {
        let Some(m) = mapping(product.family, counter) else {
            log::warn!("{:?} is not available on {}", counter, product.name);
            continue;
        };
        let index = product.names.find(m.block, m.name);
        match index {
            Some(i) => log::info!(
                "{:?} enabled: {:?} block counter {} ({})",
                counter,
                m.block,
                i,
                m.name
            ),
            None => log::warn!(
                "{:?} disabled: no {:?} block counter named {} on {}",
                counter,
                m.block,
                m.name,
                product.name
            ),
        }
        counters[counter.index()] = EnabledCounter {
            counter,
            block: m.block,
            index,
            transform: m.transform,
        };
    }

    counters
}
