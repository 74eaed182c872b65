use super::names::BLOCK_COUNTERS;
use super::{Block, HardwareInfo};

/// Where each block lives in a raw sample.
///
/// A sample is a run of 64-counter blocks: the job manager, the tiler, one
/// MMU/L2 block per L2 slice, then one block per shader core position.
#[derive(Clone, Copy, Debug)]
pub struct SampleLayout<'a> {
    pub num_l2_slices: usize,
    /// Block position of each present shader core, see [`core_remap`][super::core_remap].
    pub core_remap: &'a [u32],
}

impl<'a> SampleLayout<'a> {
    pub fn new(info: &'a HardwareInfo) -> Self {
        Self {
            num_l2_slices: info.num_l2_slices,
            core_remap: &info.core_remap,
        }
    }

    /// Number of instances of `block` in a sample.
    pub fn instances(&self, block: Block) -> usize {
        match block {
            Block::Jm | Block::Tiler => 1,
            Block::Mmu => self.num_l2_slices,
            Block::Shader => self.core_remap.len(),
        }
    }

    /// Word offset of instance `instance` of `block`.
    pub fn offset(&self, block: Block, instance: usize) -> Option<usize> {
        let position = match block {
            Block::Jm if instance == 0 => 0,
            Block::Tiler if instance == 0 => 1,
            Block::Mmu if instance < self.num_l2_slices => 2 + instance,
            Block::Shader => 2 + self.num_l2_slices + *self.core_remap.get(instance)? as usize,
            _ => return None,
        };
        Some(position * BLOCK_COUNTERS)
    }

    /// Counter `index` of `block`, summed over every instance of the block.
    ///
    /// Words past the end of `raw` read as 0.
    pub fn read(&self, raw: &[u32], block: Block, index: usize) -> u64 {
        (0..self.instances(block))
            .filter_map(|i| self.offset(block, i))
            .filter_map(|base| raw.get(base + index))
            .map(|&v| v as u64)
            .sum()
    }
}
