use super::{Error, Result};
use crate::ffi::kbase as k;
use crate::ffi::read_le;

/// The subset of GPU properties needed to address counter blocks.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GpuProps {
    pub product_id: u32,
    pub major_revision: u16,
    pub minor_revision: u16,
    pub num_l2_slices: u32,
    pub num_groups: u32,
    pub num_core_groups: u32,
    /// Shader core mask of each coherent group.
    pub core_masks: [u64; k::MAX_COHERENT_GROUPS],
}

impl GpuProps {
    /// Union of the core masks of every coherent group.
    pub fn core_mask(&self) -> u64 {
        let groups = (self.num_core_groups as usize).min(k::MAX_COHERENT_GROUPS);
        self.core_masks[..groups].iter().fold(0, |acc, m| acc | m)
    }
}

/// Parses the key/value blob returned by `KBASE_IOCTL_GET_GPUPROPS`.
///
/// Each entry is a little-endian `u32` key, whose upper bits are the
/// property id and lower 2 bits the size of the value that follows (1, 2, 4
/// or 8 bytes). Unknown properties are skipped.
pub fn parse_blob(blob: &[u8]) -> Result<GpuProps> {
    let mut props = GpuProps::default();
    let mut buf = blob;

    while !buf.is_empty() {
        let offset = blob.len() - buf.len();
        let truncated = || Error::TruncatedProps(offset);

        let key = read_le::<4>(&mut buf).map(u32::from_le_bytes).ok_or_else(truncated)?;
        let value = match key & 3 {
            k::KBASE_GPUPROP_VALUE_SIZE_U8 => read_le::<1>(&mut buf).map(|b| b[0] as u64),
            k::KBASE_GPUPROP_VALUE_SIZE_U16 => {
                read_le::<2>(&mut buf).map(|b| u16::from_le_bytes(b) as u64)
            }
            k::KBASE_GPUPROP_VALUE_SIZE_U32 => {
                read_le::<4>(&mut buf).map(|b| u32::from_le_bytes(b) as u64)
            }
            k::KBASE_GPUPROP_VALUE_SIZE_U64 => read_le::<8>(&mut buf).map(u64::from_le_bytes),
            _ => unreachable!(),
        }
        .ok_or_else(truncated)?;

        match key >> 2 {
            k::KBASE_GPUPROP_PRODUCT_ID => props.product_id = value as u32,
            k::KBASE_GPUPROP_MINOR_REVISION => props.minor_revision = value as u16,
            k::KBASE_GPUPROP_MAJOR_REVISION => props.major_revision = value as u16,
            k::KBASE_GPUPROP_L2_NUM_L2_SLICES => props.num_l2_slices = value as u32,
            k::KBASE_GPUPROP_COHERENCY_NUM_GROUPS => props.num_groups = value as u32,
            k::KBASE_GPUPROP_COHERENCY_NUM_CORE_GROUPS => props.num_core_groups = value as u32,
            id @ k::KBASE_GPUPROP_COHERENCY_GROUP_0..=k::KBASE_GPUPROP_COHERENCY_GROUP_15 => {
                props.core_masks[(id - k::KBASE_GPUPROP_COHERENCY_GROUP_0) as usize] = value;
            }
            _ => {}
        }
    }

    Ok(props)
}

/// Shader core positions in mask order.
///
/// Entry `i` is the bit index of the `i`-th set bit of `mask`, which is where
/// the `i`-th present core sits among the shader blocks of a sample.
pub fn core_remap(mask: u64) -> Vec<u32> {
    let mut remap = Vec::with_capacity(mask.count_ones() as usize);
    let mut mask = mask;
    while mask != 0 {
        remap.push(mask.trailing_zeros());
        mask &= mask - 1;
    }
    remap
}

/// Hardware description derived from [`GpuProps`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HardwareInfo {
    pub product_id: u32,
    pub major_revision: u16,
    pub minor_revision: u16,
    pub core_mask: u64,
    pub num_cores: usize,
    pub num_l2_slices: usize,
    pub core_remap: Vec<u32>,
}

impl HardwareInfo {
    pub fn new(props: &GpuProps) -> Self {
        let core_mask = props.core_mask();
        Self {
            product_id: props.product_id,
            major_revision: props.major_revision,
            minor_revision: props.minor_revision,
            core_mask,
            num_cores: core_mask.count_ones() as usize,
            num_l2_slices: props.num_l2_slices as usize,
            core_remap: core_remap(core_mask),
        }
    }
}
