//! Userspace ABI of the Arm Mali kbase driver.
//!
//! The kbase headers are not part of the kernel uapi tree, so the structs and
//! ioctl numbers below are written out by hand. Two generations are covered:
//! the legacy "UK" interface, where every call goes through one ioctl whose
//! number embeds a function id, and the newer per-call ioctls.

use std::mem::size_of;

// https://github.com/torvalds/linux/blob/v6.13/include/uapi/asm-generic/ioctl.h
const IOC_WRITE: u64 = 1;
const IOC_READ: u64 = 2;

// No masking on `nr`, the legacy UK function ids do not fit in 8 bits
// and the driver expects them to bleed into the type field.
const fn ioc(dir: u64, ty: u64, nr: u64, size: usize) -> u64 {
    (dir << 30) | ((size as u64) << 16) | (ty << 8) | nr
}

const fn ior<T>(ty: u64, nr: u64) -> u64 {
    ioc(IOC_READ, ty, nr, size_of::<T>())
}

const fn iow<T>(ty: u64, nr: u64) -> u64 {
    ioc(IOC_WRITE, ty, nr, size_of::<T>())
}

const fn iowr<T>(ty: u64, nr: u64) -> u64 {
    ioc(IOC_READ | IOC_WRITE, ty, nr, size_of::<T>())
}

// Legacy UK interface.

pub const LINUX_UK_BASE_MAGIC: u64 = 0x80;

pub const UKP_FUNC_ID_CHECK_VERSION: u32 = 0;
pub const UK_FUNC_ID: u32 = 512;
pub const KBASE_FUNC_GPU_PROPS_REG_DUMP: u32 = UK_FUNC_ID + 14;
pub const KBASE_FUNC_SET_FLAGS: u32 = UK_FUNC_ID + 18;
pub const KBASE_FUNC_HWCNT_READER_SETUP: u32 = UK_FUNC_ID + 36;

pub const BASE_CONTEXT_CREATE_KERNEL_FLAGS: u32 = 1 << 1;

/// `union uk_header { u32 id; u32 ret; u64 sizer; }`
#[repr(C, align(8))]
#[derive(Clone, Copy, Debug, Default)]
pub struct UkHeader {
    /// Function id on the way in, return code on the way out.
    pub id: u32,
    pub _pad: u32,
}

/// Implemented by every legacy call argument, all of which start with a [`UkHeader`].
pub trait UkCall: Sized {
    fn header(&self) -> &UkHeader;

    fn request(&self) -> u64 {
        ioc(
            IOC_READ | IOC_WRITE,
            LINUX_UK_BASE_MAGIC,
            self.header().id as u64,
            size_of::<Self>(),
        )
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct UkVersionCheck {
    pub header: UkHeader,
    pub major: u16,
    pub minor: u16,
    pub _pad: [u8; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct UkSetFlags {
    pub header: UkHeader,
    pub create_flags: u32,
    pub _pad: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct UkReaderSetup {
    pub header: UkHeader,
    pub buffer_count: u32,
    pub jm_bm: u32,
    pub shader_bm: u32,
    pub tiler_bm: u32,
    pub mmu_l2_bm: u32,
    pub fd: i32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct CoreProps {
    pub product_id: u32,
    pub version_status: u16,
    pub minor_revision: u16,
    pub major_revision: u16,
    pub _pad: u16,
    pub gpu_speed_mhz: u32,
    pub gpu_freq_khz_max: u32,
    pub gpu_freq_khz_min: u32,
    pub log2_program_counter_size: u32,
    pub texture_features: [u32; 3],
    pub gpu_available_memory_size: u64,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct L2Props {
    pub log2_line_size: u8,
    pub log2_cache_size: u8,
    pub num_l2_slices: u8,
    pub _pad: [u8; 5],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct TilerProps {
    pub bin_size_bytes: u32,
    pub max_active_levels: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadProps {
    pub max_threads: u32,
    pub max_workgroup_size: u32,
    pub max_barrier_size: u32,
    pub max_registers: u16,
    pub max_task_queue: u8,
    pub max_thread_group_split: u8,
    pub impl_tech: u8,
    pub _pad: [u8; 7],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct RawProps {
    pub shader_present: u64,
    pub tiler_present: u64,
    pub l2_present: u64,
    pub _unused: u64,
    pub l2_features: u32,
    pub suspend_size: u32,
    pub mem_features: u32,
    pub mmu_features: u32,
    pub as_present: u32,
    pub js_present: u32,
    pub js_features: [u32; 16],
    pub tiler_features: u32,
    pub texture_features: [u32; 3],
    pub gpu_id: u32,
    pub thread_max_threads: u32,
    pub thread_max_workgroup_size: u32,
    pub thread_max_barrier_size: u32,
    pub thread_features: u32,
    pub coherency_mode: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct CoherentGroup {
    pub core_mask: u64,
    pub num_cores: u16,
    pub _pad: [u16; 3],
}

pub const MAX_COHERENT_GROUPS: usize = 16;

#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct CoherentGroupInfo {
    pub num_groups: u32,
    pub num_core_groups: u32,
    pub coherency: u32,
    pub _pad: u32,
    pub group: [CoherentGroup; MAX_COHERENT_GROUPS],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct BaseGpuProps {
    pub core_props: CoreProps,
    pub l2_props: L2Props,
    pub _unused: u64,
    pub tiler_props: TilerProps,
    pub thread_props: ThreadProps,
    pub raw_props: RawProps,
    pub coherency_info: CoherentGroupInfo,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct UkGpuProps {
    pub header: UkHeader,
    pub props: BaseGpuProps,
}

macro_rules! uk_call {
    ($($ty:ty),+ $(,)?) => {
        $(impl UkCall for $ty {
            fn header(&self) -> &UkHeader {
                &self.header
            }
        })+
    };
}

uk_call!(UkVersionCheck, UkSetFlags, UkReaderSetup, UkGpuProps);

// Per-call ioctl interface.

pub const KBASE_IOCTL_TYPE: u64 = 0x80;

#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct VersionCheck {
    pub major: u16,
    pub minor: u16,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct SetFlags {
    pub create_flags: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct GetGpuProps {
    /// User pointer to the destination buffer, null to query the size.
    pub buffer: u64,
    pub size: u32,
    pub flags: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct ReaderSetup {
    pub buffer_count: u32,
    pub jm_bm: u32,
    pub shader_bm: u32,
    pub tiler_bm: u32,
    pub mmu_l2_bm: u32,
}

pub const KBASE_IOCTL_VERSION_CHECK: u64 = iowr::<VersionCheck>(KBASE_IOCTL_TYPE, 0);
pub const KBASE_IOCTL_SET_FLAGS: u64 = iow::<SetFlags>(KBASE_IOCTL_TYPE, 1);
pub const KBASE_IOCTL_GET_GPUPROPS: u64 = iow::<GetGpuProps>(KBASE_IOCTL_TYPE, 3);
pub const KBASE_IOCTL_HWCNT_READER_SETUP: u64 = iow::<ReaderSetup>(KBASE_IOCTL_TYPE, 8);

// Property ids of the `KBASE_IOCTL_GET_GPUPROPS` blob.
pub const KBASE_GPUPROP_PRODUCT_ID: u32 = 1;
pub const KBASE_GPUPROP_MINOR_REVISION: u32 = 3;
pub const KBASE_GPUPROP_MAJOR_REVISION: u32 = 4;
pub const KBASE_GPUPROP_L2_NUM_L2_SLICES: u32 = 15;
pub const KBASE_GPUPROP_COHERENCY_NUM_GROUPS: u32 = 61;
pub const KBASE_GPUPROP_COHERENCY_NUM_CORE_GROUPS: u32 = 62;
pub const KBASE_GPUPROP_COHERENCY_GROUP_0: u32 = 64;
pub const KBASE_GPUPROP_COHERENCY_GROUP_15: u32 = 79;

pub const KBASE_GPUPROP_VALUE_SIZE_U8: u32 = 0;
pub const KBASE_GPUPROP_VALUE_SIZE_U16: u32 = 1;
pub const KBASE_GPUPROP_VALUE_SIZE_U32: u32 = 2;
pub const KBASE_GPUPROP_VALUE_SIZE_U64: u32 = 3;

// Hardware counter reader, issued on the fd returned by reader setup.

pub const KBASE_HWCNT_READER: u64 = 0xBE;
pub const HWCNT_READER_API: u32 = 1;

/// `struct kbase_hwcnt_reader_metadata`
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReaderMetadata {
    pub timestamp: u64,
    pub event_id: u32,
    pub buffer_idx: u32,
}

pub const KBASE_HWCNT_READER_GET_HWVER: u64 = ior::<u32>(KBASE_HWCNT_READER, 0x00);
pub const KBASE_HWCNT_READER_GET_BUFFER_SIZE: u64 = ior::<u32>(KBASE_HWCNT_READER, 0x01);
pub const KBASE_HWCNT_READER_DUMP: u64 = iow::<u32>(KBASE_HWCNT_READER, 0x10);
pub const KBASE_HWCNT_READER_GET_BUFFER: u64 = ior::<ReaderMetadata>(KBASE_HWCNT_READER, 0x20);
pub const KBASE_HWCNT_READER_PUT_BUFFER: u64 = iow::<ReaderMetadata>(KBASE_HWCNT_READER, 0x21);
pub const KBASE_HWCNT_READER_GET_API_VERSION: u64 = iow::<u32>(KBASE_HWCNT_READER, 0xFF);
