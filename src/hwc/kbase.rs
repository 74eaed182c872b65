use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::FromRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::ptr::NonNull;
use std::slice;

use super::{
    parse_blob, AbiVersion, BufferMeta, Device, Error, GpuProps, Readiness, Reader, ReaderConfig,
    Result,
};
use crate::ffi::kbase::{self as k, UkCall};
use crate::ffi::syscall;

/// A kbase device context, e.g. `/dev/mali0`.
///
/// Every call is first tried on the legacy interface, then on the per-call
/// ioctls when the driver rejects it.
pub struct KbaseDevice {
    file: File,
}

impl KbaseDevice {
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)
            .map_err(|source| Error::Open {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self { file })
    }

    fn uk_call<T: UkCall>(&self, arg: &mut T) -> io::Result<()> {
        let op = arg.request();
        syscall!(ioctl_argp, &self.file, op, arg)?;
        match arg.header().id {
            0 => Ok(()),
            ret => Err(io::Error::other(format!("legacy call returned {}", ret))),
        }
    }
}

impl Device for KbaseDevice {
    type Reader = KbaseReader;

    fn check_version(&mut self) -> Result<AbiVersion> {
        let mut uk = k::UkVersionCheck {
            header: k::UkHeader {
                id: k::UKP_FUNC_ID_CHECK_VERSION,
                ..Default::default()
            },
            major: 10,
            minor: 2,
            ..Default::default()
        };
        if self.uk_call(&mut uk).is_ok() {
            return Ok(AbiVersion {
                major: uk.major,
                minor: uk.minor,
                legacy: true,
            });
        }

        let mut args = k::VersionCheck::default();
        syscall!(ioctl_argp, &self.file, k::KBASE_IOCTL_VERSION_CHECK, &mut args)
            .map_err(Error::ioctl("KBASE_IOCTL_VERSION_CHECK"))?;
        Ok(AbiVersion {
            major: args.major,
            minor: args.minor,
            legacy: false,
        })
    }

    fn set_flags(&mut self) -> Result<()> {
        let mut uk = k::UkSetFlags {
            header: k::UkHeader {
                id: k::KBASE_FUNC_SET_FLAGS,
                ..Default::default()
            },
            create_flags: k::BASE_CONTEXT_CREATE_KERNEL_FLAGS,
            ..Default::default()
        };
        if self.uk_call(&mut uk).is_ok() {
            return Ok(());
        }

        let mut args = k::SetFlags {
            create_flags: k::BASE_CONTEXT_CREATE_KERNEL_FLAGS,
        };
        syscall!(ioctl_argp, &self.file, k::KBASE_IOCTL_SET_FLAGS, &mut args)
            .map_err(Error::ioctl("KBASE_IOCTL_SET_FLAGS"))?;
        Ok(())
    }

    fn gpu_props(&mut self) -> Result<GpuProps> {
        let mut uk = Box::new(k::UkGpuProps {
            header: k::UkHeader {
                id: k::KBASE_FUNC_GPU_PROPS_REG_DUMP,
                ..Default::default()
            },
            ..Default::default()
        });
        if self.uk_call(uk.as_mut()).is_ok() {
            return Ok(from_legacy(&uk.props));
        }

        // A null buffer only queries the blob size.
        let mut args = k::GetGpuProps::default();
        let size = syscall!(ioctl_argp, &self.file, k::KBASE_IOCTL_GET_GPUPROPS, &mut args)
            .map_err(Error::ioctl("KBASE_IOCTL_GET_GPUPROPS"))?;

        let mut blob = vec![0u8; size.max(0) as usize];
        let mut args = k::GetGpuProps {
            buffer: blob.as_mut_ptr() as u64,
            size: blob.len() as u32,
            flags: 0,
        };
        let written = syscall!(ioctl_argp, &self.file, k::KBASE_IOCTL_GET_GPUPROPS, &mut args)
            .map_err(Error::ioctl("KBASE_IOCTL_GET_GPUPROPS"))?;
        blob.truncate(written.max(0) as usize);

        parse_blob(&blob)
    }

    fn setup_reader(&mut self, config: &ReaderConfig) -> Result<KbaseReader> {
        let mut uk = k::UkReaderSetup {
            header: k::UkHeader {
                id: k::KBASE_FUNC_HWCNT_READER_SETUP,
                ..Default::default()
            },
            buffer_count: config.buffer_count,
            jm_bm: config.jm_bm,
            shader_bm: config.shader_bm,
            tiler_bm: config.tiler_bm,
            mmu_l2_bm: config.mmu_l2_bm,
            fd: -1,
        };
        let fd = match self.uk_call(&mut uk) {
            Ok(()) => uk.fd,
            Err(_) => {
                let mut args = k::ReaderSetup {
                    buffer_count: config.buffer_count,
                    jm_bm: config.jm_bm,
                    shader_bm: config.shader_bm,
                    tiler_bm: config.tiler_bm,
                    mmu_l2_bm: config.mmu_l2_bm,
                };
                syscall!(ioctl_argp, &self.file, k::KBASE_IOCTL_HWCNT_READER_SETUP, &mut args)
                    .map_err(Error::ioctl("KBASE_IOCTL_HWCNT_READER_SETUP"))?
            }
        };
        if fd < 0 {
            return Err(Error::Ioctl {
                op: "KBASE_IOCTL_HWCNT_READER_SETUP",
                source: io::Error::other(format!("invalid reader fd {}", fd)),
            });
        }

        // The kernel hands us a fresh fd we now own.
        let file = unsafe { File::from_raw_fd(fd) };
        Ok(KbaseReader { file })
    }
}

fn from_legacy(props: &k::BaseGpuProps) -> GpuProps {
    let info = &props.coherency_info;
    GpuProps {
        product_id: props.core_props.product_id,
        major_revision: props.core_props.major_revision,
        minor_revision: props.core_props.minor_revision,
        num_l2_slices: props.l2_props.num_l2_slices as u32,
        num_groups: info.num_groups,
        num_core_groups: info.num_core_groups,
        core_masks: info.group.map(|g| g.core_mask),
    }
}

/// The hardware counter reader fd returned by reader setup.
pub struct KbaseReader {
    file: File,
}

impl KbaseReader {
    fn read_u32(&self, op: u64, name: &'static str) -> Result<u32> {
        let mut value = 0u32;
        syscall!(ioctl_argp, &self.file, op, &mut value).map_err(Error::ioctl(name))?;
        Ok(value)
    }
}

impl Reader for KbaseReader {
    type Mapping = Mapping;

    fn api_version(&self) -> Result<u32> {
        self.read_u32(
            k::KBASE_HWCNT_READER_GET_API_VERSION,
            "KBASE_HWCNT_READER_GET_API_VERSION",
        )
    }

    fn buffer_size(&self) -> Result<usize> {
        self.read_u32(
            k::KBASE_HWCNT_READER_GET_BUFFER_SIZE,
            "KBASE_HWCNT_READER_GET_BUFFER_SIZE",
        )
        .map(|size| size as usize)
    }

    fn hw_version(&self) -> Result<u32> {
        self.read_u32(k::KBASE_HWCNT_READER_GET_HWVER, "KBASE_HWCNT_READER_GET_HWVER")
    }

    fn map(&self, len: usize) -> Result<Mapping> {
        Mapping::new(&self.file, len).map_err(Error::Map)
    }

    fn dump(&self) -> Result<()> {
        syscall!(ioctl_arg, &self.file, k::KBASE_HWCNT_READER_DUMP, 0)
            .map_err(Error::ioctl("KBASE_HWCNT_READER_DUMP"))?;
        Ok(())
    }

    fn wait(&self, timeout_ms: i32) -> Result<Readiness> {
        loop {
            let revents = match syscall!(poll, &self.file, libc::POLLIN, timeout_ms) {
                Ok(revents) => revents,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::ioctl("poll")(e)),
            };
            return Ok(if revents & libc::POLLIN != 0 {
                Readiness::Ready
            } else if revents & (libc::POLLHUP | libc::POLLERR) != 0 {
                Readiness::HungUp
            } else {
                Readiness::TimedOut
            });
        }
    }

    fn get_buffer(&self) -> Result<BufferMeta> {
        let mut meta = k::ReaderMetadata::default();
        syscall!(ioctl_argp, &self.file, k::KBASE_HWCNT_READER_GET_BUFFER, &mut meta)
            .map_err(Error::ioctl("KBASE_HWCNT_READER_GET_BUFFER"))?;
        Ok(BufferMeta {
            timestamp: meta.timestamp,
            event_id: meta.event_id,
            buffer_idx: meta.buffer_idx,
        })
    }

    fn put_buffer(&self, meta: &BufferMeta) -> Result<()> {
        let mut meta = k::ReaderMetadata {
            timestamp: meta.timestamp,
            event_id: meta.event_id,
            buffer_idx: meta.buffer_idx,
        };
        syscall!(ioctl_argp, &self.file, k::KBASE_HWCNT_READER_PUT_BUFFER, &mut meta)
            .map_err(Error::ioctl("KBASE_HWCNT_READER_PUT_BUFFER"))?;
        Ok(())
    }
}

/// Read-only private mapping of the reader's sample buffers.
pub struct Mapping {
    ptr: NonNull<u8>,
    len: usize,
}

// The mapping is never written through and lives until dropped.
unsafe impl Send for Mapping {}

impl Mapping {
    fn new(file: &File, len: usize) -> io::Result<Self> {
        let ptr = unsafe { syscall!(mmap, len, libc::PROT_READ, libc::MAP_PRIVATE, file, 0) }?;
        let ptr = NonNull::new(ptr).ok_or_else(|| io::Error::other("mmap returned null"))?;
        Ok(Self { ptr, len })
    }
}

impl AsRef<[u8]> for Mapping {
    fn as_ref(&self) -> &[u8] {
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for Mapping {
    fn drop(&mut self) {
        if let Err(e) = unsafe { syscall!(munmap, self.ptr.as_ptr(), self.len) } {
            log::error!("failed to unmap sample buffers: {}", e);
        }
    }
}
