use std::fs::File;
use std::io::{Error, Result};
use std::os::fd::AsRawFd;

pub fn ioctl_arg(file: &File, op: u64, arg: u64) -> Result<i32> {
    let fd = file.as_raw_fd();
    let result = unsafe { libc::ioctl(fd, op as _, arg) };
    if result != -1 {
        Ok(result)
    } else {
        Err(Error::last_os_error())
    }
}

pub fn ioctl_argp<T>(file: &File, op: u64, argp: &mut T) -> Result<i32> {
    let fd = file.as_raw_fd();
    let result = unsafe { libc::ioctl(fd, op as _, argp as *mut T) };
    if result != -1 {
        Ok(result)
    } else {
        Err(Error::last_os_error())
    }
}

pub unsafe fn mmap<T>(len: usize, prot: i32, flags: i32, file: &File, offset: i64) -> Result<*mut T> {
    let ptr = libc::mmap(std::ptr::null_mut(), len, prot, flags, file.as_raw_fd(), offset);
    if ptr != libc::MAP_FAILED {
        Ok(ptr as _)
    } else {
        Err(Error::last_os_error())
    }
}

pub unsafe fn munmap<T>(ptr: *mut T, len: usize) -> Result<()> {
    let result = libc::munmap(ptr as _, len);
    if result != -1 {
        Ok(())
    } else {
        Err(Error::last_os_error())
    }
}

/// Waits on a single fd, returns the `revents` bits (0 on timeout).
pub fn poll(file: &File, events: i16, timeout: i32) -> Result<i16> {
    let mut pfd = libc::pollfd {
        fd: file.as_raw_fd(),
        events,
        revents: 0,
    };
    let result = unsafe { libc::poll(&mut pfd, 1, timeout) };
    if result != -1 {
        Ok(pfd.revents)
    } else {
        Err(Error::last_os_error())
    }
}

pub fn clock_monotonic_ns() -> Result<u64> {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    let result = unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts) };
    if result != -1 {
        Ok(ts.tv_sec as u64 * 1_000_000_000 + ts.tv_nsec as u64)
    } else {
        Err(Error::last_os_error())
    }
}
