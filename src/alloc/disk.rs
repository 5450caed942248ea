//! Disk-tier backing store: a `MAP_SHARED` mapping of a truncated file,
//! touched through raw `libc` `mmap`/`msync`/`madvise` calls rather than a
//! higher-level mmap wrapper.

use std::fs::OpenOptions;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::Path;

use crate::error::{MapError, Result};

pub(crate) struct DiskRegion {
    ptr: *mut u8,
    len: usize,
    // Kept alive for the lifetime of the mapping; never read/written directly.
    _file: std::fs::File,
}

impl DiskRegion {
    pub fn new(path: &Path, len: usize) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o666)
            .open(path)
            .map_err(|e| MapError::DiskBacking(format!("open {}: {e}", path.display())))?;

        file.set_len(len as u64)
            .map_err(|e| MapError::DiskBacking(format!("truncate {}: {e}", path.display())))?;

        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(MapError::DiskBacking(format!(
                "mmap {}: {}",
                path.display(),
                std::io::Error::last_os_error()
            )));
        }

        Ok(Self { ptr: ptr as *mut u8, len, _file: file })
    }

    pub fn slot_mut(&mut self, idx: usize, chunk_capacity: usize) -> &mut [u8] {
        let offset = idx * chunk_capacity;
        assert!(offset + chunk_capacity <= self.len, "disk slot out of bounds");
        // SAFETY: offset + chunk_capacity <= self.len, the mapping is held
        // for the lifetime of `self`, and the allocator never hands out two
        // overlapping live slices (single acquire/flush protocol per slot).
        unsafe { std::slice::from_raw_parts_mut(self.ptr.add(offset), chunk_capacity) }
    }

    /// Advises the OS the slot's pages may be reclaimed. A no-op for
    /// correctness: the mapping is `MAP_SHARED` so subsequent reads re-fault
    /// from the backing file regardless.
    pub fn advise_dontneed(&self, idx: usize, chunk_capacity: usize) {
        let offset = idx * chunk_capacity;
        unsafe {
            libc::madvise(
                self.ptr.add(offset) as *mut libc::c_void,
                chunk_capacity,
                libc::MADV_DONTNEED,
            );
        }
    }

    pub fn msync(&self, idx: usize, chunk_capacity: usize) {
        let offset = idx * chunk_capacity;
        let rc = unsafe {
            libc::msync(
                self.ptr.add(offset) as *mut libc::c_void,
                chunk_capacity,
                libc::MS_SYNC,
            )
        };
        assert_eq!(rc, 0, "msync failed: {}", std::io::Error::last_os_error());
    }
}

impl Drop for DiskRegion {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.ptr as *mut libc::c_void, self.len);
        }
    }
}
