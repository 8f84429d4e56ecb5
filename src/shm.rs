//! Low-level POSIX shared memory operations

use crate::error::{Result, RingError};
use rustix::fd::OwnedFd;
use rustix::fs::ftruncate;
use rustix::mm::{mmap, munmap, MapFlags, ProtFlags};
use rustix::shm::{shm_open, shm_unlink, Mode, ShmOFlags};
use std::ffi::CString;
use std::ptr::NonNull;

const SHM_PREFIX: &str = "/disruptor_";
const MAX_NAME_LEN: usize = 255 - SHM_PREFIX.len();

/// Handle to a mapped shared memory region.
///
/// Dropping the handle unmaps this process's view only. The underlying shm
/// object persists until [`ShmRegion::unlink`] is called by whichever process
/// is responsible for cleanup.
pub struct ShmRegion {
    #[allow(dead_code)]
    fd: OwnedFd,
    addr: NonNull<u8>,
    size: usize,
    name: String,
}

// SAFETY: ShmRegion can be safely shared between threads
// The shared memory region itself is synchronized via atomic operations
unsafe impl Send for ShmRegion {}
unsafe impl Sync for ShmRegion {}

impl ShmRegion {
    /// Create a shared memory region of `size` bytes, zero-initialized.
    ///
    /// If an object of the same name already exists it is opened and resized
    /// instead; the caller re-initializes the header either way, so arranging
    /// for a single initializing attach per region is an application concern.
    pub fn create(name: &str, size: usize) -> Result<Self> {
        if name.len() > MAX_NAME_LEN {
            return Err(RingError::NameTooLong {
                max: MAX_NAME_LEN,
                got: name.len(),
            });
        }

        let full_name = format!("{}{}", SHM_PREFIX, name);
        let c_name = CString::new(full_name.clone()).unwrap();

        // Try to create exclusively first, fall back to open if exists
        let fd = match shm_open(
            c_name.as_c_str(),
            ShmOFlags::CREATE | ShmOFlags::EXCL | ShmOFlags::RDWR,
            Mode::RUSR | Mode::WUSR | Mode::RGRP | Mode::WGRP | Mode::ROTH,
        ) {
            Ok(fd) => fd,
            Err(_) => {
                // Already exists, try to open. Reinitializing wipes whatever
                // state other attachers left in the region.
                tracing::warn!(name, "shared memory region already exists, reinitializing");
                shm_open(c_name.as_c_str(), ShmOFlags::RDWR, Mode::empty()).map_err(|e| {
                    RingError::ShmCreate {
                        name: name.to_string(),
                        source: e.into(),
                    }
                })?
            }
        };

        // Set size
        ftruncate(&fd, size as u64).map_err(|e| RingError::Truncate(e.into()))?;

        // Map to memory
        let addr = unsafe {
            mmap(
                std::ptr::null_mut(),
                size,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::SHARED,
                &fd,
                0,
            )
            .map_err(|e| RingError::Mmap(e.into()))?
        };

        let addr = NonNull::new(addr.cast::<u8>()).expect("mmap returned null");

        // Zero initialize
        unsafe {
            std::ptr::write_bytes(addr.as_ptr(), 0, size);
        }

        tracing::debug!(name, size, "created shared memory region");

        Ok(Self {
            fd,
            addr,
            size,
            name: name.to_string(),
        })
    }

    /// Open an existing shared memory region
    pub fn open(name: &str) -> Result<Self> {
        if name.len() > MAX_NAME_LEN {
            return Err(RingError::NameTooLong {
                max: MAX_NAME_LEN,
                got: name.len(),
            });
        }

        let full_name = format!("{}{}", SHM_PREFIX, name);
        let c_name = CString::new(full_name).unwrap();

        let fd = shm_open(c_name.as_c_str(), ShmOFlags::RDWR, Mode::empty()).map_err(|e| {
            RingError::ShmOpen {
                name: name.to_string(),
                source: e.into(),
            }
        })?;

        // Get size from file
        let stat = rustix::fs::fstat(&fd).map_err(|e| RingError::ShmOpen {
            name: name.to_string(),
            source: e.into(),
        })?;
        let size = stat.st_size as usize;

        // Map to memory
        let addr = unsafe {
            mmap(
                std::ptr::null_mut(),
                size,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::SHARED,
                &fd,
                0,
            )
            .map_err(|e| RingError::Mmap(e.into()))?
        };

        let addr = NonNull::new(addr.cast::<u8>()).expect("mmap returned null");

        tracing::debug!(name, size, "opened shared memory region");

        Ok(Self {
            fd,
            addr,
            size,
            name: name.to_string(),
        })
    }

    /// Remove the named shm object from the system.
    ///
    /// Existing mappings stay valid until each attached process unmaps; new
    /// opens under this name will fail.
    pub fn unlink(name: &str) -> Result<()> {
        let full_name = format!("{}{}", SHM_PREFIX, name);
        let c_name = CString::new(full_name).unwrap();
        shm_unlink(c_name.as_c_str()).map_err(|e| RingError::ShmUnlink {
            name: name.to_string(),
            source: e.into(),
        })?;
        tracing::debug!(name, "unlinked shared memory region");
        Ok(())
    }

    /// Get raw pointer to shared memory
    #[inline(always)]
    pub fn as_ptr(&self) -> *mut u8 {
        self.addr.as_ptr()
    }

    /// Get size of shared memory region
    #[inline(always)]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Get the name of shared memory
    #[inline(always)]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for ShmRegion {
    fn drop(&mut self) {
        // Unmap only. Destruction of the object is explicit via unlink().
        unsafe {
            let _ = munmap(self.addr.as_ptr().cast(), self.size);
        }
    }
}
