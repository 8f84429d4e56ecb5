//! Shared region layout
//!
//! A region holds a fixed header, one cache-line-aligned cursor per
//! registered consumer, and then `capacity` slots of `element_size` bytes:
//!
//! ```text
//! RingHeader | consumer cursors (consumer_count x 64B) | slot storage
//! ```
//!
//! Every attaching process validates the header against its own
//! configuration before touching the cursors or slots.

use crate::error::{Result, RingError};
use crate::sequence::INITIAL_SEQUENCE;
use std::sync::atomic::{AtomicI64, Ordering};

/// Magic number for region validation
pub const RING_MAGIC: u32 = 0x4452_5054; // "DRPT"
/// Layout version; bumped whenever the header shape changes
pub const RING_VERSION: u32 = 1;

/// Cache line size for most modern x86_64 CPUs
const CACHE_LINE_SIZE: usize = 64;

/// Ensures the wrapped value is on its own cache line
#[repr(C, align(64))]
pub struct CacheAligned<T>(pub T);

// Each shared cursor must occupy exactly one cache line; the trailing
// cursor array and slot offset math rely on it.
const _: () = assert!(std::mem::size_of::<CacheAligned<AtomicI64>>() == CACHE_LINE_SIZE);

/// Region header stored at the start of shared memory.
///
/// The claim and producer cursors each get their own cache line so
/// contending producers and consumers don't false-share.
#[repr(C)]
pub struct RingHeader {
    magic: u32,
    version: u32,
    capacity: u64,
    element_size: u64,
    consumer_count: u32,
    _pad: u32,
    /// Highest sequence reserved by any producer
    claim: CacheAligned<AtomicI64>,
    /// Highest sequence committed and visible to consumers
    cursor: CacheAligned<AtomicI64>,
    // consumer cursors and slot storage follow
}

const fn header_size() -> usize {
    std::mem::size_of::<RingHeader>()
}

const fn cursors_size(consumer_count: u32) -> usize {
    consumer_count as usize * std::mem::size_of::<CacheAligned<AtomicI64>>()
}

/// Total region size for a given configuration.
pub const fn size_for(capacity: usize, element_size: usize, consumer_count: u32) -> usize {
    header_size() + cursors_size(consumer_count) + capacity * element_size
}

/// Copyable raw view over an initialized region.
///
/// A `RingView` is just a base pointer plus the typed accessors every handle
/// needs; producers and consumers are built on top of it.
#[derive(Clone, Copy)]
pub struct RingView {
    base: *mut u8,
}

// SAFETY: all shared state behind the view is accessed via atomics; slot
// bytes are coordinated by the claim/commit protocol.
unsafe impl Send for RingView {}
unsafe impl Sync for RingView {}

impl RingView {
    /// Initialize a fresh region and return a view over it.
    ///
    /// # Safety
    /// `base` must point to at least [`size_for`] writable bytes, aligned for
    /// `RingHeader`, not yet visible to any other attacher.
    pub unsafe fn init(
        base: *mut u8,
        capacity: usize,
        element_size: usize,
        consumer_count: u32,
    ) -> Self {
        let header = base as *mut RingHeader;
        (*header).magic = RING_MAGIC;
        (*header).version = RING_VERSION;
        (*header).capacity = capacity as u64;
        (*header).element_size = element_size as u64;
        (*header).consumer_count = consumer_count;
        (*header).claim.0 = AtomicI64::new(INITIAL_SEQUENCE);
        (*header).cursor.0 = AtomicI64::new(INITIAL_SEQUENCE);

        let cursors = base.add(header_size()) as *mut CacheAligned<AtomicI64>;
        for i in 0..consumer_count as usize {
            (*cursors.add(i)).0 = AtomicI64::new(INITIAL_SEQUENCE);
        }

        Self { base }
    }

    /// Attach to an already-initialized region, validating the header
    /// against the attacher's expectations.
    ///
    /// # Safety
    /// `base` must point to a mapped region of at least [`size_for`] bytes.
    pub unsafe fn attach(
        base: *mut u8,
        capacity: usize,
        element_size: usize,
        consumer_count: u32,
    ) -> Result<Self> {
        let header = &*(base as *const RingHeader);

        if header.magic != RING_MAGIC {
            return Err(RingError::InvalidMagic {
                expected: RING_MAGIC,
                got: header.magic,
            });
        }
        if header.version != RING_VERSION {
            return Err(RingError::VersionMismatch {
                expected: RING_VERSION,
                got: header.version,
            });
        }
        if header.capacity != capacity as u64 {
            return Err(RingError::HeaderMismatch {
                field: "capacity",
                expected: capacity as u64,
                got: header.capacity,
            });
        }
        if header.element_size != element_size as u64 {
            return Err(RingError::HeaderMismatch {
                field: "element_size",
                expected: element_size as u64,
                got: header.element_size,
            });
        }
        if header.consumer_count != consumer_count {
            return Err(RingError::HeaderMismatch {
                field: "consumer_count",
                expected: consumer_count as u64,
                got: header.consumer_count as u64,
            });
        }

        Ok(Self { base })
    }

    #[inline(always)]
    fn header(&self) -> &RingHeader {
        unsafe { &*(self.base as *const RingHeader) }
    }

    /// Number of slots in the ring
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.header().capacity as usize
    }

    /// Size of each slot in bytes
    #[inline(always)]
    pub fn element_size(&self) -> usize {
        self.header().element_size as usize
    }

    /// Number of registered consumers
    #[inline(always)]
    pub fn consumer_count(&self) -> u32 {
        self.header().consumer_count
    }

    /// Claim frontier: highest sequence reserved by any producer
    #[inline(always)]
    pub fn claim(&self) -> &AtomicI64 {
        &self.header().claim.0
    }

    /// Producer cursor: highest sequence committed and visible
    #[inline(always)]
    pub fn cursor(&self) -> &AtomicI64 {
        &self.header().cursor.0
    }

    /// Cursor of consumer `index`
    #[inline(always)]
    pub fn consumer_cursor(&self, index: u32) -> &AtomicI64 {
        debug_assert!(index < self.consumer_count());
        unsafe {
            let cursors = self.base.add(header_size()) as *const CacheAligned<AtomicI64>;
            &(*cursors.add(index as usize)).0
        }
    }

    /// Gate: minimum consumer cursor, the floor below which no slot may be
    /// reused. Re-read on every claim attempt.
    #[inline]
    pub fn gate(&self) -> i64 {
        let count = self.consumer_count();
        let mut min = i64::MAX;
        for i in 0..count {
            let seq = self.consumer_cursor(i).load(Ordering::Acquire);
            if seq < min {
                min = seq;
            }
        }
        min
    }

    /// Raw pointer to the first byte of slot `slot`
    #[inline(always)]
    pub fn slot_ptr(&self, slot: usize) -> *mut u8 {
        debug_assert!(slot < self.capacity());
        let offset = header_size()
            + cursors_size(self.consumer_count())
            + slot * self.element_size();
        unsafe { self.base.add(offset) }
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;

    /// Heap-backed ring region for exercising the lock-free logic without
    /// touching real shared memory.
    pub(crate) struct HeapRing {
        ptr: *mut u8,
        layout: std::alloc::Layout,
        view: RingView,
    }

    unsafe impl Send for HeapRing {}
    unsafe impl Sync for HeapRing {}

    impl HeapRing {
        pub(crate) fn new(capacity: usize, element_size: usize, consumer_count: u32) -> Self {
            let size = size_for(capacity, element_size, consumer_count);
            let layout = std::alloc::Layout::from_size_align(size, CACHE_LINE_SIZE).unwrap();
            let ptr = unsafe { std::alloc::alloc_zeroed(layout) };
            assert!(!ptr.is_null());
            let view = unsafe { RingView::init(ptr, capacity, element_size, consumer_count) };
            Self { ptr, layout, view }
        }

        pub(crate) fn view(&self) -> RingView {
            self.view
        }
    }

    impl Drop for HeapRing {
        fn drop(&mut self) {
            unsafe { std::alloc::dealloc(self.ptr, self.layout) };
        }
    }
}
