//! Producer sequencer
//!
//! Producers reserve contiguous sequence ranges by CAS on the shared claim
//! frontier, write payload bytes through the returned [`Claim`], then commit.
//! The commit protocol moves the producer cursor from `start - 1` to the end
//! of the range, so commits become visible in claim order with no gaps: a
//! producer that claimed later must wait for every earlier claim to commit
//! first, regardless of which one finished writing.

use crate::error::{Result, RingError};
use crate::layout::RingView;
use crate::sequence::{self, Span};
use crate::wait;
use std::marker::PhantomData;
use std::sync::atomic::Ordering;

/// Producer handle over a shared ring.
///
/// Any number of producers may operate on the same region, from any mix of
/// threads and processes; the claim CAS guarantees disjoint ranges.
pub struct Producer {
    ring: RingView,
}

// SAFETY: all coordination goes through the shared atomics; claimed slot
// ranges are disjoint between producers.
unsafe impl Send for Producer {}
unsafe impl Sync for Producer {}

impl Producer {
    pub(crate) fn new(ring: RingView) -> Self {
        Self { ring }
    }

    fn check_claim_size(&self, n: usize) -> Result<()> {
        let capacity = self.ring.capacity();
        if n == 0 || n > capacity {
            return Err(RingError::InvalidClaim {
                requested: n,
                capacity,
            });
        }
        Ok(())
    }

    /// One CAS attempt at reserving `n` elements.
    ///
    /// Returns `None` only when the ring lacks capacity relative to the
    /// gate; CAS contention with other producers is retried inline.
    fn claim_once(&self, n: usize) -> Option<Claim<'_>> {
        let capacity = self.ring.capacity();
        loop {
            let claimed = self.ring.claim().load(Ordering::Acquire);
            let end = claimed + n as i64;
            let gate = self.ring.gate();
            if !sequence::has_capacity(end, gate, capacity) {
                return None;
            }
            if self
                .ring
                .claim()
                .compare_exchange_weak(claimed, end, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return Some(self.build_claim(claimed + 1, n));
            }
        }
    }

    fn build_claim(&self, start: i64, n: usize) -> Claim<'_> {
        let element_size = self.ring.element_size();
        let (head, tail) = sequence::wrap_spans(start, n, self.ring.capacity());
        let as_bytes = |span: Span| (self.ring.slot_ptr(span.slot), span.len * element_size);
        Claim {
            start,
            len: n,
            head: as_bytes(head),
            tail: tail.map(as_bytes),
            _producer: PhantomData,
        }
    }

    /// Reserve `n` contiguous elements, or return `None` if the ring is full
    /// at this instant.
    pub fn try_claim(&self, n: usize) -> Result<Option<Claim<'_>>> {
        self.check_claim_size(n)?;
        Ok(self.claim_once(n))
    }

    /// Reserve `n` contiguous elements, busy-polling until the gate advances
    /// far enough.
    pub fn claim(&self, n: usize) -> Result<Claim<'_>> {
        self.check_claim_size(n)?;
        Ok(wait::spin_until(|| self.claim_once(n)))
    }

    /// Attempt to publish a claimed range.
    ///
    /// Returns `Ok(false)` while earlier-claimed ranges remain uncommitted;
    /// the caller retries with the same claim. Committing a range the cursor
    /// has already passed is a [`RingError::StaleCommit`] programming error.
    pub fn try_commit(&self, claim: &Claim<'_>) -> Result<bool> {
        let start = claim.start;
        let end = claim.end();

        let claimed = self.ring.claim().load(Ordering::Acquire);
        if claimed < end {
            return Err(RingError::StaleCommit {
                start,
                end,
                cursor: claimed,
            });
        }

        loop {
            let cursor = self.ring.cursor().load(Ordering::Acquire);
            if cursor >= start {
                return Err(RingError::StaleCommit { start, end, cursor });
            }
            if cursor < start - 1 {
                // An earlier claim has not committed yet
                return Ok(false);
            }
            match self.ring.cursor().compare_exchange_weak(
                start - 1,
                end,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(true),
                Err(_) => continue,
            }
        }
    }

    /// Publish a claimed range, busy-polling until every earlier claim has
    /// committed.
    pub fn commit(&self, claim: &Claim<'_>) -> Result<()> {
        loop {
            if self.try_commit(claim)? {
                return Ok(());
            }
            core::hint::spin_loop();
        }
    }
}

/// A reserved, not-yet-committed range of slots.
///
/// Exposes the slot storage as one or two mutable byte spans (two when the
/// range wraps the physical end of the ring), totalling
/// `len * element_size` bytes. The memory may be overwritten by other
/// producers once the range is committed and later reclaimed.
pub struct Claim<'a> {
    start: i64,
    len: usize,
    head: (*mut u8, usize),
    tail: Option<(*mut u8, usize)>,
    _producer: PhantomData<&'a Producer>,
}

// SAFETY: the span pointers address slots reserved exclusively for this
// claim until commit. A shared reference only exposes the sequence
// accessors; writing through the spans requires `&mut self`.
unsafe impl Send for Claim<'_> {}
unsafe impl Sync for Claim<'_> {}

impl Claim<'_> {
    /// First sequence number in the range
    #[inline]
    pub fn start(&self) -> i64 {
        self.start
    }

    /// Last sequence number in the range
    #[inline]
    pub fn end(&self) -> i64 {
        self.start + self.len as i64 - 1
    }

    /// Number of reserved elements
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Writable byte spans for the reserved slots.
    ///
    /// The second span is empty unless the range wraps. Element boundaries
    /// within a span fall every `element_size` bytes.
    pub fn bufs(&mut self) -> (&mut [u8], &mut [u8]) {
        let head = unsafe { std::slice::from_raw_parts_mut(self.head.0, self.head.1) };
        let tail = match self.tail {
            Some((ptr, len)) => unsafe { std::slice::from_raw_parts_mut(ptr, len) },
            None => &mut [],
        };
        (head, tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::testutil::HeapRing;
    use crate::sequence::INITIAL_SEQUENCE;

    #[test]
    fn test_claims_are_sequential() {
        let ring = HeapRing::new(8, 4, 1);
        let producer = Producer::new(ring.view());

        let c1 = producer.try_claim(1).unwrap().unwrap();
        assert_eq!((c1.start(), c1.end()), (0, 0));
        let c2 = producer.try_claim(3).unwrap().unwrap();
        assert_eq!((c2.start(), c2.end()), (1, 3));

        assert_eq!(ring.view().claim().load(Ordering::Relaxed), 3);
        // Nothing committed yet
        assert_eq!(
            ring.view().cursor().load(Ordering::Relaxed),
            INITIAL_SEQUENCE
        );
    }

    #[test]
    fn test_invalid_claim_sizes() {
        let ring = HeapRing::new(4, 8, 1);
        let producer = Producer::new(ring.view());
        assert!(matches!(
            producer.try_claim(0),
            Err(RingError::InvalidClaim { .. })
        ));
        assert!(matches!(
            producer.try_claim(5),
            Err(RingError::InvalidClaim { .. })
        ));
    }

    #[test]
    fn test_full_ring_blocks_until_gate_advances() {
        let ring = HeapRing::new(4, 8, 1);
        let view = ring.view();
        let producer = Producer::new(view);

        let c = producer.try_claim(4).unwrap().unwrap();
        producer.commit(&c).unwrap();

        // Ring is full; the unread slots must not be reclaimable
        assert!(producer.try_claim(1).unwrap().is_none());

        // Consumer acknowledges sequence 0; slot 0 becomes free
        view.consumer_cursor(0).store(0, Ordering::Release);
        let c = producer.try_claim(1).unwrap().unwrap();
        assert_eq!(c.start(), 4);
        assert!(producer.try_claim(1).unwrap().is_none());
    }

    #[test]
    fn test_commit_order_matches_claim_order() {
        let ring = HeapRing::new(8, 4, 1);
        let view = ring.view();
        let producer = Producer::new(view);

        let c1 = producer.try_claim(2).unwrap().unwrap();
        let c2 = producer.try_claim(2).unwrap().unwrap();

        // Later claim cannot publish first
        assert!(!producer.try_commit(&c2).unwrap());
        assert_eq!(
            view.cursor().load(Ordering::Relaxed),
            INITIAL_SEQUENCE
        );

        assert!(producer.try_commit(&c1).unwrap());
        assert_eq!(view.cursor().load(Ordering::Relaxed), 1);
        assert!(producer.try_commit(&c2).unwrap());
        assert_eq!(view.cursor().load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_double_commit_is_stale() {
        let ring = HeapRing::new(8, 4, 1);
        let producer = Producer::new(ring.view());

        let c = producer.try_claim(1).unwrap().unwrap();
        assert!(producer.try_commit(&c).unwrap());
        assert!(matches!(
            producer.try_commit(&c),
            Err(RingError::StaleCommit { .. })
        ));
    }

    #[test]
    fn test_wrapping_claim_splits_spans() {
        let ring = HeapRing::new(4, 8, 1);
        let view = ring.view();
        let producer = Producer::new(view);

        let c = producer.try_claim(3).unwrap().unwrap();
        producer.commit(&c).unwrap();
        view.consumer_cursor(0).store(2, Ordering::Release);

        // Sequences 3,4,5: slot 3 then slots 0,1
        let mut c = producer.try_claim(3).unwrap().unwrap();
        let (head, tail) = c.bufs();
        assert_eq!(head.len(), 8);
        assert_eq!(tail.len(), 16);
        assert_eq!(head.as_ptr(), view.slot_ptr(3) as *const u8);
        assert_eq!(tail.as_ptr(), view.slot_ptr(0) as *const u8);
    }

    #[test]
    fn test_concurrent_claims_disjoint_and_ordered() {
        let ring = HeapRing::new(64, 8, 1);
        let view = ring.view();
        const PER_THREAD: usize = 32;

        std::thread::scope(|s| {
            for _ in 0..2 {
                s.spawn(move || {
                    let producer = Producer::new(view);
                    for _ in 0..PER_THREAD {
                        let mut claim = producer.claim(1).unwrap();
                        let seq = claim.start();
                        claim.bufs().0.copy_from_slice(&seq.to_le_bytes());
                        producer.commit(&claim).unwrap();
                    }
                });
            }
        });

        let total = 2 * PER_THREAD as i64;
        assert_eq!(view.claim().load(Ordering::Acquire), total - 1);
        assert_eq!(view.cursor().load(Ordering::Acquire), total - 1);

        // Every slot was written by the thread that claimed its sequence
        for seq in 0..total {
            let slot = crate::sequence::slot_index(seq, 64);
            let bytes =
                unsafe { std::slice::from_raw_parts(view.slot_ptr(slot) as *const u8, 8) };
            assert_eq!(i64::from_le_bytes(bytes.try_into().unwrap()), seq);
        }
    }

    #[test]
    fn test_claim_is_shareable_across_threads() {
        let ring = HeapRing::new(8, 8, 1);
        let view = ring.view();
        let producer = Producer::new(view);

        let mut claim = producer.try_claim(1).unwrap().unwrap();
        claim.bufs().0.copy_from_slice(&9u64.to_le_bytes());

        // A borrowed claim must be usable from another thread, e.g. when a
        // spawned task awaits the commit
        let claim = &claim;
        std::thread::scope(|s| {
            s.spawn(|| {
                assert!(producer.try_commit(claim).unwrap());
            });
        });
        assert_eq!(view.cursor().load(Ordering::Acquire), 0);
    }

    #[test]
    fn test_gate_cursor_claim_invariant() {
        let ring = HeapRing::new(8, 4, 2);
        let view = ring.view();
        let producer = Producer::new(view);

        let check = |view: &RingView| {
            let gate = view.gate();
            let cursor = view.cursor().load(Ordering::Acquire);
            let claim = view.claim().load(Ordering::Acquire);
            assert!(gate <= cursor && cursor <= claim);
        };

        check(&view);
        let c1 = producer.try_claim(3).unwrap().unwrap();
        check(&view);
        producer.commit(&c1).unwrap();
        check(&view);
        view.consumer_cursor(0).store(2, Ordering::Release);
        view.consumer_cursor(1).store(1, Ordering::Release);
        check(&view);
    }
}
