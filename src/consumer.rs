//! Consumer cursor
//!
//! Each consumer index observes every committed element exactly once, in
//! sequence order, and advances at its own pace. Reading is two-phase:
//! [`Consumer::try_new_data`] / [`Consumer::new_data`] return the committed
//! range past the last acknowledgement, and [`Consumer::commit`] publishes
//! the acknowledgement so producers can reclaim the slots. Checking for new
//! data implicitly commits the previous batch first.

use crate::layout::RingView;
use crate::sequence::{self, Span};
use crate::wait;
use std::marker::PhantomData;
use std::sync::atomic::Ordering;

/// Consumer handle bound to one consumer index.
///
/// Exactly one live handle should exist per index; the shared cursor for the
/// index is only ever advanced through it.
pub struct Consumer {
    ring: RingView,
    index: u32,
    /// Highest sequence this consumer has acknowledged
    last_read: i64,
    /// Highest sequence handed out by the most recent new_data call
    pending: i64,
}

// SAFETY: the shared cursor is owned by this handle; everything else is read
// through atomics.
unsafe impl Send for Consumer {}

impl Consumer {
    /// Resumes from the shared cursor, so a re-attaching consumer continues
    /// where it last acknowledged.
    pub(crate) fn new(ring: RingView, index: u32) -> Self {
        let last_read = ring.consumer_cursor(index).load(Ordering::Acquire);
        Self {
            ring,
            index,
            last_read,
            pending: last_read,
        }
    }

    /// This consumer's index within the region
    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Publish the acknowledgement for the most recent batch.
    ///
    /// Idempotent: a no-op when nothing is pending.
    pub fn commit(&mut self) {
        if self.pending > self.last_read {
            self.ring
                .consumer_cursor(self.index)
                .store(self.pending, Ordering::Release);
            self.last_read = self.pending;
        }
    }

    /// Commit the previous batch, then report the committed cursor if it has
    /// moved past this consumer.
    pub(crate) fn ready_cursor(&mut self) -> Option<i64> {
        self.commit();
        let cursor = self.ring.cursor().load(Ordering::Acquire);
        (cursor > self.last_read).then_some(cursor)
    }

    pub(crate) fn batch_to(&mut self, cursor: i64) -> ReadBatch<'_> {
        let start = self.last_read + 1;
        let n = (cursor - self.last_read) as usize;
        self.pending = cursor;

        let element_size = self.ring.element_size();
        let (head, tail) = sequence::wrap_spans(start, n, self.ring.capacity());
        let as_bytes =
            |span: Span| (self.ring.slot_ptr(span.slot) as *const u8, span.len * element_size);
        ReadBatch {
            start,
            len: n,
            head: as_bytes(head),
            tail: tail.map(as_bytes),
            _consumer: PhantomData,
        }
    }

    /// Return all elements committed since the last acknowledgement, or
    /// `None` if there are none at this instant.
    pub fn try_new_data(&mut self) -> Option<ReadBatch<'_>> {
        match self.ready_cursor() {
            Some(cursor) => Some(self.batch_to(cursor)),
            None => None,
        }
    }

    /// Return all elements committed since the last acknowledgement,
    /// busy-polling until at least one exists.
    pub fn new_data(&mut self) -> ReadBatch<'_> {
        let cursor = wait::spin_until(|| self.ready_cursor());
        self.batch_to(cursor)
    }
}

/// A batch of committed elements awaiting acknowledgement.
///
/// Exposes the slots as one or two read-only byte spans (two when the range
/// wraps the physical end of the ring). The spans stay valid until
/// [`Consumer::commit`] releases them, which the borrow makes impossible
/// while the batch is alive.
pub struct ReadBatch<'a> {
    start: i64,
    len: usize,
    head: (*const u8, usize),
    tail: Option<(*const u8, usize)>,
    _consumer: PhantomData<&'a mut Consumer>,
}

// SAFETY: the spans are read-only views of slots no producer may reclaim
// before this consumer commits.
unsafe impl Send for ReadBatch<'_> {}
unsafe impl Sync for ReadBatch<'_> {}

impl ReadBatch<'_> {
    /// First sequence number in the batch
    #[inline]
    pub fn start(&self) -> i64 {
        self.start
    }

    /// Last sequence number in the batch
    #[inline]
    pub fn end(&self) -> i64 {
        self.start + self.len as i64 - 1
    }

    /// Number of elements in the batch
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Readable byte spans for the batch.
    ///
    /// The second span is empty unless the batch wraps. Element boundaries
    /// within a span fall every `element_size` bytes.
    pub fn bufs(&self) -> (&[u8], &[u8]) {
        let head = unsafe { std::slice::from_raw_parts(self.head.0, self.head.1) };
        let tail = match self.tail {
            Some((ptr, len)) => unsafe { std::slice::from_raw_parts(ptr, len) },
            None => &[],
        };
        (head, tail)
    }

    /// Copy the batch into a contiguous vector, in sequence order.
    pub fn to_vec(&self) -> Vec<u8> {
        let (head, tail) = self.bufs();
        let mut out = Vec::with_capacity(head.len() + tail.len());
        out.extend_from_slice(head);
        out.extend_from_slice(tail);
        out
    }
}
