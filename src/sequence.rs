//! Pure sequence arithmetic
//!
//! Sequences are monotonically increasing `i64` values starting at
//! [`INITIAL_SEQUENCE`] ("before slot 0"). Mapping a sequence to a physical
//! slot and splitting a batch at the wraparound point are pure functions,
//! independent of where the slot storage lives.

/// Value of every cursor before any element has been claimed or read.
pub const INITIAL_SEQUENCE: i64 = -1;

/// A contiguous run of physical slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Index of the first slot
    pub slot: usize,
    /// Number of elements in the run
    pub len: usize,
}

/// Map a sequence number to its slot index.
///
/// `capacity` must be a power of two, which turns the modulo into a mask.
#[inline(always)]
pub fn slot_index(sequence: i64, capacity: usize) -> usize {
    debug_assert!(sequence >= 0);
    debug_assert!(capacity.is_power_of_two());
    sequence as usize & (capacity - 1)
}

/// Split the batch `[start, start + n)` into contiguous slot runs.
///
/// Returns at most two spans; the second is present only when the batch
/// crosses the physical end of the ring.
#[inline]
pub fn wrap_spans(start: i64, n: usize, capacity: usize) -> (Span, Option<Span>) {
    debug_assert!(n >= 1 && n <= capacity);
    let first = slot_index(start, capacity);
    let head_len = n.min(capacity - first);
    let head = Span {
        slot: first,
        len: head_len,
    };
    let tail = if head_len < n {
        Some(Span {
            slot: 0,
            len: n - head_len,
        })
    } else {
        None
    };
    (head, tail)
}

/// Whether a range ending at sequence `end` fits within the ring.
///
/// `gate` is the minimum consumer cursor (last acknowledged sequence, origin
/// -1). The slot for `end` has been vacated by every consumer exactly when
/// `end - gate <= capacity`.
#[inline(always)]
pub fn has_capacity(end: i64, gate: i64, capacity: usize) -> bool {
    end - gate <= capacity as i64
}
