//! Error types for the disruptor

use std::io;
use thiserror::Error;

/// Result type for disruptor operations
pub type Result<T> = std::result::Result<T, RingError>;

/// Errors that can occur while building or using a disruptor.
///
/// Backpressure (ring full, no new data) is never an error; those conditions
/// are reported as empty results by the non-spinning call variants.
#[derive(Debug, Error)]
pub enum RingError {
    /// Failed to create shared memory
    #[error("Failed to create shared memory '{name}': {source}")]
    ShmCreate {
        name: String,
        #[source]
        source: io::Error,
    },

    /// Failed to open shared memory
    #[error("Failed to open shared memory '{name}': {source}")]
    ShmOpen {
        name: String,
        #[source]
        source: io::Error,
    },

    /// Failed to map memory
    #[error("Failed to map memory: {0}")]
    Mmap(#[source] io::Error),

    /// Failed to truncate shared memory
    #[error("Failed to set shared memory size: {0}")]
    Truncate(#[source] io::Error),

    /// Failed to unlink shared memory
    #[error("Failed to unlink shared memory '{name}': {source}")]
    ShmUnlink {
        name: String,
        #[source]
        source: io::Error,
    },

    /// Region name too long for shm_open
    #[error("Region name too long: max {max} chars, got {got}")]
    NameTooLong { max: usize, got: usize },

    /// Invalid magic number in the region header
    #[error("Invalid region magic number: expected 0x{expected:08X}, got 0x{got:08X}")]
    InvalidMagic { expected: u32, got: u32 },

    /// Layout version mismatch between attachers
    #[error("Region layout version mismatch: expected {expected}, got {got}")]
    VersionMismatch { expected: u32, got: u32 },

    /// Header field differs from the attacher's configuration
    #[error("Region header mismatch on {field}: expected {expected}, got {got}")]
    HeaderMismatch {
        field: &'static str,
        expected: u64,
        got: u64,
    },

    /// Mapped region is smaller than the configured layout requires
    #[error("Region too small: need {expected} bytes, got {got}")]
    RegionTooSmall { expected: usize, got: usize },

    /// Capacity must be a non-zero power of two
    #[error("Invalid capacity {0}: must be a non-zero power of two")]
    InvalidCapacity(usize),

    /// Element size must be non-zero
    #[error("Invalid element size {0}: must be non-zero")]
    InvalidElementSize(usize),

    /// Consumer count must be non-zero
    #[error("Invalid consumer count {0}: must be non-zero")]
    InvalidConsumerCount(u32),

    /// Consumer index outside the registered range
    #[error("Consumer index {index} out of range: region has {count} consumers")]
    ConsumerIndexOutOfRange { index: u32, count: u32 },

    /// Claim size outside the valid range for this ring
    #[error("Invalid claim of {requested} elements: ring capacity is {capacity}")]
    InvalidClaim { requested: usize, capacity: usize },

    /// Commit of a range that was never reserved or was already committed
    #[error("Stale commit of [{start}, {end}]: sequencer is at {cursor}")]
    StaleCommit { start: i64, end: i64, cursor: i64 },

    /// Consume operation on a write-only handle
    #[error("Handle was not configured with a consumer index")]
    NotAConsumer,

    /// Operation on a handle whose region view has been released
    #[error("Region has been released by this handle")]
    Released,
}
