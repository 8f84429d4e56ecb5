//! Lock-free shared-memory LMAX Disruptor for inter-process communication.
//!
//! Any number of producer and consumer processes attach to a named shared
//! memory region holding a ring of fixed-size slots. Producers claim and
//! commit contiguous sequence ranges, consumers read and acknowledge them,
//! and slot reuse is gated by the slowest consumer. Coordination uses only
//! atomic 64-bit cursors in the shared header: no kernel locks, and no
//! copying beyond what the caller does into and out of the slot memory.
//!
//! # Protocol
//!
//! - A producer claims `n` slots (CAS on the shared claim frontier), writes
//!   payload bytes through the returned [`Claim`](producer::Claim), then
//!   commits. Commits become visible in claim order, with no gaps.
//! - A consumer asks for everything committed since its last
//!   acknowledgement, reads the returned
//!   [`ReadBatch`](consumer::ReadBatch), then commits its own cursor so
//!   producers can reclaim the slots. Every consumer sees every element
//!   (broadcast, not work-stealing).
//! - Stalled operations either busy-poll or return an empty sentinel,
//!   per the handle's [`WaitMode`].
//!
//! # Example
//!
//! ```no_run
//! use shm_disruptor::{Disruptor, DisruptorConfig};
//!
//! let config = DisruptorConfig {
//!     capacity: 1024,
//!     element_size: 64,
//!     consumer_count: 1,
//!     consumer_index: None,
//!     spin: false,
//! };
//! let writer = Disruptor::create("my_ring", config)?;
//! let mut claim = writer.produce_claim()?.expect("ring full");
//! claim.bufs().0[..5].copy_from_slice(b"hello");
//! writer.produce_commit(&claim)?;
//! # Ok::<(), shm_disruptor::RingError>(())
//! ```

pub mod consumer;
pub mod disruptor;
pub mod error;
pub mod layout;
pub mod producer;
pub mod sequence;
pub mod shm;
pub mod wait;

#[cfg(feature = "async")]
pub mod asynk;

pub use consumer::{Consumer, ReadBatch};
pub use disruptor::{Disruptor, DisruptorConfig};
pub use error::{Result, RingError};
pub use producer::{Claim, Producer};
pub use wait::WaitMode;
