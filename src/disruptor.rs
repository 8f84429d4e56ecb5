//! High-level disruptor API
//!
//! A [`Disruptor`] is one process's handle on a named shared ring: it maps
//! the region (creating and initializing it when this attacher is the
//! initializer), validates the header, and exposes the claim/commit/read
//! operations under the handle's wait policy.

use crate::consumer::{Consumer, ReadBatch};
use crate::error::{Result, RingError};
use crate::layout::{self, RingView};
use crate::producer::{Claim, Producer};
use crate::shm::ShmRegion;
use crate::wait::WaitMode;

/// Disruptor configuration.
///
/// `capacity`, `element_size` and `consumer_count` describe the shared
/// region and must agree between every attacher; `consumer_index` and
/// `spin` are per-attacher.
#[derive(Debug, Clone, Copy)]
pub struct DisruptorConfig {
    /// Number of slots; must be a non-zero power of two
    pub capacity: usize,
    /// Size of each slot in bytes
    pub element_size: usize,
    /// Total number of registered consumers
    pub consumer_count: u32,
    /// This attacher's consumer index, `None` for a write-only attacher
    pub consumer_index: Option<u32>,
    /// Busy-poll stalled operations instead of returning empty results
    pub spin: bool,
}

impl Default for DisruptorConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            element_size: 64,
            consumer_count: 1,
            consumer_index: None,
            spin: false,
        }
    }
}

impl DisruptorConfig {
    fn validate(&self) -> Result<()> {
        if self.capacity == 0 || !self.capacity.is_power_of_two() {
            return Err(RingError::InvalidCapacity(self.capacity));
        }
        if self.element_size == 0 {
            return Err(RingError::InvalidElementSize(self.element_size));
        }
        if self.consumer_count == 0 {
            return Err(RingError::InvalidConsumerCount(self.consumer_count));
        }
        if let Some(index) = self.consumer_index {
            if index >= self.consumer_count {
                return Err(RingError::ConsumerIndexOutOfRange {
                    index,
                    count: self.consumer_count,
                });
            }
        }
        Ok(())
    }
}

/// One process's handle on a shared disruptor region.
pub struct Disruptor {
    shm: Option<ShmRegion>,
    pub(crate) producer: Producer,
    pub(crate) consumer: Option<Consumer>,
    wait: WaitMode,
    config: DisruptorConfig,
}

impl Disruptor {
    /// Create and initialize the named region as its initializer.
    ///
    /// Exactly one attacher per region should call this; every other process
    /// uses [`Disruptor::attach`].
    pub fn create(name: &str, config: DisruptorConfig) -> Result<Self> {
        config.validate()?;
        let size = layout::size_for(config.capacity, config.element_size, config.consumer_count);
        let shm = ShmRegion::create(name, size)?;
        let ring = unsafe {
            RingView::init(
                shm.as_ptr(),
                config.capacity,
                config.element_size,
                config.consumer_count,
            )
        };
        tracing::info!(
            name,
            capacity = config.capacity,
            element_size = config.element_size,
            consumer_count = config.consumer_count,
            "initialized disruptor region"
        );
        Ok(Self::build(shm, ring, config))
    }

    /// Attach to an existing region, validating its header against `config`.
    ///
    /// A mismatched capacity, element size or consumer count is a fatal
    /// configuration error.
    pub fn attach(name: &str, config: DisruptorConfig) -> Result<Self> {
        config.validate()?;
        let size = layout::size_for(config.capacity, config.element_size, config.consumer_count);
        let shm = ShmRegion::open(name)?;
        if shm.size() < size {
            return Err(RingError::RegionTooSmall {
                expected: size,
                got: shm.size(),
            });
        }
        let ring = unsafe {
            RingView::attach(
                shm.as_ptr(),
                config.capacity,
                config.element_size,
                config.consumer_count,
            )
        }?;
        tracing::info!(name, consumer_index = ?config.consumer_index, "attached disruptor region");
        Ok(Self::build(shm, ring, config))
    }

    fn build(shm: ShmRegion, ring: RingView, config: DisruptorConfig) -> Self {
        Self {
            shm: Some(shm),
            producer: Producer::new(ring),
            consumer: config.consumer_index.map(|index| Consumer::new(ring, index)),
            wait: WaitMode::from_spin(config.spin),
            config,
        }
    }

    #[inline]
    pub(crate) fn ensure_attached(&self) -> Result<()> {
        if self.shm.is_none() {
            return Err(RingError::Released);
        }
        Ok(())
    }

    /// Reserve the next element for writing.
    ///
    /// Under [`WaitMode::NoWait`], `Ok(None)` means the ring is full.
    pub fn produce_claim(&self) -> Result<Option<Claim<'_>>> {
        self.produce_claim_many(1)
    }

    /// Reserve `n` contiguous elements for writing.
    ///
    /// Under [`WaitMode::NoWait`], `Ok(None)` means fewer than `n` slots are
    /// free beyond the gate.
    pub fn produce_claim_many(&self, n: usize) -> Result<Option<Claim<'_>>> {
        self.ensure_attached()?;
        match self.wait {
            WaitMode::Spin => self.producer.claim(n).map(Some),
            WaitMode::NoWait => self.producer.try_claim(n),
        }
    }

    /// Publish a claimed range to consumers.
    ///
    /// Under [`WaitMode::NoWait`], `Ok(false)` means earlier claims are
    /// still uncommitted; the caller retries with the same claim.
    pub fn produce_commit(&self, claim: &Claim<'_>) -> Result<bool> {
        self.ensure_attached()?;
        match self.wait {
            WaitMode::Spin => {
                self.producer.commit(claim)?;
                Ok(true)
            }
            WaitMode::NoWait => self.producer.try_commit(claim),
        }
    }

    /// Read everything committed since this consumer's last acknowledgement.
    ///
    /// Implicitly acknowledges the previous batch first. Under
    /// [`WaitMode::NoWait`], `Ok(None)` means no new data.
    pub fn consume_new(&mut self) -> Result<Option<ReadBatch<'_>>> {
        self.ensure_attached()?;
        let wait = self.wait;
        let consumer = self.consumer.as_mut().ok_or(RingError::NotAConsumer)?;
        Ok(match wait {
            WaitMode::Spin => Some(consumer.new_data()),
            WaitMode::NoWait => consumer.try_new_data(),
        })
    }

    /// Acknowledge the batch returned by the most recent
    /// [`Disruptor::consume_new`], releasing its slots for reuse.
    pub fn consume_commit(&mut self) -> Result<()> {
        self.ensure_attached()?;
        self.consumer
            .as_mut()
            .ok_or(RingError::NotAConsumer)?
            .commit();
        Ok(())
    }

    /// Unmap this process's view of the region.
    ///
    /// Safe to call multiple times; later operations on this handle fail
    /// with [`RingError::Released`]. Other attached processes are
    /// unaffected, and the region itself persists until
    /// [`Disruptor::unlink`].
    pub fn release(&mut self) {
        if let Some(shm) = self.shm.take() {
            tracing::debug!(name = shm.name(), "released disruptor region view");
            self.consumer = None;
            drop(shm);
        }
    }

    /// Destroy the named region.
    ///
    /// Views held by attached processes stay mapped until they release.
    pub fn unlink(name: &str) -> Result<()> {
        ShmRegion::unlink(name)
    }

    /// Number of slots in the ring
    #[inline]
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Size of each slot in bytes
    #[inline]
    pub fn element_size(&self) -> usize {
        self.config.element_size
    }

    /// Number of registered consumers
    #[inline]
    pub fn consumer_count(&self) -> u32 {
        self.config.consumer_count
    }

    /// This handle's wait policy
    #[inline]
    pub fn wait_mode(&self) -> WaitMode {
        self.wait
    }
}

impl Drop for Disruptor {
    fn drop(&mut self) {
        self.release();
    }
}
