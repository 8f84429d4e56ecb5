//! Asynchronous operation variants (feature `async`)
//!
//! Each `*_async` method resolves once its synchronous counterpart would
//! have returned. Under [`WaitMode::Spin`] the busy-poll becomes a
//! cooperative retry loop that yields to the executor between non-blocking
//! attempts, so a stalled operation never monopolizes a worker thread;
//! under [`WaitMode::NoWait`] the condition is evaluated exactly once and
//! the empty sentinel is returned immediately.

use crate::consumer::ReadBatch;
use crate::disruptor::Disruptor;
use crate::error::{Result, RingError};
use crate::producer::Claim;
use crate::wait::WaitMode;

impl Disruptor {
    /// Asynchronous variant of [`Disruptor::produce_claim`].
    pub async fn produce_claim_async(&self) -> Result<Option<Claim<'_>>> {
        self.produce_claim_many_async(1).await
    }

    /// Asynchronous variant of [`Disruptor::produce_claim_many`].
    pub async fn produce_claim_many_async(&self, n: usize) -> Result<Option<Claim<'_>>> {
        self.ensure_attached()?;
        if self.wait_mode() == WaitMode::NoWait {
            return self.producer.try_claim(n);
        }
        loop {
            if let Some(claim) = self.producer.try_claim(n)? {
                return Ok(Some(claim));
            }
            tokio::task::yield_now().await;
        }
    }

    /// Asynchronous variant of [`Disruptor::produce_commit`].
    pub async fn produce_commit_async(&self, claim: &Claim<'_>) -> Result<bool> {
        self.ensure_attached()?;
        if self.wait_mode() == WaitMode::NoWait {
            return self.producer.try_commit(claim);
        }
        loop {
            if self.producer.try_commit(claim)? {
                return Ok(true);
            }
            tokio::task::yield_now().await;
        }
    }

    /// Asynchronous variant of [`Disruptor::consume_new`].
    pub async fn consume_new_async(&mut self) -> Result<Option<ReadBatch<'_>>> {
        self.ensure_attached()?;
        let nowait = self.wait_mode() == WaitMode::NoWait;
        let consumer = self.consumer.as_mut().ok_or(RingError::NotAConsumer)?;
        if nowait {
            return Ok(consumer.try_new_data());
        }
        let cursor = loop {
            if let Some(cursor) = consumer.ready_cursor() {
                break cursor;
            }
            tokio::task::yield_now().await;
        };
        Ok(Some(consumer.batch_to(cursor)))
    }

    /// Asynchronous variant of [`Disruptor::consume_commit`].
    ///
    /// Acknowledgement never waits on other attachers, so this resolves on
    /// the first poll; it exists for symmetry with the other operations.
    pub async fn consume_commit_async(&mut self) -> Result<()> {
        self.consume_commit()
    }
}

#[cfg(test)]
mod tests {
    use crate::disruptor::{Disruptor, DisruptorConfig};

    fn config(consumer_index: Option<u32>, spin: bool) -> DisruptorConfig {
        DisruptorConfig {
            capacity: 8,
            element_size: 8,
            consumer_count: 1,
            consumer_index,
            spin,
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_async_round_trip() {
        let name = "disruptor_test_async_rt";
        let writer = Disruptor::create(name, config(None, true)).unwrap();
        let mut reader = Disruptor::attach(name, config(Some(0), true)).unwrap();

        let producer = tokio::spawn(async move {
            for i in 0..4u64 {
                let mut claim = writer.produce_claim_async().await.unwrap().unwrap();
                claim.bufs().0.copy_from_slice(&i.to_le_bytes());
                assert!(writer.produce_commit_async(&claim).await.unwrap());
            }
        });

        let mut seen = Vec::new();
        while seen.len() < 4 {
            let batch = reader.consume_new_async().await.unwrap().unwrap();
            let bytes = batch.to_vec();
            for chunk in bytes.chunks_exact(8) {
                seen.push(u64::from_le_bytes(chunk.try_into().unwrap()));
            }
        }
        assert_eq!(seen, vec![0, 1, 2, 3]);
        reader.consume_commit_async().await.unwrap();

        producer.await.unwrap();
        Disruptor::unlink(name).unwrap();
    }

    #[tokio::test]
    async fn test_async_nowait_returns_empty_immediately() {
        let name = "disruptor_test_async_nowait";
        let writer = Disruptor::create(name, config(None, false)).unwrap();
        let mut reader = Disruptor::attach(name, config(Some(0), false)).unwrap();

        assert!(reader.consume_new_async().await.unwrap().is_none());

        let mut claim = writer.produce_claim_async().await.unwrap().unwrap();
        claim.bufs().0.copy_from_slice(&7u64.to_le_bytes());
        assert!(writer.produce_commit_async(&claim).await.unwrap());
        drop(claim);

        let batch = reader.consume_new_async().await.unwrap().unwrap();
        assert_eq!(batch.bufs().0, &7u64.to_le_bytes());

        Disruptor::unlink(name).unwrap();
    }

    #[tokio::test]
    async fn test_async_nowait_claim_reports_full() {
        let name = "disruptor_test_async_full";
        let mut cfg = config(None, false);
        cfg.capacity = 2;
        let writer = Disruptor::create(name, cfg).unwrap();

        for i in 0..2u64 {
            let mut claim = writer.produce_claim_async().await.unwrap().unwrap();
            claim.bufs().0.copy_from_slice(&i.to_le_bytes());
            assert!(writer.produce_commit_async(&claim).await.unwrap());
        }
        assert!(writer.produce_claim_async().await.unwrap().is_none());

        Disruptor::unlink(name).unwrap();
    }
}
