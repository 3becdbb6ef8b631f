use futures_util::StreamExt;
use lapin::message::Delivery;
use lapin::options::{BasicAckOptions, BasicNackOptions};

use crate::error::{BusError, Result};

/// A bound, durable queue consumer with `prefetch = 1` (§5: one in-flight
/// message per process). Wraps `lapin::Consumer`'s stream so callers never
/// touch the broker client type directly.
pub struct QueueConsumer {
    inner: lapin::Consumer,
}

impl QueueConsumer {
    pub(crate) fn new(inner: lapin::Consumer) -> Self {
        Self { inner }
    }

    /// Await the next delivery. Returns `None` when the broker closes the
    /// consumer (e.g. on connection shutdown).
    pub async fn recv(&mut self) -> Option<Result<Delivery>> {
        self.inner
            .next()
            .await
            .map(|res| res.map_err(BusError::from))
    }
}

/// Acknowledge a delivery after all side effects have succeeded (§4.2 step
/// 6, §7 "downstream transient").
pub async fn ack(delivery: &Delivery) -> Result<()> {
    delivery
        .ack(BasicAckOptions::default())
        .await
        .map_err(BusError::from)
}

/// Explicitly reject a poison message, acking it to drop rather than
/// requeue (§7 "poison message").
pub async fn reject_and_drop(delivery: &Delivery) -> Result<()> {
    delivery
        .nack(BasicNackOptions {
            requeue: false,
            ..Default::default()
        })
        .await
        .map_err(BusError::from)
}
