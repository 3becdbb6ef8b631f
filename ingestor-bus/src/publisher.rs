use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;
use crate::topic::Topic;

/// One-way publish interface (§9 redesign flag: break the cyclic
/// session/bus reference by having producers depend only on this trait,
/// never on the concrete broker client).
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish a pre-serialized, persistent-delivery message to `topic`.
    async fn publish_bytes(&self, topic: Topic, payload: Vec<u8>) -> Result<()>;
}

/// Serialize `value` as JSON and publish it to `topic`. A free function
/// rather than a trait method so `Publisher` stays object-safe (`dyn
/// Publisher` is passed around by every worker).
pub async fn publish_json<P, T>(publisher: &P, topic: Topic, value: &T) -> Result<()>
where
    P: Publisher + ?Sized,
    T: Serialize + Sync,
{
    let payload = serde_json::to_vec(value)?;
    publisher.publish_bytes(topic, payload).await
}
