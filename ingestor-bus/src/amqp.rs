use async_trait::async_trait;
use lapin::options::{
    BasicConsumeOptions, BasicPublishOptions, BasicQosOptions, ExchangeDeclareOptions,
    QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Connection, ConnectionProperties, ExchangeKind};
use tracing::info;

use crate::consumer::QueueConsumer;
use crate::error::Result;
use crate::publisher::Publisher;
use crate::topic::Topic;

/// Persistent delivery mode (AMQP 0-9-1 `delivery_mode = 2`), used for
/// every publish on every topic (§6: "all durable where applicable").
const PERSISTENT_DELIVERY_MODE: u8 = 2;

/// Per-process prefetch for a consumer that acks one message at a time
/// (§5, §9 "Workers ... Per-process prefetch = 1").
pub const DEFAULT_PREFETCH: u16 = 1;

/// A single AMQP connection and channel, opened once per process (§5
/// "Resource policy"). Implements [`Publisher`] and exposes queue binding
/// for consumers.
pub struct AmqpBus {
    channel: lapin::Channel,
}

impl AmqpBus {
    pub async fn connect(amqp_url: &str) -> Result<Self> {
        info!(amqp_url, "connecting to message broker");
        let connection = Connection::connect(amqp_url, ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;
        Ok(Self { channel })
    }

    async fn declare_exchange(&self, topic: Topic) -> Result<()> {
        self.channel
            .exchange_declare(
                topic.exchange_name(),
                ExchangeKind::Fanout,
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;
        Ok(())
    }

    /// Declare `topic`'s fan-out exchange, declare a durable queue named
    /// `queue_name`, bind it, set the channel's prefetch to `prefetch` (§5:
    /// the default per-consumer value is 1; a consumer that genuinely
    /// batches acks, like chat-ingest, passes a higher value so the broker
    /// can have more than one delivery in flight at a time), and start
    /// consuming with manual ack.
    pub async fn bind_queue(
        &self,
        topic: Topic,
        queue_name: &str,
        prefetch: u16,
    ) -> Result<QueueConsumer> {
        self.declare_exchange(topic).await?;

        self.channel
            .queue_declare(
                queue_name,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        self.channel
            .queue_bind(
                queue_name,
                topic.exchange_name(),
                "",
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await?;

        self.channel
            .basic_qos(prefetch, BasicQosOptions::default())
            .await?;

        let consumer = self
            .channel
            .basic_consume(
                queue_name,
                queue_name,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;

        Ok(QueueConsumer::new(consumer))
    }
}

#[async_trait]
impl Publisher for AmqpBus {
    async fn publish_bytes(&self, topic: Topic, payload: Vec<u8>) -> Result<()> {
        self.declare_exchange(topic).await?;
        self.channel
            .basic_publish(
                topic.exchange_name(),
                "",
                BasicPublishOptions::default(),
                &payload,
                BasicProperties::default().with_delivery_mode(PERSISTENT_DELIVERY_MODE),
            )
            .await?
            .await?;
        Ok(())
    }
}
