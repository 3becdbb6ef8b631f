//! Message-bus abstraction: fan-out exchanges and durable queues over AMQP
//! (§6). `Publisher` is the one-way interface producers depend on; workers
//! bind their own [`QueueConsumer`] per fan-out topic they subscribe to.

pub mod amqp;
pub mod consumer;
pub mod error;
pub mod publisher;
pub mod topic;

pub use amqp::{AmqpBus, DEFAULT_PREFETCH};
pub use consumer::{ack, reject_and_drop, QueueConsumer};
pub use error::{BusError, Result};
pub use publisher::{publish_json, Publisher};
pub use topic::Topic;
