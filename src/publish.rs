use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex, mpsc};

use crate::error::Error;
use crate::types::{TransferBatch, Winner};

pub const TOPIC_WINNERS_ETHEREUM: &str = "winners.ethereum";
pub const TOPIC_SOLANA_BUFFERED_TRANSFERS: &str = "worker.solana.buffered_transfers";

/// One outbound unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Record {
    Winner(Winner),
    Transfers(TransferBatch),
}

impl Record {
    pub fn default_topic(&self) -> &'static str {
        match self {
            Self::Winner(_) => TOPIC_WINNERS_ETHEREUM,
            Self::Transfers(_) => TOPIC_SOLANA_BUFFERED_TRANSFERS,
        }
    }
}

/// What actually goes on the wire.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct QueueMessage {
    pub topic: String,
    pub payload: serde_json::Value,
}

impl QueueMessage {
    pub fn new(topic: &str, record: &Record) -> Result<Self, Error> {
        Ok(Self {
            topic: topic.to_string(),
            payload: serde_json::to_value(record)?,
        })
    }
}

/// Delivery acknowledgement; `sequence` counts messages per publisher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    pub sequence: u64,
}

/// At-least-once handoff to the outbound queue.
///
/// Implementations do not retry. A failed publish is returned to the worker,
/// which treats it as fatal for the unit.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, topic: &str, record: &Record) -> Result<Ack, Error>;
}

/// Publishes into an in-process bounded channel.
#[derive(Debug)]
pub struct ChannelPublisher {
    sender: mpsc::Sender<QueueMessage>,
    sequence: AtomicU64,
}

impl ChannelPublisher {
    pub fn new(sender: mpsc::Sender<QueueMessage>) -> Self {
        Self {
            sender,
            sequence: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl Publisher for ChannelPublisher {
    async fn publish(&self, topic: &str, record: &Record) -> Result<Ack, Error> {
        let message = QueueMessage::new(topic, record)?;
        self.sender
            .send(message)
            .await
            .map_err(|_| Error::Publish {
                topic: topic.to_string(),
                reason: "queue receiver dropped".into(),
            })?;
        Ok(Ack {
            sequence: self.sequence.fetch_add(1, Ordering::Relaxed),
        })
    }
}

/// Writes one JSON message per line, flushing after each.
pub struct JsonLinesPublisher<W> {
    writer: Mutex<W>,
    sequence: AtomicU64,
}

impl<W: AsyncWrite + Unpin + Send> JsonLinesPublisher<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> Publisher for JsonLinesPublisher<W> {
    async fn publish(&self, topic: &str, record: &Record) -> Result<Ack, Error> {
        let mut line = serde_json::to_vec(&QueueMessage::new(topic, record)?)?;
        line.push(b'\n');

        let publish_err = |e: std::io::Error| Error::Publish {
            topic: topic.to_string(),
            reason: e.to_string(),
        };

        let mut writer = self.writer.lock().await;
        writer.write_all(&line).await.map_err(publish_err)?;
        writer.flush().await.map_err(publish_err)?;

        Ok(Ack {
            sequence: self.sequence.fetch_add(1, Ordering::Relaxed),
        })
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use super::*;
    use crate::protocols::Protocol;
    use crate::types::DecoratedTransfer;

    fn batch() -> Record {
        Record::Transfers(TransferBatch {
            transfers: vec![DecoratedTransfer {
                signature: "sig".to_string(),
                sender: "a".to_string(),
                receiver: "b".to_string(),
                token_mint: "m".to_string(),
                base_token: None,
                amount: 7,
                protocol: Protocol::Raydium,
            }],
        })
    }

    #[tokio::test]
    async fn channel_publisher_counts_messages() {
        let (tx, mut rx) = mpsc::channel(4);
        let publisher = ChannelPublisher::new(tx);

        let first = publisher
            .publish(TOPIC_SOLANA_BUFFERED_TRANSFERS, &batch())
            .await
            .unwrap();
        let second = publisher
            .publish(TOPIC_SOLANA_BUFFERED_TRANSFERS, &batch())
            .await
            .unwrap();
        assert_eq!(first.sequence, 0);
        assert_eq!(second.sequence, 1);

        let message = rx.recv().await.unwrap();
        assert_eq!(message.topic, TOPIC_SOLANA_BUFFERED_TRANSFERS);
        assert_eq!(message.payload["transfers"][0]["protocol"], "raydium");
        assert_eq!(message.payload["transfers"][0]["amount"], 7);
    }

    #[tokio::test]
    async fn closed_channel_is_a_publish_error() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let publisher = ChannelPublisher::new(tx);
        let err = publisher.publish("t", &batch()).await.unwrap_err();
        assert!(matches!(err, Error::Publish { .. }));
        assert!(!err.is_decode_fault());
    }

    #[tokio::test]
    async fn json_lines_are_newline_delimited() {
        let publisher = JsonLinesPublisher::new(Vec::new());
        publisher.publish("a", &batch()).await.unwrap();
        publisher.publish("b", &batch()).await.unwrap();

        let out = String::from_utf8(publisher.into_inner()).unwrap();
        let topics: Vec<String> = out
            .lines()
            .map(|l| serde_json::from_str::<QueueMessage>(l).unwrap().topic)
            .collect();
        assert_eq!(topics, vec!["a", "b"]);
    }

    #[test]
    fn default_topics() {
        assert_eq!(batch().default_topic(), TOPIC_SOLANA_BUFFERED_TRANSFERS);
    }
}
