//! Consumer loops.
//!
//! Each loop owns the receiving half of a bounded channel and handles one
//! unit at a time: decode, aggregate, publish, then receive the next. A
//! slow queue therefore stalls the producer once the channel fills up.
//! Any decode fault or publish failure ends the loop with that error; the
//! caller decides to exit.

use chrono::Utc;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;

use crate::error::Error;
use crate::evm::WinnerTracker;
use crate::publish::{Publisher, Record, TOPIC_SOLANA_BUFFERED_TRANSFERS, TOPIC_WINNERS_ETHEREUM};
use crate::transfers::aggregate;
use crate::transfers::decorators::DecorateContext;
use crate::transfers::router::ProtocolRouter;
use crate::types::{BufferedBlock, RawLog};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub received: u64,
    pub published: u64,
    pub skipped: u64,
}

pub async fn run_winners<P>(
    mut inbound: mpsc::Receiver<RawLog>,
    tracker: &WinnerTracker,
    publisher: &P,
) -> Result<WorkerStats, Error>
where
    P: Publisher + ?Sized,
{
    let mut stats = WorkerStats::default();

    while let Some(log) = inbound.recv().await {
        stats.received += 1;
        let received_at = Utc::now();

        let winner = match tracker.process(&log, received_at) {
            Ok(Some(winner)) => winner,
            Ok(None) => {
                stats.skipped += 1;
                continue;
            }
            Err(e) => {
                tracing::error!(
                    tx_hash = %log.transaction_hash,
                    log = ?log,
                    error = %e,
                    "failed to decode a winner"
                );
                return Err(e);
            }
        };

        tracing::info!(
            tx_hash = %winner.transaction_hash,
            winner = %winner.winner_address,
            amount = %winner.winning_amount,
            "publishing winner"
        );

        publisher
            .publish(TOPIC_WINNERS_ETHEREUM, &Record::Winner(winner))
            .await
            .inspect_err(|e| tracing::error!(error = %e, "failed to publish winner"))?;
        stats.published += 1;
    }

    tracing::info!(?stats, "winners inbound closed");
    Ok(stats)
}

pub async fn run_transfers<P>(
    mut inbound: mpsc::Receiver<BufferedBlock>,
    router: &ProtocolRouter,
    ctx: &DecorateContext,
    publisher: &P,
) -> Result<WorkerStats, Error>
where
    P: Publisher + ?Sized,
{
    let mut stats = WorkerStats::default();

    while let Some(block) = inbound.recv().await {
        stats.received += 1;

        let batch = aggregate(&block, router, ctx).inspect_err(|e| {
            tracing::error!(
                block = stats.received,
                transactions = block.transactions.len(),
                error = %e,
                "failed to parse a buffered block"
            );
        })?;

        tracing::info!(
            transactions = block.transactions.len(),
            transfers = batch.len(),
            "publishing buffered transfers"
        );

        publisher
            .publish(TOPIC_SOLANA_BUFFERED_TRANSFERS, &Record::Transfers(batch))
            .await
            .inspect_err(|e| tracing::error!(error = %e, "failed to publish transfers"))?;
        stats.published += 1;
    }

    tracing::info!(?stats, "transfers inbound closed");
    Ok(stats)
}

/// Parses newline-delimited JSON into `outbound` until EOF.
///
/// Blank lines are ignored. A line that fails to parse is fatal. Returns
/// the number of units sent; stops early if the consumer has gone away.
pub async fn feed_json_lines<R, T>(reader: R, outbound: mpsc::Sender<T>) -> Result<u64, Error>
where
    R: AsyncBufRead + Unpin,
    T: DeserializeOwned,
{
    let mut lines = reader.lines();
    let mut sent = 0;

    while let Some(line) = lines.next_line().await.map_err(|e| Error::Decode {
        reason: format!("failed to read inbound line: {e}"),
    })? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let unit: T = serde_json::from_str(line).inspect_err(|e| {
            tracing::error!(line = sent + 1, error = %e, payload = line, "malformed inbound message");
        })?;

        if outbound.send(unit).await.is_err() {
            tracing::warn!(sent, "consumer stopped, no longer reading input");
            break;
        }
        sent += 1;
    }

    Ok(sent)
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use super::*;
    use crate::evm::signature::{EventSignatureHash, REWARD_EVENT_SIGNATURE};
    use crate::publish::{Ack, ChannelPublisher};
    use crate::types::TokenDetails;
    use async_trait::async_trait;

    const TARGET: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

    struct FailingPublisher;

    #[async_trait]
    impl Publisher for FailingPublisher {
        async fn publish(&self, topic: &str, _record: &Record) -> Result<Ack, Error> {
            Err(Error::Publish {
                topic: topic.to_string(),
                reason: "broker unavailable".into(),
            })
        }
    }

    fn tracker() -> WinnerTracker {
        WinnerTracker::new(TARGET, REWARD_EVENT_SIGNATURE, TokenDetails::new("fUSDC", 6))
    }

    fn log(address: &str, amount_word: String) -> RawLog {
        RawLog {
            address: address.to_string(),
            topics: vec![
                EventSignatureHash::of(REWARD_EVENT_SIGNATURE).to_string(),
                format!("0x{:064x}", 1),
                amount_word,
            ],
            data: "0x".to_string(),
            block_number: "0x1".to_string(),
            transaction_hash: "0xaa".to_string(),
            transaction_index: "0x0".to_string(),
            block_hash: "0x0".to_string(),
            log_index: "0x0".to_string(),
            removed: false,
        }
    }

    #[tokio::test]
    async fn winners_loop_publishes_matches_and_skips_the_rest() {
        let (log_tx, log_rx) = mpsc::channel(4);
        let (queue_tx, mut queue_rx) = mpsc::channel(4);
        let publisher = ChannelPublisher::new(queue_tx);

        log_tx.send(log(TARGET, format!("0x{:064x}", 5))).await.unwrap();
        log_tx
            .send(log(
                "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb",
                format!("0x{:064x}", 6),
            ))
            .await
            .unwrap();
        drop(log_tx);

        let stats = run_winners(log_rx, &tracker(), &publisher).await.unwrap();
        assert_eq!(
            stats,
            WorkerStats {
                received: 2,
                published: 1,
                skipped: 1
            }
        );

        let message = queue_rx.recv().await.unwrap();
        assert_eq!(message.topic, TOPIC_WINNERS_ETHEREUM);
        assert_eq!(message.payload["transaction_hash"], "0xaa");
        assert_eq!(message.payload["token_details"]["token_short_name"], "fUSDC");
        assert!(queue_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn winners_loop_stops_on_decode_fault() {
        let (log_tx, log_rx) = mpsc::channel(4);
        let (queue_tx, mut queue_rx) = mpsc::channel(4);
        let publisher = ChannelPublisher::new(queue_tx);

        log_tx.send(log(TARGET, "0xzz".to_string())).await.unwrap();
        log_tx.send(log(TARGET, format!("0x{:064x}", 5))).await.unwrap();
        drop(log_tx);

        let err = run_winners(log_rx, &tracker(), &publisher).await.unwrap_err();
        assert!(err.is_decode_fault());
        assert!(queue_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn publish_failure_is_fatal() {
        let (log_tx, log_rx) = mpsc::channel(1);
        log_tx.send(log(TARGET, format!("0x{:064x}", 5))).await.unwrap();
        drop(log_tx);

        let err = run_winners(log_rx, &tracker(), &FailingPublisher)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Publish { .. }));
    }

    #[tokio::test]
    async fn transfers_loop_publishes_one_batch_per_block() {
        let (block_tx, block_rx) = mpsc::channel(2);
        let (queue_tx, mut queue_rx) = mpsc::channel(4);
        let publisher = ChannelPublisher::new(queue_tx);

        block_tx.send(BufferedBlock::default()).await.unwrap();
        block_tx.send(BufferedBlock::default()).await.unwrap();
        drop(block_tx);

        let stats = run_transfers(
            block_rx,
            &ProtocolRouter::default(),
            &DecorateContext::default(),
            &publisher,
        )
        .await
        .unwrap();
        assert_eq!(stats.published, 2);

        let message = queue_rx.recv().await.unwrap();
        assert_eq!(message.topic, TOPIC_SOLANA_BUFFERED_TRANSFERS);
        assert_eq!(message.payload["transfers"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn feeder_skips_blank_lines_and_rejects_garbage() {
        let (tx, mut rx) = mpsc::channel::<BufferedBlock>(4);
        let input: &[u8] = b"{\"transactions\":[]}\n\n{}\n";
        let sent = feed_json_lines(input, tx).await.unwrap();
        assert_eq!(sent, 2);
        assert!(rx.recv().await.is_some());

        let (tx, _rx) = mpsc::channel::<BufferedBlock>(4);
        let garbage: &[u8] = b"not json\n";
        assert!(matches!(
            feed_json_lines(garbage, tx).await,
            Err(Error::Json(_))
        ));
    }
}
