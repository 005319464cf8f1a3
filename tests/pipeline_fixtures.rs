#![expect(
    clippy::unwrap_used,
    clippy::panic,
    reason = "test code uses unwrap/panic for concise assertions"
)]

use alloy_primitives::{Address, U256};
use chrono::{TimeZone, Utc};
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;

use fluid_tracker::worker::{run_transfers, run_winners};
use fluid_tracker::{
    BufferedBlock, ChannelPublisher, DecorateContext, EnvConfig, Error, ProgramTable, Protocol,
    ProtocolRouter, REWARD_EVENT_SIGNATURE, RawLog, Route, TOPIC_SOLANA_BUFFERED_TRANSFERS,
    TOPIC_WINNERS_ETHEREUM, TokenDetails, WinnerTracker, aggregate,
};

const TARGET: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
const FLUID_MINT: &str = "EWn7dE93GeQJu72WEkEmC5MZpm5FhiJzkcJEf1xpRdWP";
const USDC_MINT: &str = "EahQmXc3rwhY3CH1g3ZgUx8L4vHTNmzpK1xtiQ1RAxq6";

fn load<T: DeserializeOwned>(filename: &str) -> T {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    let path = format!("{manifest_dir}/tests/fixtures/{filename}");
    let data =
        std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("failed to read {path}: {e}"));
    serde_json::from_str(&data).unwrap_or_else(|e| panic!("failed to parse {path}: {e}"))
}

fn tracker(target: &str) -> WinnerTracker {
    WinnerTracker::new(target, REWARD_EVENT_SIGNATURE, TokenDetails::new("fUSDC", 6))
}

fn context() -> DecorateContext {
    let mut ctx = DecorateContext::default();
    ctx.token_lookups
        .insert(FLUID_MINT.to_string(), USDC_MINT.to_string());
    ctx
}

// ──────────────────── winners ────────────────────

#[test]
fn reward_log_for_target_yields_winner() {
    let logs: Vec<RawLog> = load("reward_logs.json");
    let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

    let winner = tracker(TARGET).process(&logs[0], at).unwrap().unwrap();
    assert_eq!(winner.winner_address, Address::with_last_byte(1));
    assert_eq!(winner.winning_amount, U256::from(100));
    assert_eq!(winner.transaction_hash, logs[0].transaction_hash);
    assert_eq!(winner.contract_address, TARGET);
    assert_eq!(winner.awarded_time, at);
    assert_eq!(
        winner.token_details,
        Some(TokenDetails::new("fUSDC", 6))
    );
}

#[test]
fn reward_log_for_other_contract_is_ignored() {
    let logs: Vec<RawLog> = load("reward_logs.json");
    let other = tracker("0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb");
    assert!(other.process(&logs[0], Utc::now()).unwrap().is_none());
}

#[test]
fn non_reward_logs_are_skipped_without_error() {
    let logs: Vec<RawLog> = load("reward_logs.json");
    let tracker = tracker(TARGET);

    // other emitter, two topics, Transfer signature
    for log in &logs[1..4] {
        assert!(
            tracker.process(log, Utc::now()).unwrap().is_none(),
            "expected skip for {}",
            log.transaction_hash
        );
    }
}

#[test]
fn uppercase_topic_and_dirty_padding_still_decode() {
    let logs: Vec<RawLog> = load("reward_logs.json");
    let winner = tracker(TARGET)
        .process(&logs[4], Utc::now())
        .unwrap()
        .unwrap();

    assert_eq!(winner.winner_address, Address::repeat_byte(0xcd));
    let expected = (U256::from(1) << 255) + U256::from(7);
    assert_eq!(winner.winning_amount, expected);
}

#[tokio::test]
async fn winners_worker_publishes_only_matches() {
    let logs: Vec<RawLog> = load("reward_logs.json");
    let (log_tx, log_rx) = mpsc::channel(2);
    let (queue_tx, mut queue_rx) = mpsc::channel(8);
    let publisher = ChannelPublisher::new(queue_tx);

    let feed = tokio::spawn(async move {
        for log in logs {
            log_tx.send(log).await.unwrap();
        }
    });

    let stats = run_winners(log_rx, &tracker(TARGET), &publisher)
        .await
        .unwrap();
    feed.await.unwrap();

    assert_eq!(stats.received, 5);
    assert_eq!(stats.published, 2);
    assert_eq!(stats.skipped, 3);

    let first = queue_rx.recv().await.unwrap();
    assert_eq!(first.topic, TOPIC_WINNERS_ETHEREUM);
    assert_eq!(first.payload["contract_address"], TARGET);
}

// ──────────────────── transfers ────────────────────

#[test]
fn buffered_block_routes_each_transaction() {
    let block: BufferedBlock = load("buffered_block.json");
    let router = ProtocolRouter::default();

    let routes: Vec<Route> = block.transactions.iter().map(|tx| router.route(tx)).collect();
    assert_eq!(
        routes,
        vec![
            Route::Decorate(Protocol::Saber),
            Route::NoDecorator,
            Route::Decorate(Protocol::Orca),
            Route::Decorate(Protocol::Raydium),
        ]
    );
}

#[test]
fn buffered_block_aggregates_in_order() {
    let block: BufferedBlock = load("buffered_block.json");
    let batch = aggregate(&block, &ProtocolRouter::default(), &context()).unwrap();

    let summary: Vec<(&str, Protocol, u64)> = batch
        .transfers
        .iter()
        .map(|t| (t.signature.as_str(), t.protocol, t.amount))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("t1sig", Protocol::Saber, 1500),
            ("t3sig", Protocol::Orca, 250),
            ("t4sig", Protocol::Raydium, 777),
        ]
    );

    let saber = &batch.transfers[0];
    assert_eq!(saber.sender, "p2Yicb86aZig616Eav2VWG9vuXR5mEqhtzshZYBxzsV");
    assert_eq!(saber.receiver, "k7FaK87WHGVXzkaoHb7CdVPgkKDQhZ29VLDeBVbDfYn");
    assert_eq!(saber.token_mint, FLUID_MINT);
    assert_eq!(saber.base_token.as_deref(), Some(USDC_MINT));

    let orca = &batch.transfers[1];
    assert_eq!(orca.sender, "3AQTaduKvYWFTu1ExZSQK1hQp5jSZ2yEt4KzsASAufKd");
    assert_eq!(orca.receiver, "36VASLSKLFD2KokjXG7V28veZvXEsyHRKefLonPaAKzv");
    assert_eq!(orca.token_mint, USDC_MINT);
    assert_eq!(orca.base_token, None);

    let raydium = &batch.transfers[2];
    assert_eq!(raydium.sender, "5XZobBCgcyuBM4m1E1rZVei7Me6V8FzwSLexuU194KcN");
    assert_eq!(raydium.receiver, "4WnNSfDXkWSnFi1PgXxn8X8fhFwU2Jhe4Df82mL9rKmm");
    assert_eq!(raydium.base_token.as_deref(), Some(USDC_MINT));
}

#[test]
fn unknown_tag_on_watched_program_is_fatal() {
    let block: BufferedBlock = load("buffered_block_malformed.json");
    let err = aggregate(&block, &ProtocolRouter::default(), &context()).unwrap_err();

    assert!(err.is_decode_fault());
    assert!(matches!(err, Error::Protocol { .. }));
    assert!(err.to_string().contains("t6sig"));
}

#[test]
fn non_swap_instruction_contributes_nothing() {
    let mut block: BufferedBlock = load("buffered_block_malformed.json");
    block.transactions.truncate(1);
    let batch = aggregate(&block, &ProtocolRouter::default(), &context()).unwrap();
    assert!(batch.is_empty());
}

#[test]
fn reconfigured_program_ids_change_routing() {
    let block: BufferedBlock = load("buffered_block.json");
    // t2's program becomes the Orca program; the real Orca id is no longer watched
    let programs = ProgramTable::new(
        fluid_tracker::protocols::SABER_SWAP_PROGRAM_ID,
        &block.transactions[1].instructions[0].program_id,
        fluid_tracker::protocols::RAYDIUM_AMM_V4_PROGRAM_ID,
    )
    .unwrap();
    let router = ProtocolRouter::new(programs);

    assert_eq!(router.route(&block.transactions[1]), Route::Decorate(Protocol::Orca));
    assert_eq!(router.route(&block.transactions[2]), Route::NoDecorator);

    // t2 becomes an Orca swap; the context carries no program table of its own
    let mut t2 = block.transactions[1].clone();
    t2.instructions[0].accounts = block.transactions[2].instructions[0].accounts.clone();
    t2.instructions[0].data = block.transactions[2].instructions[0].data.clone();
    t2.token_balances = block.transactions[2].token_balances.clone();
    let reconfigured = BufferedBlock {
        transactions: vec![t2, block.transactions[2].clone()],
    };

    let batch = aggregate(&reconfigured, &router, &context()).unwrap();
    assert_eq!(batch.len(), 1);
    assert_eq!(batch.transfers[0].signature, "t2sig");
    assert_eq!(batch.transfers[0].protocol, Protocol::Orca);
    assert_eq!(batch.transfers[0].amount, 250);
}

#[tokio::test]
async fn transfers_worker_publishes_batch_from_env_config() {
    let env = EnvConfig::from_pairs([(
        "FLU_SOLANA_TOKEN_LOOKUPS".to_string(),
        format!("{FLUID_MINT}:{USDC_MINT}"),
    )])
    .unwrap();
    let transfers = env.transfers().unwrap();

    let (block_tx, block_rx) = mpsc::channel(1);
    let (queue_tx, mut queue_rx) = mpsc::channel(2);
    let publisher = ChannelPublisher::new(queue_tx);

    block_tx
        .send(load::<BufferedBlock>("buffered_block.json"))
        .await
        .unwrap();
    drop(block_tx);

    let stats = run_transfers(
        block_rx,
        &transfers.router(),
        &transfers.decorate_context(),
        &publisher,
    )
    .await
    .unwrap();
    assert_eq!(stats.published, 1);

    let message = queue_rx.recv().await.unwrap();
    assert_eq!(message.topic, TOPIC_SOLANA_BUFFERED_TRANSFERS);
    let transfers = message.payload["transfers"].as_array().unwrap();
    assert_eq!(transfers.len(), 3);
    assert_eq!(transfers[0]["protocol"], "saber");
    assert_eq!(transfers[2]["base_token"], USDC_MINT);
}
