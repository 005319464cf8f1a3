#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::dbg_macro,
        clippy::print_stdout,
        clippy::print_stderr,
        clippy::panic,
    )
)]

pub mod config;
pub mod error;
pub mod evm;
pub mod logging;
pub mod protocols;
pub mod publish;
pub mod transfers;
pub mod types;
pub mod worker;

pub use config::{EnvConfig, TransfersConfig, WinnersConfig};
pub use error::Error;
pub use evm::WinnerTracker;
pub use evm::signature::{EventSignatureHash, MatchOutcome, REWARD_EVENT_SIGNATURE, SkipReason};
pub use protocols::{ProgramTable, Protocol};
pub use publish::{
    Ack, ChannelPublisher, JsonLinesPublisher, Publisher, QueueMessage, Record,
    TOPIC_SOLANA_BUFFERED_TRANSFERS, TOPIC_WINNERS_ETHEREUM,
};
pub use transfers::aggregate;
pub use transfers::decorators::{DecorateContext, TransferDecorator, decorator_for};
pub use transfers::router::{ProtocolRouter, Route};
pub use types::{
    BufferedBlock, DecoratedTransfer, ParsedInstruction, RawLog, SolanaBufferedTransaction,
    TokenBalance, TokenDetails, TransferBatch, Winner,
};
