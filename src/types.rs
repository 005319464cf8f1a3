use alloy_primitives::{Address, U256};
use chrono::{DateTime, Utc};

use crate::protocols::Protocol;

/// A log object as returned by `eth_getLogs` / `eth_subscribe("logs")`.
#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLog {
    /// Emitting contract, hex encoded. Casing is whatever the node sent.
    pub address: String,
    /// Indexed topic words, `0x` followed by 64 hex characters each.
    pub topics: Vec<String>,
    /// Non-indexed payload. Not read by the winners decoder.
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub block_number: String,
    pub transaction_hash: String,
    #[serde(default)]
    pub transaction_index: String,
    #[serde(default)]
    pub block_hash: String,
    #[serde(default)]
    pub log_index: String,
    #[serde(default)]
    pub removed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct TokenDetails {
    pub token_short_name: String,
    pub token_decimals: u8,
}

impl TokenDetails {
    pub fn new(token_short_name: impl Into<String>, token_decimals: u8) -> Self {
        Self {
            token_short_name: token_short_name.into(),
            token_decimals,
        }
    }
}

/// A reward payout observed on the winners contract.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Winner {
    /// Lowercased address of the contract that emitted the reward.
    pub contract_address: String,
    pub transaction_hash: String,
    pub winner_address: Address,
    pub winning_amount: U256,
    /// Wall-clock time the log was received, not the block time.
    pub awarded_time: DateTime<Utc>,
    pub token_details: Option<TokenDetails>,
}

/// One instruction of a parsed Solana transaction, top level or CPI.
#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct ParsedInstruction {
    pub program_id: String,
    /// Account keys in instruction order (base58).
    #[serde(default)]
    pub accounts: Vec<String>,
    /// Instruction data, base58 encoded as in the RPC `json` encoding.
    #[serde(default)]
    pub data: String,
}

/// Token account metadata from the transaction's pre/post token balances.
#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct TokenBalance {
    pub account: String,
    pub mint: String,
    #[serde(default)]
    pub owner: Option<String>,
}

#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct SolanaBufferedTransaction {
    /// Upstream application index assigned by the buffering service.
    #[serde(default)]
    pub application: u32,
    pub signature: String,
    #[serde(default)]
    pub instructions: Vec<ParsedInstruction>,
    #[serde(default)]
    pub token_balances: Vec<TokenBalance>,
}

impl SolanaBufferedTransaction {
    /// Mint of a token account touched by this transaction, if known.
    pub fn mint_of(&self, account: &str) -> Option<&str> {
        self.token_balances
            .iter()
            .find(|b| b.account == account)
            .map(|b| b.mint.as_str())
    }

    /// Owner of a token account touched by this transaction, if reported.
    pub fn owner_of(&self, account: &str) -> Option<&str> {
        self.token_balances
            .iter()
            .find(|b| b.account == account)
            .and_then(|b| b.owner.as_deref())
    }
}

/// All transactions buffered for one block.
#[derive(Debug, Clone, Default, serde::Deserialize, serde::Serialize)]
pub struct BufferedBlock {
    #[serde(default)]
    pub transactions: Vec<SolanaBufferedTransaction>,
}

/// A swap input normalised into a plain token movement.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DecoratedTransfer {
    pub signature: String,
    pub sender: String,
    pub receiver: String,
    pub token_mint: String,
    /// Base token the mint wraps, when the mint is a configured fluid token.
    pub base_token: Option<String>,
    pub amount: u64,
    pub protocol: Protocol,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct TransferBatch {
    pub transfers: Vec<DecoratedTransfer>,
}

impl TransferBatch {
    pub fn len(&self) -> usize {
        self.transfers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transfers.is_empty()
    }
}
