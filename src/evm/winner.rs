use alloy_primitives::{Address, U256};
use chrono::{DateTime, Utc};

use crate::error::Error;
use crate::evm::signature::REWARD_TOPIC_COUNT;
use crate::types::{RawLog, Winner};

const WORD_BYTES: usize = 32;
const ADDRESS_BYTES: usize = 20;

/// Parses a `0x`-prefixed 32-byte topic word.
pub fn decode_word(field: &'static str, word: &str) -> Result<[u8; WORD_BYTES], Error> {
    let digits = word.strip_prefix("0x").ok_or_else(|| Error::Hex {
        field,
        reason: format!("missing 0x prefix in {word:?}"),
    })?;

    if digits.len() != WORD_BYTES * 2 {
        return Err(Error::Hex {
            field,
            reason: format!(
                "expected {} hex characters, got {}",
                WORD_BYTES * 2,
                digits.len()
            ),
        });
    }

    let mut out = [0u8; WORD_BYTES];
    hex::decode_to_slice(digits, &mut out).map_err(|e| Error::Hex {
        field,
        reason: e.to_string(),
    })?;
    Ok(out)
}

/// The low 20 bytes of a padded word. The padding is not inspected.
pub fn word_to_address(word: &[u8; WORD_BYTES]) -> Address {
    Address::from_slice(&word[WORD_BYTES - ADDRESS_BYTES..])
}

pub fn word_to_amount(word: &[u8; WORD_BYTES]) -> U256 {
    U256::from_be_bytes(*word)
}

/// Decodes a `Reward(address indexed winner, uint256 indexed amount)` log.
///
/// The log must already have passed [`crate::evm::signature::matches`];
/// anything malformed from here on is a decode fault. Token details are
/// left for the caller to attach.
pub fn decode(log: &RawLog, received_at: DateTime<Utc>) -> Result<Winner, Error> {
    if log.topics.len() != REWARD_TOPIC_COUNT {
        return Err(Error::Decode {
            reason: format!(
                "reward log {} has {} topics, expected {REWARD_TOPIC_COUNT}",
                log.transaction_hash,
                log.topics.len()
            ),
        });
    }

    let winner_word = decode_word("winner address", &log.topics[1])?;
    let amount_word = decode_word("winning amount", &log.topics[2])?;

    Ok(Winner {
        contract_address: log.address.to_ascii_lowercase(),
        transaction_hash: log.transaction_hash.clone(),
        winner_address: word_to_address(&winner_word),
        winning_amount: word_to_amount(&amount_word),
        awarded_time: received_at,
        token_details: None,
    })
}
