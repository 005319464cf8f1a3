//! Event signature hashing and log filtering.
//!
//! topic[0] of a non-anonymous EVM event is the keccak256 hash of its
//! canonical signature, e.g. `keccak256("Reward(address,uint256)")`.

use std::fmt;

use tiny_keccak::{Hasher, Keccak};

use crate::types::RawLog;

pub const REWARD_EVENT_SIGNATURE: &str = "Reward(address,uint256)";

/// Signature topic plus the two indexed parameters of `Reward`.
pub const REWARD_TOPIC_COUNT: usize = 3;

/// `0x`-prefixed lowercase keccak256 of an event signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSignatureHash(String);

impl EventSignatureHash {
    pub fn of(signature: &str) -> Self {
        let mut hasher = Keccak::v256();
        let mut output = [0u8; 32];
        hasher.update(signature.as_bytes());
        hasher.finalize(&mut output);
        Self(format!("0x{}", hex::encode(output)))
    }

    pub fn as_hex(&self) -> &str {
        &self.0
    }

    pub fn matches_topic(&self, topic: &str) -> bool {
        self.0.eq_ignore_ascii_case(topic)
    }
}

impl fmt::Display for EventSignatureHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum SkipReason {
    AddressMismatch,
    TopicCount { found: usize },
    SignatureMismatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    Matched,
    Skipped(SkipReason),
}

impl MatchOutcome {
    pub fn is_match(self) -> bool {
        self == Self::Matched
    }
}

/// Checks a log against the watched contract and event.
///
/// Address comparison is case-insensitive. The topic count is checked before
/// topic[0] is read, so short logs never index out of bounds. None of the
/// outcomes is an error: unrelated logs are the common case.
pub fn matches(
    log: &RawLog,
    target_address: &str,
    expected_hash: &EventSignatureHash,
) -> MatchOutcome {
    let log_address = log.address.to_ascii_lowercase();

    tracing::trace!(
        log_address,
        target_address,
        tx_hash = %log.transaction_hash,
        "checking log"
    );

    if !log_address.eq_ignore_ascii_case(target_address) {
        return MatchOutcome::Skipped(SkipReason::AddressMismatch);
    }

    let found = log.topics.len();
    if found != REWARD_TOPIC_COUNT {
        tracing::debug!(
            tx_hash = %log.transaction_hash,
            expected = REWARD_TOPIC_COUNT,
            found,
            topics = ?log.topics,
            "unexpected topic count"
        );
        return MatchOutcome::Skipped(SkipReason::TopicCount { found });
    }

    if !expected_hash.matches_topic(&log.topics[0]) {
        tracing::debug!(
            tx_hash = %log.transaction_hash,
            topic = %log.topics[0],
            expected = %expected_hash,
            "topic 0 is not the watched event"
        );
        return MatchOutcome::Skipped(SkipReason::SignatureMismatch);
    }

    MatchOutcome::Matched
}
