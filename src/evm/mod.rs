pub mod signature;
pub mod winner;

use chrono::{DateTime, Utc};

use crate::error::Error;
use crate::types::{RawLog, TokenDetails, Winner};
use signature::{EventSignatureHash, MatchOutcome};

/// Filter and decoder for reward logs of a single contract.
///
/// Built once at startup; every field is read-only afterwards.
#[derive(Debug, Clone)]
pub struct WinnerTracker {
    target_address: String,
    signature_hash: EventSignatureHash,
    token_details: TokenDetails,
}

impl WinnerTracker {
    pub fn new(target_address: &str, event_signature: &str, token_details: TokenDetails) -> Self {
        let signature_hash = EventSignatureHash::of(event_signature);
        tracing::debug!(%signature_hash, event_signature, "filtering for event signature");
        Self {
            target_address: target_address.to_ascii_lowercase(),
            signature_hash,
            token_details,
        }
    }

    pub fn target_address(&self) -> &str {
        &self.target_address
    }

    pub fn signature_hash(&self) -> &EventSignatureHash {
        &self.signature_hash
    }

    /// `Ok(None)` for logs that are not ours, `Err` only for matched logs
    /// that fail to decode.
    pub fn process(
        &self,
        log: &RawLog,
        received_at: DateTime<Utc>,
    ) -> Result<Option<Winner>, Error> {
        match signature::matches(log, &self.target_address, &self.signature_hash) {
            MatchOutcome::Matched => {}
            MatchOutcome::Skipped(reason) => {
                tracing::debug!(
                    tx_hash = %log.transaction_hash,
                    reason = reason.as_ref(),
                    "log skipped"
                );
                return Ok(None);
            }
        }

        let mut winner = winner::decode(log, received_at)?;
        winner.token_details = Some(self.token_details.clone());
        Ok(Some(winner))
    }
}
