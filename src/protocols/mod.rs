pub mod orca;
pub mod raydium;
pub mod saber;

use std::collections::HashMap;

use serde::Serialize;

use crate::error::Error;

pub const SABER_SWAP_PROGRAM_ID: &str = "SSwpkEEcbUqx4vtoEByFjSkhKdCT862DNVb52nZg1UZ";
pub const ORCA_TOKEN_SWAP_PROGRAM_ID: &str = "9W959DqEETiGZocYWCQPaJ6sBmUzgfxXfqGeTEdp3aQP";
pub const RAYDIUM_AMM_V4_PROGRAM_ID: &str = "675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8";

const MAINNET_PROGRAMS: [(&str, Protocol); 3] = [
    (SABER_SWAP_PROGRAM_ID, Protocol::Saber),
    (ORCA_TOKEN_SWAP_PROGRAM_ID, Protocol::Orca),
    (RAYDIUM_AMM_V4_PROGRAM_ID, Protocol::Raydium),
];

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Protocol {
    Saber,
    Orca,
    Raydium,
}

/// Program identifier to protocol, exact match only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramTable {
    by_program_id: HashMap<String, Protocol>,
}

impl ProgramTable {
    pub fn new(saber: &str, orca: &str, raydium: &str) -> Result<Self, Error> {
        let mut by_program_id = HashMap::with_capacity(3);
        for (program_id, protocol) in [
            (saber, Protocol::Saber),
            (orca, Protocol::Orca),
            (raydium, Protocol::Raydium),
        ] {
            decode_pubkey(program_id, "program id").map_err(|e| Error::Config {
                reason: format!("{protocol} program id: {e}"),
            })?;
            if let Some(previous) = by_program_id.insert(program_id.to_string(), protocol) {
                return Err(Error::Config {
                    reason: format!(
                        "program id {program_id} configured for both {previous} and {protocol}"
                    ),
                });
            }
        }
        Ok(Self { by_program_id })
    }

    pub fn protocol_for(&self, program_id: &str) -> Option<Protocol> {
        self.by_program_id.get(program_id).copied()
    }
}

impl Default for ProgramTable {
    fn default() -> Self {
        let by_program_id = MAINNET_PROGRAMS
            .iter()
            .map(|&(id, protocol)| (id.to_string(), protocol))
            .collect();
        Self { by_program_id }
    }
}

/// Base58 instruction data to raw bytes.
pub fn decode_instruction_data(data: &str) -> Result<Vec<u8>, Error> {
    bs58::decode(data).into_vec().map_err(|e| Error::Protocol {
        reason: format!("instruction data is not base58: {e}"),
    })
}

/// Validates a base58 account key and returns it unchanged.
pub fn decode_pubkey<'a>(key: &'a str, what: &str) -> Result<&'a str, Error> {
    let bytes = bs58::decode(key).into_vec().map_err(|e| Error::Protocol {
        reason: format!("{what} {key:?} is not base58: {e}"),
    })?;
    if bytes.len() != 32 {
        return Err(Error::Protocol {
            reason: format!("{what} {key:?} decodes to {} bytes", bytes.len()),
        });
    }
    Ok(key)
}

pub fn read_u64_le(data: &[u8], offset: usize, what: &str) -> Result<u64, Error> {
    data.get(offset..offset + 8)
        .and_then(|b| <[u8; 8]>::try_from(b).ok())
        .map(u64::from_le_bytes)
        .ok_or_else(|| Error::Protocol {
            reason: format!(
                "{what} at offset {offset} out of bounds for {} byte instruction",
                data.len()
            ),
        })
}

pub fn account_at<'a>(
    accounts: &'a [String],
    idx: usize,
    protocol: Protocol,
    what: &str,
) -> Result<&'a str, Error> {
    let key = accounts.get(idx).ok_or_else(|| Error::Protocol {
        reason: format!(
            "{protocol} {what} index {idx} out of bounds ({} accounts)",
            accounts.len()
        ),
    })?;
    decode_pubkey(key, what)
}

/// Accounts of a swap instruction that a transfer is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapAccounts<'a> {
    pub user_authority: &'a str,
    pub user_source: &'a str,
    pub pool_authority: &'a str,
    /// Pool vault receiving the user's input, same mint as `user_source`.
    /// `None` when the layout does not say which vault that is.
    pub pool_source: Option<&'a str>,
}

/// A swap leg as read from instruction data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapAmounts {
    pub amount_in: u64,
    pub minimum_amount_out: u64,
}
