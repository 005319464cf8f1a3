use std::collections::HashMap;

use serde::Deserialize;

use crate::error::Error;
use crate::evm::WinnerTracker;
use crate::evm::signature::REWARD_EVENT_SIGNATURE;
use crate::protocols::{
    ORCA_TOKEN_SWAP_PROGRAM_ID, ProgramTable, RAYDIUM_AMM_V4_PROGRAM_ID, SABER_SWAP_PROGRAM_ID,
};
use crate::transfers::decorators::DecorateContext;
use crate::transfers::router::ProtocolRouter;
use crate::types::TokenDetails;

pub const ENV_PREFIX: &str = "FLU_";
pub const DEFAULT_CHANNEL_CAPACITY: usize = 16;

/// Raw environment, every variable prefixed with `FLU_`.
///
/// Each worker only requires its own variables, so everything that has no
/// sensible default is optional here and checked by the typed builders.
#[derive(Debug, Clone, Deserialize)]
pub struct EnvConfig {
    pub ethereum_contract_addr: Option<String>,
    #[serde(default = "default_event_signature")]
    pub ethereum_event_signature: String,
    pub ethereum_underlying_token_name: Option<String>,
    pub ethereum_underlying_token_decimals: Option<String>,

    pub solana_token_lookups: Option<String>,
    #[serde(default = "default_saber_program_id")]
    pub solana_saber_swap_program_id: String,
    pub solana_saber_rpc_url: Option<String>,
    pub solana_saber_pool_mints: Option<String>,
    #[serde(default = "default_orca_program_id")]
    pub solana_orca_program_id: String,
    #[serde(default = "default_raydium_program_id")]
    pub solana_raydium_program_id: String,

    #[serde(default = "default_channel_capacity")]
    pub worker_channel_capacity: usize,
}

fn default_event_signature() -> String {
    REWARD_EVENT_SIGNATURE.to_string()
}

fn default_saber_program_id() -> String {
    SABER_SWAP_PROGRAM_ID.to_string()
}

fn default_orca_program_id() -> String {
    ORCA_TOKEN_SWAP_PROGRAM_ID.to_string()
}

fn default_raydium_program_id() -> String {
    RAYDIUM_AMM_V4_PROGRAM_ID.to_string()
}

fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

impl EnvConfig {
    /// Reads the process environment, after loading `.env` if present.
    pub fn load() -> Result<Self, Error> {
        dotenvy::dotenv().ok();
        envy::prefixed(ENV_PREFIX)
            .from_env::<Self>()
            .map_err(|e| Error::Config {
                reason: e.to_string(),
            })
    }

    pub fn from_pairs<I>(pairs: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::prefixed(ENV_PREFIX)
            .from_iter(pairs)
            .map_err(|e| Error::Config {
                reason: e.to_string(),
            })
    }

    pub fn channel_capacity(&self) -> Result<usize, Error> {
        if self.worker_channel_capacity == 0 {
            return Err(Error::Config {
                reason: "FLU_WORKER_CHANNEL_CAPACITY must be at least 1".into(),
            });
        }
        Ok(self.worker_channel_capacity)
    }

    pub fn winners(&self) -> Result<WinnersConfig, Error> {
        let target_address = required(&self.ethereum_contract_addr, "ETHEREUM_CONTRACT_ADDR")?;
        validate_evm_address(target_address)?;

        let token_name = required(
            &self.ethereum_underlying_token_name,
            "ETHEREUM_UNDERLYING_TOKEN_NAME",
        )?;
        let decimals_raw = required(
            &self.ethereum_underlying_token_decimals,
            "ETHEREUM_UNDERLYING_TOKEN_DECIMALS",
        )?;
        let decimals = decimals_raw.trim().parse::<u8>().map_err(|e| Error::Config {
            reason: format!("underlying token decimals {decimals_raw:?} is a malformed int: {e}"),
        })?;

        Ok(WinnersConfig {
            target_address: target_address.to_ascii_lowercase(),
            event_signature: self.ethereum_event_signature.clone(),
            token_details: TokenDetails::new(token_name, decimals),
        })
    }

    pub fn transfers(&self) -> Result<TransfersConfig, Error> {
        let lookups = required(&self.solana_token_lookups, "SOLANA_TOKEN_LOOKUPS")?;
        let token_lookups = parse_pairs(lookups, "fluid:base")?;
        let pool_mints = match &self.solana_saber_pool_mints {
            Some(raw) => parse_pairs(raw, "vault:mint")?,
            None => HashMap::new(),
        };
        let programs = ProgramTable::new(
            &self.solana_saber_swap_program_id,
            &self.solana_orca_program_id,
            &self.solana_raydium_program_id,
        )?;

        Ok(TransfersConfig {
            programs,
            token_lookups,
            pool_mints,
            saber_rpc_url: self.solana_saber_rpc_url.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinnersConfig {
    pub target_address: String,
    pub event_signature: String,
    pub token_details: TokenDetails,
}

impl WinnersConfig {
    pub fn tracker(&self) -> WinnerTracker {
        WinnerTracker::new(
            &self.target_address,
            &self.event_signature,
            self.token_details.clone(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct TransfersConfig {
    pub programs: ProgramTable,
    pub token_lookups: HashMap<String, String>,
    pub pool_mints: HashMap<String, String>,
    /// Registry endpoint the external loader fetches `pool_mints` from.
    pub saber_rpc_url: Option<String>,
}

impl TransfersConfig {
    pub fn router(&self) -> ProtocolRouter {
        ProtocolRouter::new(self.programs.clone())
    }

    pub fn decorate_context(&self) -> DecorateContext {
        DecorateContext {
            token_lookups: self.token_lookups.clone(),
            pool_mints: self.pool_mints.clone(),
        }
    }
}

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, Error> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::Config {
            reason: format!("{ENV_PREFIX}{name} is not set"),
        })
}

fn validate_evm_address(address: &str) -> Result<(), Error> {
    let digits = address.strip_prefix("0x").unwrap_or_default();
    if digits.len() == 40 && digits.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(())
    } else {
        Err(Error::Config {
            reason: format!("contract address {address:?} is not a 0x-prefixed 20 byte hex string"),
        })
    }
}

/// Parses `a:b,c:d` into a map. An empty string is an empty map.
pub fn parse_pairs(raw: &str, shape: &str) -> Result<HashMap<String, String>, Error> {
    let mut out = HashMap::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let parts: Vec<&str> = entry.split(':').map(str::trim).collect();
        let [left, right] = parts.as_slice() else {
            return Err(Error::Config {
                reason: format!("unexpected format, expected {shape}, got {entry:?}"),
            });
        };
        if left.is_empty() || right.is_empty() {
            return Err(Error::Config {
                reason: format!("unexpected format, expected {shape}, got {entry:?}"),
            });
        }
        out.insert((*left).to_string(), (*right).to_string());
    }
    Ok(out)
}
