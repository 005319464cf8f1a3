use crate::error::Error;
use crate::protocols::{
    Protocol, SwapAccounts, SwapAmounts, account_at, decode_instruction_data, read_u64_le,
};
use crate::transfers::decorators::{DecorateContext, TransferDecorator};
use crate::types::{DecoratedTransfer, ParsedInstruction, SolanaBufferedTransaction};

/// Swaps without the target-orders account.
const MIN_SWAP_ACCOUNTS: usize = 17;
const AMM_AUTHORITY_INDEX: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaydiumInstruction {
    /// Exact input: `{amount_in, minimum_amount_out}`.
    SwapBaseIn(SwapAmounts),
    /// Exact output: `{max_amount_in, amount_out}`.
    SwapBaseOut { max_amount_in: u64, amount_out: u64 },
    /// Pool administration, liquidity and market migration.
    Other(u8),
}

impl RaydiumInstruction {
    /// Upper bound of what the user pays in.
    pub fn input_amount(self) -> Option<u64> {
        match self {
            Self::SwapBaseIn(amounts) => Some(amounts.amount_in),
            Self::SwapBaseOut { max_amount_in, .. } => Some(max_amount_in),
            Self::Other(_) => None,
        }
    }
}

pub fn parse_instruction(data: &[u8]) -> Result<RaydiumInstruction, Error> {
    let (&tag, _) = data.split_first().ok_or_else(|| Error::Protocol {
        reason: "empty Raydium instruction data".into(),
    })?;

    match tag {
        9 => Ok(RaydiumInstruction::SwapBaseIn(SwapAmounts {
            amount_in: read_u64_le(data, 1, "Raydium amount_in")?,
            minimum_amount_out: read_u64_le(data, 9, "Raydium minimum_amount_out")?,
        })),
        11 => Ok(RaydiumInstruction::SwapBaseOut {
            max_amount_in: read_u64_le(data, 1, "Raydium max_amount_in")?,
            amount_out: read_u64_le(data, 9, "Raydium amount_out")?,
        }),
        0..=8 | 10 | 12..=15 => Ok(RaydiumInstruction::Other(tag)),
        _ => Err(Error::Protocol {
            reason: format!("unknown Raydium instruction tag {tag}"),
        }),
    }
}

/// The user accounts are always the last three keys, whether or not the
/// optional target-orders account is present.
///
/// Instruction data does not carry the swap direction, so the vault paid
/// into may be either the coin or the pc vault. The mint must come from the
/// user's source account alone.
pub fn extract_swap_accounts(accounts: &[String]) -> Result<SwapAccounts<'_>, Error> {
    let len = accounts.len();
    if len < MIN_SWAP_ACCOUNTS {
        return Err(Error::Protocol {
            reason: format!(
                "Raydium swap needs at least {MIN_SWAP_ACCOUNTS} accounts, got {len}"
            ),
        });
    }

    Ok(SwapAccounts {
        pool_authority: account_at(
            accounts,
            AMM_AUTHORITY_INDEX,
            Protocol::Raydium,
            "amm_authority",
        )?,
        user_source: account_at(accounts, len - 3, Protocol::Raydium, "user_source")?,
        user_authority: account_at(accounts, len - 1, Protocol::Raydium, "user_owner")?,
        pool_source: None,
    })
}

#[derive(Debug)]
pub struct RaydiumDecorator;

impl TransferDecorator for RaydiumDecorator {
    fn protocol(&self) -> Protocol {
        Protocol::Raydium
    }

    fn decorate_instruction(
        &self,
        tx: &SolanaBufferedTransaction,
        ix: &ParsedInstruction,
        ctx: &DecorateContext,
    ) -> Result<Option<DecoratedTransfer>, Error> {
        let data = decode_instruction_data(&ix.data)?;
        let Some(amount) = parse_instruction(&data)?.input_amount() else {
            return Ok(None);
        };
        let accounts = extract_swap_accounts(&ix.accounts)?;
        ctx.swap_transfer(tx, Protocol::Raydium, &accounts, amount)
            .map(Some)
    }
}
