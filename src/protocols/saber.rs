use crate::error::Error;
use crate::protocols::{
    Protocol, SwapAccounts, SwapAmounts, account_at, decode_instruction_data, read_u64_le,
};
use crate::transfers::decorators::{DecorateContext, TransferDecorator};
use crate::types::{DecoratedTransfer, ParsedInstruction, SolanaBufferedTransaction};

const SWAP_ACCOUNT_COUNT: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaberInstruction {
    Initialize,
    Swap(SwapAmounts),
    Deposit,
    Withdraw,
    WithdrawOne,
    /// Ramp, pause, fee and admin-key updates (tags 100..=107).
    Admin(u8),
}

pub fn parse_instruction(data: &[u8]) -> Result<SaberInstruction, Error> {
    let (&tag, _) = data.split_first().ok_or_else(|| Error::Protocol {
        reason: "empty Saber instruction data".into(),
    })?;

    match tag {
        0 => Ok(SaberInstruction::Initialize),
        1 => Ok(SaberInstruction::Swap(SwapAmounts {
            amount_in: read_u64_le(data, 1, "Saber swap amount_in")?,
            minimum_amount_out: read_u64_le(data, 9, "Saber swap minimum_amount_out")?,
        })),
        2 => Ok(SaberInstruction::Deposit),
        3 => Ok(SaberInstruction::Withdraw),
        4 => Ok(SaberInstruction::WithdrawOne),
        100..=107 => Ok(SaberInstruction::Admin(tag)),
        _ => Err(Error::Protocol {
            reason: format!("unknown Saber instruction tag {tag}"),
        }),
    }
}

/// `[swap, swap_authority, user_authority, user_source, swap_source,
/// swap_destination, user_destination, admin_destination, token_program]`
pub fn extract_swap_accounts(accounts: &[String]) -> Result<SwapAccounts<'_>, Error> {
    if accounts.len() < SWAP_ACCOUNT_COUNT {
        return Err(Error::Protocol {
            reason: format!(
                "Saber swap needs {SWAP_ACCOUNT_COUNT} accounts, got {}",
                accounts.len()
            ),
        });
    }

    Ok(SwapAccounts {
        pool_authority: account_at(accounts, 1, Protocol::Saber, "swap_authority")?,
        user_authority: account_at(accounts, 2, Protocol::Saber, "user_authority")?,
        user_source: account_at(accounts, 3, Protocol::Saber, "user_source")?,
        pool_source: Some(account_at(accounts, 4, Protocol::Saber, "swap_source")?),
    })
}

#[derive(Debug)]
pub struct SaberDecorator;

impl TransferDecorator for SaberDecorator {
    fn protocol(&self) -> Protocol {
        Protocol::Saber
    }

    fn decorate_instruction(
        &self,
        tx: &SolanaBufferedTransaction,
        ix: &ParsedInstruction,
        ctx: &DecorateContext,
    ) -> Result<Option<DecoratedTransfer>, Error> {
        let data = decode_instruction_data(&ix.data)?;
        match parse_instruction(&data)? {
            SaberInstruction::Swap(amounts) => {
                let accounts = extract_swap_accounts(&ix.accounts)?;
                ctx.swap_transfer(tx, Protocol::Saber, &accounts, amounts.amount_in)
                    .map(Some)
            }
            SaberInstruction::Initialize
            | SaberInstruction::Deposit
            | SaberInstruction::Withdraw
            | SaberInstruction::WithdrawOne
            | SaberInstruction::Admin(_) => Ok(None),
        }
    }
}
