use crate::error::Error;
use crate::protocols::{
    Protocol, SwapAccounts, SwapAmounts, account_at, decode_instruction_data, read_u64_le,
};
use crate::transfers::decorators::{DecorateContext, TransferDecorator};
use crate::types::{DecoratedTransfer, ParsedInstruction, SolanaBufferedTransaction};

/// Up to and including the token program; the host fee account is optional.
const SWAP_ACCOUNT_COUNT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrcaInstruction {
    Initialize,
    Swap(SwapAmounts),
    DepositAllTokenTypes,
    WithdrawAllTokenTypes,
    DepositSingleTokenTypeExactAmountIn,
    WithdrawSingleTokenTypeExactAmountOut,
}

pub fn parse_instruction(data: &[u8]) -> Result<OrcaInstruction, Error> {
    let (&tag, _) = data.split_first().ok_or_else(|| Error::Protocol {
        reason: "empty Orca instruction data".into(),
    })?;

    match tag {
        0 => Ok(OrcaInstruction::Initialize),
        1 => Ok(OrcaInstruction::Swap(SwapAmounts {
            amount_in: read_u64_le(data, 1, "Orca swap amount_in")?,
            minimum_amount_out: read_u64_le(data, 9, "Orca swap minimum_amount_out")?,
        })),
        2 => Ok(OrcaInstruction::DepositAllTokenTypes),
        3 => Ok(OrcaInstruction::WithdrawAllTokenTypes),
        4 => Ok(OrcaInstruction::DepositSingleTokenTypeExactAmountIn),
        5 => Ok(OrcaInstruction::WithdrawSingleTokenTypeExactAmountOut),
        _ => Err(Error::Protocol {
            reason: format!("unknown Orca instruction tag {tag}"),
        }),
    }
}

/// `[swap, authority, user_transfer_authority, source, swap_source,
/// swap_destination, destination, pool_mint, fee_account, token_program,
/// host_fee?]`
pub fn extract_swap_accounts(accounts: &[String]) -> Result<SwapAccounts<'_>, Error> {
    if accounts.len() < SWAP_ACCOUNT_COUNT {
        return Err(Error::Protocol {
            reason: format!(
                "Orca swap needs {SWAP_ACCOUNT_COUNT} accounts, got {}",
                accounts.len()
            ),
        });
    }

    Ok(SwapAccounts {
        pool_authority: account_at(accounts, 1, Protocol::Orca, "authority")?,
        user_authority: account_at(accounts, 2, Protocol::Orca, "user_transfer_authority")?,
        user_source: account_at(accounts, 3, Protocol::Orca, "source")?,
        pool_source: Some(account_at(accounts, 4, Protocol::Orca, "swap_source")?),
    })
}

#[derive(Debug)]
pub struct OrcaDecorator;

impl TransferDecorator for OrcaDecorator {
    fn protocol(&self) -> Protocol {
        Protocol::Orca
    }

    fn decorate_instruction(
        &self,
        tx: &SolanaBufferedTransaction,
        ix: &ParsedInstruction,
        ctx: &DecorateContext,
    ) -> Result<Option<DecoratedTransfer>, Error> {
        let data = decode_instruction_data(&ix.data)?;
        match parse_instruction(&data)? {
            OrcaInstruction::Swap(amounts) => {
                let accounts = extract_swap_accounts(&ix.accounts)?;
                ctx.swap_transfer(tx, Protocol::Orca, &accounts, amounts.amount_in)
                    .map(Some)
            }
            _ => Ok(None),
        }
    }
}
