use std::collections::HashMap;

use crate::error::Error;
use crate::protocols::orca::OrcaDecorator;
use crate::protocols::raydium::RaydiumDecorator;
use crate::protocols::saber::SaberDecorator;
use crate::protocols::{ProgramTable, Protocol, SwapAccounts};
use crate::types::{DecoratedTransfer, ParsedInstruction, SolanaBufferedTransaction};

/// Read-only data the decorators need besides the transaction itself.
#[derive(Debug, Clone, Default)]
pub struct DecorateContext {
    /// Fluid mint to the base mint it wraps.
    pub token_lookups: HashMap<String, String>,
    /// Pool vault to mint, for vaults the transaction's balances omit.
    /// Populated from the Saber registry by the loader.
    pub pool_mints: HashMap<String, String>,
}

impl DecorateContext {
    /// Mint of the token a swap takes from the user.
    ///
    /// The user's source account and the pool vault it pays into share a
    /// mint, so either one resolves it when the layout names the vault.
    pub fn resolve_mint<'a>(
        &'a self,
        tx: &'a SolanaBufferedTransaction,
        accounts: &SwapAccounts<'_>,
    ) -> Option<&'a str> {
        tx.mint_of(accounts.user_source).or_else(|| {
            let vault = accounts.pool_source?;
            tx.mint_of(vault)
                .or_else(|| self.pool_mints.get(vault).map(String::as_str))
        })
    }

    pub fn base_token_of(&self, mint: &str) -> Option<String> {
        self.token_lookups.get(mint).cloned()
    }

    /// Builds the canonical transfer for a swap's input leg.
    pub fn swap_transfer(
        &self,
        tx: &SolanaBufferedTransaction,
        protocol: Protocol,
        accounts: &SwapAccounts<'_>,
        amount: u64,
    ) -> Result<DecoratedTransfer, Error> {
        let token_mint = self
            .resolve_mint(tx, accounts)
            .ok_or_else(|| Error::Protocol {
                reason: format!(
                    "{protocol} swap in {}: no mint known for source account {} (vault {})",
                    tx.signature,
                    accounts.user_source,
                    accounts.pool_source.unwrap_or("unknown")
                ),
            })?
            .to_string();

        // the signer may be a delegate; the funds leave the source account's owner
        let sender = match tx.owner_of(accounts.user_source) {
            Some(owner) if owner != accounts.user_authority => {
                tracing::debug!(
                    signature = %tx.signature,
                    owner,
                    authority = accounts.user_authority,
                    "swap signed by a delegate"
                );
                owner
            }
            _ => accounts.user_authority,
        };

        Ok(DecoratedTransfer {
            signature: tx.signature.clone(),
            sender: sender.to_string(),
            receiver: accounts.pool_authority.to_string(),
            base_token: self.base_token_of(&token_mint),
            token_mint,
            amount,
            protocol,
        })
    }
}

pub trait TransferDecorator: Sync {
    fn protocol(&self) -> Protocol;

    /// `Ok(None)` for well-formed instructions that move no user funds into
    /// a pool (deposits, admin calls and the like).
    fn decorate_instruction(
        &self,
        tx: &SolanaBufferedTransaction,
        ix: &ParsedInstruction,
        ctx: &DecorateContext,
    ) -> Result<Option<DecoratedTransfer>, Error>;

    /// Every instruction of this protocol's program, in instruction order.
    ///
    /// `programs` must be the table the transaction was routed with.
    fn decorate(
        &self,
        tx: &SolanaBufferedTransaction,
        programs: &ProgramTable,
        ctx: &DecorateContext,
    ) -> Result<Vec<DecoratedTransfer>, Error> {
        let protocol = self.protocol();
        let mut transfers = Vec::new();

        for (index, ix) in tx.instructions.iter().enumerate() {
            if programs.protocol_for(&ix.program_id) != Some(protocol) {
                continue;
            }

            let decorated = self.decorate_instruction(tx, ix, ctx).map_err(|e| match e {
                Error::Protocol { reason } => Error::Protocol {
                    reason: format!("{} instruction {index}: {reason}", tx.signature),
                },
                other => other,
            })?;

            if let Some(transfer) = decorated {
                transfers.push(transfer);
            } else {
                tracing::trace!(
                    signature = %tx.signature,
                    %protocol,
                    index,
                    "instruction is not a swap"
                );
            }
        }

        Ok(transfers)
    }
}

pub fn decorator_for(protocol: Protocol) -> &'static dyn TransferDecorator {
    match protocol {
        Protocol::Saber => &SaberDecorator,
        Protocol::Orca => &OrcaDecorator,
        Protocol::Raydium => &RaydiumDecorator,
    }
}
