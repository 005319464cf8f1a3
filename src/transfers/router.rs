use crate::protocols::{ProgramTable, Protocol};
use crate::transfers::decorators::{TransferDecorator, decorator_for};
use crate::types::SolanaBufferedTransaction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Decorate(Protocol),
    /// None of the transaction's programs is a watched swap program.
    NoDecorator,
}

impl Route {
    pub fn decorator(self) -> Option<&'static dyn TransferDecorator> {
        match self {
            Self::Decorate(protocol) => Some(decorator_for(protocol)),
            Self::NoDecorator => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProtocolRouter {
    programs: ProgramTable,
}

impl ProtocolRouter {
    pub fn new(programs: ProgramTable) -> Self {
        Self { programs }
    }

    pub fn programs(&self) -> &ProgramTable {
        &self.programs
    }

    /// First instruction, top level or inner, whose program is configured.
    ///
    /// Instructions of any other watched protocol in the same transaction
    /// are not decorated.
    pub fn route(&self, tx: &SolanaBufferedTransaction) -> Route {
        let mut configured = tx
            .instructions
            .iter()
            .enumerate()
            .filter_map(|(index, ix)| {
                self.programs
                    .protocol_for(&ix.program_id)
                    .map(|protocol| (index, protocol))
            });

        let Some((_, protocol)) = configured.next() else {
            return Route::NoDecorator;
        };

        for (index, other) in configured.filter(|(_, p)| *p != protocol) {
            tracing::debug!(
                signature = %tx.signature,
                routed = %protocol,
                skipped = %other,
                index,
                "instruction of another watched protocol is not decorated"
            );
        }

        Route::Decorate(protocol)
    }
}
