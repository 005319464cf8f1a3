pub mod decorators;
pub mod router;

use crate::error::Error;
use crate::types::{BufferedBlock, TransferBatch};
use decorators::DecorateContext;
use router::{ProtocolRouter, Route};

/// Decorates every transaction of a buffered block into one batch.
///
/// Transactions with no watched program are skipped. The first decode
/// fault aborts the whole block, so a batch is never partially built.
pub fn aggregate(
    block: &BufferedBlock,
    router: &ProtocolRouter,
    ctx: &DecorateContext,
) -> Result<TransferBatch, Error> {
    let mut batch = TransferBatch::default();

    for (index, tx) in block.transactions.iter().enumerate() {
        let route = router.route(tx);
        let Route::Decorate(protocol) = route else {
            tracing::debug!(
                index,
                application = tx.application,
                signature = %tx.signature,
                "application didn't return a transfer"
            );
            continue;
        };

        let decorator = decorators::decorator_for(protocol);
        let transfers = decorator.decorate(tx, router.programs(), ctx)?;

        tracing::debug!(
            index,
            signature = %tx.signature,
            %protocol,
            count = transfers.len(),
            "decorated transaction"
        );

        batch.transfers.extend(transfers);
    }

    Ok(batch)
}
