use super::{HeightData, SyncError};
use crate::{
    parser::{index_parsed_block_event, index_parsed_message, IndexError, MessageContext},
    record::ChainCheckpoint,
    store::IndexerStore,
};
use std::sync::Arc;
use tokio::sync::mpsc::Receiver;
use tracing::{error, info, instrument, trace};

/// Index one height and advance the checkpoint to it in one transaction.
///
/// Begin block events are indexed first, then each tx's messages in order,
/// then end block events.
pub fn index_height(
    store: &IndexerStore,
    checkpoint: &ChainCheckpoint,
    data: &HeightData,
) -> Result<ChainCheckpoint, IndexError> {
    let block = &data.block;
    store.transaction(|batch| {
        for processed in &data.begin_block_events {
            for parsed in &processed.parsed {
                index_parsed_block_event(batch, block, &processed.event, parsed)?;
            }
        }

        for tx in &data.txs {
            for msg in &tx.messages {
                let ctx = MessageContext {
                    block,
                    tx_hash: &tx.hash,
                    message_index: msg.index,
                    type_url: &msg.type_url,
                };
                for parsed in &msg.parsed {
                    index_parsed_message(batch, &ctx, parsed)?;
                }
            }
        }

        for processed in &data.end_block_events {
            for parsed in &processed.parsed {
                index_parsed_block_event(batch, block, &processed.event, parsed)?;
            }
        }

        let mut advanced = checkpoint.at(block.height, &block.chain_id);
        batch.put(&mut advanced)?;
        trace!("Checkpoint {} staged at {}", advanced.name, advanced.height);
        Ok(advanced)
    })
}

/// Drain processed heights into the store until the channel closes.
///
/// Each height is committed on the blocking pool. Stops at the first
/// persistence failure; dropping the receiver makes the scheduler's next
/// send fail.
#[instrument(skip_all, fields(chain = %checkpoint.name))]
pub async fn flush_worker(
    store: Arc<IndexerStore>,
    mut checkpoint: ChainCheckpoint,
    mut receiver: Receiver<HeightData>,
) -> Result<(), SyncError> {
    info!("Flush worker started at height {}", checkpoint.height);
    while let Some(data) = receiver.recv().await {
        let height = data.block.height;
        let store = store.clone();
        let current = checkpoint.clone();
        let outcome =
            tokio::task::spawn_blocking(move || index_height(&store, &current, &data)).await?;
        match outcome {
            Ok(advanced) => {
                checkpoint = advanced;
                info!("Indexed height {height}");
            }
            Err(e) => {
                error!("Failed to persist height {height}, halting flush worker: {e}");
                return Err(e.into());
            }
        }
    }
    info!("Flush worker stopped at height {}", checkpoint.height);
    Ok(())
}
