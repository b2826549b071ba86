use super::{flush_worker, FetchedHeight, HeightData, Processor, SyncError, FLUSH_QUEUE_CAPACITY};
use crate::{
    record::ChainCheckpoint,
    rpc::{query::txs_by_height, with_retry, ChainRpc, RetryPolicy},
    store::IndexerStore,
};
use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc::{self, Sender};
use tracing::{debug, error, info, instrument, warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// No sync attempted yet
    Idle,
    /// Behind the node's latest height
    CatchUp,
    /// Caught up, polling for new heights
    SteadyPoll,
}

#[derive(Debug, Clone, Copy)]
pub struct SyncSettings {
    pub poll_interval: Duration,
    pub retry: RetryPolicy,
    /// First height to index when no checkpoint is stored
    pub start_height: Option<u64>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            retry: RetryPolicy::default(),
            start_height: None,
        }
    }
}

/// Follows one chain, handing processed heights to the flush worker
pub struct ChainService<R> {
    rpc: Arc<R>,
    store: Arc<IndexerStore>,
    processor: Processor,
    settings: SyncSettings,
    checkpoint: ChainCheckpoint,
    cursor: u64,
    phase: SyncPhase,
}

impl<R: ChainRpc + 'static> ChainService<R> {
    /// Resumes from the stored checkpoint named like `checkpoint`, if any
    pub fn new(
        rpc: Arc<R>,
        store: Arc<IndexerStore>,
        processor: Processor,
        checkpoint: ChainCheckpoint,
        settings: SyncSettings,
    ) -> Result<Self, SyncError> {
        let checkpoint = match store.get::<ChainCheckpoint>(&ChainCheckpoint::key_of(&checkpoint.name))? {
            Some(stored) => {
                info!(
                    "Resuming chain {} ({}) after height {}",
                    stored.name, stored.chain_id, stored.height
                );
                ChainCheckpoint {
                    rpc: checkpoint.rpc,
                    ..stored
                }
            }
            None => {
                let height = settings.start_height.map_or(0, |start| start.saturating_sub(1));
                info!("No checkpoint for chain {}, starting after height {height}", checkpoint.name);
                ChainCheckpoint {
                    height,
                    ..checkpoint
                }
            }
        };

        Ok(Self {
            rpc,
            store,
            processor,
            settings,
            cursor: checkpoint.height,
            checkpoint,
            phase: SyncPhase::Idle,
        })
    }

    /// Last height handed to the flush worker
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    pub fn checkpoint(&self) -> &ChainCheckpoint {
        &self.checkpoint
    }

    /// Spawn the flush worker and poll the node until the worker stops
    #[instrument(skip_all, fields(chain = %self.checkpoint.name))]
    pub async fn run(mut self) -> Result<(), SyncError> {
        let (sender, receiver) = mpsc::channel(FLUSH_QUEUE_CAPACITY);
        let flush_handle = tokio::spawn(flush_worker(
            self.store.clone(),
            self.checkpoint.clone(),
            receiver,
        ));

        let mut ticker = tokio::time::interval(self.settings.poll_interval);
        loop {
            ticker.tick().await;
            match self.sync_to_latest(&sender).await {
                Ok(_) => {}
                Err(SyncError::FlushWorkerGone(height)) => {
                    error!("Flush worker gone, stopping sync before height {height}");
                    break;
                }
                Err(e) => error!("Sync failed at height {}: {e}", self.cursor + 1),
            }
        }

        drop(sender);
        flush_handle.await??;
        Ok(())
    }

    /// Process every height between the cursor and the node's latest one,
    /// in order. Returns how many heights were queued.
    ///
    /// On error the cursor stays at the last queued height so the failed
    /// height is retried by the next call.
    pub async fn sync_to_latest(&mut self, sender: &Sender<HeightData>) -> Result<u64, SyncError> {
        let latest = self.rpc.status().await?.sync_info.latest_block_height;
        if self.cursor >= latest {
            self.enter(SyncPhase::SteadyPoll);
            return Ok(0);
        }

        self.enter(SyncPhase::CatchUp);
        let mut queued = 0;
        while self.cursor < latest {
            let height = self.cursor + 1;
            let fetched = self.fetch_height(height).await?;
            let data = self.processor.process(fetched)?;
            sender
                .send(data)
                .await
                .map_err(|_| SyncError::FlushWorkerGone(height))?;
            self.cursor = height;
            queued += 1;
        }
        self.enter(SyncPhase::SteadyPoll);
        Ok(queued)
    }

    async fn fetch_height(&self, height: u64) -> Result<FetchedHeight, SyncError> {
        let rpc = self.rpc.as_ref();
        let block = rpc.block(height).await?;
        let results = with_retry(&self.settings.retry, "block_results", || {
            rpc.block_results(height)
        })
        .await?;

        let expected = block.block.data.txs.len();
        let tx_search = match txs_by_height(rpc, height).await {
            Ok(txs) if txs.len() == expected => Some(txs),
            Ok(txs) => {
                warn!(
                    "Tx search found {} of {expected} txs at height {height}, using block txs",
                    txs.len()
                );
                None
            }
            Err(e) => {
                warn!("Tx search failed at height {height}, using block txs: {e}");
                None
            }
        };

        debug!("Fetched height {height} with {expected} txs");
        Ok(FetchedHeight {
            block,
            results,
            tx_search,
        })
    }

    fn enter(&mut self, phase: SyncPhase) {
        if self.phase != phase {
            info!("Sync phase {:?} -> {phase:?} at height {}", self.phase, self.cursor);
            self.phase = phase;
        }
    }
}
