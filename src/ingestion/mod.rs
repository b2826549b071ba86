//! Per-height fetch, decode, filter and parse, plus the flush worker that
//! persists each processed height atomically.

pub mod flush;
pub mod processor;
pub mod scheduler;

use crate::{
    block::{Block, BlockEvent},
    decode::{AddressError, DecodeError},
    event::{Event, NormalizationError},
    parser::{IndexError, ParsedBlockEventData, ParsedMessageData},
    rpc::RpcError,
    signer::FeeItem,
    store::StoreError,
};
use thiserror::Error;

pub use flush::{flush_worker, index_height};
pub use processor::{FetchedHeight, Processor};
pub use scheduler::{ChainService, SyncPhase, SyncSettings};

/// Heights processed but not yet flushed before the scheduler blocks
pub const FLUSH_QUEUE_CAPACITY: usize = 10;

/// Errors that fail a whole height; its checkpoint is not advanced
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("tx {hash} at height {height} is unprocessable: {source}")]
    UnprocessableTx {
        height: u64,
        hash: String,
        #[source]
        source: DecodeError,
    },
    #[error("cannot normalize events at height {height}: {source}")]
    Normalization {
        height: u64,
        #[source]
        source: NormalizationError,
    },
    #[error("cannot resolve signers of tx {hash}: {source}")]
    Signer {
        hash: String,
        #[source]
        source: DecodeError,
    },
    #[error("height {height} has {txs} txs but {results} tx results")]
    TxCountMismatch {
        height: u64,
        txs: usize,
        results: usize,
    },
    #[error("invalid base64 tx at height {height}: {source}")]
    Base64 {
        height: u64,
        #[source]
        source: base64::DecodeError,
    },
    #[error("invalid proposer address: {0}")]
    Address(#[from] AddressError),
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("flush worker stopped, height {0} cannot be queued")]
    FlushWorkerGone(u64),
    #[error("flush worker failed: {0}")]
    Flush(#[from] IndexError),
    #[error("flush worker panicked: {0}")]
    FlushTask(#[from] tokio::task::JoinError),
}

/// A message that passed the filters, with its handlers' parse outcomes
#[derive(Debug)]
pub struct ProcessedMessage {
    pub index: usize,
    pub type_url: String,
    pub raw: Vec<u8>,
    pub events: Vec<Event>,
    pub parsed: Vec<ParsedMessageData>,
}

#[derive(Debug)]
pub struct ProcessedTx {
    pub hash: String,
    pub code: u32,
    pub memo: String,
    pub signers: Vec<String>,
    pub fees: Vec<FeeItem>,
    /// Empty for failed txs, which only account for fees
    pub messages: Vec<ProcessedMessage>,
}

#[derive(Debug)]
pub struct ProcessedBlockEvent {
    pub event: BlockEvent,
    pub parsed: Vec<ParsedBlockEventData>,
}

/// Everything the flush worker needs to index one height
#[derive(Debug)]
pub struct HeightData {
    pub block: Block,
    pub txs: Vec<ProcessedTx>,
    pub begin_block_events: Vec<ProcessedBlockEvent>,
    pub end_block_events: Vec<ProcessedBlockEvent>,
}
