pub mod amount;
pub mod block;
pub mod config;
pub mod decode;
pub mod event;
pub mod filter;
pub mod ingestion;
pub mod parser;
pub mod query;
pub mod record;
pub mod rpc;
pub mod signer;
pub mod snapshot;
pub mod store;
pub mod web;

pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
pub const LOG_FILE_PREFIX: &str = "staking-indexer.log";
pub const RPC_TIMEOUT_SECS: u64 = 60;
