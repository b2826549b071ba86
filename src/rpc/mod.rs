//! Upstream node access.
//!
//! [ChainRpc] is the seam between the pipeline and the node. The HTTP
//! implementation speaks CometBFT JSON-RPC; module queries go through
//! `abci_query` with protobuf payloads.

pub mod http;
pub mod query;
pub mod retry;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;

pub use http::HttpRpcClient;
pub use retry::{with_retry, RetryPolicy};
pub use types::{
    NodeStatus, RpcBlock, RpcBlockResults, TxResult, TxSearchItem, TxSearchPage,
};

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("node returned error {code}: {message} {data}")]
    Node {
        code: i64,
        message: String,
        data: String,
    },
    #[error("node response carries neither result nor error")]
    EmptyResponse,
    #[error("abci query {path} failed with code {code}: {log}")]
    AbciQuery { path: String, code: u32, log: String },
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("invalid protobuf payload: {0}")]
    Protobuf(#[from] prost::DecodeError),
    #[error("invalid amount {0:?}")]
    Amount(String),
    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<RpcError>,
    },
}

#[async_trait]
pub trait ChainRpc: Send + Sync {
    async fn status(&self) -> Result<NodeStatus, RpcError>;

    async fn block(&self, height: u64) -> Result<RpcBlock, RpcError>;

    async fn block_results(&self, height: u64) -> Result<RpcBlockResults, RpcError>;

    /// One page (1 based) of the transactions included at `height`
    async fn tx_search(
        &self,
        height: u64,
        page: u32,
        per_page: u32,
    ) -> Result<TxSearchPage, RpcError>;

    /// Raw protobuf response of a gRPC query routed through ABCI
    async fn abci_query(&self, path: &str, data: Vec<u8>) -> Result<Vec<u8>, RpcError>;
}
