use super::{
    types::AbciQueryResult, ChainRpc, NodeStatus, RpcBlock, RpcBlockResults, RpcError,
    TxSearchPage,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::de::DeserializeOwned;
use serde_derive::Deserialize;
use serde_json::{json, Value};
use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};
use tracing::trace;

#[derive(Debug, Deserialize)]
#[serde(bound = "T: DeserializeOwned")]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: String,
}

/// CometBFT JSON-RPC client over HTTP POST
#[derive(Debug)]
pub struct HttpRpcClient {
    endpoint: String,
    http: reqwest::Client,
    next_id: AtomicU64,
}

impl HttpRpcClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            http,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        trace!("rpc {method} (id {id}) {params}");
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        let response: JsonRpcResponse<T> = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        match (response.result, response.error) {
            (Some(result), _) => Ok(result),
            (None, Some(error)) => Err(RpcError::Node {
                code: error.code,
                message: error.message,
                data: error.data,
            }),
            (None, None) => Err(RpcError::EmptyResponse),
        }
    }
}

#[async_trait]
impl ChainRpc for HttpRpcClient {
    async fn status(&self) -> Result<NodeStatus, RpcError> {
        self.call("status", json!({})).await
    }

    async fn block(&self, height: u64) -> Result<RpcBlock, RpcError> {
        self.call("block", json!({ "height": height.to_string() }))
            .await
    }

    async fn block_results(&self, height: u64) -> Result<RpcBlockResults, RpcError> {
        self.call("block_results", json!({ "height": height.to_string() }))
            .await
    }

    async fn tx_search(
        &self,
        height: u64,
        page: u32,
        per_page: u32,
    ) -> Result<TxSearchPage, RpcError> {
        self.call(
            "tx_search",
            json!({
                "query": format!("tx.height={height}"),
                "prove": false,
                "page": page.to_string(),
                "per_page": per_page.to_string(),
                "order_by": "asc",
            }),
        )
        .await
    }

    async fn abci_query(&self, path: &str, data: Vec<u8>) -> Result<Vec<u8>, RpcError> {
        let result: AbciQueryResult = self
            .call(
                "abci_query",
                json!({
                    "path": path,
                    "data": hex::encode(data),
                    "prove": false,
                }),
            )
            .await?;

        let response = result.response;
        if response.code != 0 {
            return Err(RpcError::AbciQuery {
                path: path.to_string(),
                code: response.code,
                log: response.log,
            });
        }
        Ok(STANDARD.decode(response.value)?)
    }
}
