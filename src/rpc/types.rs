//! JSON shapes of the node's RPC results.
//!
//! Heights and counts arrive as decimal strings, lists may arrive as `null`.

use crate::event::{null_as_empty, Event};
use chrono::{DateTime, Utc};
use serde::Deserializer;
use serde_derive::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NodeStatus {
    pub node_info: NodeInfo,
    pub sync_info: SyncInfo,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NodeInfo {
    /// Chain id
    pub network: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SyncInfo {
    #[serde(deserialize_with = "u64_from_str")]
    pub latest_block_height: u64,
    #[serde(default, deserialize_with = "u64_from_str")]
    pub earliest_block_height: u64,
    #[serde(default)]
    pub catching_up: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RpcBlock {
    pub block: BlockBody,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BlockBody {
    pub header: Header,
    pub data: BlockData,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Header {
    pub chain_id: String,
    #[serde(deserialize_with = "u64_from_str")]
    pub height: u64,
    pub time: DateTime<Utc>,
    /// Upper-case hex
    pub proposer_address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BlockData {
    /// Base64 encoded raw transactions
    #[serde(default, deserialize_with = "null_as_empty")]
    pub txs: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RpcBlockResults {
    #[serde(deserialize_with = "u64_from_str")]
    pub height: u64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub txs_results: Vec<TxResult>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub begin_block_events: Vec<Event>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub end_block_events: Vec<Event>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub finalize_block_events: Vec<Event>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TxResult {
    #[serde(default)]
    pub code: u32,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub log: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TxSearchPage {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub txs: Vec<TxSearchItem>,
    #[serde(deserialize_with = "u64_from_str")]
    pub total_count: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TxSearchItem {
    pub hash: String,
    #[serde(deserialize_with = "u64_from_str")]
    pub height: u64,
    #[serde(default)]
    pub index: u32,
    pub tx_result: TxResult,
    /// Base64 encoded raw transaction
    pub tx: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AbciQueryResult {
    pub response: AbciQueryResponse,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AbciQueryResponse {
    #[serde(default)]
    pub code: u32,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub log: String,
    /// Base64 encoded protobuf response
    #[serde(default, deserialize_with = "null_as_empty")]
    pub value: String,
}

fn u64_from_str<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    match <Raw as serde::Deserialize>::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(text) => text.parse().map_err(serde::de::Error::custom),
    }
}
