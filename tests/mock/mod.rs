//! In-memory node serving canned heights and module queries.

use crate::helpers::{block, BOND_DENOM, PROPOSER_HEX};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use prost::Message;
use staking_indexer::{
    decode::{address::ED25519_PUBKEY, encode_tx, proto, tx_hash, AddressCodec, PubKey},
    event::{Attribute, Event, MSG_INDEX_KEY},
    ingestion::FetchedHeight,
    rpc::{
        types::{BlockBody, BlockData, Header, NodeInfo, SyncInfo},
        ChainRpc, NodeStatus, RpcBlock, RpcBlockResults, RpcError, TxResult, TxSearchItem,
        TxSearchPage,
    },
};
use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering},
        Mutex,
    },
};

pub const CHAIN_ID: &str = "mtt_9000-1";

/// A raw tx and the result the node reports for it
#[derive(Debug, Clone)]
pub struct MockTx {
    pub raw: Vec<u8>,
    pub result: TxResult,
}

#[derive(Debug, Clone)]
pub struct MockHeight {
    pub block: RpcBlock,
    pub results: RpcBlockResults,
    pub searched: Vec<TxSearchItem>,
}

#[derive(Default)]
pub struct MockChain {
    heights: Mutex<BTreeMap<u64, MockHeight>>,
    abci: Mutex<HashMap<String, Vec<u8>>>,
    latest: AtomicU64,
    pub tx_search_fails: AtomicBool,
    pub block_results_fails: AtomicBool,
    pub block_results_calls: AtomicU32,
}

impl MockHeight {
    pub fn new(height: u64, txs: Vec<MockTx>) -> Self {
        let encoded: Vec<String> = txs.iter().map(|tx| STANDARD.encode(&tx.raw)).collect();
        let searched = txs
            .iter()
            .zip(&encoded)
            .enumerate()
            .map(|(index, (tx, raw))| TxSearchItem {
                hash: tx_hash(&tx.raw),
                height,
                index: index as u32,
                tx_result: tx.result.clone(),
                tx: raw.clone(),
            })
            .collect();

        Self {
            block: RpcBlock {
                block: BlockBody {
                    header: Header {
                        chain_id: CHAIN_ID.to_string(),
                        height,
                        time: block(height).time,
                        proposer_address: PROPOSER_HEX.to_string(),
                    },
                    data: BlockData { txs: encoded },
                },
            },
            results: RpcBlockResults {
                height,
                txs_results: txs.into_iter().map(|tx| tx.result).collect(),
                ..Default::default()
            },
            searched,
        }
    }

    pub fn fetched(&self) -> FetchedHeight {
        FetchedHeight {
            block: self.block.clone(),
            results: self.results.clone(),
            tx_search: Some(self.searched.clone()),
        }
    }
}

impl MockChain {
    pub fn add(&self, height: MockHeight) {
        let number = height.block.block.header.height;
        self.heights.lock().unwrap().insert(number, height);
        self.latest.fetch_max(number, Ordering::SeqCst);
    }

    pub fn add_height(&self, height: u64, txs: Vec<MockTx>) {
        self.add(MockHeight::new(height, txs));
    }

    /// Hash of the `index`-th tx at `height`
    pub fn tx_hash_at(&self, height: u64, index: usize) -> String {
        self.heights.lock().unwrap()[&height].searched[index].hash.clone()
    }

    pub fn set_abci(&self, path: &str, response: Vec<u8>) {
        self.abci.lock().unwrap().insert(path.to_string(), response);
    }

    fn height(&self, height: u64) -> Result<MockHeight, RpcError> {
        self.heights
            .lock()
            .unwrap()
            .get(&height)
            .cloned()
            .ok_or_else(|| RpcError::Node {
                code: -32603,
                message: format!("height {height} is not available"),
                data: String::new(),
            })
    }
}

#[async_trait]
impl ChainRpc for MockChain {
    async fn status(&self) -> Result<NodeStatus, RpcError> {
        Ok(NodeStatus {
            node_info: NodeInfo {
                network: CHAIN_ID.to_string(),
            },
            sync_info: SyncInfo {
                latest_block_height: self.latest.load(Ordering::SeqCst),
                earliest_block_height: 1,
                catching_up: false,
            },
        })
    }

    async fn block(&self, height: u64) -> Result<RpcBlock, RpcError> {
        Ok(self.height(height)?.block)
    }

    async fn block_results(&self, height: u64) -> Result<RpcBlockResults, RpcError> {
        self.block_results_calls.fetch_add(1, Ordering::SeqCst);
        if self.block_results_fails.load(Ordering::SeqCst) {
            return Err(RpcError::EmptyResponse);
        }
        Ok(self.height(height)?.results)
    }

    async fn tx_search(
        &self,
        height: u64,
        page: u32,
        per_page: u32,
    ) -> Result<TxSearchPage, RpcError> {
        if self.tx_search_fails.load(Ordering::SeqCst) {
            return Err(RpcError::EmptyResponse);
        }
        let searched = self.height(height)?.searched;
        let start = ((page.max(1) - 1) * per_page) as usize;
        Ok(TxSearchPage {
            total_count: searched.len() as u64,
            txs: searched
                .into_iter()
                .skip(start)
                .take(per_page as usize)
                .collect(),
        })
    }

    async fn abci_query(&self, path: &str, _data: Vec<u8>) -> Result<Vec<u8>, RpcError> {
        self.abci
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| RpcError::AbciQuery {
                path: path.to_string(),
                code: 6,
                log: "unknown query path".to_string(),
            })
    }
}

pub fn any_of<M: Message>(type_url: &str, msg: &M) -> proto::Any {
    proto::Any {
        type_url: type_url.to_string(),
        value: msg.encode_to_vec(),
    }
}

pub fn coin(amount: &str) -> Option<proto::Coin> {
    Some(proto::Coin {
        denom: BOND_DENOM.to_string(),
        amount: amount.to_string(),
    })
}

/// Account address of the ed25519 key built from `seed`
pub fn signer_address(seed: u8) -> String {
    AddressCodec::new("mtt")
        .pubkey_addresses(&PubKey::Ed25519(vec![seed; 32]))
        .unwrap()
        .remove(0)
}

/// Tx signed by the ed25519 key built from `seed`, paying `fee` in the
/// bond denom
pub fn signed_tx(messages: Vec<proto::Any>, seed: u8, fee: &str) -> Vec<u8> {
    let body = proto::TxBody {
        messages,
        memo: String::new(),
        timeout_height: 0,
    };
    let auth_info = proto::AuthInfo {
        signer_infos: vec![proto::SignerInfo {
            public_key: Some(any_of(ED25519_PUBKEY, &proto::PubKeyBytes { key: vec![seed; 32] })),
            sequence: 0,
        }],
        fee: Some(proto::Fee {
            amount: vec![coin(fee).unwrap_or_default()],
            gas_limit: 200_000,
            ..Default::default()
        }),
    };
    encode_tx(&body, &auth_info, vec![vec![seed; 64]])
}

/// Successful result whose flat events are tagged with their message index
pub fn success(events: Vec<(usize, Event)>) -> TxResult {
    TxResult {
        code: 0,
        log: String::new(),
        events: events
            .into_iter()
            .map(|(msg_index, mut event)| {
                event
                    .attributes
                    .push(Attribute::new(MSG_INDEX_KEY, &msg_index.to_string()));
                event
            })
            .collect(),
    }
}

pub fn failure(code: u32) -> TxResult {
    TxResult {
        code,
        log: "out of gas".to_string(),
        events: vec![],
    }
}
