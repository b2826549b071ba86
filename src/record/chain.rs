use super::{record_key, DbRecord};
use crate::amount::Amount;
use chrono::{DateTime, Utc};
use serde_derive::{Deserialize, Serialize};

pub const CHAIN: &str = "Chain";
pub const TOTAL_STAKE_KEY: &str = "total_stake";
pub const STAKE_HISTORY: &str = "StakeHistory";

/// Last height whose mutations are fully persisted.
///
/// Only written inside the same transaction as that height's records, so
/// the stored height never runs ahead of the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainCheckpoint {
    pub name: String,
    pub rpc: String,
    pub chain_id: String,
    pub height: u64,
}

/// Current bonded total
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stake {
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StakeHistory {
    pub id: u64,
    pub amount: Amount,
    pub time: DateTime<Utc>,
}

impl ChainCheckpoint {
    pub fn new(name: &str, rpc: &str) -> Self {
        Self {
            name: name.to_string(),
            rpc: rpc.to_string(),
            chain_id: String::new(),
            height: 0,
        }
    }

    pub fn key_of(name: &str) -> String {
        format!("{CHAIN}_{name}")
    }

    /// Copy of this checkpoint advanced to `height`
    pub fn at(&self, height: u64, chain_id: &str) -> Self {
        Self {
            name: self.name.clone(),
            rpc: self.rpc.clone(),
            chain_id: chain_id.to_string(),
            height,
        }
    }
}

impl DbRecord for ChainCheckpoint {
    fn key(&self) -> String {
        Self::key_of(&self.name)
    }
}

impl DbRecord for Stake {
    fn key(&self) -> String {
        TOTAL_STAKE_KEY.to_string()
    }
}

impl DbRecord for StakeHistory {
    fn key(&self) -> String {
        record_key(STAKE_HISTORY, self.id)
    }

    fn auto_increment_family(&self) -> Option<String> {
        Some(STAKE_HISTORY.to_string())
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
}
