//! Persisted entities and their key scheme.
//!
//! Every key has the shape `<Kind>_<natural key>[_<id>]`. Ids come from the
//! store's per-family auto-increment counters and are zero padded, so byte
//! order of the keys in a family equals id order.

pub mod chain;
pub mod delegation;
pub mod validator;

use serde::{de::DeserializeOwned, Serialize};

pub use chain::{ChainCheckpoint, Stake, StakeHistory};
pub use delegation::{DelegationType, DelegatorOutList, DelegatorRecord, StakeChange, ValidatorRecord};
pub use validator::{ClaimedTotal, CommissionRecord, RewardRecord};

/// A value the store can persist under a string key
pub trait DbRecord: Serialize + DeserializeOwned {
    /// Full key, including the id for auto-increment families
    fn key(&self) -> String;

    /// Family whose counter assigns this record's id, `None` for records
    /// stored under their natural key alone
    fn auto_increment_family(&self) -> Option<String> {
        None
    }

    fn set_id(&mut self, _id: u64) {}
}

/// Key of the `id`-th record in `family`
pub fn record_key(family: &str, id: u64) -> String {
    format!("{family}_{id:020}")
}

/// Family name for a kind scoped to one natural key
pub fn family(kind: &str, natural_key: &str) -> String {
    format!("{kind}_{natural_key}")
}

/// Prefix matching every record of `family` and nothing else
pub fn family_prefix(family: &str) -> String {
    format!("{family}_")
}
