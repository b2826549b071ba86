use super::{family, record_key, DbRecord};
use crate::amount::Amount;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_derive::{Deserialize, Serialize};

pub const COMMISSION_RECORD: &str = "CommissionRecord";
pub const REWARD_RECORD: &str = "RewardRecord";
pub const CLAIMED_TOTAL: &str = "ClaimedTotal";

/// Commission rate in effect for a validator from `time` on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommissionRecord {
    pub id: u64,
    pub validator: String,
    pub commission: Decimal,
    pub time: DateTime<Utc>,
}

/// Daily sample of a validator's rewards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardRecord {
    pub id: u64,
    pub validator: String,
    pub amount: Amount,
    pub time: DateTime<Utc>,
}

/// Lifetime sum of commission withdrawn by a validator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimedTotal {
    pub validator: String,
    pub amount: Amount,
}

impl CommissionRecord {
    pub fn family_of(validator: &str) -> String {
        family(COMMISSION_RECORD, validator)
    }
}

impl RewardRecord {
    pub fn family_of(validator: &str) -> String {
        family(REWARD_RECORD, validator)
    }
}

impl ClaimedTotal {
    pub fn key_of(validator: &str) -> String {
        family(CLAIMED_TOTAL, validator)
    }
}

impl DbRecord for CommissionRecord {
    fn key(&self) -> String {
        record_key(&Self::family_of(&self.validator), self.id)
    }

    fn auto_increment_family(&self) -> Option<String> {
        Some(Self::family_of(&self.validator))
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
}

impl DbRecord for RewardRecord {
    fn key(&self) -> String {
        record_key(&Self::family_of(&self.validator), self.id)
    }

    fn auto_increment_family(&self) -> Option<String> {
        Some(Self::family_of(&self.validator))
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
}

impl DbRecord for ClaimedTotal {
    fn key(&self) -> String {
        Self::key_of(&self.validator)
    }
}
