use super::{family, record_key, DbRecord};
use crate::amount::{Amount, AmountError};
use chrono::{DateTime, Utc};
use serde_derive::{Deserialize, Serialize};

pub const VALIDATOR_RECORD: &str = "ValidatorRecord";
pub const DELEGATOR_RECORD: &str = "DelegatorRecord";
pub const DELEGATOR_OUT_LIST: &str = "DelegatorOutList";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DelegationType {
    Delegate = 0,
    Undelegate = 1,
    Claim = 2,
    CancelUnbonding = 3,
    Redelegate = 4,
}

/// Whether an activity adds to or subtracts from a delegator's stake summary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StakeChange {
    Increase,
    Decrease,
}

/// Delegation activity keyed by validator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorRecord {
    pub id: u64,
    pub delegator: String,
    pub validator: String,
    pub amount: Amount,
    pub denom: String,
    pub tx_hash: String,
    pub delegation_type: DelegationType,
    pub delegation_time: DateTime<Utc>,
}

/// Mirror of a [ValidatorRecord] keyed by delegator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelegatorRecord {
    pub id: u64,
    pub delegator: String,
    pub validator: String,
    pub amount: Amount,
    pub denom: String,
    pub tx_hash: String,
    pub delegation_type: DelegationType,
    pub delegation_time: DateTime<Utc>,
}

/// Per-delegator summary of signed cumulative amounts, one entry per validator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelegatorOutList {
    pub delegator: String,
    pub validators: Vec<String>,
    pub amounts: Vec<Amount>,
    pub denom: String,
}

impl ValidatorRecord {
    pub fn family_of(validator: &str) -> String {
        family(VALIDATOR_RECORD, validator)
    }
}

impl DelegatorRecord {
    pub fn family_of(delegator: &str) -> String {
        family(DELEGATOR_RECORD, delegator)
    }
}

impl From<&ValidatorRecord> for DelegatorRecord {
    fn from(record: &ValidatorRecord) -> Self {
        Self {
            id: 0,
            delegator: record.delegator.clone(),
            validator: record.validator.clone(),
            amount: record.amount,
            denom: record.denom.clone(),
            tx_hash: record.tx_hash.clone(),
            delegation_type: record.delegation_type,
            delegation_time: record.delegation_time,
        }
    }
}

impl DbRecord for ValidatorRecord {
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

impl DbRecord for DelegatorRecord {
    fn key(&self) -> String {
        record_key(&Self::family_of(&self.delegator), self.id)
    }

    fn auto_increment_family(&self) -> Option<String> {
        Some(Self::family_of(&self.delegator))
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
}

impl DelegatorOutList {
    pub fn new(delegator: &str, denom: &str) -> Self {
        Self {
            delegator: delegator.to_string(),
            validators: vec![],
            amounts: vec![],
            denom: denom.to_string(),
        }
    }

    pub fn key_of(delegator: &str) -> String {
        family(DELEGATOR_OUT_LIST, delegator)
    }

    /// Add or subtract `amount` on the entry for `validator`, appending a
    /// new entry when the validator has none yet. On overflow the summary
    /// is left untouched.
    pub fn apply(
        &mut self,
        validator: &str,
        amount: Amount,
        change: StakeChange,
    ) -> Result<(), AmountError> {
        let delta = match change {
            StakeChange::Increase => amount,
            StakeChange::Decrease => -amount,
        };
        match self.validators.iter().position(|v| v == validator) {
            Some(idx) => {
                self.amounts[idx] = self.amounts[idx]
                    .checked_add(delta)
                    .ok_or(AmountError::Overflow)?;
            }
            None => {
                self.validators.push(validator.to_string());
                self.amounts.push(delta);
            }
        }
        Ok(())
    }

    pub fn amount_for(&self, validator: &str) -> Option<Amount> {
        self.validators
            .iter()
            .position(|v| v == validator)
            .map(|idx| self.amounts[idx])
    }
}

impl DbRecord for DelegatorOutList {
    fn key(&self) -> String {
        Self::key_of(&self.delegator)
    }
}
