//! Read side of the index, shared by the HTTP API.

use crate::{
    amount::Amount,
    record::{
        chain::{STAKE_HISTORY, TOTAL_STAKE_KEY},
        family_prefix, ChainCheckpoint, CommissionRecord, DelegatorOutList, DelegatorRecord,
        RewardRecord, Stake, StakeHistory, ValidatorRecord,
    },
    store::{IndexerStore, Page, StoreResult},
};
use chrono::Utc;
use std::sync::Arc;

pub const DEFAULT_PAGE_LIMIT: i64 = 20;
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Zero (or less) means the default page size; larger requests are capped
pub fn clamp_limit(limit: i64) -> i64 {
    if limit <= 0 {
        DEFAULT_PAGE_LIMIT
    } else {
        limit.min(MAX_PAGE_LIMIT)
    }
}

pub fn clamp_offset(offset: i64) -> i64 {
    offset.max(0)
}

#[derive(Debug, Clone)]
pub struct QueryService {
    store: Arc<IndexerStore>,
    chain_name: String,
}

impl QueryService {
    pub fn new(store: Arc<IndexerStore>, chain_name: &str) -> Self {
        Self {
            store,
            chain_name: chain_name.to_string(),
        }
    }

    /// Last fully indexed height, 0 before the first flush
    pub fn chain_height(&self) -> StoreResult<u64> {
        Ok(self
            .store
            .get::<ChainCheckpoint>(&ChainCheckpoint::key_of(&self.chain_name))?
            .map_or(0, |checkpoint| checkpoint.height))
    }

    pub fn delegator_list(&self, delegator: &str) -> StoreResult<DelegatorOutList> {
        Ok(self
            .store
            .get(&DelegatorOutList::key_of(delegator))?
            .unwrap_or_else(|| DelegatorOutList::new(delegator, "")))
    }

    pub fn delegator_history(
        &self,
        delegator: &str,
        limit: i64,
        offset: i64,
        ascending: bool,
    ) -> StoreResult<Page<DelegatorRecord>> {
        self.store.scan_by_prefix(
            &family_prefix(&DelegatorRecord::family_of(delegator)),
            clamp_limit(limit),
            clamp_offset(offset),
            ascending,
        )
    }

    pub fn validator_history(
        &self,
        validator: &str,
        limit: i64,
        offset: i64,
        ascending: bool,
    ) -> StoreResult<Page<ValidatorRecord>> {
        self.store.scan_by_prefix(
            &family_prefix(&ValidatorRecord::family_of(validator)),
            clamp_limit(limit),
            clamp_offset(offset),
            ascending,
        )
    }

    /// Newest first
    pub fn commission_records(
        &self,
        validator: &str,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Page<CommissionRecord>> {
        self.store.scan_by_prefix(
            &family_prefix(&CommissionRecord::family_of(validator)),
            clamp_limit(limit),
            clamp_offset(offset),
            false,
        )
    }

    /// Newest first
    pub fn reward_history(
        &self,
        validator: &str,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Page<RewardRecord>> {
        self.store.scan_by_prefix(
            &family_prefix(&RewardRecord::family_of(validator)),
            clamp_limit(limit),
            clamp_offset(offset),
            false,
        )
    }

    /// Newest first, led by the live bonded total sampled now
    pub fn stake_history(&self, limit: i64, offset: i64) -> StoreResult<Page<StakeHistory>> {
        let page = self.store.scan_by_prefix::<StakeHistory>(
            &family_prefix(STAKE_HISTORY),
            clamp_limit(limit),
            clamp_offset(offset),
            false,
        )?;
        let live = self
            .store
            .get::<Stake>(TOTAL_STAKE_KEY)?
            .map_or_else(Amount::zero, |stake| stake.amount);

        let mut records = Vec::with_capacity(page.records.len() + 1);
        records.push(StakeHistory {
            id: 0,
            amount: live,
            time: Utc::now(),
        });
        records.extend(page.records);
        Ok(Page {
            records,
            total: page.total + 1,
        })
    }
}
