use super::{missing_param, ok, store_failure, PageParams};
use crate::{
    query::QueryService,
    record::{CommissionRecord, RewardRecord},
};
use actix_web::{
    get,
    web::{Data, Query},
    HttpResponse,
};
use rust_decimal::prelude::ToPrimitive;
use serde_derive::Serialize;

#[derive(Debug, Serialize)]
pub struct Commission {
    validator: String,
    commission: f64,
    time: i64,
}

#[derive(Debug, Serialize)]
pub struct RewardHistory {
    amount: String,
    time: i64,
}

impl From<CommissionRecord> for Commission {
    fn from(record: CommissionRecord) -> Self {
        Self {
            validator: record.validator,
            commission: record.commission.to_f64().unwrap_or_default(),
            time: record.time.timestamp(),
        }
    }
}

impl From<RewardRecord> for RewardHistory {
    fn from(record: RewardRecord) -> Self {
        Self {
            amount: record.amount.to_string(),
            time: record.time.timestamp(),
        }
    }
}

#[get("/commissionRecord")]
pub async fn get_commission_records(
    service: Data<QueryService>,
    params: Query<PageParams>,
) -> HttpResponse {
    let Some(validator) = params.validator.as_deref() else {
        return missing_param();
    };
    match service.commission_records(validator, params.limit(), params.offset()) {
        Ok(page) => ok(
            page.records.into_iter().map(Commission::from).collect::<Vec<_>>(),
            page.total,
        ),
        Err(e) => store_failure("commissionRecord", e),
    }
}

#[get("/rewardHistory")]
pub async fn get_reward_history(
    service: Data<QueryService>,
    params: Query<PageParams>,
) -> HttpResponse {
    let Some(validator) = params.validator.as_deref() else {
        return missing_param();
    };
    match service.reward_history(validator, params.limit(), params.offset()) {
        Ok(page) => ok(
            page.records.into_iter().map(RewardHistory::from).collect::<Vec<_>>(),
            page.total,
        ),
        Err(e) => store_failure("rewardHistory", e),
    }
}
