use super::{ok, store_failure, PageParams};
use crate::{query::QueryService, record::StakeHistory};
use actix_web::{
    get,
    web::{Data, Query},
    HttpResponse,
};
use serde_derive::Serialize;

#[derive(Debug, Serialize)]
pub struct StakeSample {
    amount: String,
    time: i64,
}

impl From<StakeHistory> for StakeSample {
    fn from(sample: StakeHistory) -> Self {
        Self {
            amount: sample.amount.to_string(),
            time: sample.time.timestamp(),
        }
    }
}

/// Bonded total now, then the daily samples newest first
#[get("/stakeHistory")]
pub async fn get_stake_history(
    service: Data<QueryService>,
    params: Query<PageParams>,
) -> HttpResponse {
    match service.stake_history(params.limit(), params.offset()) {
        Ok(page) => ok(
            page.records.into_iter().map(StakeSample::from).collect::<Vec<_>>(),
            page.total,
        ),
        Err(e) => store_failure("stakeHistory", e),
    }
}

#[get("/height")]
pub async fn get_height(service: Data<QueryService>) -> HttpResponse {
    match service.chain_height() {
        Ok(height) => ok(height, 0),
        Err(e) => store_failure("height", e),
    }
}
