use super::{missing_param, ok, store_failure, PageParams};
use crate::{
    amount::Amount,
    query::QueryService,
    record::{DelegationType, DelegatorOutList, DelegatorRecord, ValidatorRecord},
};
use actix_web::{
    get,
    web::{Data, Query},
    HttpResponse,
};
use chrono::{DateTime, Utc};
use serde_derive::Serialize;
use tracing::debug;

#[derive(Debug, Serialize)]
pub struct DelegatorList {
    delegator: String,
    validators: Vec<String>,
    amounts: Vec<String>,
    denom: String,
}

/// One delegation activity as seen from either side
#[derive(Debug, Serialize)]
pub struct History {
    delegator: String,
    validator: String,
    amount: String,
    denom: String,
    tx_hash: String,
    delegation_type: u8,
    /// Unix seconds
    delegation_time: i64,
}

impl From<DelegatorOutList> for DelegatorList {
    fn from(list: DelegatorOutList) -> Self {
        Self {
            delegator: list.delegator,
            validators: list.validators,
            amounts: list.amounts.iter().map(Amount::to_string).collect(),
            denom: list.denom,
        }
    }
}

impl History {
    #[allow(clippy::too_many_arguments)]
    fn new(
        delegator: String,
        validator: String,
        amount: Amount,
        denom: String,
        tx_hash: String,
        delegation_type: DelegationType,
        delegation_time: DateTime<Utc>,
    ) -> Self {
        Self {
            delegator,
            validator,
            amount: amount.to_string(),
            denom,
            tx_hash,
            delegation_type: delegation_type as u8,
            delegation_time: delegation_time.timestamp(),
        }
    }
}

impl From<DelegatorRecord> for History {
    fn from(record: DelegatorRecord) -> Self {
        Self::new(
            record.delegator,
            record.validator,
            record.amount,
            record.denom,
            record.tx_hash,
            record.delegation_type,
            record.delegation_time,
        )
    }
}

impl From<ValidatorRecord> for History {
    fn from(record: ValidatorRecord) -> Self {
        Self::new(
            record.delegator,
            record.validator,
            record.amount,
            record.denom,
            record.tx_hash,
            record.delegation_type,
            record.delegation_time,
        )
    }
}

#[get("/delegatorList")]
pub async fn get_delegator_list(
    service: Data<QueryService>,
    params: Query<PageParams>,
) -> HttpResponse {
    let Some(delegator) = params.delegator.as_deref() else {
        return missing_param();
    };
    match service.delegator_list(delegator) {
        Ok(list) => {
            debug!("Found {} validators for {delegator}", list.validators.len());
            ok(DelegatorList::from(list), 0)
        }
        Err(e) => store_failure("delegatorList", e),
    }
}

#[get("/delegatorHistory")]
pub async fn get_delegator_history(
    service: Data<QueryService>,
    params: Query<PageParams>,
) -> HttpResponse {
    let Some(delegator) = params.delegator.as_deref() else {
        return missing_param();
    };
    match service.delegator_history(delegator, params.limit(), params.offset(), params.ascending()) {
        Ok(page) => ok(
            page.records.into_iter().map(History::from).collect::<Vec<_>>(),
            page.total,
        ),
        Err(e) => store_failure("delegatorHistory", e),
    }
}

#[get("/validatorHistory")]
pub async fn get_validator_history(
    service: Data<QueryService>,
    params: Query<PageParams>,
) -> HttpResponse {
    let Some(validator) = params.validator.as_deref() else {
        return missing_param();
    };
    match service.validator_history(validator, params.limit(), params.offset(), params.ascending()) {
        Ok(page) => ok(
            page.records.into_iter().map(History::from).collect::<Vec<_>>(),
            page.total,
        ),
        Err(e) => store_failure("validatorHistory", e),
    }
}
