//! Query API handlers.
//!
//! Every response is HTTP 200 with a `{code, msg, data, total}` envelope;
//! a missing required parameter is reported through `code`.

pub mod chain;
pub mod delegations;
pub mod validators;

use crate::store::StoreError;
use actix_web::{http::header::ContentType, HttpResponse};
use serde_derive::{Deserialize, Serialize};
use tracing::error;

pub const CODE_OK: u32 = 200;
pub const CODE_PARAMS_ERROR: u32 = 50001;

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub code: u32,
    pub msg: String,
    pub data: T,
    pub total: u64,
}

/// Query string of the paged endpoints. Numbers that do not parse count
/// as zero, like absent ones.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub delegator: Option<String>,
    pub validator: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub asc: Option<String>,
}

impl PageParams {
    pub fn limit(&self) -> i64 {
        number(self.limit.as_deref())
    }

    pub fn offset(&self) -> i64 {
        number(self.offset.as_deref())
    }

    pub fn ascending(&self) -> bool {
        self.asc.as_deref() == Some("true")
    }
}

fn number(value: Option<&str>) -> i64 {
    value.and_then(|value| value.parse().ok()).unwrap_or_default()
}

pub fn ok<T: serde::Serialize>(data: T, total: u64) -> HttpResponse {
    respond(&Envelope {
        code: CODE_OK,
        msg: String::new(),
        data,
        total,
    })
}

pub fn missing_param() -> HttpResponse {
    respond(&Envelope {
        code: CODE_PARAMS_ERROR,
        msg: String::new(),
        data: "",
        total: 0,
    })
}

pub fn store_failure(endpoint: &str, e: StoreError) -> HttpResponse {
    error!("{endpoint} failed: {e}");
    HttpResponse::InternalServerError().finish()
}

fn respond<T: serde::Serialize>(envelope: &Envelope<T>) -> HttpResponse {
    match serde_json::to_string(envelope) {
        Ok(body) => HttpResponse::Ok()
            .content_type(ContentType::json())
            .body(body),
        Err(e) => {
            error!("Unable to encode response: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}
