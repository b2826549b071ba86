use crate::helpers::{block, setup_new_db_dir};
use actix_web::{test, web::Data, App};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use staking_indexer::{
    query::QueryService,
    record::{ChainCheckpoint, CommissionRecord},
    store::IndexerStore,
    web::rest::{chain, delegations, validators, CODE_OK, CODE_PARAMS_ERROR},
};
use std::sync::Arc;

fn seeded_store(prefix: &str) -> (tempfile::TempDir, Arc<IndexerStore>) {
    let store_dir = setup_new_db_dir(prefix).unwrap();
    let store = Arc::new(IndexerStore::new(store_dir.path()).unwrap());
    store
        .transaction(|batch| {
            batch.put(&mut ChainCheckpoint::new("mtt", "mock://node").at(12, "mtt_9000-1"))?;
            for (height, rate) in [(1, dec!(0.05)), (2, dec!(0.25))] {
                batch.put(&mut CommissionRecord {
                    id: 0,
                    validator: "mttvaloper1a".into(),
                    commission: rate,
                    time: block(height).time,
                })?;
            }
            Ok::<_, staking_indexer::store::StoreError>(())
        })
        .unwrap();
    (store_dir, store)
}

#[actix_web::test]
async fn responses_use_the_envelope() {
    let (_dir, store) = seeded_store("web-envelope");
    let app = test::init_service(
        App::new()
            .app_data(Data::new(QueryService::new(store, "mtt")))
            .service(delegations::get_delegator_list)
            .service(validators::get_commission_records)
            .service(chain::get_height),
    )
    .await;

    let height: Value =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri("/height").to_request())
            .await;
    assert_eq!(height, json!({"code": CODE_OK, "msg": "", "data": 12, "total": 0}));

    let missing: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/delegatorList").to_request(),
    )
    .await;
    assert_eq!(missing["code"], json!(CODE_PARAMS_ERROR));

    let commissions: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri("/commissionRecord?validator=mttvaloper1a&limit=1")
            .to_request(),
    )
    .await;
    assert_eq!(commissions["total"], json!(2));
    assert_eq!(commissions["data"][0]["commission"], json!(0.25));
    assert_eq!(commissions["data"].as_array().map(Vec::len), Some(1));
}

#[actix_web::test]
async fn unknown_delegator_has_empty_summary() {
    let (_dir, store) = seeded_store("web-empty");
    let app = test::init_service(
        App::new()
            .app_data(Data::new(QueryService::new(store, "mtt")))
            .service(delegations::get_delegator_list),
    )
    .await;

    let body: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri("/delegatorList?delegator=mtt1nobody")
            .to_request(),
    )
    .await;
    assert_eq!(body["code"], json!(CODE_OK));
    assert_eq!(body["data"]["delegator"], json!("mtt1nobody"));
    assert_eq!(body["data"]["validators"], json!([]));
}
