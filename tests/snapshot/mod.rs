use crate::{
    helpers::{amount, setup_new_db_dir, BOND_DENOM},
    mock::MockChain,
};
use chrono::{TimeZone, Utc};
use prost::Message;
use staking_indexer::{
    decode::proto,
    query::QueryService,
    record::ClaimedTotal,
    rpc::query::{OUTSTANDING_REWARDS_PATH, POOL_PATH, VALIDATORS_PATH},
    snapshot::{take_snapshot, SnapshotError},
    store::IndexerStore,
};
use std::sync::Arc;

fn validator(operator: &str) -> proto::Validator {
    proto::Validator {
        operator_address: operator.to_string(),
        ..Default::default()
    }
}

fn node_with_rewards() -> MockChain {
    let rpc = MockChain::default();
    rpc.set_abci(
        POOL_PATH,
        proto::QueryPoolResponse {
            pool: Some(proto::Pool {
                not_bonded_tokens: "10".into(),
                bonded_tokens: "5000".into(),
            }),
        }
        .encode_to_vec(),
    );
    rpc.set_abci(
        VALIDATORS_PATH,
        proto::QueryValidatorsResponse {
            validators: vec![validator("mttvaloper1a"), validator("mttvaloper1b")],
            pagination: Some(proto::PageResponse {
                next_key: vec![],
                total: 2,
            }),
        }
        .encode_to_vec(),
    );
    rpc.set_abci(
        OUTSTANDING_REWARDS_PATH,
        proto::QueryValidatorOutstandingRewardsResponse {
            rewards: Some(proto::ValidatorOutstandingRewards {
                rewards: vec![
                    proto::DecCoin {
                        denom: "uatom".into(),
                        amount: "9000000000000000000000".into(),
                    },
                    proto::DecCoin {
                        denom: BOND_DENOM.into(),
                        amount: "1500000000000000000000".into(),
                    },
                ],
            }),
        }
        .encode_to_vec(),
    );
    rpc
}

#[tokio::test]
async fn samples_stake_and_rewards() {
    let store_dir = setup_new_db_dir("snapshot-sample").unwrap();
    let store = Arc::new(IndexerStore::new(store_dir.path()).unwrap());
    store
        .transaction(|batch| {
            batch.put(&mut ClaimedTotal {
                validator: "mttvaloper1a".into(),
                amount: amount(200),
            })
        })
        .unwrap();

    let now = Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap();
    let summary = take_snapshot(&node_with_rewards(), &store, BOND_DENOM, now)
        .await
        .unwrap();
    assert_eq!(summary.bonded, amount(5000));
    assert_eq!(summary.validators, 2);

    let queries = QueryService::new(store.clone(), "mtt");
    let rewards_a = queries.reward_history("mttvaloper1a", 10, 0).unwrap();
    assert_eq!(rewards_a.total, 1);
    assert_eq!(rewards_a.records[0].amount, amount(1700));
    assert_eq!(rewards_a.records[0].time, now);
    assert_eq!(
        queries.reward_history("mttvaloper1b", 10, 0).unwrap().records[0].amount,
        amount(1500)
    );

    // live total first, then the stored sample
    let stake = queries.stake_history(10, 0).unwrap();
    assert_eq!(stake.total, 2);
    assert_eq!(stake.records[0].amount, amount(5000));
    assert_eq!(stake.records[1].amount, amount(5000));
    assert_eq!(stake.records[1].time, now);
}

#[tokio::test]
async fn failed_query_writes_nothing() {
    let store_dir = setup_new_db_dir("snapshot-fail").unwrap();
    let store = IndexerStore::new(store_dir.path()).unwrap();
    let rpc = MockChain::default();
    rpc.set_abci(
        POOL_PATH,
        proto::QueryPoolResponse {
            pool: Some(proto::Pool {
                not_bonded_tokens: "0".into(),
                bonded_tokens: "5000".into(),
            }),
        }
        .encode_to_vec(),
    );

    let outcome = take_snapshot(&rpc, &store, BOND_DENOM, Utc::now()).await;
    assert!(matches!(outcome, Err(SnapshotError::Rpc(_))));

    let queries = QueryService::new(Arc::new(store), "mtt");
    let stake = queries.stake_history(10, 0).unwrap();
    assert_eq!(stake.total, 1);
    assert_eq!(stake.records[0].amount, amount(0));
}
