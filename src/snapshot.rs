//! Daily samples of the bonded total and of each validator's rewards.

use crate::{
    amount::Amount,
    record::{ClaimedTotal, RewardRecord, Stake, StakeHistory},
    rpc::{
        query::{all_validators, bonded_tokens, validator_outstanding_rewards},
        ChainRpc, RpcError,
    },
    store::{IndexerStore, StoreError},
};
use chrono::{DateTime, Utc};
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tracing::{error, info, instrument};

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("reward sample for {0} overflowed")]
    Overflow(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotSummary {
    pub bonded: Amount,
    pub validators: usize,
}

/// Time left until the next 00:00 UTC
pub fn until_next_midnight(now: DateTime<Utc>) -> Duration {
    let next = now
        .date_naive()
        .succ_opt()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc());
    match next {
        Some(next) => (next - now).to_std().unwrap_or_default(),
        None => Duration::from_secs(24 * 60 * 60),
    }
}

/// Sample the bonded total and every validator's rewards at `now`.
///
/// All node queries happen first; the samples are then written in one
/// transaction. A validator's reward sample is its outstanding rewards
/// plus the commission it has withdrawn so far.
pub async fn take_snapshot<R: ChainRpc + ?Sized>(
    rpc: &R,
    store: &IndexerStore,
    bond_denom: &str,
    now: DateTime<Utc>,
) -> Result<SnapshotSummary, SnapshotError> {
    let bonded = bonded_tokens(rpc).await?;
    let validators = all_validators(rpc).await?;
    let mut outstanding = Vec::with_capacity(validators.len());
    for validator in validators {
        let rewards =
            validator_outstanding_rewards(rpc, &validator.operator_address, bond_denom).await?;
        outstanding.push((validator.operator_address, rewards));
    }

    store.transaction(|batch| -> Result<(), SnapshotError> {
        batch.put(&mut Stake { amount: bonded })?;
        batch.put(&mut StakeHistory {
            id: 0,
            amount: bonded,
            time: now,
        })?;

        for (validator, rewards) in &outstanding {
            let claimed = batch
                .get::<ClaimedTotal>(&ClaimedTotal::key_of(validator))?
                .map_or_else(Amount::zero, |claimed| claimed.amount);
            let amount = rewards
                .checked_add(claimed)
                .ok_or_else(|| SnapshotError::Overflow(validator.clone()))?;
            batch.put(&mut RewardRecord {
                id: 0,
                validator: validator.clone(),
                amount,
                time: now,
            })?;
        }
        Ok(())
    })?;

    Ok(SnapshotSummary {
        bonded,
        validators: outstanding.len(),
    })
}

/// Take a snapshot every day at 00:00 UTC. A failed run is logged and the
/// next one happens the following day.
#[instrument(skip_all)]
pub async fn run_daily<R: ChainRpc + 'static>(rpc: Arc<R>, store: Arc<IndexerStore>, bond_denom: String) {
    loop {
        let wait = until_next_midnight(Utc::now());
        info!("Next snapshot in {}s", wait.as_secs());
        tokio::time::sleep(wait).await;

        match take_snapshot(rpc.as_ref(), &store, &bond_denom, Utc::now()).await {
            Ok(summary) => info!(
                "Snapshot taken: bonded {} across {} validators",
                summary.bonded, summary.validators
            ),
            Err(e) => error!("Snapshot failed: {e}"),
        }
    }
}
