//! Message and block event handlers.
//!
//! Handlers run in two phases: `parse` while a height is being processed,
//! and `index` later inside the flush worker's storage transaction.

pub mod distribution;
pub mod registry;
pub mod staking;

use crate::{
    amount::{Amount, AmountError},
    block::{Block, BlockEvent},
    decode::Msg,
    event::MessageLog,
    record::{DelegationType, DelegatorOutList, DelegatorRecord, StakeChange, ValidatorRecord},
    store::{StoreBatch, StoreError},
};
use rust_decimal::Decimal;
use std::{
    collections::BTreeMap,
    fmt::{Debug, Formatter},
    str::FromStr,
    sync::Arc,
};
use thiserror::Error;
use tracing::warn;

pub use registry::{register_staking_parsers, ParserRegistry};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("{parser} cannot handle {type_url}")]
    UnexpectedMessage { parser: String, type_url: String },
    #[error("message carries no amount")]
    MissingAmount,
    #[error("invalid amount {0:?}")]
    InvalidAmount(String),
    #[error("invalid commission rate {0:?}")]
    InvalidRate(String),
    #[error("block event {event_type} lacks attribute {key}")]
    MissingAttribute { event_type: String, key: String },
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{parser} received a payload it does not index")]
    UnexpectedPayload { parser: String },
    #[error(transparent)]
    Amount(#[from] AmountError),
}

/// One stake movement between a delegator and a validator
#[derive(Debug, Clone, PartialEq)]
pub struct DelegationActivity {
    pub delegator: String,
    pub validator: String,
    pub amount: Amount,
    pub denom: String,
    pub kind: DelegationType,
    pub change: StakeChange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommissionChange {
    pub validator: String,
    /// `None` when the message leaves the rate unchanged
    pub rate: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommissionWithdrawal {
    pub validator: String,
    pub amount: Amount,
    pub denom: String,
}

/// Output of a message parser's parse phase
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedMessage {
    Delegation(DelegationActivity),
    ValidatorCreation {
        delegation: DelegationActivity,
        commission: CommissionChange,
    },
    Redelegation {
        source: DelegationActivity,
        destination: DelegationActivity,
    },
    Commission(CommissionChange),
    CommissionWithdrawal(CommissionWithdrawal),
}

/// Output of a block event parser's parse phase: the event's attributes
/// by key, last value winning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedBlockEvent {
    pub event_type: String,
    pub fields: BTreeMap<String, String>,
}

/// Where a message sits, handed to indexers
#[derive(Debug, Clone, Copy)]
pub struct MessageContext<'a> {
    pub block: &'a Block,
    pub tx_hash: &'a str,
    pub message_index: usize,
    pub type_url: &'a str,
}

pub trait MessageParser: Send + Sync {
    fn identifier(&self) -> &str;

    fn parse(&self, msg: &Msg, log: &MessageLog) -> Result<ParsedMessage, ParseError>;

    fn index(
        &self,
        batch: &mut StoreBatch<'_>,
        ctx: &MessageContext<'_>,
        payload: &ParsedMessage,
    ) -> Result<(), IndexError>;
}

pub trait BlockEventParser: Send + Sync {
    fn identifier(&self) -> &str;

    fn parse(&self, event: &BlockEvent) -> Result<ParsedBlockEvent, ParseError>;

    fn index(
        &self,
        batch: &mut StoreBatch<'_>,
        block: &Block,
        event: &BlockEvent,
        payload: &ParsedBlockEvent,
    ) -> Result<(), IndexError>;
}

/// A message handler and the outcome of its parse phase
pub struct ParsedMessageData {
    pub parser: Arc<dyn MessageParser>,
    pub outcome: Result<ParsedMessage, ParseError>,
}

/// A block event handler and the outcome of its parse phase
pub struct ParsedBlockEventData {
    pub parser: Arc<dyn BlockEventParser>,
    pub outcome: Result<ParsedBlockEvent, ParseError>,
}

impl Debug for ParsedMessageData {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParsedMessageData")
            .field("parser", &self.parser.identifier())
            .field("outcome", &self.outcome)
            .finish()
    }
}

impl Debug for ParsedBlockEventData {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParsedBlockEventData")
            .field("parser", &self.parser.identifier())
            .field("outcome", &self.outcome)
            .finish()
    }
}

impl ParsedBlockEvent {
    pub fn from_event(event: &BlockEvent) -> Self {
        Self {
            event_type: event.event_type().to_string(),
            fields: event
                .event
                .attributes
                .iter()
                .map(|attr| (attr.key.clone(), attr.value.clone()))
                .collect(),
        }
    }

    pub fn field(&self, key: &str) -> Result<&str, ParseError> {
        self.fields
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| ParseError::MissingAttribute {
                event_type: self.event_type.clone(),
                key: key.to_string(),
            })
    }
}

/// Run a message handler's index phase.
///
/// A failed parse is skipped. A handler failure rolls back what the handler
/// staged and is logged; only storage failures propagate.
pub fn index_parsed_message(
    batch: &mut StoreBatch<'_>,
    ctx: &MessageContext<'_>,
    data: &ParsedMessageData,
) -> Result<(), IndexError> {
    let Ok(payload) = &data.outcome else {
        return Ok(());
    };
    contain(
        data.parser.identifier(),
        batch.isolated(|batch| data.parser.index(batch, ctx, payload)),
    )
}

pub fn index_parsed_block_event(
    batch: &mut StoreBatch<'_>,
    block: &Block,
    event: &BlockEvent,
    data: &ParsedBlockEventData,
) -> Result<(), IndexError> {
    let Ok(payload) = &data.outcome else {
        return Ok(());
    };
    contain(
        data.parser.identifier(),
        batch.isolated(|batch| data.parser.index(batch, block, event, payload)),
    )
}

fn contain(parser: &str, outcome: Result<(), IndexError>) -> Result<(), IndexError> {
    match outcome {
        Err(IndexError::Store(e)) => Err(IndexError::Store(e)),
        Err(e) => {
            warn!("Indexer {parser} failed, skipping its writes: {e}");
            Ok(())
        }
        Ok(()) => Ok(()),
    }
}

/// Stage the validator record, the delegator summary update and the
/// delegator mirror record for one activity, in that order
pub fn index_delegation(
    batch: &mut StoreBatch<'_>,
    ctx: &MessageContext<'_>,
    activity: &DelegationActivity,
) -> Result<(), IndexError> {
    let mut record = ValidatorRecord {
        id: 0,
        delegator: activity.delegator.clone(),
        validator: activity.validator.clone(),
        amount: activity.amount,
        denom: activity.denom.clone(),
        tx_hash: ctx.tx_hash.to_string(),
        delegation_type: activity.kind,
        delegation_time: ctx.block.time,
    };
    batch.put(&mut record)?;

    let summary_key = DelegatorOutList::key_of(&activity.delegator);
    let mut summary = batch
        .get::<DelegatorOutList>(&summary_key)?
        .unwrap_or_else(|| DelegatorOutList::new(&activity.delegator, &activity.denom));
    summary.apply(&activity.validator, activity.amount, activity.change)?;
    batch.put(&mut summary)?;

    batch.put(&mut DelegatorRecord::from(&record))?;
    Ok(())
}

pub fn parse_amount(amount: &str) -> Result<Amount, ParseError> {
    Amount::from_dec_str(amount).map_err(|_| ParseError::InvalidAmount(amount.to_string()))
}

/// Split a coin list such as `7uatom,1500amtt` into amounts and denoms
pub fn parse_coins(coins: &str) -> Result<Vec<(Amount, String)>, ParseError> {
    coins
        .split(',')
        .map(str::trim)
        .filter(|coin| !coin.is_empty())
        .map(|coin| {
            let split = coin
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(coin.len());
            let (amount, denom) = coin.split_at(split);
            if amount.is_empty() || denom.is_empty() {
                return Err(ParseError::InvalidAmount(coins.to_string()));
            }
            Ok((parse_amount(amount)?, denom.to_string()))
        })
        .collect()
}

/// Amount of `denom` in a coin list, zero when the list has none
pub fn amount_of_denom(coins: &str, denom: &str) -> Result<Amount, ParseError> {
    Ok(parse_coins(coins)?
        .into_iter()
        .find(|(_, coin_denom)| coin_denom == denom)
        .map_or_else(Amount::zero, |(amount, _)| amount))
}

/// Rates travel either as decimals or as integers scaled by 10^18
pub fn parse_rate(rate: &str) -> Result<Decimal, ParseError> {
    let invalid = || ParseError::InvalidRate(rate.to_string());
    if rate.contains('.') {
        return Decimal::from_str(rate).map_err(|_| invalid());
    }
    let scaled: i128 = rate.parse().map_err(|_| invalid())?;
    Decimal::try_from_i128_with_scale(scaled, 18)
        .map(|rate| rate.normalize())
        .map_err(|_| invalid())
}
