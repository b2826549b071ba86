use crate::helpers::{amount, block, setup_new_db_dir, staking_parsers};
use rust_decimal_macros::dec;
use staking_indexer::{
    decode::{msg::MSG_DELEGATE, proto, Msg},
    event::{Attribute, Event, MessageLog},
    parser::{
        index_parsed_message, staking::DelegateParser, CommissionChange, IndexError,
        MessageContext, MessageParser, ParseError, ParsedMessage, ParserRegistry,
    },
    query::QueryService,
    record::{ClaimedTotal, CommissionRecord, DelegationType},
    store::{IndexerStore, StoreBatch},
};
use std::sync::Arc;

const DELEGATOR: &str = "mtt1delegator";
const VALIDATOR: &str = "mttvaloper1validator";

fn coin(amount: &str) -> Option<proto::Coin> {
    Some(proto::Coin {
        denom: "amtt".into(),
        amount: amount.into(),
    })
}

fn delegate(validator: &str, amount: &str) -> Msg {
    Msg::Delegate(proto::MsgDelegate {
        delegator_address: DELEGATOR.into(),
        validator_address: validator.into(),
        amount: coin(amount),
    })
}

fn undelegate(validator: &str, amount: &str) -> Msg {
    Msg::Undelegate(proto::MsgUndelegate {
        delegator_address: DELEGATOR.into(),
        validator_address: validator.into(),
        amount: coin(amount),
    })
}

fn withdraw_commission(validator: &str) -> Msg {
    Msg::WithdrawValidatorCommission(proto::MsgWithdrawValidatorCommission {
        validator_address: validator.into(),
    })
}

fn log_with(event_type: &str, amount: &str) -> MessageLog {
    MessageLog {
        msg_index: 0,
        events: vec![Event::new(event_type, vec![Attribute::new("amount", amount)])],
    }
}

/// Parse and index each message as its own tx at `height`, one transaction
/// for all of them
fn index_messages(
    store: &IndexerStore,
    registry: &ParserRegistry,
    height: u64,
    messages: Vec<(Msg, MessageLog)>,
) {
    let block = block(height);
    store
        .transaction(|batch| -> Result<(), IndexError> {
            for (n, (msg, log)) in messages.iter().enumerate() {
                let tx_hash = format!("TX{height}_{n}");
                let ctx = MessageContext {
                    block: &block,
                    tx_hash: &tx_hash,
                    message_index: 0,
                    type_url: msg.type_url(),
                };
                for parsed in registry.parse_message(msg, log) {
                    index_parsed_message(batch, &ctx, &parsed)?;
                }
            }
            Ok(())
        })
        .unwrap();
}

fn setup(prefix: &str) -> (tempfile::TempDir, Arc<IndexerStore>, QueryService) {
    let store_dir = setup_new_db_dir(prefix).unwrap();
    let store = Arc::new(IndexerStore::new(store_dir.path()).unwrap());
    let queries = QueryService::new(store.clone(), "mtt");
    (store_dir, store, queries)
}

#[test]
fn delegate_then_undelegate_nets_to_zero() {
    let (_dir, store, queries) = setup("indexing-net");
    let registry = staking_parsers();

    index_messages(&store, &registry, 1, vec![(delegate(VALIDATOR, "100"), MessageLog::empty(0))]);
    index_messages(&store, &registry, 2, vec![(undelegate(VALIDATOR, "100"), MessageLog::empty(0))]);

    let summary = queries.delegator_list(DELEGATOR).unwrap();
    assert_eq!(summary.validators, vec![VALIDATOR]);
    assert_eq!(summary.amount_for(VALIDATOR), Some(amount(0)));
    assert_eq!(summary.denom, "amtt");

    let history = queries.validator_history(VALIDATOR, 10, 0, true).unwrap();
    assert_eq!(history.total, 2);
    assert_eq!(history.records[0].delegation_type, DelegationType::Delegate);
    assert_eq!(history.records[1].delegation_type, DelegationType::Undelegate);
    assert_eq!(history.records[1].tx_hash, "TX2_0");
}

#[test]
fn delegator_records_mirror_validator_records() {
    let (_dir, store, queries) = setup("indexing-mirror");
    let registry = staking_parsers();
    index_messages(
        &store,
        &registry,
        7,
        vec![
            (delegate(VALIDATOR, "30"), MessageLog::empty(0)),
            (delegate("mttvaloper1other", "12"), MessageLog::empty(0)),
        ],
    );

    let by_delegator = queries.delegator_history(DELEGATOR, 10, 0, true).unwrap();
    assert_eq!(by_delegator.total, 2);
    assert_eq!(by_delegator.records[0].validator, VALIDATOR);
    assert_eq!(by_delegator.records[1].validator, "mttvaloper1other");

    let by_validator = queries.validator_history(VALIDATOR, 10, 0, true).unwrap();
    let mirrored = &by_delegator.records[0];
    let original = &by_validator.records[0];
    assert_eq!(mirrored.amount, original.amount);
    assert_eq!(mirrored.tx_hash, original.tx_hash);
    assert_eq!(mirrored.delegation_time, original.delegation_time);
    assert_eq!(mirrored.delegation_time, block(7).time);
}

#[test]
fn redelegation_moves_stake() {
    let (_dir, store, queries) = setup("indexing-redelegate");
    let registry = staking_parsers();
    let redelegate = Msg::BeginRedelegate(proto::MsgBeginRedelegate {
        delegator_address: DELEGATOR.into(),
        validator_src_address: "mttvaloper1src".into(),
        validator_dst_address: "mttvaloper1dst".into(),
        amount: coin("40"),
    });
    index_messages(
        &store,
        &registry,
        3,
        vec![
            (delegate("mttvaloper1src", "100"), MessageLog::empty(0)),
            (redelegate, MessageLog::empty(0)),
        ],
    );

    let summary = queries.delegator_list(DELEGATOR).unwrap();
    assert_eq!(summary.validators, vec!["mttvaloper1src", "mttvaloper1dst"]);
    assert_eq!(summary.amount_for("mttvaloper1src"), Some(amount(60)));
    assert_eq!(summary.amount_for("mttvaloper1dst"), Some(amount(40)));

    // source side is recorded before the destination side
    let history = queries.delegator_history(DELEGATOR, 10, 0, true).unwrap();
    let validators: Vec<_> = history.records.iter().map(|r| r.validator.as_str()).collect();
    assert_eq!(validators, vec!["mttvaloper1src", "mttvaloper1src", "mttvaloper1dst"]);
    assert!(history.records[1..]
        .iter()
        .all(|r| r.delegation_type == DelegationType::Redelegate));
}

#[test]
fn commission_withdrawals_accumulate() {
    let (_dir, store, _queries) = setup("indexing-claimed");
    let registry = staking_parsers();
    index_messages(
        &store,
        &registry,
        1,
        vec![(withdraw_commission(VALIDATOR), log_with("withdraw_commission", "150amtt"))],
    );
    index_messages(
        &store,
        &registry,
        2,
        vec![(withdraw_commission(VALIDATOR), log_with("withdraw_commission", "50amtt"))],
    );

    let claimed: ClaimedTotal = store.get(&ClaimedTotal::key_of(VALIDATOR)).unwrap().unwrap();
    assert_eq!(claimed.amount, amount(200));
}

const U256_MAX: &str =
    "115792089237316195423570985008687907853269984665640564039457584007913129639935";

#[test]
fn large_delegations_sum_exactly() {
    let (_dir, store, queries) = setup("indexing-large");
    let registry = staking_parsers();
    let half = "50000000000000000000000000000";
    index_messages(
        &store,
        &registry,
        1,
        vec![
            (delegate(VALIDATOR, half), MessageLog::empty(0)),
            (delegate(VALIDATOR, half), MessageLog::empty(0)),
            (delegate("mttvaloper1other", "200000000000000000000000000000"), MessageLog::empty(0)),
        ],
    );

    let summary = queries.delegator_list(DELEGATOR).unwrap();
    assert_eq!(
        summary.amount_for(VALIDATOR).map(|a| a.to_string()),
        Some("100000000000000000000000000000".to_string())
    );
    assert_eq!(
        summary.amount_for("mttvaloper1other").map(|a| a.to_string()),
        Some("200000000000000000000000000000".to_string())
    );
    assert_eq!(queries.validator_history(VALIDATOR, 10, 0, true).unwrap().total, 2);
}

#[test]
fn overflowing_summary_is_rolled_back() {
    let (_dir, store, queries) = setup("indexing-overflow");
    let registry = staking_parsers();
    index_messages(&store, &registry, 1, vec![(delegate(VALIDATOR, U256_MAX), MessageLog::empty(0))]);
    index_messages(&store, &registry, 2, vec![(delegate(VALIDATOR, "1"), MessageLog::empty(0))]);

    let summary = queries.delegator_list(DELEGATOR).unwrap();
    assert_eq!(summary.amount_for(VALIDATOR).map(|a| a.to_string()), Some(U256_MAX.to_string()));
    assert_eq!(queries.validator_history(VALIDATOR, 10, 0, true).unwrap().total, 1);

    // the store keeps accepting writes afterwards
    index_messages(&store, &registry, 3, vec![(delegate("mttvaloper1other", "5"), MessageLog::empty(0))]);
    assert_eq!(
        queries.delegator_list(DELEGATOR).unwrap().amount_for("mttvaloper1other"),
        Some(amount(5))
    );
}

#[test]
fn withdrawals_count_only_the_bond_denom() {
    let (_dir, store, queries) = setup("indexing-denoms");
    let registry = staking_parsers();
    let claim = Msg::WithdrawDelegatorReward(proto::MsgWithdrawDelegatorReward {
        delegator_address: DELEGATOR.into(),
        validator_address: VALIDATOR.into(),
    });
    index_messages(
        &store,
        &registry,
        1,
        vec![
            (delegate(VALIDATOR, "100"), MessageLog::empty(0)),
            (claim, log_with("withdraw_rewards", "5uatom,10amtt")),
            (withdraw_commission(VALIDATOR), log_with("withdraw_commission", "9uatom,300amtt")),
        ],
    );

    let history = queries.validator_history(VALIDATOR, 10, 0, true).unwrap();
    assert_eq!(history.records[1].delegation_type, DelegationType::Claim);
    assert_eq!(history.records[1].amount, amount(10));
    assert_eq!(history.records[1].denom, "amtt");
    assert_eq!(
        queries.delegator_list(DELEGATOR).unwrap().amount_for(VALIDATOR),
        Some(amount(90))
    );

    let claimed: ClaimedTotal = store.get(&ClaimedTotal::key_of(VALIDATOR)).unwrap().unwrap();
    assert_eq!(claimed.amount, amount(300));
}

#[test]
fn reward_claim_without_amount_is_zero() {
    let (_dir, store, queries) = setup("indexing-claim");
    let registry = staking_parsers();
    let claim = Msg::WithdrawDelegatorReward(proto::MsgWithdrawDelegatorReward {
        delegator_address: DELEGATOR.into(),
        validator_address: VALIDATOR.into(),
    });
    index_messages(&store, &registry, 1, vec![(claim, MessageLog::empty(0))]);

    let history = queries.validator_history(VALIDATOR, 10, 0, true).unwrap();
    assert_eq!(history.total, 1);
    assert_eq!(history.records[0].delegation_type, DelegationType::Claim);
    assert_eq!(history.records[0].amount, amount(0));
    assert_eq!(history.records[0].denom, "amtt");
    assert_eq!(
        queries.delegator_list(DELEGATOR).unwrap().amount_for(VALIDATOR),
        Some(amount(0))
    );
}

#[test]
fn creating_a_validator_records_rate_and_self_delegation() {
    let (_dir, store, queries) = setup("indexing-create");
    let registry = staking_parsers();
    let create = Msg::CreateValidator(proto::MsgCreateValidator {
        delegator_address: DELEGATOR.into(),
        validator_address: VALIDATOR.into(),
        commission: Some(proto::CommissionRates {
            rate: "100000000000000000".into(),
            ..Default::default()
        }),
        value: coin("1000"),
        ..Default::default()
    });
    let edit = Msg::EditValidator(proto::MsgEditValidator {
        validator_address: VALIDATOR.into(),
        ..Default::default()
    });
    index_messages(
        &store,
        &registry,
        1,
        vec![(create, MessageLog::empty(0)), (edit, MessageLog::empty(0))],
    );

    let commissions = queries.commission_records(VALIDATOR, 10, 0).unwrap();
    assert_eq!(commissions.total, 1);
    assert_eq!(commissions.records[0].commission, dec!(0.1));
    assert_eq!(
        queries.delegator_list(DELEGATOR).unwrap().amount_for(VALIDATOR),
        Some(amount(1000))
    );
}

#[test]
fn commission_records_list_newest_first() {
    let (_dir, store, queries) = setup("indexing-commission");
    let registry = staking_parsers();
    for (height, rate) in [(1, "0.05"), (2, "0.07"), (3, "0.09")] {
        let edit = Msg::EditValidator(proto::MsgEditValidator {
            validator_address: VALIDATOR.into(),
            commission_rate: rate.into(),
            ..Default::default()
        });
        index_messages(&store, &registry, height, vec![(edit, MessageLog::empty(0))]);
    }

    let page = queries.commission_records(VALIDATOR, 2, 0).unwrap();
    let rates: Vec<_> = page.records.iter().map(|r| r.commission).collect();
    assert_eq!(rates, vec![dec!(0.09), dec!(0.07)]);
    assert_eq!(page.total, 3);
}

/// Stages a commission record and then fails
struct ExplodingParser;

impl MessageParser for ExplodingParser {
    fn identifier(&self) -> &str {
        "exploding"
    }

    fn parse(&self, _msg: &Msg, _log: &MessageLog) -> Result<ParsedMessage, ParseError> {
        Ok(ParsedMessage::Commission(CommissionChange {
            validator: VALIDATOR.into(),
            rate: Some(dec!(0.5)),
        }))
    }

    fn index(
        &self,
        batch: &mut StoreBatch<'_>,
        ctx: &MessageContext<'_>,
        _payload: &ParsedMessage,
    ) -> Result<(), IndexError> {
        batch.put(&mut CommissionRecord {
            id: 0,
            validator: VALIDATOR.into(),
            commission: dec!(0.5),
            time: ctx.block.time,
        })?;
        Err(IndexError::UnexpectedPayload {
            parser: self.identifier().to_string(),
        })
    }
}

#[test]
fn failing_indexer_spares_the_others() {
    let (_dir, store, queries) = setup("indexing-contain");
    let mut registry = ParserRegistry::default();
    registry.register_message_parser(MSG_DELEGATE, Arc::new(ExplodingParser));
    registry.register_message_parser(MSG_DELEGATE, Arc::new(DelegateParser));

    index_messages(&store, &registry, 1, vec![(delegate(VALIDATOR, "5"), MessageLog::empty(0))]);

    assert_eq!(queries.commission_records(VALIDATOR, 10, 0).unwrap().total, 0);
    assert_eq!(
        queries.delegator_list(DELEGATOR).unwrap().amount_for(VALIDATOR),
        Some(amount(5))
    );
}
