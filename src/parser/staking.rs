use super::{
    index_delegation, parse_amount, parse_rate, CommissionChange, DelegationActivity,
    IndexError, MessageContext, MessageParser, ParseError, ParsedMessage,
};
use crate::{
    amount::Amount,
    decode::{proto::Coin, Msg},
    event::MessageLog,
    record::{CommissionRecord, DelegationType, StakeChange},
    store::StoreBatch,
};

pub struct DelegateParser;
pub struct UndelegateParser;
pub struct CreateValidatorParser;
pub struct CancelUnbondingParser;
pub struct RedelegateParser;
pub struct EditValidatorParser;

fn unexpected(parser: &str, msg: &Msg) -> ParseError {
    ParseError::UnexpectedMessage {
        parser: parser.to_string(),
        type_url: msg.type_url().to_string(),
    }
}

fn unexpected_payload(parser: &str) -> IndexError {
    IndexError::UnexpectedPayload {
        parser: parser.to_string(),
    }
}

fn coin_amount(coin: Option<&Coin>) -> Result<(Amount, String), ParseError> {
    let coin = coin.ok_or(ParseError::MissingAmount)?;
    Ok((parse_amount(&coin.amount)?, coin.denom.clone()))
}

fn activity(
    delegator: &str,
    validator: &str,
    coin: Option<&Coin>,
    kind: DelegationType,
    change: StakeChange,
) -> Result<DelegationActivity, ParseError> {
    let (amount, denom) = coin_amount(coin)?;
    Ok(DelegationActivity {
        delegator: delegator.to_string(),
        validator: validator.to_string(),
        amount,
        denom,
        kind,
        change,
    })
}

/// Index phase shared by handlers producing a single delegation
fn index_single_delegation(
    parser: &str,
    batch: &mut StoreBatch<'_>,
    ctx: &MessageContext<'_>,
    payload: &ParsedMessage,
) -> Result<(), IndexError> {
    match payload {
        ParsedMessage::Delegation(activity) => index_delegation(batch, ctx, activity),
        _ => Err(unexpected_payload(parser)),
    }
}

pub(crate) fn index_commission(
    batch: &mut StoreBatch<'_>,
    ctx: &MessageContext<'_>,
    change: &CommissionChange,
) -> Result<(), IndexError> {
    if let Some(rate) = change.rate {
        batch.put(&mut CommissionRecord {
            id: 0,
            validator: change.validator.clone(),
            commission: rate,
            time: ctx.block.time,
        })?;
    }
    Ok(())
}

impl MessageParser for DelegateParser {
    fn identifier(&self) -> &str {
        "delegate"
    }

    fn parse(&self, msg: &Msg, _log: &MessageLog) -> Result<ParsedMessage, ParseError> {
        let Msg::Delegate(msg) = msg else {
            return Err(unexpected(self.identifier(), msg));
        };
        activity(
            &msg.delegator_address,
            &msg.validator_address,
            msg.amount.as_ref(),
            DelegationType::Delegate,
            StakeChange::Increase,
        )
        .map(ParsedMessage::Delegation)
    }

    fn index(
        &self,
        batch: &mut StoreBatch<'_>,
        ctx: &MessageContext<'_>,
        payload: &ParsedMessage,
    ) -> Result<(), IndexError> {
        index_single_delegation(self.identifier(), batch, ctx, payload)
    }
}

impl MessageParser for UndelegateParser {
    fn identifier(&self) -> &str {
        "undelegate"
    }

    fn parse(&self, msg: &Msg, _log: &MessageLog) -> Result<ParsedMessage, ParseError> {
        let Msg::Undelegate(msg) = msg else {
            return Err(unexpected(self.identifier(), msg));
        };
        activity(
            &msg.delegator_address,
            &msg.validator_address,
            msg.amount.as_ref(),
            DelegationType::Undelegate,
            StakeChange::Decrease,
        )
        .map(ParsedMessage::Delegation)
    }

    fn index(
        &self,
        batch: &mut StoreBatch<'_>,
        ctx: &MessageContext<'_>,
        payload: &ParsedMessage,
    ) -> Result<(), IndexError> {
        index_single_delegation(self.identifier(), batch, ctx, payload)
    }
}

impl MessageParser for CancelUnbondingParser {
    fn identifier(&self) -> &str {
        "cancel-unbonding"
    }

    fn parse(&self, msg: &Msg, _log: &MessageLog) -> Result<ParsedMessage, ParseError> {
        let Msg::CancelUnbondingDelegation(msg) = msg else {
            return Err(unexpected(self.identifier(), msg));
        };
        activity(
            &msg.delegator_address,
            &msg.validator_address,
            msg.amount.as_ref(),
            DelegationType::CancelUnbonding,
            StakeChange::Increase,
        )
        .map(ParsedMessage::Delegation)
    }

    fn index(
        &self,
        batch: &mut StoreBatch<'_>,
        ctx: &MessageContext<'_>,
        payload: &ParsedMessage,
    ) -> Result<(), IndexError> {
        index_single_delegation(self.identifier(), batch, ctx, payload)
    }
}

impl MessageParser for CreateValidatorParser {
    fn identifier(&self) -> &str {
        "create-validator"
    }

    /// The self delegation counts as a delegation; the initial commission
    /// rate is recorded alongside
    fn parse(&self, msg: &Msg, _log: &MessageLog) -> Result<ParsedMessage, ParseError> {
        let Msg::CreateValidator(msg) = msg else {
            return Err(unexpected(self.identifier(), msg));
        };
        let delegation = activity(
            &msg.delegator_address,
            &msg.validator_address,
            msg.value.as_ref(),
            DelegationType::Delegate,
            StakeChange::Increase,
        )?;
        let rate = match &msg.commission {
            Some(rates) if !rates.rate.is_empty() => Some(parse_rate(&rates.rate)?),
            _ => None,
        };
        Ok(ParsedMessage::ValidatorCreation {
            delegation,
            commission: CommissionChange {
                validator: msg.validator_address.clone(),
                rate,
            },
        })
    }

    fn index(
        &self,
        batch: &mut StoreBatch<'_>,
        ctx: &MessageContext<'_>,
        payload: &ParsedMessage,
    ) -> Result<(), IndexError> {
        let ParsedMessage::ValidatorCreation {
            delegation,
            commission,
        } = payload
        else {
            return Err(unexpected_payload(self.identifier()));
        };
        index_delegation(batch, ctx, delegation)?;
        index_commission(batch, ctx, commission)
    }
}

impl MessageParser for RedelegateParser {
    fn identifier(&self) -> &str {
        "redelegate"
    }

    fn parse(&self, msg: &Msg, _log: &MessageLog) -> Result<ParsedMessage, ParseError> {
        let Msg::BeginRedelegate(msg) = msg else {
            return Err(unexpected(self.identifier(), msg));
        };
        let source = activity(
            &msg.delegator_address,
            &msg.validator_src_address,
            msg.amount.as_ref(),
            DelegationType::Redelegate,
            StakeChange::Decrease,
        )?;
        let destination = DelegationActivity {
            validator: msg.validator_dst_address.clone(),
            change: StakeChange::Increase,
            ..source.clone()
        };
        Ok(ParsedMessage::Redelegation {
            source,
            destination,
        })
    }

    /// Source side first, then destination side
    fn index(
        &self,
        batch: &mut StoreBatch<'_>,
        ctx: &MessageContext<'_>,
        payload: &ParsedMessage,
    ) -> Result<(), IndexError> {
        let ParsedMessage::Redelegation {
            source,
            destination,
        } = payload
        else {
            return Err(unexpected_payload(self.identifier()));
        };
        index_delegation(batch, ctx, source)?;
        index_delegation(batch, ctx, destination)
    }
}

impl MessageParser for EditValidatorParser {
    fn identifier(&self) -> &str {
        "edit-validator"
    }

    fn parse(&self, msg: &Msg, _log: &MessageLog) -> Result<ParsedMessage, ParseError> {
        let Msg::EditValidator(msg) = msg else {
            return Err(unexpected(self.identifier(), msg));
        };
        let rate = if msg.commission_rate.is_empty() {
            None
        } else {
            Some(parse_rate(&msg.commission_rate)?)
        };
        Ok(ParsedMessage::Commission(CommissionChange {
            validator: msg.validator_address.clone(),
            rate,
        }))
    }

    fn index(
        &self,
        batch: &mut StoreBatch<'_>,
        ctx: &MessageContext<'_>,
        payload: &ParsedMessage,
    ) -> Result<(), IndexError> {
        match payload {
            ParsedMessage::Commission(change) => index_commission(batch, ctx, change),
            _ => Err(unexpected_payload(self.identifier())),
        }
    }
}
