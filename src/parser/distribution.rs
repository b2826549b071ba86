use super::{
    amount_of_denom, index_delegation, CommissionWithdrawal, DelegationActivity, IndexError,
    MessageContext, MessageParser, ParseError, ParsedMessage,
};
use crate::{
    amount::{Amount, AmountError},
    decode::Msg,
    event::MessageLog,
    record::{ClaimedTotal, DelegationType, StakeChange},
    store::StoreBatch,
};

pub const WITHDRAW_REWARDS_EVENT: &str = "withdraw_rewards";
pub const WITHDRAW_COMMISSION_EVENT: &str = "withdraw_commission";
const AMOUNT_KEY: &str = "amount";

/// Delegator claims rewards from one validator; recorded as a claim that
/// decreases the delegator's summary
pub struct WithdrawDelegatorRewardParser {
    pub bond_denom: String,
}

/// Validator operator withdraws accumulated commission
pub struct WithdrawValidatorCommissionParser {
    pub bond_denom: String,
}

/// Bond denom amount withdrawn by a message, read from its withdrawal
/// event or else from its final event. Other denoms in the coin list are
/// ignored and no amount at all means nothing was withdrawn.
fn withdrawn_amount(
    log: &MessageLog,
    event_type: &str,
    bond_denom: &str,
) -> Result<(Amount, String), ParseError> {
    let amount = log
        .events
        .iter()
        .rev()
        .find(|event| event.event_type == event_type)
        .or_else(|| log.last_event())
        .and_then(|event| event.attribute(AMOUNT_KEY))
        .filter(|amount| !amount.is_empty());
    let amount = match amount {
        Some(coins) => amount_of_denom(coins, bond_denom)?,
        None => Amount::zero(),
    };
    Ok((amount, bond_denom.to_string()))
}

impl MessageParser for WithdrawDelegatorRewardParser {
    fn identifier(&self) -> &str {
        "withdraw-delegator-reward"
    }

    fn parse(&self, msg: &Msg, log: &MessageLog) -> Result<ParsedMessage, ParseError> {
        let Msg::WithdrawDelegatorReward(msg) = msg else {
            return Err(ParseError::UnexpectedMessage {
                parser: self.identifier().to_string(),
                type_url: msg.type_url().to_string(),
            });
        };
        let (amount, denom) = withdrawn_amount(log, WITHDRAW_REWARDS_EVENT, &self.bond_denom)?;
        Ok(ParsedMessage::Delegation(DelegationActivity {
            delegator: msg.delegator_address.clone(),
            validator: msg.validator_address.clone(),
            amount,
            denom,
            kind: DelegationType::Claim,
            change: StakeChange::Decrease,
        }))
    }

    fn index(
        &self,
        batch: &mut StoreBatch<'_>,
        ctx: &MessageContext<'_>,
        payload: &ParsedMessage,
    ) -> Result<(), IndexError> {
        match payload {
            ParsedMessage::Delegation(activity) => index_delegation(batch, ctx, activity),
            _ => Err(IndexError::UnexpectedPayload {
                parser: self.identifier().to_string(),
            }),
        }
    }
}

impl MessageParser for WithdrawValidatorCommissionParser {
    fn identifier(&self) -> &str {
        "withdraw-validator-commission"
    }

    fn parse(&self, msg: &Msg, log: &MessageLog) -> Result<ParsedMessage, ParseError> {
        let Msg::WithdrawValidatorCommission(msg) = msg else {
            return Err(ParseError::UnexpectedMessage {
                parser: self.identifier().to_string(),
                type_url: msg.type_url().to_string(),
            });
        };
        let (amount, denom) =
            withdrawn_amount(log, WITHDRAW_COMMISSION_EVENT, &self.bond_denom)?;
        Ok(ParsedMessage::CommissionWithdrawal(CommissionWithdrawal {
            validator: msg.validator_address.clone(),
            amount,
            denom,
        }))
    }

    /// Read-modify-write of the validator's claimed total; the caller holds
    /// the store lock for the whole batch
    fn index(
        &self,
        batch: &mut StoreBatch<'_>,
        _ctx: &MessageContext<'_>,
        payload: &ParsedMessage,
    ) -> Result<(), IndexError> {
        let ParsedMessage::CommissionWithdrawal(withdrawal) = payload else {
            return Err(IndexError::UnexpectedPayload {
                parser: self.identifier().to_string(),
            });
        };
        let key = ClaimedTotal::key_of(&withdrawal.validator);
        let mut claimed = batch.get::<ClaimedTotal>(&key)?.unwrap_or(ClaimedTotal {
            validator: withdrawal.validator.clone(),
            amount: Amount::zero(),
        });
        claimed.amount = claimed
            .amount
            .checked_add(withdrawal.amount)
            .ok_or(AmountError::Overflow)?;
        batch.put(&mut claimed)?;
        Ok(())
    }
}
