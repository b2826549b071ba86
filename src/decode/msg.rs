use super::{
    address::{AddressCodec, AddressError},
    proto,
};
use prost::Message;

pub const MSG_DELEGATE: &str = "/cosmos.staking.v1beta1.MsgDelegate";
pub const MSG_UNDELEGATE: &str = "/cosmos.staking.v1beta1.MsgUndelegate";
pub const MSG_BEGIN_REDELEGATE: &str = "/cosmos.staking.v1beta1.MsgBeginRedelegate";
pub const MSG_CANCEL_UNBONDING_DELEGATION: &str =
    "/cosmos.staking.v1beta1.MsgCancelUnbondingDelegation";
pub const MSG_CREATE_VALIDATOR: &str = "/cosmos.staking.v1beta1.MsgCreateValidator";
pub const MSG_EDIT_VALIDATOR: &str = "/cosmos.staking.v1beta1.MsgEditValidator";
pub const MSG_WITHDRAW_DELEGATOR_REWARD: &str =
    "/cosmos.distribution.v1beta1.MsgWithdrawDelegatorReward";
pub const MSG_WITHDRAW_VALIDATOR_COMMISSION: &str =
    "/cosmos.distribution.v1beta1.MsgWithdrawValidatorCommission";
pub const MSG_SEND: &str = "/cosmos.bank.v1beta1.MsgSend";

/// A transaction message resolved into one of the types the indexer knows
#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    Delegate(proto::MsgDelegate),
    Undelegate(proto::MsgUndelegate),
    BeginRedelegate(proto::MsgBeginRedelegate),
    CancelUnbondingDelegation(proto::MsgCancelUnbondingDelegation),
    CreateValidator(proto::MsgCreateValidator),
    EditValidator(proto::MsgEditValidator),
    WithdrawDelegatorReward(proto::MsgWithdrawDelegatorReward),
    WithdrawValidatorCommission(proto::MsgWithdrawValidatorCommission),
    Send(proto::MsgSend),
    /// Kept verbatim by the lenient decoder
    Unknown(proto::Any),
}

impl Msg {
    /// Resolve `any`; `Ok(None)` when its type URL is not a known message
    pub fn from_any(any: &proto::Any) -> Result<Option<Self>, prost::DecodeError> {
        let bytes = any.value.as_slice();
        let msg = match any.type_url.as_str() {
            MSG_DELEGATE => Msg::Delegate(Message::decode(bytes)?),
            MSG_UNDELEGATE => Msg::Undelegate(Message::decode(bytes)?),
            MSG_BEGIN_REDELEGATE => Msg::BeginRedelegate(Message::decode(bytes)?),
            MSG_CANCEL_UNBONDING_DELEGATION => {
                Msg::CancelUnbondingDelegation(Message::decode(bytes)?)
            }
            MSG_CREATE_VALIDATOR => Msg::CreateValidator(Message::decode(bytes)?),
            MSG_EDIT_VALIDATOR => Msg::EditValidator(Message::decode(bytes)?),
            MSG_WITHDRAW_DELEGATOR_REWARD => Msg::WithdrawDelegatorReward(Message::decode(bytes)?),
            MSG_WITHDRAW_VALIDATOR_COMMISSION => {
                Msg::WithdrawValidatorCommission(Message::decode(bytes)?)
            }
            MSG_SEND => Msg::Send(Message::decode(bytes)?),
            _ => return Ok(None),
        };
        Ok(Some(msg))
    }

    pub fn type_url(&self) -> &str {
        match self {
            Msg::Delegate(_) => MSG_DELEGATE,
            Msg::Undelegate(_) => MSG_UNDELEGATE,
            Msg::BeginRedelegate(_) => MSG_BEGIN_REDELEGATE,
            Msg::CancelUnbondingDelegation(_) => MSG_CANCEL_UNBONDING_DELEGATION,
            Msg::CreateValidator(_) => MSG_CREATE_VALIDATOR,
            Msg::EditValidator(_) => MSG_EDIT_VALIDATOR,
            Msg::WithdrawDelegatorReward(_) => MSG_WITHDRAW_DELEGATOR_REWARD,
            Msg::WithdrawValidatorCommission(_) => MSG_WITHDRAW_VALIDATOR_COMMISSION,
            Msg::Send(_) => MSG_SEND,
            Msg::Unknown(any) => &any.type_url,
        }
    }

    /// Account addresses that must sign this message. Operator addresses
    /// are re-encoded under the account prefix.
    pub fn signers(&self, codec: &AddressCodec) -> Result<Vec<String>, AddressError> {
        let signer = match self {
            Msg::Delegate(msg) => msg.delegator_address.clone(),
            Msg::Undelegate(msg) => msg.delegator_address.clone(),
            Msg::BeginRedelegate(msg) => msg.delegator_address.clone(),
            Msg::CancelUnbondingDelegation(msg) => msg.delegator_address.clone(),
            Msg::CreateValidator(msg) => codec.operator_to_account(&msg.validator_address)?,
            Msg::EditValidator(msg) => codec.operator_to_account(&msg.validator_address)?,
            Msg::WithdrawDelegatorReward(msg) => msg.delegator_address.clone(),
            Msg::WithdrawValidatorCommission(msg) => {
                codec.operator_to_account(&msg.validator_address)?
            }
            Msg::Send(msg) => msg.from_address.clone(),
            Msg::Unknown(_) => return Ok(vec![]),
        };
        Ok(vec![signer])
    }
}
