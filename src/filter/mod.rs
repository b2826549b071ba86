pub mod block_event;
pub mod message;

use crate::decode::msg::{
    MSG_BEGIN_REDELEGATE, MSG_CANCEL_UNBONDING_DELEGATION, MSG_CREATE_VALIDATOR,
    MSG_DELEGATE, MSG_EDIT_VALIDATOR, MSG_UNDELEGATE, MSG_WITHDRAW_DELEGATOR_REWARD,
    MSG_WITHDRAW_VALIDATOR_COMMISSION,
};
use thiserror::Error;

pub use block_event::{
    BlockEventFilter, BlockEventFilterRegistry, DefaultBlockEventTypeFilter,
    DefaultRollingWindowBlockEventFilter, RegexBlockEventTypeFilter, RollingWindowFilter,
};
pub use message::{
    message_should_index, message_type_should_index, DefaultMessageTypeFilter, MessageFilter,
    MessageTypeFilter, RegexMessageTypeFilter,
};

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("invalid filter pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("rolling window filter needs at least one pattern")]
    EmptyWindow,
}

/// Every filter the pipeline consults
#[derive(Default)]
pub struct FilterRegistry {
    pub message_type_filters: Vec<Box<dyn MessageTypeFilter>>,
    pub message_filters: Vec<Box<dyn MessageFilter>>,
    pub begin_block: BlockEventFilterRegistry,
    pub end_block: BlockEventFilterRegistry,
}

impl FilterRegistry {
    pub fn add_message_type_filter<F: MessageTypeFilter + 'static>(&mut self, filter: F) {
        self.message_type_filters.push(Box::new(filter));
    }

    pub fn add_message_filter<F: MessageFilter + 'static>(&mut self, filter: F) {
        self.message_filters.push(Box::new(filter));
    }
}

/// Type filters accepting the staking and distribution messages the
/// default parsers handle
pub fn default_message_type_filters() -> Result<Vec<RegexMessageTypeFilter>, FilterError> {
    [
        MSG_DELEGATE,
        MSG_UNDELEGATE,
        MSG_BEGIN_REDELEGATE,
        MSG_CANCEL_UNBONDING_DELEGATION,
        MSG_CREATE_VALIDATOR,
        MSG_EDIT_VALIDATOR,
        MSG_WITHDRAW_DELEGATOR_REWARD,
        MSG_WITHDRAW_VALIDATOR_COMMISSION,
    ]
    .iter()
    .map(|type_url| RegexMessageTypeFilter::new(&format!("^{}$", regex::escape(type_url)), false))
    .collect()
}
