use super::{
    distribution::{WithdrawDelegatorRewardParser, WithdrawValidatorCommissionParser},
    staking::{
        CancelUnbondingParser, CreateValidatorParser, DelegateParser, EditValidatorParser,
        RedelegateParser, UndelegateParser,
    },
    BlockEventParser, MessageParser, ParsedBlockEventData, ParsedMessageData,
};
use crate::{
    block::{BlockEvent, BlockLifecycle},
    decode::{msg::*, Msg},
    event::MessageLog,
};
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, warn};

/// Handlers by message type URL and by block event type, each list in
/// registration order
#[derive(Default)]
pub struct ParserRegistry {
    message_parsers: HashMap<String, Vec<Arc<dyn MessageParser>>>,
    begin_block_parsers: HashMap<String, Vec<Arc<dyn BlockEventParser>>>,
    end_block_parsers: HashMap<String, Vec<Arc<dyn BlockEventParser>>>,
}

impl ParserRegistry {
    pub fn register_message_parser(&mut self, type_url: &str, parser: Arc<dyn MessageParser>) {
        debug!("Registering message parser {} for {type_url}", parser.identifier());
        self.message_parsers
            .entry(type_url.to_string())
            .or_default()
            .push(parser);
    }

    pub fn register_block_event_parser(
        &mut self,
        lifecycle: BlockLifecycle,
        event_type: &str,
        parser: Arc<dyn BlockEventParser>,
    ) {
        debug!(
            "Registering {lifecycle:?} event parser {} for {event_type}",
            parser.identifier()
        );
        self.block_event_parsers_mut(lifecycle)
            .entry(event_type.to_string())
            .or_default()
            .push(parser);
    }

    pub fn has_message_parser(&self, type_url: &str) -> bool {
        self.message_parsers
            .get(type_url)
            .map_or(false, |parsers| !parsers.is_empty())
    }

    pub fn message_parsers(&self, type_url: &str) -> &[Arc<dyn MessageParser>] {
        self.message_parsers
            .get(type_url)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn block_event_parsers(
        &self,
        lifecycle: BlockLifecycle,
        event_type: &str,
    ) -> &[Arc<dyn BlockEventParser>] {
        let parsers = match lifecycle {
            BlockLifecycle::BeginBlock => &self.begin_block_parsers,
            BlockLifecycle::EndBlock => &self.end_block_parsers,
        };
        parsers
            .get(event_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Parse phase of every handler registered for the message's type.
    /// Each outcome is kept on its own so one failure spares the rest.
    pub fn parse_message(&self, msg: &Msg, log: &MessageLog) -> Vec<ParsedMessageData> {
        self.message_parsers(msg.type_url())
            .iter()
            .map(|parser| {
                let outcome = parser.parse(msg, log);
                if let Err(e) = &outcome {
                    warn!("Parser {} failed on {}: {e}", parser.identifier(), msg.type_url());
                }
                ParsedMessageData {
                    parser: parser.clone(),
                    outcome,
                }
            })
            .collect()
    }

    pub fn parse_block_event(&self, event: &BlockEvent) -> Vec<ParsedBlockEventData> {
        self.block_event_parsers(event.lifecycle, event.event_type())
            .iter()
            .map(|parser| {
                let outcome = parser.parse(event);
                if let Err(e) = &outcome {
                    warn!(
                        "Block event parser {} failed on {}: {e}",
                        parser.identifier(),
                        event.event_type()
                    );
                }
                ParsedBlockEventData {
                    parser: parser.clone(),
                    outcome,
                }
            })
            .collect()
    }

    fn block_event_parsers_mut(
        &mut self,
        lifecycle: BlockLifecycle,
    ) -> &mut HashMap<String, Vec<Arc<dyn BlockEventParser>>> {
        match lifecycle {
            BlockLifecycle::BeginBlock => &mut self.begin_block_parsers,
            BlockLifecycle::EndBlock => &mut self.end_block_parsers,
        }
    }
}

/// Install the staking and distribution handlers
pub fn register_staking_parsers(registry: &mut ParserRegistry, bond_denom: &str) {
    registry.register_message_parser(MSG_DELEGATE, Arc::new(DelegateParser));
    registry.register_message_parser(MSG_UNDELEGATE, Arc::new(UndelegateParser));
    registry.register_message_parser(MSG_CREATE_VALIDATOR, Arc::new(CreateValidatorParser));
    registry.register_message_parser(
        MSG_CANCEL_UNBONDING_DELEGATION,
        Arc::new(CancelUnbondingParser),
    );
    registry.register_message_parser(MSG_BEGIN_REDELEGATE, Arc::new(RedelegateParser));
    registry.register_message_parser(MSG_EDIT_VALIDATOR, Arc::new(EditValidatorParser));
    registry.register_message_parser(
        MSG_WITHDRAW_DELEGATOR_REWARD,
        Arc::new(WithdrawDelegatorRewardParser {
            bond_denom: bond_denom.to_string(),
        }),
    );
    registry.register_message_parser(
        MSG_WITHDRAW_VALIDATOR_COMMISSION,
        Arc::new(WithdrawValidatorCommissionParser {
            bond_denom: bond_denom.to_string(),
        }),
    );
}
