use crate::event::Event;
use chrono::{DateTime, Utc};
use serde_derive::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter, Result};

#[derive(PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Block {
    pub height: u64,
    pub chain_id: String,
    /// Consensus address of the proposer
    pub proposer: String,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockLifecycle {
    BeginBlock,
    EndBlock,
}

/// A block level event and its position within its lifecycle stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockEvent {
    pub index: usize,
    pub lifecycle: BlockLifecycle,
    pub event: Event,
}

impl BlockEvent {
    pub fn event_type(&self) -> &str {
        &self.event.event_type
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.event.attribute(key)
    }
}

/// Number the events of one lifecycle stage in emission order
pub fn block_events(lifecycle: BlockLifecycle, events: Vec<Event>) -> Vec<BlockEvent> {
    events
        .into_iter()
        .enumerate()
        .map(|(index, event)| BlockEvent {
            index,
            lifecycle,
            event,
        })
        .collect()
}

impl Debug for Block {
    fn fmt(&self, f: &mut Formatter) -> Result {
        write!(
            f,
            "Block {{ height: {}, chain: {}, proposer: {}, time: {} }}",
            self.height, self.chain_id, self.proposer, self.time
        )
    }
}
