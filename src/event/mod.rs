//! Canonical event shapes and normalization of the node's log/event
//! variants into per-message event lists.

pub mod finalize;
pub mod normalize;

use serde::Deserializer;
use serde_derive::{Deserialize, Serialize};

pub use finalize::{split_finalize_block_events, LifecycleEvents};
pub use normalize::{normalize_message_logs, NormalizationError, MSG_INDEX_KEY};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub key: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub attributes: Vec<Attribute>,
}

/// Events emitted while executing one message of a transaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageLog {
    #[serde(default)]
    pub msg_index: u32,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub events: Vec<Event>,
}

impl Attribute {
    pub fn new(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

impl Event {
    pub fn new(event_type: &str, attributes: Vec<Attribute>) -> Self {
        Self {
            event_type: event_type.to_string(),
            attributes,
        }
    }

    /// Value of the first attribute named `key`
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.key == key)
            .map(|attr| attr.value.as_str())
    }
}

impl MessageLog {
    pub fn empty(msg_index: u32) -> Self {
        Self {
            msg_index,
            events: vec![],
        }
    }

    pub fn last_event(&self) -> Option<&Event> {
        self.events.last()
    }
}

pub(crate) fn null_as_empty<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + serde::Deserialize<'de>,
{
    let value: Option<T> = serde::Deserialize::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}
