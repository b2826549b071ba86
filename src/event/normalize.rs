use super::{Event, MessageLog};
use std::num::ParseIntError;
use thiserror::Error;
use tracing::trace;

/// Attribute tagging a flat tx event with the message that emitted it
pub const MSG_INDEX_KEY: &str = "msg_index";

#[derive(Debug, Error)]
pub enum NormalizationError {
    #[error("event {event_type} carries unparseable msg_index {value:?}")]
    InvalidMsgIndex {
        event_type: String,
        value: String,
        #[source]
        source: ParseIntError,
    },
    #[error("finalize block event {event_type} carries {found} lifecycle modes, expected one")]
    LifecycleMode { event_type: String, found: usize },
}

/// One [MessageLog] per message of a transaction.
///
/// Failed transactions (`code != 0`) produce no logs. Otherwise the raw log
/// is read as a JSON list of per-message logs; when that yields nothing,
/// the flat event stream is bucketed by each event's `msg_index`.
pub fn normalize_message_logs(
    code: u32,
    raw_log: &str,
    events: &[Event],
    num_messages: usize,
) -> Result<Vec<MessageLog>, NormalizationError> {
    if code != 0 {
        return Ok(vec![]);
    }
    match parse_abci_logs(raw_log) {
        Some(logs) => Ok(place_logs(logs, num_messages)),
        None => bucket_by_msg_index(events, num_messages),
    }
}

fn parse_abci_logs(raw_log: &str) -> Option<Vec<MessageLog>> {
    serde_json::from_str::<Vec<MessageLog>>(raw_log)
        .ok()
        .filter(|logs| !logs.is_empty())
}

fn place_logs(logs: Vec<MessageLog>, num_messages: usize) -> Vec<MessageLog> {
    let mut placed = empty_logs(num_messages);
    for log in logs {
        let idx = log.msg_index as usize;
        if idx < num_messages {
            placed[idx].events = log.events;
        } else {
            trace!("Dropping log for out of range message {idx}");
        }
    }
    placed
}

fn bucket_by_msg_index(
    events: &[Event],
    num_messages: usize,
) -> Result<Vec<MessageLog>, NormalizationError> {
    let mut buckets = empty_logs(num_messages);
    for event in events {
        let Some(value) = event.attribute(MSG_INDEX_KEY) else {
            continue;
        };
        let idx: usize = value
            .parse()
            .map_err(|source| NormalizationError::InvalidMsgIndex {
                event_type: event.event_type.clone(),
                value: value.to_string(),
                source,
            })?;
        if idx < num_messages {
            buckets[idx].events.push(event.clone());
        }
    }
    Ok(buckets)
}

fn empty_logs(num_messages: usize) -> Vec<MessageLog> {
    (0..num_messages as u32).map(MessageLog::empty).collect()
}
