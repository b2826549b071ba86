use super::{Event, NormalizationError};

pub const MODE_KEY: &str = "mode";
pub const BEGIN_BLOCK_MODE: &str = "BeginBlock";
pub const END_BLOCK_MODE: &str = "EndBlock";

/// Block level events split by where in the block's lifecycle they fired
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LifecycleEvents {
    pub begin_block: Vec<Event>,
    pub end_block: Vec<Event>,
}

/// Splits combined finalize-block events on their `mode` attribute, which
/// is removed. An event must name exactly one of the two modes.
pub fn split_finalize_block_events(
    events: Vec<Event>,
) -> Result<LifecycleEvents, NormalizationError> {
    let mut split = LifecycleEvents::default();
    for mut event in events {
        let begin = has_mode(&event, BEGIN_BLOCK_MODE);
        let end = has_mode(&event, END_BLOCK_MODE);
        if begin == end {
            return Err(NormalizationError::LifecycleMode {
                found: usize::from(begin) + usize::from(end),
                event_type: event.event_type,
            });
        }
        event.attributes.retain(|attr| attr.key != MODE_KEY);
        if begin {
            split.begin_block.push(event);
        } else {
            split.end_block.push(event);
        }
    }
    Ok(split)
}

fn has_mode(event: &Event, mode: &str) -> bool {
    event
        .attributes
        .iter()
        .any(|attr| attr.key == MODE_KEY && attr.value == mode)
}
