use super::FilterError;
use crate::{decode::Msg, event::MessageLog};
use regex::Regex;

/// Decides from a message's type URL alone whether it is of interest
pub trait MessageTypeFilter: Send + Sync {
    fn matches(&self, type_url: &str) -> bool;

    /// A matching ignore filter excludes the message outright
    fn ignore(&self) -> bool;
}

/// Inspects a decoded message and its events
pub trait MessageFilter: Send + Sync {
    fn should_index(&self, msg: &Msg, log: &MessageLog) -> bool;
}

#[derive(Debug, Clone)]
pub struct DefaultMessageTypeFilter {
    pub message_type: String,
    pub ignore: bool,
}

#[derive(Debug, Clone)]
pub struct RegexMessageTypeFilter {
    pattern: Regex,
    ignore: bool,
}

impl DefaultMessageTypeFilter {
    pub fn new(message_type: &str, ignore: bool) -> Self {
        Self {
            message_type: message_type.to_string(),
            ignore,
        }
    }
}

impl RegexMessageTypeFilter {
    pub fn new(pattern: &str, ignore: bool) -> Result<Self, FilterError> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            ignore,
        })
    }
}

impl MessageTypeFilter for DefaultMessageTypeFilter {
    fn matches(&self, type_url: &str) -> bool {
        self.message_type == type_url
    }

    fn ignore(&self) -> bool {
        self.ignore
    }
}

impl MessageTypeFilter for RegexMessageTypeFilter {
    fn matches(&self, type_url: &str) -> bool {
        self.pattern.is_match(type_url)
    }

    fn ignore(&self) -> bool {
        self.ignore
    }
}

/// Whether a message of `type_url` passes the type filters.
///
/// A registered custom parser always wins. Otherwise any matching ignore
/// filter rejects, any other match accepts, and no match rejects. With no
/// filters at all every type is indexed.
pub fn message_type_should_index(
    type_url: &str,
    filters: &[Box<dyn MessageTypeFilter>],
    has_custom_parser: bool,
) -> bool {
    if has_custom_parser {
        return true;
    }
    if filters.is_empty() {
        return true;
    }

    let mut matched = false;
    for filter in filters {
        if filter.matches(type_url) {
            if filter.ignore() {
                return false;
            }
            matched = true;
        }
    }
    matched
}

/// Content filters are alternatives: the first one to accept wins
pub fn message_should_index(
    msg: &Msg,
    log: &MessageLog,
    filters: &[Box<dyn MessageFilter>],
) -> bool {
    filters.is_empty() || filters.iter().any(|filter| filter.should_index(msg, log))
}
