use super::FilterError;
use crate::block::BlockEvent;
use regex::Regex;
use tracing::trace;

pub trait BlockEventFilter: Send + Sync {
    fn event_matches(&self, event: &BlockEvent) -> bool;

    /// Verdict given to a matched event: include or exclude
    fn include_match(&self) -> bool;
}

/// Matches a run of consecutive block events
pub trait RollingWindowFilter: Send + Sync {
    fn window_len(&self) -> usize;

    /// `window` always holds exactly [RollingWindowFilter::window_len] events
    fn events_match(&self, window: &[BlockEvent]) -> bool;

    /// Verdict given to every event of a matched window
    fn include_matches(&self) -> bool;
}

#[derive(Debug, Clone)]
pub struct DefaultBlockEventTypeFilter {
    pub event_type: String,
    pub include: bool,
}

#[derive(Debug, Clone)]
pub struct RegexBlockEventTypeFilter {
    pattern: Regex,
    include: bool,
}

/// Event types of consecutive events must match the patterns in order
#[derive(Debug, Clone)]
pub struct DefaultRollingWindowBlockEventFilter {
    patterns: Vec<Regex>,
    include: bool,
}

impl DefaultBlockEventTypeFilter {
    pub fn new(event_type: &str, include: bool) -> Self {
        Self {
            event_type: event_type.to_string(),
            include,
        }
    }
}

impl RegexBlockEventTypeFilter {
    pub fn new(pattern: &str, include: bool) -> Result<Self, FilterError> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            include,
        })
    }
}

impl DefaultRollingWindowBlockEventFilter {
    pub fn new(patterns: &[&str], include: bool) -> Result<Self, FilterError> {
        if patterns.is_empty() {
            return Err(FilterError::EmptyWindow);
        }
        let patterns = patterns
            .iter()
            .map(|pattern| Regex::new(pattern))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns, include })
    }
}

impl BlockEventFilter for DefaultBlockEventTypeFilter {
    fn event_matches(&self, event: &BlockEvent) -> bool {
        event.event_type() == self.event_type
    }

    fn include_match(&self) -> bool {
        self.include
    }
}

impl BlockEventFilter for RegexBlockEventTypeFilter {
    fn event_matches(&self, event: &BlockEvent) -> bool {
        self.pattern.is_match(event.event_type())
    }

    fn include_match(&self) -> bool {
        self.include
    }
}

impl RollingWindowFilter for DefaultRollingWindowBlockEventFilter {
    fn window_len(&self) -> usize {
        self.patterns.len()
    }

    fn events_match(&self, window: &[BlockEvent]) -> bool {
        self.patterns
            .iter()
            .zip(window)
            .all(|(pattern, event)| pattern.is_match(event.event_type()))
    }

    fn include_matches(&self) -> bool {
        self.include
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Verdict {
    include: bool,
    exclude: bool,
}

impl Verdict {
    fn record(&mut self, include: bool) {
        if include {
            self.include = true;
        } else {
            self.exclude = true;
        }
    }
}

/// Filters applied to the events of one lifecycle stage
#[derive(Default)]
pub struct BlockEventFilterRegistry {
    pub event_filters: Vec<Box<dyn BlockEventFilter>>,
    pub rolling_window_filters: Vec<Box<dyn RollingWindowFilter>>,
}

impl BlockEventFilterRegistry {
    pub fn is_empty(&self) -> bool {
        self.event_filters.is_empty() && self.rolling_window_filters.is_empty()
    }

    pub fn add_event_filter<F: BlockEventFilter + 'static>(&mut self, filter: F) {
        self.event_filters.push(Box::new(filter));
    }

    pub fn add_rolling_window_filter<F: RollingWindowFilter + 'static>(&mut self, filter: F) {
        self.rolling_window_filters.push(Box::new(filter));
    }

    /// Positions of the events to keep.
    ///
    /// With no filters every event is kept. Otherwise an event is kept when
    /// some filter that matched it includes it and none that matched it
    /// excludes it, independent of registration order.
    pub fn retained_indexes(&self, events: &[BlockEvent]) -> Vec<usize> {
        if self.is_empty() {
            return (0..events.len()).collect();
        }

        let mut verdicts = vec![Verdict::default(); events.len()];
        for (idx, event) in events.iter().enumerate() {
            for filter in &self.event_filters {
                if filter.event_matches(event) {
                    verdicts[idx].record(filter.include_match());
                }
            }
            for filter in &self.rolling_window_filters {
                let len = filter.window_len();
                if len == 0 || idx + len > events.len() {
                    continue;
                }
                if filter.events_match(&events[idx..idx + len]) {
                    for verdict in &mut verdicts[idx..idx + len] {
                        verdict.record(filter.include_matches());
                    }
                }
            }
        }

        verdicts
            .iter()
            .enumerate()
            .filter(|(_, verdict)| verdict.include && !verdict.exclude)
            .map(|(idx, _)| idx)
            .collect()
    }

    pub fn filter(&self, events: Vec<BlockEvent>) -> Vec<BlockEvent> {
        let retained = self.retained_indexes(&events);
        trace!("Keeping {} of {} block events", retained.len(), events.len());
        if retained.len() == events.len() {
            return events;
        }
        let mut retained = retained.into_iter().peekable();
        events
            .into_iter()
            .enumerate()
            .filter_map(|(idx, event)| {
                if retained.peek() == Some(&idx) {
                    retained.next();
                    Some(event)
                } else {
                    None
                }
            })
            .collect()
    }
}
