//! Occurrence materialization.
//!
//! A series is stored once, at its anchor. Its occurrences are computed on
//! demand for a query window: occurrence `k` sits `k * delta` days from the
//! anchor (negative `k` before it). The anchor keeps the series id, every
//! other occurrence gets `<series_id>#<k>`.

use std::fmt;

use chrono::{Duration, Utc};
use tracing::warn;

use crate::constants::MAX_OCCURRENCES_PER_SERIES;
use crate::error::{NocalError, NocalResult};
use crate::event::{Event, RegularEvent, StoredEvent};

/// Closed window `[from, to]` in epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub from: i64,
    pub to: i64,
}

impl Window {
    pub fn new(from: i64, to: i64) -> NocalResult<Self> {
        if from > to {
            return Err(NocalError::Invalid(format!(
                "window start {from} is after its end {to}"
            )));
        }
        Ok(Window { from, to })
    }

    /// `days` on each side of now.
    pub fn around_now(days: i64) -> NocalResult<Self> {
        let now = Utc::now();
        let span = Duration::try_days(days);
        let from = span.and_then(|span| now.checked_sub_signed(span));
        let to = span.and_then(|span| now.checked_add_signed(span));

        match (from, to) {
            (Some(from), Some(to)) => Window::new(from.timestamp(), to.timestamp()),
            _ => Err(NocalError::Invalid(format!(
                "a window of {days} days around now is out of range"
            ))),
        }
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        self.from <= timestamp && timestamp <= self.to
    }
}

/// Identifies one occurrence of an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccurrenceId {
    pub series_id: String,
    pub index: i64,
}

impl OccurrenceId {
    pub fn new(series_id: &str, index: i64) -> Self {
        OccurrenceId {
            series_id: series_id.to_string(),
            index,
        }
    }

    /// Parse `<id>` or `<id>#<k>`. Anything else is taken as a plain id.
    pub fn parse(raw: &str) -> Self {
        if let Some((series_id, index)) = raw.rsplit_once('#')
            && let Ok(index) = index.parse::<i64>()
            && !series_id.is_empty()
        {
            return OccurrenceId::new(series_id, index);
        }
        OccurrenceId::new(raw, 0)
    }

    pub fn is_anchor(&self) -> bool {
        self.index == 0
    }
}

impl fmt::Display for OccurrenceId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_anchor() {
            write!(f, "{}", self.series_id)
        } else {
            write!(f, "{}#{}", self.series_id, self.index)
        }
    }
}

fn floor_div(a: i64, b: i64) -> i64 {
    a.div_euclid(b)
}

fn ceil_div(a: i64, b: i64) -> i64 {
    a.div_euclid(b) + i64::from(a.rem_euclid(b) != 0)
}

/// Copy of the series moved to its `index`-th slot.
fn make_occurrence(series: &Event, index: i64, timestamp: i64) -> Event {
    let mut occurrence = series.clone();
    occurrence.id = OccurrenceId::new(&series.id, index).to_string();
    occurrence.timestamp = timestamp;
    occurrence
}

/// The `index`-th occurrence of a series, if the series has one.
pub fn occurrence_at(series: &RegularEvent, index: i64) -> Option<Event> {
    let timestamp = series.slot_timestamp(index)?;
    Some(make_occurrence(&series.event, index, timestamp))
}

/// Expand a series into its occurrences inside `window`, ascending.
///
/// `detached_slot` is the slot currently replaced by a detached single event;
/// that occurrence is left out. Cost is proportional to the number of
/// occurrences in the window, not to the distance from the anchor.
pub fn expand_series(
    series: &RegularEvent,
    window: &Window,
    detached_slot: Option<i64>,
) -> Vec<Event> {
    let anchor = series.event.timestamp;

    let Some(step) = series.event.step_seconds() else {
        // Not repeating: the anchor is the only occurrence.
        if detached_slot != Some(anchor) && window.contains(anchor) {
            return vec![make_occurrence(&series.event, 0, anchor)];
        }
        return Vec::new();
    };

    let first = ceil_div(window.from.saturating_sub(anchor), step);
    let last = floor_div(window.to.saturating_sub(anchor), step);

    let mut occurrences = Vec::new();
    for index in first..=last {
        if occurrences.len() >= MAX_OCCURRENCES_PER_SERIES {
            warn!(
                series = %series.event.id,
                limit = MAX_OCCURRENCES_PER_SERIES,
                "occurrence expansion truncated"
            );
            break;
        }

        let Some(timestamp) = series.slot_timestamp(index) else {
            continue;
        };
        if detached_slot == Some(timestamp) || !window.contains(timestamp) {
            continue;
        }
        occurrences.push(make_occurrence(&series.event, index, timestamp));
    }
    occurrences
}

/// Occurrences of any stored event inside `window`.
pub fn occurrences_in(
    stored: &StoredEvent,
    window: &Window,
    detached_slot: Option<i64>,
) -> Vec<Event> {
    match stored {
        StoredEvent::Regular(series) => expand_series(series, window, detached_slot),
        StoredEvent::Single(single) if window.contains(single.event.timestamp) => {
            vec![single.event.clone()]
        }
        StoredEvent::Single(_) => Vec::new(),
    }
}
