//! Timestamp index over song events.
//!
//! A [`Timeline`] maps every integer millisecond that has something to play to
//! the action ids due at that instant, in source order.

use std::collections::HashMap;

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single typed event: `action_id` is due at `timestamp_ms`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub timestamp_ms: u64,
    pub action_id: String,
}

impl Event {
    pub fn new(timestamp_ms: u64, action_id: impl Into<String>) -> Self {
        Self {
            timestamp_ms,
            action_id: action_id.into(),
        }
    }
}

/// Raw `{key, time}` record as it appears in a song file.
///
/// `time` stays untyped until the record is indexed so that malformed
/// timestamps can be dropped per record instead of failing the whole load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteRecord {
    pub key: String,
    #[serde(default)]
    pub time: Value,
}

impl NoteRecord {
    pub fn new(key: impl Into<String>, time: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            time: time.into(),
        }
    }
}

/// Counts produced while indexing raw records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub accepted: usize,
    pub dropped: usize,
}

/// Read-only index from millisecond timestamp to the actions due then.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timeline {
    actions: HashMap<u64, Vec<String>>,
    max_timestamp_ms: u64,
    event_count: usize,
}

impl Timeline {
    /// Index raw records, silently dropping those with a malformed timestamp.
    pub fn build<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a NoteRecord>,
    {
        Self::build_with_report(records).0
    }

    /// Same as [`Timeline::build`], also returning how many records were kept.
    pub fn build_with_report<'a, I>(records: I) -> (Self, BuildReport)
    where
        I: IntoIterator<Item = &'a NoteRecord>,
    {
        let mut report = BuildReport::default();
        let events = records.into_iter().filter_map(|record| {
            match parse_timestamp(&record.time) {
                Some(timestamp_ms) => {
                    report.accepted += 1;
                    Some(Event::new(timestamp_ms, record.key.clone()))
                }
                None => {
                    report.dropped += 1;
                    None
                }
            }
        });
        let timeline = Self::from_events(events);
        if report.dropped > 0 {
            debug!(
                "timeline: dropped {} record(s) with malformed timestamps, kept {}",
                report.dropped, report.accepted
            );
        }
        (timeline, report)
    }

    /// Index events whose timestamps are already known to be valid.
    pub fn from_events<I>(events: I) -> Self
    where
        I: IntoIterator<Item = Event>,
    {
        let mut timeline = Self::default();
        for event in events {
            timeline.max_timestamp_ms = timeline.max_timestamp_ms.max(event.timestamp_ms);
            timeline
                .actions
                .entry(event.timestamp_ms)
                .or_default()
                .push(event.action_id);
            timeline.event_count += 1;
        }
        timeline
    }

    /// Action ids due at `timestamp_ms`, in source order.
    pub fn actions_at(&self, timestamp_ms: u64) -> &[String] {
        self.actions
            .get(&timestamp_ms)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Largest timestamp present, or 0 when the timeline is empty.
    pub fn max_timestamp_ms(&self) -> u64 {
        self.max_timestamp_ms
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Number of distinct timestamps.
    pub fn timestamp_count(&self) -> usize {
        self.actions.len()
    }

    /// Number of indexed events across all timestamps.
    pub fn event_count(&self) -> usize {
        self.event_count
    }

    /// Distinct timestamps in ascending order.
    pub fn timestamps(&self) -> Vec<u64> {
        let mut timestamps: Vec<u64> = self.actions.keys().copied().collect();
        timestamps.sort_unstable();
        timestamps
    }
}

/// Coerce a raw `time` value to whole milliseconds.
///
/// Integers pass through, finite floats are truncated toward zero, and strings
/// must hold a (whitespace padded) integer. Negative values are rejected.
/// Booleans are rejected too: `true` is not a timestamp, even though some
/// integer conversions would read it as 1.
pub fn parse_timestamp(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => {
            if let Some(ms) = number.as_u64() {
                return Some(ms);
            }
            if number.is_i64() {
                return None;
            }
            let ms = number.as_f64()?.trunc();
            if ms.is_finite() && ms >= 0.0 && ms <= u64::MAX as f64 {
                Some(ms as u64)
            } else {
                None
            }
        }
        Value::String(text) => {
            let ms = text.trim().parse::<i64>().ok()?;
            u64::try_from(ms).ok()
        }
        _ => None,
    }
}
