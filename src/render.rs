//! Payloads handed to whatever draws the counters.
//!
//! Every mutation yields either a [`RenderSignal::Full`] (layout changed:
//! counters added or removed, rollover) or a [`RenderSignal::Counter`] (one
//! counter's tally changed and can be redrawn in place).

use crate::models::{Counter, CounterId};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

/// How many increment markers a counter card shows.
pub const RECENT_TIMESTAMPS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderSignal {
    Full(FullRefresh),
    Counter(CounterUpdate),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FullRefresh {
    pub counters: Vec<CounterView>,
    pub history: Vec<HistoryDay>,
    pub filters: FilterOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterUpdate {
    pub id: CounterId,
    pub count: u64,
    pub recent_timestamps: Vec<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterView {
    pub id: CounterId,
    pub name: String,
    pub count: u64,
    pub all_time_high: u64,
    pub yesterday: u64,
    pub date: NaiveDate,
    pub recent_timestamps: Vec<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryDay {
    pub date: NaiveDate,
    pub entries: Vec<HistoryEntryView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntryView {
    pub counter_id: CounterId,
    pub name: String,
    pub count: u64,
    pub timestamps: Vec<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterOptions {
    /// Newest first.
    pub dates: Vec<NaiveDate>,
    pub counters: Vec<CounterChoice>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CounterChoice {
    pub id: CounterId,
    pub name: String,
}

fn recent(counter: &Counter) -> Vec<NaiveDateTime> {
    counter
        .timestamps
        .iter()
        .take(RECENT_TIMESTAMPS)
        .copied()
        .collect()
}

impl From<&Counter> for CounterView {
    fn from(counter: &Counter) -> Self {
        Self {
            id: counter.id,
            name: counter.name.clone(),
            count: counter.count,
            all_time_high: counter.all_time_high,
            yesterday: counter.yesterday,
            date: counter.date,
            recent_timestamps: recent(counter),
        }
    }
}

impl From<&Counter> for CounterUpdate {
    fn from(counter: &Counter) -> Self {
        Self {
            id: counter.id,
            count: counter.count,
            recent_timestamps: recent(counter),
        }
    }
}
