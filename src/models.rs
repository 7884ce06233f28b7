use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Opaque counter identity, assigned once at creation and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CounterId(pub u64);

impl fmt::Display for CounterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Counter {
    pub id: CounterId,
    pub name: String,
    pub count: u64,
    /// Most recent first. Decrements leave this untouched.
    #[serde(default)]
    pub timestamps: Vec<NaiveDateTime>,
    /// The day `count` is accumulating against.
    pub date: NaiveDate,
    #[serde(default)]
    pub all_time_high: u64,
    #[serde(default)]
    pub yesterday: u64,
}

impl Counter {
    pub fn new(id: CounterId, name: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            id,
            name: name.into(),
            count: 0,
            timestamps: Vec::new(),
            date,
            all_time_high: 0,
            yesterday: 0,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.count == 0 && self.timestamps.is_empty()
    }

    /// Zeroes the tally and moves the counter onto `today`.
    pub fn clear_for(&mut self, today: NaiveDate) {
        self.count = 0;
        self.timestamps.clear();
        self.date = today;
    }
}

/// Frozen copy of a finished day. Independent of the live counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedEntry {
    pub name: String,
    pub count: u64,
    #[serde(default)]
    pub timestamps: Vec<NaiveDateTime>,
}

impl From<&Counter> for ArchivedEntry {
    fn from(counter: &Counter) -> Self {
        Self {
            name: counter.name.clone(),
            count: counter.count,
            timestamps: counter.timestamps.clone(),
        }
    }
}

pub type HistoryLog = BTreeMap<NaiveDate, IndexMap<CounterId, ArchivedEntry>>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TallyState {
    pub counters: IndexMap<CounterId, Counter>,
    pub order: Vec<CounterId>,
    pub history: HistoryLog,
}

impl TallyState {
    /// Counters in display order. Ids without a counter are skipped.
    pub fn ordered_counters(&self) -> impl Iterator<Item = &Counter> {
        self.order.iter().filter_map(|id| self.counters.get(id))
    }

    /// Largest id ever issued, live or archived.
    pub fn highest_id(&self) -> Option<CounterId> {
        let live = self.counters.keys().copied().max();
        let archived = self
            .history
            .values()
            .flat_map(|day| day.keys().copied())
            .max();
        live.max(archived)
    }

    pub fn id_in_use(&self, id: CounterId) -> bool {
        self.counters.contains_key(&id) || self.history.values().any(|day| day.contains_key(&id))
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateCounterRequest {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ConfirmRequest {
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    pub date: Option<NaiveDate>,
    pub counter: Option<CounterId>,
}
