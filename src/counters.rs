use crate::clock::Clock;
use crate::confirm::Confirm;
use crate::errors::{StorageError, TallyError};
use crate::history;
use crate::models::{Counter, CounterId, TallyState};
use crate::render::{CounterUpdate, CounterView, FullRefresh, HistoryDay, RenderSignal};
use crate::rollover::{roll_over, RolloverReport};
use crate::storage::{KeyValueStore, StateStore};
use chrono::NaiveDate;
use tracing::{debug, error, info};

/// Owns the live state and writes it through to storage after every change.
///
/// Operations that find their precondition unmet (decrement at zero, a
/// declined prompt, a blank name) return `None` and leave state alone.
pub struct Tracker<S, C> {
    state: TallyState,
    store: StateStore<S>,
    clock: C,
    last_id: Option<CounterId>,
}

impl<S: KeyValueStore, C: Clock> Tracker<S, C> {
    /// Loads persisted state and rolls any stale counters over to today.
    pub fn open(backend: S, clock: C) -> Self {
        let store = StateStore::new(backend);
        let state = store.load();
        let last_id = state.highest_id();
        let mut tracker = Self {
            state,
            store,
            clock,
            last_id,
        };
        info!(
            "loaded {} counter(s), {} history day(s)",
            tracker.state.counters.len(),
            tracker.state.history.len()
        );
        tracker.check_new_day();
        tracker
    }

    pub fn state(&self) -> &TallyState {
        &self.state
    }

    pub fn counter(&self, id: CounterId) -> Option<&Counter> {
        self.state.counters.get(&id)
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn into_backend(self) -> S {
        self.store.into_backend()
    }

    pub fn create(&mut self, name: &str) -> Option<RenderSignal> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let id = self.next_id();
        let counter = Counter::new(id, name, self.clock.today());
        self.state.counters.insert(id, counter);
        self.state.order.push(id);
        info!("created counter {name} ({id})");
        self.persist();
        Some(RenderSignal::Full(self.full_refresh()))
    }

    /// Also moves the counter's date to today. If the day changed without a
    /// rollover, the previous tally is carried into today rather than
    /// archived.
    pub fn increment(&mut self, id: CounterId) -> Result<RenderSignal, TallyError> {
        let now = self.clock.now();
        let counter = self.counter_mut(id)?;
        counter.count = counter.count.saturating_add(1);
        counter.all_time_high = counter.all_time_high.max(counter.count);
        counter.timestamps.insert(0, now);
        counter.date = now.date();
        debug!("incremented {} to {}", counter.name, counter.count);
        let update = CounterUpdate::from(&*counter);
        self.persist();
        Ok(RenderSignal::Counter(update))
    }

    /// Leaves increment timestamps in place.
    pub fn decrement(&mut self, id: CounterId) -> Result<Option<RenderSignal>, TallyError> {
        let today = self.clock.today();
        let counter = self.counter_mut(id)?;
        if counter.count == 0 {
            return Ok(None);
        }
        counter.count -= 1;
        counter.date = today;
        debug!("decremented {} to {}", counter.name, counter.count);
        let update = CounterUpdate::from(&*counter);
        self.persist();
        Ok(Some(RenderSignal::Counter(update)))
    }

    /// Archives under the counter's current date, which may predate today.
    pub fn reset_counter(
        &mut self,
        id: CounterId,
        confirm: &mut impl Confirm,
    ) -> Result<Option<RenderSignal>, TallyError> {
        let counter = self.counter_ref(id)?;
        if counter.is_blank() {
            return Ok(None);
        }
        let message = format!("Reset today's count for \"{}\"?", counter.name);
        if !confirm.confirm(&message) {
            return Ok(None);
        }

        let today = self.clock.today();
        let TallyState {
            counters, history, ..
        } = &mut self.state;
        let counter = counters.get_mut(&id).ok_or(TallyError::UnknownCounter(id))?;
        history::archive(history, id, counter);
        counter.clear_for(today);
        info!("reset counter {} ({id})", counter.name);
        let update = CounterUpdate::from(&*counter);
        self.persist();
        Ok(Some(RenderSignal::Counter(update)))
    }

    /// History recorded for the counter is kept.
    pub fn delete_counter(
        &mut self,
        id: CounterId,
        confirm: &mut impl Confirm,
    ) -> Result<Option<RenderSignal>, TallyError> {
        let counter = self.counter_ref(id)?;
        let message = format!("Delete \"{}\"?", counter.name);
        if !confirm.confirm(&message) {
            return Ok(None);
        }

        if let Some(removed) = self.state.counters.shift_remove(&id) {
            info!("deleted counter {} ({id})", removed.name);
        }
        self.state.order.retain(|other| *other != id);
        self.persist();
        Ok(Some(RenderSignal::Full(self.full_refresh())))
    }

    /// Runs the rollover for the clock's current day, persisting if any
    /// counter moved.
    pub fn check_new_day(&mut self) -> Option<RenderSignal> {
        let report = roll_over(&mut self.state, self.clock.today());
        if report.is_empty() {
            return None;
        }
        self.persist();
        Some(RenderSignal::Full(self.full_refresh()))
    }

    /// Periodic safety net: rolls stale counters over, then writes everything
    /// regardless of whether anything changed.
    pub fn autosave(&mut self) -> Result<RolloverReport, StorageError> {
        let report = roll_over(&mut self.state, self.clock.today());
        self.save()?;
        Ok(report)
    }

    pub fn save(&mut self) -> Result<(), StorageError> {
        self.store.save(&self.state)
    }

    pub fn full_refresh(&self) -> FullRefresh {
        FullRefresh {
            counters: self.state.ordered_counters().map(CounterView::from).collect(),
            history: history::query(&self.state, None, None),
            filters: history::filter_options(&self.state),
        }
    }

    pub fn history(&self, date: Option<NaiveDate>, counter: Option<CounterId>) -> Vec<HistoryDay> {
        history::query(&self.state, date, counter)
    }

    /// Write failures are logged; the session carries on from memory.
    fn persist(&mut self) {
        if let Err(err) = self.save() {
            error!("failed to persist state: {err}");
        }
    }

    fn next_id(&mut self) -> CounterId {
        let millis = u64::try_from(self.clock.now().and_utc().timestamp_millis()).unwrap_or(0);
        let next = match self.last_id {
            Some(last) if last.0 >= millis => last.0.checked_add(1),
            _ => Some(millis),
        };
        match next {
            Some(raw) => {
                self.last_id = Some(CounterId(raw));
                CounterId(raw)
            }
            None => self.lowest_free_id(),
        }
    }

    /// Used once ids above the highest issued one run out.
    fn lowest_free_id(&self) -> CounterId {
        (0..=u64::MAX)
            .map(CounterId)
            .find(|id| !self.state.id_in_use(*id))
            .unwrap_or(CounterId(u64::MAX))
    }

    fn counter_ref(&self, id: CounterId) -> Result<&Counter, TallyError> {
        self.state
            .counters
            .get(&id)
            .ok_or(TallyError::UnknownCounter(id))
    }

    fn counter_mut(&mut self, id: CounterId) -> Result<&mut Counter, TallyError> {
        self.state
            .counters
            .get_mut(&id)
            .ok_or(TallyError::UnknownCounter(id))
    }
}
