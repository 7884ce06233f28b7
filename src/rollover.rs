use crate::history;
use crate::models::{CounterId, TallyState};
use chrono::NaiveDate;
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RolloverReport {
    /// Counters moved onto the new day.
    pub rolled: Vec<CounterId>,
    /// Subset of `rolled` whose tally was written to history.
    pub archived: Vec<CounterId>,
}

impl RolloverReport {
    pub fn is_empty(&self) -> bool {
        self.rolled.is_empty()
    }
}

/// Moves every counter whose active day is not `today` onto `today`.
///
/// The finished tally is archived under the counter's own `date`, the last
/// day it was active. Idle days in between get no entries, so a counter last
/// touched three days ago produces one history record, not three. Running
/// this twice on the same day changes nothing the second time.
pub fn roll_over(state: &mut TallyState, today: NaiveDate) -> RolloverReport {
    let mut report = RolloverReport::default();
    let TallyState {
        counters, history, ..
    } = state;

    for (id, counter) in counters.iter_mut() {
        if counter.date == today {
            continue;
        }
        counter.yesterday = counter.count;
        if history::archive(history, *id, counter) {
            report.archived.push(*id);
        }
        counter.clear_for(today);
        report.rolled.push(*id);
    }

    if !report.is_empty() {
        info!(
            "rolled {} counter(s) over to {today}, archived {}",
            report.rolled.len(),
            report.archived.len()
        );
    }
    report
}
