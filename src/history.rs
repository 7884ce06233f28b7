use crate::models::{ArchivedEntry, Counter, CounterId, HistoryLog, TallyState};
use crate::render::{CounterChoice, FilterOptions, HistoryDay, HistoryEntryView};
use chrono::NaiveDate;
use tracing::info;

/// Copies the counter's tally into `history[counter.date][id]`, replacing any
/// earlier entry for that pair. Zero tallies are not archived.
///
/// Returns whether an entry was written.
pub fn archive(history: &mut HistoryLog, id: CounterId, counter: &Counter) -> bool {
    if counter.count == 0 {
        return false;
    }
    history
        .entry(counter.date)
        .or_default()
        .insert(id, ArchivedEntry::from(counter));
    info!(
        "archived {} for {} (count {})",
        counter.name, counter.date, counter.count
    );
    true
}

/// Day groups, newest first.
///
/// `counter` narrows entries to those whose archived name equals the name of
/// the live counter with that id. Archived entries are matched by name, so a
/// deleted counter matches nothing and a recreated counter with the same name
/// picks up its predecessor's history. Days left with no entries are dropped.
pub fn query(
    state: &TallyState,
    date: Option<NaiveDate>,
    counter: Option<CounterId>,
) -> Vec<HistoryDay> {
    let wanted_name = counter.map(|id| state.counters.get(&id).map(|c| c.name.as_str()));

    state
        .history
        .iter()
        .rev()
        .filter(|(day, _)| date.is_none_or(|wanted| **day == wanted))
        .filter_map(|(day, entries)| {
            let entries: Vec<_> = entries
                .iter()
                .filter(|(_, entry)| match wanted_name {
                    None => true,
                    Some(name) => name == Some(entry.name.as_str()),
                })
                .map(|(id, entry)| HistoryEntryView {
                    counter_id: *id,
                    name: entry.name.clone(),
                    count: entry.count,
                    timestamps: entry.timestamps.clone(),
                })
                .collect();
            (!entries.is_empty()).then_some(HistoryDay {
                date: *day,
                entries,
            })
        })
        .collect()
}

pub fn filter_options(state: &TallyState) -> FilterOptions {
    FilterOptions {
        dates: state.history.keys().rev().copied().collect(),
        counters: state
            .ordered_counters()
            .map(|c| CounterChoice {
                id: c.id,
                name: c.name.clone(),
            })
            .collect(),
    }
}
