use crate::errors::StorageError;
use crate::models::{Counter, CounterId, HistoryLog, TallyState};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, warn};

pub const COUNTERS_KEY: &str = "counters";
pub const ORDER_KEY: &str = "counterOrder";
pub const HISTORY_KEY: &str = "history";

/// String-keyed blob store. Each `set` replaces one key atomically; nothing
/// spans keys.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// One JSON file per key under a data directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(value) => Some(value),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => {
                error!("failed to read {}: {err}", path.display());
                None
            }
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Reads and writes [`TallyState`] as three independent blobs.
#[derive(Debug)]
pub struct StateStore<S> {
    backend: S,
}

impl<S: KeyValueStore> StateStore<S> {
    pub fn new(backend: S) -> Self {
        Self { backend }
    }

    pub fn backend_mut(&mut self) -> &mut S {
        &mut self.backend
    }

    pub fn into_backend(self) -> S {
        self.backend
    }

    /// Never fails: a missing or malformed blob loads as empty.
    pub fn load(&self) -> TallyState {
        let mut counters: IndexMap<CounterId, Counter> = self.read_blob(COUNTERS_KEY);
        repair_counters(&mut counters);
        let order: Vec<CounterId> = self.read_blob(ORDER_KEY);
        let history: HistoryLog = self.read_blob(HISTORY_KEY);

        let order = repair_order(order, &counters);
        TallyState {
            counters,
            order,
            history,
        }
    }

    /// Writes counters, then order, then history. A failure part way leaves
    /// the earlier keys written.
    pub fn save(&mut self, state: &TallyState) -> Result<(), StorageError> {
        self.write_blob(COUNTERS_KEY, &state.counters)?;
        self.write_blob(ORDER_KEY, &state.order)?;
        self.write_blob(HISTORY_KEY, &state.history)?;
        Ok(())
    }

    fn read_blob<T: DeserializeOwned + Default>(&self, key: &'static str) -> T {
        let Some(raw) = self.backend.get(key) else {
            return T::default();
        };
        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(err) => {
                warn!("discarding malformed {key} blob: {err}");
                T::default()
            }
        }
    }

    fn write_blob<T: Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), StorageError> {
        let payload = serde_json::to_string(value)
            .map_err(|source| StorageError::Serialize { key, source })?;
        self.backend.set(key, &payload)
    }
}

/// The mapping key is the counter's identity; a stale `id` field is
/// overwritten. A partial record can also lag `allTimeHigh` behind `count`.
fn repair_counters(counters: &mut IndexMap<CounterId, Counter>) {
    for (id, counter) in counters.iter_mut() {
        if counter.id != *id {
            warn!("counter keyed {id} carried id {}; using the key", counter.id);
            counter.id = *id;
        }
        counter.all_time_high = counter.all_time_high.max(counter.count);
    }
}

/// An empty order is rebuilt from the mapping. Otherwise dangling and
/// repeated ids are dropped; counters missing from the order stay hidden.
fn repair_order(
    order: Vec<CounterId>,
    counters: &IndexMap<CounterId, Counter>,
) -> Vec<CounterId> {
    if order.is_empty() {
        return counters.keys().copied().collect();
    }
    let mut seen = HashSet::new();
    order
        .into_iter()
        .filter(|id| counters.contains_key(id) && seen.insert(*id))
        .collect()
}
