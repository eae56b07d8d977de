//! Recent search history.
//!
//! Up to [`MAX_HISTORY_ENTRIES`] distinct queries, most recent first. The list is loaded
//! once when the history is created and written through to the store on every change.

use crate::constants::{MAX_HISTORY_ENTRIES, SEARCH_HISTORY_KEY};
use crate::store::{read_json, write_json, KeyValueStore};
use crate::CoreResult;
use medinfo_types::QueryText;
use std::sync::Arc;

pub struct SearchHistory {
    store: Arc<dyn KeyValueStore>,
    entries: Vec<String>,
}

impl std::fmt::Debug for SearchHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchHistory")
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}

impl SearchHistory {
    /// Load history from `store`.
    ///
    /// A missing key is an empty history. A malformed stored value is logged and treated as
    /// empty; it is overwritten by the next recorded query.
    pub fn load(store: Arc<dyn KeyValueStore>) -> CoreResult<Self> {
        let entries = match read_json::<Vec<String>>(store.as_ref(), SEARCH_HISTORY_KEY) {
            Ok(Some(mut entries)) => {
                entries.truncate(MAX_HISTORY_ENTRIES);
                entries
            }
            Ok(None) => Vec::new(),
            Err(crate::MedinfoError::Deserialization(e)) => {
                tracing::warn!("ignoring malformed search history: {}", e);
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        Ok(Self { store, entries })
    }

    /// Most recent first.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Move `query` to the front, dropping any earlier copy and anything past the cap.
    pub fn record(&mut self, query: &QueryText) -> CoreResult<()> {
        let query = query.as_str();
        let mut next = Vec::with_capacity(MAX_HISTORY_ENTRIES);
        next.push(query.to_owned());
        next.extend(self.entries.iter().filter(|h| *h != query).cloned());
        next.truncate(MAX_HISTORY_ENTRIES);

        self.persist(next)
    }

    /// Remove a single entry. Returns `false` when it was not present.
    pub fn remove(&mut self, entry: &str) -> CoreResult<bool> {
        if !self.entries.iter().any(|h| h == entry) {
            return Ok(false);
        }
        let next = self
            .entries
            .iter()
            .filter(|h| *h != entry)
            .cloned()
            .collect();
        self.persist(next)?;
        Ok(true)
    }

    /// Drop every entry and the persisted key.
    pub fn clear(&mut self) -> CoreResult<()> {
        self.store.remove(SEARCH_HISTORY_KEY)?;
        self.entries.clear();
        Ok(())
    }

    fn persist(&mut self, next: Vec<String>) -> CoreResult<()> {
        write_json(self.store.as_ref(), SEARCH_HISTORY_KEY, &next)?;
        self.entries = next;
        Ok(())
    }
}
