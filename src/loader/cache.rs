//! Process-lifetime memoization of loaded tables.

use super::source::SourceSet;
use crate::error::Result;
use crate::models::RawTables;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// Remembers successful loads keyed by their sources.
///
/// Entries are never refreshed automatically; call [`TableCache::invalidate`]
/// to force the next request to load again. Failed loads are not stored.
#[derive(Debug, Default)]
pub struct TableCache {
    entries: HashMap<SourceSet, Arc<RawTables>>,
}

impl TableCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the remembered tables for `sources`, or run `load` and
    /// remember its result if it succeeds.
    pub async fn get_or_load<F, Fut>(
        &mut self,
        sources: &SourceSet,
        load: F,
    ) -> Result<Arc<RawTables>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<RawTables>>,
    {
        if let Some(tables) = self.entries.get(sources) {
            debug!("Using memoized tables");
            return Ok(Arc::clone(tables));
        }

        let tables = Arc::new(load().await?);
        self.entries.insert(sources.clone(), Arc::clone(&tables));
        Ok(tables)
    }

    /// Drop every remembered result.
    pub fn invalidate(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
