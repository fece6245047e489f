use std::sync::RwLock;

use anyhow::anyhow;
use async_trait::async_trait;
use uuid::Uuid;

use super::{Reference, Resource, ResourceStore, RowFilter, UniqueKey};
use crate::{error::UniqueViolation, resources::pagination::PageRequest};

/// Vec-backed store used by tests and `AppState::fake()`.
pub struct MemoryStore<R> {
    rows: RwLock<Vec<R>>,
}

impl<R> Default for MemoryStore<R> {
    fn default() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
        }
    }
}

impl<R: Resource> MemoryStore<R> {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_unique(rows: &[R], candidate: &R) -> Result<(), UniqueViolation> {
        for key in R::UNIQUE_KEYS {
            let Some(value) = candidate.key(*key) else {
                continue;
            };
            let taken = rows
                .iter()
                .any(|r| r.id() != candidate.id() && r.key(*key) == Some(value));
            if taken {
                return Err(UniqueViolation {
                    entity: R::NAME,
                    field: key.column(),
                });
            }
        }
        Ok(())
    }
}

fn poisoned() -> anyhow::Error {
    anyhow!("memory store lock poisoned")
}

#[async_trait]
impl<R: Resource> ResourceStore<R> for MemoryStore<R> {
    async fn list(&self, filter: &R::Filter, page: &PageRequest) -> anyhow::Result<Vec<R>> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        let mut hits: Vec<R> = rows.iter().filter(|r| filter.matches(r)).cloned().collect();
        hits.sort_by(R::compare);
        Ok(hits
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect())
    }

    async fn count(&self, filter: &R::Filter) -> anyhow::Result<u64> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows.iter().filter(|r| filter.matches(r)).count() as u64)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<R>> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows.iter().find(|r| r.id() == id).cloned())
    }

    async fn find_by_key(&self, key: UniqueKey, value: &str) -> anyhow::Result<Option<R>> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows.iter().find(|r| r.key(key) == Some(value)).cloned())
    }

    async fn insert(&self, row: R) -> anyhow::Result<R> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        Self::check_unique(&rows, &row)?;
        rows.push(row.clone());
        Ok(row)
    }

    async fn update(&self, row: R) -> anyhow::Result<R> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        Self::check_unique(&rows, &row)?;
        let slot = rows
            .iter_mut()
            .find(|r| r.id() == row.id())
            .ok_or_else(|| anyhow!("{} {} vanished before update", R::NAME, row.id()))?;
        *slot = row.clone();
        Ok(row)
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        let before = rows.len();
        rows.retain(|r| r.id() != id);
        Ok(rows.len() != before)
    }

    async fn clear_references(&self, reference: Reference, id: Uuid) -> anyhow::Result<u64> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        let cleared = rows
            .iter_mut()
            .filter_map(|r| r.clear_reference(reference, id).then_some(()))
            .count();
        Ok(cleared as u64)
    }
}
