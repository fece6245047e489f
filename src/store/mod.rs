//! Generic persistence for the content entities.
//!
//! Each entity implements [`Resource`] (and [`postgres::PgResource`] for the
//! SQL mapping). Its filter type answers both the in-memory predicate and the
//! SQL `WHERE` fragment, so list and count queries always agree.

use std::cmp::Ordering;

use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::resources::pagination::PageRequest;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Natural keys that must be unique per table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueKey {
    Slug,
    Name,
    Email,
}

impl UniqueKey {
    pub fn column(self) -> &'static str {
        match self {
            UniqueKey::Slug => "slug",
            UniqueKey::Name => "name",
            UniqueKey::Email => "email",
        }
    }
}

/// Nullable foreign keys that are cleared when the referenced row goes away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference {
    Category,
}

impl Reference {
    pub fn column(self) -> &'static str {
        match self {
            Reference::Category => "category_id",
        }
    }
}

pub trait RowFilter<R>: Send + Sync {
    fn matches(&self, row: &R) -> bool;

    /// Appends ` AND ...` conditions; the builder already holds `WHERE TRUE`.
    fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>);
}

pub trait Resource: Clone + Send + Sync + 'static {
    type Filter: RowFilter<Self>;

    /// Display name used in error messages.
    const NAME: &'static str;
    const UNIQUE_KEYS: &'static [UniqueKey] = &[];

    fn id(&self) -> Uuid;

    fn key(&self, _key: UniqueKey) -> Option<&str> {
        None
    }

    /// Sets the `reference` column to null if it points at `id`. Returns
    /// whether the row changed.
    fn clear_reference(&mut self, _reference: Reference, _id: Uuid) -> bool {
        false
    }

    /// List ordering; mirrors the SQL `ORDER BY`.
    fn compare(a: &Self, b: &Self) -> Ordering;
}

#[async_trait]
pub trait ResourceStore<R: Resource>: Send + Sync {
    async fn list(&self, filter: &R::Filter, page: &PageRequest) -> anyhow::Result<Vec<R>>;
    async fn count(&self, filter: &R::Filter) -> anyhow::Result<u64>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<R>>;
    async fn find_by_key(&self, key: UniqueKey, value: &str) -> anyhow::Result<Option<R>>;
    async fn insert(&self, row: R) -> anyhow::Result<R>;
    async fn update(&self, row: R) -> anyhow::Result<R>;
    /// Returns false when no row had this id.
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
    /// Nulls `reference` on every row pointing at `id`; returns the count.
    async fn clear_references(&self, reference: Reference, id: Uuid) -> anyhow::Result<u64>;
}

/// Filter that accepts every row.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFilter;

impl<R> RowFilter<R> for NoFilter {
    fn matches(&self, _row: &R) -> bool {
        true
    }

    fn push_where(&self, _qb: &mut QueryBuilder<'_, Postgres>) {}
}
