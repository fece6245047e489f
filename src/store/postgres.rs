use std::marker::PhantomData;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::{
    postgres::PgRow, query_builder::Separated, FromRow, PgPool, Postgres, QueryBuilder,
};
use uuid::Uuid;

use super::{Reference, Resource, ResourceStore, RowFilter, UniqueKey};
use crate::{error::UniqueViolation, resources::pagination::PageRequest};

/// SQL mapping of a [`Resource`]. `COLUMNS` starts with `id` and lists every
/// column in the order `bind_columns` binds them.
pub trait PgResource: Resource + for<'r> FromRow<'r, PgRow> + Unpin {
    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];
    const ORDER_BY: &'static str;

    fn bind_columns(&self, row: &mut Separated<'_, '_, Postgres, &'static str>);
}

pub struct PgStore<R> {
    pool: PgPool,
    _rows: PhantomData<fn() -> R>,
}

impl<R> PgStore<R> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _rows: PhantomData,
        }
    }
}

fn select<R: PgResource>() -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT ");
    qb.push(R::COLUMNS.join(", "))
        .push(" FROM ")
        .push(R::TABLE)
        .push(" WHERE TRUE");
    qb
}

/// Maps a `23505` unique violation to [`UniqueViolation`] using the
/// constraint name to pick the offending key.
pub(crate) fn classify_write_error(
    err: sqlx::Error,
    entity: &'static str,
    keys: &[UniqueKey],
) -> anyhow::Error {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            let constraint = db_err.constraint().unwrap_or_default();
            let field = keys
                .iter()
                .map(|k| k.column())
                .find(|col| constraint.contains(col))
                .unwrap_or("key");
            return UniqueViolation { entity, field }.into();
        }
    }
    anyhow::Error::new(err).context(format!("write {entity}"))
}

#[async_trait]
impl<R: PgResource> ResourceStore<R> for PgStore<R> {
    async fn list(&self, filter: &R::Filter, page: &PageRequest) -> anyhow::Result<Vec<R>> {
        let mut qb = select::<R>();
        filter.push_where(&mut qb);
        qb.push(" ORDER BY ")
            .push(R::ORDER_BY)
            .push(" LIMIT ")
            .push_bind(i64::from(page.limit()))
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);
        qb.build_query_as::<R>()
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("list {}", R::TABLE))
    }

    async fn count(&self, filter: &R::Filter) -> anyhow::Result<u64> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM ");
        qb.push(R::TABLE).push(" WHERE TRUE");
        filter.push_where(&mut qb);
        let (total,): (i64,) = qb
            .build_query_as()
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("count {}", R::TABLE))?;
        Ok(total.max(0) as u64)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<R>> {
        let mut qb = select::<R>();
        qb.push(" AND id = ").push_bind(id);
        qb.build_query_as::<R>()
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("find {} by id", R::TABLE))
    }

    async fn find_by_key(&self, key: UniqueKey, value: &str) -> anyhow::Result<Option<R>> {
        let mut qb = select::<R>();
        qb.push(" AND ")
            .push(key.column())
            .push(" = ")
            .push_bind(value.to_string());
        qb.build_query_as::<R>()
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("find {} by {}", R::TABLE, key.column()))
    }

    async fn insert(&self, row: R) -> anyhow::Result<R> {
        let columns = R::COLUMNS.join(", ");
        let mut qb = QueryBuilder::new("INSERT INTO ");
        qb.push(R::TABLE)
            .push(" (")
            .push(&columns)
            .push(") VALUES (");
        row.bind_columns(&mut qb.separated(", "));
        qb.push(") RETURNING ").push(&columns);
        qb.build_query_as::<R>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify_write_error(e, R::NAME, R::UNIQUE_KEYS))
    }

    async fn update(&self, row: R) -> anyhow::Result<R> {
        let columns = R::COLUMNS.join(", ");
        let mut qb = QueryBuilder::new("UPDATE ");
        qb.push(R::TABLE).push(" SET (").push(&columns).push(") = (");
        row.bind_columns(&mut qb.separated(", "));
        qb.push(") WHERE id = ")
            .push_bind(row.id())
            .push(" RETURNING ")
            .push(&columns);
        qb.build_query_as::<R>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify_write_error(e, R::NAME, R::UNIQUE_KEYS))
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut qb = QueryBuilder::new("DELETE FROM ");
        qb.push(R::TABLE).push(" WHERE id = ").push_bind(id);
        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .with_context(|| format!("delete from {}", R::TABLE))?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear_references(&self, reference: Reference, id: Uuid) -> anyhow::Result<u64> {
        let column = reference.column();
        let mut qb = QueryBuilder::new("UPDATE ");
        qb.push(R::TABLE)
            .push(" SET ")
            .push(column)
            .push(" = NULL WHERE ")
            .push(column)
            .push(" = ")
            .push_bind(id);
        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .with_context(|| format!("clear {} {column}", R::TABLE))?;
        Ok(result.rows_affected())
    }
}
