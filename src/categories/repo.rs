use std::cmp::Ordering;

use serde::Serialize;
use sqlx::{query_builder::Separated, FromRow, Postgres};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::store::{postgres::PgResource, NoFilter, Resource, UniqueKey};

/// Site-wide taxonomy shared by projects and skills.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Resource for Category {
    type Filter = NoFilter;

    const NAME: &'static str = "Category";
    const UNIQUE_KEYS: &'static [UniqueKey] = &[UniqueKey::Name, UniqueKey::Slug];

    fn id(&self) -> Uuid {
        self.id
    }

    fn key(&self, key: UniqueKey) -> Option<&str> {
        match key {
            UniqueKey::Name => Some(&self.name),
            UniqueKey::Slug => Some(&self.slug),
            UniqueKey::Email => None,
        }
    }

    fn compare(a: &Self, b: &Self) -> Ordering {
        a.name.cmp(&b.name)
    }
}

impl PgResource for Category {
    const TABLE: &'static str = "categories";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "slug",
        "description",
        "color",
        "icon",
        "created_at",
        "updated_at",
    ];
    const ORDER_BY: &'static str = "name ASC";

    fn bind_columns(&self, row: &mut Separated<'_, '_, Postgres, &'static str>) {
        row.push_bind(self.id)
            .push_bind(self.name.clone())
            .push_bind(self.slug.clone())
            .push_bind(self.description.clone())
            .push_bind(self.color.clone())
            .push_bind(self.icon.clone())
            .push_bind(self.created_at)
            .push_bind(self.updated_at);
    }
}
