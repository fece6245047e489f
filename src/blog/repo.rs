use std::cmp::Ordering;

use serde::Serialize;
use sqlx::{query_builder::Separated, FromRow, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    resources::PublicationStatus,
    store::{postgres::PgResource, Resource, RowFilter, UniqueKey},
};

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub status: PublicationStatus,
    pub featured: bool,
    pub meta_title: Option<String>,
    pub meta_desc: Option<String>,
    pub image: Option<String>,
    /// Minutes.
    pub reading_time: Option<i32>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub status: Option<PublicationStatus>,
    pub owner: Option<Uuid>,
}

impl RowFilter<BlogPost> for PostFilter {
    fn matches(&self, row: &BlogPost) -> bool {
        self.status.map_or(true, |s| row.status == s) && self.owner.map_or(true, |o| row.user_id == o)
    }

    fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        if let Some(status) = self.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(owner) = self.owner {
            qb.push(" AND user_id = ").push_bind(owner);
        }
    }
}

impl Resource for BlogPost {
    type Filter = PostFilter;

    const NAME: &'static str = "Post";
    const UNIQUE_KEYS: &'static [UniqueKey] = &[UniqueKey::Slug];

    fn id(&self) -> Uuid {
        self.id
    }

    fn key(&self, key: UniqueKey) -> Option<&str> {
        (key == UniqueKey::Slug).then_some(self.slug.as_str())
    }

    fn compare(a: &Self, b: &Self) -> Ordering {
        b.created_at.cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    }
}

impl PgResource for BlogPost {
    const TABLE: &'static str = "blog_posts";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "user_id",
        "title",
        "slug",
        "excerpt",
        "content",
        "status",
        "featured",
        "meta_title",
        "meta_desc",
        "image",
        "reading_time",
        "published_at",
        "created_at",
        "updated_at",
    ];
    const ORDER_BY: &'static str = "created_at DESC, id ASC";

    fn bind_columns(&self, row: &mut Separated<'_, '_, Postgres, &'static str>) {
        row.push_bind(self.id)
            .push_bind(self.user_id)
            .push_bind(self.title.clone())
            .push_bind(self.slug.clone())
            .push_bind(self.excerpt.clone())
            .push_bind(self.content.clone())
            .push_bind(self.status)
            .push_bind(self.featured)
            .push_bind(self.meta_title.clone())
            .push_bind(self.meta_desc.clone())
            .push_bind(self.image.clone())
            .push_bind(self.reading_time)
            .push_bind(self.published_at)
            .push_bind(self.created_at)
            .push_bind(self.updated_at);
    }
}
