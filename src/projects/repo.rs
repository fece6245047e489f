use std::cmp::Ordering;

use serde::Serialize;
use sqlx::{query_builder::Separated, FromRow, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    resources::PublicationStatus,
    store::{postgres::PgResource, Reference, Resource, RowFilter, UniqueKey},
};

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category_id: Option<Uuid>,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub image: Option<String>,
    pub github_url: Option<String>,
    pub demo_url: Option<String>,
    pub technologies: Vec<String>,
    pub status: PublicationStatus,
    pub featured: bool,
    pub priority: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Default)]
pub struct ProjectFilter {
    pub status: Option<PublicationStatus>,
    pub owner: Option<Uuid>,
    pub category: Option<Uuid>,
    pub featured_only: bool,
}

impl RowFilter<Project> for ProjectFilter {
    fn matches(&self, row: &Project) -> bool {
        self.status.map_or(true, |s| row.status == s)
            && self.owner.map_or(true, |o| row.user_id == o)
            && self.category.map_or(true, |c| row.category_id == Some(c))
            && (!self.featured_only || row.featured)
    }

    fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        if let Some(status) = self.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(owner) = self.owner {
            qb.push(" AND user_id = ").push_bind(owner);
        }
        if let Some(category) = self.category {
            qb.push(" AND category_id = ").push_bind(category);
        }
        if self.featured_only {
            qb.push(" AND featured");
        }
    }
}

impl Resource for Project {
    type Filter = ProjectFilter;

    const NAME: &'static str = "Project";
    const UNIQUE_KEYS: &'static [UniqueKey] = &[UniqueKey::Slug];

    fn id(&self) -> Uuid {
        self.id
    }

    fn key(&self, key: UniqueKey) -> Option<&str> {
        (key == UniqueKey::Slug).then_some(self.slug.as_str())
    }

    fn clear_reference(&mut self, reference: Reference, id: Uuid) -> bool {
        match reference {
            Reference::Category if self.category_id == Some(id) => {
                self.category_id = None;
                true
            }
            _ => false,
        }
    }

    fn compare(a: &Self, b: &Self) -> Ordering {
        b.featured
            .cmp(&a.featured)
            .then_with(|| b.priority.cmp(&a.priority))
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| a.id.cmp(&b.id))
    }
}

impl PgResource for Project {
    const TABLE: &'static str = "projects";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "user_id",
        "category_id",
        "title",
        "slug",
        "description",
        "content",
        "image",
        "github_url",
        "demo_url",
        "technologies",
        "status",
        "featured",
        "priority",
        "created_at",
        "updated_at",
    ];
    const ORDER_BY: &'static str = "featured DESC, priority DESC, created_at DESC, id ASC";

    fn bind_columns(&self, row: &mut Separated<'_, '_, Postgres, &'static str>) {
        row.push_bind(self.id)
            .push_bind(self.user_id)
            .push_bind(self.category_id)
            .push_bind(self.title.clone())
            .push_bind(self.slug.clone())
            .push_bind(self.description.clone())
            .push_bind(self.content.clone())
            .push_bind(self.image.clone())
            .push_bind(self.github_url.clone())
            .push_bind(self.demo_url.clone())
            .push_bind(self.technologies.clone())
            .push_bind(self.status)
            .push_bind(self.featured)
            .push_bind(self.priority)
            .push_bind(self.created_at)
            .push_bind(self.updated_at);
    }
}
