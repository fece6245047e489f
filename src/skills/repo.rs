use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use sqlx::{query_builder::Separated, FromRow, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    error::AppResult,
    resources::validate,
    store::{postgres::PgResource, Reference, Resource, RowFilter, UniqueKey},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "skill_level", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkillLevel {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
    Expert,
}

impl SkillLevel {
    pub const ALLOWED: &'static [&'static str] = &["BEGINNER", "INTERMEDIATE", "ADVANCED", "EXPERT"];

    pub fn parse(raw: &str) -> AppResult<Self> {
        validate::parse_enum("level", raw, Self::ALLOWED)
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category_id: Option<Uuid>,
    /// Stored lowercased; unique.
    pub name: String,
    pub level: SkillLevel,
    pub years_exp: Option<i32>,
    pub icon: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Default)]
pub struct SkillFilter {
    pub category: Option<Uuid>,
}

impl RowFilter<Skill> for SkillFilter {
    fn matches(&self, row: &Skill) -> bool {
        self.category.map_or(true, |c| row.category_id == Some(c))
    }

    fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        if let Some(category) = self.category {
            qb.push(" AND category_id = ").push_bind(category);
        }
    }
}

impl Resource for Skill {
    type Filter = SkillFilter;

    const NAME: &'static str = "Skill";
    const UNIQUE_KEYS: &'static [UniqueKey] = &[UniqueKey::Name];

    fn id(&self) -> Uuid {
        self.id
    }

    fn key(&self, key: UniqueKey) -> Option<&str> {
        (key == UniqueKey::Name).then_some(self.name.as_str())
    }

    // NULL years sort last, as in Postgres DESC NULLS LAST
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
        b.years_exp
            .cmp(&a.years_exp)
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| a.id.cmp(&b.id))
    }
}

impl PgResource for Skill {
    const TABLE: &'static str = "skills";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "user_id",
        "category_id",
        "name",
        "level",
        "years_exp",
        "icon",
        "created_at",
        "updated_at",
    ];
    const ORDER_BY: &'static str = "years_exp DESC NULLS LAST, created_at DESC, id ASC";

    fn bind_columns(&self, row: &mut Separated<'_, '_, Postgres, &'static str>) {
        row.push_bind(self.id)
            .push_bind(self.user_id)
            .push_bind(self.category_id)
            .push_bind(self.name.clone())
            .push_bind(self.level)
            .push_bind(self.years_exp)
            .push_bind(self.icon.clone())
            .push_bind(self.created_at)
            .push_bind(self.updated_at);
    }
}
