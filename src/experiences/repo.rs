use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use sqlx::{query_builder::Separated, FromRow, Postgres};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    error::AppResult,
    resources::validate,
    store::{postgres::PgResource, NoFilter, Resource},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "experience_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExperienceType {
    #[default]
    FullTime,
    PartTime,
    Contract,
    Internship,
}

impl ExperienceType {
    pub const ALLOWED: &'static [&'static str] = &["FULL_TIME", "PART_TIME", "CONTRACT", "INTERNSHIP"];

    pub fn parse(raw: &str) -> AppResult<Self> {
        validate::parse_enum("type", raw, Self::ALLOWED)
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Experience {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub technologies: Vec<String>,
    #[serde(rename = "type")]
    pub employment_type: ExperienceType,
    #[serde(with = "time::serde::rfc3339")]
    pub start_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub end_date: Option<OffsetDateTime>,
    pub current: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Resource for Experience {
    type Filter = NoFilter;

    const NAME: &'static str = "Experience";

    fn id(&self) -> Uuid {
        self.id
    }

    fn compare(a: &Self, b: &Self) -> Ordering {
        b.start_date
            .cmp(&a.start_date)
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| a.id.cmp(&b.id))
    }
}

impl PgResource for Experience {
    const TABLE: &'static str = "experiences";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "user_id",
        "title",
        "company",
        "location",
        "description",
        "technologies",
        "employment_type",
        "start_date",
        "end_date",
        "current",
        "created_at",
        "updated_at",
    ];
    const ORDER_BY: &'static str = "start_date DESC, created_at DESC, id ASC";

    fn bind_columns(&self, row: &mut Separated<'_, '_, Postgres, &'static str>) {
        row.push_bind(self.id)
            .push_bind(self.user_id)
            .push_bind(self.title.clone())
            .push_bind(self.company.clone())
            .push_bind(self.location.clone())
            .push_bind(self.description.clone())
            .push_bind(self.technologies.clone())
            .push_bind(self.employment_type)
            .push_bind(self.start_date)
            .push_bind(self.end_date)
            .push_bind(self.current)
            .push_bind(self.created_at)
            .push_bind(self.updated_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        resources::{paginate, PageRequest},
        store::{MemoryStore, ResourceStore},
    };

    fn at_same_time(id: Uuid, start: OffsetDateTime, created: OffsetDateTime) -> Experience {
        Experience {
            id,
            user_id: Uuid::nil(),
            title: "Engineer".into(),
            company: "Acme".into(),
            location: None,
            description: None,
            technologies: Vec::new(),
            employment_type: ExperienceType::FullTime,
            start_date: start,
            end_date: None,
            current: false,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn sql_order_ends_with_unique_key() {
        assert!(Experience::ORDER_BY.ends_with(", id ASC"));
    }

    #[tokio::test]
    async fn paging_through_equal_start_dates_visits_each_row_once() {
        let store = MemoryStore::<Experience>::new();
        let start = OffsetDateTime::from_unix_timestamp(1_640_995_200).unwrap();
        let created = OffsetDateTime::now_utc();
        let mut ids: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
        for id in &ids {
            store.insert(at_same_time(*id, start, created)).await.unwrap();
        }

        let mut seen = Vec::new();
        for page in 1..=3 {
            let got = paginate(&store, &NoFilter, PageRequest::new(page, 2)).await.unwrap();
            seen.extend(got.items.into_iter().map(|e| e.id));
        }
        ids.sort();
        assert_eq!(seen, ids);
    }
}
