use std::cmp::Ordering;

use serde::Serialize;
use sqlx::{query_builder::Separated, FromRow, Postgres};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::store::{postgres::PgResource, NoFilter, Resource};

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Education {
    pub id: Uuid,
    pub user_id: Uuid,
    pub degree: String,
    pub school: String,
    pub field: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub grade: Option<String>,
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

impl Resource for Education {
    type Filter = NoFilter;

    const NAME: &'static str = "Education";

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

impl PgResource for Education {
    const TABLE: &'static str = "educations";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "user_id",
        "degree",
        "school",
        "field",
        "location",
        "description",
        "grade",
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
            .push_bind(self.degree.clone())
            .push_bind(self.school.clone())
            .push_bind(self.field.clone())
            .push_bind(self.location.clone())
            .push_bind(self.description.clone())
            .push_bind(self.grade.clone())
            .push_bind(self.start_date)
            .push_bind(self.end_date)
            .push_bind(self.current)
            .push_bind(self.created_at)
            .push_bind(self.updated_at);
    }
}
