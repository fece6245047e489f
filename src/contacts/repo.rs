use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use sqlx::{query_builder::Separated, FromRow, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::store::{postgres::PgResource, Resource, RowFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "contact_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContactStatus {
    #[default]
    New,
    Read,
    Replied,
    Archived,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: Uuid,
    /// Set when the sender was signed in.
    pub user_id: Option<Uuid>,
    pub name: String,
    pub email: String,
    pub subject: Option<String>,
    pub message: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub website: Option<String>,
    pub status: ContactStatus,
    pub read: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Default)]
pub struct ContactFilter {
    pub status: Option<ContactStatus>,
}

impl RowFilter<Contact> for ContactFilter {
    fn matches(&self, row: &Contact) -> bool {
        self.status.map_or(true, |s| row.status == s)
    }

    fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        if let Some(status) = self.status {
            qb.push(" AND status = ").push_bind(status);
        }
    }
}

impl Resource for Contact {
    type Filter = ContactFilter;

    const NAME: &'static str = "Message";

    fn id(&self) -> Uuid {
        self.id
    }

    fn compare(a: &Self, b: &Self) -> Ordering {
        b.created_at.cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    }
}

impl PgResource for Contact {
    const TABLE: &'static str = "contacts";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "user_id",
        "name",
        "email",
        "subject",
        "message",
        "phone",
        "company",
        "website",
        "status",
        "read",
        "created_at",
        "updated_at",
    ];
    const ORDER_BY: &'static str = "created_at DESC, id ASC";

    fn bind_columns(&self, row: &mut Separated<'_, '_, Postgres, &'static str>) {
        row.push_bind(self.id)
            .push_bind(self.user_id)
            .push_bind(self.name.clone())
            .push_bind(self.email.clone())
            .push_bind(self.subject.clone())
            .push_bind(self.message.clone())
            .push_bind(self.phone.clone())
            .push_bind(self.company.clone())
            .push_bind(self.website.clone())
            .push_bind(self.status)
            .push_bind(self.read)
            .push_bind(self.created_at)
            .push_bind(self.updated_at);
    }
}
