use serde::{Deserialize, Serialize};

use super::validate;
use crate::error::AppResult;

/// Lifecycle of publishable content (projects and blog posts).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "publication_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PublicationStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl PublicationStatus {
    pub const ALLOWED: &'static [&'static str] = &["DRAFT", "PUBLISHED", "ARCHIVED"];

    pub fn parse(raw: &str) -> AppResult<Self> {
        validate::parse_enum("status", raw, Self::ALLOWED)
    }
}
