use lazy_static::lazy_static;
use regex::Regex;
use serde::de::DeserializeOwned;
use time::{
    format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime,
};

use super::patch::Patch;
use crate::error::{AppError, AppResult};

lazy_static! {
    static ref NON_ALNUM: Regex = Regex::new(r"[^a-z0-9]+").expect("static regex");
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("static regex");
    static ref URL_RE: Regex = Regex::new(r"^https?://[^\s/$.?#].[^\s]*$").expect("static regex");
}

/// `"Hello, World!"` -> `"hello-world"`.
pub fn slugify(text: &str) -> String {
    let lower = text.to_lowercase();
    NON_ALNUM.replace_all(&lower, "-").trim_matches('-').to_string()
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn is_valid_url(url: &str) -> bool {
    URL_RE.is_match(url)
}

/// Trims; blank strings become `None`.
pub fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Trimmed, non-empty entries with duplicates dropped (first one wins).
pub fn tags(list: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(list.len());
    for tag in list {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

pub fn optional_url(field: &str, value: Option<&str>) -> AppResult<()> {
    value.map_or(Ok(()), |v| url(field, v))
}

/// Slug from an explicit value, else from `source`; never empty.
pub fn slug_for(explicit: Option<&str>, source: &str) -> AppResult<String> {
    let slug = slugify(explicit.filter(|s| !s.trim().is_empty()).unwrap_or(source));
    if slug.is_empty() {
        return Err(AppError::validation("slug must contain letters or digits"));
    }
    Ok(slug)
}

/// Collects the names of required fields that are absent or blank.
#[derive(Debug, Default)]
pub struct Required {
    missing: Vec<&'static str>,
}

impl Required {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &'static str, value: &Option<String>) -> Self {
        if value.as_deref().map_or(true, |v| v.trim().is_empty()) {
            self.missing.push(name);
        }
        self
    }

    pub fn present<T>(mut self, name: &'static str, value: &Option<T>) -> Self {
        if value.is_none() {
            self.missing.push(name);
        }
        self
    }

    pub fn check(self) -> AppResult<()> {
        if self.missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::validation(format!(
                "Missing required fields: {}",
                self.missing.join(", ")
            )))
        }
    }
}

pub fn length(field: &str, value: &str, min: usize, max: usize) -> AppResult<()> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(AppError::validation(format!(
            "{field} must be between {min} and {max} characters"
        )));
    }
    Ok(())
}

pub fn url(field: &str, value: &str) -> AppResult<()> {
    if is_valid_url(value) {
        Ok(())
    } else {
        Err(AppError::validation(format!("{field} must be a valid URL")))
    }
}

/// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_date(field: &str, raw: &str) -> AppResult<OffsetDateTime> {
    let raw = raw.trim();
    if let Ok(ts) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(ts);
    }
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .map(|d| d.midnight().assume_utc())
        .map_err(|_| AppError::validation(format!("{field} must be a date (YYYY-MM-DD)")))
}

/// An end date needs a start date and may not precede it.
pub fn date_range(start: Option<OffsetDateTime>, end: Option<OffsetDateTime>) -> AppResult<()> {
    match (start, end) {
        (None, Some(_)) => Err(AppError::validation("endDate requires startDate")),
        (Some(start), Some(end)) if end < start => {
            Err(AppError::validation("endDate cannot be before startDate"))
        }
        _ => Ok(()),
    }
}

/// Applies start/end date patches to a stored period and re-checks it.
pub fn patch_period(
    start: Patch<String>,
    end: Patch<String>,
    start_slot: &mut OffsetDateTime,
    end_slot: &mut Option<OffsetDateTime>,
) -> AppResult<()> {
    start
        .try_map(|s| parse_date("startDate", &s))?
        .apply_required(start_slot, "startDate")?;
    end.try_map(|s| parse_date("endDate", &s))?.apply(end_slot);
    date_range(Some(*start_slot), *end_slot)
}

/// Parses a closed-set enum (serialized as SCREAMING_SNAKE_CASE), ignoring
/// case and listing the accepted values on failure.
pub fn parse_enum<T: DeserializeOwned>(field: &str, raw: &str, allowed: &[&str]) -> AppResult<T> {
    let normalized = raw.trim().to_uppercase().replace([' ', '-'], "_");
    serde_json::from_value(serde_json::Value::String(normalized)).map_err(|_| {
        AppError::validation(format!("{field} must be one of: {}", allowed.join(", ")))
    })
}

/// Like [`parse_enum`] but unknown values yield `None` (used for list filters).
pub fn enum_filter<T: DeserializeOwned>(raw: Option<&str>) -> Option<T> {
    raw.and_then(|r| parse_enum(r, r, &[]).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_and_trims() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  Rust & Axum -- 2024  "), "rust-axum-2024");
        assert_eq!(slugify("---"), "");
        assert_eq!(slugify("Already-slugged"), "already-slugged");
    }

    #[test]
    fn tags_are_trimmed_and_deduplicated() {
        let raw = vec![" Rust ".into(), "".into(), "Axum".into(), "Rust".into()];
        assert_eq!(tags(raw), vec!["Rust".to_string(), "Axum".to_string()]);
    }

    #[test]
    fn slug_prefers_explicit_value() {
        assert_eq!(slug_for(Some("My Post"), "ignored").unwrap(), "my-post");
        assert_eq!(slug_for(Some("  "), "From Title").unwrap(), "from-title");
        assert_eq!(slug_for(None, "From Title").unwrap(), "from-title");
        assert!(slug_for(None, "!!!").is_err());
    }

    #[test]
    fn required_names_every_missing_field() {
        let err = Required::new()
            .text("title", &None)
            .text("company", &Some("  ".into()))
            .text("location", &Some("Berlin".into()))
            .check()
            .unwrap_err();
        assert_eq!(err.to_string(), "Missing required fields: title, company");
    }

    #[test]
    fn dates_accept_both_formats() {
        let a = parse_date("startDate", "2021-03-01").unwrap();
        let b = parse_date("startDate", "2021-03-01T00:00:00Z").unwrap();
        assert_eq!(a, b);
        assert!(parse_date("startDate", "March 2021").is_err());
    }

    #[test]
    fn date_range_rules() {
        let start = parse_date("s", "2022-01-01").ok();
        let end = parse_date("e", "2021-01-01").ok();
        assert!(date_range(start, end).is_err());
        assert!(date_range(None, end).is_err());
        assert!(date_range(end, start).is_ok());
        assert!(date_range(start, None).is_ok());
        assert!(date_range(start, start).is_ok());
    }

    #[test]
    fn period_patch_checks_merged_dates() {
        let mut start = parse_date("s", "2020-01-01").unwrap();
        let mut end = None;
        patch_period(Patch::Missing, Patch::Value("2021-06-30".into()), &mut start, &mut end).unwrap();
        assert_eq!(end, parse_date("e", "2021-06-30").ok());

        let err = patch_period(Patch::Value("2022-01-01".into()), Patch::Missing, &mut start, &mut end)
            .unwrap_err();
        assert_eq!(err.to_string(), "endDate cannot be before startDate");
        assert!(patch_period(Patch::Null, Patch::Missing, &mut start, &mut end).is_err());
    }

    #[derive(Debug, PartialEq, serde::Deserialize)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    enum Level {
        Beginner,
        FullTime,
    }

    #[test]
    fn enums_parse_case_insensitively() {
        let level: Level = parse_enum("level", "beginner", &["BEGINNER"]).unwrap();
        assert_eq!(level, Level::Beginner);
        let level: Level = parse_enum("type", "full-time", &["FULL_TIME"]).unwrap();
        assert_eq!(level, Level::FullTime);
        let err = parse_enum::<Level>("level", "GURU", &["BEGINNER", "FULL_TIME"]).unwrap_err();
        assert_eq!(err.to_string(), "level must be one of: BEGINNER, FULL_TIME");
        assert_eq!(enum_filter::<Level>(Some("nonsense")), None);
    }

    #[test]
    fn url_and_email_checks() {
        assert!(is_valid_url("https://github.com/someone"));
        assert!(!is_valid_url("github.com/someone"));
        assert!(is_valid_email("a@x.com"));
        assert!(!is_valid_email("a@x"));
    }
}
