use serde::Deserialize;

use crate::resources::Patch;

/// Dates are `YYYY-MM-DD` or RFC 3339.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateExperienceRequest {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub technologies: Option<Vec<String>>,
    #[serde(rename = "type")]
    pub employment_type: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub current: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateExperienceRequest {
    pub title: Patch<String>,
    pub company: Patch<String>,
    pub location: Patch<String>,
    pub description: Patch<String>,
    pub technologies: Patch<Vec<String>>,
    #[serde(rename = "type")]
    pub employment_type: Patch<String>,
    pub start_date: Patch<String>,
    pub end_date: Patch<String>,
    pub current: Patch<bool>,
}
