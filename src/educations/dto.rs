use serde::Deserialize;

use crate::resources::Patch;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateEducationRequest {
    pub degree: Option<String>,
    pub school: Option<String>,
    pub field: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub grade: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub current: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateEducationRequest {
    pub degree: Patch<String>,
    pub school: Patch<String>,
    pub field: Patch<String>,
    pub location: Patch<String>,
    pub description: Patch<String>,
    pub grade: Patch<String>,
    pub start_date: Patch<String>,
    pub end_date: Patch<String>,
    pub current: Patch<bool>,
}
