use serde::Deserialize;
use uuid::Uuid;

use crate::resources::Patch;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateSkillRequest {
    pub name: Option<String>,
    pub level: Option<String>,
    pub years_exp: Option<i32>,
    pub category_id: Option<Uuid>,
    pub icon: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateSkillRequest {
    pub name: Patch<String>,
    pub level: Patch<String>,
    pub years_exp: Patch<i32>,
    pub category_id: Patch<Uuid>,
    pub icon: Patch<String>,
}
