use serde::Deserialize;
use uuid::Uuid;

use crate::resources::Patch;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub category_id: Option<Uuid>,
    pub description: Option<String>,
    pub content: Option<String>,
    /// External image URL; an uploaded `image` file takes precedence.
    pub image: Option<String>,
    pub github_url: Option<String>,
    pub demo_url: Option<String>,
    pub technologies: Option<Vec<String>>,
    pub status: Option<String>,
    pub featured: Option<bool>,
    pub priority: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    pub title: Patch<String>,
    pub slug: Patch<String>,
    pub category_id: Patch<Uuid>,
    pub description: Patch<String>,
    pub content: Patch<String>,
    pub image: Patch<String>,
    pub github_url: Patch<String>,
    pub demo_url: Patch<String>,
    pub technologies: Patch<Vec<String>>,
    pub status: Patch<String>,
    pub featured: Patch<bool>,
    pub priority: Patch<i32>,
}
