use serde::Deserialize;

use crate::resources::Patch;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub status: Option<String>,
    pub featured: Option<bool>,
    pub meta_title: Option<String>,
    pub meta_desc: Option<String>,
    pub image: Option<String>,
    pub reading_time: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdatePostRequest {
    pub title: Patch<String>,
    pub slug: Patch<String>,
    pub excerpt: Patch<String>,
    pub content: Patch<String>,
    pub status: Patch<String>,
    pub featured: Patch<bool>,
    pub meta_title: Patch<String>,
    pub meta_desc: Patch<String>,
    pub image: Patch<String>,
    pub reading_time: Patch<i32>,
}
