use crate::state::AppState;
use axum::Router;

pub mod client;
pub mod handlers;
pub mod stats;

pub use client::{GithubApi, HttpGithub};

pub fn router() -> Router<AppState> {
    handlers::routes()
}
