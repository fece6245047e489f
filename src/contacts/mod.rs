//! Contact form inbox: public submissions, admin triage and email replies.

use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod handlers;
pub mod repo;
pub mod services;

pub use repo::Contact;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
