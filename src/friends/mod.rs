mod dto;
pub mod handlers;
pub(crate) mod repo;
pub mod transitions;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::friend_routes()
}
