mod dto;
pub mod error;
pub mod handlers;
mod pictures;
pub mod views;


use crate::state::AppState;
use axum::Router;

pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    handlers::user_routes(max_upload_bytes)
}
