use std::sync::Arc;

use axum::{
    debug_handler,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};

use crate::{AppResult, AppState, Store};

/// Round-trips the store so deployments can check connectivity.
#[debug_handler(state = AppState)]
pub async fn sql_test(State(store): State<Arc<dyn Store>>) -> AppResult<&'static str> {
    store.ping().await?;
    Ok("Connection has been established successfully")
}

pub async fn not_found() -> impl IntoResponse {
    StatusCode::NOT_FOUND
}
