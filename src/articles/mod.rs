mod create;
mod read;

use axum::{
    Router,
    routing::{get, post},
};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create::create_article))
        .route("/content/{article_id}", get(read::article_content))
        .route("/{article_id}", get(read::article))
}
