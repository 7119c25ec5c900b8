mod add;

use std::sync::Arc;

use axum::{
    Json, Router, debug_handler,
    extract::{Path, State},
    routing::{get, post},
};

use crate::{AppResult, AppState, Store, db::Comment, found};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/addComment", post(add::add_comment))
        .route("/{article_id}", get(article_comments))
}

#[debug_handler(state = AppState)]
async fn article_comments(
    State(store): State<Arc<dyn Store>>,
    Path(article_id): Path<String>,
) -> AppResult<Json<Vec<Comment>>> {
    found(store.comments_by_article(&article_id).await?)
}
