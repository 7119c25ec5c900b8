use std::sync::Arc;

use axum::{
    Json, debug_handler,
    extract::{Path, State},
};
use serde_json::{Value, json};

use crate::{
    AppError, AppResult, AppState, Store,
    db::{Article, Comment},
    found,
};

#[debug_handler(state = AppState)]
pub(crate) async fn user_articles(
    State(store): State<Arc<dyn Store>>,
    Path(user_id): Path<String>,
) -> AppResult<Json<Vec<Article>>> {
    found(store.articles_by_user(&user_id).await?)
}

#[debug_handler(state = AppState)]
pub(crate) async fn user_comments(
    State(store): State<Arc<dyn Store>>,
    Path(user_id): Path<String>,
) -> AppResult<Json<Vec<Comment>>> {
    found(store.comments_by_user(&user_id).await?)
}

#[debug_handler(state = AppState)]
pub(crate) async fn username(
    State(store): State<Arc<dyn Store>>,
    Path(user_id): Path<String>,
) -> AppResult<Json<Value>> {
    let Some(user) = store.user(&user_id).await? else {
        return Err(AppError::NotFound);
    };
    Ok(Json(json!({ "username": user.username })))
}
