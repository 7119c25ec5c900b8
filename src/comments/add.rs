use std::sync::Arc;

use axum::{
    Json, debug_handler,
    extract::{State, rejection::JsonRejection},
};
use serde_json::{Value, json};
use tracing::info;

use crate::{
    AppResult, AppState, GetField, IdGenerator, RetryPolicy, Store,
    claim::claim_fresh_id,
    db::NewComment,
    json_body,
};

const REQUIRED: [&str; 3] = ["articleId", "userId", "content"];

#[debug_handler(state = AppState)]
pub(crate) async fn add_comment(
    State(store): State<Arc<dyn Store>>,
    State(ids): State<Arc<dyn IdGenerator>>,
    State(retry): State<RetryPolicy>,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let body = json_body(body)?;
    body.require_fields(&REQUIRED)?;

    let draft = NewComment {
        article_id: body.get_str_field("articleId")?,
        user_id: body.get_str_field("userId")?,
        content: body.get_str_field("content")?,
    };

    let claimed = claim_fresh_id(ids.as_ref(), &retry, |comment_id| {
        store.find_or_create_comment(comment_id, &draft)
    })
    .await?;

    info!(comment_id = %claimed.id, article_id = %draft.article_id, attempts = claimed.attempts, "comment added");
    Ok(Json(json!({ "commentId": claimed.id })))
}
