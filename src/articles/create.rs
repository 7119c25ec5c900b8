use std::sync::Arc;

use axum::{
    Json, debug_handler,
    extract::{State, rejection::JsonRejection},
};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::{
    AppResult, AppState, GetField, IdGenerator, RetryPolicy, Store,
    claim::claim_fresh_id,
    db::NewArticle,
    json_body,
};

const REQUIRED: [&str; 4] = ["userId", "title", "description", "fileURL"];

/// `fileURL` is stored as given. The article body travels in the optional
/// `content` field and lands in its own row under the new article's id.
#[debug_handler(state = AppState)]
pub(crate) async fn create_article(
    State(store): State<Arc<dyn Store>>,
    State(ids): State<Arc<dyn IdGenerator>>,
    State(retry): State<RetryPolicy>,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let body = json_body(body)?;
    body.require_fields(&REQUIRED)?;

    let draft = NewArticle {
        user_id: body.get_str_field("userId")?,
        title: body.get_str_field("title")?,
        description: body.get_str_field("description")?,
        file_url: body.get_str_field("fileURL")?,
    };
    let content = body.get_opt_str_field("content")?.unwrap_or_default();

    let claimed = claim_fresh_id(ids.as_ref(), &retry, |article_id| {
        store.find_or_create_article(article_id, &draft)
    })
    .await?;

    let stored = store.find_or_create_content(&claimed.record, &content).await?;
    if !stored.created {
        warn!(article_id = %claimed.id, "content row already existed for new article");
    }

    info!(article_id = %claimed.id, user_id = %draft.user_id, attempts = claimed.attempts, "article created");
    Ok(Json(json!({ "articleId": claimed.id })))
}
