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
    db::NewUser,
    json_body,
};

const REQUIRED: [&str; 4] = ["firstName", "lastName", "email", "username"];

#[debug_handler(state = AppState)]
pub(crate) async fn create_user(
    State(store): State<Arc<dyn Store>>,
    State(ids): State<Arc<dyn IdGenerator>>,
    State(retry): State<RetryPolicy>,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let body = json_body(body)?;
    body.require_fields(&REQUIRED)?;

    let draft = NewUser {
        first_name: body.get_str_field("firstName")?,
        last_name: body.get_str_field("lastName")?,
        email: body.get_str_field("email")?,
        username: body.get_str_field("username")?,
    };

    let claimed = claim_fresh_id(ids.as_ref(), &retry, |user_id| {
        store.find_or_create_user(user_id, &draft)
    })
    .await?;

    info!(user_id = %claimed.id, username = %draft.username, "user created");
    Ok(Json(json!({ "userId": claimed.id })))
}
