mod create;
mod read;

use axum::{
    Router,
    routing::{get, post},
};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create::create_user))
        .route("/articles/{user_id}", get(read::user_articles))
        .route("/comments/{user_id}", get(read::user_comments))
        .route("/username/{user_id}", get(read::username))
}
