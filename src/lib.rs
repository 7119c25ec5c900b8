pub mod appresult;
pub mod articles;
pub mod claim;
pub mod comments;
pub mod config;
pub mod db;
pub mod ids;
pub mod index;
pub mod users;

use std::{sync::Arc, time::Duration};

use axum::{
    Json, Router,
    extract::{FromRef, rejection::JsonRejection},
    http::{Method, header::CONTENT_TYPE},
    routing::get,
};
use serde::Serialize;
use serde_json::Value;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use appresult::{AppError, AppResult};
pub use claim::RetryPolicy;
pub use db::Store;
pub use ids::{IdGenerator, ShortId};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub ids: Arc<dyn IdGenerator>,
    pub retry: RetryPolicy,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            ids: Arc::new(ShortId::default()),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/sqlTest", get(index::sql_test))
        .nest("/api/v1/articles", articles::router())
        .nest("/api/v1/comments", comments::router())
        .nest("/api/v1/users", users::router())
        .fallback(index::not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Read endpoints answer 404 with no body instead of an empty list.
pub(crate) fn found<T: Serialize>(rows: Vec<T>) -> AppResult<Json<Vec<T>>> {
    if rows.is_empty() {
        return Err(AppError::NotFound);
    }
    Ok(Json(rows))
}

/// Turns the body extractor's outcome into a JSON value for the presence check.
///
/// A request without a JSON content type is read as `{}`, so it fails on
/// its missing fields. Unparseable JSON is a 400 with the parser's message.
pub(crate) fn json_body(body: Result<Json<Value>, JsonRejection>) -> AppResult<Value> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(JsonRejection::MissingJsonContentType(_)) => Ok(Value::Object(Default::default())),
        Err(rejection) => Err(rejection.body_text())?,
    }
}

pub trait GetField {
    /// Presence only: a key holding `null` still counts as present.
    fn require_fields(&self, fields: &[&str]) -> AppResult<()>;
    fn get_str_field(&self, field: &str) -> AppResult<String>;
    fn get_opt_str_field(&self, field: &str) -> AppResult<Option<String>>;
}

impl GetField for serde_json::Value {
    fn require_fields(&self, fields: &[&str]) -> AppResult<()> {
        let Some(object) = self.as_object() else {
            return Err(format!("expected a JSON object with: {}", fields.join(", ")))?;
        };

        let missing: Vec<&str> = fields
            .iter()
            .copied()
            .filter(|field| !object.contains_key(*field))
            .collect();
        if !missing.is_empty() {
            return Err(format!(
                "You must include in body: {} (missing: {})",
                fields.join(", "),
                missing.join(", ")
            ))?;
        }
        Ok(())
    }

    /// Any present value is accepted: strings as-is, `null` as the empty
    /// string, everything else as its JSON text (`42`, `true`, `[1,2]`).
    fn get_str_field(&self, field: &str) -> AppResult<String> {
        Ok(
            match self.get(field).ok_or(format!("expected {field} in body"))? {
                Value::String(value) => value.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            }
        )
    }

    fn get_opt_str_field(&self, field: &str) -> AppResult<Option<String>> {
        match self.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.get_str_field(field).map(Some),
        }
    }
}
