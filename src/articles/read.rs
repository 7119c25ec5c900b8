use std::sync::Arc;

use axum::{
    Json, debug_handler,
    extract::{Path, State},
};

use crate::{
    AppResult, AppState, Store,
    db::{Article, ArticleContent},
    found,
};

#[debug_handler(state = AppState)]
pub(crate) async fn article(
    State(store): State<Arc<dyn Store>>,
    Path(article_id): Path<String>,
) -> AppResult<Json<Vec<Article>>> {
    found(store.articles_by_id(&article_id).await?)
}

#[debug_handler(state = AppState)]
pub(crate) async fn article_content(
    State(store): State<Arc<dyn Store>>,
    Path(article_id): Path<String>,
) -> AppResult<Json<Vec<ArticleContent>>> {
    found(store.contents_by_article(&article_id).await?)
}
