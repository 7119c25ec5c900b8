mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::claim::FindOrCreate;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("SQL failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: String,

    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub username: String,

    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    // unique: user_id
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub article_id: String,
    pub user_id: String,

    pub title: String,
    pub description: String,
    #[serde(rename = "fileURL")]
    pub file_url: String,

    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    // unique: article_id
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ArticleContent {
    pub article_id: String,
    pub content: String,

    // unique: article_id, always the owning article's id
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub comment_id: String,
    pub article_id: String,
    pub user_id: String,

    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub time: OffsetDateTime,

    // unique: comment_id
}

/// Field values for a user that does not have an id yet.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub username: String,
}

#[derive(Debug, Clone)]
pub struct NewArticle {
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub file_url: String,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub article_id: String,
    pub user_id: String,
    pub content: String,
}

impl NewUser {
    pub fn into_user(self, user_id: String, created_at: OffsetDateTime) -> User {
        User {
            user_id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            username: self.username,
            created_at,
        }
    }
}

impl NewArticle {
    pub fn into_article(self, article_id: String, created_at: OffsetDateTime) -> Article {
        Article {
            article_id,
            user_id: self.user_id,
            title: self.title,
            description: self.description,
            file_url: self.file_url,
            created_at,
        }
    }
}

impl NewComment {
    pub fn into_comment(self, comment_id: String, time: OffsetDateTime) -> Comment {
        Comment {
            comment_id,
            article_id: self.article_id,
            user_id: self.user_id,
            content: self.content,
            time,
        }
    }
}

/// Everything the handlers need from persistence.
///
/// The `find_or_create_*` methods are the atomic primitive the id allocation
/// relies on: for one key, concurrent callers must never both see `created`.
/// Rows are never updated or deleted once written.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    async fn find_or_create_user(&self, user_id: String, user: &NewUser) -> StoreResult<FindOrCreate<User>>;

    async fn find_or_create_article(&self, article_id: String, article: &NewArticle) -> StoreResult<FindOrCreate<Article>>;

    /// Content rows are keyed by the article they belong to.
    async fn find_or_create_content(&self, article: &Article, content: &str) -> StoreResult<FindOrCreate<ArticleContent>>;

    async fn find_or_create_comment(&self, comment_id: String, comment: &NewComment) -> StoreResult<FindOrCreate<Comment>>;

    async fn user(&self, user_id: &str) -> StoreResult<Option<User>>;

    async fn articles_by_id(&self, article_id: &str) -> StoreResult<Vec<Article>>;
    async fn articles_by_user(&self, user_id: &str) -> StoreResult<Vec<Article>>;
    async fn contents_by_article(&self, article_id: &str) -> StoreResult<Vec<ArticleContent>>;
    async fn comments_by_article(&self, article_id: &str) -> StoreResult<Vec<Comment>>;
    async fn comments_by_user(&self, user_id: &str) -> StoreResult<Vec<Comment>>;

    async fn ping(&self) -> StoreResult<()>;
}
