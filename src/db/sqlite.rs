use std::{str::FromStr, time::Duration};

use async_trait::async_trait;
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use time::OffsetDateTime;
use tracing::info;

use crate::claim::FindOrCreate;

use super::{
    Article, ArticleContent, Comment, NewArticle, NewComment, NewUser, Store, StoreResult, User,
};

/// sqlx-backed store. The primary key constraint plus
/// `ON CONFLICT DO NOTHING RETURNING` makes each claim a single atomic statement.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, max_connections: u32, idle_timeout: Duration) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .min_connections(0)
            .idle_timeout(idle_timeout)
            .connect_with(options)
            .await?;
        info!(url, max_connections, "connected to sqlite");
        Ok(Self::new(pool))
    }

    /// Creates missing tables. Existing tables are left as they are.
    pub async fn sync_schema(&self) -> StoreResult<()> {
        sqlx::raw_sql(include_str!("../sql/schema.sql"))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn find_or_create_user(&self, user_id: String, user: &NewUser) -> StoreResult<FindOrCreate<User>> {
        let inserted: Option<User> = sqlx::query_as(
            "INSERT INTO users (user_id,first_name,last_name,email,username,created_at) VALUES (?,?,?,?,?,?)
             ON CONFLICT (user_id) DO NOTHING
             RETURNING user_id,first_name,last_name,email,username,created_at",
        )
        .bind(&user_id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.username)
        .bind(OffsetDateTime::now_utc())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(user) = inserted {
            return Ok(FindOrCreate::created(user));
        }

        let existing: User = sqlx::query_as(
            "SELECT user_id,first_name,last_name,email,username,created_at FROM users WHERE user_id=?",
        )
        .bind(&user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(FindOrCreate::found(existing))
    }

    async fn find_or_create_article(&self, article_id: String, article: &NewArticle) -> StoreResult<FindOrCreate<Article>> {
        let inserted: Option<Article> = sqlx::query_as(
            "INSERT INTO articles (article_id,user_id,title,description,file_url,created_at) VALUES (?,?,?,?,?,?)
             ON CONFLICT (article_id) DO NOTHING
             RETURNING article_id,user_id,title,description,file_url,created_at",
        )
        .bind(&article_id)
        .bind(&article.user_id)
        .bind(&article.title)
        .bind(&article.description)
        .bind(&article.file_url)
        .bind(OffsetDateTime::now_utc())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(article) = inserted {
            return Ok(FindOrCreate::created(article));
        }

        let existing: Article = sqlx::query_as(
            "SELECT article_id,user_id,title,description,file_url,created_at FROM articles WHERE article_id=?",
        )
        .bind(&article_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(FindOrCreate::found(existing))
    }

    async fn find_or_create_content(&self, article: &Article, content: &str) -> StoreResult<FindOrCreate<ArticleContent>> {
        let inserted: Option<ArticleContent> = sqlx::query_as(
            "INSERT INTO article_contents (article_id,content) VALUES (?,?)
             ON CONFLICT (article_id) DO NOTHING
             RETURNING article_id,content",
        )
        .bind(&article.article_id)
        .bind(content)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(content) = inserted {
            return Ok(FindOrCreate::created(content));
        }

        let existing: ArticleContent =
            sqlx::query_as("SELECT article_id,content FROM article_contents WHERE article_id=?")
                .bind(&article.article_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(FindOrCreate::found(existing))
    }

    async fn find_or_create_comment(&self, comment_id: String, comment: &NewComment) -> StoreResult<FindOrCreate<Comment>> {
        let inserted: Option<Comment> = sqlx::query_as(
            "INSERT INTO comments (comment_id,article_id,user_id,content,time) VALUES (?,?,?,?,?)
             ON CONFLICT (comment_id) DO NOTHING
             RETURNING comment_id,article_id,user_id,content,time",
        )
        .bind(&comment_id)
        .bind(&comment.article_id)
        .bind(&comment.user_id)
        .bind(&comment.content)
        .bind(OffsetDateTime::now_utc())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(comment) = inserted {
            return Ok(FindOrCreate::created(comment));
        }

        let existing: Comment = sqlx::query_as(
            "SELECT comment_id,article_id,user_id,content,time FROM comments WHERE comment_id=?",
        )
        .bind(&comment_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(FindOrCreate::found(existing))
    }

    async fn user(&self, user_id: &str) -> StoreResult<Option<User>> {
        Ok(sqlx::query_as(
            "SELECT user_id,first_name,last_name,email,username,created_at FROM users WHERE user_id=?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn articles_by_id(&self, article_id: &str) -> StoreResult<Vec<Article>> {
        Ok(sqlx::query_as(
            "SELECT article_id,user_id,title,description,file_url,created_at FROM articles WHERE article_id=? ORDER BY rowid",
        )
        .bind(article_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn articles_by_user(&self, user_id: &str) -> StoreResult<Vec<Article>> {
        Ok(sqlx::query_as(
            "SELECT article_id,user_id,title,description,file_url,created_at FROM articles WHERE user_id=? ORDER BY rowid",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn contents_by_article(&self, article_id: &str) -> StoreResult<Vec<ArticleContent>> {
        Ok(sqlx::query_as("SELECT article_id,content FROM article_contents WHERE article_id=?")
            .bind(article_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn comments_by_article(&self, article_id: &str) -> StoreResult<Vec<Comment>> {
        Ok(sqlx::query_as(
            "SELECT comment_id,article_id,user_id,content,time FROM comments WHERE article_id=? ORDER BY rowid",
        )
        .bind(article_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn comments_by_user(&self, user_id: &str) -> StoreResult<Vec<Comment>> {
        Ok(sqlx::query_as(
            "SELECT comment_id,article_id,user_id,content,time FROM comments WHERE user_id=? ORDER BY rowid",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
