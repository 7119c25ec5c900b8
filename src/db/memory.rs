use std::sync::{
    Mutex, MutexGuard,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::claim::FindOrCreate;

use super::{
    Article, ArticleContent, Comment, NewArticle, NewComment, NewUser, Store, StoreError,
    StoreResult, User,
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    articles: Vec<Article>,
    contents: Vec<ArticleContent>,
    comments: Vec<Comment>,
}

/// Process-local store. One lock over all tables makes every
/// find-or-create atomic. Rows keep insertion order.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every call fails as if the backend went away.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn tables(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store switched off".to_owned()));
        }
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store poisoned".to_owned()))
    }
}

fn find_or_insert<T: Clone>(
    rows: &mut Vec<T>,
    holds_key: impl Fn(&T) -> bool,
    make: impl FnOnce() -> T,
) -> FindOrCreate<T> {
    if let Some(existing) = rows.iter().find(|row| holds_key(row)) {
        return FindOrCreate::found(existing.clone());
    }
    let row = make();
    rows.push(row.clone());
    FindOrCreate::created(row)
}

fn matching<T: Clone>(rows: &[T], keep: impl Fn(&T) -> bool) -> Vec<T> {
    rows.iter().filter(|row| keep(row)).cloned().collect()
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_or_create_user(&self, user_id: String, user: &NewUser) -> StoreResult<FindOrCreate<User>> {
        let mut tables = self.tables()?;
        Ok(find_or_insert(
            &mut tables.users,
            |row| row.user_id == user_id,
            || user.clone().into_user(user_id.clone(), OffsetDateTime::now_utc()),
        ))
    }

    async fn find_or_create_article(&self, article_id: String, article: &NewArticle) -> StoreResult<FindOrCreate<Article>> {
        let mut tables = self.tables()?;
        Ok(find_or_insert(
            &mut tables.articles,
            |row| row.article_id == article_id,
            || article.clone().into_article(article_id.clone(), OffsetDateTime::now_utc()),
        ))
    }

    async fn find_or_create_content(&self, article: &Article, content: &str) -> StoreResult<FindOrCreate<ArticleContent>> {
        let mut tables = self.tables()?;
        Ok(find_or_insert(
            &mut tables.contents,
            |row| row.article_id == article.article_id,
            || ArticleContent {
                article_id: article.article_id.clone(),
                content: content.to_owned(),
            },
        ))
    }

    async fn find_or_create_comment(&self, comment_id: String, comment: &NewComment) -> StoreResult<FindOrCreate<Comment>> {
        let mut tables = self.tables()?;
        Ok(find_or_insert(
            &mut tables.comments,
            |row| row.comment_id == comment_id,
            || comment.clone().into_comment(comment_id.clone(), OffsetDateTime::now_utc()),
        ))
    }

    async fn user(&self, user_id: &str) -> StoreResult<Option<User>> {
        Ok(self.tables()?.users.iter().find(|row| row.user_id == user_id).cloned())
    }

    async fn articles_by_id(&self, article_id: &str) -> StoreResult<Vec<Article>> {
        Ok(matching(&self.tables()?.articles, |row| row.article_id == article_id))
    }

    async fn articles_by_user(&self, user_id: &str) -> StoreResult<Vec<Article>> {
        Ok(matching(&self.tables()?.articles, |row| row.user_id == user_id))
    }

    async fn contents_by_article(&self, article_id: &str) -> StoreResult<Vec<ArticleContent>> {
        Ok(matching(&self.tables()?.contents, |row| row.article_id == article_id))
    }

    async fn comments_by_article(&self, article_id: &str) -> StoreResult<Vec<Comment>> {
        Ok(matching(&self.tables()?.comments, |row| row.article_id == article_id))
    }

    async fn comments_by_user(&self, user_id: &str) -> StoreResult<Vec<Comment>> {
        Ok(matching(&self.tables()?.comments, |row| row.user_id == user_id))
    }

    async fn ping(&self) -> StoreResult<()> {
        self.tables().map(|_| ())
    }
}
