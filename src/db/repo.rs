use async_trait::async_trait;

use super::model::*;

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn get_user(&self, username: &str) -> DbResult<User>;
    /// Fails with [`DbError::AlreadyExists`] when the username is taken.
    async fn create_user(&self, user: &User) -> DbResult<()>;
}

#[async_trait]
pub trait WatchlistRepo: Send + Sync {
    /// `None` when the user has never had a watchlist.
    async fn get_watchlist(&self, username: &str) -> DbResult<Option<Vec<i64>>>;
    /// Adds `movie_id` unless present; returns the resulting list.
    async fn add_to_watchlist(&self, username: &str, movie_id: i64) -> DbResult<Vec<i64>>;
    /// Fails with [`DbError::NotFound`] when the user has no watchlist.
    async fn remove_from_watchlist(&self, username: &str, movie_id: i64) -> DbResult<Vec<i64>>;
}

#[async_trait]
pub trait ReviewRepo: Send + Sync {
    async fn get_review(&self, username: &str, movie_id: i64) -> DbResult<Option<Review>>;
    /// One review per (username, movie); a second submission replaces the first.
    async fn upsert_review(&self, review: &Review) -> DbResult<()>;
}

pub trait Repository: UserRepo + WatchlistRepo + ReviewRepo + Send + Sync {
    fn backend_name(&self) -> &'static str;
}
