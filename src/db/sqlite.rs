use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use tracing::info;

use super::model::*;
use super::repo::*;

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub async fn new(db_path: &str) -> DbResult<Self> {
        let options = SqliteConnectOptions::from_str(db_path)?.create_if_missing(true);

        // Every connection to an in-memory database is a database of its own.
        let max_connections = if db_path.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let repo = Self { pool };
        repo.init_schema().await?;

        info!("Database initialized at {}", db_path);

        Ok(repo)
    }

    async fn init_schema(&self) -> DbResult<()> {
        let schema = include_str!("schema.sql");
        sqlx::raw_sql(schema).execute(&self.pool).await?;
        Ok(())
    }

    async fn watchlist_ids(tx: &mut Transaction<'_, Sqlite>, username: &str) -> DbResult<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT movie_id FROM watchlist_items WHERE username = ? ORDER BY seq",
        )
        .bind(username)
        .fetch_all(&mut **tx)
        .await?;
        Ok(ids)
    }
}

#[async_trait]
impl UserRepo for SqliteRepository {
    async fn get_user(&self, username: &str) -> DbResult<User> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, hashed_password, created FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => DbError::NotFound(format!("User not found: {}", username)),
            _ => DbError::Sqlx(e),
        })
    }

    async fn create_user(&self, user: &User) -> DbResult<()> {
        sqlx::query("INSERT INTO users (id, username, hashed_password, created) VALUES (?, ?, ?, ?)")
            .bind(&user.id)
            .bind(&user.username)
            .bind(&user.hashed_password)
            .bind(&user.created)
            .execute(&self.pool)
            .await
            .map_err(|e| match e.as_database_error() {
                Some(db) if db.is_unique_violation() => {
                    DbError::AlreadyExists(format!("User {}", user.username))
                }
                _ => DbError::Sqlx(e),
            })?;
        Ok(())
    }
}

#[async_trait]
impl WatchlistRepo for SqliteRepository {
    async fn get_watchlist(&self, username: &str) -> DbResult<Option<Vec<i64>>> {
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query_scalar::<_, String>("SELECT username FROM watchlists WHERE username = ?")
            .bind(username)
            .fetch_optional(&mut *tx)
            .await?
            .is_some();
        if !exists {
            return Ok(None);
        }

        let ids = Self::watchlist_ids(&mut tx, username).await?;
        tx.commit().await?;
        Ok(Some(ids))
    }

    async fn add_to_watchlist(&self, username: &str, movie_id: i64) -> DbResult<Vec<i64>> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT OR IGNORE INTO watchlists (username) VALUES (?)")
            .bind(username)
            .execute(&mut *tx)
            .await?;
        sqlx::query("INSERT OR IGNORE INTO watchlist_items (username, movie_id) VALUES (?, ?)")
            .bind(username)
            .bind(movie_id)
            .execute(&mut *tx)
            .await?;

        let ids = Self::watchlist_ids(&mut tx, username).await?;
        tx.commit().await?;
        Ok(ids)
    }

    async fn remove_from_watchlist(&self, username: &str, movie_id: i64) -> DbResult<Vec<i64>> {
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query_scalar::<_, String>("SELECT username FROM watchlists WHERE username = ?")
            .bind(username)
            .fetch_optional(&mut *tx)
            .await?
            .is_some();
        if !exists {
            return Err(DbError::NotFound(format!("Watchlist for {}", username)));
        }

        sqlx::query("DELETE FROM watchlist_items WHERE username = ? AND movie_id = ?")
            .bind(username)
            .bind(movie_id)
            .execute(&mut *tx)
            .await?;

        let ids = Self::watchlist_ids(&mut tx, username).await?;
        tx.commit().await?;
        Ok(ids)
    }
}

#[async_trait]
impl ReviewRepo for SqliteRepository {
    async fn get_review(&self, username: &str, movie_id: i64) -> DbResult<Option<Review>> {
        let review = sqlx::query_as::<_, Review>(
            "SELECT username, movie_id, rating, comment FROM reviews WHERE username = ? AND movie_id = ?",
        )
        .bind(username)
        .bind(movie_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(review)
    }

    async fn upsert_review(&self, review: &Review) -> DbResult<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO reviews (username, movie_id, rating, comment) VALUES (?, ?, ?, ?)",
        )
        .bind(&review.username)
        .bind(review.movie_id)
        .bind(review.rating)
        .bind(&review.comment)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

impl Repository for SqliteRepository {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}
