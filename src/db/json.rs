use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::model::*;
use super::repo::*;

const USERS_FILE: &str = "users.json";
const WATCHLIST_FILE: &str = "watchlist.json";
const REVIEWS_FILE: &str = "reviews.json";

type WatchlistData = BTreeMap<String, Vec<i64>>;

/// Flat-file store: one JSON document per collection.
///
/// Every read-modify-write runs under a single lock and lands via
/// write-to-temp-then-rename, so readers never see a torn file and writers
/// never clobber each other within this process.
pub struct JsonStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonStore {
    pub async fn new(dir: impl Into<PathBuf>) -> DbResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        info!("JSON store initialized at {}", dir.display());
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.dir
    }

    async fn read<T: DeserializeOwned + Default>(&self, name: &str) -> DbResult<T> {
        let path = self.dir.join(name);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => Ok(T::default()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("{} does not exist yet", path.display());
                Ok(T::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write<T: Serialize>(&self, name: &str, value: &T) -> DbResult<()> {
        let path = self.dir.join(name);
        let tmp = self.dir.join(format!("{}.tmp", name));
        let content = serde_json::to_string_pretty(value)?;
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl UserRepo for JsonStore {
    async fn get_user(&self, username: &str) -> DbResult<User> {
        let users: Vec<User> = self.read(USERS_FILE).await?;
        users
            .into_iter()
            .find(|u| u.username == username)
            .ok_or_else(|| DbError::NotFound(format!("User not found: {}", username)))
    }

    async fn create_user(&self, user: &User) -> DbResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut users: Vec<User> = self.read(USERS_FILE).await?;
        if users.iter().any(|u| u.username == user.username) {
            return Err(DbError::AlreadyExists(format!("User {}", user.username)));
        }
        users.push(user.clone());
        self.write(USERS_FILE, &users).await
    }
}

#[async_trait]
impl WatchlistRepo for JsonStore {
    async fn get_watchlist(&self, username: &str) -> DbResult<Option<Vec<i64>>> {
        let mut data: WatchlistData = self.read(WATCHLIST_FILE).await?;
        Ok(data.remove(username))
    }

    async fn add_to_watchlist(&self, username: &str, movie_id: i64) -> DbResult<Vec<i64>> {
        let _guard = self.write_lock.lock().await;
        let mut data: WatchlistData = self.read(WATCHLIST_FILE).await?;
        let list = data.entry(username.to_string()).or_default();
        if !list.contains(&movie_id) {
            list.push(movie_id);
            let result = list.clone();
            self.write(WATCHLIST_FILE, &data).await?;
            return Ok(result);
        }
        Ok(list.clone())
    }

    async fn remove_from_watchlist(&self, username: &str, movie_id: i64) -> DbResult<Vec<i64>> {
        let _guard = self.write_lock.lock().await;
        let mut data: WatchlistData = self.read(WATCHLIST_FILE).await?;
        let list = data
            .get_mut(username)
            .ok_or_else(|| DbError::NotFound(format!("Watchlist for {}", username)))?;
        list.retain(|id| *id != movie_id);
        let result = list.clone();
        self.write(WATCHLIST_FILE, &data).await?;
        Ok(result)
    }
}

#[async_trait]
impl ReviewRepo for JsonStore {
    async fn get_review(&self, username: &str, movie_id: i64) -> DbResult<Option<Review>> {
        let reviews: Vec<Review> = self.read(REVIEWS_FILE).await?;
        Ok(reviews
            .into_iter()
            .find(|r| r.username == username && r.movie_id == movie_id))
    }

    async fn upsert_review(&self, review: &Review) -> DbResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut reviews: Vec<Review> = self.read(REVIEWS_FILE).await?;
        match reviews
            .iter_mut()
            .find(|r| r.username == review.username && r.movie_id == review.movie_id)
        {
            Some(existing) => *existing = review.clone(),
            None => reviews.push(review.clone()),
        }
        self.write(REVIEWS_FILE, &reviews).await
    }
}

impl Repository for JsonStore {
    fn backend_name(&self) -> &'static str {
        "json"
    }
}
