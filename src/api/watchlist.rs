use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::error;

use super::error::{json_body, ApiError};
use crate::db::{DbError, WatchlistRepo};
use crate::server::AppState;
use crate::session::SessionUser;

const MOVIE_ID_REQUIRED: &str = "Movie ID is required";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistRequest {
    pub movie_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct WatchlistResponse {
    pub success: bool,
    pub watchlist: Vec<i64>,
}

fn movie_id(body: Result<Json<WatchlistRequest>, JsonRejection>) -> Result<i64, ApiError> {
    json_body(body, MOVIE_ID_REQUIRED)?
        .movie_id
        .ok_or_else(|| ApiError::BadRequest(MOVIE_ID_REQUIRED.to_string()))
}

/// The bare id list; read failures degrade to an empty list.
pub async fn get_watchlist(State(state): State<AppState>, user: SessionUser) -> Json<Vec<i64>> {
    match state.store.get_watchlist(&user.name).await {
        Ok(list) => Json(list.unwrap_or_default()),
        Err(e) => {
            error!(username = %user.name, "watchlist read error: {}", e);
            Json(Vec::new())
        }
    }
}

pub async fn add_to_watchlist(
    State(state): State<AppState>,
    user: SessionUser,
    body: Result<Json<WatchlistRequest>, JsonRejection>,
) -> Result<Json<WatchlistResponse>, ApiError> {
    let movie_id = movie_id(body)?;
    let watchlist = state.store.add_to_watchlist(&user.name, movie_id).await?;
    Ok(Json(WatchlistResponse {
        success: true,
        watchlist,
    }))
}

pub async fn remove_from_watchlist(
    State(state): State<AppState>,
    user: SessionUser,
    body: Result<Json<WatchlistRequest>, JsonRejection>,
) -> Result<Json<WatchlistResponse>, ApiError> {
    let movie_id = movie_id(body)?;
    match state.store.remove_from_watchlist(&user.name, movie_id).await {
        Ok(watchlist) => Ok(Json(WatchlistResponse {
            success: true,
            watchlist,
        })),
        Err(DbError::NotFound(_)) => Err(ApiError::NotFound("Watchlist not found".to_string())),
        Err(e) => Err(e.into()),
    }
}
