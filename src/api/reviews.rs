use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use super::error::{json_body, ApiError};
use crate::db::{Review, ReviewRepo};
use crate::server::AppState;
use crate::session::SessionUser;

const INVALID_FIELDS: &str = "Invalid or missing fields";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewQuery {
    pub movie_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub movie_id: i64,
    pub rating: i32,
    pub comment: String,
}

/// The caller's review of one movie, or 204 when there is none.
pub async fn get_review(
    State(state): State<AppState>,
    user: SessionUser,
    Query(query): Query<ReviewQuery>,
) -> Result<Response, ApiError> {
    let movie_id = query
        .movie_id
        .as_deref()
        .and_then(|id| id.trim().parse::<i64>().ok())
        .ok_or_else(|| ApiError::BadRequest("Missing or invalid movieId".to_string()))?;

    match state.store.get_review(&user.name, movie_id).await? {
        Some(review) => Ok(Json(review).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

pub async fn submit_review(
    State(state): State<AppState>,
    user: SessionUser,
    body: Result<Json<ReviewRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let req = json_body(body, INVALID_FIELDS)?;
    if !(1..=5).contains(&req.rating) {
        return Err(ApiError::BadRequest("Rating must be between 1 and 5".to_string()));
    }

    let review = Review {
        username: user.name,
        movie_id: req.movie_id,
        rating: req.rating,
        comment: req.comment,
    };
    state.store.upsert_review(&review).await?;
    Ok(Json(json!({ "success": true })))
}
