use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::{Deserialize, Serialize};

use super::error::{json_body, ApiError};
use crate::server::AppState;
use crate::spell::Suggester;

#[derive(Debug, Deserialize)]
pub struct SpellRequest {
    #[serde(default)]
    pub word: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SpellResponse {
    pub suggestions: Vec<String>,
}

pub async fn spellcheck(
    State(state): State<AppState>,
    body: Result<Json<SpellRequest>, JsonRejection>,
) -> Result<Json<SpellResponse>, ApiError> {
    let word = json_body(body, "Invalid request")?.word.unwrap_or_default();
    if word.trim().is_empty() {
        return Ok(Json(SpellResponse {
            suggestions: Vec::new(),
        }));
    }

    let speller = state
        .speller
        .as_ref()
        .ok_or_else(|| ApiError::Internal("spell checker unavailable".to_string()))?;

    Ok(Json(SpellResponse {
        suggestions: speller.suggest(word.trim()),
    }))
}
