use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use super::error::{json_body, ApiError};
use crate::db::{DbError, User, UserRepo};
use crate::server::AppState;
use crate::session::SessionUser;

const BCRYPT_COST: u32 = 10;

#[derive(Debug, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub user: SessionName,
    pub expires: String,
}

#[derive(Debug, Serialize)]
pub struct SessionName {
    pub name: String,
}

impl From<&SessionUser> for SessionInfo {
    fn from(user: &SessionUser) -> Self {
        Self {
            user: SessionName {
                name: user.name.clone(),
            },
            expires: user.expires.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(flatten)]
    pub session: SessionInfo,
}

async fn hash_password(password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, BCRYPT_COST))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|e| ApiError::Internal(e.to_string()))
}

async fn verify_password(password: String, hashed: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hashed))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|e| ApiError::Internal(e.to_string()))
}

pub async fn signup(
    State(state): State<AppState>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let creds = json_body(body, "Missing fields")?;
    if creds.username.is_empty() || creds.password.is_empty() {
        return Err(ApiError::BadRequest("Missing fields".to_string()));
    }

    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        username: creds.username,
        hashed_password: hash_password(creds.password).await?,
        created: Some(chrono::Utc::now().to_rfc3339()),
    };

    match state.store.create_user(&user).await {
        Ok(()) => {
            info!(username = %user.username, "created user");
            Ok(Json(json!({ "success": true })))
        }
        Err(DbError::AlreadyExists(_)) => Err(ApiError::Conflict("User already exists".to_string())),
        Err(e) => Err(e.into()),
    }
}

pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let creds = json_body(body, "Missing fields")?;
    if creds.username.is_empty() || creds.password.is_empty() {
        return Err(ApiError::Unauthorized);
    }

    let user = match state.store.get_user(&creds.username).await {
        Ok(user) => user,
        Err(DbError::NotFound(_)) => {
            warn!(username = %creds.username, "login for unknown user");
            return Err(ApiError::Unauthorized);
        }
        Err(e) => return Err(e.into()),
    };

    if !verify_password(creds.password, user.hashed_password.clone()).await? {
        warn!(username = %user.username, "login with wrong password");
        return Err(ApiError::Unauthorized);
    }

    let (token, session) = state
        .sessions
        .issue(&user)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    info!(username = %user.username, "user logged in");

    Ok(Json(LoginResponse {
        token,
        session: SessionInfo::from(&session),
    }))
}

pub async fn session(user: SessionUser) -> Json<SessionInfo> {
    Json(SessionInfo::from(&user))
}
