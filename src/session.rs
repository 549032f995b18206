//! Credentials sessions carried as signed, expiring tokens.

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::ApiError;
use crate::db::User;
use crate::server::AppState;

const SESSION_COOKIE: &str = "session";

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    uid: String,
    iat: i64,
    exp: i64,
}

/// The authenticated user of a request.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionUser {
    pub id: String,
    pub name: String,
    pub expires: DateTime<Utc>,
}

pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    max_age_secs: i64,
}

impl SessionKeys {
    pub fn new(secret: &[u8], max_age_secs: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            max_age_secs: max_age_secs.min(i64::MAX as u64) as i64,
        }
    }

    /// Keys that only live as long as this process.
    pub fn ephemeral(max_age_secs: u64) -> Self {
        let secret = format!("{}{}", uuid::Uuid::new_v4().simple(), uuid::Uuid::new_v4().simple());
        Self::new(secret.as_bytes(), max_age_secs)
    }

    pub fn issue(&self, user: &User) -> Result<(String, SessionUser), jsonwebtoken::errors::Error> {
        self.issue_at(user, Utc::now())
    }

    fn issue_at(
        &self,
        user: &User,
        now: DateTime<Utc>,
    ) -> Result<(String, SessionUser), jsonwebtoken::errors::Error> {
        let iat = now.timestamp();
        let claims = Claims {
            sub: user.username.clone(),
            uid: user.id.clone(),
            iat,
            exp: iat + self.max_age_secs,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        Ok((token, session_user(claims)))
    }

    pub fn verify(&self, token: &str) -> Option<SessionUser> {
        match decode::<Claims>(token, &self.decoding, &self.validation) {
            Ok(data) => Some(session_user(data.claims)),
            Err(e) => {
                debug!("rejected session token: {}", e);
                None
            }
        }
    }
}

fn session_user(claims: Claims) -> SessionUser {
    SessionUser {
        id: claims.uid,
        name: claims.sub,
        expires: Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .unwrap_or_else(Utc::now),
    }
}

fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth) = headers.get(header::AUTHORIZATION).and_then(|h| h.to_str().ok()) {
        if let Some(token) = auth.strip_prefix("Bearer ") {
            return Some(token.trim().to_string());
        }
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

/// Attach the session user, if the request carries a valid token.
pub async fn session_middleware(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    if let Some(user) = extract_token(req.headers()).and_then(|t| state.sessions.verify(&t)) {
        req.extensions_mut().insert(user);
    }
    next.run(req).await
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for SessionUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionUser>()
            .cloned()
            .ok_or(ApiError::Unauthorized)
    }
}
