use async_trait::async_trait;
use axum::http::{HeaderMap, header};
use chrono::DateTime;
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    models::Session,
};

/// Name of the cookie carrying the session token when no bearer header is sent.
pub const SESSION_COOKIE: &str = "session";

/// Header accepted in `Env::Local` as a stand-in for a real session.
pub const DEV_USER_HEADER: &str = "x-user-id";

/// Claims
///
/// Payload of the session JWT issued by the auth provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id. Absent for anonymous/guest tokens.
    #[serde(default)]
    pub sub: Option<Uuid>,
    /// Expiration time (seconds since epoch). Always validated.
    pub exp: usize,
    /// Issued at (seconds since epoch).
    #[serde(default)]
    pub iat: usize,
    /// Role as claimed by the issuer. Informational only: authorization is
    /// always re-resolved from the `UserStore`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// SessionProvider
///
/// Resolves the caller's session from request headers. `None` means the
/// caller is unauthenticated; a provider never fails the request itself.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn current_session(&self, headers: &HeaderMap) -> Option<Session>;
}

pub type SessionProviderState = Arc<dyn SessionProvider>;

/// JwtSessionProvider
///
/// Validates an HS256 session token from `Authorization: Bearer <token>` or,
/// failing that, the `session` cookie. In `Env::Local` a UUID in the
/// `x-user-id` header is accepted first, which lets developers impersonate a
/// seeded profile without minting tokens.
pub struct JwtSessionProvider {
    decoding_key: DecodingKey,
    validation: Validation,
    env: Env,
}

impl JwtSessionProvider {
    pub fn new(secret: &str, env: Env) -> Self {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            env,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.jwt_secret, config.env.clone())
    }

    fn dev_bypass(&self, headers: &HeaderMap) -> Option<Session> {
        if self.env != Env::Local {
            return None;
        }
        let raw = headers.get(DEV_USER_HEADER)?.to_str().ok()?;
        let user_id = Uuid::parse_str(raw.trim()).ok()?;
        tracing::debug!(%user_id, "local session bypass via x-user-id");
        Some(Session::for_user(user_id))
    }

    fn decode_token(&self, token: &str) -> Option<Session> {
        match decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => {
                let claims = data.claims;
                Some(Session {
                    user_id: claims.sub,
                    expires_at: DateTime::from_timestamp(claims.exp as i64, 0),
                })
            }
            Err(e) => {
                match e.kind() {
                    ErrorKind::ExpiredSignature => tracing::debug!("session token expired"),
                    other => tracing::debug!(reason = ?other, "session token rejected"),
                }
                None
            }
        }
    }
}

#[async_trait]
impl SessionProvider for JwtSessionProvider {
    async fn current_session(&self, headers: &HeaderMap) -> Option<Session> {
        if let Some(session) = self.dev_bypass(headers) {
            return Some(session);
        }

        let token = bearer_token(headers).or_else(|| session_cookie(headers))?;
        self.decode_token(token)
    }
}

// Auth schemes are case-insensitive (RFC 7235).
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let (scheme, token) = headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .trim()
        .split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("Bearer") && !token.is_empty()).then_some(token)
}

fn session_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, token)| token.trim())
        .filter(|token| !token.is_empty())
}
