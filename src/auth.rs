//! Request authentication.
//!
//! A request may carry a session cookie (issued by the storefront's session
//! layer) or an `Authorization: Bearer` token (issued by seller login or the
//! admin tooling). Both are HS256 JWTs over the same claims. The
//! [`resolve_auth`] middleware runs the [`AuthResolver`] once per request and
//! stores the resulting [`AuthContext`] in the request extensions, where the
//! `Require*` extractors pick it up.

use async_trait::async_trait;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Admin,
    Seller,
    Customer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    #[serde(rename = "type")]
    pub user_type: UserType,
    pub iat: i64,
    pub exp: i64,
}

/// Where the credential came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthSource {
    Session,
    Token,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub user_type: UserType,
    pub source: AuthSource,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid or expired credential: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
    #[error("token lifetime out of range")]
    InvalidLifetime,
}

pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl JwtKeys {
    pub fn new(secret: &[u8], ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
            ttl: Duration::try_hours(ttl_hours).unwrap_or_else(|| Duration::hours(24)),
        }
    }

    pub fn issue(&self, user_id: Uuid, user_type: UserType, now: DateTime<Utc>) -> Result<String, AuthError> {
        let exp = now.checked_add_signed(self.ttl).ok_or(AuthError::InvalidLifetime)?;
        let claims = Claims { sub: user_id, user_type, iat: now.timestamp(), exp: exp.timestamp() };
        Ok(jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        Ok(jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)?.claims)
    }
}

/// Pulls a raw credential out of the request headers.
pub trait CredentialSource: Send + Sync {
    fn source(&self) -> AuthSource;
    fn extract(&self, headers: &HeaderMap) -> Option<String>;
}

pub struct SessionAuth {
    cookie_name: String,
}

impl SessionAuth {
    pub fn new(cookie_name: impl Into<String>) -> Self { Self { cookie_name: cookie_name.into() } }
}

impl CredentialSource for SessionAuth {
    fn source(&self) -> AuthSource { AuthSource::Session }

    fn extract(&self, headers: &HeaderMap) -> Option<String> {
        headers.get_all(COOKIE).iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.cookie_name)
            .map(|(_, value)| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }
}

pub struct TokenAuth;

impl CredentialSource for TokenAuth {
    fn source(&self) -> AuthSource { AuthSource::Token }

    fn extract(&self, headers: &HeaderMap) -> Option<String> {
        let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
        let (scheme, token) = value.split_once(' ')?;
        (scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty()).then(|| token.trim().to_string())
    }
}

/// Tries each source in order; the first credential present decides.
pub struct AuthResolver {
    keys: JwtKeys,
    sources: Vec<Box<dyn CredentialSource>>,
}

impl AuthResolver {
    pub fn new(keys: JwtKeys, cookie_name: &str) -> Self {
        Self { keys, sources: vec![Box::new(SessionAuth::new(cookie_name)), Box::new(TokenAuth)] }
    }

    pub fn keys(&self) -> &JwtKeys { &self.keys }

    pub fn resolve(&self, headers: &HeaderMap) -> Result<Option<AuthContext>, AuthError> {
        for source in &self.sources {
            if let Some(raw) = source.extract(headers) {
                let claims = self.keys.verify(&raw)?;
                return Ok(Some(AuthContext { user_id: claims.sub, user_type: claims.user_type, source: source.source() }));
            }
        }
        Ok(None)
    }
}

pub async fn resolve_auth(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    match state.auth.resolve(request.headers()) {
        Ok(Some(context)) => { request.extensions_mut().insert(context); }
        Ok(None) => {}
        Err(err) => {
            tracing::debug!(error = %err, path = %request.uri().path(), "rejected credential");
            return ApiError::unauthorized().into_response();
        }
    }
    next.run(request).await
}

fn require(parts: &Parts, user_type: UserType) -> Result<AuthContext, ApiError> {
    let context = parts.extensions.get::<AuthContext>().copied().ok_or_else(ApiError::unauthorized)?;
    if context.user_type != user_type { return Err(ApiError::forbidden()); }
    Ok(context)
}

pub struct RequireAdmin(pub AuthContext);
pub struct RequireSeller(pub AuthContext);
pub struct RequireCustomer(pub AuthContext);
pub struct MaybeAuth(pub Option<AuthContext>);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for RequireAdmin {
    type Rejection = ApiError;
    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        require(parts, UserType::Admin).map(Self)
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for RequireSeller {
    type Rejection = ApiError;
    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        require(parts, UserType::Seller).map(Self)
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for RequireCustomer {
    type Rejection = ApiError;
    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        require(parts, UserType::Customer).map(Self)
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for MaybeAuth {
    type Rejection = std::convert::Infallible;
    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<AuthContext>().copied()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn resolver() -> AuthResolver { AuthResolver::new(JwtKeys::new(SECRET, 1), "session-token") }

    #[test]
    fn test_bearer_and_cookie_sources() {
        let r = resolver();
        let id = Uuid::new_v4();
        let token = r.keys().issue(id, UserType::Seller, Utc::now()).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}")).unwrap());
        let ctx = r.resolve(&headers).unwrap().unwrap();
        assert_eq!((ctx.user_id, ctx.user_type, ctx.source), (id, UserType::Seller, AuthSource::Token));

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(&format!("theme=dark; session-token={token}")).unwrap());
        assert_eq!(r.resolve(&headers).unwrap().unwrap().source, AuthSource::Session);

        assert!(r.resolve(&HeaderMap::new()).unwrap().is_none());
    }

    #[test]
    fn test_invalid_credentials_rejected() {
        let r = resolver();
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer not-a-jwt"));
        assert!(r.resolve(&headers).is_err());

        let other = JwtKeys::new(b"another-secret-another-secret-xx", 1);
        let forged = other.issue(Uuid::new_v4(), UserType::Admin, Utc::now()).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {forged}")).unwrap());
        assert!(r.resolve(&headers).is_err());

        let expired = r.keys().issue(Uuid::new_v4(), UserType::Admin, Utc::now() - Duration::hours(3)).unwrap();
        assert!(r.keys().verify(&expired).is_err());
    }
}
