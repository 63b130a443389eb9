//! Bearer-token extractors.
//!
//! [`AuthSession`] accepts any open session; [`AdminSession`] additionally
//! requires the administrator principal. Both read
//! `Authorization: Bearer <token>` and reject with a [`StorefrontError`].

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::app_state::AppState;
use crate::domain::{Session, SessionToken};
use crate::error::StorefrontError;

/// An authenticated session (customer or administrator).
#[derive(Debug, Clone)]
pub struct AuthSession(pub Session);

/// An authenticated administrator session.
#[derive(Debug, Clone)]
pub struct AdminSession(pub Session);

/// Pulls the bearer token out of the request headers.
pub(crate) fn bearer_token(parts: &Parts) -> Option<SessionToken> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))?
        .trim();
    (!token.is_empty()).then(|| SessionToken::from_string(token.to_string()))
}

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = StorefrontError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(StorefrontError::Unauthorized)?;
        state.identity.authenticate(&token).await.map(Self)
    }
}

impl FromRequestParts<AppState> for AdminSession {
    type Rejection = StorefrontError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthSession(session) = AuthSession::from_request_parts(parts, state).await?;
        if !session.is_admin() {
            return Err(StorefrontError::Forbidden(
                "administrator session required".to_string(),
            ));
        }
        Ok(Self(session))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/v1/me");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).map(|r| r.into_parts().0).unwrap_or_else(|_| {
            Request::new(()).into_parts().0
        })
    }

    #[test]
    fn parses_bearer_header() {
        let token = bearer_token(&parts(Some("Bearer abc123")));
        assert_eq!(token.as_ref().map(SessionToken::as_str), Some("abc123"));
    }

    #[test]
    fn rejects_missing_or_malformed_header() {
        assert!(bearer_token(&parts(None)).is_none());
        assert!(bearer_token(&parts(Some("Basic abc123"))).is_none());
        assert!(bearer_token(&parts(Some("Bearer   "))).is_none());
    }
}
