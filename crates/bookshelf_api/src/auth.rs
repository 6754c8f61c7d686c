//! Bearer-token authorization for `/api` routes.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use log::warn;
use subtle::ConstantTimeEq;

/// Set of accepted bearer tokens. An empty set admits every request.
#[derive(Debug, Clone, Default)]
pub struct AuthPolicy {
    tokens: Vec<String>,
}

impl AuthPolicy {
    pub fn new(tokens: impl IntoIterator<Item = String>) -> Self {
        Self {
            tokens: tokens
                .into_iter()
                .map(|token| token.trim().to_string())
                .filter(|token| !token.is_empty())
                .collect(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.tokens.is_empty()
    }

    /// Checks an `Authorization` header value against the accepted tokens.
    pub fn authorize(&self, header: Option<&HeaderValue>) -> bool {
        if !self.is_enabled() {
            return true;
        }
        header
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .is_some_and(|token| {
                self.tokens
                    .iter()
                    .any(|accepted| bool::from(accepted.as_bytes().ct_eq(token.as_bytes())))
            })
    }
}

fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token.trim()).filter(|token| !token.is_empty())
}

/// Middleware rejecting requests without an accepted bearer token.
pub async fn require_bearer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !state.auth.authorize(request.headers().get(AUTHORIZATION)) {
        warn!(
            "event=auth_reject module=api status=error method={} path={}",
            request.method(),
            request.uri().path()
        );
        return Err(ApiError::Unauthorized);
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::{bearer_token, AuthPolicy};
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bearer   abc "), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer"), None);
        assert_eq!(bearer_token("Bearer  "), None);
    }

    #[test]
    fn empty_policy_admits_everything() {
        let policy = AuthPolicy::new(vec![" ".to_string()]);
        assert!(!policy.is_enabled());
        assert!(policy.authorize(None));
    }

    #[test]
    fn enabled_policy_requires_matching_token() {
        let policy = AuthPolicy::new(vec!["s3cret".to_string()]);
        assert!(policy.authorize(Some(&HeaderValue::from_static("Bearer s3cret"))));
        assert!(!policy.authorize(Some(&HeaderValue::from_static("Bearer wrong"))));
        assert!(!policy.authorize(None));
    }

    #[test]
    fn token_prefixes_and_extensions_are_rejected() {
        let policy = AuthPolicy::new(vec!["s3cret".to_string(), "other".to_string()]);
        assert!(policy.authorize(Some(&HeaderValue::from_static("Bearer other"))));
        assert!(!policy.authorize(Some(&HeaderValue::from_static("Bearer s3cre"))));
        assert!(!policy.authorize(Some(&HeaderValue::from_static("Bearer s3crets"))));
        assert!(!policy.authorize(Some(&HeaderValue::from_static("Bearer S3CRET"))));
    }
}
