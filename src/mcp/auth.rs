//! Bearer-token validation against the external OAuth gateway.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::warn;

use crate::sources::{body_excerpt, send_error};

/// The authenticated caller, attached to the request for downstream layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Identity {
    pub user_id: String,
    pub email: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum AuthError {
    #[error("Missing bearer token")]
    MissingToken,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Authentication service unavailable: {0}")]
    GatewayUnavailable(String),
}

impl AuthError {
    /// Message safe to return to the caller; gateway detail stays in the logs.
    fn public_message(&self) -> &'static str {
        match self {
            Self::MissingToken => "Missing bearer token",
            Self::InvalidToken => "Invalid or expired token",
            Self::GatewayUnavailable(_) => "Authentication failed",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({
            "error": "unauthorized",
            "message": self.public_message(),
        }));
        let mut resp = (StatusCode::UNAUTHORIZED, body).into_response();
        resp.headers_mut()
            .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        resp
    }
}

#[derive(Debug, Clone)]
struct CachedIdentity {
    identity: Identity,
    expires_at: Instant,
}

/// Validated tokens, each removed by a one-shot timer once its TTL elapses.
#[derive(Debug, Clone)]
pub(crate) struct TokenCache {
    ttl: Duration,
    entries: Arc<RwLock<HashMap<String, CachedIdentity>>>,
}

impl TokenCache {
    pub(crate) fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub(crate) async fn get(&self, token: &str) -> Option<Identity> {
        let entries = self.entries.read().await;
        entries
            .get(token)
            .filter(|e| e.expires_at > Instant::now())
            .map(|e| e.identity.clone())
    }

    pub(crate) async fn insert(&self, token: &str, identity: Identity) {
        let expires_at = Instant::now() + self.ttl;
        self.entries.write().await.insert(
            token.to_string(),
            CachedIdentity {
                identity,
                expires_at,
            },
        );

        let entries = Arc::clone(&self.entries);
        let token = token.to_string();
        tokio::spawn(async move {
            tokio::time::sleep_until(expires_at).await;
            let mut entries = entries.write().await;
            // A re-validated token carries a later deadline and must survive this timer.
            if entries.get(&token).is_some_and(|e| e.expires_at <= expires_at) {
                entries.remove(&token);
            }
        });
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

/// Resolves bearer tokens through `GET {gateway}/oauth/userinfo`.
#[derive(Debug, Clone)]
pub(crate) struct GatewayValidator {
    client: reqwest_middleware::ClientWithMiddleware,
    userinfo_url: String,
    cache: TokenCache,
}

impl GatewayValidator {
    pub(crate) fn new(
        gateway_url: &str,
        cache_ttl: Duration,
    ) -> Result<Self, crate::error::FaersError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            userinfo_url: format!("{}/oauth/userinfo", gateway_url.trim_end_matches('/')),
            cache: TokenCache::new(cache_ttl),
        })
    }

    pub(crate) async fn validate(&self, token: &str) -> Result<Identity, AuthError> {
        if let Some(identity) = self.cache.get(token).await {
            return Ok(identity);
        }

        let resp = self
            .client
            .get(&self.userinfo_url)
            .bearer_auth(token)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| AuthError::GatewayUnavailable(send_error(e).to_string()))?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AuthError::InvalidToken);
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| AuthError::GatewayUnavailable(e.to_string()))?;
        if !status.is_success() {
            return Err(AuthError::GatewayUnavailable(format!(
                "HTTP {status}: {}",
                body_excerpt(&bytes)
            )));
        }

        let info: UserInfo = serde_json::from_slice(&bytes)
            .map_err(|e| AuthError::GatewayUnavailable(format!("userinfo body: {e}")))?;
        let user_id = info
            .sub
            .or(info.user_id)
            .filter(|id| !id.trim().is_empty())
            .ok_or(AuthError::InvalidToken)?;
        let identity = Identity {
            user_id,
            email: info.email,
        };
        self.cache.insert(token, identity.clone()).await;
        Ok(identity)
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Rejects requests without a valid bearer token; on success the caller's
/// [`Identity`] is stored in the request extensions.
pub(crate) async fn bearer_auth(
    State(validator): State<Arc<GatewayValidator>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let Some(token) = bearer_token(req.headers()) else {
        return Err(AuthError::MissingToken);
    };
    match validator.validate(token).await {
        Ok(identity) => {
            req.extensions_mut().insert(identity);
            Ok(next.run(req).await)
        }
        Err(err) => {
            warn!(error = %err, "bearer token rejected");
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header as header_is, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn identity(id: &str) -> Identity {
        Identity {
            user_id: id.into(),
            email: None,
        }
    }

    #[test]
    fn bearer_token_requires_scheme_and_value() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("bearer tok-1"));
        assert_eq!(bearer_token(&headers), Some("tok-1"));
    }

    #[tokio::test(start_paused = true)]
    async fn cached_tokens_expire_after_ttl() {
        let cache = TokenCache::new(Duration::from_secs(300));
        cache.insert("tok", identity("u1")).await;
        assert_eq!(cache.get("tok").await, Some(identity("u1")));

        tokio::time::sleep(Duration::from_secs(299)).await;
        assert!(cache.get("tok").await.is_some());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(cache.get("tok").await, None);
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn validation_is_cached() {
        let gateway = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/oauth/userinfo"))
            .and(header_is("authorization", "Bearer good-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "sub": "user-42", "email": "a@example.org"
            })))
            .expect(1)
            .mount(&gateway)
            .await;

        let validator = GatewayValidator::new(&gateway.uri(), Duration::from_secs(300)).unwrap();
        let first = validator.validate("good-token").await.unwrap();
        let second = validator.validate("good-token").await.unwrap();
        assert_eq!(first.user_id, "user-42");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn rejected_token_is_not_cached() {
        let gateway = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/oauth/userinfo"))
            .respond_with(ResponseTemplate::new(401))
            .expect(2)
            .mount(&gateway)
            .await;

        let validator = GatewayValidator::new(&gateway.uri(), Duration::from_secs(300)).unwrap();
        assert!(matches!(
            validator.validate("bad").await,
            Err(AuthError::InvalidToken)
        ));
        assert!(validator.validate("bad").await.is_err());
    }

    #[tokio::test]
    async fn gateway_failure_detail_is_not_exposed() {
        let gateway = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("db at 10.0.0.7 down"))
            .mount(&gateway)
            .await;

        let validator = GatewayValidator::new(&gateway.uri(), Duration::from_secs(300)).unwrap();
        let err = validator.validate("tok").await.unwrap_err();
        assert!(err.to_string().contains("10.0.0.7"));

        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(resp.headers()[header::WWW_AUTHENTICATE], "Bearer");
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8_lossy(&body);
        assert!(!text.contains("10.0.0.7"));
        assert!(text.contains("Authentication failed"));
    }
}
