use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderName, HeaderValue, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use rmcp::transport::streamable_http_server::{
    StreamableHttpService, session::local::LocalSessionManager,
};
use serde_json::{Value, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::HttpConfig;
use crate::error::FaersError;
use crate::mcp::auth::{GatewayValidator, Identity, bearer_auth};
use crate::mcp::rate_limit::{RateLimitResult, RateLimiter};
use crate::mcp::server::FaersServer;

const SERVICE_NAME: &str = "faers-mcp";

async fn health() -> Json<Value> {
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();
    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": timestamp,
    }))
}

/// RFC 8414 authorization server metadata pointing at the gateway.
fn oauth_metadata(gateway: &str) -> Value {
    json!({
        "issuer": gateway,
        "authorization_endpoint": format!("{gateway}/oauth/authorize"),
        "token_endpoint": format!("{gateway}/oauth/token"),
        "registration_endpoint": format!("{gateway}/oauth/register"),
        "response_types_supported": ["code"],
        "grant_types_supported": ["authorization_code", "refresh_token"],
        "code_challenge_methods_supported": ["S256"],
        "token_endpoint_auth_methods_supported": ["none", "client_secret_post"],
    })
}

async fn oauth_discovery(State(metadata): State<Option<Arc<Value>>>) -> Response {
    match metadata {
        Some(metadata) => Json(metadata.as_ref().clone()).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "not_found",
                "message": "OAuth is not enabled on this server",
            })),
        )
            .into_response(),
    }
}

fn client_key(req: &Request) -> String {
    if let Some(identity) = req.extensions().get::<Identity>() {
        return format!("user:{}", identity.user_id);
    }
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| format!("ip:{}", addr.ip()))
        .unwrap_or_else(|| "ip:unknown".to_string())
}

async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request,
    next: Next,
) -> Response {
    let key = client_key(&req);
    match limiter.check(&key).await {
        RateLimitResult::Allowed { .. } => next.run(req).await,
        RateLimitResult::RateLimited { retry_after } => {
            warn!(client = %key, "rate limit exceeded");
            let secs = retry_after.as_secs().max(1);
            let mut resp = (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({
                    "error": "rate_limited",
                    "message": "Too many requests; try again later",
                    "retry_after_secs": secs,
                })),
            )
                .into_response();
            resp.headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
            resp
        }
    }
}

fn cors_layer(origin: &str) -> Result<CorsLayer, FaersError> {
    let origin = origin.trim();
    let allow = if origin.is_empty() || origin == "*" {
        AllowOrigin::from(Any)
    } else {
        let value = HeaderValue::from_str(origin).map_err(|_| {
            FaersError::InvalidArgument(format!("cors origin '{origin}' is not a valid header value"))
        })?;
        AllowOrigin::exact(value)
    };
    Ok(CorsLayer::new()
        .allow_origin(allow)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([HeaderName::from_static("mcp-session-id")]))
}

/// Builds the HTTP application: `/health`, OAuth discovery, and the guarded `/mcp` endpoint.
///
/// # Errors
///
/// Returns an error when the configuration is invalid or the gateway client
/// cannot be constructed.
pub fn router(config: &HttpConfig, server: FaersServer) -> Result<Router, FaersError> {
    config.validate()?;

    let service = StreamableHttpService::new(
        move || Ok(server.clone()),
        LocalSessionManager::default().into(),
        Default::default(),
    );
    let mut mcp = Router::new().nest_service("/mcp", service);

    if config.rate_limit_per_minute > 0 {
        let limiter = Arc::new(RateLimiter::per_minute(config.rate_limit_per_minute));
        mcp = mcp.layer(middleware::from_fn_with_state(limiter, rate_limit));
    }

    let mut metadata = None;
    if config.oauth_enabled {
        let gateway = config.gateway_url().ok_or_else(|| {
            FaersError::InvalidArgument("OAUTH_ENABLED requires OAUTH_GATEWAY_URL".into())
        })?;
        let validator = Arc::new(GatewayValidator::new(gateway, config.auth_cache_ttl())?);
        // Added last so it runs before the rate limiter and keys it by user.
        mcp = mcp.layer(middleware::from_fn_with_state(validator, bearer_auth));
        metadata = Some(Arc::new(oauth_metadata(gateway)));
    }

    let app = Router::new()
        .route("/health", get(health))
        .route(
            "/.well-known/oauth-authorization-server",
            get(oauth_discovery).with_state(metadata),
        )
        .merge(mcp)
        .layer(cors_layer(&config.cors_origin)?)
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

pub async fn serve(config: HttpConfig) -> anyhow::Result<()> {
    let app = router(&config, FaersServer::new()?)?;
    let addr = config.bind_addr().await?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        %addr,
        base_url = %config.public_base_url(),
        oauth = config.oauth_enabled,
        "HTTP MCP server listening"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await?;
    Ok(())
}
