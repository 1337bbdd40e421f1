//! HTTP middleware: transport layers plus the ambient context stages.
//!
//! Transport layers come from tower-http and wrap the whole router. The
//! ambient stages are axum `from_fn_with_state` middleware:
//!
//! 1. [`ambient_scope`] (every route) opens the request's [`HttpChannel`]
//!    scope holding the correlation id, bearer token and trace baggage.
//! 2. [`tenant_scope`] (tenant-scoped routes) looks the tenant header up in
//!    the tenant directory and fails closed if no tenant resolves.
//! 3. [`identity_scope`] (tenant-scoped routes) validates the bearer token
//!    and stores the enriched principal. An invalid token leaves the request
//!    anonymous.

use ambit_core::baggage::{self, BAGGAGE_HEADER};
use ambit_core::{ContextKind, Correlation, CorrelationId, NotResolved, Tenant, TenantContext};
use axum::extract::{Request, State};
use axum::http::header::HeaderName;
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, field, info_span, warn, Instrument};
use uuid::Uuid;

use super::auth::bearer_token;
use super::config::NetworkConfig;
use super::error::ApiError;
use super::handlers::AppState;
use crate::ambient::{AmbientChannelExt, HttpChannel, RequestItems};

/// The composed Tower layer type produced by [`build_http_layers`].
type HttpLayers = tower::layer::util::Stack<
    PropagateRequestIdLayer,
    tower::layer::util::Stack<
        TimeoutLayer,
        tower::layer::util::Stack<
            CorsLayer,
            tower::layer::util::Stack<
                CompressionLayer,
                tower::layer::util::Stack<
                    TraceLayer<
                        tower_http::classify::SharedClassifier<
                            tower_http::classify::ServerErrorsAsFailures,
                        >,
                    >,
                    tower::layer::util::Stack<
                        SetRequestIdLayer<MakeRequestUuid>,
                        tower::layer::util::Identity,
                    >,
                >,
            >,
        >,
    >,
>;

/// Builds the transport middleware stack.
///
/// **Middleware ordering (outermost to innermost):**
/// 1. `SetRequestId` -- fills the correlation header with a UUID v4 when absent
/// 2. `Tracing` -- request/response spans
/// 3. `Compression` -- gzip
/// 4. `CORS`
/// 5. `Timeout`
/// 6. `PropagateRequestId` -- echoes the correlation header on the response
#[must_use]
pub fn build_http_layers(config: &NetworkConfig) -> HttpLayers {
    let correlation_header = config.ambient.correlation_header.clone();
    let cors = build_cors_layer(&config.cors_origins);

    ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(
            correlation_header.clone(),
            MakeRequestUuid,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout,
        ))
        .layer(PropagateRequestIdLayer::new(correlation_header))
        .into_inner()
}

/// A wildcard `"*"` allows any origin; otherwise each origin is parsed into
/// an explicit allowlist.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let parsed: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Ambient stages
// ---------------------------------------------------------------------------

/// Opens the request's ambient scope. Runs on every route.
///
/// The `http_request` span covers the rest of the stack and closes before
/// the scope exits, so telemetry sees the request's correlation, tenant and
/// identity on it.
pub async fn ambient_scope(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let header = &state.config.ambient.correlation_header;
    let correlation = header_str(req.headers(), header)
        .map_or_else(|| Uuid::new_v4().to_string(), str::to_string);

    let mut items = RequestItems {
        bearer_token: bearer_token(req.headers()),
        baggage: header_str(req.headers(), &HeaderName::from_static(BAGGAGE_HEADER))
            .map(baggage::parse)
            .unwrap_or_default(),
        ..RequestItems::default()
    };
    Correlation::store(Some(&CorrelationId::new(correlation.clone())), &mut items.slot);

    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let mut response = HttpChannel::scope(items, async move {
        let span = info_span!(
            "http_request",
            method = %method,
            path = %path,
            status = field::Empty,
        );
        let response = next.run(req).instrument(span.clone()).await;
        span.record("status", response.status().as_u16());
        drop(span);
        response
    })
    .await;

    if !response.headers().contains_key(header) {
        if let Ok(value) = HeaderValue::from_str(&correlation) {
            response.headers_mut().insert(header.clone(), value);
        }
    }
    response
}

/// Resolves the request's tenant and fails closed when none resolves.
///
/// The tenant header is looked up in the tenant directory. Without a header,
/// the resolvers are consulted (trace baggage is the fallback) and the
/// candidate is confirmed against the directory the same way. Only a
/// confirmed tenant is stored in the request's slot.
///
/// # Errors
///
/// `ApiError::TenantLookup` if the tenant directory is unreachable,
/// `ApiError::NotResolved` (400) if no tenant resolves or the directory does
/// not know it.
pub async fn tenant_scope(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let requested =
        header_str(req.headers(), &state.config.ambient.tenant_header).map(str::to_string);
    let name = match requested {
        Some(name) => name,
        None => state.resolvers.tenant.resolve()?.name,
    };
    let confirmed = confirm_tenant(&state, &name).await?;
    HttpChannel.set::<Tenant>(Some(&confirmed));

    let tenant = state.resolvers.tenant.resolve()?;
    debug!(tenant = %tenant.name, storage_id = %tenant.storage_id, "tenant resolved");
    Ok(next.run(req).await)
}

async fn confirm_tenant(state: &AppState, name: &str) -> Result<TenantContext, ApiError> {
    match state.tenants.get_by_name(name).await {
        Ok(Some(tenant)) => Ok(tenant),
        Ok(None) => {
            debug!(tenant = name, "unknown tenant requested");
            Err(ApiError::NotResolved(NotResolved { kind: Tenant::NAME }))
        }
        Err(error) => {
            warn!(tenant = name, error = %error, "tenant directory unavailable");
            Err(ApiError::TenantLookup(error))
        }
    }
}

/// Authenticates the bearer token, if any, and enriches the principal for
/// the resolved tenant.
pub async fn identity_scope(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if let Some(token) = HttpChannel::bearer_token() {
        match state.tokens.validate(&token).await {
            Ok(principal) => {
                HttpChannel::set_principal(Some(principal.clone()));
                let enriched = state.enricher.enrich(principal).await;
                HttpChannel::set_principal(Some(enriched));
            }
            Err(error) => debug!(error = %error, "bearer token rejected; continuing anonymously"),
        }
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    use super::*;

    fn layered(config: &NetworkConfig) -> Router {
        Router::new()
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    "late"
                }),
            )
            .route("/ok", get(|| async { "ok" }))
            .layer(build_http_layers(config))
    }

    #[tokio::test]
    async fn transport_layers_generate_and_echo_correlation_header() {
        let router = layered(&NetworkConfig::default());

        let resp = router
            .clone()
            .oneshot(Request::get("/ok").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let generated = resp.headers().get("x-correlation-id").unwrap();
        assert!(Uuid::parse_str(generated.to_str().unwrap()).is_ok());

        let resp = router
            .oneshot(
                Request::get("/ok")
                    .header("x-correlation-id", "c-5")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.headers().get("x-correlation-id").unwrap(), "c-5");
    }

    #[tokio::test(start_paused = true)]
    async fn slow_handler_hits_configured_timeout() {
        let config = NetworkConfig {
            request_timeout: Duration::from_secs(5),
            ..NetworkConfig::default()
        };
        let resp = layered(&config)
            .oneshot(Request::get("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::REQUEST_TIMEOUT);
    }

    #[tokio::test]
    async fn cors_preflight_only_allows_listed_origins() {
        let config = NetworkConfig {
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "https://example.com".to_string(),
            ],
            ..NetworkConfig::default()
        };
        let preflight = |origin: &str| {
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/ok")
                .header("origin", origin)
                .header("access-control-request-method", "GET")
                .body(Body::empty())
                .unwrap()
        };

        let allowed = layered(&config)
            .oneshot(preflight("https://example.com"))
            .await
            .unwrap();
        assert_eq!(
            allowed.headers().get("access-control-allow-origin").unwrap(),
            "https://example.com"
        );

        let denied = layered(&config)
            .oneshot(preflight("https://evil.test"))
            .await
            .unwrap();
        assert!(denied.headers().get("access-control-allow-origin").is_none());
    }

    #[test]
    fn header_str_trims_and_skips_empty() {
        let mut headers = HeaderMap::new();
        let name = HeaderName::from_static("x-tenant-id");
        headers.insert(name.clone(), HeaderValue::from_static(" t1 "));
        assert_eq!(header_str(&headers, &name), Some("t1"));
        headers.insert(name.clone(), HeaderValue::from_static(""));
        assert_eq!(header_str(&headers, &name), None);
    }
}
