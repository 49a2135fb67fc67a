pub mod error;
pub mod files;
pub mod health;

use axum::Router;
use axum::extract::{DefaultBodyLimit, MatchedPath};
use http::HeaderValue;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::bootstrap::app_context::AppContext;
use crate::bootstrap::config::Config;

// multipart framing on top of the payload itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn cors_layer(cfg: &Config) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([
            http::Method::GET,
            http::Method::POST,
            http::Method::PUT,
            http::Method::DELETE,
            http::Method::OPTIONS,
        ])
        .allow_headers([http::header::CONTENT_TYPE, http::header::AUTHORIZATION]);
    match cfg.frontend_url.as_deref().map(HeaderValue::from_str) {
        Some(Ok(origin)) => base.allow_origin(origin).allow_credentials(true),
        // In production, FRONTEND_URL is mandatory (enforced at config load)
        _ if cfg.is_production => {
            base.allow_origin(AllowOrigin::exact(HeaderValue::from_static("http://invalid")))
        }
        // Development convenience
        _ => base
            .allow_origin(AllowOrigin::mirror_request())
            .allow_credentials(true),
    }
}

/// All API routes with the request layers applied; `main` adds the docs UI.
pub fn build_router(ctx: AppContext) -> Router {
    let cfg = ctx.cfg.clone();
    Router::new()
        .nest("/api", health::routes(ctx.clone()))
        .nest("/api/v1", files::routes(ctx))
        .layer(cors_layer(&cfg))
        // Global body size limit for uploads (configurable)
        .layer(DefaultBodyLimit::max(
            cfg.upload_max_bytes.saturating_add(MULTIPART_OVERHEAD),
        ))
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &http::Request<_>| {
                let method = req.method().clone();
                let uri = req.uri().clone();
                let matched = req
                    .extensions()
                    .get::<MatchedPath>()
                    .map(|p| p.as_str().to_string())
                    .unwrap_or_default();
                tracing::info_span!("http", %method, %uri, matched_path = %matched)
            }),
        )
}
