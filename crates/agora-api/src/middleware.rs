//! HTTP middleware layers

use axum::http::header;

/// CORS layer; origins come from `AGORA_CORS_ORIGINS` (comma separated),
/// defaulting to any origin since the arena serves anonymous spectators.
pub fn cors_layer() -> tower_http::cors::CorsLayer {
    use tower_http::cors::{AllowOrigin, CorsLayer};

    let allow_origin = match std::env::var("AGORA_CORS_ORIGINS").ok() {
        Some(origins_str) if !origins_str.is_empty() => {
            let origins: Vec<axum::http::HeaderValue> = origins_str
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                tracing::warn!("AGORA_CORS_ORIGINS is set but contains no valid origins");
                AllowOrigin::any()
            } else {
                AllowOrigin::list(origins)
            }
        }
        _ => AllowOrigin::any(),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(std::time::Duration::from_secs(3600))
}

/// Request timeout (not applied to the SSE advancement route, whose
/// lifetime is the generation call itself)
pub fn timeout_layer(duration: std::time::Duration) -> tower_http::timeout::TimeoutLayer {
    tower_http::timeout::TimeoutLayer::new(duration)
}

/// Request body size limit
pub fn body_limit_layer(limit: usize) -> tower_http::limit::RequestBodyLimitLayer {
    tower_http::limit::RequestBodyLimitLayer::new(limit)
}
