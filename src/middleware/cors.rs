use axum::http::{header, Method};
use tower_http::cors::{Any, CorsLayer};

/// The mobile and web clients call from arbitrary origins without credentials.
pub fn api_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .allow_origin(Any)
}
