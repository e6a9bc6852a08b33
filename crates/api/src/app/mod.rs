//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use cleanops_auth::{AuthenticationGuard, TokenCodec, UserDirectory};

use crate::authz::{self, Guards};
use crate::config::ApiConfig;

pub mod dto;
pub mod errors;
pub mod routes;

/// Shared services handed to handlers.
#[derive(Clone)]
pub struct AppServices {
    pub directory: Arc<dyn UserDirectory>,
}

/// Build the full HTTP router (public entrypoint used by `main.rs`).
///
/// Fails on invalid secrets or on a route whose operation has no policy.
pub fn build_app(config: &ApiConfig, directory: Arc<dyn UserDirectory>) -> anyhow::Result<Router> {
    let codec = Arc::new(TokenCodec::new(&config.token)?);
    build_app_with_codec(codec, directory)
}

/// Same as [`build_app`], with an already constructed codec.
pub fn build_app_with_codec(codec: Arc<TokenCodec>, directory: Arc<dyn UserDirectory>) -> anyhow::Result<Router> {
    let guards = Guards::new(AuthenticationGuard::new(codec), authz::default_policies());
    let services = AppServices { directory };

    let protected = routes::router(&guards)?;

    Ok(Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
        .layer(ServiceBuilder::new().layer(Extension(services))))
}
