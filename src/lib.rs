pub mod appresult;
pub mod config;
pub mod relay;

use axum::{
    Router,
    extract::FromRef,
    http::{Method, header},
};
use tower_http::cors::{Any, CorsLayer};

pub use appresult::{AppError, AppResult};
pub use config::Config;
pub use relay::Relay;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub relay: Relay,
}

pub fn app(relay: Relay) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .nest("/api", relay::router())
        .with_state(AppState { relay })
        .layer(cors)
}
