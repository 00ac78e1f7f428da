pub mod api;
pub mod config;
pub mod models;
pub mod services;
pub mod utils;

use crate::api::middleware::request_id::X_REQUEST_ID;
use crate::config::AppConfig;
use crate::services::answer::AnswerRequester;
use crate::services::image_prep::ImagePreparer;
use crate::services::receiver::FileReceiver;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{Method, header},
    middleware::from_fn,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::upload::upload_gpt,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            api::handlers::upload::UploadGptForm,
            api::handlers::health::HealthResponse,
        )
    ),
    tags(
        (name = "uploadgpt", description = "Upload files and ask the AI about them"),
        (name = "system", description = "Service status")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub receiver: Arc<FileReceiver>,
    pub images: ImagePreparer,
    pub requester: Arc<dyn AnswerRequester>,
}

impl AppState {
    pub fn new(config: AppConfig, requester: Arc<dyn AnswerRequester>) -> Self {
        Self {
            receiver: Arc::new(FileReceiver::new(config.upload_dir.clone())),
            images: ImagePreparer::new(config.max_image_dimension),
            requester,
            config,
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route("/uploadgpt", post(api::handlers::upload::upload_gpt))
        .layer(from_fn(api::middleware::metrics::metrics_middleware))
        // Inside the request-id layer so the span sees the issued id
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    let request_id = request
                        .headers()
                        .get(X_REQUEST_ID)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("unknown");
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = %request_id,
                    )
                })
                .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
                    info!("📥 {} {}", request.method(), request.uri());
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        info!(
                            "📤 Finished in {:?} with status {}",
                            latency,
                            response.status()
                        );
                    },
                ),
        )
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::PATCH,
                    Method::OPTIONS,
                ])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
        )
        .layer(DefaultBodyLimit::max(state.config.max_upload_size))
        .with_state(state)
}
