use axum::http::HeaderValue;
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::MAX_UPLOAD_BYTES;
use crate::state::AppState;

pub mod admin;
pub mod auth;
pub mod departments;
pub mod documents;
pub mod health;
pub mod notifications;
pub mod recipients;
pub mod reports;
pub mod users;

pub fn create_router(state: AppState) -> Router<()> {
    let cors = if let Some(origins) = state.config.cors_allowed_origin.as_ref() {
        let headers: Vec<HeaderValue> = origins
            .split(',')
            .filter_map(|value| {
                let trimmed = value.trim();
                (!trimmed.is_empty()).then(|| {
                    trimmed
                        .parse::<HeaderValue>()
                        .expect("invalid CORS allowed origin")
                })
            })
            .collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(headers))
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::mirror_request())
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    };

    let documents_routes = Router::new()
        .route(
            "/",
            get(documents::list_documents).post(documents::upload_document),
        )
        .route("/due-for-review", get(documents::due_for_review))
        .route("/:id", get(documents::get_document))
        .route("/:id/approve", post(documents::approve_document))
        .route("/:id/decline", post(documents::decline_document))
        .route("/:id/issue", post(documents::issue_document))
        .route("/:id/resubmit", post(documents::resubmit_document))
        .route("/:id/pdf", get(documents::document_pdf))
        .route("/:id/print", post(documents::print_document))
        .route("/:id/view", get(documents::view_document))
        .route("/:id/download", get(documents::download_document))
        .route("/:id/versions", get(documents::list_versions));

    let notifications_routes = Router::new()
        .route("/:id", get(notifications::list_for_user))
        .route("/:id/read", post(notifications::mark_read));

    let departments_routes = Router::new()
        .route(
            "/",
            get(departments::list_departments).post(departments::create_department),
        )
        .route("/:id", delete(departments::delete_department));

    let users_routes = Router::new()
        .route("/", get(users::list_users).post(users::create_user))
        .route("/:id", delete(users::delete_user));

    let reports_routes = Router::new()
        .route("/print-logs", get(reports::print_logs))
        .route("/control-copies", get(reports::control_copies));

    let admin_routes = Router::new()
        .route("/users", get(admin::user_directory))
        .route("/documents", get(admin::document_overview))
        .route("/stats", get(admin::stats));

    let recipients_routes =
        Router::new().route("/:id/documents", get(recipients::accessible_documents));

    Router::new()
        .route("/api/login", post(auth::login))
        .nest("/api/documents", documents_routes)
        .nest("/api/notifications", notifications_routes)
        .nest("/api/departments", departments_routes)
        .nest("/api/users", users_routes)
        .nest("/api/reports", reports_routes)
        .nest("/api/admin", admin_routes)
        .nest("/api/recipients", recipients_routes)
        .route("/api/health", get(health::health_check))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 1024 * 1024))
}
