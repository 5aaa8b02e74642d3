//! Router assembly.

pub mod api;
pub mod common;

pub use api::{api_routes, public_routes};
pub use common::common_routes;

use crate::error::{AppError, InternalErrorDetail, INTERNAL_ERROR_MESSAGE};
use crate::response::Envelope;
use crate::state::AppState;
use axum::{
    extract::{DefaultBodyLimit, Request},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Json, Router,
};
use tower_http::{limit::RequestBodyLimitLayer, services::ServeDir, trace::TraceLayer};

async fn not_found() -> AppError {
    AppError::NotFound("Endpoint tidak ditemukan".into())
}

/// Puts the underlying error text into the message of 500 responses.
async fn expose_error_detail(request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    match response.extensions().get::<InternalErrorDetail>().cloned() {
        Some(InternalErrorDetail(detail)) => {
            let message = format!("{}: {}", INTERNAL_ERROR_MESSAGE, detail);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(Envelope::<()>::error(message)),
            )
                .into_response()
        }
        None => response,
    }
}

/// The full application: service routes, `/api`, `/api/public` and `/storage`.
pub fn app(state: AppState) -> Router {
    let settings = state.settings.clone();
    let mut router = Router::new()
        .merge(common_routes())
        .nest("/api", api_routes(state.clone()))
        .nest("/api/public", public_routes(&state.catalog))
        .nest_service("/storage", ServeDir::new(&settings.storage_root))
        .fallback(not_found)
        .with_state(state);
    if settings.expose_error_detail {
        router = router.layer(middleware::from_fn(expose_error_detail));
    }
    router
        .layer(DefaultBodyLimit::max(settings.max_upload_bytes))
        .layer(RequestBodyLimitLayer::new(settings.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Catalog;
    use crate::settings::Settings;
    use crate::storage::LocalDiskStorage;
    use axum::{
        body::Body,
        http::{header, Request},
        routing::get,
    };
    use http_body_util::BodyExt;
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn state(settings: Settings) -> AppState {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost:1/masjid_admin_test")
            .unwrap();
        let storage = Arc::new(LocalDiskStorage::new(std::env::temp_dir()));
        AppState::new(pool, Catalog::standard(), storage, settings)
    }

    async fn call(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn health_is_up() {
        let (status, body) = call(app(state(Settings::default())), get_req("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn protected_routes_need_a_bearer_token() {
        let (status, body) = call(app(state(Settings::default())), get_req("/api/inventaris")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "Unauthenticated.");

        let request = Request::builder()
            .uri("/api/dashboard/summary")
            .header(header::AUTHORIZATION, "Basic YWRtaW46YWRtaW4=")
            .body(Body::empty())
            .unwrap();
        let (status, _) = call(app(state(Settings::default())), request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn register_validates_before_touching_the_database() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"email":"bukan-email","password":"123"}"#))
            .unwrap();
        let (status, body) = call(app(state(Settings::default())), request).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["message"], "Validasi gagal");
        assert!(body["errors"]["name"].is_array());
        assert!(body["errors"]["email"].is_array());
        assert!(body["errors"]["password"].is_array());
    }

    #[tokio::test]
    async fn public_surface_is_limited() {
        let (status, body) = call(app(state(Settings::default())), get_req("/api/public/transaksi")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Endpoint tidak ditemukan");
    }

    #[tokio::test]
    async fn public_list_rejects_bad_sort_order() {
        let (status, body) = call(
            app(state(Settings::default())),
            get_req("/api/public/inventaris?sort_order=sideways"),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["errors"]["sort_order"].is_array());
    }

    #[tokio::test]
    async fn calendar_rejects_bad_month() {
        let (status, body) = call(
            app(state(Settings::default())),
            get_req("/api/public/agenda/calendar/2025/13"),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["errors"]["month"][0], "Bulan harus berupa angka antara 1 dan 12.");
    }

    async fn failing() -> Result<(), AppError> {
        Err(AppError::Unexpected("disk full".into()))
    }

    #[tokio::test]
    async fn error_detail_is_opt_in() {
        let hidden = Router::new().route("/boom", get(failing));
        let (status, body) = call(hidden, get_req("/boom")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], INTERNAL_ERROR_MESSAGE);

        let exposed = Router::new()
            .route("/boom", get(failing))
            .layer(middleware::from_fn(expose_error_detail));
        let (_, body) = call(exposed, get_req("/boom")).await;
        assert_eq!(
            body["message"],
            format!("{}: disk full", INTERNAL_ERROR_MESSAGE)
        );
    }
}
