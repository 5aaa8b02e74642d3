//! Typed errors and HTTP mapping.

use crate::response::Envelope;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::collections::BTreeMap;
use thiserror::Error;

/// Field name to the list of messages reported for it.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Message used for every 500 response unless detail exposure is switched on.
pub const INTERNAL_ERROR_MESSAGE: &str = "Terjadi kesalahan saat memproses permintaan";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid setting {key}: '{value}'")]
    InvalidSetting { key: &'static str, value: String },
    #[error("resource '{resource}': unknown column '{column}' in {context}")]
    UnknownColumn {
        resource: &'static str,
        column: String,
        context: &'static str,
    },
    #[error("resource '{resource}': {message}")]
    InvalidResource {
        resource: &'static str,
        message: String,
    },
    #[error("duplicate path segment: {0}")]
    DuplicatePathSegment(String),
    #[error("resource not registered: {0}")]
    MissingResource(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Validasi gagal")]
    Validation(FieldErrors),
    #[error("{0}")]
    Unauthenticated(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Unprocessable(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("storage: {0}")]
    Storage(#[from] std::io::Error),
    #[error("{0}")]
    Unexpected(String),
}

impl AppError {
    /// Single-field validation failure.
    pub fn field(name: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(name.to_string(), vec![message.into()]);
        AppError::Validation(errors)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Unprocessable(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Config(_) | AppError::Db(_) | AppError::Storage(_) | AppError::Unexpected(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Raw detail of a 500, attached to the response so a later layer may surface it.
#[derive(Clone, Debug)]
pub struct InternalErrorDetail(pub String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            let detail = self.to_string();
            tracing::error!(error = %detail, "request failed");
            let mut response =
                (status, Json(Envelope::<()>::error(INTERNAL_ERROR_MESSAGE))).into_response();
            response.extensions_mut().insert(InternalErrorDetail(detail));
            return response;
        }
        let body = match self {
            AppError::Validation(errors) => Envelope::<()>::invalid(errors),
            other => Envelope::<()>::error(other.to_string()),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(AppError::field("x", "y").status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(AppError::Unprocessable("x".into()).status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(AppError::Unauthenticated("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden("x".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(AppError::Unexpected("x".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            AppError::Db(sqlx::Error::PoolTimedOut).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn validation_error_carries_field_map() {
        let response = AppError::field("nama_barang", "Nama barang wajib diisi").into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "Validasi gagal");
        assert_eq!(body["errors"]["nama_barang"][0], "Nama barang wajib diisi");
        assert!(body.get("data").is_none());
    }

    #[tokio::test]
    async fn internal_error_hides_detail_but_keeps_extension() {
        let response = AppError::Unexpected("disk on fire".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let detail = response.extensions().get::<InternalErrorDetail>().cloned();
        assert_eq!(detail.map(|d| d.0), Some("disk on fire".to_string()));
        let body = body_json(response).await;
        assert_eq!(body["message"], INTERNAL_ERROR_MESSAGE);
    }
}
