//! Standard response envelope helpers.

use crate::error::FieldErrors;
use axum::{http::StatusCode, Json};
use serde::Serialize;

/// `{status, message, data?, errors?, pagination?}` wrapper shared by every endpoint.
#[derive(Serialize, Debug)]
pub struct Envelope<T> {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl<T> Envelope<T> {
    pub fn success(message: impl Into<String>, data: Option<T>) -> Self {
        Envelope {
            status: "success",
            message: message.into(),
            data,
            errors: None,
            pagination: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Envelope {
            status: "error",
            message: message.into(),
            data: None,
            errors: None,
            pagination: None,
        }
    }

    pub fn invalid(errors: FieldErrors) -> Self {
        Envelope {
            errors: Some(errors),
            ..Envelope::error("Validasi gagal")
        }
    }
}

/// Page metadata. `from`/`to` are null when the requested page holds no rows.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub current_page: u64,
    pub last_page: u64,
    pub per_page: u64,
    pub total: u64,
    pub from: Option<u64>,
    pub to: Option<u64>,
}

impl Pagination {
    /// `page` and `per_page` must already be normalized (both >= 1).
    pub fn new(page: u64, per_page: u64, total: u64) -> Self {
        let per_page = per_page.max(1);
        let page = page.max(1);
        let offset = (page - 1).saturating_mul(per_page);
        let (from, to) = if offset < total {
            (Some(offset + 1), Some(page.saturating_mul(per_page).min(total)))
        } else {
            (None, None)
        };
        Pagination {
            current_page: page,
            last_page: total.div_ceil(per_page).max(1),
            per_page,
            total,
            from,
            to,
        }
    }
}

pub type Reply<T> = (StatusCode, Json<Envelope<T>>);

pub fn ok<T: Serialize>(message: impl Into<String>, data: T) -> Reply<T> {
    (StatusCode::OK, Json(Envelope::success(message, Some(data))))
}

pub fn created<T: Serialize>(message: impl Into<String>, data: T) -> Reply<T> {
    (StatusCode::CREATED, Json(Envelope::success(message, Some(data))))
}

/// 200 with no `data` key, used after deletes and logout.
pub fn done(message: impl Into<String>) -> Reply<()> {
    (StatusCode::OK, Json(Envelope::success(message, None)))
}

pub fn paginated<T: Serialize>(
    message: impl Into<String>,
    data: Vec<T>,
    pagination: Pagination,
) -> Reply<Vec<T>> {
    let mut envelope = Envelope::success(message, Some(data));
    envelope.pagination = Some(pagination);
    (StatusCode::OK, Json(envelope))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_page_of_many() {
        let p = Pagination::new(1, 15, 40);
        assert_eq!(p.last_page, 3);
        assert_eq!(p.from, Some(1));
        assert_eq!(p.to, Some(15));
    }

    #[test]
    fn last_partial_page() {
        let p = Pagination::new(3, 15, 40);
        assert_eq!(p.from, Some(31));
        assert_eq!(p.to, Some(40));
    }

    #[test]
    fn empty_table_still_has_one_page() {
        let p = Pagination::new(1, 15, 0);
        assert_eq!(p.last_page, 1);
        assert_eq!(p.from, None);
        assert_eq!(p.to, None);
    }

    #[test]
    fn page_past_the_end_is_empty() {
        let p = Pagination::new(9, 10, 25);
        assert_eq!(p.current_page, 9);
        assert_eq!(p.last_page, 3);
        assert_eq!((p.from, p.to), (None, None));

        let p = Pagination::new(i64::MAX as u64, 15, 40);
        assert_eq!(p.last_page, 3);
        assert_eq!((p.from, p.to), (None, None));
    }

    #[test]
    fn exact_multiple() {
        let p = Pagination::new(2, 10, 20);
        assert_eq!(p.last_page, 2);
        assert_eq!((p.from, p.to), (Some(11), Some(20)));
    }

    #[test]
    fn envelope_omits_absent_keys() {
        let (status, Json(body)) = done("Data jabatan berhasil dihapus");
        assert_eq!(status, StatusCode::OK);
        let v = serde_json::to_value(body).unwrap();
        assert_eq!(v, json!({"status": "success", "message": "Data jabatan berhasil dihapus"}));
    }

    #[test]
    fn explicit_null_data_is_kept() {
        let (_, Json(body)) = ok("Identitas masjid belum diatur", serde_json::Value::Null);
        let v = serde_json::to_value(body).unwrap();
        assert!(v.get("data").is_some());
        assert!(v["data"].is_null());
    }

    #[test]
    fn paginated_includes_block() {
        let (_, Json(body)) = paginated("ok", vec![1, 2], Pagination::new(1, 2, 5));
        let v = serde_json::to_value(body).unwrap();
        assert_eq!(v["pagination"]["last_page"], 3);
        assert_eq!(v["pagination"]["to"], 2);
    }
}
