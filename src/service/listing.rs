//! List query parsing: recognized query parameters into conditions, ordering and a page window.

use crate::error::{AppError, FieldErrors};
use crate::policy::ListScope;
use crate::resource::{FieldKind, ResourceDef, SortOrder};
use crate::sql::{Condition, Ordering, PgBindValue};
use chrono::NaiveDate;
use std::collections::HashMap;

pub const DEFAULT_PER_PAGE: u64 = 15;
pub const MAX_PER_PAGE: u64 = 100;

#[derive(Clone, Debug, PartialEq)]
pub struct ListQuery {
    pub conditions: Vec<Condition>,
    pub ordering: Ordering,
    pub page: u64,
    pub per_page: u64,
    /// Every match in one response, no pagination block.
    pub all: bool,
}

impl ListQuery {
    /// Parses `search`, equality filters, `tanggal_dari`/`tanggal_sampai`, `sort_by`,
    /// `sort_order`, `per_page`, `page` and `all`. Every problem is reported at once.
    pub fn parse(def: &ResourceDef, params: &HashMap<String, String>) -> Result<Self, AppError> {
        let mut errors = FieldErrors::new();
        let mut conditions = Vec::new();
        let get = |key: &str| {
            params
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
        };
        let mut fail = |key: &str, message: String| {
            errors.entry(key.to_string()).or_default().push(message);
        };

        if let Some(term) = get("search") {
            if !def.list.search.is_empty() {
                conditions.push(Condition::Search {
                    columns: def.list.search,
                    term: term.to_string(),
                });
            }
        }

        for filter in &def.list.filters {
            let Some(raw) = get(filter.param) else { continue };
            let Some(field) = def.field(filter.column) else { continue };
            let value = match field.kind {
                FieldKind::Integer | FieldKind::Reference => match raw.parse::<i64>() {
                    Ok(n) => PgBindValue::I64(n),
                    Err(_) => {
                        fail(filter.param, format!("{} harus berupa angka.", field.label));
                        continue;
                    }
                },
                FieldKind::Date => match parse_date(raw) {
                    Some(d) => PgBindValue::Date(d),
                    None => {
                        fail(filter.param, format!("{} harus berupa tanggal (YYYY-MM-DD).", field.label));
                        continue;
                    }
                },
                _ => PgBindValue::Text(raw.to_string()),
            };
            conditions.push(Condition::Eq {
                column: field.name,
                cast: field.kind.cast(),
                value,
            });
        }

        if let Some(column) = def.list.date_field {
            for (key, lower) in [("tanggal_dari", true), ("tanggal_sampai", false)] {
                let Some(raw) = get(key) else { continue };
                match parse_date(raw) {
                    Some(date) if lower => conditions.push(Condition::OnOrAfter { column, date }),
                    Some(date) => conditions.push(Condition::OnOrBefore { column, date }),
                    None => fail(key, "Format tanggal harus YYYY-MM-DD.".to_string()),
                }
            }
        }

        let (default_column, default_order) = def.list.default_sort;
        let column = match get("sort_by") {
            None => default_column,
            Some(key) => def.sort_column(key).unwrap_or_else(|| {
                fail("sort_by", format!("Kolom pengurutan '{}' tidak diizinkan.", key));
                default_column
            }),
        };
        let order = match get("sort_order") {
            None => default_order,
            Some(raw) => SortOrder::parse(raw).unwrap_or_else(|| {
                fail("sort_order", "Urutan harus asc atau desc.".to_string());
                default_order
            }),
        };

        let per_page = match get("per_page") {
            None => DEFAULT_PER_PAGE,
            Some(raw) => match raw.parse::<i64>() {
                Ok(n) => n.clamp(1, MAX_PER_PAGE as i64) as u64,
                Err(_) => {
                    fail("per_page", "Jumlah per halaman harus berupa angka.".to_string());
                    DEFAULT_PER_PAGE
                }
            },
        };
        // Non-numeric or non-positive pages fall back to the first page.
        let page = get("page")
            .and_then(|raw| raw.parse::<i64>().ok())
            .map(|n| n.max(1) as u64)
            .unwrap_or(1);

        let all = def.list.allow_all && get("all").is_some_and(is_truthy);

        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }
        Ok(ListQuery {
            conditions,
            ordering: Ordering { column, order },
            page,
            per_page,
            all,
        })
    }

    /// Adds the row restriction a policy decision requires.
    pub fn scoped(mut self, scope: ListScope) -> Self {
        if let ListScope::Only { column, value } = scope {
            self.conditions.push(Condition::Eq {
                column,
                cast: "text",
                value: PgBindValue::Text(value.to_string()),
            });
        }
        self
    }

    /// Rows skipped before the requested page, saturated to the `bigint` range.
    pub fn offset(&self) -> i64 {
        let offset = (self.page - 1).saturating_mul(self.per_page);
        i64::try_from(offset).unwrap_or(i64::MAX)
    }

    /// `(limit, offset)` for the requested page, or `None` when returning everything.
    pub fn window(&self) -> Option<(i64, i64)> {
        if self.all {
            None
        } else {
            Some((self.per_page as i64, self.offset()))
        }
    }
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

fn is_truthy(v: &str) -> bool {
    matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}
