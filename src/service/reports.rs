//! Read-only compositions: dashboard summary, financial recap, agenda calendar and
//! item category statistics.

use super::crud::{CrudService, Row};
use super::presenter::{decimal_of, money_number, present_all};
use crate::error::{AppError, FieldErrors};
use crate::format::{month_name, month_year, rupiah};
use crate::resource::catalog::ITEM_CONDITIONS;
use crate::resource::{Catalog, ResourceDef, ResourceKind, SortOrder};
use crate::settings::Settings;
use crate::sql::{self, reports, Condition, Ordering, PgBindValue};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde_json::{json, Map, Value};
use sqlx::PgPool;
use std::collections::{BTreeMap, HashMap};

const INCOME: &str = "pemasukan";
const EXPENSE: &str = "pengeluaran";

/// A dashboard counter: total rows of a resource, optionally narrowed by a status value.
struct Tile {
    key: &'static str,
    label: &'static str,
    kind: ResourceKind,
    status: Option<&'static str>,
}

const TILES: [Tile; 5] = [
    Tile {
        key: "inventaris",
        label: "Total Inventaris",
        kind: ResourceKind::Inventory,
        status: None,
    },
    Tile {
        key: "pengurus",
        label: "Pengurus Aktif",
        kind: ResourceKind::Staff,
        status: Some("Aktif"),
    },
    Tile {
        key: "muadzin",
        label: "Muadzin Aktif",
        kind: ResourceKind::Muadzin,
        status: Some("Aktif"),
    },
    Tile {
        key: "khatib",
        label: "Khatib Aktif",
        kind: ResourceKind::Khatib,
        status: Some("Aktif"),
    },
    Tile {
        key: "konten",
        label: "Konten Published",
        kind: ResourceKind::Content,
        status: Some("Published"),
    },
];

/// Inclusive date range of a year or of one month in it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Period {
    pub year: i32,
    pub month: Option<u32>,
}

impl Period {
    pub fn bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        match self.month {
            None => Some((
                NaiveDate::from_ymd_opt(self.year, 1, 1)?,
                NaiveDate::from_ymd_opt(self.year, 12, 31)?,
            )),
            Some(m) => {
                let first = NaiveDate::from_ymd_opt(self.year, m, 1)?;
                let next = if m == 12 {
                    NaiveDate::from_ymd_opt(self.year + 1, 1, 1)?
                } else {
                    NaiveDate::from_ymd_opt(self.year, m + 1, 1)?
                };
                Some((first, next.pred_opt()?))
            }
        }
    }

    /// Reads `year_key` (defaulting to the year of `today`) and an optional `month_key`.
    pub fn parse(
        params: &HashMap<String, String>,
        year_key: &str,
        month_key: &str,
        today: NaiveDate,
    ) -> Result<Self, AppError> {
        Self::from_parts(
            params.get(year_key).map(String::as_str),
            params.get(month_key).map(String::as_str),
            year_key,
            month_key,
            today,
        )
    }

    pub fn from_parts(
        year: Option<&str>,
        month: Option<&str>,
        year_key: &str,
        month_key: &str,
        today: NaiveDate,
    ) -> Result<Self, AppError> {
        let mut errors = FieldErrors::new();
        let year = match year.map(str::trim).filter(|s| !s.is_empty()) {
            None => today.year(),
            Some(raw) => match raw.parse::<i32>() {
                Ok(y) if (1..=9999).contains(&y) => y,
                _ => {
                    errors
                        .entry(year_key.to_string())
                        .or_default()
                        .push("Tahun harus berupa angka antara 1 dan 9999.".into());
                    today.year()
                }
            },
        };
        let month = match month.map(str::trim).filter(|s| !s.is_empty()) {
            None => None,
            Some(raw) => match raw.parse::<u32>() {
                Ok(m) if (1..=12).contains(&m) => Some(m),
                _ => {
                    errors
                        .entry(month_key.to_string())
                        .or_default()
                        .push("Bulan harus berupa angka antara 1 dan 12.".into());
                    None
                }
            },
        };
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }
        Ok(Period { year, month })
    }
}

/// `(income, expense)` summed per `jenis_transaksi` rows.
fn split_totals(rows: &[Row]) -> (Decimal, Decimal) {
    let mut income = Decimal::ZERO;
    let mut expense = Decimal::ZERO;
    for row in rows {
        let amount = row.get("total").and_then(decimal_of).unwrap_or(Decimal::ZERO);
        match row.get("jenis_transaksi").and_then(Value::as_str) {
            Some(INCOME) => income += amount,
            Some(EXPENSE) => expense += amount,
            _ => {}
        }
    }
    (income, expense)
}

/// Inserts `{key}` as a float and `{key}_formatted` as rupiah.
fn put_money(out: &mut Map<String, Value>, key: &str, amount: Decimal) {
    out.insert(key.to_string(), money_number(amount));
    out.insert(format!("{}_formatted", key), Value::String(rupiah(amount)));
}

pub async fn dashboard(pool: &PgPool, catalog: &Catalog, today: NaiveDate) -> Result<Value, AppError> {
    let mut data = Map::new();
    for tile in &TILES {
        let def = catalog.resource(tile.kind)?;
        let mut conditions = Vec::new();
        if let Some(status) = tile.status {
            if def.has_column("status") {
                conditions.push(Condition::Eq {
                    column: "status",
                    cast: "text",
                    value: PgBindValue::Text(status.to_string()),
                });
            } else {
                tracing::warn!(
                    table = def.table,
                    status,
                    "status filter skipped: column does not exist"
                );
            }
        }
        let total = CrudService::count(pool, &sql::count_where(def, &conditions)).await?;
        data.insert(tile.key.into(), json!({"total": total, "label": tile.label}));
    }

    let agenda = catalog.resource(ResourceKind::Agenda)?;
    let today_only = [Condition::Eq {
        column: "tanggal",
        cast: "date",
        value: PgBindValue::Date(today),
    }];
    let agenda_today = CrudService::count(pool, &sql::count_where(agenda, &today_only)).await?;
    data.insert(
        "agenda_hari_ini".into(),
        json!({"total": agenda_today, "label": "Agenda Hari Ini"}),
    );

    let month = Period {
        year: today.year(),
        month: Some(today.month()),
    };
    let (from, to) = month
        .bounds()
        .ok_or_else(|| AppError::Unexpected(format!("no month bounds for {}", today)))?;
    let transactions = catalog.resource(ResourceKind::Transaction)?;
    let rows = CrudService::fetch_all(pool, &reports::totals_by_kind(transactions, from, to)).await?;
    let (income, expense) = split_totals(&rows);
    let mut finance = Map::new();
    put_money(&mut finance, "pemasukan", income);
    put_money(&mut finance, "pengeluaran", expense);
    put_money(&mut finance, "saldo", income - expense);
    finance.insert(
        "bulan".into(),
        month_year(today.year(), today.month()).map(Value::String).unwrap_or(Value::Null),
    );
    data.insert("keuangan_bulan_ini".into(), Value::Object(finance));
    Ok(Value::Object(data))
}

pub async fn recap(pool: &PgPool, catalog: &Catalog, period: Period) -> Result<Value, AppError> {
    let (from, to) = period
        .bounds()
        .ok_or_else(|| AppError::BadRequest("periode tidak valid".into()))?;
    let transactions = catalog.resource(ResourceKind::Transaction)?;
    let categories = catalog.resource(ResourceKind::FinanceCategory)?;

    let rows = CrudService::fetch_all(pool, &reports::totals_by_kind(transactions, from, to)).await?;
    let (income, expense) = split_totals(&rows);
    let mut summary = Map::new();
    put_money(&mut summary, "total_pemasukan", income);
    put_money(&mut summary, "total_pengeluaran", expense);
    put_money(&mut summary, "saldo_akhir", income - expense);

    let per_category = CrudService::fetch_all(
        pool,
        &reports::totals_by_category(transactions, categories, from, to),
    )
    .await?
    .into_iter()
    .map(|row| {
        let total = row.get("total").and_then(decimal_of).unwrap_or(Decimal::ZERO);
        let mut item = Map::new();
        item.insert("nama_kategori".into(), row.get("nama_kategori").cloned().unwrap_or(Value::Null));
        item.insert("jenis_kategori".into(), row.get("jenis_kategori").cloned().unwrap_or(Value::Null));
        put_money(&mut item, "total", total);
        Value::Object(item)
    })
    .collect::<Vec<_>>();

    Ok(json!({
        "periode": {
            "tahun": period.year,
            "bulan": period.month,
            "nama_bulan": period.month.and_then(month_name),
        },
        "summary": summary,
        "rekap_per_kategori": per_category,
    }))
}

/// Agenda of a year or month, grouped by day in date order; each day keeps time order.
pub async fn calendar(
    pool: &PgPool,
    agenda: &ResourceDef,
    settings: &Settings,
    period: Period,
) -> Result<Value, AppError> {
    let (from, to) = period
        .bounds()
        .ok_or_else(|| AppError::BadRequest("periode tidak valid".into()))?;
    let conditions = [
        Condition::OnOrAfter {
            column: "tanggal",
            date: from,
        },
        Condition::OnOrBefore {
            column: "tanggal",
            date: to,
        },
    ];
    let ordering = Ordering {
        column: "tanggal",
        order: SortOrder::Asc,
    };
    let rows = CrudService::fetch_all(pool, &sql::select_page(agenda, &conditions, ordering, None)).await?;
    let total = rows.len();
    let days = group_by_day(present_all(agenda, &rows, settings));
    Ok(json!({
        "tahun": period.year,
        "bulan": period.month,
        "nama_bulan": period.month.and_then(month_name),
        "total": total,
        "agenda_per_hari": days,
    }))
}

fn group_by_day(items: Vec<Row>) -> Vec<Value> {
    let mut days: BTreeMap<String, Vec<Row>> = BTreeMap::new();
    for item in items {
        let day = item
            .get("tanggal")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        days.entry(day).or_default().push(item);
    }
    days.into_iter()
        .map(|(day, mut agenda)| {
            agenda.sort_by(|a, b| {
                let time = |r: &Row| r.get("waktu").and_then(Value::as_str).unwrap_or("").to_string();
                time(a).cmp(&time(b))
            });
            json!({"tanggal": day, "jumlah": agenda.len(), "agenda": agenda})
        })
        .collect()
}

pub async fn item_category_statistics(pool: &PgPool, catalog: &Catalog) -> Result<Value, AppError> {
    let categories = catalog.resource(ResourceKind::ItemCategory)?;
    let items = catalog.resource(ResourceKind::Inventory)?;
    let rows = CrudService::fetch_all(pool, &reports::item_totals_per_category(categories, items)).await?;
    Ok(category_shares(rows))
}

fn category_shares(rows: Vec<Row>) -> Value {
    let count_of = |r: &Row, key: &str| r.get(key).and_then(Value::as_i64).unwrap_or(0);
    let all_items: i64 = rows.iter().map(|r| count_of(r, "total_items")).sum();
    let categories = rows
        .iter()
        .map(|r| {
            let items = count_of(r, "total_items");
            let percentage = if all_items > 0 {
                ((items as f64 / all_items as f64) * 10_000.0).round() / 100.0
            } else {
                0.0
            };
            json!({
                "id": r.get("id").cloned().unwrap_or(Value::Null),
                "nama_kategori": r.get("nama_kategori").cloned().unwrap_or(Value::Null),
                "total_items": items,
                "total_quantity": count_of(r, "total_quantity"),
                "percentage": percentage,
            })
        })
        .collect::<Vec<_>>();
    json!({
        "total_categories": rows.len(),
        "total_items_all_categories": all_items,
        "categories": categories,
    })
}

/// `statistics` block of an item category: totals and counts per condition.
pub async fn item_category_breakdown(
    pool: &PgPool,
    catalog: &Catalog,
    category_id: i64,
) -> Result<Row, AppError> {
    let items = catalog.resource(ResourceKind::Inventory)?;
    let aliases: Vec<String> = ITEM_CONDITIONS.iter().map(|c| condition_alias(c)).collect();
    let alias_refs: Vec<&str> = aliases.iter().map(String::as_str).collect();
    let q = reports::item_breakdown(items, category_id, ITEM_CONDITIONS, &alias_refs);
    Ok(CrudService::fetch_optional(pool, &q).await?.unwrap_or_default())
}

/// `"Rusak Ringan"` → `"kondisi_rusak_ringan"`
fn condition_alias(condition: &str) -> String {
    format!("kondisi_{}", condition.to_lowercase().replace(' ', "_"))
}

/// `{id, <columns>}` of every row, optionally ordered by a column.
pub async fn options(
    pool: &PgPool,
    def: &ResourceDef,
    columns: &[&str],
    order_by: Option<&str>,
) -> Result<Vec<Row>, AppError> {
    CrudService::fetch_all(pool, &reports::select_columns(def.table, columns, order_by)).await
}
