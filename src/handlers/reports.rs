//! Dashboard, recap, calendar and the category lookups used by forms.

use crate::error::AppError;
use crate::resource::ResourceKind;
use crate::response::{ok, Reply};
use crate::service::reports::{self, Period};
use crate::service::Row;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use chrono::NaiveDate;
use serde_json::Value;
use std::collections::HashMap;

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

pub async fn dashboard(State(state): State<AppState>) -> Result<Reply<Value>, AppError> {
    let data = reports::dashboard(&state.pool, &state.catalog, today()).await?;
    Ok(ok("Dashboard summary berhasil diambil", data))
}

/// `?tahun=&bulan=`; the year defaults to the current one, no month means the whole year.
pub async fn recap(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Reply<Value>, AppError> {
    let period = Period::parse(&params, "tahun", "bulan", today())?;
    let data = reports::recap(&state.pool, &state.catalog, period).await?;
    Ok(ok("Rekapitulasi keuangan berhasil diambil", data))
}

/// `/agenda/calendar/{year}` or `/agenda/calendar/{year}/{month}`.
pub async fn calendar(
    State(state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
) -> Result<Reply<Value>, AppError> {
    let period = Period::parse(&params, "year", "month", today())?;
    let agenda = state.catalog.resource(ResourceKind::Agenda)?;
    let data = reports::calendar(&state.pool, agenda, &state.settings, period).await?;
    Ok(ok("Kalender agenda berhasil diambil", data))
}

pub async fn item_category_statistics(State(state): State<AppState>) -> Result<Reply<Value>, AppError> {
    let data = reports::item_category_statistics(&state.pool, &state.catalog).await?;
    Ok(ok("Statistik kategori berhasil diambil", data))
}

pub async fn item_category_options(State(state): State<AppState>) -> Result<Reply<Vec<Row>>, AppError> {
    let def = state.catalog.resource(ResourceKind::ItemCategory)?;
    let data = reports::options(&state.pool, def, &["id", "nama_kategori"], Some("nama_kategori")).await?;
    Ok(ok("Data kategori untuk dropdown berhasil diambil", data))
}

pub async fn inventory_categories(State(state): State<AppState>) -> Result<Reply<Vec<Row>>, AppError> {
    let def = state.catalog.resource(ResourceKind::ItemCategory)?;
    let data = reports::options(&state.pool, def, &["id", "nama_kategori"], Some("nama_kategori")).await?;
    Ok(ok("Data kategori berhasil diambil", data))
}

pub async fn finance_categories(State(state): State<AppState>) -> Result<Reply<Vec<Row>>, AppError> {
    let def = state.catalog.resource(ResourceKind::FinanceCategory)?;
    let data = reports::options(
        &state.pool,
        def,
        &["id", "nama_kategori", "jenis_kategori"],
        Some("nama_kategori"),
    )
    .await?;
    Ok(ok("Data kategori keuangan berhasil diambil", data))
}
