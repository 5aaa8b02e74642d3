//! Mosque identity profile: a single row, created once and then only updated.

use super::resource::writer;
use crate::error::AppError;
use crate::extractors::{AuthCaller, WriteBody};
use crate::policy::{self, Mutation};
use crate::resource::ResourceKind;
use crate::response::{created, ok, Reply};
use crate::service::presenter::present;
use crate::service::{CrudService, Row};
use crate::state::AppState;
use axum::extract::State;
use serde_json::Value;

const NOT_SET: &str = "Identitas masjid belum diatur";
const ALREADY_SET: &str = "Identitas masjid sudah diatur. Gunakan metode UPDATE untuk mengubah data.";
const STORE_FIRST: &str = "Identitas masjid belum diatur. Gunakan metode STORE untuk membuat data.";

/// The profile, or `data: null` when none is set yet.
pub async fn index(State(state): State<AppState>) -> Result<Reply<Value>, AppError> {
    let def = state.catalog.resource(ResourceKind::Identity)?;
    Ok(match CrudService::first(&state.pool, def).await? {
        Some(row) => ok(
            def.messages().fetched(),
            Value::Object(present(def, &row, &state.settings)),
        ),
        None => ok(NOT_SET, Value::Null),
    })
}

pub async fn store(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    WriteBody(submission): WriteBody,
) -> Result<Reply<Row>, AppError> {
    let def = state.catalog.resource(ResourceKind::Identity)?;
    policy::authorize_mutation(def, &caller, Mutation::Create)?;
    if CrudService::first(&state.pool, def).await?.is_some() {
        return Err(AppError::Conflict(ALREADY_SET.into()));
    }
    let row = writer(&state, &caller).create(def, submission).await?;
    tracing::info!(user_id = caller.id, "identity profile created");
    Ok(created(
        "Identitas masjid berhasil disimpan",
        present(def, &row, &state.settings),
    ))
}

/// Updates the existing profile; the id in the path, if any, is not consulted.
pub async fn update(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    WriteBody(submission): WriteBody,
) -> Result<Reply<Row>, AppError> {
    let def = state.catalog.resource(ResourceKind::Identity)?;
    policy::authorize_mutation(def, &caller, Mutation::Update)?;
    let existing = CrudService::first(&state.pool, def)
        .await?
        .ok_or_else(|| AppError::NotFound(STORE_FIRST.into()))?;
    let row = writer(&state, &caller).update(def, &existing, submission).await?;
    tracing::info!(user_id = caller.id, "identity profile updated");
    Ok(ok(
        "Identitas masjid berhasil diperbarui",
        present(def, &row, &state.settings),
    ))
}
