//! CRUD handlers shared by every catalog resource. The route carries the
//! resource kind as an `Extension`.

use crate::error::AppError;
use crate::extractors::{AuthCaller, Viewer, WriteBody};
use crate::policy::{self, Caller, ListScope, Mutation};
use crate::resource::{ResourceDef, ResourceKind};
use crate::response::{created, done, ok, paginated, Reply};
use crate::service::presenter::{present, present_all, reduce};
use crate::service::{reports, CrudService, ListQuery, Row, WriteContext};
use crate::sql::PgBindValue;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Extension,
};
use serde_json::Value;
use std::collections::HashMap;

const PUBLISHED: &str = "publish";
const DRAFT: &str = "draft";

/// Row ids are positive integers; anything else cannot match a row.
pub(crate) fn parse_id(def: &ResourceDef, raw: &str) -> Result<i64, AppError> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::NotFound(def.messages().not_found()))
}

pub(crate) async fn find(state: &AppState, def: &ResourceDef, id: i64) -> Result<Row, AppError> {
    CrudService::read(&state.pool, def, id)
        .await?
        .ok_or_else(|| AppError::NotFound(def.messages().not_found()))
}

pub(crate) fn writer<'a>(state: &'a AppState, caller: &'a Caller) -> WriteContext<'a> {
    WriteContext {
        pool: &state.pool,
        storage: state.storage.as_ref(),
        caller,
    }
}

pub async fn list(
    State(state): State<AppState>,
    Extension(kind): Extension<ResourceKind>,
    viewer: Viewer,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, AppError> {
    let def = state.catalog.resource(kind)?;
    let scope = policy::list_scope(def, viewer.caller());
    let query = ListQuery::parse(def, &params)?.scoped(scope);
    let (rows, pagination) = CrudService::list(&state.pool, def, &query).await?;
    let mut data = present_all(def, &rows, &state.settings);
    if scope == ListScope::Reduced {
        data = data.into_iter().map(|row| reduce(def, row)).collect();
    }
    let message = def.messages().fetched();
    Ok(match pagination {
        Some(pagination) => paginated(message, data, pagination).into_response(),
        None => ok(message, data).into_response(),
    })
}

pub async fn show(
    State(state): State<AppState>,
    Extension(kind): Extension<ResourceKind>,
    viewer: Viewer,
    Path(id): Path<String>,
) -> Result<Reply<Row>, AppError> {
    let def = state.catalog.resource(kind)?;
    let row = find(&state, def, parse_id(def, &id)?).await?;
    policy::authorize_show(def, viewer.caller(), &row)?;
    Ok(ok(def.messages().fetched(), present(def, &row, &state.settings)))
}

pub async fn store(
    State(state): State<AppState>,
    Extension(kind): Extension<ResourceKind>,
    AuthCaller(caller): AuthCaller,
    WriteBody(submission): WriteBody,
) -> Result<Reply<Row>, AppError> {
    let def = state.catalog.resource(kind)?;
    policy::authorize_mutation(def, &caller, Mutation::Create)?;
    let row = writer(&state, &caller).create(def, submission).await?;
    tracing::info!(resource = def.table, id = ?row.get("id"), user_id = caller.id, "created");
    Ok(created(def.messages().stored(), present(def, &row, &state.settings)))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(kind): Extension<ResourceKind>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<String>,
    WriteBody(submission): WriteBody,
) -> Result<Reply<Row>, AppError> {
    let def = state.catalog.resource(kind)?;
    policy::authorize_mutation(def, &caller, Mutation::Update)?;
    let existing = find(&state, def, parse_id(def, &id)?).await?;
    let row = writer(&state, &caller).update(def, &existing, submission).await?;
    tracing::info!(resource = def.table, id = %id, user_id = caller.id, "updated");
    Ok(ok(def.messages().updated(), present(def, &row, &state.settings)))
}

pub async fn destroy(
    State(state): State<AppState>,
    Extension(kind): Extension<ResourceKind>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<String>,
) -> Result<Reply<()>, AppError> {
    let def = state.catalog.resource(kind)?;
    policy::authorize_mutation(def, &caller, Mutation::Delete)?;
    let id = parse_id(def, &id)?;
    writer(&state, &caller).delete(def, id).await?;
    tracing::info!(resource = def.table, id, user_id = caller.id, "deleted");
    Ok(done(def.messages().deleted()))
}

/// Item category detail with per-condition item counts under `statistics`.
pub async fn show_item_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Reply<Row>, AppError> {
    let def = state.catalog.resource(ResourceKind::ItemCategory)?;
    let id = parse_id(def, &id)?;
    let row = find(&state, def, id).await?;
    let statistics = reports::item_category_breakdown(&state.pool, &state.catalog, id).await?;
    let mut data = present(def, &row, &state.settings);
    data.insert("statistics".into(), Value::Object(statistics));
    Ok(ok(def.messages().fetched(), data))
}

pub async fn publish_content(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<String>,
) -> Result<Reply<Row>, AppError> {
    set_content_status(&state, &caller, &id, PUBLISHED, "Konten berhasil dipublikasikan").await
}

pub async fn unpublish_content(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    Path(id): Path<String>,
) -> Result<Reply<Row>, AppError> {
    set_content_status(&state, &caller, &id, DRAFT, "Konten berhasil dikembalikan ke draft").await
}

async fn set_content_status(
    state: &AppState,
    caller: &Caller,
    id: &str,
    status: &str,
    message: &str,
) -> Result<Reply<Row>, AppError> {
    let def = state.catalog.resource(ResourceKind::Content)?;
    policy::authorize_mutation(def, caller, Mutation::Update)?;
    let id = parse_id(def, id)?;
    let row = writer(state, caller)
        .set(def, id, "status", PgBindValue::Text(status.to_string()))
        .await?;
    tracing::info!(id, status, user_id = caller.id, "content status changed");
    Ok(ok(message, present(def, &row, &state.settings)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Catalog;
    use axum::http::StatusCode;

    #[test]
    fn ids_must_be_positive_integers() {
        let catalog = Catalog::standard();
        let def = catalog.get(ResourceKind::Position).unwrap();
        assert_eq!(parse_id(def, "12").unwrap(), 12);
        for raw in ["0", "-3", "abc", "1.5", ""] {
            let err = parse_id(def, raw).unwrap_err();
            assert_eq!(err.status(), StatusCode::NOT_FOUND);
            assert_eq!(err.to_string(), "Data jabatan tidak ditemukan");
        }
    }
}
