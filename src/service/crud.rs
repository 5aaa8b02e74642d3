//! Generic CRUD execution against PostgreSQL.

use super::listing::ListQuery;
use super::validation::Checked;
use crate::error::AppError;
use crate::resource::{FieldDef, FieldSource, ResourceDef};
use crate::response::Pagination;
use crate::sql::{self, PgBindValue, QueryBuf};
use serde_json::{Map, Value};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::{PgPool, Postgres};

/// A decoded row, keyed by column alias.
pub type Row = Map<String, Value>;

pub struct CrudService;

impl CrudService {
    /// One page of rows plus its pagination block; `all` listings return every row and no block.
    pub async fn list(
        pool: &PgPool,
        def: &ResourceDef,
        query: &ListQuery,
    ) -> Result<(Vec<Row>, Option<Pagination>), AppError> {
        if query.all {
            let q = sql::select_page(def, &query.conditions, query.ordering, None);
            return Ok((Self::fetch_all(pool, &q).await?, None));
        }
        let total = Self::count(pool, &sql::count_where(def, &query.conditions)).await?.max(0);
        let pagination = Pagination::new(query.page, query.per_page, total as u64);
        if query.offset() >= total {
            return Ok((Vec::new(), Some(pagination)));
        }
        let q = sql::select_page(def, &query.conditions, query.ordering, query.window());
        Ok((Self::fetch_all(pool, &q).await?, Some(pagination)))
    }

    pub async fn read(pool: &PgPool, def: &ResourceDef, id: i64) -> Result<Option<Row>, AppError> {
        Self::fetch_optional(pool, &sql::select_by_id(def, id)).await
    }

    /// The singleton row, if any.
    pub async fn first(pool: &PgPool, def: &ResourceDef) -> Result<Option<Row>, AppError> {
        Self::fetch_optional(pool, &sql::select_first(def)).await
    }

    pub async fn create(
        pool: &PgPool,
        def: &ResourceDef,
        values: &[(&FieldDef, PgBindValue)],
    ) -> Result<Row, AppError> {
        Self::fetch_optional(pool, &sql::insert(def, values))
            .await?
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))
    }

    /// Updated row, or `None` when the id does not exist.
    pub async fn update(
        pool: &PgPool,
        def: &ResourceDef,
        id: i64,
        values: &[(&FieldDef, PgBindValue)],
    ) -> Result<Option<Row>, AppError> {
        Self::fetch_optional(pool, &sql::update(def, id, values)).await
    }

    /// Deleted row, or `None` when the id does not exist.
    pub async fn delete(pool: &PgPool, def: &ResourceDef, id: i64) -> Result<Option<Row>, AppError> {
        Self::fetch_optional(pool, &sql::delete(def, id)).await
    }

    /// Adds uniqueness and referenced-row errors for the values that passed the typed checks.
    pub async fn check_constraints(
        pool: &PgPool,
        def: &ResourceDef,
        checked: &mut Checked<'_>,
        exclude_id: Option<i64>,
    ) -> Result<(), AppError> {
        let mut rejected = Vec::new();
        for (field, value) in &checked.values {
            if value.is_null() || field.source != FieldSource::Input {
                continue;
            }
            if field.rule.unique {
                let q = sql::value_exists(def.table, field.name, field.kind.cast(), value.clone(), exclude_id);
                if Self::exists(pool, &q).await? {
                    rejected.push((field.input, format!("{} sudah digunakan.", field.label)));
                }
            }
            if let Some(table) = field.rule.exists_in {
                let q = sql::value_exists(table, "id", "bigint", value.clone(), None);
                if !Self::exists(pool, &q).await? {
                    rejected.push((field.input, format!("{} yang dipilih tidak valid.", field.label)));
                }
            }
        }
        for (key, message) in rejected {
            checked.reject(key, message);
        }
        Ok(())
    }

    pub async fn exists(pool: &PgPool, q: &QueryBuf) -> Result<bool, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query_scalar::<_, bool>(&q.sql);
        for p in &q.params {
            query = query.bind(p.clone());
        }
        Ok(query.fetch_one(pool).await?)
    }

    pub async fn count(pool: &PgPool, q: &QueryBuf) -> Result<i64, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query_scalar::<_, i64>(&q.sql);
        for p in &q.params {
            query = query.bind(p.clone());
        }
        Ok(query.fetch_one(pool).await?)
    }

    pub async fn fetch_all(pool: &PgPool, q: &QueryBuf) -> Result<Vec<Row>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let rows = bound(q).fetch_all(pool).await?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    pub async fn fetch_optional(pool: &PgPool, q: &QueryBuf) -> Result<Option<Row>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let row = bound(q).fetch_optional(pool).await?;
        Ok(row.as_ref().map(row_to_json))
    }
}

fn bound(q: &QueryBuf) -> sqlx::query::Query<'_, Postgres, PgArguments> {
    let mut query = sqlx::query(&q.sql);
    for p in &q.params {
        query = query.bind(p.clone());
    }
    query
}

fn row_to_json(row: &PgRow) -> Row {
    use sqlx::{Column, Row as _};
    let mut map = Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    map
}

/// Selected columns are normalized to bigint, bool, text or json.
fn cell_to_value(row: &PgRow, name: &str) -> Value {
    use sqlx::Row as _;
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(name) {
        return j;
    }
    Value::Null
}
