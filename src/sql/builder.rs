//! Builds parameterized SELECT, COUNT, INSERT, UPDATE and DELETE from a resource definition.
//!
//! Identifiers come from the catalog only; every value is a `$n` placeholder with an explicit cast.

use crate::resource::{FieldDef, FieldKind, Presentation, ResourceDef, SortOrder};
use crate::sql::PgBindValue;
use chrono::NaiveDate;

const MAIN_ALIAS: &str = "main";

/// Quote identifier for PostgreSQL.
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Column alias carrying the embedded relation JSON for a reference column.
pub fn relation_alias(column: &str) -> String {
    format!("{}__rel", column)
}

#[derive(Debug, Default)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<PgBindValue>,
}

impl QueryBuf {
    pub(super) fn new() -> Self {
        QueryBuf::default()
    }

    pub(super) fn push_param(&mut self, v: PgBindValue) -> usize {
        self.params.push(v);
        self.params.len()
    }

    /// Placeholder for a new param with a cast.
    pub(super) fn placeholder(&mut self, v: PgBindValue, cast: &str) -> String {
        let n = self.push_param(v);
        format!("${}::{}", n, cast)
    }
}

/// A predicate over the main table.
#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    Eq {
        column: &'static str,
        cast: &'static str,
        value: PgBindValue,
    },
    /// Case-insensitive substring match, OR-combined across columns.
    Search {
        columns: &'static [&'static str],
        term: String,
    },
    OnOrAfter {
        column: &'static str,
        date: NaiveDate,
    },
    OnOrBefore {
        column: &'static str,
        date: NaiveDate,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ordering {
    pub column: &'static str,
    pub order: SortOrder,
}

/// Escape `\`, `%` and `_` so the term matches literally inside `%...%`.
pub fn like_pattern(term: &str) -> String {
    let mut out = String::with_capacity(term.len() + 2);
    out.push('%');
    for ch in term.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('%');
    out
}

pub(super) fn column_ref(column: &str) -> String {
    format!("{}.{}", MAIN_ALIAS, quoted(column))
}

/// Expression normalizing a column so every row decodes as bigint, text or json.
fn select_expr(field: &FieldDef) -> String {
    let c = column_ref(field.name);
    match field.kind {
        FieldKind::Text | FieldKind::File | FieldKind::Reference => c,
        FieldKind::Integer => format!("{}::bigint", c),
        FieldKind::Decimal => format!("{}::text", c),
        FieldKind::Date => format!("to_char({}, 'YYYY-MM-DD')", c),
        FieldKind::Time => format!("to_char({}, 'HH24:MI:SS')", c),
    }
}

fn timestamp_expr(column: &str) -> String {
    format!(
        "to_char({} AT TIME ZONE 'UTC', 'YYYY-MM-DD HH24:MI:SS')",
        column_ref(column)
    )
}

/// SELECT list: id, each field, one row_to_json subquery per relation, timestamps.
fn select_list(def: &ResourceDef) -> String {
    let mut parts = vec![format!("{} AS {}", column_ref("id"), quoted("id"))];
    for f in &def.fields {
        parts.push(format!("{} AS {}", select_expr(f), quoted(f.name)));
        if let Presentation::Relation(rel) = f.presentation {
            let cols = rel
                .columns
                .iter()
                .map(|c| format!("r.{}", quoted(c)))
                .collect::<Vec<_>>()
                .join(", ");
            parts.push(format!(
                "(SELECT row_to_json(sub) FROM (SELECT {} FROM {} r WHERE r.\"id\" = {}) sub) AS {}",
                cols,
                quoted(rel.table),
                column_ref(f.name),
                quoted(&relation_alias(f.name))
            ));
        }
    }
    for ts in ["created_at", "updated_at"] {
        parts.push(format!("{} AS {}", timestamp_expr(ts), quoted(ts)));
    }
    parts.join(", ")
}

fn where_clause(q: &mut QueryBuf, conditions: &[Condition]) -> String {
    let mut parts = Vec::with_capacity(conditions.len());
    for cond in conditions {
        match cond {
            Condition::Eq {
                column,
                cast,
                value,
            } => {
                let ph = q.placeholder(value.clone(), cast);
                parts.push(format!("{} = {}", column_ref(column), ph));
            }
            Condition::Search { columns, term } => {
                let n = q.push_param(PgBindValue::Text(like_pattern(term)));
                let ors = columns
                    .iter()
                    .map(|c| format!("{} ILIKE ${}::text ESCAPE '\\'", column_ref(c), n))
                    .collect::<Vec<_>>()
                    .join(" OR ");
                parts.push(format!("({})", ors));
            }
            Condition::OnOrAfter { column, date } => {
                let ph = q.placeholder(PgBindValue::Date(*date), "date");
                parts.push(format!("{} >= {}", column_ref(column), ph));
            }
            Condition::OnOrBefore { column, date } => {
                let ph = q.placeholder(PgBindValue::Date(*date), "date");
                parts.push(format!("{} <= {}", column_ref(column), ph));
            }
        }
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

/// Filtered, ordered SELECT. `window` is `(limit, offset)`; `None` returns every match.
pub fn select_page(
    def: &ResourceDef,
    conditions: &[Condition],
    ordering: Ordering,
    window: Option<(i64, i64)>,
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(&mut q, conditions);
    let dir = ordering.order.as_sql();
    let order_sql = format!(
        " ORDER BY {} {}, {} {}",
        column_ref(ordering.column),
        dir,
        column_ref("id"),
        dir
    );
    let window_sql = window
        .map(|(limit, offset)| {
            let limit = q.placeholder(PgBindValue::I64(limit), "bigint");
            let offset = q.placeholder(PgBindValue::I64(offset), "bigint");
            format!(" LIMIT {} OFFSET {}", limit, offset)
        })
        .unwrap_or_default();
    q.sql = format!(
        "SELECT {} FROM {} {}{}{}{}",
        select_list(def),
        quoted(def.table),
        MAIN_ALIAS,
        where_sql,
        order_sql,
        window_sql
    );
    q
}

/// COUNT(*) over the same conditions as `select_page`.
pub fn count_where(def: &ResourceDef, conditions: &[Condition]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(&mut q, conditions);
    q.sql = format!(
        "SELECT COUNT(*) FROM {} {}{}",
        quoted(def.table),
        MAIN_ALIAS,
        where_sql
    );
    q
}

pub fn select_by_id(def: &ResourceDef, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.placeholder(PgBindValue::I64(id), "bigint");
    q.sql = format!(
        "SELECT {} FROM {} {} WHERE {} = {}",
        select_list(def),
        quoted(def.table),
        MAIN_ALIAS,
        column_ref("id"),
        ph
    );
    q
}

/// Lowest-id row; used for singleton resources.
pub fn select_first(def: &ResourceDef) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!(
        "SELECT {} FROM {} {} ORDER BY {} LIMIT 1",
        select_list(def),
        quoted(def.table),
        MAIN_ALIAS,
        column_ref("id")
    );
    q
}

/// INSERT of the given column values, returning the full presented row through a CTE.
pub fn insert(def: &ResourceDef, values: &[(&FieldDef, PgBindValue)]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::with_capacity(values.len());
    let mut placeholders = Vec::with_capacity(values.len());
    for (field, value) in values {
        cols.push(quoted(field.name));
        placeholders.push(q.placeholder(value.clone(), field.kind.cast()));
    }
    let statement = if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING *", quoted(def.table))
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
            quoted(def.table),
            cols.join(", "),
            placeholders.join(", ")
        )
    };
    q.sql = with_returning_row(def, &statement);
    q
}

/// UPDATE by id; always bumps `updated_at`.
pub fn update(def: &ResourceDef, id: i64, values: &[(&FieldDef, PgBindValue)]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets = Vec::with_capacity(values.len() + 1);
    for (field, value) in values {
        let ph = q.placeholder(value.clone(), field.kind.cast());
        sets.push(format!("{} = {}", quoted(field.name), ph));
    }
    sets.push(format!("{} = NOW()", quoted("updated_at")));
    let id_ph = q.placeholder(PgBindValue::I64(id), "bigint");
    let statement = format!(
        "UPDATE {} SET {} WHERE {} = {} RETURNING *",
        quoted(def.table),
        sets.join(", "),
        quoted("id"),
        id_ph
    );
    q.sql = with_returning_row(def, &statement);
    q
}

/// DELETE by id, returning the removed row so attached files can be cleaned up.
pub fn delete(def: &ResourceDef, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let id_ph = q.placeholder(PgBindValue::I64(id), "bigint");
    let statement = format!(
        "DELETE FROM {} WHERE {} = {} RETURNING *",
        quoted(def.table),
        quoted("id"),
        id_ph
    );
    q.sql = with_returning_row(def, &statement);
    q
}

fn with_returning_row(def: &ResourceDef, statement: &str) -> String {
    format!(
        "WITH {} AS ({}) SELECT {} FROM {}",
        MAIN_ALIAS,
        statement,
        select_list(def),
        MAIN_ALIAS
    )
}

/// `SELECT EXISTS(...)` for a column value, optionally ignoring one row id.
pub fn value_exists(
    table: &str,
    column: &str,
    cast: &str,
    value: PgBindValue,
    exclude_id: Option<i64>,
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.placeholder(value, cast);
    let mut sql = format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = {}",
        quoted(table),
        quoted(column),
        ph
    );
    if let Some(id) = exclude_id {
        let id_ph = q.placeholder(PgBindValue::I64(id), "bigint");
        sql.push_str(&format!(" AND {} <> {}", quoted("id"), id_ph));
    }
    sql.push(')');
    q.sql = sql;
    q
}

/// Number of rows in `table` whose `column` points at `id`.
pub fn count_references(table: &str, column: &str, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.placeholder(PgBindValue::I64(id), "bigint");
    q.sql = format!(
        "SELECT COUNT(*) FROM {} WHERE {} = {}",
        quoted(table),
        quoted(column),
        ph
    );
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{Catalog, ResourceKind};

    fn def(kind: ResourceKind) -> ResourceDef {
        Catalog::standard().get(kind).cloned().unwrap()
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("sajadah"), "%sajadah%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn page_query_orders_with_id_tie_break() {
        let inv = def(ResourceKind::Inventory);
        let q = select_page(
            &inv,
            &[],
            Ordering {
                column: "created_at",
                order: SortOrder::Desc,
            },
            Some((15, 30)),
        );
        assert!(q.sql.contains("FROM \"inventaris_barang\" main"));
        assert!(q.sql.ends_with(
            "ORDER BY main.\"created_at\" DESC, main.\"id\" DESC LIMIT $1::bigint OFFSET $2::bigint"
        ));
        assert_eq!(q.params, vec![PgBindValue::I64(15), PgBindValue::I64(30)]);
    }

    #[test]
    fn relations_are_embedded_as_json_subqueries() {
        let inv = def(ResourceKind::Inventory);
        let q = select_by_id(&inv, 5);
        assert!(q.sql.contains(
            "(SELECT row_to_json(sub) FROM (SELECT r.\"id\", r.\"nama_kategori\" FROM \"kategori_barang\" r WHERE r.\"id\" = main.\"kategori_id\") sub) AS \"kategori_id__rel\""
        ));
        assert!(q.sql.contains("AS \"created_by__rel\""));
        assert!(q.sql.contains("to_char(main.\"tanggal_masuk\", 'YYYY-MM-DD') AS \"tanggal_masuk\""));
        assert!(q.sql.ends_with("WHERE main.\"id\" = $1::bigint"));
        assert_eq!(q.params, vec![PgBindValue::I64(5)]);
    }

    #[test]
    fn conditions_bind_in_order_with_casts() {
        let inv = def(ResourceKind::Inventory);
        let from = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let conditions = vec![
            Condition::Search {
                columns: &["nama_barang"],
                term: "karpet".into(),
            },
            Condition::Eq {
                column: "kategori_id",
                cast: "bigint",
                value: PgBindValue::I64(3),
            },
            Condition::OnOrAfter {
                column: "tanggal_masuk",
                date: from,
            },
        ];
        let q = count_where(&inv, &conditions);
        assert_eq!(
            q.sql,
            "SELECT COUNT(*) FROM \"inventaris_barang\" main WHERE (main.\"nama_barang\" ILIKE $1::text ESCAPE '\\') AND main.\"kategori_id\" = $2::bigint AND main.\"tanggal_masuk\" >= $3::date"
        );
        assert_eq!(
            q.params,
            vec![
                PgBindValue::Text("%karpet%".into()),
                PgBindValue::I64(3),
                PgBindValue::Date(from)
            ]
        );
    }

    #[test]
    fn multi_column_search_reuses_one_param() {
        let cat = def(ResourceKind::ItemCategory);
        let q = count_where(
            &cat,
            &[Condition::Search {
                columns: &["nama_kategori", "deskripsi"],
                term: "elektronik".into(),
            }],
        );
        assert!(q.sql.contains(
            "(main.\"nama_kategori\" ILIKE $1::text ESCAPE '\\' OR main.\"deskripsi\" ILIKE $1::text ESCAPE '\\')"
        ));
        assert_eq!(q.params.len(), 1);
    }

    #[test]
    fn insert_and_update_return_presented_row() {
        let pos = def(ResourceKind::Position);
        let name = pos.field("nama_jabatan").unwrap();
        let creator = pos.field("created_by").unwrap();
        let q = insert(
            &pos,
            &[(name, "Ketua".into()), (creator, PgBindValue::I64(1))],
        );
        assert!(q.sql.starts_with(
            "WITH main AS (INSERT INTO \"jabatan\" (\"nama_jabatan\", \"created_by\") VALUES ($1::text, $2::bigint) RETURNING *) SELECT "
        ));
        assert!(q.sql.ends_with(" FROM main"));

        let q = update(&pos, 9, &[(name, "Bendahara".into())]);
        assert!(q.sql.contains(
            "UPDATE \"jabatan\" SET \"nama_jabatan\" = $1::text, \"updated_at\" = NOW() WHERE \"id\" = $2::bigint RETURNING *"
        ));
        assert_eq!(q.params.last(), Some(&PgBindValue::I64(9)));
    }

    #[test]
    fn uniqueness_check_can_exclude_current_row() {
        let q = value_exists("jabatan", "nama_jabatan", "text", "Ketua".into(), Some(4));
        assert_eq!(
            q.sql,
            "SELECT EXISTS(SELECT 1 FROM \"jabatan\" WHERE \"nama_jabatan\" = $1::text AND \"id\" <> $2::bigint)"
        );
        let q = value_exists("jabatan", "nama_jabatan", "text", "Ketua".into(), None);
        assert!(q.sql.ends_with("= $1::text)"));
    }

    #[test]
    fn quoted_escapes_double_quotes() {
        assert_eq!(quoted("a\"b"), "\"a\"\"b\"");
    }
}
