//! Startup DDL: account tables, one table per catalog resource, then foreign keys.
//! Tables use `CREATE TABLE IF NOT EXISTS`; constraints are added only when missing.

use crate::error::AppError;
use crate::resource::{
    Catalog, Derivation, FieldDef, FieldKind, FieldSource, Presentation, ResourceDef,
};
use crate::sql::quoted;
use sqlx::PgPool;

const USERS_DDL: &str = r#"CREATE TABLE IF NOT EXISTS "users" (
  "id" BIGSERIAL PRIMARY KEY,
  "name" VARCHAR(255) NOT NULL,
  "email" VARCHAR(255) NOT NULL UNIQUE,
  "password_hash" TEXT NOT NULL,
  "role" VARCHAR(20) NOT NULL DEFAULT 'admin',
  "created_at" TIMESTAMPTZ NOT NULL DEFAULT NOW(),
  "updated_at" TIMESTAMPTZ NOT NULL DEFAULT NOW()
)"#;

const TOKENS_DDL: &str = r#"CREATE TABLE IF NOT EXISTS "personal_access_tokens" (
  "id" BIGSERIAL PRIMARY KEY,
  "user_id" BIGINT NOT NULL REFERENCES "users" ("id") ON DELETE CASCADE,
  "token_hash" CHAR(64) NOT NULL UNIQUE,
  "name" VARCHAR(255) NOT NULL,
  "last_used_at" TIMESTAMPTZ,
  "created_at" TIMESTAMPTZ NOT NULL DEFAULT NOW()
)"#;

/// A foreign key from a resource column to the `id` of another table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForeignKey {
    pub name: String,
    pub table: &'static str,
    pub column: &'static str,
    pub references: &'static str,
    pub on_delete: &'static str,
}

impl ForeignKey {
    pub fn sql(&self) -> String {
        format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} (\"id\") ON DELETE {}",
            quoted(self.table),
            quoted(&self.name),
            quoted(self.column),
            quoted(self.references),
            self.on_delete
        )
    }
}

fn column_type(field: &FieldDef) -> String {
    match field.kind {
        FieldKind::Text => match field.rule.max_length {
            Some(n) => format!("VARCHAR({})", n),
            None => "TEXT".into(),
        },
        FieldKind::Integer => "INTEGER".into(),
        FieldKind::Decimal => "NUMERIC(15,2)".into(),
        FieldKind::Date => "DATE".into(),
        FieldKind::Time => "TIME".into(),
        FieldKind::Reference => "BIGINT".into(),
        FieldKind::File => "VARCHAR(255)".into(),
    }
}

fn column_sql(field: &FieldDef) -> String {
    let mut sql = format!("{} {}", quoted(field.name), column_type(field));
    if !field.nullable() {
        sql.push_str(" NOT NULL");
    }
    if let Some(default) = field.default {
        sql.push_str(&format!(" DEFAULT '{}'", default.replace('\'', "''")));
    }
    let slug = matches!(field.source, FieldSource::Derived(Derivation::Slug { .. }));
    if field.rule.unique || slug {
        sql.push_str(" UNIQUE");
    }
    sql
}

/// `CREATE TABLE IF NOT EXISTS` for a resource, without foreign keys.
pub fn create_table_sql(def: &ResourceDef) -> String {
    let mut cols = vec![format!("{} BIGSERIAL PRIMARY KEY", quoted("id"))];
    cols.extend(def.fields.iter().map(column_sql));
    for stamp in ["created_at", "updated_at"] {
        cols.push(format!("{} TIMESTAMPTZ NOT NULL DEFAULT NOW()", quoted(stamp)));
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
        quoted(def.table),
        cols.join(",\n  ")
    )
}

/// Every reference column of the catalog. Columns watched by a delete guard
/// restrict deletion; all others cascade.
pub fn foreign_keys(catalog: &Catalog) -> Vec<ForeignKey> {
    let guarded = |table: &str, column: &str| {
        catalog
            .iter()
            .filter_map(|d| d.delete_guard)
            .any(|g| g.table == table && g.column == column)
    };
    let mut keys = Vec::new();
    for def in catalog.iter() {
        for field in def.fields.iter().filter(|f| f.kind == FieldKind::Reference) {
            let Presentation::Relation(relation) = field.presentation else {
                continue;
            };
            keys.push(ForeignKey {
                name: format!("{}_{}_fkey", def.table, field.name),
                table: def.table,
                column: field.name,
                references: relation.table,
                on_delete: if guarded(def.table, field.name) {
                    "RESTRICT"
                } else {
                    "CASCADE"
                },
            });
        }
    }
    keys
}

/// Creates missing tables and constraints. Safe to run on every start.
pub async fn apply_migrations(pool: &PgPool, catalog: &Catalog) -> Result<(), AppError> {
    sqlx::query(USERS_DDL).execute(pool).await?;
    sqlx::query(TOKENS_DDL).execute(pool).await?;
    for def in catalog.iter() {
        sqlx::query(&create_table_sql(def)).execute(pool).await?;
    }
    for key in foreign_keys(catalog) {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pg_constraint WHERE conname = $1)")
                .bind(&key.name)
                .fetch_one(pool)
                .await?;
        if !exists {
            tracing::info!(constraint = %key.name, "adding foreign key");
            sqlx::query(&key.sql()).execute(pool).await?;
        }
    }
    tracing::info!(tables = catalog.iter().count(), "schema ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceKind;

    fn ddl(kind: ResourceKind) -> String {
        create_table_sql(Catalog::standard().get(kind).unwrap())
    }

    #[test]
    fn content_table_columns() {
        let sql = ddl(ResourceKind::Content);
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS \"konten_masjid\""));
        assert!(sql.contains("\"id\" BIGSERIAL PRIMARY KEY"));
        assert!(sql.contains("\"slug\" VARCHAR(255) NOT NULL UNIQUE"));
        assert!(sql.contains("\"status\" TEXT NOT NULL DEFAULT 'draft'"));
        assert!(sql.contains("\"created_by\" BIGINT NOT NULL"));
        assert!(sql.contains("\"updated_at\" TIMESTAMPTZ NOT NULL DEFAULT NOW()"));
    }

    #[test]
    fn money_and_dates() {
        let sql = ddl(ResourceKind::Transaction);
        assert!(sql.contains("NUMERIC(15,2)"));
        assert!(sql.contains("\"tanggal_masehi\" DATE NOT NULL"));
    }

    #[test]
    fn guarded_reference_restricts() {
        let keys = foreign_keys(&Catalog::standard());
        let item = keys
            .iter()
            .find(|k| k.table == "inventaris_barang" && k.column == "kategori_id")
            .unwrap();
        assert_eq!(item.on_delete, "RESTRICT");
        assert_eq!(item.references, "kategori_barang");
        let creator = keys
            .iter()
            .find(|k| k.table == "inventaris_barang" && k.column == "created_by")
            .unwrap();
        assert_eq!(creator.on_delete, "CASCADE");
        assert_eq!(creator.references, "users");
    }

    #[test]
    fn foreign_key_statement() {
        let key = ForeignKey {
            name: "pengurus_jabatan_id_fkey".into(),
            table: "pengurus",
            column: "jabatan_id",
            references: "jabatan",
            on_delete: "CASCADE",
        };
        assert_eq!(
            key.sql(),
            "ALTER TABLE \"pengurus\" ADD CONSTRAINT \"pengurus_jabatan_id_fkey\" \
             FOREIGN KEY (\"jabatan_id\") REFERENCES \"jabatan\" (\"id\") ON DELETE CASCADE"
        );
    }
}
