//! Validated writes: typed checks, database rules, derived columns, caller stamps and attachments.

use super::crud::{CrudService, Row};
use super::validation::{Attachment, Checked, RequestValidator, Submission};
use crate::error::AppError;
use crate::format::{format_hijri, slugify};
use crate::policy::Caller;
use crate::resource::{Derivation, FieldDef, FieldSource, ResourceDef};
use crate::sql::{self, PgBindValue};
use crate::storage::{discard, FileStorage};
use serde_json::Value;
use sqlx::PgPool;

pub struct WriteContext<'a> {
    pub pool: &'a PgPool,
    pub storage: &'a dyn FileStorage,
    pub caller: &'a Caller,
}

impl WriteContext<'_> {
    /// Validates and inserts a row, returning it in stored form.
    pub async fn create(&self, def: &ResourceDef, submission: Submission) -> Result<Row, AppError> {
        let mut checked = RequestValidator::check(def, submission);
        CrudService::check_constraints(self.pool, def, &mut checked, None).await?;
        self.derive(def, &mut checked, None).await?;
        let (mut values, attachments) = checked.into_result()?;
        for field in def.fields.iter().filter(|f| f.is_stamp()) {
            values.push((field, PgBindValue::I64(self.caller.id)));
        }
        let stored = self.store_attachments(&attachments, &mut values).await?;
        match CrudService::create(self.pool, def, &values).await {
            Ok(row) => Ok(row),
            Err(e) => {
                self.discard_all(&stored).await;
                Err(e)
            }
        }
    }

    /// Validates and updates `existing`. Replaced or removed attachments are deleted
    /// once the row is written.
    pub async fn update(
        &self,
        def: &ResourceDef,
        existing: &Row,
        submission: Submission,
    ) -> Result<Row, AppError> {
        let id = existing
            .get("id")
            .and_then(Value::as_i64)
            .ok_or_else(|| AppError::Unexpected(format!("{} row without id", def.table)))?;
        let mut checked = RequestValidator::check(def, submission);
        CrudService::check_constraints(self.pool, def, &mut checked, Some(id)).await?;
        self.derive(def, &mut checked, Some(existing)).await?;
        let (mut values, attachments) = checked.into_result()?;
        for field in def.fields.iter().filter(|f| f.source == FieldSource::Updater) {
            values.push((field, PgBindValue::I64(self.caller.id)));
        }
        let stored = self.store_attachments(&attachments, &mut values).await?;
        let row = match CrudService::update(self.pool, def, id, &values).await {
            Ok(Some(row)) => row,
            Ok(None) => {
                self.discard_all(&stored).await;
                return Err(AppError::NotFound(def.messages().not_found()));
            }
            Err(e) => {
                self.discard_all(&stored).await;
                return Err(e);
            }
        };
        for attachment in &attachments {
            let field = match attachment {
                Attachment::Replace(field, _) | Attachment::Remove(field) => field,
            };
            if let Some(old) = existing.get(field.name).and_then(Value::as_str) {
                discard(self.storage, old).await;
            }
        }
        Ok(row)
    }

    /// Deletes by id after the delete guard passes, then removes attached files.
    pub async fn delete(&self, def: &ResourceDef, id: i64) -> Result<Row, AppError> {
        if let Some(guard) = def.delete_guard {
            let q = sql::count_references(guard.table, guard.column, id);
            let count = CrudService::count(self.pool, &q).await?;
            if count > 0 {
                return Err(AppError::Unprocessable(guard.message(count)));
            }
        }
        let row = CrudService::delete(self.pool, def, id)
            .await?
            .ok_or_else(|| AppError::NotFound(def.messages().not_found()))?;
        for field in def.upload_fields() {
            if let Some(path) = row.get(field.name).and_then(Value::as_str) {
                discard(self.storage, path).await;
            }
        }
        Ok(row)
    }

    /// Sets one column without request validation; used for status toggles.
    pub async fn set(
        &self,
        def: &ResourceDef,
        id: i64,
        column: &str,
        value: PgBindValue,
    ) -> Result<Row, AppError> {
        let field = def
            .field(column)
            .ok_or_else(|| AppError::Unexpected(format!("{} has no column {}", def.table, column)))?;
        let mut values = vec![(field, value)];
        for field in def.fields.iter().filter(|f| f.source == FieldSource::Updater) {
            values.push((field, PgBindValue::I64(self.caller.id)));
        }
        CrudService::update(self.pool, def, id, &values)
            .await?
            .ok_or_else(|| AppError::NotFound(def.messages().not_found()))
    }

    /// Fills derived columns. Slugs follow every title write; Hijri dates are only
    /// recomputed when the Gregorian date differs from the stored one.
    async fn derive<'a>(
        &self,
        def: &'a ResourceDef,
        checked: &mut Checked<'a>,
        existing: Option<&Row>,
    ) -> Result<(), AppError> {
        for field in &def.fields {
            let FieldSource::Derived(derivation) = field.source else { continue };
            match derivation {
                Derivation::Slug { from } => {
                    let Some(PgBindValue::Text(title)) = checked.value(from).cloned() else { continue };
                    let source_key = def.field(from).map(|f| f.input).unwrap_or(from);
                    let slug = slugify(&title);
                    if slug.is_empty() {
                        checked.reject(
                            source_key,
                            format!("{} harus mengandung huruf atau angka.", label_of(def, from)),
                        );
                        continue;
                    }
                    let exclude = existing.and_then(|r| r.get("id")).and_then(Value::as_i64);
                    let q = sql::value_exists(def.table, field.name, field.kind.cast(), slug.clone().into(), exclude);
                    if CrudService::exists(self.pool, &q).await? {
                        checked.reject(source_key, format!("{} sudah digunakan.", label_of(def, from)));
                        continue;
                    }
                    checked.values.push((field, PgBindValue::Text(slug)));
                }
                Derivation::Hijri { from } => {
                    let Some(PgBindValue::Date(date)) = checked.value(from).cloned() else { continue };
                    let unchanged = existing
                        .and_then(|r| r.get(from))
                        .and_then(Value::as_str)
                        .is_some_and(|stored| stored == date.format("%Y-%m-%d").to_string());
                    if !unchanged {
                        checked.values.push((field, PgBindValue::Text(format_hijri(date))));
                    }
                }
            }
        }
        Ok(())
    }

    /// Writes new uploads and appends their paths (or NULL for removals) to `values`.
    /// Returns the newly stored paths.
    async fn store_attachments<'a>(
        &self,
        attachments: &[Attachment<'a>],
        values: &mut Vec<(&'a FieldDef, PgBindValue)>,
    ) -> Result<Vec<String>, AppError> {
        let mut stored = Vec::new();
        for attachment in attachments {
            match attachment {
                Attachment::Replace(field, file) => {
                    let Some(rule) = field.rule.file else { continue };
                    let ext = file.extension();
                    match self.storage.store(&file.bytes, rule.bucket, ext.as_deref()).await {
                        Ok(path) => {
                            values.push((*field, PgBindValue::Text(path.clone())));
                            stored.push(path);
                        }
                        Err(e) => {
                            self.discard_all(&stored).await;
                            return Err(e.into());
                        }
                    }
                }
                Attachment::Remove(field) => values.push((*field, PgBindValue::Null)),
            }
        }
        Ok(stored)
    }

    async fn discard_all(&self, paths: &[String]) {
        for path in paths {
            discard(self.storage, path).await;
        }
    }
}

fn label_of<'a>(def: &'a ResourceDef, name: &'a str) -> &'a str {
    def.field(name).map(|f| f.label).unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Role;
    use crate::resource::{Catalog, ResourceKind};
    use crate::service::UploadedFile;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::io;
    use std::sync::Mutex;
    use std::time::Duration;

    /// In-memory storage that keeps every stored path until deleted.
    #[derive(Default)]
    struct MemoryStorage {
        files: Mutex<HashMap<String, Vec<u8>>>,
    }

    impl MemoryStorage {
        fn with(path: &str) -> Self {
            let storage = MemoryStorage::default();
            storage.files.lock().unwrap().insert(path.to_string(), b"old".to_vec());
            storage
        }

        fn paths(&self) -> Vec<String> {
            let mut paths: Vec<String> = self.files.lock().unwrap().keys().cloned().collect();
            paths.sort();
            paths
        }
    }

    #[async_trait]
    impl FileStorage for MemoryStorage {
        async fn store(&self, bytes: &[u8], bucket: &str, extension: Option<&str>) -> io::Result<String> {
            let mut files = self.files.lock().unwrap();
            let path = format!("{}/{}.{}", bucket, files.len() + 1, extension.unwrap_or("bin"));
            files.insert(path.clone(), bytes.to_vec());
            Ok(path)
        }

        async fn delete(&self, path: &str) -> io::Result<()> {
            self.files.lock().unwrap().remove(path);
            Ok(())
        }

        async fn exists(&self, path: &str) -> io::Result<bool> {
            Ok(self.files.lock().unwrap().contains_key(path))
        }
    }

    fn unreachable_pool() -> PgPool {
        sqlx::postgres::PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy("postgres://localhost:1/masjid_admin_test")
            .unwrap()
    }

    fn admin() -> Caller {
        Caller {
            id: 1,
            name: "Admin".into(),
            email: "admin@masjid.test".into(),
            role: Role::Admin,
        }
    }

    fn identity_with_logo() -> (ResourceDef, Submission) {
        let def = Catalog::standard().get(ResourceKind::Identity).cloned().unwrap();
        let mut submission = Submission::from_json(json!({
            "nama_masjid": "Masjid Al-Ikhlas",
            "alamat": "Jl. Merdeka 1"
        }))
        .unwrap();
        submission.files.insert(
            "logo".into(),
            UploadedFile {
                file_name: "logo.png".into(),
                bytes: vec![0x89, 0x50, 0x4e, 0x47],
            },
        );
        (def, submission)
    }

    #[tokio::test]
    async fn failed_insert_discards_the_new_upload() {
        let pool = unreachable_pool();
        let storage = MemoryStorage::default();
        let caller = admin();
        let ctx = WriteContext {
            pool: &pool,
            storage: &storage,
            caller: &caller,
        };
        let (def, submission) = identity_with_logo();

        let result = ctx.create(&def, submission).await;
        assert!(matches!(result, Err(AppError::Db(_))), "{:?}", result);
        assert!(storage.paths().is_empty());
    }

    #[tokio::test]
    async fn failed_update_keeps_the_old_file_and_drops_the_new_one() {
        let pool = unreachable_pool();
        let storage = MemoryStorage::with("masjid-logos/old.png");
        let caller = admin();
        let ctx = WriteContext {
            pool: &pool,
            storage: &storage,
            caller: &caller,
        };
        let (def, submission) = identity_with_logo();
        let existing = json!({
            "id": 1,
            "nama_masjid": "Masjid Lama",
            "alamat": "Jl. Lama",
            "logo_path": "masjid-logos/old.png"
        });
        let existing = existing.as_object().cloned().unwrap();

        let result = ctx.update(&def, &existing, submission).await;
        assert!(matches!(result, Err(AppError::Db(_))), "{:?}", result);
        assert_eq!(storage.paths(), vec!["masjid-logos/old.png".to_string()]);
    }

    #[tokio::test]
    async fn invalid_submission_stores_nothing() {
        let pool = unreachable_pool();
        let storage = MemoryStorage::default();
        let caller = admin();
        let ctx = WriteContext {
            pool: &pool,
            storage: &storage,
            caller: &caller,
        };
        let (def, mut submission) = identity_with_logo();
        submission.fields.remove("alamat");

        let result = ctx.create(&def, submission).await;
        assert!(matches!(result, Err(AppError::Validation(_))), "{:?}", result);
        assert!(storage.paths().is_empty());
    }
}
