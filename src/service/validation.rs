//! Request validation from catalog rules.

use crate::error::{AppError, FieldErrors};
use crate::resource::{FieldDef, FieldKind, FileRule, ResourceDef, TextFormat};
use crate::sql::PgBindValue;
use chrono::{NaiveDate, NaiveTime};
use regex::Regex;
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::OnceLock;

const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";
const URL_PATTERN: &str = r"^https?://[^\s/$.?#][^\s]*$";

static EMAIL_RE: OnceLock<Option<Regex>> = OnceLock::new();
static URL_RE: OnceLock<Option<Regex>> = OnceLock::new();

/// Largest magnitude a `NUMERIC(15,2)` column holds, exclusive.
const DECIMAL_LIMIT: i64 = 10_000_000_000_000;
const DECIMAL_SCALE: u32 = 2;

/// One uploaded multipart file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    /// Lowercase extension of the client file name.
    pub fn extension(&self) -> Option<String> {
        let (stem, ext) = self.file_name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}

/// A write request normalized from a JSON object or multipart form.
#[derive(Clone, Debug, Default)]
pub struct Submission {
    pub fields: HashMap<String, Value>,
    pub files: HashMap<String, UploadedFile>,
}

impl Submission {
    pub fn from_json(body: Value) -> Result<Self, AppError> {
        match body {
            Value::Object(m) => Ok(Submission {
                fields: m.into_iter().collect(),
                files: HashMap::new(),
            }),
            _ => Err(AppError::BadRequest("body must be a JSON object".into())),
        }
    }

    /// Trimmed text value; blank strings count as absent.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Boolean-ish value: `true`, `1`, `"true"`, `"1"`, `"on"`, `"yes"`.
    pub fn flag(&self, key: &str) -> bool {
        match self.fields.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_i64() == Some(1),
            Some(Value::String(s)) => {
                matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "on" | "yes")
            }
            _ => false,
        }
    }
}

/// Change to an attached file column.
#[derive(Debug)]
pub enum Attachment<'a> {
    Replace(&'a FieldDef, UploadedFile),
    /// Requested through `hapus_<input>`.
    Remove(&'a FieldDef),
}

/// Result of the synchronous checks. `errors` may still grow with database checks.
#[derive(Debug)]
pub struct Checked<'a> {
    pub values: Vec<(&'a FieldDef, PgBindValue)>,
    pub attachments: Vec<Attachment<'a>>,
    pub errors: FieldErrors,
}

impl<'a> Checked<'a> {
    pub fn value(&self, name: &str) -> Option<&PgBindValue> {
        self.values
            .iter()
            .find(|(f, _)| f.name == name)
            .map(|(_, v)| v)
    }

    pub fn reject(&mut self, key: &str, message: String) {
        self.errors.entry(key.to_string()).or_default().push(message);
    }

    /// Values, or every collected error at once.
    pub fn into_result(self) -> Result<(Vec<(&'a FieldDef, PgBindValue)>, Vec<Attachment<'a>>), AppError> {
        if self.errors.is_empty() {
            Ok((self.values, self.attachments))
        } else {
            Err(AppError::Validation(self.errors))
        }
    }
}

pub struct RequestValidator;

impl RequestValidator {
    /// Type, presence, length, format, enum, minimum and file checks for every input field.
    /// Absent optional fields are left out of `values`; explicit nulls become NULL.
    pub fn check(def: &ResourceDef, mut submission: Submission) -> Checked<'_> {
        let mut checked = Checked {
            values: Vec::new(),
            attachments: Vec::new(),
            errors: FieldErrors::new(),
        };
        for field in def.input_fields() {
            if field.kind == FieldKind::File {
                check_upload(field, &mut submission, &mut checked);
                continue;
            }
            let raw = submission.fields.get(field.input);
            let present = raw.is_some();
            let value = raw.filter(|v| !is_blank(v));
            match value {
                None if field.rule.required => {
                    checked.reject(field.input, format!("{} wajib diisi.", field.label));
                }
                None if present => checked.values.push((field, PgBindValue::Null)),
                None => {}
                Some(v) => match parse_field(field, v) {
                    Ok(parsed) => checked.values.push((field, parsed)),
                    Err(message) => checked.reject(field.input, message),
                },
            }
        }
        checked
    }
}

fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn check_upload<'a>(field: &'a FieldDef, submission: &mut Submission, checked: &mut Checked<'a>) {
    let Some(rule) = field.rule.file else { return };
    if let Some(file) = submission.files.remove(field.input) {
        match check_file(field, &rule, &file) {
            Ok(()) => checked.attachments.push(Attachment::Replace(field, file)),
            Err(message) => checked.reject(field.input, message),
        }
        return;
    }
    if submission.fields.get(field.input).is_some_and(|v| !is_blank(v)) {
        checked.reject(field.input, format!("{} harus berupa file.", field.label));
        return;
    }
    if submission.flag(&format!("hapus_{}", field.input)) {
        checked.attachments.push(Attachment::Remove(field));
    }
}

fn check_file(field: &FieldDef, rule: &FileRule, file: &UploadedFile) -> Result<(), String> {
    if !rule.extensions.is_empty() {
        let ok = file
            .extension()
            .is_some_and(|ext| rule.extensions.contains(&ext.as_str()));
        if !ok {
            return Err(format!(
                "{} harus berupa file bertipe: {}.",
                field.label,
                rule.extensions.join(", ")
            ));
        }
    }
    if file.bytes.len() as u64 > rule.max_kb * 1024 {
        return Err(format!("{} maksimal {} KB.", field.label, rule.max_kb));
    }
    Ok(())
}

fn parse_field(field: &FieldDef, v: &Value) -> Result<PgBindValue, String> {
    let label = field.label;
    let rule = &field.rule;
    let parsed = match field.kind {
        FieldKind::Text | FieldKind::File => {
            let s = v
                .as_str()
                .ok_or_else(|| format!("{} harus berupa teks.", label))?
                .trim();
            if let Some(max) = rule.max_length {
                if s.chars().count() > max {
                    return Err(format!("{} maksimal {} karakter.", label, max));
                }
            }
            match rule.format {
                Some(TextFormat::Email) if !is_email(s) => {
                    return Err(format!("{} harus berupa alamat email yang valid.", label));
                }
                Some(TextFormat::Url) if !matches_pattern(&URL_RE, URL_PATTERN, s) => {
                    return Err(format!("{} harus berupa URL yang valid.", label));
                }
                _ => {}
            }
            PgBindValue::Text(s.to_string())
        }
        FieldKind::Integer | FieldKind::Reference => {
            let n = match v {
                Value::Number(n) => n.as_i64(),
                Value::String(s) => s.trim().parse::<i64>().ok(),
                _ => None,
            }
            .ok_or_else(|| format!("{} harus berupa bilangan bulat.", label))?;
            if let Some(min) = rule.minimum {
                if Decimal::from(n) < min {
                    return Err(format!("{} minimal {}.", label, min));
                }
            }
            if field.kind == FieldKind::Integer && i32::try_from(n).is_err() {
                return Err(format!("{} maksimal {}.", label, i32::MAX));
            }
            PgBindValue::I64(n)
        }
        FieldKind::Decimal => {
            let d = match v {
                Value::Number(n) => Decimal::from_str(&n.to_string())
                    .or_else(|_| Decimal::from_scientific(&n.to_string()))
                    .ok(),
                Value::String(s) => Decimal::from_str(s.trim()).ok(),
                _ => None,
            }
            .ok_or_else(|| format!("{} harus berupa angka.", label))?;
            if let Some(min) = rule.minimum {
                if d < min {
                    return Err(format!("{} minimal {}.", label, min));
                }
            }
            if d.normalize().scale() > DECIMAL_SCALE {
                return Err(format!("{} maksimal {} angka desimal.", label, DECIMAL_SCALE));
            }
            if d.abs() >= Decimal::from(DECIMAL_LIMIT) {
                return Err(format!("{} harus kurang dari {}.", label, DECIMAL_LIMIT));
            }
            PgBindValue::Decimal(d)
        }
        FieldKind::Date => {
            let d = v
                .as_str()
                .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
                .ok_or_else(|| format!("{} harus berupa tanggal yang valid (YYYY-MM-DD).", label))?;
            PgBindValue::Date(d)
        }
        FieldKind::Time => {
            let t = v
                .as_str()
                .and_then(|s| NaiveTime::parse_from_str(s.trim(), "%H:%M:%S").ok())
                .ok_or_else(|| format!("{} harus berformat HH:MM:SS.", label))?;
            PgBindValue::Time(t)
        }
    };
    if let (Some(allowed), PgBindValue::Text(s)) = (rule.allowed, &parsed) {
        if !allowed.contains(&s.as_str()) {
            return Err(format!("{} harus salah satu dari: {}.", label, allowed.join(", ")));
        }
    }
    Ok(parsed)
}

fn matches_pattern(cell: &'static OnceLock<Option<Regex>>, pattern: &str, s: &str) -> bool {
    cell.get_or_init(|| Regex::new(pattern).ok())
        .as_ref()
        .is_some_and(|re| re.is_match(s))
}

pub(crate) fn is_email(s: &str) -> bool {
    matches_pattern(&EMAIL_RE, EMAIL_PATTERN, s)
}
