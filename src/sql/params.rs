//! Typed values bound to PostgreSQL statements.
//!
//! Every value travels in text form and the SQL side casts the placeholder
//! (`$n::date`, `$n::numeric`, ...), so one encoder covers all column kinds.

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use sqlx::encode::{Encode, IsNull};
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::Database;
use std::fmt;

#[derive(Clone, Debug, PartialEq)]
pub enum PgBindValue {
    Null,
    Bool(bool),
    I64(i64),
    Decimal(Decimal),
    Text(String),
    Date(NaiveDate),
    Time(NaiveTime),
}

impl PgBindValue {
    pub fn is_null(&self) -> bool {
        matches!(self, PgBindValue::Null)
    }

    /// Text form sent on the wire; `None` for SQL NULL.
    pub fn as_text(&self) -> Option<String> {
        match self {
            PgBindValue::Null => None,
            PgBindValue::Bool(b) => Some(b.to_string()),
            PgBindValue::I64(n) => Some(n.to_string()),
            PgBindValue::Decimal(d) => Some(d.to_string()),
            PgBindValue::Text(s) => Some(s.clone()),
            PgBindValue::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
            PgBindValue::Time(t) => Some(t.format("%H:%M:%S").to_string()),
        }
    }
}

impl fmt::Display for PgBindValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_text() {
            Some(s) => f.write_str(&s),
            None => f.write_str("NULL"),
        }
    }
}

impl From<&str> for PgBindValue {
    fn from(s: &str) -> Self {
        PgBindValue::Text(s.to_string())
    }
}

impl From<String> for PgBindValue {
    fn from(s: String) -> Self {
        PgBindValue::Text(s)
    }
}

impl From<i64> for PgBindValue {
    fn from(n: i64) -> Self {
        PgBindValue::I64(n)
    }
}

impl From<NaiveDate> for PgBindValue {
    fn from(d: NaiveDate) -> Self {
        PgBindValue::Date(d)
    }
}

impl<T: Into<PgBindValue>> From<Option<T>> for PgBindValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(PgBindValue::Null)
    }
}

impl<'q> Encode<'q, Postgres> for PgBindValue {
    fn encode_by_ref(
        &self,
        buf: &mut <Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        match self.as_text() {
            Some(s) => <String as Encode<Postgres>>::encode_by_ref(&s, buf),
            None => Ok(IsNull::Yes),
        }
    }
}

impl sqlx::Type<Postgres> for PgBindValue {
    fn type_info() -> PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}
