//! Access decisions. The caller is always passed in; anonymous readers are `None`.

use crate::error::AppError;
use crate::resource::ResourceDef;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// Authenticated principal resolved from a bearer token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Caller {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl Caller {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mutation {
    Create,
    Update,
    Delete,
}

impl Mutation {
    fn verb(self) -> &'static str {
        match self {
            Mutation::Create => "menambah",
            Mutation::Update => "mengubah",
            Mutation::Delete => "menghapus",
        }
    }
}

/// Who may create, update and delete rows of a resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MutationGate {
    AdminOnly,
    AnyAuthenticated,
}

/// How reads are narrowed for non-admin viewers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadPolicy {
    Open,
    /// Non-admins only see rows where `column = value`.
    PublishedOnly {
        column: &'static str,
        value: &'static str,
    },
    /// `user` role gets a reduced list projection and no single-row reads.
    RestrictedForUser,
}

/// Outcome of a list authorization.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListScope {
    Full,
    Only {
        column: &'static str,
        value: &'static str,
    },
    Reduced,
}

pub fn authorize_mutation(
    def: &ResourceDef,
    caller: &Caller,
    op: Mutation,
) -> Result<(), AppError> {
    match def.mutation {
        MutationGate::AnyAuthenticated => Ok(()),
        MutationGate::AdminOnly if caller.is_admin() => Ok(()),
        MutationGate::AdminOnly => Err(AppError::Forbidden(format!(
            "Akses ditolak. Hanya admin yang dapat {} data.",
            op.verb()
        ))),
    }
}

pub fn list_scope(def: &ResourceDef, viewer: Option<&Caller>) -> ListScope {
    let admin = viewer.is_some_and(Caller::is_admin);
    match def.read {
        ReadPolicy::Open => ListScope::Full,
        _ if admin => ListScope::Full,
        ReadPolicy::PublishedOnly { column, value } => ListScope::Only { column, value },
        ReadPolicy::RestrictedForUser => ListScope::Reduced,
    }
}

/// Checks a single-row read after the row is loaded.
pub fn authorize_show(
    def: &ResourceDef,
    viewer: Option<&Caller>,
    row: &Map<String, Value>,
) -> Result<(), AppError> {
    if viewer.is_some_and(Caller::is_admin) {
        return Ok(());
    }
    match def.read {
        ReadPolicy::Open => Ok(()),
        ReadPolicy::PublishedOnly { column, value } => {
            if row.get(column).and_then(Value::as_str) == Some(value) {
                Ok(())
            } else {
                Err(AppError::Forbidden(
                    "Akses ditolak. Konten belum dipublikasikan.".into(),
                ))
            }
        }
        ReadPolicy::RestrictedForUser => Err(AppError::Forbidden(format!(
            "Akses ditolak. Hanya admin yang dapat melihat detail {}.",
            def.label
        ))),
    }
}
