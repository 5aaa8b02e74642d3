//! Accounts and bearer tokens.
//!
//! Passwords are stored as argon2 PHC strings. Tokens are random 40-character
//! alphanumeric strings; only their sha256 hex digest is persisted.

use crate::error::{AppError, FieldErrors};
use crate::policy::{Caller, Role};
use crate::service::is_email;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::Rng;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use std::collections::HashMap;
use std::str::FromStr;

pub const TOKEN_LENGTH: usize = 40;
pub const MIN_PASSWORD_LENGTH: usize = 8;
const TOKEN_NAME: &str = "api-token";
pub const INVALID_CREDENTIALS: &str = "The provided credentials do not match our records.";

#[derive(Clone, Debug, sqlx::FromRow)]
struct UserRow {
    id: i64,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    created_at: String,
    updated_at: String,
}

/// Public view of an account.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct UserInfo {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<UserRow> for UserInfo {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = Role::from_str(&row.role)
            .map_err(|e| AppError::Unexpected(format!("user {}: {}", row.id, e)))?;
        Ok(UserInfo {
            id: row.id,
            name: row.name,
            email: row.email,
            role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl From<&UserInfo> for Caller {
    fn from(user: &UserInfo) -> Self {
        Caller {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

/// Validated `/register` body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl Registration {
    /// Checks name, email and password (`password_confirmation` must match).
    pub fn parse(body: &HashMap<String, Value>) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();
        let mut reject = |key: &str, message: &str| {
            errors.entry(key.to_string()).or_default().push(message.to_string());
        };
        let text = |key: &str| body.get(key).and_then(Value::as_str).map(str::trim).unwrap_or("");

        let name = text("name");
        if name.is_empty() {
            reject("name", "Nama wajib diisi.");
        } else if name.chars().count() > 255 {
            reject("name", "Nama maksimal 255 karakter.");
        }

        let email = text("email");
        if email.is_empty() {
            reject("email", "Email wajib diisi.");
        } else if !is_email(email) {
            reject("email", "Email harus berupa alamat email yang valid.");
        } else if email.chars().count() > 255 {
            reject("email", "Email maksimal 255 karakter.");
        }

        let password = body.get("password").and_then(Value::as_str).unwrap_or("");
        if password.is_empty() {
            reject("password", "Password wajib diisi.");
        } else if password.chars().count() < MIN_PASSWORD_LENGTH {
            reject("password", "Password minimal 8 karakter.");
        } else if body.get("password_confirmation").and_then(Value::as_str) != Some(password) {
            reject("password", "Konfirmasi password tidak cocok.");
        }

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(Registration {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        })
    }
}

/// Validated `/login` body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn parse(body: &HashMap<String, Value>) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();
        let email = body.get("email").and_then(Value::as_str).map(str::trim).unwrap_or("");
        let password = body.get("password").and_then(Value::as_str).unwrap_or("");
        if email.is_empty() {
            errors.entry("email".into()).or_default().push("Email wajib diisi.".into());
        } else if !is_email(email) {
            errors
                .entry("email".into())
                .or_default()
                .push("Email harus berupa alamat email yang valid.".into());
        }
        if password.is_empty() {
            errors.entry("password".into()).or_default().push("Password wajib diisi.".into());
        }
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(Credentials {
            email: email.to_string(),
            password: password.to_string(),
        })
    }
}

pub fn hash_password(plain: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Unexpected(format!("password hashing: {}", e)))
}

/// False for a wrong password or an unparsable stored hash.
pub fn verify_password(plain: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "stored password hash is not a PHC string");
            false
        }
    }
}

pub fn generate_token() -> String {
    rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Digest stored in `personal_access_tokens.token_hash`.
pub fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// `Authorization: Bearer <token>` value, if well-formed.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

const USER_COLUMNS: &str = "u.\"id\", u.\"name\", u.\"email\", u.\"password_hash\", u.\"role\", \
     to_char(u.\"created_at\" AT TIME ZONE 'UTC', 'YYYY-MM-DD HH24:MI:SS') AS \"created_at\", \
     to_char(u.\"updated_at\" AT TIME ZONE 'UTC', 'YYYY-MM-DD HH24:MI:SS') AS \"updated_at\"";

pub struct AuthService;

impl AuthService {
    /// Creates the account with `role` and issues its first token.
    pub async fn register(
        pool: &PgPool,
        registration: Registration,
        role: Role,
    ) -> Result<(String, UserInfo), AppError> {
        let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM \"users\" WHERE \"email\" = $1)")
            .bind(&registration.email)
            .fetch_one(pool)
            .await?;
        if taken {
            return Err(AppError::field("email", "Email sudah digunakan."));
        }
        let password_hash = hash_password(&registration.password)?;
        let sql = format!(
            "WITH u AS (INSERT INTO \"users\" (\"name\", \"email\", \"password_hash\", \"role\") \
             VALUES ($1, $2, $3, $4) RETURNING *) SELECT {} FROM u",
            USER_COLUMNS
        );
        let row: UserRow = sqlx::query_as(&sql)
            .bind(&registration.name)
            .bind(&registration.email)
            .bind(&password_hash)
            .bind(role.as_str())
            .fetch_one(pool)
            .await?;
        let user = UserInfo::try_from(row)?;
        let token = Self::issue_token(pool, user.id).await?;
        tracing::info!(user_id = user.id, role = %user.role, "user registered");
        Ok((token, user))
    }

    pub async fn login(pool: &PgPool, credentials: Credentials) -> Result<(String, UserInfo), AppError> {
        let sql = format!("SELECT {} FROM \"users\" u WHERE u.\"email\" = $1", USER_COLUMNS);
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(&credentials.email)
            .fetch_optional(pool)
            .await?;
        let row = match row {
            Some(row) if verify_password(&credentials.password, &row.password_hash) => row,
            _ => return Err(AppError::field("email", INVALID_CREDENTIALS)),
        };
        let user = UserInfo::try_from(row)?;
        let token = Self::issue_token(pool, user.id).await?;
        Ok((token, user))
    }

    /// Resolves a bearer token and touches its `last_used_at`.
    pub async fn caller_for_token(pool: &PgPool, token: &str) -> Result<Option<Caller>, AppError> {
        let sql = "WITH t AS (UPDATE \"personal_access_tokens\" SET \"last_used_at\" = NOW() \
                   WHERE \"token_hash\" = $1 RETURNING \"user_id\") \
                   SELECT u.\"id\", u.\"name\", u.\"email\", u.\"role\" FROM t JOIN \"users\" u ON u.\"id\" = t.\"user_id\"";
        let row: Option<(i64, String, String, String)> = sqlx::query_as(sql)
            .bind(token_digest(token))
            .fetch_optional(pool)
            .await?;
        let Some((id, name, email, role)) = row else {
            return Ok(None);
        };
        let role = Role::from_str(&role).map_err(|e| AppError::Unexpected(format!("user {}: {}", id, e)))?;
        Ok(Some(Caller { id, name, email, role }))
    }

    pub async fn user(pool: &PgPool, id: i64) -> Result<Option<UserInfo>, AppError> {
        let sql = format!("SELECT {} FROM \"users\" u WHERE u.\"id\" = $1", USER_COLUMNS);
        let row: Option<UserRow> = sqlx::query_as(&sql).bind(id).fetch_optional(pool).await?;
        row.map(UserInfo::try_from).transpose()
    }

    /// Deletes the token the request was made with.
    pub async fn revoke(pool: &PgPool, token: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM \"personal_access_tokens\" WHERE \"token_hash\" = $1")
            .bind(token_digest(token))
            .execute(pool)
            .await?;
        Ok(())
    }

    async fn issue_token(pool: &PgPool, user_id: i64) -> Result<String, AppError> {
        let token = generate_token();
        sqlx::query(
            "INSERT INTO \"personal_access_tokens\" (\"user_id\", \"token_hash\", \"name\") VALUES ($1, $2, $3)",
        )
        .bind(user_id)
        .bind(token_digest(&token))
        .bind(TOKEN_NAME)
        .execute(pool)
        .await?;
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(v: Value) -> HashMap<String, Value> {
        v.as_object().cloned().unwrap().into_iter().collect()
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("rahasia123").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("rahasia123", &hash));
        assert!(!verify_password("salah", &hash));
        assert!(!verify_password("rahasia123", "not-a-hash"));
    }

    #[test]
    fn tokens_are_alphanumeric_and_fresh() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), TOKEN_LENGTH);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn digest_is_sha256_hex() {
        assert_eq!(
            token_digest("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn bearer_header_parsing() {
        assert_eq!(bearer_token("Bearer abc123"), Some("abc123"));
        assert_eq!(bearer_token("bearer   abc123 "), Some("abc123"));
        assert_eq!(bearer_token("Basic abc123"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("abc123"), None);
    }

    #[test]
    fn registration_rules() {
        let ok = Registration::parse(&body(json!({
            "name": "Takmir",
            "email": "takmir@masjid.example",
            "password": "rahasia123",
            "password_confirmation": "rahasia123"
        })))
        .unwrap();
        assert_eq!(ok.email, "takmir@masjid.example");

        let errors = Registration::parse(&body(json!({
            "email": "bukan-email",
            "password": "pendek"
        })))
        .unwrap_err();
        assert_eq!(errors["name"], vec!["Nama wajib diisi."]);
        assert_eq!(errors["email"], vec!["Email harus berupa alamat email yang valid."]);
        assert_eq!(errors["password"], vec!["Password minimal 8 karakter."]);

        let errors = Registration::parse(&body(json!({
            "name": "Takmir",
            "email": "takmir@masjid.example",
            "password": "rahasia123",
            "password_confirmation": "rahasia124"
        })))
        .unwrap_err();
        assert_eq!(errors["password"], vec!["Konfirmasi password tidak cocok."]);
    }

    #[test]
    fn login_requires_both_fields() {
        let errors = Credentials::parse(&body(json!({}))).unwrap_err();
        assert!(errors.contains_key("email"));
        assert!(errors.contains_key("password"));
        assert!(Credentials::parse(&body(json!({"email": "a@b.id", "password": "x"}))).is_ok());
    }

    #[test]
    fn caller_from_user() {
        let user = UserInfo {
            id: 3,
            name: "Fulan".into(),
            email: "fulan@example.com".into(),
            role: Role::User,
            created_at: "2025-01-01 00:00:00".into(),
            updated_at: "2025-01-01 00:00:00".into(),
        };
        let caller = Caller::from(&user);
        assert_eq!(caller.id, 3);
        assert!(!caller.is_admin());
    }
}
