//! Process settings read from the environment (optionally seeded from `.env`).

use crate::error::ConfigError;
use crate::policy::Role;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/masjid_admin";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_STORAGE_ROOT: &str = "storage/app/public";
const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 12 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub db_max_connections: u32,
    /// Directory uploaded files are written under; served at `/storage`.
    pub storage_root: PathBuf,
    /// Prefix for file URLs in responses, without trailing slash.
    pub public_base_url: String,
    /// Role given to accounts created through `/register`.
    pub register_role: Role,
    /// When set, 500 responses include the underlying error text.
    pub expose_error_detail: bool,
    pub max_upload_bytes: usize,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from any key lookup; unset or blank keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_url = get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.into());
        let bind_addr = parse_or("BIND_ADDR", get("BIND_ADDR"), DEFAULT_BIND_ADDR.parse().ok())?;
        let db_max_connections = parse_or("DB_MAX_CONNECTIONS", get("DB_MAX_CONNECTIONS"), Some(5))?;
        let storage_root = get("STORAGE_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_ROOT));
        let public_base_url = get("PUBLIC_BASE_URL")
            .unwrap_or_else(|| DEFAULT_PUBLIC_BASE_URL.into())
            .trim_end_matches('/')
            .to_string();
        let register_role = parse_or("REGISTER_ROLE", get("REGISTER_ROLE"), Some(Role::Admin))?;
        let expose_error_detail = match get("EXPOSE_ERROR_DETAIL") {
            None => false,
            Some(v) => parse_flag(&v).ok_or(ConfigError::InvalidSetting {
                key: "EXPOSE_ERROR_DETAIL",
                value: v,
            })?,
        };
        let max_upload_bytes = parse_or(
            "MAX_UPLOAD_BYTES",
            get("MAX_UPLOAD_BYTES"),
            Some(DEFAULT_MAX_UPLOAD_BYTES),
        )?;

        Ok(Settings {
            database_url,
            bind_addr,
            db_max_connections,
            storage_root,
            public_base_url,
            register_role,
            expose_error_detail,
            max_upload_bytes,
        })
    }

    /// Public URL of a stored file path.
    pub fn file_url(&self, path: &str) -> String {
        format!("{}/storage/{}", self.public_base_url, path.trim_start_matches('/'))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            database_url: DEFAULT_DATABASE_URL.into(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            db_max_connections: 5,
            storage_root: PathBuf::from(DEFAULT_STORAGE_ROOT),
            public_base_url: DEFAULT_PUBLIC_BASE_URL.into(),
            register_role: Role::Admin,
            expose_error_detail: false,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

fn parse_or<T: FromStr>(
    key: &'static str,
    raw: Option<String>,
    default: Option<T>,
) -> Result<T, ConfigError> {
    match raw {
        Some(v) => v
            .parse()
            .map_err(|_| ConfigError::InvalidSetting { key, value: v }),
        None => default.ok_or(ConfigError::InvalidSetting {
            key,
            value: String::new(),
        }),
    }
}

fn parse_flag(v: &str) -> Option<bool> {
    match v.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
