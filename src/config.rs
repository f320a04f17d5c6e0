// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! once at startup into a [`ServerConfig`].
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Directory holding the ledger database | `./data` |
//! | `JWT_SECRET` | HS256 signing secret | Required |
//! | `JWT_ISSUER` | Issuer claim written to and expected in tokens | `ledger-gate` |
//! | `JWT_DURATION_SECS` | Token lifetime in seconds | `3600` |
//! | `MIN_PASSWORD_LEN` | Minimum password length | `8` |
//! | `USER_CACHE_CAPACITY` | Cached users for token validation (`0` disables) | `1024` |
//! | `USER_CACHE_TTL_SECS` | Lifetime of a cached user | `60` |
//! | `AUTH_POLICY_FILE` | JSON file replacing the default method policy | Optional |
//! | `ROOT_EMAIL` / `ROOT_PASSWORD` | Seed a `ROOT` user at startup | Optional |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::auth::JwtConfig;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Directory for the redb file (`ledger.redb`). Created if missing.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const JWT_ISSUER_ENV: &str = "JWT_ISSUER";
pub const JWT_DURATION_ENV: &str = "JWT_DURATION_SECS";
pub const MIN_PASSWORD_LEN_ENV: &str = "MIN_PASSWORD_LEN";
pub const USER_CACHE_CAPACITY_ENV: &str = "USER_CACHE_CAPACITY";
pub const USER_CACHE_TTL_ENV: &str = "USER_CACHE_TTL_SECS";
pub const AUTH_POLICY_FILE_ENV: &str = "AUTH_POLICY_FILE";
pub const ROOT_EMAIL_ENV: &str = "ROOT_EMAIL";
pub const ROOT_PASSWORD_ENV: &str = "ROOT_PASSWORD";

/// `json` for machine-readable logs, anything else for human-readable.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_JWT_ISSUER: &str = "ledger-gate";
pub const DEFAULT_JWT_DURATION_SECS: u64 = 3600;
pub const DEFAULT_MIN_PASSWORD_LEN: usize = 8;
pub const DEFAULT_USER_CACHE_CAPACITY: usize = 1024;
pub const DEFAULT_USER_CACHE_TTL_SECS: u64 = 60;

/// File name of the ledger database inside `DATA_DIR`.
pub const LEDGER_DB_FILE: &str = "ledger.redb";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Credentials for the bootstrap `ROOT` user.
#[derive(Clone)]
pub struct RootSeed {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for RootSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootSeed")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub jwt: JwtConfig,
    pub min_password_len: usize,
    /// `0` disables the user cache
    pub user_cache_capacity: usize,
    pub user_cache_ttl: Duration,
    pub policy_file: Option<PathBuf>,
    pub root: Option<RootSeed>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let host = get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port: u16 = parse_or(&get, PORT_ENV, DEFAULT_PORT)?;
        let bind_addr = format!("{host}:{port}")
            .parse()
            .map_err(|_| ConfigError::Invalid {
                name: HOST_ENV,
                value: host.clone(),
            })?;

        let secret = get(JWT_SECRET_ENV).ok_or(ConfigError::Missing(JWT_SECRET_ENV))?;
        let jwt = JwtConfig {
            secret,
            issuer: get(JWT_ISSUER_ENV).unwrap_or_else(|| DEFAULT_JWT_ISSUER.to_string()),
            duration: Duration::from_secs(parse_or(
                &get,
                JWT_DURATION_ENV,
                DEFAULT_JWT_DURATION_SECS,
            )?),
        };

        let root = match (get(ROOT_EMAIL_ENV), get(ROOT_PASSWORD_ENV)) {
            (Some(email), Some(password)) => Some(RootSeed { email, password }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing(ROOT_PASSWORD_ENV)),
            (None, Some(_)) => return Err(ConfigError::Missing(ROOT_EMAIL_ENV)),
        };

        Ok(Self {
            bind_addr,
            data_dir: get(DATA_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            jwt,
            min_password_len: parse_or(&get, MIN_PASSWORD_LEN_ENV, DEFAULT_MIN_PASSWORD_LEN)?,
            user_cache_capacity: parse_or(
                &get,
                USER_CACHE_CAPACITY_ENV,
                DEFAULT_USER_CACHE_CAPACITY,
            )?,
            user_cache_ttl: Duration::from_secs(parse_or(
                &get,
                USER_CACHE_TTL_ENV,
                DEFAULT_USER_CACHE_TTL_SECS,
            )?),
            policy_file: get(AUTH_POLICY_FILE_ENV).map(PathBuf::from),
            root,
        })
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join(LEDGER_DB_FILE)
    }
}

fn parse_or<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match get(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}
