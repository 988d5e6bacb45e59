use dotenvy::dotenv;
use std::env;

use crate::error::AppError;

/// Which backing store the repository layer talks to (selected at startup).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Direct relational store via sqlx.
    Postgres,
    /// Hosted REST store (PostgREST-style API).
    Rest,
    /// In-process store; used by the test suite and local development.
    Memory,
}

impl StoreBackend {
    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "rest" | "hosted" => Ok(StoreBackend::Rest),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(AppError::Config(format!(
                "unknown STORE_BACKEND '{other}' (expected postgres, rest or memory)"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RestStoreConfig {
    pub base_url: String,
    pub service_key: String,
}

#[derive(Debug, Clone)]
pub struct FcmConfig {
    pub server_key: String,
    pub endpoint: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub rest_store: Option<RestStoreConfig>,
    pub jwt_secret: String,
    pub fcm: Option<FcmConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();

        let port = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);

        let store_backend = match env::var("STORE_BACKEND") {
            Ok(v) => StoreBackend::parse(&v)?,
            Err(_) => StoreBackend::Postgres,
        };

        let database_url = env::var("DATABASE_URL").ok();
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(AppError::Config("DATABASE_URL missing".into()));
        }

        let rest_store = match store_backend {
            StoreBackend::Rest => {
                let base_url = env::var("REST_STORE_URL")
                    .map_err(|_| AppError::Config("REST_STORE_URL missing".into()))?;
                let service_key = env::var("REST_STORE_SERVICE_KEY")
                    .map_err(|_| AppError::Config("REST_STORE_SERVICE_KEY missing".into()))?;
                Some(RestStoreConfig {
                    base_url: base_url.trim_end_matches('/').to_string(),
                    service_key,
                })
            }
            _ => None,
        };

        let jwt_secret = env::var("JWT_SECRET_KEY")
            .map_err(|_| AppError::Config("JWT_SECRET_KEY missing".into()))?;

        let fcm = match env::var("FCM_SERVER_KEY") {
            Ok(server_key) if !server_key.trim().is_empty() => {
                let endpoint = env::var("FCM_ENDPOINT")
                    .unwrap_or_else(|_| "https://fcm.googleapis.com/fcm/send".into());
                Some(FcmConfig {
                    server_key,
                    endpoint,
                })
            }
            _ => None,
        };

        Ok(Self {
            port,
            store_backend,
            database_url,
            rest_store,
            jwt_secret,
            fcm,
        })
    }

    pub fn test_defaults() -> Self {
        Self {
            port: 3000,
            store_backend: StoreBackend::Memory,
            database_url: None,
            rest_store: None,
            jwt_secret: "test-secret".into(),
            fcm: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_parsing_accepts_known_names() {
        assert_eq!(
            StoreBackend::parse("postgres").unwrap(),
            StoreBackend::Postgres
        );
        assert_eq!(StoreBackend::parse("REST").unwrap(), StoreBackend::Rest);
        assert_eq!(
            StoreBackend::parse(" memory ").unwrap(),
            StoreBackend::Memory
        );
        assert!(StoreBackend::parse("mongodb").is_err());
    }
}
