use std::env;
use std::str::FromStr;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    S3,
    Filesystem,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s3" | "gcs" => Ok(StorageBackend::S3),
            "filesystem" | "fs" | "local" => Ok(StorageBackend::Filesystem),
            "memory" | "mem" => Ok(StorageBackend::Memory),
            other => anyhow::bail!("unknown STORAGE_BACKEND {other:?}"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub api_port: u16,
    pub frontend_url: Option<String>,
    pub storage_backend: StorageBackend,
    pub storage_bucket: String,
    /// Folder prefix for every object key; empty means keys are bare names.
    pub storage_folder: String,
    pub storage_root: String,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>,
    pub s3_access_key: Option<String>,
    pub s3_secret_key: Option<String>,
    pub s3_use_path_style: bool,
    pub upload_max_bytes: usize,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_connect_retries: u32,
    pub is_production: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_port: 8080,
            frontend_url: None,
            storage_backend: StorageBackend::S3,
            storage_bucket: "202506-zenn-ai-agent-hackathon".into(),
            storage_folder: "test".into(),
            storage_root: "./storage".into(),
            s3_region: None,
            s3_endpoint: None,
            s3_access_key: None,
            s3_secret_key: None,
            s3_use_path_style: false,
            upload_max_bytes: 25 * 1024 * 1024,
            database_url: None,
            db_max_connections: 25,
            db_connect_retries: 5,
            is_production: false,
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let api_port = env::var("API_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.api_port);
        let frontend_url = non_empty_var("FRONTEND_URL");
        let storage_backend = match non_empty_var("STORAGE_BACKEND") {
            Some(raw) => raw.parse()?,
            None => defaults.storage_backend,
        };
        let storage_bucket = env::var("STORAGE_BUCKET").unwrap_or(defaults.storage_bucket);
        // an explicitly empty STORAGE_FOLDER disables the prefix
        let storage_folder = env::var("STORAGE_FOLDER")
            .map(|v| v.trim().trim_matches('/').to_string())
            .unwrap_or(defaults.storage_folder);
        let storage_root = env::var("STORAGE_ROOT").unwrap_or(defaults.storage_root);
        let s3_region = non_empty_var("S3_REGION");
        let s3_endpoint = non_empty_var("S3_ENDPOINT");
        let s3_access_key = non_empty_var("S3_ACCESS_KEY");
        let s3_secret_key = non_empty_var("S3_SECRET_KEY");
        let s3_use_path_style = matches!(
            env::var("S3_USE_PATH_STYLE").ok().as_deref(),
            Some("1") | Some("true") | Some("TRUE") | Some("yes")
        );
        let upload_max_bytes = env::var("UPLOAD_MAX_BYTES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.upload_max_bytes);
        let database_url = non_empty_var("DATABASE_URL");
        let db_max_connections = env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.db_max_connections);
        let db_connect_retries = env::var("DB_CONNECT_RETRIES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.db_connect_retries);
        let is_production = matches!(
            env::var("RUST_ENV").ok().as_deref(),
            Some("production") | Some("prod")
        );

        let cfg = Self {
            api_port,
            frontend_url,
            storage_backend,
            storage_bucket,
            storage_folder,
            storage_root,
            s3_region,
            s3_endpoint,
            s3_access_key,
            s3_secret_key,
            s3_use_path_style,
            upload_max_bytes,
            database_url,
            db_max_connections,
            db_connect_retries,
            is_production,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let mut problems: Vec<&str> = Vec::new();
        if self.storage_backend == StorageBackend::S3 && self.storage_bucket.trim().is_empty() {
            problems.push("STORAGE_BUCKET is required for the s3 backend");
        }
        if self.s3_access_key.is_some() != self.s3_secret_key.is_some() {
            problems.push("S3_ACCESS_KEY and S3_SECRET_KEY must be set together");
        }
        if self.db_max_connections == 0 {
            problems.push("DB_MAX_CONNECTIONS must be greater than 0");
        }
        if self.upload_max_bytes == 0 {
            problems.push("UPLOAD_MAX_BYTES must be greater than 0");
        }
        // Production hardening: require a proper FRONTEND_URL and durable storage
        if self.is_production {
            if !self
                .frontend_url
                .as_deref()
                .is_some_and(|u| u.starts_with("http"))
            {
                problems.push(
                    "FRONTEND_URL must be set to a full origin in production (e.g., https://app.example.com)",
                );
            }
            if self.storage_backend == StorageBackend::Memory {
                problems.push("STORAGE_BACKEND=memory is not allowed in production");
            }
        }
        if !problems.is_empty() {
            anyhow::bail!("configuration validation failed: {}", problems.join("; "));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backend_aliases() {
        assert_eq!("S3".parse::<StorageBackend>().unwrap(), StorageBackend::S3);
        assert_eq!(
            "fs".parse::<StorageBackend>().unwrap(),
            StorageBackend::Filesystem
        );
        assert_eq!(
            "memory".parse::<StorageBackend>().unwrap(),
            StorageBackend::Memory
        );
        assert!("ftp".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn defaults_are_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validation_collects_problems() {
        let cfg = Config {
            storage_bucket: String::new(),
            db_max_connections: 0,
            is_production: true,
            ..Config::default()
        };
        let msg = cfg.validate().unwrap_err().to_string();
        assert!(msg.contains("STORAGE_BUCKET"));
        assert!(msg.contains("DB_MAX_CONNECTIONS"));
        assert!(msg.contains("FRONTEND_URL"));
    }

    #[test]
    fn half_configured_credentials_are_rejected() {
        let cfg = Config {
            s3_access_key: Some("key".into()),
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }
}
