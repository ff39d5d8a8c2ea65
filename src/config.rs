use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Connection details for the S3/MinIO backend.
#[derive(Debug, Clone, Deserialize)]
pub struct S3Config {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub presign_ttl_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub enum StorageConfig {
    /// Files on local disk, served under `public_base_url`.
    Local {
        upload_dir: String,
        public_base_url: String,
    },
    S3(S3Config),
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub upload_max_bytes: usize,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn env_required(key: &str) -> anyhow::Result<String> {
    std::env::var(key).with_context(|| format!("{} must be set", key))
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env_required("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: env_required("JWT_SECRET")?,
            issuer: env_or("JWT_ISSUER", "memora"),
            audience: env_or("JWT_AUDIENCE", "memora-users"),
            ttl_minutes: env_parse("JWT_TTL_MINUTES", 60),
            refresh_ttl_minutes: env_parse("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14),
        };

        let storage = match env_or("STORAGE_BACKEND", "local").to_lowercase().as_str() {
            "local" => StorageConfig::Local {
                upload_dir: env_or("UPLOAD_DIR", "uploads"),
                public_base_url: env_or("PUBLIC_BASE_URL", "/uploads"),
            },
            "s3" | "minio" => StorageConfig::S3(S3Config {
                endpoint: env_required("MINIO_ENDPOINT")?,
                bucket: env_required("MINIO_BUCKET")?,
                access_key: env_required("MINIO_ACCESS_KEY")?,
                secret_key: env_required("MINIO_SECRET_KEY")?,
                region: env_required("MINIO_REGION")?,
                presign_ttl_seconds: env_parse("PRESIGN_TTL_SECONDS", 30 * 60),
            }),
            other => anyhow::bail!("unknown STORAGE_BACKEND {:?}, expected local or s3", other),
        };

        Ok(Self {
            host: env_or("APP_HOST", "0.0.0.0"),
            port: env_parse("APP_PORT", 5000),
            database_url,
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", 10),
            upload_max_bytes: env_parse("UPLOAD_MAX_BYTES", 20 * 1024 * 1024),
            jwt,
            storage,
        })
    }
}
