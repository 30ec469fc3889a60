use anyhow::Context;

use crate::reminders::schedule::MAX_HORIZON_HOURS;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

/// Record store connection settings. `client_email` and `private_key` are
/// the store account credentials and override those in the URL.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub database_url: Option<String>,
    pub project_id: String,
    pub client_email: Option<String>,
    pub private_key: Option<String>,
    pub max_connections: u32,
}

/// S3-compatible bucket for exported reports.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
}

#[derive(Debug, Clone)]
pub struct ReminderConfig {
    pub appointment_lead_minutes: i64,
    pub upcoming_hours: i64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: String,
    pub store: StoreConfig,
    pub jwt: JwtConfig,
    /// `["*"]` allows any origin.
    pub cors_origins: Vec<String>,
    pub reminders: ReminderConfig,
    pub storage: Option<StorageConfig>,
}

const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost",
    "http://localhost:3000",
    "http://localhost:8080",
    "http://localhost:19006",
];

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());
        let number = |key: &str, default: i64| -> anyhow::Result<i64> {
            match var(key) {
                Some(v) => v.parse::<i64>().with_context(|| format!("{key} must be an integer")),
                None => Ok(default),
            }
        };

        let backend = match or("STORE_BACKEND", "postgres").to_lowercase().as_str() {
            "postgres" => StoreBackend::Postgres,
            "memory" => StoreBackend::Memory,
            other => anyhow::bail!("unknown STORE_BACKEND {other}"),
        };
        let database_url = var("DATABASE_URL");
        if backend == StoreBackend::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL is required when STORE_BACKEND=postgres");
        }
        let max_connections = u32::try_from(number("STORE_MAX_CONNECTIONS", 10)?)
            .context("STORE_MAX_CONNECTIONS out of range")?;
        let store = StoreConfig {
            backend,
            database_url,
            project_id: or("STORE_PROJECT_ID", "health-tracker"),
            client_email: var("STORE_CLIENT_EMAIL"),
            private_key: var("STORE_PRIVATE_KEY"),
            max_connections,
        };

        let jwt = JwtConfig {
            secret: var("JWT_SECRET").context("JWT_SECRET is required")?,
            issuer: or("JWT_ISSUER", "health-tracker"),
            audience: or("JWT_AUDIENCE", "health-tracker-users"),
            ttl_minutes: number("JWT_TTL_MINUTES", 60)?,
            refresh_ttl_minutes: number("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14)?,
        };

        let cors_origins = match var("CORS_ALLOWED_ORIGINS") {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect(),
            None => DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect(),
        };

        let reminders = ReminderConfig {
            appointment_lead_minutes: number("REMINDER_APPOINTMENT_LEAD_MINUTES", 60)?,
            upcoming_hours: number("REMINDER_UPCOMING_HOURS", 24)?,
        };
        anyhow::ensure!(
            reminders.appointment_lead_minutes >= 0,
            "REMINDER_APPOINTMENT_LEAD_MINUTES must not be negative"
        );
        anyhow::ensure!(
            (1..=MAX_HORIZON_HOURS).contains(&reminders.upcoming_hours),
            "REMINDER_UPCOMING_HOURS must be between 1 and {MAX_HORIZON_HOURS}"
        );

        let storage = match var("STORAGE_ENDPOINT") {
            Some(endpoint) => Some(StorageConfig {
                endpoint,
                bucket: var("STORAGE_BUCKET").context("STORAGE_BUCKET is required with STORAGE_ENDPOINT")?,
                access_key: var("STORAGE_ACCESS_KEY").context("STORAGE_ACCESS_KEY is required")?,
                secret_key: var("STORAGE_SECRET_KEY").context("STORAGE_SECRET_KEY is required")?,
                region: or("STORAGE_REGION", "us-east-1"),
            }),
            None => None,
        };

        Ok(Self {
            environment: or("ENVIRONMENT", "development"),
            store,
            jwt,
            cors_origins,
            reminders,
            storage,
        })
    }

    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.iter().any(|o| o == "*")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> anyhow::Result<AppConfig> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| env.get(k).cloned())
    }

    #[test]
    fn defaults_apply() {
        let cfg = load(&[("DATABASE_URL", "postgres://localhost/db"), ("JWT_SECRET", "s")]).unwrap();
        assert_eq!(cfg.store.backend, StoreBackend::Postgres);
        assert_eq!(cfg.store.project_id, "health-tracker");
        assert_eq!(cfg.store.max_connections, 10);
        assert_eq!(cfg.jwt.ttl_minutes, 60);
        assert_eq!(cfg.jwt.refresh_ttl_minutes, 20160);
        assert_eq!(cfg.reminders.appointment_lead_minutes, 60);
        assert_eq!(cfg.cors_origins.len(), 4);
        assert!(!cfg.allows_any_origin());
        assert!(cfg.storage.is_none());
        assert_eq!(cfg.environment, "development");
    }

    #[test]
    fn postgres_requires_database_url() {
        let err = load(&[("JWT_SECRET", "s")]).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn memory_backend_needs_no_url() {
        let cfg = load(&[("STORE_BACKEND", "memory"), ("JWT_SECRET", "s")]).unwrap();
        assert_eq!(cfg.store.backend, StoreBackend::Memory);
        assert!(cfg.store.database_url.is_none());
    }

    #[test]
    fn upcoming_hours_must_fit_the_horizon() {
        for hours in ["0", "8785", "9223372036854775807"] {
            let err = load(&[("STORE_BACKEND", "memory"), ("JWT_SECRET", "s"), ("REMINDER_UPCOMING_HOURS", hours)])
                .unwrap_err();
            assert!(err.to_string().contains("REMINDER_UPCOMING_HOURS"), "{hours}");
        }
        let err = load(&[("STORE_BACKEND", "memory"), ("JWT_SECRET", "s"), ("REMINDER_UPCOMING_HOURS", "soon")])
            .unwrap_err();
        assert!(err.to_string().contains("must be an integer"));
    }

    #[test]
    fn jwt_secret_is_required() {
        let err = load(&[("STORE_BACKEND", "memory")]).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn cors_list_is_split_and_trimmed() {
        let cfg = load(&[
            ("STORE_BACKEND", "memory"),
            ("JWT_SECRET", "s"),
            ("CORS_ALLOWED_ORIGINS", "https://app.example, *,"),
        ])
        .unwrap();
        assert_eq!(cfg.cors_origins, vec!["https://app.example", "*"]);
        assert!(cfg.allows_any_origin());
    }

    #[test]
    fn store_credentials_and_storage_are_read() {
        let cfg = load(&[
            ("DATABASE_URL", "postgres://db/health"),
            ("JWT_SECRET", "s"),
            ("STORE_PROJECT_ID", "clinic-prod"),
            ("STORE_CLIENT_EMAIL", "svc@clinic.iam"),
            ("STORE_PRIVATE_KEY", "k3y"),
            ("STORAGE_ENDPOINT", "http://minio:9000"),
            ("STORAGE_BUCKET", "reports"),
            ("STORAGE_ACCESS_KEY", "ak"),
            ("STORAGE_SECRET_KEY", "sk"),
        ])
        .unwrap();
        assert_eq!(cfg.store.project_id, "clinic-prod");
        assert_eq!(cfg.store.client_email.as_deref(), Some("svc@clinic.iam"));
        assert_eq!(cfg.store.private_key.as_deref(), Some("k3y"));
        let storage = cfg.storage.unwrap();
        assert_eq!(storage.bucket, "reports");
        assert_eq!(storage.region, "us-east-1");
    }

    #[test]
    fn rejects_bad_numbers() {
        assert!(load(&[("STORE_BACKEND", "memory"), ("JWT_SECRET", "s"), ("JWT_TTL_MINUTES", "soon")]).is_err());
        assert!(load(&[("STORE_BACKEND", "memory"), ("JWT_SECRET", "s"), ("REMINDER_UPCOMING_HOURS", "0")]).is_err());
        assert!(load(&[("STORE_BACKEND", "sqlite"), ("JWT_SECRET", "s")]).is_err());
    }
}
