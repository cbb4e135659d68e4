use diesel::prelude::*;
use std::path::Path;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize structured logging and tracing
pub fn init_logging() {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level));

    if log_format == "json" {
        // JSON structured logging for production
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_current_span(false)
                    .with_span_list(false),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .init();
    }

    info!(
        service = "expolis-web",
        version = env!("CARGO_PKG_VERSION"),
        log_level = %log_level,
        log_format = %log_format,
        "Logging initialized"
    );
}

/// Application health status
#[derive(Clone, Debug, serde::Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
    pub checks: HealthChecks,
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct HealthChecks {
    pub database: &'static str,
    pub dataset_dir: &'static str,
}

impl HealthStatus {
    pub fn check(pool: &crate::DbPool, dataset_dir: &Path) -> Self {
        let database = check_database_health(pool);
        let dataset_dir = check_dataset_dir_health(dataset_dir);

        let status = if database == HEALTHY && dataset_dir == HEALTHY {
            HEALTHY
        } else {
            "unhealthy"
        };

        Self {
            status,
            version: env!("CARGO_PKG_VERSION"),
            checks: HealthChecks {
                database,
                dataset_dir,
            },
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HEALTHY
    }
}

const HEALTHY: &str = "healthy";

fn check_database_health(pool: &crate::DbPool) -> &'static str {
    match pool.get() {
        Ok(mut conn) => match diesel::sql_query("SELECT 1").execute(&mut conn) {
            Ok(_) => HEALTHY,
            Err(e) => {
                tracing::warn!(error = %e, "Database health check failed");
                "unhealthy"
            }
        },
        Err(e) => {
            tracing::warn!(error = %e, "Database unreachable");
            "unhealthy"
        }
    }
}

/// Exports are written here, so it must accept new files.
fn check_dataset_dir_health(dir: &Path) -> &'static str {
    let marker = dir.join(".health_check");
    match std::fs::write(&marker, "ok") {
        Ok(_) => {
            let _ = std::fs::remove_file(&marker);
            HEALTHY
        }
        Err(e) => {
            tracing::warn!(error = %e, dir = %dir.display(), "Dataset directory not writable");
            "unhealthy"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::create_test_db;

    #[test]
    fn test_healthy_when_db_and_dir_usable() {
        let (dir, pool) = create_test_db();
        let status = HealthStatus::check(&pool, dir.path());
        assert!(status.is_healthy());
        assert_eq!(status.checks.database, "healthy");
        assert!(!dir.path().join(".health_check").exists());
    }

    #[test]
    fn test_missing_dataset_dir_is_unhealthy() {
        let (dir, pool) = create_test_db();
        let status = HealthStatus::check(&pool, &dir.path().join("missing"));
        assert!(!status.is_healthy());
        assert_eq!(status.checks.dataset_dir, "unhealthy");
    }
}
