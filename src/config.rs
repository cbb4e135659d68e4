//! Runtime configuration read from `EXPOLIS_*` environment variables.

use std::env;
use std::path::PathBuf;
use thiserror::Error;

use crate::export::CsvExporter;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a port number, got {value:?}")]
    InvalidPort { name: &'static str, value: String },
    #[error("SMTP delivery needs {0} when EXPOLIS_SMTP_HOST is set")]
    IncompleteSmtp(&'static str),
}

/// What request handlers need to know about the deployment.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// host (and optional port) used in absolute links sent by email
    pub public_host: String,
    pub dataset_dir: PathBuf,
    /// path the dataset directory is served under
    pub dataset_url_prefix: String,
}

impl SiteConfig {
    pub fn exporter(&self) -> CsvExporter {
        CsvExporter::new(&self.dataset_dir, &self.dataset_url_prefix)
    }

    /// `http://<host>`, without the language prefix.
    pub fn public_url(&self) -> String {
        format!("http://{}", self.public_host.trim_end_matches('/'))
    }

    /// Absolute form of a site-relative link such as an export path.
    pub fn absolute(&self, link: &str) -> String {
        format!("{}{}", self.public_url(), link)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_address: String,
    pub port: u16,
    /// directory with the stylesheet served under `/static`
    pub public_path: String,
    pub site: SiteConfig,
    /// periodic notifications are only sent when this is set
    pub smtp: Option<SmtpSettings>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = setting(&lookup, "EXPOLIS_DATABASE_URL", "expolis.db");
        let bind_address = setting(&lookup, "EXPOLIS_BIND_ADDRESS", "127.0.0.1");
        let port = parse_port(
            "EXPOLIS_PORT",
            &setting(&lookup, "EXPOLIS_PORT", "8080"),
        )?;
        let public_path = setting(&lookup, "EXPOLIS_PUBLIC_PATH", "static");

        let site = SiteConfig {
            public_host: setting(
                &lookup,
                "EXPOLIS_PUBLIC_HOST",
                &format!("{}:{}", bind_address, port),
            ),
            dataset_dir: PathBuf::from(setting(&lookup, "EXPOLIS_DATASET_DIR", "dataset")),
            dataset_url_prefix: setting(&lookup, "EXPOLIS_DATASET_URL_PREFIX", "/dataset"),
        };

        let smtp = match lookup("EXPOLIS_SMTP_HOST") {
            Some(host) if !host.is_empty() => {
                log::info!("Using SMTP relay from EXPOLIS_SMTP_HOST: {}", host);
                let port = match lookup("EXPOLIS_SMTP_PORT") {
                    Some(value) => parse_port("EXPOLIS_SMTP_PORT", &value)?,
                    None => 587,
                };
                let from = lookup("EXPOLIS_SMTP_FROM")
                    .filter(|from| !from.is_empty())
                    .ok_or(ConfigError::IncompleteSmtp("EXPOLIS_SMTP_FROM"))?;
                Some(SmtpSettings {
                    host,
                    port,
                    username: lookup("EXPOLIS_SMTP_USERNAME"),
                    password: lookup("EXPOLIS_SMTP_PASSWORD"),
                    from,
                })
            }
            _ => {
                log::info!("EXPOLIS_SMTP_HOST not set, periodic notifications disabled");
                None
            }
        };

        Ok(AppConfig {
            database_url,
            bind_address,
            port,
            public_path,
            site,
            smtp,
        })
    }
}

fn setting<F>(lookup: &F, name: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) => {
            log::info!("Using {} from environment: {}", name, value);
            value
        }
        None => {
            log::info!("Using default {}: {}", name, default);
            default.to_string()
        }
    }
}

fn parse_port(name: &'static str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidPort {
        name,
        value: value.to_string(),
    })
}
