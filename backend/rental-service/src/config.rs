/// Configuration management for Rental Service
///
/// Loads configuration from environment variables.
use anyhow::{bail, Context, Result};
use resilience::RetryConfig;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_CATEGORIES: &[&str] = &["FANTASY", "SCIENCE-FICTION", "NON-FICTION"];

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub store: StoreConfig,
    pub kafka: KafkaConfig,
    pub dead_letter: DeadLetterConfig,
    pub pipeline: PipelineConfig,
}

/// HTTP server settings
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub http_port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => bail!("unknown store backend '{}'", other),
        }
    }
}

/// Store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Required for the Postgres backend
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Kafka consumer settings
#[derive(Debug, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
    pub group_id: String,
    pub rented_topic: String,
    pub returned_topic: String,
    /// Max records handed to the pipeline at once
    pub batch_size: usize,
    /// Max time spent filling a batch before it is processed
    pub batch_timeout: Duration,
}

/// Dead-letter topic settings
#[derive(Debug, Clone)]
pub struct DeadLetterConfig {
    pub topic: String,
    pub timeout: Duration,
}

/// Filter and error policy settings
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub accepted_categories: Vec<String>,
    pub max_retries: u32,
    pub retry_backoff: Duration,
}

impl PipelineConfig {
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::fixed(self.max_retries, self.retry_backoff)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            accepted_categories: DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect(),
            max_retries: 1,
            retry_backoff: Duration::from_millis(1000),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let app = AppConfig {
            host: get("APP_HOST", "0.0.0.0"),
            http_port: parse(&lookup, "PORT", 8080)?,
        };

        let backend: StoreBackend = get("STORE_BACKEND", "postgres")
            .parse()
            .context("Invalid STORE_BACKEND")?;
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        if backend == StoreBackend::Postgres && database_url.is_none() {
            bail!("DATABASE_URL environment variable not set");
        }

        let store = StoreConfig {
            backend,
            database_url,
            max_connections: parse(&lookup, "DB_MAX_CONNECTIONS", 10)?,
            min_connections: parse(&lookup, "DB_MIN_CONNECTIONS", 1)?,
        };

        let kafka = KafkaConfig {
            brokers: get("KAFKA_BROKERS", "localhost:9092"),
            group_id: get("KAFKA_GROUP_ID", "book-rented-group"),
            rented_topic: get("KAFKA_RENTED_TOPIC", "rented-books"),
            returned_topic: get("KAFKA_RETURNED_TOPIC", "returned-books"),
            batch_size: parse(&lookup, "KAFKA_BATCH_SIZE", 100)?,
            batch_timeout: Duration::from_millis(parse(&lookup, "KAFKA_BATCH_TIMEOUT_MS", 500)?),
        };
        if kafka.batch_size == 0 {
            bail!("KAFKA_BATCH_SIZE must be greater than zero");
        }

        let dead_letter = DeadLetterConfig {
            topic: get("DLT_TOPIC", "rented-books-dlt"),
            timeout: Duration::from_millis(parse(&lookup, "DLT_TIMEOUT_MS", 5000)?),
        };

        let accepted_categories = match lookup("ACCEPTED_CATEGORIES") {
            Some(raw) => parse_categories(&raw),
            None => PipelineConfig::default().accepted_categories,
        };

        let pipeline = PipelineConfig {
            accepted_categories,
            max_retries: parse(&lookup, "BATCH_MAX_RETRIES", 1)?,
            retry_backoff: Duration::from_millis(parse(&lookup, "BATCH_RETRY_BACKOFF_MS", 1000)?),
        };

        Ok(Config {
            app,
            store,
            kafka,
            dead_letter,
            pipeline,
        })
    }
}

fn parse<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: '{}'", key, raw)),
        None => Ok(default),
    }
}

fn parse_categories(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}
