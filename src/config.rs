use aws_sdk_dynamodb::Client as DynamoDbClient;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use cement_plant::PipelineSettings;

/// Which store collaborator backs the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    DynamoDb { table: String },
}

/// Configuration for the plant service
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP/WebSocket listener binds to
    pub bind_addr: SocketAddr,
    pub store_backend: StoreBackend,
    pub pipeline: PipelineSettings,
    /// Per-subscriber outbound buffer; a full buffer drops the subscriber
    pub subscriber_buffer: usize,
}

impl Config {
    /// Create a new Config instance from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a Config from any variable source
    ///
    /// Unset variables take their defaults; set ones must parse.
    ///
    /// # Arguments
    /// * `lookup` - Returns the raw value of a variable, or `None` when unset
    ///
    /// # Returns
    /// * `Ok(Config)` - Every variable parsed and in range
    /// * `Err(ConfigError::MissingEnvVar)` - `PLANT_TABLE` unset while `STORE_BACKEND=dynamodb`
    /// * `Err(ConfigError::InvalidValue)` - A variable failed to parse or is out of range
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = parse_or(&lookup, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 8000)))?;

        let store_backend = match lookup("STORE_BACKEND").as_deref().unwrap_or("memory") {
            "memory" => StoreBackend::Memory,
            "dynamodb" => {
                let table = lookup("PLANT_TABLE")
                    .filter(|table| !table.is_empty())
                    .ok_or_else(|| ConfigError::MissingEnvVar("PLANT_TABLE".to_string()))?;
                StoreBackend::DynamoDb { table }
            }
            other => {
                return Err(ConfigError::InvalidValue {
                    name: "STORE_BACKEND".to_string(),
                    value: other.to_string(),
                })
            }
        };

        let defaults = PipelineSettings::default();
        let pipeline = PipelineSettings {
            realtime_interval: secs_or(&lookup, "REALTIME_INTERVAL_SECS", defaults.realtime_interval)?,
            optimization_interval: secs_or(
                &lookup,
                "OPTIMIZATION_INTERVAL_SECS",
                defaults.optimization_interval,
            )?,
            equipment_health_interval: secs_or(
                &lookup,
                "EQUIPMENT_HEALTH_INTERVAL_SECS",
                defaults.equipment_health_interval,
            )?,
            sample_data_interval: secs_or(&lookup, "SAMPLE_DATA_INTERVAL_SECS", defaults.sample_data_interval)?,
            target_tsr_pct: parse_or(&lookup, "TARGET_TSR_PCT", defaults.target_tsr_pct)?,
            model_confidence: parse_or(&lookup, "MODEL_CONFIDENCE", defaults.model_confidence)?,
            equipment_batch_limit: parse_or(&lookup, "EQUIPMENT_BATCH_LIMIT", defaults.equipment_batch_limit)?,
            initial_alerts_limit: defaults.initial_alerts_limit,
        };

        if !(0.0..=100.0).contains(&pipeline.target_tsr_pct) {
            return Err(ConfigError::InvalidValue {
                name: "TARGET_TSR_PCT".to_string(),
                value: pipeline.target_tsr_pct.to_string(),
            });
        }

        Ok(Config {
            bind_addr,
            store_backend,
            pipeline,
            subscriber_buffer: parse_or(&lookup, "SUBSCRIBER_BUFFER", 32)?,
        })
    }
}

/// Create the DynamoDB client from the ambient AWS configuration
///
/// # Returns
/// * `DynamoDbClient` - Client with a 10s operation and 5s attempt timeout
pub async fn dynamodb_client() -> DynamoDbClient {
    let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .load()
        .await;

    let dynamodb_config = aws_sdk_dynamodb::config::Builder::from(&aws_config)
        .timeout_config(
            aws_sdk_dynamodb::config::timeout::TimeoutConfig::builder()
                .operation_timeout(Duration::from_secs(10))
                .operation_attempt_timeout(Duration::from_secs(5))
                .build(),
        )
        .build();

    DynamoDbClient::from_conf(dynamodb_config)
}

/// Parse a variable, falling back to `default` when it is unset
///
/// # Arguments
/// * `lookup` - Variable source
/// * `name` - Variable name
/// * `default` - Value used when the variable is unset
///
/// # Returns
/// * `Ok(T)` - Parsed value or the default
/// * `Err(ConfigError::InvalidValue)` - Value is set but does not parse
fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            name: name.to_string(),
            value: raw,
        }),
    }
}

/// Whole seconds as a job interval; zero is rejected
fn secs_or<F>(lookup: &F, name: &str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let secs: u64 = parse_or(lookup, name, default.as_secs())?;
    if secs == 0 {
        return Err(ConfigError::InvalidValue {
            name: name.to_string(),
            value: "0".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue { name: String, value: String },
}
