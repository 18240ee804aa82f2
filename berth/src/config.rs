//! Service configuration
//!
//! Everything is read from the environment; a `.env` file is honored when
//! present. Unset variables fall back to defaults.

use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use crate::app::options::AppOptions;
use crate::errors::ServiceError;
use crate::logs::LogLevel;

/// Runtime settings
#[derive(Debug, Clone)]
pub struct Settings {
    /// Log level
    pub log_level: LogLevel,

    /// Application options
    pub options: AppOptions,
}

impl Settings {
    /// Read settings from the environment.
    pub fn from_env() -> Result<Self, ServiceError> {
        dotenvy::dotenv().ok();

        let log_level = match env::var("BERTH_LOG_LEVEL") {
            Ok(level) => level.parse().map_err(ServiceError::ConfigError)?,
            Err(_) => LogLevel::default(),
        };

        let mut options = AppOptions::default();

        options.server.host = var_or("BERTH_HOST", &options.server.host);
        options.server.port = parse_var("BERTH_PORT", options.server.port)?;
        options.server.max_upload_bytes =
            parse_var::<usize>("BERTH_MAX_UPLOAD_MB", 256)? * 1024 * 1024;

        options.engine.docker_socket = var_or("DOCKER_SOCKET", &options.engine.docker_socket);

        options.deploy.base_image = var_or("BERTH_BASE_IMAGE", &options.deploy.base_image);
        options.deploy.service_port = parse_var("BERTH_SERVICE_PORT", options.deploy.service_port)?;
        options.deploy.port_range_low =
            parse_var("BERTH_PORT_RANGE_LOW", options.deploy.port_range_low)?;
        options.deploy.port_range_high =
            parse_var("BERTH_PORT_RANGE_HIGH", options.deploy.port_range_high)?;
        options.deploy.ttl = Duration::from_secs(parse_var::<u64>("BERTH_TTL_MINUTES", 30)? * 60);
        options.deploy.build_timeout =
            Duration::from_secs(parse_var::<u64>("BERTH_BUILD_TIMEOUT_SECS", 300)?);
        options.deploy.launch_timeout =
            Duration::from_secs(parse_var::<u64>("BERTH_LAUNCH_TIMEOUT_SECS", 30)?);
        options.deploy.upload_dir = var_or("BERTH_UPLOAD_DIR", "uploads").into();

        if options.deploy.port_range_low > options.deploy.port_range_high {
            return Err(ServiceError::ConfigError(format!(
                "invalid port range: {}-{}",
                options.deploy.port_range_low, options.deploy.port_range_high
            )));
        }

        Ok(Self { log_level, options })
    }
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T>(name: &str, default: T) -> Result<T, ServiceError>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|e| ServiceError::ConfigError(format!("{}: {}", name, e))),
        Err(_) => Ok(default),
    }
}
