use clap::{Parser, ValueEnum, builder::BoolishValueParser};
use nycdata_core::source::DEFAULT_BASE_URL;
use nycdata_core::{ReliabilityConfig, SocrataConfig};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_MCP_HTTP_ADDR: &str = "127.0.0.1:4030";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CACHE_CAPACITY: usize = 500;

/// Log output style on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "nycdata-mcpd", version, about = "NYC Open Data MCP daemon.")]
struct CliArgs {
    #[arg(long, env = "NYCDATA_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    #[arg(long, env = "NYC_OPEN_DATA_APP_TOKEN", hide_env_values = true)]
    app_token: Option<String>,

    #[arg(
        long,
        env = "NYCDATA_REQUEST_TIMEOUT_SECS",
        default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS
    )]
    request_timeout_secs: u64,

    #[arg(
        long,
        env = "NYCDATA_CACHE_CAPACITY",
        default_value_t = DEFAULT_CACHE_CAPACITY
    )]
    cache_capacity: usize,

    #[arg(
        long = "stdio",
        env = "NYCDATA_STDIO",
        default_value_t = false,
        value_parser = BoolishValueParser::new()
    )]
    enable_stdio: bool,

    #[arg(long, env = "NYCDATA_MCP_HTTP_ADDR", default_value = DEFAULT_MCP_HTTP_ADDR)]
    mcp_http_addr: SocketAddr,

    #[arg(long, env = "NYCDATA_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

/// Runtime configuration loaded from CLI arguments and environment variables.
#[derive(Debug, Clone)]
pub struct NycDataConfig {
    pub socrata: SocrataConfig,
    pub reliability: ReliabilityConfig,
    pub enable_stdio: bool,
    pub mcp_http_addr: SocketAddr,
    pub log_format: LogFormat,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {name} value: {value}")]
    InvalidSetting { name: &'static str, value: String },
}

impl NycDataConfig {
    pub fn from_args() -> Result<Self, ConfigError> {
        let args = CliArgs::parse();
        Self::try_from(args)
    }
}

impl TryFrom<CliArgs> for NycDataConfig {
    type Error = ConfigError;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let base_url = args.base_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("https://") || base_url.starts_with("http://")) {
            return Err(ConfigError::InvalidSetting {
                name: "NYCDATA_BASE_URL",
                value: args.base_url,
            });
        }
        if args.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "NYCDATA_REQUEST_TIMEOUT_SECS",
                value: args.request_timeout_secs.to_string(),
            });
        }
        if args.cache_capacity == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "NYCDATA_CACHE_CAPACITY",
                value: args.cache_capacity.to_string(),
            });
        }

        let app_token = args.app_token.filter(|value| !value.trim().is_empty());

        Ok(Self {
            socrata: SocrataConfig {
                base_url,
                app_token,
                timeout: Duration::from_secs(args.request_timeout_secs),
            },
            reliability: ReliabilityConfig::default().with_cache_capacity(args.cache_capacity),
            enable_stdio: args.enable_stdio,
            mcp_http_addr: args.mcp_http_addr,
            log_format: args.log_format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> CliArgs {
        CliArgs {
            base_url: DEFAULT_BASE_URL.to_string(),
            app_token: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            enable_stdio: false,
            mcp_http_addr: DEFAULT_MCP_HTTP_ADDR.parse().expect("valid MCP addr"),
            log_format: LogFormat::Text,
        }
    }

    #[test]
    fn defaults_build_a_usable_config() {
        let config = NycDataConfig::try_from(base_args()).expect("config should parse");

        assert_eq!(config.socrata.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.socrata.timeout, Duration::from_secs(30));
        assert_eq!(config.reliability.cache_capacity, 500);
        assert_eq!(config.mcp_http_addr.port(), 4030);
        assert!(!config.enable_stdio);
    }

    #[test]
    fn blank_app_token_is_dropped() {
        let mut args = base_args();
        args.app_token = Some("   ".to_string());

        let config = NycDataConfig::try_from(args).expect("config should parse");

        assert!(config.socrata.app_token.is_none());
    }

    #[test]
    fn trailing_slash_is_trimmed_from_base_url() {
        let mut args = base_args();
        args.base_url = "https://example.test/resource/".to_string();

        let config = NycDataConfig::try_from(args).expect("config should parse");

        assert_eq!(config.socrata.base_url, "https://example.test/resource");
    }

    #[test]
    fn rejects_zero_timeout_and_bad_scheme() {
        let mut args = base_args();
        args.request_timeout_secs = 0;
        assert!(matches!(
            NycDataConfig::try_from(args),
            Err(ConfigError::InvalidSetting { name: "NYCDATA_REQUEST_TIMEOUT_SECS", .. })
        ));

        let mut args = base_args();
        args.base_url = "data.cityofnewyork.us".to_string();
        assert!(matches!(
            NycDataConfig::try_from(args),
            Err(ConfigError::InvalidSetting { name: "NYCDATA_BASE_URL", .. })
        ));
    }
}
