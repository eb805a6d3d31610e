//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    net::SocketAddr,
    num::{NonZeroU32, NonZeroU64},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::{Args, Parser, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "pero";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_PAGE_SIZE: u64 = 10;
const DEFAULT_MEDIA_DIR: &str = "media";
const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;
const DEFAULT_SESSION_TTL_HOURS: u64 = 14 * 24;

/// Command-line arguments for the Pero binary.
#[derive(Debug, Parser)]
#[command(name = "pero", version, about = "Pero blog server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "PERO_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: CliOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct CliOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Override the number of posts per feed page.
    #[arg(long = "feed-page-size", value_name = "COUNT")]
    pub feed_page_size: Option<u64>,

    /// Override the media directory.
    #[arg(long = "media-directory", value_name = "PATH")]
    pub media_directory: Option<PathBuf>,

    /// Override the maximum upload size in bytes.
    #[arg(long = "media-max-upload-bytes", value_name = "BYTES")]
    pub media_max_upload_bytes: Option<u64>,

    /// Override the session lifetime in hours.
    #[arg(long = "sessions-ttl-hours", value_name = "HOURS")]
    pub sessions_ttl_hours: Option<u64>,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub feed: FeedSettings,
    pub media: MediaSettings,
    pub sessions: SessionSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct FeedSettings {
    pub page_size: NonZeroU64,
}

#[derive(Debug, Clone)]
pub struct MediaSettings {
    pub directory: PathBuf,
    pub max_upload_bytes: NonZeroU64,
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub ttl: Duration,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("PERO").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(&cli.overrides);

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    feed: RawFeedSettings,
    media: RawMediaSettings,
    sessions: RawSessionSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &CliOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(count) = overrides.database_max_connections {
            self.database.max_connections = Some(count);
        }
        if let Some(count) = overrides.feed_page_size {
            self.feed.page_size = Some(count);
        }
        if let Some(path) = overrides.media_directory.as_ref() {
            self.media.directory = Some(path.clone());
        }
        if let Some(bytes) = overrides.media_max_upload_bytes {
            self.media.max_upload_bytes = Some(bytes);
        }
        if let Some(hours) = overrides.sessions_ttl_hours {
            self.sessions.ttl_hours = Some(hours);
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawFeedSettings {
    page_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawMediaSettings {
    directory: Option<PathBuf>,
    max_upload_bytes: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSessionSettings {
    ttl_hours: Option<u64>,
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            database,
            feed,
            media,
            sessions,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let database = build_database_settings(database)?;
        let feed = build_feed_settings(feed)?;
        let media = build_media_settings(media)?;
        let sessions = build_session_settings(sessions)?;

        Ok(Self {
            server,
            logging,
            database,
            feed,
            media,
            sessions,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr =
        parse_socket_addr(&host, port).map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }
    let graceful_shutdown = Duration::from_secs(graceful_secs);

    Ok(ServerSettings {
        addr,
        graceful_shutdown,
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = database.url.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    let value = database
        .max_connections
        .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS);
    let max_connections = non_zero_u32(value.into(), "database.max_connections")?;

    Ok(DatabaseSettings {
        url,
        max_connections,
    })
}

fn build_feed_settings(feed: RawFeedSettings) -> Result<FeedSettings, LoadError> {
    let value = feed.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    let page_size =
        NonZeroU64::new(value).ok_or_else(|| {
            LoadError::invalid("feed.page_size", "must be greater than zero")
        })?;

    Ok(FeedSettings { page_size })
}

fn build_media_settings(media: RawMediaSettings) -> Result<MediaSettings, LoadError> {
    let directory = media
        .directory
        .unwrap_or_else(|| PathBuf::from(DEFAULT_MEDIA_DIR));

    let value = media.max_upload_bytes.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);
    let max_upload_bytes = NonZeroU64::new(value).ok_or_else(|| {
        LoadError::invalid("media.max_upload_bytes", "must be greater than zero")
    })?;

    Ok(MediaSettings {
        directory,
        max_upload_bytes,
    })
}

fn build_session_settings(sessions: RawSessionSettings) -> Result<SessionSettings, LoadError> {
    let hours = sessions.ttl_hours.unwrap_or(DEFAULT_SESSION_TTL_HOURS);
    if hours == 0 {
        return Err(LoadError::invalid(
            "sessions.ttl_hours",
            "must be greater than zero",
        ));
    }

    Ok(SessionSettings {
        ttl: Duration::from_secs(hours * 60 * 60),
    })
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve_without_any_input() {
        let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

        assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
        assert_eq!(settings.feed.page_size.get(), DEFAULT_PAGE_SIZE);
        assert_eq!(settings.media.directory, PathBuf::from(DEFAULT_MEDIA_DIR));
        assert_eq!(
            settings.sessions.ttl,
            Duration::from_secs(DEFAULT_SESSION_TTL_HOURS * 60 * 60)
        );
    }

    #[test]
    fn cli_overrides_take_highest_precedence() {
        let mut raw = RawSettings::default();
        raw.server.port = Some(4000);
        raw.logging.level = Some("info".to_string());

        let overrides = CliOverrides {
            server_port: Some(4321),
            log_level: Some("debug".to_string()),
            ..Default::default()
        };

        raw.apply_overrides(&overrides);
        let settings = Settings::from_raw(raw).expect("valid settings");

        assert_eq!(settings.server.addr.port(), 4321);
        assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let mut raw = RawSettings::default();
        raw.feed.page_size = Some(0);

        let err = Settings::from_raw(raw).expect_err("zero page size must fail");
        assert!(matches!(
            err,
            LoadError::Invalid {
                key: "feed.page_size",
                ..
            }
        ));
    }

    #[test]
    fn blank_database_url_is_treated_as_missing() {
        let mut raw = RawSettings::default();
        raw.database.url = Some("   ".to_string());

        let settings = Settings::from_raw(raw).expect("valid settings");
        assert!(settings.database.url.is_none());
    }

    #[test]
    fn invalid_host_is_reported_with_its_key() {
        let mut raw = RawSettings::default();
        raw.server.host = Some("not a host".to_string());

        let err = Settings::from_raw(raw).expect_err("invalid host must fail");
        assert!(matches!(
            err,
            LoadError::Invalid {
                key: "server.addr",
                ..
            }
        ));
    }
}
