//!
//! src/config.rs  Andrew Belles  Oct 12th, 2026
//!
//! Reads the environment (and an optional .env) into typed configuration
//! for the spotify client, the play store, the scheduler and the logger
//!

use std::{fmt, path::PathBuf, time};
use url::Url;
use crate::errors::EtlError;

/// Constants for HTTP Config
pub const HTTP_TIMEOUT: u64 = 8000;
pub const HTTP_CONNECT_TIMEOUT: u64 = 2000;
pub const HTTP_POOL_MAX_IDLE: usize = 16;
pub const HTTP_POOL_IDLE_TIMEOUT: u64 = 90000;
pub const HTTP_MAX_REDIRECTS: u8 = 4;

/// Constants for the job itself
pub const DEFAULT_DATABASE_LOCATION: &str = "sqlite:my_played_tracks.sqlite";
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const DEFAULT_API_BASE: &str = "https://api.spotify.com/v1/";
pub const LOOKBACK_DAYS: i64 = 60;
pub const VALIDATION_WINDOW_DAYS: i64 = 60;
pub const SCHEDULE_INTERVAL_SECS: u64 = 86_400;
pub const RETRY_DELAY_SECS: u64 = 60;
pub const MAX_WINDOW_DAYS: i64 = 36_500;

/// Where configuration values come from. `std::env` in production,
/// a map in tests
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Returns the value of s or a config error naming the missing key
fn env_check(env: Lookup, s: &str) -> Result<String, EtlError> {
    match env(s) {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(EtlError::Config(format!("{s} was not set"))),
    }
}

fn env_or(env: Lookup, s: &str, default: &str) -> String {
    env(s)
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_to_int<T: std::str::FromStr + Copy>(env: Lookup, s: &str, default: T) -> T {
    match env(s) {
        Some(s) => s.trim().parse::<T>().unwrap_or(default),
        None => default
    }
}

/// Ensures that url is https
fn ensure_https(url: &Url) -> Result<(), String> {
    if url.scheme() == "https" {
        Ok(())
    } else {
        Err(format!("URL must be https: {url}"))
    }
}

fn ensure_host(url: &Url, expected_host: &str) -> Result<(), String> {
    match url.host_str() {
        Some(h) if h.eq_ignore_ascii_case(expected_host) => Ok(()),
        Some(h) => Err(
            format!("Unexpected host for {url} (got {h}, expected {expected_host})")
        ),
        None => Err(format!("URL missing host: {url}"))
    }
}

fn ensure_trailing_slash(url: &mut Url) {
    if !url.path().ends_with('/') {
        let mut path = url.path().to_string();
        path.push('/');
        url.set_path(&path);
    }
}

///
/// Credentials exchanged at the token endpoint. Never printed
///
#[derive(Clone)]
pub struct SpotifyCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl fmt::Debug for SpotifyCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpotifyCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Configuration that Spotify expects when hitting endpoints
#[derive(Clone)]
pub struct SpotifyConfig {
    pub user_id: String,
    pub access_token: String,
    pub credentials: SpotifyCredentials,
    pub token_url: Url,
    pub api_base: Url,
}

impl fmt::Debug for SpotifyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpotifyConfig")
            .field("user_id", &self.user_id)
            .field("access_token", &"<redacted>")
            .field("credentials", &self.credentials)
            .field("token_url", &self.token_url.as_str())
            .field("api_base", &self.api_base.as_str())
            .finish()
    }
}

fn build_spotify(env: Lookup) -> Result<SpotifyConfig, EtlError> {
    let user_id       = env_check(env, "SPOTIFY_USER_ID")?;
    let access_token  = env_check(env, "SPOTIFY_TOKEN")?;
    let refresh_token = env_check(env, "SPOTIFY_REFRESH_TOKEN")?;
    let client_id     = env_check(env, "SPOTIFY_CLIENT_ID")?;
    let client_secret = env_check(env, "SPOTIFY_CLIENT_SECRET")?;

    // form urls
    let token_url = env_or(env, "SPOTIFY_TOKEN_URL", DEFAULT_TOKEN_URL);
    let api_base  = env_or(env, "SPOTIFY_API_BASE", DEFAULT_API_BASE);

    let token_url = Url::parse(&token_url)
        .map_err(|e| EtlError::Config(format!("SPOTIFY_TOKEN_URL invalid {e}")))?;
    let mut api_base = Url::parse(&api_base)
        .map_err(|e| EtlError::Config(format!("SPOTIFY_API_BASE invalid {e}")))?;

    // ensure valid https and hostname for both urls
    ensure_https(&token_url).map_err(EtlError::Config)?;
    ensure_https(&api_base).map_err(EtlError::Config)?;
    ensure_host(&token_url, "accounts.spotify.com").map_err(EtlError::Config)?;
    ensure_host(&api_base, "api.spotify.com").map_err(EtlError::Config)?;
    ensure_trailing_slash(&mut api_base);

    Ok( SpotifyConfig {
        user_id,
        access_token,
        credentials: SpotifyCredentials { client_id, client_secret, refresh_token },
        token_url,
        api_base
    })
}

///
/// Configuration for Http timeouts, pooling, etc.
///
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: time::Duration,
    pub connect_timeout: time::Duration,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout: time::Duration,
    pub max_redirects: u8,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: time::Duration::from_millis(HTTP_TIMEOUT),
            connect_timeout: time::Duration::from_millis(HTTP_CONNECT_TIMEOUT),
            pool_max_idle_per_host: HTTP_POOL_MAX_IDLE,
            pool_idle_timeout: time::Duration::from_millis(HTTP_POOL_IDLE_TIMEOUT),
            max_redirects: HTTP_MAX_REDIRECTS,
        }
    }
}

///
/// Configuration for the sqlite play store
///
#[derive(Debug, Clone)]
pub struct PersistenceConfig {
    pub database_location: String,   // as given in DATABASE_LOCATION
    pub database_url: String,        // normalized for sqlx
}

impl PersistenceConfig {
    /// Accepts sqlx urls (sqlite:path, sqlite://path, sqlite::memory:) as well
    /// as the sqlalchemy form sqlite:///path
    pub fn from_location(location: &str) -> Self {
        let location = location.trim();
        let database_url = match location.strip_prefix("sqlite:///") {
            Some(rest) => format!("sqlite:{rest}"),
            None if location.starts_with("sqlite:") => location.to_string(),
            None => format!("sqlite:{location}")
        };
        Self { database_location: location.to_string(), database_url }
    }

    pub fn is_memory(&self) -> bool {
        self.database_url.starts_with("sqlite::memory:")
    }

    /// File backing the database, None for in-memory stores
    pub fn database_file(&self) -> Option<PathBuf> {
        if self.is_memory() {
            return None;
        }
        let rest = self.database_url.trim_start_matches("sqlite:");
        let rest = rest.strip_prefix("//").unwrap_or(rest);
        let path = rest.split('?').next().unwrap_or(rest);
        Some(PathBuf::from(path))
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self::from_location(DEFAULT_DATABASE_LOCATION)
    }
}

///
/// Windows used by a single run
///
#[derive(Debug, Clone, Copy)]
pub struct JobConfig {
    pub lookback_days: i64,            // fetch boundary
    pub validation_window_days: i64,   // accepted date window
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            lookback_days: LOOKBACK_DAYS,
            validation_window_days: VALIDATION_WINDOW_DAYS
        }
    }
}

///
/// Configuration of the scheduler wrapper
///
#[derive(Debug, Clone, Copy)]
pub struct ScheduleConfig {
    pub interval: time::Duration,
    pub retry_delay: time::Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval: time::Duration::from_secs(SCHEDULE_INTERVAL_SECS),
            retry_delay: time::Duration::from_secs(RETRY_DELAY_SECS)
        }
    }
}

///
/// Configuration for Logger
///

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub filter_directives: String,
    pub format: LogFormat,
    pub include_file_line: bool,
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter_directives: "info,play_etl=debug,reqwest=warn,sqlx=warn".to_string(),
            format: LogFormat::Json,
            include_file_line: true,
            include_target: true,
        }
    }
}

/// Day counts feed date arithmetic; keep them within a century
fn ensure_window_days(key: &str, days: i64) -> Result<i64, EtlError> {
    if (1..=MAX_WINDOW_DAYS).contains(&days) {
        Ok(days)
    } else {
        Err(EtlError::Config(format!("{key} must be within 1..={MAX_WINDOW_DAYS}, got {days}")))
    }
}

fn build_persistence(env: Lookup) -> PersistenceConfig {
    PersistenceConfig::from_location(
        &env_or(env, "DATABASE_LOCATION", DEFAULT_DATABASE_LOCATION)
    )
}

fn build_logging(env: Lookup) -> LoggingConfig {
    let format = match env("LOG_FORMAT").as_deref().map(str::trim) {
        Some(f) if f.eq_ignore_ascii_case("pretty") => LogFormat::Pretty,
        _ => LogFormat::Json
    };
    LoggingConfig { format, ..LoggingConfig::default() }
}

///
/// AppConfig which holds everything the job, scheduler and logger need
///
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub spotify: SpotifyConfig,
    pub http: HttpConfig,
    pub persistence: PersistenceConfig,
    pub job: JobConfig,
    pub schedule: ScheduleConfig,
    pub logging: LoggingConfig
}

impl AppConfig {
    pub fn from_lookup(env: Lookup) -> Result<Self, EtlError> {
        let spotify     = build_spotify(env)?;
        let http        = HttpConfig::default();
        let persistence = build_persistence(env);
        let job = JobConfig {
            lookback_days: ensure_window_days(
                "ETL_LOOKBACK_DAYS",
                env_to_int(env, "ETL_LOOKBACK_DAYS", LOOKBACK_DAYS)
            )?,
            validation_window_days: ensure_window_days(
                "ETL_VALIDATION_WINDOW_DAYS",
                env_to_int(env, "ETL_VALIDATION_WINDOW_DAYS", VALIDATION_WINDOW_DAYS)
            )?,
        };
        let schedule = ScheduleConfig {
            interval: time::Duration::from_secs(
                env_to_int(env, "ETL_SCHEDULE_INTERVAL_SECS", SCHEDULE_INTERVAL_SECS)
            ),
            retry_delay: time::Duration::from_secs(
                env_to_int(env, "ETL_RETRY_DELAY_SECS", RETRY_DELAY_SECS)
            ),
        };
        let logging = build_logging(env);

        if schedule.interval.is_zero() {
            return Err(EtlError::Config("ETL_SCHEDULE_INTERVAL_SECS must be > 0".into()));
        }

        Ok( AppConfig { spotify, http, persistence, job, schedule, logging } )
    }
}

///
/// Return all environment variables to caller at program start.
///
pub fn load_config() -> Result<AppConfig, EtlError> {
    dotenvy::dotenv().ok();
    AppConfig::from_lookup(&|key| std::env::var(key).ok())
}

///
/// What the read-only report needs: the store and the logger, no credentials
///
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub persistence: PersistenceConfig,
    pub logging: LoggingConfig
}

impl ReportConfig {
    pub fn from_lookup(env: Lookup) -> Self {
        Self { persistence: build_persistence(env), logging: build_logging(env) }
    }
}

pub fn load_report_config() -> ReportConfig {
    dotenvy::dotenv().ok();
    ReportConfig::from_lookup(&|key| std::env::var(key).ok())
}

#[cfg(test)]
pub(crate) fn test_spotify_config() -> SpotifyConfig {
    SpotifyConfig {
        user_id: "user".into(),
        access_token: "stale-token".into(),
        credentials: SpotifyCredentials {
            client_id: "client".into(),
            client_secret: "secret".into(),
            refresh_token: "refresh".into(),
        },
        token_url: Url::parse(DEFAULT_TOKEN_URL).expect("static url"),
        api_base: Url::parse(DEFAULT_API_BASE).expect("static url"),
    }
}
