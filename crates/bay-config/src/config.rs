use bay_types::{BayError, Result};

/// What an allocator should do when the Ship pool is at `max_ship_num` and no
/// existing Ship has a free slot to reuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BehaviorAfterMax {
    Reject,
    Wait,
}

impl std::str::FromStr for BehaviorAfterMax {
    type Err = BayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "reject" => Ok(BehaviorAfterMax::Reject),
            "wait" => Ok(BehaviorAfterMax::Wait),
            other => Err(BayError::Config(format!(
                "invalid BEHAVIOR_AFTER_MAX_SHIP value: {other} (expected \"reject\" or \"wait\")"
            ))),
        }
    }
}

/// Application configuration, loaded once from the environment at startup.
///
/// Unlike the teacher crate this type carries no global singleton: callers
/// construct it explicitly with [`Config::from_env`] and pass it down through
/// the component graph.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub debug: bool,

    pub max_ship_num: u32,
    pub behavior_after_max_ship: BehaviorAfterMax,

    pub access_token: String,

    pub database_url: String,

    pub docker_image: String,
    pub docker_network: String,

    pub default_ship_ttl: i64,
    pub default_ship_cpus: f64,
    pub default_ship_memory: String,

    pub ship_health_check_timeout: u64,
    pub ship_health_check_interval: u64,

    pub max_upload_size: usize,

    pub log_level: String,
    pub log_format: String,
}

impl Config {
    /// Load configuration from environment variables, falling back to a
    /// `.env` file in the current directory if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let behavior_after_max_ship: BehaviorAfterMax =
            env_or("BEHAVIOR_AFTER_MAX_SHIP", || "wait".to_string()).parse()?;

        let config = Config {
            host: env_or("HOST", || "0.0.0.0".to_string()),
            port: env_u16("PORT", 8080)?,
            debug: env_bool("DEBUG", false),

            max_ship_num: env_u32("MAX_SHIP_NUM", 10)?,
            behavior_after_max_ship,

            access_token: env_or("ACCESS_TOKEN", || "secret-token".to_string()),

            database_url: env_or("DATABASE_URL", || "sqlite://bay.db".to_string()),

            docker_image: env_or("DOCKER_IMAGE", || "ship:latest".to_string()),
            docker_network: env_or("DOCKER_NETWORK", || "shipyard".to_string()),

            default_ship_ttl: env_i64("DEFAULT_SHIP_TTL", 3600)?,
            default_ship_cpus: env_f64("DEFAULT_SHIP_CPUS", 1.0)?,
            default_ship_memory: env_or("DEFAULT_SHIP_MEMORY", || "512m".to_string()),

            ship_health_check_timeout: env_u64("SHIP_HEALTH_CHECK_TIMEOUT", 60)?,
            ship_health_check_interval: env_u64("SHIP_HEALTH_CHECK_INTERVAL", 5)?,

            max_upload_size: env_usize("MAX_UPLOAD_SIZE", 10 * 1024 * 1024)?,

            log_level: env_or("LOG_LEVEL", || "info".to_string()),
            log_format: env_or("LOG_FORMAT", || "human".to_string()),
        };

        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Env helpers
// ---------------------------------------------------------------------------

fn env_or(key: &str, default: impl FnOnce() -> String) -> String {
    std::env::var(key).unwrap_or_else(|_| default())
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}

fn env_u16(key: &str, default: u16) -> Result<u16> {
    parse_env(key, default)
}

fn env_u32(key: &str, default: u32) -> Result<u32> {
    parse_env(key, default)
}

fn env_u64(key: &str, default: u64) -> Result<u64> {
    parse_env(key, default)
}

fn env_i64(key: &str, default: i64) -> Result<i64> {
    parse_env(key, default)
}

fn env_f64(key: &str, default: f64) -> Result<f64> {
    parse_env(key, default)
}

fn env_usize(key: &str, default: usize) -> Result<usize> {
    parse_env(key, default)
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(v) => v
            .parse()
            .map_err(|_| BayError::Config(format!("invalid value for {key}: {v}"))),
        Err(_) => Ok(default),
    }
}
