use std::str::FromStr;

use anyhow::{anyhow, Context};
use serde::Deserialize;

/// Ten years; longer lifetimes are treated as a misconfiguration.
pub const MAX_TOKEN_HOURS: i64 = 24 * 365 * 10;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub name: String,
    pub env: String,
    pub host: String,
    pub port: u16,
    pub debug: bool,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Full connection string; takes precedence over the individual parts.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub ssl_mode: String,
    pub timezone: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub password: String,
    pub db: i64,
}

impl RedisConfig {
    pub fn url(&self) -> String {
        if self.password.is_empty() {
            format!("redis://{}:{}/{}", self.host, self.port, self.db)
        } else {
            format!(
                "redis://:{}@{}:{}/{}",
                self.password, self.host, self.port, self.db
            )
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub expire_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
    pub from_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    pub filter: String,
    pub json: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: Option<RedisConfig>,
    pub jwt: JwtConfig,
    pub smtp: Option<SmtpConfig>,
    pub log: LogConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let name = or("APP_NAME", "user-api");
        let debug = parse_or(&get, "APP_DEBUG", false)?;
        let app = ServerConfig {
            name: name.clone(),
            env: or("APP_ENV", "development"),
            host: or("APP_HOST", "0.0.0.0"),
            port: parse_or(&get, "APP_PORT", 8080)?,
            debug,
            request_timeout_secs: parse_or(&get, "REQUEST_TIMEOUT_SECS", 30)?,
        };

        let database = DatabaseConfig {
            url: get("DATABASE_URL"),
            host: or("DB_HOST", "localhost"),
            port: parse_or(&get, "DB_PORT", 5432)?,
            user: or("DB_USER", "postgres"),
            password: or("DB_PASSWORD", ""),
            name: or("DB_NAME", "postgres"),
            ssl_mode: or("DB_SSLMODE", "disable"),
            timezone: or("DB_TIMEZONE", "UTC"),
            max_connections: parse_or(&get, "DB_MAX_CONNECTIONS", 10)?,
        };

        let redis = match get("REDIS_HOST") {
            Some(host) => Some(RedisConfig {
                host,
                port: parse_or(&get, "REDIS_PORT", 6379)?,
                password: or("REDIS_PASSWORD", ""),
                db: parse_or(&get, "REDIS_DB", 0)?,
            }),
            None => None,
        };

        let jwt = JwtConfig {
            secret: get("JWT_SECRET").ok_or_else(|| anyhow!("JWT_SECRET must be set"))?,
            issuer: or("JWT_ISSUER", "user-api"),
            audience: or("JWT_AUDIENCE", "user-api-clients"),
            expire_hours: parse_or(&get, "JWT_EXPIRE_HOURS", 24)?,
        };
        if !(1..=MAX_TOKEN_HOURS).contains(&jwt.expire_hours) {
            anyhow::bail!("JWT_EXPIRE_HOURS must be between 1 and {MAX_TOKEN_HOURS}");
        }

        let smtp = match get("SMTP_HOST") {
            Some(host) => Some(SmtpConfig {
                host,
                port: parse_or(&get, "SMTP_PORT", 587)?,
                username: or("SMTP_USERNAME", ""),
                password: or("SMTP_PASSWORD", ""),
                from: or("SMTP_FROM", "noreply@localhost"),
                from_name: or("SMTP_FROM_NAME", name.as_str()),
            }),
            None => None,
        };

        let default_filter = if debug {
            "user_api=debug,tower_http=debug,axum=info"
        } else {
            "user_api=info,tower_http=info,axum=info"
        };
        let log = LogConfig {
            filter: or("RUST_LOG", default_filter),
            json: get("LOG_FORMAT").map(|v| v == "json").unwrap_or(false),
        };

        Ok(Self {
            app,
            database,
            redis,
            jwt,
            smtp,
            log,
        })
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let cfg = AppConfig::from_lookup(lookup(&[("JWT_SECRET", "s3cret")])).unwrap();
        assert_eq!(cfg.app.port, 8080);
        assert_eq!(cfg.jwt.expire_hours, 24);
        assert_eq!(cfg.database.port, 5432);
        assert!(cfg.redis.is_none());
        assert!(cfg.smtp.is_none());
        assert!(!cfg.log.json);
        assert!(cfg.log.filter.starts_with("user_api=info"));
    }

    #[test]
    fn missing_secret_is_an_error() {
        let err = AppConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn invalid_number_is_an_error() {
        let err = AppConfig::from_lookup(lookup(&[("JWT_SECRET", "x"), ("APP_PORT", "eighty")]))
            .unwrap_err();
        assert!(err.to_string().contains("APP_PORT"));
    }

    #[test]
    fn token_lifetime_is_bounded() {
        for hours in ["0", "-5", "9223372036854775807"] {
            let err = AppConfig::from_lookup(lookup(&[("JWT_SECRET", "x"), ("JWT_EXPIRE_HOURS", hours)]))
                .unwrap_err();
            assert!(err.to_string().contains("JWT_EXPIRE_HOURS"), "{hours}: {err}");
        }
        let cfg = AppConfig::from_lookup(lookup(&[("JWT_SECRET", "x"), ("JWT_EXPIRE_HOURS", "87600")]))
            .unwrap();
        assert_eq!(cfg.jwt.expire_hours, MAX_TOKEN_HOURS);
    }

    #[test]
    fn redis_and_debug_sections() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("JWT_SECRET", "x"),
            ("APP_DEBUG", "true"),
            ("REDIS_HOST", "cache"),
            ("REDIS_PASSWORD", "pw"),
            ("REDIS_DB", "2"),
            ("LOG_FORMAT", "json"),
        ]))
        .unwrap();
        let redis = cfg.redis.expect("redis configured");
        assert_eq!(redis.url(), "redis://:pw@cache:6379/2");
        assert!(cfg.log.json);
        assert!(cfg.log.filter.contains("debug"));
    }
}
