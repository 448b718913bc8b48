use serde::Deserialize;

const DATABASE_SCHEMES: [&str; 2] = ["redis://", "rediss://"];

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub repair: RepairConfig,
    pub query: QueryConfig,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RepairConfig {
    pub interval_secs: u64, // 0 disables the background pass
}

#[derive(Debug, Deserialize, Clone)]
pub struct QueryConfig {
    pub default_task_limit: usize,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("repair.interval_secs", 0)?
            .set_default("query.default_task_limit", 100)?
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(environment())
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option("server.port", std::env::var("PORT").ok())?
            .set_override_option("token", std::env::var("TOKEN").ok())?
            .build()?;

        let mut config: Config = config.try_deserialize()?;
        config.database.url = normalize_database_url(&config.database.url)?;
        Ok(config)
    }

    /// Configuration for in-process use (tests, embedding) that never touches
    /// the environment.
    pub fn local(database_url: &str) -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".into(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: database_url.to_string(),
            },
            repair: RepairConfig { interval_secs: 0 },
            query: QueryConfig {
                default_task_limit: 100,
            },
            token: None,
        }
    }
}

// `APP_SERVER__PORT` sets `server.port`.
fn environment() -> config::Environment {
    config::Environment::with_prefix("APP")
        .prefix_separator("_")
        .separator("__")
}

/// Trims the connection string, drops one pair of wrapping quotes and checks
/// the scheme.
pub fn normalize_database_url(raw: &str) -> Result<String, config::ConfigError> {
    let mut url = raw.trim();
    if url.len() >= 2
        && ((url.starts_with('"') && url.ends_with('"'))
            || (url.starts_with('\'') && url.ends_with('\'')))
    {
        url = &url[1..url.len() - 1];
    }

    if url.is_empty() {
        return Err(config::ConfigError::Message(
            "database.url is not set or is empty".into(),
        ));
    }

    if !DATABASE_SCHEMES.iter().any(|scheme| url.starts_with(scheme)) {
        let head: String = url.chars().take(20).collect();
        return Err(config::ConfigError::Message(format!(
            "database.url must start with redis:// or rediss:// (current value starts with: {})",
            head
        )));
    }

    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_uses_single_underscore_after_prefix() {
        let vars: std::collections::HashMap<String, String> = [
            ("APP_SERVER__PORT", "8080"),
            ("APP_DATABASE__URL", "redis://cache:6379"),
            ("APP__SERVER__HOST", "ignored"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let settings = config::Config::builder()
            .add_source(environment().source(Some(vars)))
            .build()
            .unwrap();

        assert_eq!(settings.get_int("server.port").unwrap(), 8080);
        assert_eq!(settings.get_string("database.url").unwrap(), "redis://cache:6379");
        assert!(settings.get_string("server.host").is_err());
    }

    #[test]
    fn accepts_both_schemes() {
        assert_eq!(
            normalize_database_url("redis://localhost:6379").unwrap(),
            "redis://localhost:6379"
        );
        assert_eq!(
            normalize_database_url("rediss://cache.internal:6380/2").unwrap(),
            "rediss://cache.internal:6380/2"
        );
    }

    #[test]
    fn strips_whitespace_and_quotes() {
        assert_eq!(
            normalize_database_url("  \"redis://localhost\"  ").unwrap(),
            "redis://localhost"
        );
        assert_eq!(
            normalize_database_url("'redis://localhost'").unwrap(),
            "redis://localhost"
        );
    }

    #[test]
    fn rejects_unknown_scheme_and_empty() {
        assert!(normalize_database_url("mongodb://localhost").is_err());
        assert!(normalize_database_url("http://localhost").is_err());
        assert!(normalize_database_url("   ").is_err());
        assert!(normalize_database_url("\"\"").is_err());
    }
}
