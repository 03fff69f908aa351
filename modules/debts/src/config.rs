use std::env;
use std::time::Duration;

/// Application configuration parsed from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub member_concurrency: usize,
    pub scheduler_interval: Duration,
    pub run_catchup_on_startup: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL must be set".to_string())?;

        let host = env::var("HOST")
            .unwrap_or_else(|_| "0.0.0.0".to_string());

        let port: u16 = env::var("PORT")
            .unwrap_or_else(|_| "8094".to_string())
            .parse()
            .map_err(|_| "PORT must be a valid u16".to_string())?;

        let member_concurrency: usize = env::var("DEBTS_MEMBER_CONCURRENCY")
            .unwrap_or_else(|_| "4".to_string())
            .parse()
            .map_err(|_| "DEBTS_MEMBER_CONCURRENCY must be a positive integer".to_string())?;
        if member_concurrency == 0 {
            return Err("DEBTS_MEMBER_CONCURRENCY must be a positive integer".to_string());
        }

        let scheduler_interval_secs: u64 = env::var("DEBTS_SCHEDULER_INTERVAL_SECS")
            .unwrap_or_else(|_| "3600".to_string())
            .parse()
            .map_err(|_| "DEBTS_SCHEDULER_INTERVAL_SECS must be a positive integer".to_string())?;
        if scheduler_interval_secs == 0 {
            return Err("DEBTS_SCHEDULER_INTERVAL_SECS must be a positive integer".to_string());
        }

        let run_catchup_on_startup = parse_bool(
            &env::var("DEBTS_RUN_CATCHUP_ON_STARTUP").unwrap_or_else(|_| "true".to_string()),
        )
        .ok_or_else(|| "DEBTS_RUN_CATCHUP_ON_STARTUP must be true or false".to_string())?;

        Ok(Config {
            database_url,
            host,
            port,
            member_concurrency,
            scheduler_interval: Duration::from_secs(scheduler_interval_secs),
            run_catchup_on_startup,
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in [
            "DATABASE_URL",
            "HOST",
            "PORT",
            "DEBTS_MEMBER_CONCURRENCY",
            "DEBTS_SCHEDULER_INTERVAL_SECS",
            "DEBTS_RUN_CATCHUP_ON_STARTUP",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        env::set_var("DATABASE_URL", "postgres://localhost/debts");

        let config = Config::from_env().expect("config");
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8094);
        assert_eq!(config.member_concurrency, 4);
        assert_eq!(config.scheduler_interval, Duration::from_secs(3600));
        assert!(config.run_catchup_on_startup);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_missing_database_url() {
        clear_env();
        assert!(Config::from_env().is_err());
    }

    #[test]
    #[serial]
    fn test_rejects_zero_concurrency() {
        clear_env();
        env::set_var("DATABASE_URL", "postgres://localhost/debts");
        env::set_var("DEBTS_MEMBER_CONCURRENCY", "0");
        assert!(Config::from_env().is_err());
        clear_env();
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("no"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
