use std::{env, time::Duration};

use log::*;
use matching_engine::DEFAULT_CAPACITY;
use mkt_common::{parse_boolean_flag, Secret};

const DEFAULT_MKT_HOST: &str = "127.0.0.1";
const DEFAULT_MKT_PORT: u16 = 8470;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/marketplace.db";
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// How often the expiry sweep runs.
    pub sweep_interval: Duration,
    /// When true, the expiry worker is not started. Sweeps can still be triggered on the admin route.
    pub disable_sweep: bool,
    /// The number of concurrent engagements a producer can carry before the allocator reports them as fully booked.
    pub default_capacity: u32,
    /// If set, every request must carry this value in the `mkt_gateway_token` header.
    pub gateway_secret: Secret<String>,
    /// If set, notices are POSTed to this URL as JSON. Otherwise they are only logged.
    pub notification_webhook_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_MKT_HOST.to_string(),
            port: DEFAULT_MKT_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            disable_sweep: false,
            default_capacity: DEFAULT_CAPACITY,
            gateway_secret: Secret::default(),
            notification_webhook_url: None,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("MKT_HOST").ok().unwrap_or_else(|| DEFAULT_MKT_HOST.into());
        let port = parse_env("MKT_PORT", DEFAULT_MKT_PORT);
        let database_url = env::var("MKT_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ MKT_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let sweep_secs = parse_env("MKT_SWEEP_INTERVAL", DEFAULT_SWEEP_INTERVAL.as_secs());
        let sweep_interval = Duration::from_secs(sweep_secs.max(1));
        let disable_sweep = parse_boolean_flag(env::var("MKT_DISABLE_SWEEP").ok(), false);
        let default_capacity = parse_env("MKT_DEFAULT_CAPACITY", DEFAULT_CAPACITY);
        let gateway_secret = Secret::new(env::var("MKT_GATEWAY_SECRET").ok().unwrap_or_default());
        if gateway_secret.is_empty() {
            warn!(
                "🚨️ MKT_GATEWAY_SECRET is not set. Identity headers will be trusted from any caller. Only run like \
                 this behind a gateway that strips them."
            );
        }
        let notification_webhook_url = env::var("MKT_NOTIFICATION_WEBHOOK_URL").ok().filter(|s| !s.trim().is_empty());
        match &notification_webhook_url {
            Some(url) => info!("🪛️ Notifications will be posted to {url}"),
            None => info!("🪛️ MKT_NOTIFICATION_WEBHOOK_URL is not set. Notifications will only be logged."),
        }
        Self {
            host,
            port,
            database_url,
            sweep_interval,
            disable_sweep,
            default_capacity,
            gateway_secret,
            notification_webhook_url,
        }
    }
}

fn parse_env<T>(name: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            error!("🪛️ {s} is not a valid value for {name}. {e} Using the default, {default}, instead.");
            default
        }),
        Err(_) => {
            info!("🪛️ {name} is not set. Using the default value of {default}.");
            default
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let config = ServerConfig::new("0.0.0.0", 9000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9000);
        assert_eq!(config.sweep_interval, Duration::from_secs(60));
        assert_eq!(config.default_capacity, 5);
        assert!(config.gateway_secret.is_empty());
        assert!(!config.disable_sweep);
        assert_eq!(format!("{config:?}").matches("****").count(), 1);
    }

    #[test]
    fn bad_values_fall_back_to_defaults() {
        env::set_var("MKT_TEST_PARSE_PORT", "eighty");
        assert_eq!(parse_env("MKT_TEST_PARSE_PORT", 8470u16), 8470);
        env::set_var("MKT_TEST_PARSE_PORT", " 8080 ");
        assert_eq!(parse_env("MKT_TEST_PARSE_PORT", 8470u16), 8080);
        assert_eq!(parse_env("MKT_TEST_PARSE_UNSET", 7u32), 7);
    }
}
