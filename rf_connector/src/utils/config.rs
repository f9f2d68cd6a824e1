use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::{event, Level};

use crate::command::AxisRange;
use crate::socketpool::PoolConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub rf_host: String,
    pub rf_port: u16,
    pub pool_size: usize,
    pub io_timeout: Duration,    // connect, send and per read timeout on a connection
    pub reply_timeout: Duration, // how long to wait for a reply to become readable
    pub auto_connect: bool,      // take control of realflight at startup
    pub http_address: String,
    pub dataserver_url: Option<String>,
    pub share_interval: Duration,
    pub axis_range: AxisRange,
}

impl Default for Config {
    fn default() -> Self {
        let rf_host: String = env::var("RF_HOST").unwrap_or("127.0.0.1".to_string());
        let http_address: String =
            env::var("HTTP_ADDRESS").unwrap_or("0.0.0.0:3100".to_string());
        let dataserver_url: Option<String> =
            env::var("DATASERVER_URL").ok().filter(|u| !u.is_empty());

        Config {
            rf_host,
            rf_port: env_or("RF_PORT", 18083),
            pool_size: env_or("RF_POOL_SIZE", 3),
            io_timeout: Duration::from_millis(env_or("RF_IO_TIMEOUT_MS", 1000)),
            reply_timeout: Duration::from_millis(env_or("RF_REPLY_TIMEOUT_MS", 1000)),
            auto_connect: env_or("RF_AUTO_CONNECT", true),
            http_address,
            dataserver_url,
            share_interval: Duration::from_millis(env_or("SHARE_INTERVAL_MS", 500)),
            axis_range: AxisRange::new(env_or("AXIS_MIN", 0.0), env_or("AXIS_MAX", 2040.0)),
        }
    }
}

impl Config {
    pub fn rf_address(&self) -> String {
        format!("{}:{}", self.rf_host, self.rf_port)
    }

    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            address: self.rf_address(),
            target_size: self.pool_size,
            io_timeout: self.io_timeout,
        }
    }
}

// read and parse an env variable, falling back to the default if it is missing or malformed
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(v) => match parse_value(&v) {
            Some(parsed) => parsed,
            None => {
                event!(
                    Level::WARN,
                    "Cannot parse {}={:?}, using the default instead",
                    key,
                    v
                );
                default
            }
        },
        Err(_) => default,
    }
}

fn parse_value<T: FromStr>(v: &str) -> Option<T> {
    v.trim().parse::<T>().ok()
}
