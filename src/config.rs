use std::env;
use std::time::Duration;

use crate::reconcile::MAX_WINDOW_HOURS;

/// Credentials and endpoints for the payment gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub query_url: String,
    pub refund_url: String,
    /// Merchant ID sent as `pid`
    pub pid: String,
    /// Shared signing secret
    pub key: String,
    pub timeout: Duration,
}

impl GatewayConfig {
    pub const MIN_TIMEOUT_SECS: u64 = 10;
    pub const MAX_TIMEOUT_SECS: u64 = 15;
    pub const DEFAULT_TIMEOUT_SECS: u64 = 12;

    pub fn from_env() -> Self {
        Self::from_vars(&process_env)
    }

    fn from_vars(vars: &impl Fn(&str) -> Option<String>) -> Self {
        let timeout_secs = parse_var(vars, "GATEWAY_TIMEOUT_SECS", Self::DEFAULT_TIMEOUT_SECS)
            .clamp(Self::MIN_TIMEOUT_SECS, Self::MAX_TIMEOUT_SECS);

        Self {
            query_url: vars("GATEWAY_QUERY_URL")
                .unwrap_or_else(|| "https://pay.example.com/api/query".to_string()),
            refund_url: vars("GATEWAY_REFUND_URL")
                .unwrap_or_else(|| "https://pay.example.com/api/refund".to_string()),
            pid: vars("GATEWAY_PID").unwrap_or_default(),
            key: vars("GATEWAY_KEY").unwrap_or_default(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.pid.is_empty() && !self.key.is_empty()
    }
}

/// Tunables shared by the refund orchestrator and the two scanners.
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Records checked concurrently per batch (1..=5)
    pub batch_size: usize,
    /// Pause between batches to respect the gateway rate limit
    pub batch_delay: Duration,
    pub refund_window_days: i64,
    /// Default look-back for the verification pass
    pub verify_window_hours: i64,
    /// Background drift sweep period (None = disabled)
    pub drift_sweep_interval: Option<Duration>,
    /// Background verification period (None = disabled)
    pub verify_interval: Option<Duration>,
}

impl ReconcileConfig {
    pub const MAX_BATCH_SIZE: usize = 5;
    /// Upper bound on the refund window; keeps the window in seconds far
    /// from overflowing.
    pub const MAX_REFUND_WINDOW_DAYS: i64 = 365;

    pub fn from_env() -> Self {
        Self::from_vars(&process_env)
    }

    fn from_vars(vars: &impl Fn(&str) -> Option<String>) -> Self {
        Self {
            batch_size: parse_var(vars, "RECONCILE_BATCH_SIZE", Self::MAX_BATCH_SIZE)
                .clamp(1, Self::MAX_BATCH_SIZE),
            batch_delay: Duration::from_millis(parse_var(vars, "RECONCILE_BATCH_DELAY_MS", 2000)),
            refund_window_days: parse_var(vars, "REFUND_WINDOW_DAYS", 7)
                .clamp(1, Self::MAX_REFUND_WINDOW_DAYS),
            verify_window_hours: parse_var(vars, "VERIFY_WINDOW_HOURS", 24)
                .clamp(1, MAX_WINDOW_HOURS),
            drift_sweep_interval: parse_interval(vars, "DRIFT_SWEEP_INTERVAL_SECS"),
            verify_interval: parse_interval(vars, "VERIFY_INTERVAL_SECS"),
        }
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            batch_size: Self::MAX_BATCH_SIZE,
            batch_delay: Duration::from_secs(2),
            refund_window_days: 7,
            verify_window_hours: 24,
            drift_sweep_interval: None,
            verify_interval: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub dev_mode: bool,
    /// Bearer key for operator endpoints. Unset = operator endpoints disabled.
    pub operator_api_key: Option<String>,
    /// Requests per minute per IP on POST /refund (0 = unlimited)
    pub refund_rate_limit_rpm: u32,
    pub gateway: GatewayConfig,
    pub reconcile: ReconcileConfig,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("PAYSYNC_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = parse_var(&process_env, "PORT", 3000);

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "paysync.db".to_string()),
            dev_mode,
            operator_api_key: env::var("OPERATOR_API_KEY")
                .ok()
                .filter(|k| !k.is_empty()),
            refund_rate_limit_rpm: parse_var(&process_env, "RATE_LIMIT_REFUND_RPM", 10),
            gateway: GatewayConfig::from_env(),
            reconcile: ReconcileConfig::from_env(),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn process_env(name: &str) -> Option<String> {
    env::var(name).ok()
}

fn parse_var<T: std::str::FromStr>(
    vars: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> T {
    vars(name)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Seconds between background runs; 0 or unset disables the job.
fn parse_interval(vars: &impl Fn(&str) -> Option<String>, name: &str) -> Option<Duration> {
    match parse_var::<u64>(vars, name, 0) {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    }
}
