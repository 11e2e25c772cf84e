use std::path::PathBuf;
use std::time::Duration;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Client-side settings.
#[derive(Debug, Clone)]
pub struct Config {
    pub live_url: String,
    /// Absolute URL, `file://` URL, or a local path.
    pub fallback: String,
    pub tick_secs: u64,
    pub max_history: usize,
    pub chart_window: usize,
    pub table_rows: usize,
    pub fetch_timeout_secs: u64,
    pub id_seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            live_url: "http://127.0.0.1:3000/dashboard".to_string(),
            fallback: "dashboard/data.json".to_string(),
            tick_secs: 5,
            max_history: 500,
            chart_window: 50,
            table_rows: 7,
            fetch_timeout_secs: 10,
            id_seed: 100,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            live_url: std::env::var("DASH_LIVE_URL").unwrap_or(d.live_url),
            fallback: std::env::var("DASH_FALLBACK").unwrap_or(d.fallback),
            tick_secs: env_or("DASH_TICK_SECS", d.tick_secs).max(1),
            max_history: env_or("DASH_MAX_HISTORY", d.max_history).max(1),
            chart_window: env_or("DASH_CHART_WINDOW", d.chart_window).max(1),
            table_rows: env_or("DASH_TABLE_ROWS", d.table_rows),
            fetch_timeout_secs: env_or("DASH_FETCH_TIMEOUT_SECS", d.fetch_timeout_secs).max(1),
            id_seed: env_or("DASH_ID_SEED", d.id_seed),
        }
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_secs(self.tick_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

/// Settings for the `dashboard_api` binary.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub seed_path: PathBuf,
    pub static_dir: PathBuf,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            port: env_or("PORT", 3000),
            seed_path: std::env::var("DASH_SEED_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("api/seed.json")),
            static_dir: std::env::var("DASH_STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("dashboard")),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}
