use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub shops_path: PathBuf,
    /// Accepted bearer tokens for the admin API. May be empty in development.
    pub api_keys: Vec<String>,
    pub rate_limit_per_minute: u32,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub generation_timeout_secs: u64,
    pub generation_max_per_run: usize,
    pub generation_sample_reviews: usize,
    pub selection_days_back: i64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("shops_path", &self.shops_path)
            .field("api_keys", &format_args!("[{} configured]", self.api_keys.len()))
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .field("database_url", &"[redacted]")
            .field(
                "openai_api_key",
                &self.openai_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("openai_base_url", &self.openai_base_url)
            .field("openai_model", &self.openai_model)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("generation_timeout_secs", &self.generation_timeout_secs)
            .field("generation_max_per_run", &self.generation_max_per_run)
            .field(
                "generation_sample_reviews",
                &self.generation_sample_reviews,
            )
            .field("selection_days_back", &self.selection_days_back)
            .finish()
    }
}
