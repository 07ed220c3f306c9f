//! Runtime Configuration
//! Mission: Every knob comes from a flag or the environment, with sane defaults

use clap::Parser;
use std::time::Duration;

pub const DEV_JWT_SECRET: &str = "dev-access-secret-change-in-production-minimum-32-chars";
pub const DEV_REFRESH_SECRET: &str = "dev-refresh-secret-change-in-production-minimum-32-chars";

#[derive(Debug, Clone, Parser)]
#[command(name = "apnisec", about = "Security issue tracker API")]
pub struct AppConfig {
    /// Address the HTTP server binds to
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:3000")]
    pub bind_addr: String,

    /// SQLite database file
    #[arg(long, env = "DATABASE_PATH", default_value = "apnisec.db")]
    pub database_path: String,

    /// Secret for access tokens
    #[arg(long, env = "JWT_SECRET", default_value = DEV_JWT_SECRET, hide_env_values = true)]
    pub jwt_secret: String,

    /// Secret for refresh tokens
    #[arg(long, env = "REFRESH_SECRET", default_value = DEV_REFRESH_SECRET, hide_env_values = true)]
    pub refresh_secret: String,

    #[arg(long, env = "ACCESS_TOKEN_TTL_SECS", default_value_t = 15 * 60)]
    pub access_token_ttl_secs: u64,

    #[arg(long, env = "REFRESH_TOKEN_TTL_SECS", default_value_t = 7 * 24 * 3600)]
    pub refresh_token_ttl_secs: u64,

    /// Requests allowed per client per window
    #[arg(
        long,
        env = "RATE_LIMIT_MAX",
        default_value_t = 100,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub rate_limit_max: u32,

    #[arg(long, env = "RATE_LIMIT_WINDOW_SECS", default_value_t = 15 * 60)]
    pub rate_limit_window_secs: u64,

    /// Upper bound on tracked client identifiers
    #[arg(long, env = "RATE_LIMIT_MAX_CLIENTS", default_value_t = 100_000)]
    pub rate_limit_max_clients: usize,

    #[arg(long, env = "RATE_LIMIT_SWEEP_SECS", default_value_t = 60)]
    pub rate_limit_sweep_secs: u64,

    #[arg(long, env = "BCRYPT_COST", default_value_t = 10)]
    pub bcrypt_cost: u32,

    /// Resend API key; emails are only logged when unset
    #[arg(long, env = "RESEND_API_KEY", hide_env_values = true)]
    pub resend_api_key: Option<String>,

    #[arg(long, env = "RESEND_API_URL", default_value = "https://api.resend.com/emails")]
    pub resend_api_url: String,

    #[arg(long, env = "EMAIL_FROM", default_value = "onboarding@resend.dev")]
    pub email_from: String,

    #[arg(long, env = "EMAIL_QUEUE_CAPACITY", default_value_t = 256)]
    pub email_queue_capacity: usize,
}

impl AppConfig {
    pub fn access_token_ttl(&self) -> Duration {
        Duration::from_secs(self.access_token_ttl_secs)
    }

    pub fn refresh_token_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_token_ttl_secs)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn rate_limit_sweep(&self) -> Duration {
        Duration::from_secs(self.rate_limit_sweep_secs.max(1))
    }

    /// True while either token secret is still the development placeholder
    pub fn uses_dev_secrets(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET || self.refresh_secret == DEV_REFRESH_SECRET
    }
}
