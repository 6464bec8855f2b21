use std::time::Duration;

use rocket::figment::providers::Env;
use rocket::figment::Figment;
use serde::Deserialize;
use thiserror::Error;

const DEFAULT_FROM_ADDRESS: &str = "no-reply@localhost";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(#[from] rocket::figment::Error),
}

/// Everything the service reads at startup.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub mailer: MailerConfig,
    pub delivery: DeliveryConfig,
}

/// `[mailer]` table, or `SMTP_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MailerConfig {
    pub host: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_address: Option<String>,
    pub from_name: Option<String>,
}

impl Default for MailerConfig {
    fn default() -> Self {
        MailerConfig {
            host: None,
            port: 587,
            username: None,
            password: None,
            from_address: None,
            from_name: None,
        }
    }
}

impl MailerConfig {
    pub fn host(&self) -> Option<&str> {
        non_blank(&self.host)
    }

    pub fn username(&self) -> Option<&str> {
        non_blank(&self.username)
    }

    pub fn password(&self) -> Option<&str> {
        non_blank(&self.password)
    }

    /// Host, username and password are all set. Anything less means simulation mode.
    pub fn is_complete(&self) -> bool {
        self.host().is_some() && self.username().is_some() && self.password().is_some()
    }

    /// The From mailbox: explicit address, else the SMTP username, else a placeholder.
    pub fn sender(&self) -> String {
        let address = non_blank(&self.from_address)
            .or_else(|| self.username())
            .unwrap_or(DEFAULT_FROM_ADDRESS);

        match non_blank(&self.from_name) {
            Some(name) => format!("\"{}\" <{}>", name.replace('"', ""), address),
            None => address.to_string(),
        }
    }
}

/// `[delivery]` table: rate limiting, retry budgets and task cadence.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    pub rate_window_secs: u64,
    pub rate_max_attempts: usize,
    /// Immediate attempts made while the caller waits.
    pub foreground_attempts: u32,
    /// Pause before each foreground retry; the last entry repeats.
    pub backoff_secs: Vec<u64>,
    /// Failed background cycles a queued item survives before it is dropped.
    pub background_attempts: u32,
    pub requeue_interval_secs: u64,
    pub ledger_sweep_interval_secs: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        DeliveryConfig {
            rate_window_secs: 15 * 60,
            rate_max_attempts: 3,
            foreground_attempts: 3,
            backoff_secs: vec![1, 3, 7],
            background_attempts: 3,
            requeue_interval_secs: 60,
            ledger_sweep_interval_secs: 15 * 60,
        }
    }
}

impl DeliveryConfig {
    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_window_secs)
    }

    pub fn backoff(&self) -> Vec<Duration> {
        self.backoff_secs
            .iter()
            .map(|s| Duration::from_secs(*s))
            .collect()
    }

    pub fn requeue_interval(&self) -> Duration {
        Duration::from_secs(self.requeue_interval_secs.max(1))
    }

    pub fn ledger_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.ledger_sweep_interval_secs.max(1))
    }
}

/// Rocket's own figment (Rocket.toml + ROCKET_*) with `SMTP_*` folded into `[mailer]`.
pub fn figment() -> Figment {
    rocket::Config::figment().merge(
        Env::prefixed("SMTP_").map(|key| format!("mailer.{}", key.as_str()).into()),
    )
}

pub fn load(figment: &Figment) -> Result<Settings, ConfigError> {
    let settings: Settings = figment.extract()?;
    log::info!(
        "[config] rate limit {} per {}s, {} foreground / {} background attempts",
        settings.delivery.rate_max_attempts,
        settings.delivery.rate_window_secs,
        settings.delivery.foreground_attempts,
        settings.delivery.background_attempts
    );
    Ok(settings)
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
