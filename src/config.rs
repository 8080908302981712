use {
    crate::domain::money::Currency,
    std::{env, net::SocketAddr, time::Duration},
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    #[error("invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Process configuration, read once at startup.
#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// Postgres when set, in-memory stores otherwise.
    pub database_url: Option<String>,
    pub payment_key_secret: String,
    pub payment_webhook_secret: String,
    pub stripe_secret_key: String,
    pub currency: Currency,
    pub receipt_sender: String,
    /// `None` disables the background sweep.
    pub reconcile_interval: Option<Duration>,
    /// How far behind "now" a sweep looks, so checkouts still committing
    /// are not reported half-written.
    pub reconcile_settle: Duration,
    pub request_timeout: Duration,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("database", &self.database_url.is_some())
            .field("currency", &self.currency)
            .field("receipt_sender", &self.receipt_sender)
            .field("reconcile_interval", &self.reconcile_interval)
            .field("reconcile_settle", &self.reconcile_settle)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok().filter(|v| !v.trim().is_empty()))
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| lookup(name).ok_or(ConfigError::Missing(name));

        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:3000".to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                name: "BIND_ADDR",
                reason: e.to_string(),
            })?;

        let currency = match lookup("CURRENCY") {
            Some(code) => Currency::try_from(code.as_str()).map_err(|e| ConfigError::Invalid {
                name: "CURRENCY",
                reason: e.to_string(),
            })?,
            None => Currency::Usd,
        };

        let reconcile_secs = parse_secs(&lookup, "RECONCILE_INTERVAL_SECS", 300)?;
        let settle_secs = parse_secs(&lookup, "RECONCILE_SETTLE_SECS", 30)?;
        let timeout_secs = parse_secs(&lookup, "REQUEST_TIMEOUT_SECS", 10)?;
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "REQUEST_TIMEOUT_SECS",
                reason: "must be positive".into(),
            });
        }

        Ok(Self {
            bind_addr,
            database_url: lookup("DATABASE_URL"),
            payment_key_secret: required("PAYMENT_KEY_SECRET")?,
            payment_webhook_secret: required("PAYMENT_WEBHOOK_SECRET")?,
            stripe_secret_key: required("STRIPE_SECRET_KEY")?,
            currency,
            receipt_sender: lookup("RECEIPT_SENDER")
                .unwrap_or_else(|| "orders@localhost".to_string()),
            reconcile_interval: (reconcile_secs > 0).then(|| Duration::from_secs(reconcile_secs)),
            reconcile_settle: Duration::from_secs(settle_secs),
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn parse_secs(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: u64,
) -> Result<u64, ConfigError> {
    match lookup(name) {
        Some(raw) => raw.trim().parse().map_err(|e: std::num::ParseIntError| {
            ConfigError::Invalid {
                name,
                reason: e.to_string(),
            }
        }),
        None => Ok(default),
    }
}
