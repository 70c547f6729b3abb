use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::warn;

use suuq_types::pricing::{DEFAULT_PAYMENT_PHONE, Pricing};

/// Secrets that only exist for local development.
const PLACEHOLDER_SECRETS: &[&str] = &["dev-secret-change-me", "change-me-to-a-random-string"];

const DEFAULT_SECRET: &str = "dev-secret-change-me";

pub struct Config {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub storage_dir: PathBuf,
    pub public_url: String,
    pub pricing: Pricing,
    pub admin_emails: HashSet<String>,
    pub expiry_sweep_secs: u64,
}

impl Config {
    /// Read `SUUQ_*` variables from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let host = var("SUUQ_HOST", "0.0.0.0");
        let port: u16 = var("SUUQ_PORT", "3000")
            .parse()
            .context("SUUQ_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", host, port))?;

        let jwt_secret = var("SUUQ_JWT_SECRET", DEFAULT_SECRET);
        if PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            warn!("SUUQ_JWT_SECRET is unset or a placeholder; do not run like this in production");
        }

        let pro_upgrade: f64 = var("SUUQ_PRO_PRICE_USD", "10")
            .parse()
            .context("SUUQ_PRO_PRICE_USD must be a number")?;
        if !pro_upgrade.is_finite() || pro_upgrade < 0.0 {
            anyhow::bail!("SUUQ_PRO_PRICE_USD must be a non-negative number");
        }
        let pricing = Pricing {
            pro_upgrade,
            payment_phone: var("SUUQ_PAYMENT_PHONE", DEFAULT_PAYMENT_PHONE),
            ..Pricing::default()
        };

        let admin_emails = var("SUUQ_ADMIN_EMAILS", "")
            .split(',')
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();

        let expiry_sweep_secs: u64 = var("SUUQ_EXPIRY_SWEEP_SECS", "3600")
            .parse()
            .context("SUUQ_EXPIRY_SWEEP_SECS must be a whole number of seconds")?;

        Ok(Self {
            addr,
            db_path: var("SUUQ_DB_PATH", "suuq.db").into(),
            jwt_secret,
            storage_dir: var("SUUQ_STORAGE_DIR", "./storage").into(),
            public_url: var("SUUQ_PUBLIC_URL", "http://localhost:3000")
                .trim_end_matches('/')
                .to_string(),
            pricing,
            admin_emails,
            expiry_sweep_secs: expiry_sweep_secs.max(1),
        })
    }
}
