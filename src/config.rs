use crate::error::LedgerError;
use crate::store::{StoreOptions, DEFAULT_MAP_SIZE};
use std::collections::HashSet;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub type ChatId = i64;

#[derive(Clone, Debug)]
pub struct Config {
    pub db_path: PathBuf,
    pub map_size: usize,
    /// Callers permitted to use the desk. Empty means nobody is.
    pub allowed_chats: HashSet<ChatId>,
    /// Accepted voucher codes (lower-case). Empty accepts any code.
    pub voucher_codes: HashSet<String>,
    /// Face value of a voucher.
    pub voucher_limit: i64,
    pub drain_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("app.db"),
            map_size: DEFAULT_MAP_SIZE,
            allowed_chats: HashSet::new(),
            voucher_codes: HashSet::new(),
            voucher_limit: 2000,
            drain_timeout: Duration::from_secs(5),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, LedgerError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, LedgerError> {
        let mut cfg = Config::default();
        if let Some(p) = get("VOUCHER_DB_PATH").filter(|p| !p.trim().is_empty()) {
            cfg.db_path = PathBuf::from(p.trim());
        }
        if let Some(v) = get("VOUCHER_MAP_SIZE") {
            cfg.map_size = parse("VOUCHER_MAP_SIZE", &v)?;
        }
        if let Some(v) = get("VOUCHER_ALLOWED_CHATS") {
            cfg.allowed_chats = split_list(&v)
                .map(|id| parse::<ChatId>("VOUCHER_ALLOWED_CHATS", id))
                .collect::<Result<_, _>>()?;
        }
        if let Some(v) = get("VOUCHER_CODES") {
            cfg.voucher_codes = split_list(&v).map(|c| c.to_lowercase()).collect();
        }
        if let Some(v) = get("VOUCHER_LIMIT") {
            cfg.voucher_limit = parse("VOUCHER_LIMIT", &v)?;
        }
        if let Some(v) = get("VOUCHER_DRAIN_SECS") {
            cfg.drain_timeout = Duration::from_secs(parse("VOUCHER_DRAIN_SECS", &v)?);
        }
        Ok(cfg)
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions { map_size: self.map_size }
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn parse<T: FromStr>(var: &str, raw: &str) -> Result<T, LedgerError>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| LedgerError::Config(format!("{}='{}': {}", var, raw, e)))
}
