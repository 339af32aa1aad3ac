use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Store Unavailable: {0}")]
    StoreUnavailable(String),
    #[error("Missing Table: {0}")]
    MissingTable(String),
    #[error("Persist Failed: {0}")]
    PersistFailed(String),
    #[error("Read Failed: {0}")]
    ReadFailed(String),
    #[error("Corrupt Value: {0}")]
    CorruptValue(String),
    #[error("Invalid Voucher: {0}")]
    InvalidVoucher(String),
    #[error("Store Closed")]
    Closed,
    #[error("Config Error: {0}")]
    Config(String),
}

impl LedgerError {
    /// True for failures the caller may simply retry (nothing was written).
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::PersistFailed(_) | LedgerError::ReadFailed(_))
    }
}
