pub mod error;
pub mod codec;
pub mod store;
pub mod config;
pub mod session;
pub mod messages;
pub mod desk;
pub mod console;
pub mod testing;

pub use error::LedgerError;
pub use store::{LedgerStore, StoreOptions};
