use crate::codec::{check_voucher, decode_total, display_voucher, encode_total, TOTAL_LEN};
use crate::error::LedgerError;
use fs2::FileExt;
use lmdb::{Database, DatabaseFlags, Environment, EnvironmentFlags, Transaction, WriteFlags};
use parking_lot::RwLock;
use std::fs::{create_dir_all, set_permissions, File, OpenOptions, Permissions};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
#[cfg(test)]
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

/// Name of the table holding `voucher id -> accumulated total`.
pub const VOUCHER_TABLE: &str = "vouchers";

pub const DEFAULT_MAP_SIZE: usize = 16 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct StoreOptions {
    pub map_size: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self { map_size: DEFAULT_MAP_SIZE }
    }
}

struct Mounted {
    env: Environment,
    table: Database,
    // Dropped after `env`; releases the exclusive flock.
    _owner: File,
}

/// Durable voucher ledger backed by a single LMDB file.
///
/// Every call runs in its own LMDB transaction. Writers are serialized by
/// LMDB's writer lock, readers work on a snapshot and never block writers.
/// `close` waits for in-flight calls, after which the store rejects
/// everything with [`LedgerError::Closed`].
pub struct LedgerStore {
    path: PathBuf,
    mounted: RwLock<Option<Mounted>>,
    #[cfg(test)]
    fail_next_commit: AtomicBool,
}

impl LedgerStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        Self::open_with(path, &StoreOptions::default())
    }

    pub fn open_with(path: impl AsRef<Path>, options: &StoreOptions) -> Result<Self, LedgerError> {
        let path = path.as_ref().to_path_buf();
        let unavailable = |what: &str, e: &dyn std::fmt::Display| {
            LedgerError::StoreUnavailable(format!("{}: {}: {}", path.display(), what, e))
        };

        try_create_parent_dir(&path).map_err(|e| unavailable("create parent dir", &e))?;
        let owner = lock_owner_file(&path).map_err(|e| {
            if e.kind() == fs2::lock_contended_error().kind() {
                unavailable("lock", &"locked by another process")
            } else {
                unavailable("lock", &e)
            }
        })?;

        let env = Environment::new()
            .set_max_dbs(1)
            .set_map_size(options.map_size)
            .set_flags(EnvironmentFlags::NO_SUB_DIR | EnvironmentFlags::NO_TLS)
            .open_with_permissions(&path, 0o600)
            .map_err(|e| unavailable("open", &e))?;

        // Runs in its own write transaction, committed before we return.
        let table = env
            .create_db(Some(VOUCHER_TABLE), DatabaseFlags::empty())
            .map_err(|e| unavailable("bootstrap table", &e))?;

        info!("📒 Ledger store mounted at {}", path.display());
        Ok(Self {
            path,
            mounted: RwLock::new(Some(Mounted { env, table, _owner: owner })),
            #[cfg(test)]
            fail_next_commit: AtomicBool::new(false),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.mounted.read().is_some()
    }

    /// Adds `delta` to the voucher's total (wrapping at 2^32) and returns the
    /// new total. `delta == 0` is a transactional read.
    pub fn accumulate(&self, voucher: impl AsRef<[u8]>, delta: u32) -> Result<u32, LedgerError> {
        let key = voucher.as_ref();
        check_voucher(key)?;
        let ctx = |step: &str, e: &dyn std::fmt::Display| {
            format!("accumulate '{}': {}: {}", display_voucher(key), step, e)
        };

        let guard = self.mounted.read();
        let m = guard.as_ref().ok_or(LedgerError::Closed)?;

        let mut txn = m
            .env
            .begin_rw_txn()
            .map_err(|e| LedgerError::PersistFailed(ctx("begin", &e)))?;
        let current = read_total(&txn, m.table, key, "accumulate")?;
        let total = current.wrapping_add(delta);

        // Any early return below drops `txn`, which aborts it.
        txn.put(m.table, &key, &encode_total(total), WriteFlags::empty())
            .map_err(|e| LedgerError::PersistFailed(ctx("put", &e)))?;

        if self.take_injected_fault() {
            txn.abort();
            return Err(LedgerError::PersistFailed(ctx("commit", &"injected I/O error")));
        }

        txn.commit().map_err(|e| {
            warn!("commit failed for voucher '{}': {}", display_voucher(key), e);
            LedgerError::PersistFailed(ctx("commit", &e))
        })?;
        Ok(total)
    }

    /// Read-only lookup; unknown vouchers read as 0.
    pub fn peek(&self, voucher: impl AsRef<[u8]>) -> Result<u32, LedgerError> {
        let key = voucher.as_ref();
        check_voucher(key)?;

        let guard = self.mounted.read();
        let m = guard.as_ref().ok_or(LedgerError::Closed)?;

        let txn = m.env.begin_ro_txn().map_err(|e| {
            LedgerError::ReadFailed(format!("peek '{}': begin: {}", display_voucher(key), e))
        })?;
        read_total(&txn, m.table, key, "peek")
    }

    /// Flushes and releases the file. One-way: later calls fail with `Closed`.
    pub fn close(&self) -> Result<(), LedgerError> {
        let mounted = self.mounted.write().take().ok_or(LedgerError::Closed)?;
        let synced = mounted.env.sync(true);
        drop(mounted);
        info!("📕 Ledger store closed: {}", self.path.display());
        synced.map_err(|e| LedgerError::PersistFailed(format!("close: sync: {}", e)))
    }

    #[cfg(test)]
    pub(crate) fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    #[cfg(test)]
    fn take_injected_fault(&self) -> bool {
        self.fail_next_commit.swap(false, Ordering::SeqCst)
    }

    #[cfg(not(test))]
    fn take_injected_fault(&self) -> bool {
        false
    }
}

fn read_total<T: Transaction>(txn: &T, table: Database, key: &[u8], op: &str) -> Result<u32, LedgerError> {
    match txn.get(table, &key) {
        Ok(bytes) => decode_total(bytes).map_err(|_| {
            LedgerError::CorruptValue(format!(
                "{} '{}': expected {} bytes, found {}",
                op,
                display_voucher(key),
                TOTAL_LEN,
                bytes.len()
            ))
        }),
        Err(lmdb::Error::NotFound) => Ok(0),
        Err(lmdb::Error::BadDbi) => Err(LedgerError::MissingTable(format!(
            "{}: table '{}' is not available in this transaction",
            op, VOUCHER_TABLE
        ))),
        Err(e) => Err(LedgerError::ReadFailed(format!("{} '{}': {}", op, display_voucher(key), e))),
    }
}

/// Sibling of the data file that carries the single-owner lock. LMDB keeps
/// its own fcntl locks on `<path>-lock`, so this one stays separate.
pub fn owner_file_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push("-owner");
    PathBuf::from(name)
}

fn lock_owner_file(path: &Path) -> std::io::Result<File> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(owner_file_path(path))?;
    file.try_lock_exclusive()?;
    Ok(file)
}

fn try_create_parent_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if parent != Path::new("") && !parent.is_dir() {
            create_dir_all(parent)?;
            set_permissions(parent, Permissions::from_mode(0o700))?;
        }
    }
    Ok(())
}
