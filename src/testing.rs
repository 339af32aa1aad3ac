use crate::store::owner_file_path;
use std::path::{Path, PathBuf};

/// Store file with a unique name under the system temp dir. The data file and
/// its `-lock` and `-owner` companions are removed on drop.
pub struct TestDbFile {
    pub path: PathBuf,
}

impl TestDbFile {
    pub fn random() -> Self {
        Self::in_dir(std::env::temp_dir())
    }

    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let name = format!("voucher-ledger-{}.ldb", uuid::Uuid::new_v4().simple());
        Self { path: dir.as_ref().join(name) }
    }

    pub fn lock_file_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push("-lock");
        PathBuf::from(name)
    }
}

impl Drop for TestDbFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
        let _ = std::fs::remove_file(self.lock_file_path());
        let _ = std::fs::remove_file(owner_file_path(&self.path));
    }
}
