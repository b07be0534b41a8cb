//! Cross-process exclusive lock around registry updates.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Held for the duration of one read-modify-write of the registry file.
/// Released on drop.
#[cfg(unix)]
pub(crate) struct RegistryLock {
    _flock: nix::fcntl::Flock<File>,
}

#[cfg(unix)]
impl RegistryLock {
    /// Blocks until an exclusive `flock` on `path` is held.
    pub(crate) fn acquire(path: &Path) -> Result<Self> {
        use nix::fcntl::{Flock, FlockArg};

        let file = open_lock_file(path)?;
        let flock = Flock::lock(file, FlockArg::LockExclusive).map_err(|(_, errno)| {
            Error::Registry(format!("failed to lock {}: {}", path.display(), errno))
        })?;

        Ok(Self { _flock: flock })
    }
}

/// Lock file created exclusively and deleted on drop.
#[cfg(not(unix))]
pub(crate) struct RegistryLock {
    path: PathBuf,
    _file: File,
}

#[cfg(not(unix))]
impl RegistryLock {
    pub(crate) fn acquire(path: &Path) -> Result<Self> {
        use std::time::{Duration, Instant};

        const LOCK_TIMEOUT: Duration = Duration::from_secs(10);
        const LOCK_RETRY: Duration = Duration::from_millis(50);

        ensure_parent(path)?;
        let deadline = Instant::now() + LOCK_TIMEOUT;
        loop {
            match OpenOptions::new().write(true).create_new(true).open(path) {
                Ok(file) => {
                    return Ok(Self {
                        path: path.to_path_buf(),
                        _file: file,
                    })
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    if Instant::now() >= deadline {
                        return Err(Error::Registry(format!(
                            "timed out waiting for lock {}",
                            path.display()
                        )));
                    }
                    std::thread::sleep(LOCK_RETRY);
                }
                Err(e) => {
                    return Err(Error::Registry(format!(
                        "failed to create lock {}: {}",
                        path.display(),
                        e
                    )))
                }
            }
        }
    }
}

#[cfg(not(unix))]
impl Drop for RegistryLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// Path of the lock file guarding `registry_path`.
pub(crate) fn lock_path(registry_path: &Path) -> PathBuf {
    let mut name = registry_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "tunnels.json".into());
    name.push(".lock");
    registry_path.with_file_name(name)
}

pub(crate) fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Registry(format!("failed to create {}: {}", parent.display(), e))
            })?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn open_lock_file(path: &Path) -> Result<File> {
    ensure_parent(path)?;
    OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(path)
        .map_err(|e| Error::Registry(format!("failed to open lock {}: {}", path.display(), e)))
}
