use crate::core::error::{Error, ErrorKind, Result};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Advisory, named, reentrant-unsafe-across-processes lock (spec.md §4.5,
/// §6). `obtain` is non-blocking; callers that want to wait poll with a
/// backoff, matching `LockObtainTimeout` being a propagate-immediately
/// error rather than a blocking wait built into the trait.
pub trait Lock: Send + Sync {
    fn obtain(&self) -> Result<()>;
    fn release(&self) -> Result<()>;
    fn is_locked(&self) -> bool;
}

/// `flock(2)`-backed lock used by `FSDirectory`, grounded in the teacher's
/// `storage::file_lock::FileLock`.
pub struct FsLock {
    path: PathBuf,
    file: std::sync::Mutex<Option<std::fs::File>>,
}

impl FsLock {
    pub fn new(path: PathBuf) -> Self {
        FsLock {
            path,
            file: std::sync::Mutex::new(None),
        }
    }
}

impl Lock for FsLock {
    fn obtain(&self) -> Result<()> {
        let mut guard = self.file.lock().unwrap();
        if guard.is_some() {
            return Ok(());
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&self.path)?;

        #[cfg(unix)]
        {
            use libc::{flock, LOCK_EX, LOCK_NB};
            use std::os::unix::io::AsRawFd;
            let fd = file.as_raw_fd();
            let rc = unsafe { flock(fd, LOCK_EX | LOCK_NB) };
            if rc != 0 {
                warn!(path = %self.path.display(), "lock contended, another writer holds it");
                return Err(Error::new(
                    ErrorKind::LockObtainTimeout,
                    format!("could not obtain lock on {}", self.path.display()),
                ));
            }
        }

        debug!(path = %self.path.display(), "lock obtained");
        *guard = Some(file);
        Ok(())
    }

    fn release(&self) -> Result<()> {
        let mut guard = self.file.lock().unwrap();
        if let Some(file) = guard.take() {
            #[cfg(unix)]
            {
                use libc::{flock, LOCK_UN};
                use std::os::unix::io::AsRawFd;
                unsafe {
                    flock(file.as_raw_fd(), LOCK_UN);
                }
            }
            debug!(path = %self.path.display(), "lock released");
        }
        Ok(())
    }

    fn is_locked(&self) -> bool {
        self.file.lock().unwrap().is_some()
    }
}

/// In-process lock for `RAMDirectory`; contention is possible only within
/// one process, so a plain atomic flag suffices.
pub struct SingleInstanceLock {
    locked: std::sync::atomic::AtomicBool,
}

impl SingleInstanceLock {
    pub fn new() -> Self {
        SingleInstanceLock {
            locked: std::sync::atomic::AtomicBool::new(false),
        }
    }
}

impl Lock for SingleInstanceLock {
    fn obtain(&self) -> Result<()> {
        use std::sync::atomic::Ordering;
        if self
            .locked
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            Ok(())
        } else {
            warn!("lock contended, directory already locked in-process");
            Err(Error::new(
                ErrorKind::LockObtainTimeout,
                "directory already locked".into(),
            ))
        }
    }

    fn release(&self) -> Result<()> {
        self.locked.store(false, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }

    fn is_locked(&self) -> bool {
        self.locked.load(std::sync::atomic::Ordering::SeqCst)
    }
}
