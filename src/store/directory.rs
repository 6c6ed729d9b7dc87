use crate::core::error::{Error, ErrorKind, Result};
use crate::store::io::{
    BufferedFileInput, BufferedFileOutput, ByteArrayIndexInput, ByteArrayIndexOutput, IndexInput,
    IndexOutput,
};
use crate::store::lock::{FsLock, Lock, SingleInstanceLock};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// Named byte-file namespace, spec.md §4.5/§6. `create_output` always
/// overwrites; there is no partial-update path. `sync` must durably flush
/// the named files before returning.
pub trait Directory: Send + Sync {
    fn list_all(&self) -> Result<Vec<String>>;
    fn file_exists(&self, name: &str) -> bool;
    fn file_length(&self, name: &str) -> Result<u64>;
    fn file_modified(&self, name: &str) -> Result<SystemTime>;
    fn create_output(&self, name: &str) -> Result<Box<dyn IndexOutput>>;
    fn open_input(&self, name: &str) -> Result<Box<dyn IndexInput>>;
    fn open_input_buffered(&self, name: &str, buffer_size: usize) -> Result<Box<dyn IndexInput>>;
    fn delete_file(&self, name: &str) -> Result<()>;
    fn sync(&self, names: &[String]) -> Result<()>;
    fn make_lock(&self, name: &str) -> Arc<dyn Lock>;
    fn close(&self) -> Result<()>;
}

/// Filesystem-backed `Directory`.
pub struct FsDirectory {
    root: PathBuf,
}

impl FsDirectory {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(FsDirectory { root })
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl Directory for FsDirectory {
    fn list_all(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                if let Some(n) = entry.file_name().to_str() {
                    names.push(n.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn file_exists(&self, name: &str) -> bool {
        self.path_for(name).is_file()
    }

    fn file_length(&self, name: &str) -> Result<u64> {
        Ok(std::fs::metadata(self.path_for(name))?.len())
    }

    fn file_modified(&self, name: &str) -> Result<SystemTime> {
        Ok(std::fs::metadata(self.path_for(name))?.modified()?)
    }

    fn create_output(&self, name: &str) -> Result<Box<dyn IndexOutput>> {
        Ok(Box::new(BufferedFileOutput::create(&self.path_for(name))?))
    }

    fn open_input(&self, name: &str) -> Result<Box<dyn IndexInput>> {
        if !self.file_exists(name) {
            return Err(Error::new(
                ErrorKind::NotFound,
                format!("no such file: {}", name),
            ));
        }
        Ok(Box::new(BufferedFileInput::open(&self.path_for(name))?))
    }

    fn open_input_buffered(&self, name: &str, buffer_size: usize) -> Result<Box<dyn IndexInput>> {
        Ok(Box::new(BufferedFileInput::open_with_buffer(
            &self.path_for(name),
            buffer_size,
        )?))
    }

    fn delete_file(&self, name: &str) -> Result<()> {
        let path = self.path_for(name);
        if path.is_file() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    fn sync(&self, names: &[String]) -> Result<()> {
        for name in names {
            let path = self.path_for(name);
            if path.is_file() {
                std::fs::File::open(&path)?.sync_all()?;
            }
        }
        // Durability of renames/creates in this directory entry also
        // requires syncing the containing directory on most filesystems.
        if let Ok(dir_file) = std::fs::File::open(&self.root) {
            let _ = dir_file.sync_all();
        }
        Ok(())
    }

    fn make_lock(&self, name: &str) -> Arc<dyn Lock> {
        Arc::new(FsLock::new(self.path_for(name)))
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

struct RamFile {
    bytes: Vec<u8>,
    modified: SystemTime,
}

/// Purely in-memory `Directory`, used for near-real-time reader buffers and
/// tests. Locks are process-local (`SingleInstanceLock`).
pub struct RamDirectory {
    files: Arc<RwLock<HashMap<String, Arc<RamFile>>>>,
}

impl RamDirectory {
    pub fn new() -> Self {
        RamDirectory {
            files: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for RamDirectory {
    fn default() -> Self {
        Self::new()
    }
}

/// `IndexOutput` that stages bytes in a buffer and publishes them into the
/// owning `RamDirectory` on `flush`/drop, so `create_output` always
/// overwrites atomically from a reader's point of view.
struct RamOutput {
    name: String,
    buf: ByteArrayIndexOutput,
    files: Arc<RwLock<HashMap<String, Arc<RamFile>>>>,
    published: bool,
}

impl IndexOutput for RamOutput {
    fn write_byte(&mut self, b: u8) -> Result<()> {
        self.buf.write_byte(b)
    }
    fn write_bytes(&mut self, buf: &[u8]) -> Result<()> {
        self.buf.write_bytes(buf)
    }
    fn position(&self) -> u64 {
        self.buf.position()
    }
    fn flush(&mut self) -> Result<()> {
        if !self.published {
            let bytes = std::mem::take(&mut self.buf).into_bytes();
            self.files.write().insert(
                self.name.clone(),
                Arc::new(RamFile {
                    bytes,
                    modified: SystemTime::now(),
                }),
            );
            self.published = true;
        }
        Ok(())
    }
}

impl Drop for RamOutput {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

impl Directory for RamDirectory {
    fn list_all(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.files.read().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn file_exists(&self, name: &str) -> bool {
        self.files.read().contains_key(name)
    }

    fn file_length(&self, name: &str) -> Result<u64> {
        self.files
            .read()
            .get(name)
            .map(|f| f.bytes.len() as u64)
            .ok_or_else(|| Error::new(ErrorKind::NotFound, format!("no such file: {}", name)))
    }

    fn file_modified(&self, name: &str) -> Result<SystemTime> {
        self.files
            .read()
            .get(name)
            .map(|f| f.modified)
            .ok_or_else(|| Error::new(ErrorKind::NotFound, format!("no such file: {}", name)))
    }

    fn create_output(&self, name: &str) -> Result<Box<dyn IndexOutput>> {
        Ok(Box::new(RamOutput {
            name: name.to_string(),
            buf: ByteArrayIndexOutput::new(),
            files: self.files.clone(),
            published: false,
        }))
    }

    fn open_input(&self, name: &str) -> Result<Box<dyn IndexInput>> {
        self.open_input_buffered(name, 1024)
    }

    fn open_input_buffered(&self, name: &str, _buffer_size: usize) -> Result<Box<dyn IndexInput>> {
        let file = self
            .files
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::new(ErrorKind::NotFound, format!("no such file: {}", name)))?;
        Ok(Box::new(ByteArrayIndexInput::new(file.bytes.clone())))
    }

    fn delete_file(&self, name: &str) -> Result<()> {
        self.files.write().remove(name);
        Ok(())
    }

    fn sync(&self, _names: &[String]) -> Result<()> {
        Ok(())
    }

    fn make_lock(&self, _name: &str) -> Arc<dyn Lock> {
        Arc::new(SingleInstanceLock::new())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

pub fn extension_of(name: &str) -> Option<&str> {
    Path::new(name).extension().and_then(|e| e.to_str())
}
