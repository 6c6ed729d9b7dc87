use crate::core::error::Result;
use crate::store::directory::{extension_of, Directory};
use crate::store::io::{IndexInput, IndexOutput};
use crate::store::lock::Lock;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::SystemTime;

/// Routes operations to one of two directories based on filename extension
/// (spec.md §4.5), e.g. keeping `.tis`/`.frq` hot files on fast media while
/// `.fdt` stored-field blobs spill to slower storage.
pub struct FileSwitchDirectory {
    primary_extensions: HashSet<String>,
    primary: Arc<dyn Directory>,
    secondary: Arc<dyn Directory>,
}

impl FileSwitchDirectory {
    pub fn new(
        primary_extensions: HashSet<String>,
        primary: Arc<dyn Directory>,
        secondary: Arc<dyn Directory>,
    ) -> Self {
        FileSwitchDirectory {
            primary_extensions,
            primary,
            secondary,
        }
    }

    fn pick(&self, name: &str) -> &Arc<dyn Directory> {
        match extension_of(name) {
            Some(ext) if self.primary_extensions.contains(ext) => &self.primary,
            _ => &self.secondary,
        }
    }
}

impl Directory for FileSwitchDirectory {
    fn list_all(&self) -> Result<Vec<String>> {
        let mut names = self.primary.list_all()?;
        names.extend(self.secondary.list_all()?);
        names.sort();
        names.dedup();
        Ok(names)
    }

    fn file_exists(&self, name: &str) -> bool {
        self.pick(name).file_exists(name)
    }

    fn file_length(&self, name: &str) -> Result<u64> {
        self.pick(name).file_length(name)
    }

    fn file_modified(&self, name: &str) -> Result<SystemTime> {
        self.pick(name).file_modified(name)
    }

    fn create_output(&self, name: &str) -> Result<Box<dyn IndexOutput>> {
        self.pick(name).create_output(name)
    }

    fn open_input(&self, name: &str) -> Result<Box<dyn IndexInput>> {
        self.pick(name).open_input(name)
    }

    fn open_input_buffered(&self, name: &str, buffer_size: usize) -> Result<Box<dyn IndexInput>> {
        self.pick(name).open_input_buffered(name, buffer_size)
    }

    fn delete_file(&self, name: &str) -> Result<()> {
        self.pick(name).delete_file(name)
    }

    fn sync(&self, names: &[String]) -> Result<()> {
        let (primary_names, secondary_names): (Vec<_>, Vec<_>) = names
            .iter()
            .cloned()
            .partition(|n| matches!(extension_of(n), Some(ext) if self.primary_extensions.contains(ext)));
        self.primary.sync(&primary_names)?;
        self.secondary.sync(&secondary_names)?;
        Ok(())
    }

    fn make_lock(&self, name: &str) -> Arc<dyn Lock> {
        self.primary.make_lock(name)
    }

    fn close(&self) -> Result<()> {
        self.primary.close()?;
        self.secondary.close()
    }
}
