use crate::core::error::Result;
use crate::store::directory::Directory;
use crate::util::bitvector::BitVector;

/// Per-segment deleted-docs bitmap, `_<name>_<gen>.del` (spec.md §6). A set
/// bit means the doc at that local id is deleted; absence of the file means
/// no deletions have ever been recorded for this segment.
pub struct DeletedDocs {
    bits: Option<BitVector>,
}

impl DeletedDocs {
    pub fn none() -> Self {
        DeletedDocs { bits: None }
    }

    pub fn from_bitvector(bits: BitVector) -> Self {
        DeletedDocs { bits: Some(bits) }
    }

    pub fn is_deleted(&self, doc: u32) -> bool {
        match &self.bits {
            Some(b) => b.get(doc as usize),
            None => false,
        }
    }

    pub fn delete(&mut self, doc: u32, size: u32) -> Result<()> {
        let bits = self.bits.get_or_insert_with(|| BitVector::new(size as usize));
        bits.set(doc as usize)
    }

    pub fn count_deleted(&mut self) -> u32 {
        self.bits.as_mut().map(|b| b.count() as u32).unwrap_or(0)
    }

    pub fn has_deletions(&mut self) -> bool {
        self.count_deleted() > 0
    }

    pub fn file_name(segment_name: &str, generation: u64) -> String {
        format!("{}_{}.del", segment_name, generation)
    }

    pub fn write(&mut self, directory: &dyn Directory, segment_name: &str, generation: u64) -> Result<()> {
        let bits = self
            .bits
            .as_mut()
            .expect("write() called with no deletions recorded");
        let mut out = directory.create_output(&Self::file_name(segment_name, generation))?;
        bits.write(out.as_mut())?;
        out.flush()
    }

    pub fn read(directory: &dyn Directory, segment_name: &str, generation: u64) -> Result<Self> {
        let name = Self::file_name(segment_name, generation);
        if !directory.file_exists(&name) {
            return Ok(DeletedDocs::none());
        }
        let mut input = directory.open_input(&name)?;
        let bits = BitVector::read(input.as_mut())?;
        Ok(DeletedDocs::from_bitvector(bits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::directory::RamDirectory;

    #[test]
    fn no_file_means_nothing_deleted() {
        let dir = RamDirectory::new();
        let mut dd = DeletedDocs::read(&dir, "_0", 1).unwrap();
        assert!(!dd.is_deleted(0));
        assert!(!dd.has_deletions());
    }

    #[test]
    fn write_read_round_trip() {
        let dir = RamDirectory::new();
        let mut dd = DeletedDocs::none();
        dd.delete(5, 100).unwrap();
        dd.delete(42, 100).unwrap();
        dd.write(&dir, "_0", 1).unwrap();

        let mut loaded = DeletedDocs::read(&dir, "_0", 1).unwrap();
        assert!(loaded.is_deleted(5));
        assert!(loaded.is_deleted(42));
        assert!(!loaded.is_deleted(6));
        assert_eq!(loaded.count_deleted(), 2);
    }
}
