use crate::core::error::{Error, ErrorKind, Result};
use crate::store::directory::Directory;
use std::collections::HashMap;

/// One segment's metadata as recorded in a `segments_N` commit point
/// (spec.md §3 Segment / SegmentInfos).
#[derive(Debug, Clone)]
pub struct SegmentInfo {
    /// Base-36 segment name, e.g. `_0`, `_a3`.
    pub name: String,
    /// Dense doc ids `[0, doc_count)` were assigned at flush time; doc_count
    /// never shrinks except by merge (a brand new segment replacing this
    /// one).
    pub doc_count: u32,
    pub del_count: u32,
    /// Current deletions-file generation; `0` means no `.del_N` file has
    /// been written yet for this segment.
    pub del_gen: u64,
    pub size_in_bytes: u64,
    pub is_compound_file: bool,
}

impl SegmentInfo {
    pub fn live_docs_ratio(&self) -> f64 {
        if self.doc_count == 0 {
            return 1.0;
        }
        (self.doc_count - self.del_count) as f64 / self.doc_count as f64
    }

    pub fn has_deletions(&self) -> bool {
        self.del_count > 0
    }

    pub fn del_file_name(&self) -> String {
        format!("{}_{}.del", self.name, self.del_gen)
    }
}

/// Ordered list of segments forming one commit point, plus a monotonically
/// increasing generation number and optional user commit data (spec.md §3).
#[derive(Debug, Clone, Default)]
pub struct SegmentInfos {
    pub generation: u64,
    pub segments: Vec<SegmentInfo>,
    pub user_data: HashMap<String, String>,
}

const SEGMENTS_MAGIC: i32 = -0x5a5a;

impl SegmentInfos {
    pub fn new() -> Self {
        SegmentInfos::default()
    }

    pub fn total_doc_count(&self) -> u32 {
        self.segments.iter().map(|s| s.doc_count).sum()
    }

    pub fn total_size_bytes(&self) -> u64 {
        self.segments.iter().map(|s| s.size_in_bytes).sum()
    }

    pub fn file_name(generation: u64) -> String {
        format!("segments_{}", radix36(generation))
    }

    /// Scans the directory and picks the highest generation whose
    /// `segments_N` passes the magic/version check; falls back to the
    /// previous generation if the highest is truncated/corrupt (spec.md
    /// §4.1 failure semantics, §8 scenario 3).
    pub fn find_latest_generation(directory: &dyn Directory) -> Result<Option<u64>> {
        let names = directory.list_all()?;
        let mut generations: Vec<u64> = names
            .iter()
            .filter_map(|n| n.strip_prefix("segments_"))
            .filter_map(|g| u64::from_str_radix(g, 36).ok())
            .collect();
        generations.sort_unstable_by(|a, b| b.cmp(a));

        for gen in generations {
            let name = Self::file_name(gen);
            match Self::read(directory, &name) {
                Ok(infos) => return Ok(Some(infos.generation)),
                Err(_) => continue,
            }
        }
        Ok(None)
    }

    pub fn load_latest(directory: &dyn Directory) -> Result<SegmentInfos> {
        match Self::find_latest_generation(directory)? {
            Some(gen) => Self::read(directory, &Self::file_name(gen)),
            None => Ok(SegmentInfos::new()),
        }
    }

    pub fn read(directory: &dyn Directory, name: &str) -> Result<SegmentInfos> {
        let mut input = directory.open_input(name)?;
        let magic = input.read_int()?;
        if magic != SEGMENTS_MAGIC {
            return Err(Error::new(ErrorKind::CorruptIndex, "bad segments_N magic".into()));
        }
        let generation = input.read_vlong()?;
        let seg_count = input.read_vint()? as usize;
        let mut segments = Vec::with_capacity(seg_count);
        for _ in 0..seg_count {
            let name = input.read_string()?;
            let doc_count = input.read_vint()?;
            let del_count = input.read_vint()?;
            let del_gen = input.read_vlong()?;
            let size_in_bytes = input.read_vlong()?;
            let is_compound_file = input.read_byte()? != 0;
            segments.push(SegmentInfo {
                name,
                doc_count,
                del_count,
                del_gen,
                size_in_bytes,
                is_compound_file,
            });
        }
        let user_data_count = input.read_vint()? as usize;
        let mut user_data = HashMap::with_capacity(user_data_count);
        for _ in 0..user_data_count {
            let k = input.read_string()?;
            let v = input.read_string()?;
            user_data.insert(k, v);
        }

        Ok(SegmentInfos {
            generation,
            segments,
            user_data,
        })
    }

    /// Atomic commit protocol step 2 (spec.md §4.1): write to a temp name,
    /// sync, then the caller renames — `Directory` has no native rename, so
    /// durability here relies on `create_output` overwriting atomically
    /// from readers' point of view and `sync` flushing before the new
    /// generation number is published anywhere.
    pub fn write(&self, directory: &dyn Directory) -> Result<String> {
        let name = Self::file_name(self.generation);
        let mut out = directory.create_output(&name)?;
        out.write_int(SEGMENTS_MAGIC)?;
        out.write_vlong(self.generation)?;
        out.write_vint(self.segments.len() as u32)?;
        for seg in &self.segments {
            out.write_string(&seg.name)?;
            out.write_vint(seg.doc_count)?;
            out.write_vint(seg.del_count)?;
            out.write_vlong(seg.del_gen)?;
            out.write_vlong(seg.size_in_bytes)?;
            out.write_byte(if seg.is_compound_file { 1 } else { 0 })?;
        }
        out.write_vint(self.user_data.len() as u32)?;
        for (k, v) in &self.user_data {
            out.write_string(k)?;
            out.write_string(v)?;
        }
        out.flush()?;
        directory.sync(&[name.clone()])?;
        Ok(name)
    }

    /// Every file referenced by this commit: per-segment files plus the
    /// `segments_N` itself, used by the deletion policy to decide what is
    /// safe to unlink.
    pub fn referenced_files(&self) -> Vec<String> {
        let mut files = vec![Self::file_name(self.generation)];
        for seg in &self.segments {
            if seg.is_compound_file {
                files.push(format!("{}.cfs", seg.name));
            } else {
                for ext in ["fnm", "tis", "tii", "frq", "prx", "fdt", "fdx", "nrm"] {
                    files.push(format!("{}.{}", seg.name, ext));
                }
            }
            if seg.has_deletions() {
                files.push(seg.del_file_name());
            }
        }
        files
    }
}

fn radix36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut buf = Vec::new();
    while n > 0 {
        buf.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    buf.reverse();
    String::from_utf8(buf).unwrap()
}

/// An `IndexCommit`: a named `segments_N` plus the files it references
/// (spec.md §3 IndexCommit, §4.4). `delete()` marks it for removal; the
/// owning deletion-policy machinery decides whether any file is actually
/// unlinked (a file referenced by a still-live commit or reader survives).
pub struct IndexCommit {
    pub generation: u64,
    pub segments_file_name: String,
    pub files: Vec<String>,
    pub user_data: HashMap<String, String>,
}

impl IndexCommit {
    pub fn from_infos(infos: &SegmentInfos) -> Self {
        IndexCommit {
            generation: infos.generation,
            segments_file_name: SegmentInfos::file_name(infos.generation),
            files: infos.referenced_files(),
            user_data: infos.user_data.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::directory::RamDirectory;

    #[test]
    fn write_read_round_trip() {
        let dir = RamDirectory::new();
        let mut infos = SegmentInfos::new();
        infos.generation = 1;
        infos.segments.push(SegmentInfo {
            name: "_0".to_string(),
            doc_count: 5,
            del_count: 1,
            del_gen: 2,
            size_in_bytes: 1024,
            is_compound_file: true,
        });
        infos.write(&dir).unwrap();

        let loaded = SegmentInfos::read(&dir, &SegmentInfos::file_name(1)).unwrap();
        assert_eq!(loaded.generation, 1);
        assert_eq!(loaded.segments.len(), 1);
        assert_eq!(loaded.segments[0].doc_count, 5);
    }

    #[test]
    fn find_latest_generation_picks_highest_valid() {
        let dir = RamDirectory::new();
        for gen in [1u64, 2, 3] {
            let mut infos = SegmentInfos::new();
            infos.generation = gen;
            infos.write(&dir).unwrap();
        }
        assert_eq!(SegmentInfos::find_latest_generation(&dir).unwrap(), Some(3));
    }

    #[test]
    fn corrupt_highest_generation_falls_back() {
        let dir = RamDirectory::new();
        let mut infos = SegmentInfos::new();
        infos.generation = 1;
        infos.write(&dir).unwrap();

        // Simulate a crash mid-write of segments_2: garbage bytes, no magic.
        let mut out = dir.create_output("segments_2").unwrap();
        out.write_bytes(&[1, 2, 3]).unwrap();
        out.flush().unwrap();

        assert_eq!(SegmentInfos::find_latest_generation(&dir).unwrap(), Some(1));
    }
}
