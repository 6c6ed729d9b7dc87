use crate::core::error::{Error, ErrorKind, Result};
use crate::store::directory::Directory;
use crate::store::io::{ByteArrayIndexOutput, IndexInput, IndexOutput};
use std::collections::HashMap;

/// Negative sentinel marking the post-3.0 compound file format (spec.md
/// §4.6, §9 Open Question 2): any non-negative leading format code is
/// rejected as corrupt since this crate never writes the legacy pre-3.0
/// layout. Stored as a VInt's raw bit pattern reinterpreted as `i32`, so the
/// format code shares `readVInt`/`writeVInt` with everything else.
const FORMAT_CURRENT: i32 = -2;

struct Entry {
    offset: u64,
    length: u64,
}

/// Builds a `.cfs` compound file: table of contents first, then sub-files
/// concatenated in entry order.
pub struct CompoundFileWriter<'a> {
    directory: &'a dyn Directory,
    name: String,
    entries: Vec<(String, Vec<u8>)>,
}

impl<'a> CompoundFileWriter<'a> {
    pub fn new(directory: &'a dyn Directory, name: impl Into<String>) -> Self {
        CompoundFileWriter {
            directory,
            name: name.into(),
            entries: Vec::new(),
        }
    }

    pub fn add_file(&mut self, sub_file_name: impl Into<String>, bytes: Vec<u8>) {
        self.entries.push((sub_file_name.into(), bytes));
    }

    pub fn finish(self) -> Result<()> {
        let mut out = self.directory.create_output(&self.name)?;
        out.write_vint(FORMAT_CURRENT as u32)?;
        out.write_vint(self.entries.len() as u32)?;

        // Offsets are relative to the start of the sub-file region, which
        // begins right after the table of contents. Encode the TOC into a
        // side buffer first so its exact length is known before the first
        // absolute offset is computed.
        let mut toc_buf = ByteArrayIndexOutput::new();
        let mut offset = 0u64;
        for (sub_name, bytes) in &self.entries {
            toc_buf.write_long(offset as i64)?;
            toc_buf.write_string(sub_name)?;
            offset += bytes.len() as u64;
        }

        out.write_bytes(&toc_buf.into_bytes())?;
        for (_, bytes) in &self.entries {
            out.write_bytes(bytes)?;
        }
        out.flush()?;
        Ok(())
    }
}

/// Bounded view `[offset, offset + length)` of a cloned parent `IndexInput`;
/// reads past the bounded end fail.
pub struct CsIndexInput {
    parent: Box<dyn IndexInput>,
    base_offset: u64,
    length: u64,
    pos: u64,
}

impl CsIndexInput {
    fn new(parent: Box<dyn IndexInput>, base_offset: u64, length: u64) -> Self {
        CsIndexInput {
            parent,
            base_offset,
            length,
            pos: 0,
        }
    }
}

impl IndexInput for CsIndexInput {
    fn read_byte(&mut self) -> Result<u8> {
        if self.pos >= self.length {
            return Err(Error::new(ErrorKind::OutOfBounds, "read past compound sub-file end".into()));
        }
        self.parent.seek(self.base_offset + self.pos)?;
        let b = self.parent.read_byte()?;
        self.pos += 1;
        Ok(b)
    }

    fn read_bytes(&mut self, buf: &mut [u8], offset: usize, len: usize) -> Result<()> {
        if self.pos + len as u64 > self.length {
            return Err(Error::new(ErrorKind::OutOfBounds, "read past compound sub-file end".into()));
        }
        self.parent.seek(self.base_offset + self.pos)?;
        self.parent.read_bytes(buf, offset, len)?;
        self.pos += len as u64;
        Ok(())
    }

    fn position(&self) -> u64 {
        self.pos
    }

    fn seek(&mut self, pos: u64) -> Result<()> {
        self.pos = pos;
        Ok(())
    }

    fn length(&self) -> u64 {
        self.length
    }

    fn clone_input(&self) -> Box<dyn IndexInput> {
        Box::new(CsIndexInput {
            parent: self.parent.clone_input(),
            base_offset: self.base_offset,
            length: self.length,
            pos: self.pos,
        })
    }
}

/// Reads the table of contents of a `.cfs` file and opens bounded views
/// onto its sub-files. Holds a template `IndexInput` that every sub-file
/// view clones independently (its own buffer, its own seek position).
pub struct CompoundFileReader {
    parent_len: u64,
    entries: HashMap<String, Entry>,
    template: Box<dyn IndexInput>,
}

impl CompoundFileReader {
    pub fn open(directory: &dyn Directory, name: &str) -> Result<Self> {
        let mut input = directory.open_input(name)?;
        let parent_len = input.length();

        let format = input.read_vint()? as i32;
        if format >= 0 {
            return Err(Error::new(
                ErrorKind::CorruptIndex,
                "legacy pre-3.0 compound file format is not supported".to_string(),
            ));
        }
        if format != FORMAT_CURRENT {
            return Err(Error::new(
                ErrorKind::CorruptIndex,
                format!("unknown compound file format sentinel {}", format),
            ));
        }

        let count = input.read_vint()? as usize;
        let mut offsets = Vec::with_capacity(count);
        for _ in 0..count {
            let offset = input.read_long()? as u64;
            let sub_name = input.read_string()?;
            offsets.push((sub_name, offset));
        }

        let toc_end = input.position();
        let mut entries = HashMap::new();
        for i in 0..count {
            let (sub_name, offset) = &offsets[i];
            let next_offset = if i + 1 < count {
                offsets[i + 1].1
            } else {
                parent_len - toc_end
            };
            entries.insert(
                sub_name.clone(),
                Entry {
                    offset: toc_end + offset,
                    length: next_offset - offset,
                },
            );
        }

        Ok(CompoundFileReader {
            parent_len,
            entries,
            template: input,
        })
    }

    pub fn list(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn open_sub_file(&self, sub_file_name: &str) -> Result<Box<dyn IndexInput>> {
        let entry = self
            .entries
            .get(sub_file_name)
            .ok_or_else(|| Error::new(ErrorKind::NotFound, format!("no such sub-file: {}", sub_file_name)))?;
        Ok(Box::new(CsIndexInput::new(
            self.template.clone_input(),
            entry.offset,
            entry.length,
        )))
    }

    pub fn total_length(&self) -> u64 {
        self.parent_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::directory::RamDirectory;

    #[test]
    fn round_trips_multiple_sub_files() {
        let dir = RamDirectory::new();
        let mut writer = CompoundFileWriter::new(&dir, "_0.cfs");
        writer.add_file("_0.fnm", b"field-infos".to_vec());
        writer.add_file("_0.tis", b"term-dictionary-bytes".to_vec());
        writer.finish().unwrap();

        let reader = CompoundFileReader::open(&dir, "_0.cfs").unwrap();
        let mut names = reader.list();
        names.sort();
        assert_eq!(names, vec!["_0.fnm".to_string(), "_0.tis".to_string()]);

        let mut fnm = reader.open_sub_file("_0.fnm").unwrap();
        let mut buf = vec![0u8; "field-infos".len()];
        fnm.read_bytes(&mut buf, 0, buf.len()).unwrap();
        assert_eq!(buf, b"field-infos");

        let mut tis = reader.open_sub_file("_0.tis").unwrap();
        let mut buf2 = vec![0u8; "term-dictionary-bytes".len()];
        tis.read_bytes(&mut buf2, 0, buf2.len()).unwrap();
        assert_eq!(buf2, b"term-dictionary-bytes");
    }

    #[test]
    fn reading_past_sub_file_bound_fails() {
        let dir = RamDirectory::new();
        let mut writer = CompoundFileWriter::new(&dir, "_1.cfs");
        writer.add_file("_1.fnm", b"ab".to_vec());
        writer.add_file("_1.tis", b"cdef".to_vec());
        writer.finish().unwrap();

        let reader = CompoundFileReader::open(&dir, "_1.cfs").unwrap();
        let mut fnm = reader.open_sub_file("_1.fnm").unwrap();
        let mut buf = [0u8; 3];
        assert!(fnm.read_bytes(&mut buf, 0, 3).is_err());
    }
}
