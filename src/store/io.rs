use crate::core::error::{Error, ErrorKind, Result};
use std::io::{Read, Seek, SeekFrom, Write};

/// Number of UTF-8 continuation bytes following `lead`, from the high bits
/// of the leading byte.
fn utf8_trailing_bytes(lead: u8) -> Result<usize> {
    if lead & 0x80 == 0 {
        Ok(0)
    } else if lead & 0xe0 == 0xc0 {
        Ok(1)
    } else if lead & 0xf0 == 0xe0 {
        Ok(2)
    } else if lead & 0xf8 == 0xf0 {
        Ok(3)
    } else {
        Err(Error::new(ErrorKind::CorruptIndex, "invalid utf8 lead byte".into()))
    }
}

/// Typed random-access reader, spec.md §4.5/§6. Concrete backends (file,
/// memory-mapped, RAM) implement `IndexInput`; `BufferedIndexInput` supplies
/// the typed encodings on top of any `Read + Seek` source.
pub trait IndexInput: Send {
    fn read_byte(&mut self) -> Result<u8>;
    fn read_bytes(&mut self, buf: &mut [u8], offset: usize, len: usize) -> Result<()>;
    fn position(&self) -> u64;
    fn seek(&mut self, pos: u64) -> Result<()>;
    fn length(&self) -> u64;
    fn clone_input(&self) -> Box<dyn IndexInput>;

    fn read_int(&mut self) -> Result<i32> {
        let mut b = [0u8; 4];
        self.read_bytes(&mut b, 0, 4)?;
        Ok(i32::from_be_bytes(b))
    }

    fn read_long(&mut self) -> Result<i64> {
        let mut b = [0u8; 8];
        self.read_bytes(&mut b, 0, 8)?;
        Ok(i64::from_be_bytes(b))
    }

    /// 1-5 bytes, 7 low bits per byte, continuation bit in the high bit,
    /// least-significant group first.
    fn read_vint(&mut self) -> Result<u32> {
        let mut shift = 0u32;
        let mut value = 0u32;
        loop {
            let b = self.read_byte()?;
            value |= ((b & 0x7f) as u32) << shift;
            if b & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
            if shift > 35 {
                return Err(Error::new(ErrorKind::CorruptIndex, "vint too long".into()));
            }
        }
    }

    fn read_vlong(&mut self) -> Result<u64> {
        let mut shift = 0u32;
        let mut value = 0u64;
        loop {
            let b = self.read_byte()?;
            value |= ((b & 0x7f) as u64) << shift;
            if b & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
            if shift > 63 {
                return Err(Error::new(ErrorKind::CorruptIndex, "vlong too long".into()));
            }
        }
    }

    /// vInt length-in-code-units prefix, then that many UTF-8 bytes directly
    /// (no byte-length prefix — the wire format carries exactly one vint).
    /// Scans byte-by-byte to find the `len`-th char boundary since the byte
    /// length isn't known up front.
    fn read_string(&mut self) -> Result<String> {
        let len = self.read_vint()? as usize;
        let mut buf = Vec::new();
        for _ in 0..len {
            let lead = self.read_byte()?;
            let extra = utf8_trailing_bytes(lead)?;
            buf.push(lead);
            for _ in 0..extra {
                buf.push(self.read_byte()?);
            }
        }
        String::from_utf8(buf).map_err(|e| Error::new(ErrorKind::CorruptIndex, format!("invalid utf8 string: {}", e)))
    }

    fn read_chars(&mut self, n_bytes: usize) -> Result<String> {
        let mut buf = vec![0u8; n_bytes];
        self.read_bytes(&mut buf, 0, n_bytes)?;
        String::from_utf8(buf).map_err(|e| Error::new(ErrorKind::CorruptIndex, e.to_string()))
    }
}

pub trait IndexOutput: Send {
    fn write_byte(&mut self, b: u8) -> Result<()>;
    fn write_bytes(&mut self, buf: &[u8]) -> Result<()>;
    fn position(&self) -> u64;
    fn flush(&mut self) -> Result<()>;

    fn write_int(&mut self, v: i32) -> Result<()> {
        self.write_bytes(&v.to_be_bytes())
    }

    fn write_long(&mut self, v: i64) -> Result<()> {
        self.write_bytes(&v.to_be_bytes())
    }

    fn write_vint(&mut self, mut v: u32) -> Result<()> {
        loop {
            if v < 0x80 {
                self.write_byte(v as u8)?;
                return Ok(());
            }
            self.write_byte(((v & 0x7f) | 0x80) as u8)?;
            v >>= 7;
        }
    }

    fn write_vlong(&mut self, mut v: u64) -> Result<()> {
        loop {
            if v < 0x80 {
                self.write_byte(v as u8)?;
                return Ok(());
            }
            self.write_byte(((v & 0x7f) | 0x80) as u8)?;
            v >>= 7;
        }
    }

    fn write_string(&mut self, s: &str) -> Result<()> {
        self.write_vint(s.chars().count() as u32)?;
        self.write_bytes(s.as_bytes())
    }

    fn write_chars(&mut self, s: &str) -> Result<()> {
        self.write_bytes(s.as_bytes())
    }
}

/// In-memory `IndexOutput`; used by `RAMDirectory` and by unit tests that
/// need a throwaway sink.
#[derive(Default)]
pub struct ByteArrayIndexOutput {
    buf: Vec<u8>,
}

impl ByteArrayIndexOutput {
    pub fn new() -> Self {
        ByteArrayIndexOutput { buf: Vec::new() }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

impl IndexOutput for ByteArrayIndexOutput {
    fn write_byte(&mut self, b: u8) -> Result<()> {
        self.buf.push(b);
        Ok(())
    }

    fn write_bytes(&mut self, buf: &[u8]) -> Result<()> {
        self.buf.extend_from_slice(buf);
        Ok(())
    }

    fn position(&self) -> u64 {
        self.buf.len() as u64
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// In-memory `IndexInput` over an owned byte buffer, shared (via `Arc`) so
/// clones are cheap and independent (own position, shared bytes).
#[derive(Clone)]
pub struct ByteArrayIndexInput {
    data: std::sync::Arc<Vec<u8>>,
    pos: u64,
}

impl ByteArrayIndexInput {
    pub fn new(data: Vec<u8>) -> Self {
        ByteArrayIndexInput {
            data: std::sync::Arc::new(data),
            pos: 0,
        }
    }
}

impl IndexInput for ByteArrayIndexInput {
    fn read_byte(&mut self) -> Result<u8> {
        if self.pos as usize >= self.data.len() {
            return Err(Error::new(ErrorKind::CorruptIndex, "read past end of buffer".into()));
        }
        let b = self.data[self.pos as usize];
        self.pos += 1;
        Ok(b)
    }

    fn read_bytes(&mut self, buf: &mut [u8], offset: usize, len: usize) -> Result<()> {
        let start = self.pos as usize;
        if start + len > self.data.len() {
            return Err(Error::new(ErrorKind::CorruptIndex, "read past end of buffer".into()));
        }
        buf[offset..offset + len].copy_from_slice(&self.data[start..start + len]);
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
        self.data.len() as u64
    }

    fn clone_input(&self) -> Box<dyn IndexInput> {
        Box::new(self.clone())
    }
}

/// Seekable file-backed `IndexInput` with a configurable-size read buffer
/// (default 1024 bytes, spec.md §4.5). Reads that fit the buffered window
/// are served by memcpy; larger reads bypass the buffer entirely.
pub struct BufferedFileInput {
    file: std::sync::Arc<std::sync::Mutex<std::fs::File>>,
    length: u64,
    buffer: Vec<u8>,
    buffer_start: u64,
    buffer_len: usize,
    pos: u64,
    buffer_size: usize,
}

const DEFAULT_BUFFER_SIZE: usize = 1024;

impl BufferedFileInput {
    pub fn open(path: &std::path::Path) -> Result<Self> {
        Self::open_with_buffer(path, DEFAULT_BUFFER_SIZE)
    }

    pub fn open_with_buffer(path: &std::path::Path, buffer_size: usize) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let length = file.metadata()?.len();
        Ok(BufferedFileInput {
            file: std::sync::Arc::new(std::sync::Mutex::new(file)),
            length,
            buffer: vec![0u8; buffer_size.max(1)],
            buffer_start: 0,
            buffer_len: 0,
            pos: 0,
            buffer_size: buffer_size.max(1),
        })
    }

    fn refill(&mut self) -> Result<()> {
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start(self.pos))?;
        let to_read = self.buffer_size.min((self.length - self.pos) as usize);
        let mut read_total = 0usize;
        while read_total < to_read {
            let n = file.read(&mut self.buffer[read_total..to_read])?;
            if n == 0 {
                break;
            }
            read_total += n;
        }
        self.buffer_start = self.pos;
        self.buffer_len = read_total;
        Ok(())
    }

    fn in_buffer(&self, len: usize) -> bool {
        self.pos >= self.buffer_start
            && self.pos + len as u64 <= self.buffer_start + self.buffer_len as u64
    }
}

impl IndexInput for BufferedFileInput {
    fn read_byte(&mut self) -> Result<u8> {
        if !self.in_buffer(1) {
            self.refill()?;
        }
        if !self.in_buffer(1) {
            return Err(Error::new(ErrorKind::CorruptIndex, "read past end of file".into()));
        }
        let offset = (self.pos - self.buffer_start) as usize;
        self.pos += 1;
        Ok(self.buffer[offset])
    }

    fn read_bytes(&mut self, buf: &mut [u8], offset: usize, len: usize) -> Result<()> {
        if self.in_buffer(len) {
            let start = (self.pos - self.buffer_start) as usize;
            buf[offset..offset + len].copy_from_slice(&self.buffer[start..start + len]);
            self.pos += len as u64;
            return Ok(());
        }

        if len < self.buffer_size {
            self.refill()?;
            if self.in_buffer(len) {
                let start = (self.pos - self.buffer_start) as usize;
                buf[offset..offset + len].copy_from_slice(&self.buffer[start..start + len]);
                self.pos += len as u64;
                return Ok(());
            }
        }

        // Bypass the buffer for large reads.
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start(self.pos))?;
        file.read_exact(&mut buf[offset..offset + len])?;
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
        Box::new(BufferedFileInput {
            file: self.file.clone(),
            length: self.length,
            buffer: vec![0u8; self.buffer_size],
            buffer_start: 0,
            buffer_len: 0,
            pos: self.pos,
            buffer_size: self.buffer_size,
        })
    }
}

/// Sequential file-backed `IndexOutput`. `createOutput` semantics
/// (overwrite, no partial-update) live in `Directory::create_output`.
pub struct BufferedFileOutput {
    file: std::io::BufWriter<std::fs::File>,
    pos: u64,
}

impl BufferedFileOutput {
    pub fn create(path: &std::path::Path) -> Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(BufferedFileOutput {
            file: std::io::BufWriter::new(file),
            pos: 0,
        })
    }

    pub fn sync(&mut self) -> Result<()> {
        self.file.flush()?;
        self.file.get_ref().sync_all()?;
        Ok(())
    }
}

impl IndexOutput for BufferedFileOutput {
    fn write_byte(&mut self, b: u8) -> Result<()> {
        self.file.write_all(&[b])?;
        self.pos += 1;
        Ok(())
    }

    fn write_bytes(&mut self, buf: &[u8]) -> Result<()> {
        self.file.write_all(buf)?;
        self.pos += buf.len() as u64;
        Ok(())
    }

    fn position(&self) -> u64 {
        self.pos
    }

    fn flush(&mut self) -> Result<()> {
        self.file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vint_vlong_round_trip() {
        let mut out = ByteArrayIndexOutput::new();
        for v in [0u32, 1, 127, 128, 16384, u32::MAX] {
            out.write_vint(v).unwrap();
        }
        let mut input = ByteArrayIndexInput::new(out.into_bytes());
        for v in [0u32, 1, 127, 128, 16384, u32::MAX] {
            assert_eq!(input.read_vint().unwrap(), v);
        }
    }

    #[test]
    fn vlong_round_trip() {
        let mut out = ByteArrayIndexOutput::new();
        let values: [u64; 5] = [0, 300, u32::MAX as u64, u64::MAX / 2, u64::MAX];
        for v in values {
            out.write_vlong(v).unwrap();
        }
        let mut input = ByteArrayIndexInput::new(out.into_bytes());
        for v in values {
            assert_eq!(input.read_vlong().unwrap(), v);
        }
    }

    #[test]
    fn string_round_trips_unicode() {
        let mut out = ByteArrayIndexOutput::new();
        out.write_string("héllo wörld 日本語").unwrap();
        let mut input = ByteArrayIndexInput::new(out.into_bytes());
        assert_eq!(input.read_string().unwrap(), "héllo wörld 日本語");
    }

    #[test]
    fn int_long_big_endian_round_trip() {
        let mut out = ByteArrayIndexOutput::new();
        out.write_int(-12345).unwrap();
        out.write_long(-9_000_000_000_i64).unwrap();
        let mut input = ByteArrayIndexInput::new(out.into_bytes());
        assert_eq!(input.read_int().unwrap(), -12345);
        assert_eq!(input.read_long().unwrap(), -9_000_000_000_i64);
    }

    #[test]
    fn buffered_file_input_crosses_buffer_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.bin");
        {
            let mut out = BufferedFileOutput::create(&path).unwrap();
            for i in 0u32..2000 {
                out.write_int(i as i32).unwrap();
            }
            out.sync().unwrap();
        }
        let mut input = BufferedFileInput::open_with_buffer(&path, 64).unwrap();
        for i in 0u32..2000 {
            assert_eq!(input.read_int().unwrap(), i as i32);
        }
    }
}
