use crate::core::error::Result;
use crate::core::types::{Document, Field, IndexOptions, StoredValue, TermVectorOptions};
use crate::store::directory::Directory;
use crate::store::io::{IndexInput, IndexOutput};

/// `.fdx`: one 8-byte-equivalent (vlong) pointer into `.fdt` per document,
/// indexed by local doc id (spec.md §4.6 stored fields index).
pub struct StoredFieldsWriter<'a> {
    fdt_out: &'a mut dyn IndexOutput,
    fdx_out: &'a mut dyn IndexOutput,
}

impl<'a> StoredFieldsWriter<'a> {
    pub fn new(fdt_out: &'a mut dyn IndexOutput, fdx_out: &'a mut dyn IndexOutput) -> Self {
        StoredFieldsWriter { fdt_out, fdx_out }
    }

    /// Appends one document's stored fields to `.fdt` and records its
    /// start offset in `.fdx`. Must be called once per doc id, in order.
    pub fn add_document(&mut self, doc: &Document) -> Result<()> {
        self.fdx_out.write_vlong(self.fdt_out.position())?;

        let stored: Vec<&Field> = doc
            .fields
            .iter()
            .filter(|f| f.stored_value.is_some())
            .collect();
        self.fdt_out.write_vint(stored.len() as u32)?;
        for field in stored {
            self.fdt_out.write_string(&field.name)?;
            let flags = field_flags(field);
            self.fdt_out.write_byte(flags)?;
            match field.stored_value.as_ref().unwrap() {
                StoredValue::Text(s) => {
                    self.fdt_out.write_byte(0)?;
                    self.fdt_out.write_string(s)?;
                }
                StoredValue::Bytes(b) => {
                    self.fdt_out.write_byte(1)?;
                    self.fdt_out.write_vint(b.len() as u32)?;
                    self.fdt_out.write_bytes(b)?;
                }
            }
        }
        Ok(())
    }
}

fn field_flags(field: &Field) -> u8 {
    let mut flags = 0u8;
    if !matches!(field.index_options, IndexOptions::NotIndexed) {
        flags |= 1;
    }
    if !matches!(field.term_vector, TermVectorOptions::None) {
        flags |= 2;
    }
    flags
}

/// Random-access reader over `.fdt`/`.fdx`, used by `document(doc_id)`
/// (spec.md §4.6). Each lookup opens a fresh `.fdt` cursor positioned via
/// the `.fdx` pointer — cheap since `Directory::open_input` clones share
/// the underlying file handle.
pub struct StoredFieldsReader {
    fdt_file: String,
    doc_pointers: Vec<u64>,
}

impl StoredFieldsReader {
    pub fn open(directory: &dyn Directory, fdt_file: &str, fdx_file: &str, doc_count: u32) -> Result<Self> {
        let mut fdx = directory.open_input(fdx_file)?;
        let mut doc_pointers = Vec::with_capacity(doc_count as usize);
        for _ in 0..doc_count {
            doc_pointers.push(fdx.read_vlong()?);
        }
        Ok(StoredFieldsReader {
            fdt_file: fdt_file.to_string(),
            doc_pointers,
        })
    }

    pub fn document(&self, directory: &dyn Directory, local_doc_id: u32) -> Result<Document> {
        let offset = self.doc_pointers[local_doc_id as usize];
        let mut fdt = directory.open_input(&self.fdt_file)?;
        fdt.seek(offset)?;

        let field_count = fdt.read_vint()?;
        let mut doc = Document::new();
        for _ in 0..field_count {
            let name = fdt.read_string()?;
            let flags = fdt.read_byte()?;
            let value_kind = fdt.read_byte()?;
            let stored_value = if value_kind == 0 {
                StoredValue::Text(fdt.read_string()?)
            } else {
                let len = fdt.read_vint()? as usize;
                let mut buf = vec![0u8; len];
                fdt.read_bytes(&mut buf, 0, len)?;
                StoredValue::Bytes(buf)
            };

            let index_options = if flags & 1 != 0 {
                IndexOptions::IndexedAnalyzed
            } else {
                IndexOptions::NotIndexed
            };
            doc.add(Field {
                name,
                stored_value: Some(stored_value),
                index_options,
                term_vector: if flags & 2 != 0 {
                    TermVectorOptions::Yes
                } else {
                    TermVectorOptions::None
                },
                omit_norms: false,
                boost: 1.0,
            });
        }
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::directory::RamDirectory;

    #[test]
    fn round_trips_several_documents() {
        let dir = RamDirectory::new();
        let docs = vec![
            {
                let mut d = Document::new();
                d.add(Field::text("title", "hello world"));
                d.add(Field::stored_only("id", "1"));
                d
            },
            {
                let mut d = Document::new();
                d.add(Field::text("title", "second document"));
                d
            },
        ];

        {
            let mut fdt_out = dir.create_output("_0.fdt").unwrap();
            let mut fdx_out = dir.create_output("_0.fdx").unwrap();
            let mut writer = StoredFieldsWriter::new(fdt_out.as_mut(), fdx_out.as_mut());
            for d in &docs {
                writer.add_document(d).unwrap();
            }
            fdt_out.flush().unwrap();
            fdx_out.flush().unwrap();
        }

        let reader = StoredFieldsReader::open(&dir, "_0.fdt", "_0.fdx", docs.len() as u32).unwrap();
        let doc0 = reader.document(&dir, 0).unwrap();
        assert_eq!(doc0.get("title").unwrap().stored_value, Some(StoredValue::Text("hello world".into())));
        assert_eq!(doc0.get("id").unwrap().stored_value, Some(StoredValue::Text("1".into())));

        let doc1 = reader.document(&dir, 1).unwrap();
        assert_eq!(doc1.fields.len(), 1);
        assert_eq!(doc1.get("title").unwrap().stored_value, Some(StoredValue::Text("second document".into())));
    }
}
