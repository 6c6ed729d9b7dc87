use crate::core::error::Result;
use crate::store::directory::Directory;
use crate::store::io::{IndexInput, IndexOutput};

/// One field's term vector: per-term frequency and, when the field was
/// configured `WithPositions`, the term's position list within that
/// document (spec.md §3 term vectors).
#[derive(Debug, Clone)]
pub struct FieldTermVector {
    pub field_number: u32,
    pub terms: Vec<TermVectorEntry>,
}

#[derive(Debug, Clone)]
pub struct TermVectorEntry {
    pub text: String,
    pub freq: u32,
    pub positions: Option<Vec<u32>>,
}

/// Writes `.tvx` (one pointer per document into `.tvd`), `.tvd` (per
/// document, which fields have vectors and where in `.tvf` to find them)
/// and `.tvf` (the actual per-field term/freq/position data), spec.md §6.
/// Documents with no term-vector fields still get a `.tvx` entry pointing
/// at a zero-field `.tvd` record, keeping doc-id indexing dense.
pub struct TermVectorsWriter<'a> {
    tvx_out: &'a mut dyn IndexOutput,
    tvd_out: &'a mut dyn IndexOutput,
    tvf_out: &'a mut dyn IndexOutput,
}

impl<'a> TermVectorsWriter<'a> {
    pub fn new(
        tvx_out: &'a mut dyn IndexOutput,
        tvd_out: &'a mut dyn IndexOutput,
        tvf_out: &'a mut dyn IndexOutput,
    ) -> Self {
        TermVectorsWriter { tvx_out, tvd_out, tvf_out }
    }

    pub fn add_document(&mut self, fields: &[FieldTermVector]) -> Result<()> {
        self.tvx_out.write_vlong(self.tvd_out.position())?;

        self.tvd_out.write_vint(fields.len() as u32)?;
        for field in fields {
            let tvf_offset = self.tvf_out.position();
            self.tvd_out.write_vint(field.field_number)?;
            self.tvd_out.write_vlong(tvf_offset)?;

            self.tvf_out.write_vint(field.terms.len() as u32)?;
            for term in &field.terms {
                self.tvf_out.write_string(&term.text)?;
                self.tvf_out.write_vint(term.freq)?;
                match &term.positions {
                    Some(positions) => {
                        self.tvf_out.write_byte(1)?;
                        self.tvf_out.write_vint(positions.len() as u32)?;
                        let mut last = 0i64;
                        for &p in positions {
                            self.tvf_out.write_vint((p as i64 - last) as u32)?;
                            last = p as i64;
                        }
                    }
                    None => self.tvf_out.write_byte(0)?,
                }
            }
        }
        Ok(())
    }
}

pub struct TermVectorsReader {
    tvd_file: String,
    tvf_file: String,
    doc_pointers: Vec<u64>,
}

impl TermVectorsReader {
    pub fn open(
        directory: &dyn Directory,
        tvx_file: &str,
        tvd_file: &str,
        tvf_file: &str,
        doc_count: u32,
    ) -> Result<Self> {
        let mut tvx = directory.open_input(tvx_file)?;
        let mut doc_pointers = Vec::with_capacity(doc_count as usize);
        for _ in 0..doc_count {
            doc_pointers.push(tvx.read_vlong()?);
        }
        Ok(TermVectorsReader {
            tvd_file: tvd_file.to_string(),
            tvf_file: tvf_file.to_string(),
            doc_pointers,
        })
    }

    pub fn get(&self, directory: &dyn Directory, local_doc_id: u32) -> Result<Vec<FieldTermVector>> {
        let offset = self.doc_pointers[local_doc_id as usize];
        let mut tvd = directory.open_input(&self.tvd_file)?;
        tvd.seek(offset)?;

        let field_count = tvd.read_vint()?;
        let mut field_refs = Vec::with_capacity(field_count as usize);
        for _ in 0..field_count {
            let field_number = tvd.read_vint()?;
            let tvf_offset = tvd.read_vlong()?;
            field_refs.push((field_number, tvf_offset));
        }

        let mut tvf = directory.open_input(&self.tvf_file)?;
        let mut out = Vec::with_capacity(field_refs.len());
        for (field_number, tvf_offset) in field_refs {
            tvf.seek(tvf_offset)?;
            let term_count = tvf.read_vint()?;
            let mut terms = Vec::with_capacity(term_count as usize);
            for _ in 0..term_count {
                let text = tvf.read_string()?;
                let freq = tvf.read_vint()?;
                let has_positions = tvf.read_byte()? != 0;
                let positions = if has_positions {
                    let n = tvf.read_vint()?;
                    let mut pos = Vec::with_capacity(n as usize);
                    let mut last = 0i64;
                    for _ in 0..n {
                        last += tvf.read_vint()? as i64;
                        pos.push(last as u32);
                    }
                    Some(pos)
                } else {
                    None
                };
                terms.push(TermVectorEntry { text, freq, positions });
            }
            out.push(FieldTermVector { field_number, terms });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::directory::RamDirectory;

    #[test]
    fn round_trips_positions() {
        let dir = RamDirectory::new();
        let doc0 = vec![FieldTermVector {
            field_number: 0,
            terms: vec![
                TermVectorEntry { text: "quick".into(), freq: 1, positions: Some(vec![0]) },
                TermVectorEntry { text: "fox".into(), freq: 2, positions: Some(vec![1, 4]) },
            ],
        }];
        let doc1: Vec<FieldTermVector> = vec![];

        {
            let mut tvx = dir.create_output("_0.tvx").unwrap();
            let mut tvd = dir.create_output("_0.tvd").unwrap();
            let mut tvf = dir.create_output("_0.tvf").unwrap();
            let mut writer = TermVectorsWriter::new(tvx.as_mut(), tvd.as_mut(), tvf.as_mut());
            writer.add_document(&doc0).unwrap();
            writer.add_document(&doc1).unwrap();
            tvx.flush().unwrap();
            tvd.flush().unwrap();
            tvf.flush().unwrap();
        }

        let reader = TermVectorsReader::open(&dir, "_0.tvx", "_0.tvd", "_0.tvf", 2).unwrap();
        let got0 = reader.get(&dir, 0).unwrap();
        assert_eq!(got0.len(), 1);
        assert_eq!(got0[0].terms[1].text, "fox");
        assert_eq!(got0[0].terms[1].positions, Some(vec![1, 4]));

        let got1 = reader.get(&dir, 1).unwrap();
        assert!(got1.is_empty());
    }
}
