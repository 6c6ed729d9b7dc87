use crate::core::error::Result;
use crate::core::types::{IndexOptions, TermVectorOptions};
use crate::store::io::{IndexInput, IndexOutput};
use std::collections::HashMap;

/// Per-field flags recorded once per segment, `_<name>.fnm` (spec.md §6).
#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub number: u32,
    pub name: String,
    pub indexed: bool,
    pub omit_norms: bool,
    pub store_term_vectors: bool,
    pub store_positions: bool,
}

#[derive(Debug, Clone, Default)]
pub struct FieldInfos {
    by_number: Vec<FieldInfo>,
    by_name: HashMap<String, u32>,
}

impl FieldInfos {
    pub fn new() -> Self {
        FieldInfos::default()
    }

    /// Returns the existing field number or allocates a new one, updating
    /// flags to the union of what's been seen so far (a field indexed with
    /// positions in one document and without in another keeps positions).
    pub fn add_or_update(
        &mut self,
        name: &str,
        indexed: bool,
        omit_norms: bool,
        tv: TermVectorOptions,
        index_options: IndexOptions,
    ) -> u32 {
        let store_positions = matches!(
            index_options,
            IndexOptions::IndexedAnalyzed
        ) || matches!(
            tv,
            TermVectorOptions::WithPositions | TermVectorOptions::WithPositionsOffsets
        );
        let store_term_vectors = !matches!(tv, TermVectorOptions::None);

        if let Some(&number) = self.by_name.get(name) {
            let info = &mut self.by_number[number as usize];
            info.indexed |= indexed;
            info.omit_norms &= omit_norms;
            info.store_term_vectors |= store_term_vectors;
            info.store_positions |= store_positions;
            return number;
        }

        let number = self.by_number.len() as u32;
        self.by_number.push(FieldInfo {
            number,
            name: name.to_string(),
            indexed,
            omit_norms,
            store_term_vectors,
            store_positions,
        });
        self.by_name.insert(name.to_string(), number);
        number
    }

    pub fn by_number(&self, number: u32) -> Option<&FieldInfo> {
        self.by_number.get(number as usize)
    }

    pub fn by_name(&self, name: &str) -> Option<&FieldInfo> {
        self.by_name.get(name).map(|&n| &self.by_number[n as usize])
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldInfo> {
        self.by_number.iter()
    }

    pub fn len(&self) -> usize {
        self.by_number.len()
    }

    pub fn write(&self, out: &mut dyn IndexOutput) -> Result<()> {
        out.write_vint(self.by_number.len() as u32)?;
        for info in &self.by_number {
            out.write_string(&info.name)?;
            let mut flags = 0u8;
            if info.indexed {
                flags |= 1;
            }
            if info.omit_norms {
                flags |= 2;
            }
            if info.store_term_vectors {
                flags |= 4;
            }
            if info.store_positions {
                flags |= 8;
            }
            out.write_byte(flags)?;
        }
        Ok(())
    }

    pub fn read(input: &mut dyn IndexInput) -> Result<FieldInfos> {
        let count = input.read_vint()? as usize;
        let mut infos = FieldInfos::new();
        for number in 0..count as u32 {
            let name = input.read_string()?;
            let flags = input.read_byte()?;
            let info = FieldInfo {
                number,
                name: name.clone(),
                indexed: flags & 1 != 0,
                omit_norms: flags & 2 != 0,
                store_term_vectors: flags & 4 != 0,
                store_positions: flags & 8 != 0,
            };
            infos.by_name.insert(name, number);
            infos.by_number.push(info);
        }
        Ok(infos)
    }
}
