use serde::{Deserialize, Serialize};

/// Non-negative document identifier, local to whichever segment or reader
/// assigned it (spec.md §3). Global ids in a multi-segment reader are
/// `segment_base + local`, computed by `index::reader::DirectoryReader`.
pub type DocId = u32;

pub const NO_MORE_DOCS: DocId = u32::MAX;

/// `(field, text)` pair, ordered lexicographically by `(field, text)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Term {
    pub field: String,
    pub text: String,
}

impl Term {
    pub fn new(field: impl Into<String>, text: impl Into<String>) -> Self {
        Term {
            field: field.into(),
            text: text.into(),
        }
    }
}

/// Whether and how a field's token stream is indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexOptions {
    NotIndexed,
    IndexedUnanalyzed,
    IndexedAnalyzed,
}

/// Term-vector detail level stored alongside a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TermVectorOptions {
    None,
    Yes,
    WithPositions,
    WithOffsets,
    WithPositionsOffsets,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StoredValue {
    Text(String),
    Bytes(Vec<u8>),
}

/// One field occurrence. A document may repeat a field name across several
/// `Field` values; all instances share one analyzer-produced token stream
/// for indexing and one concatenated stored value (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub stored_value: Option<StoredValue>,
    pub index_options: IndexOptions,
    pub term_vector: TermVectorOptions,
    pub omit_norms: bool,
    pub boost: f32,
}

impl Field {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        Field {
            name: name.into(),
            stored_value: Some(StoredValue::Text(value)),
            index_options: IndexOptions::IndexedAnalyzed,
            term_vector: TermVectorOptions::None,
            omit_norms: false,
            boost: 1.0,
        }
    }

    pub fn keyword(name: impl Into<String>, value: impl Into<String>) -> Self {
        Field {
            name: name.into(),
            stored_value: Some(StoredValue::Text(value.into())),
            index_options: IndexOptions::IndexedUnanalyzed,
            term_vector: TermVectorOptions::None,
            omit_norms: true,
            boost: 1.0,
        }
    }

    pub fn stored_only(name: impl Into<String>, value: impl Into<String>) -> Self {
        Field {
            name: name.into(),
            stored_value: Some(StoredValue::Text(value.into())),
            index_options: IndexOptions::NotIndexed,
            term_vector: TermVectorOptions::None,
            omit_norms: true,
            boost: 1.0,
        }
    }

    pub fn indexed_text(mut self) -> Self {
        self.index_options = IndexOptions::IndexedAnalyzed;
        self
    }

    pub fn with_term_vectors(mut self, tv: TermVectorOptions) -> Self {
        self.term_vector = tv;
        self
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }
}

/// Ordered sequence of fields. Field order is preserved since scorers and
/// stored-field retrieval rely on consistent per-document iteration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    pub fields: Vec<Field>,
}

impl Document {
    pub fn new() -> Self {
        Document { fields: Vec::new() }
    }

    pub fn add(&mut self, field: Field) -> &mut Self {
        self.fields.push(field);
        self
    }

    pub fn get_all(&self, name: &str) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(move |f| f.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Concatenation of every stored text value sharing `name`, the value
    /// analysis sees for indexing (spec.md §3 "one concatenated stored
    /// value").
    pub fn concatenated_text(&self, name: &str) -> String {
        self.get_all(name)
            .filter_map(|f| match &f.stored_value {
                Some(StoredValue::Text(s)) => Some(s.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}
