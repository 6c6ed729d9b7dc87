pub mod deletions;
pub mod field_infos;
pub mod norms;
pub mod postings;
pub mod segment_info;
pub mod stored_fields;
pub mod term_dict;
pub mod term_vectors;

pub use deletions::DeletedDocs;
pub use field_infos::{FieldInfo, FieldInfos};
pub use postings::{PostingBuilder, PostingsEnum, PostingsWriter};
pub use segment_info::{IndexCommit, SegmentInfo, SegmentInfos};
pub use stored_fields::{StoredFieldsReader, StoredFieldsWriter};
pub use term_dict::{TermDictionaryReader, TermDictionaryWriter, TermInfo};
pub use term_vectors::{FieldTermVector, TermVectorEntry, TermVectorsReader, TermVectorsWriter};
