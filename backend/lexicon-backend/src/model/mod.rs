//! Domain types shared by the store, the external source and the resolver.

pub mod language;
pub mod lexical_record;
pub mod page;

pub use language::{LanguageCode, LanguageSelector};
pub use lexical_record::{Annotation, LexicalRecord, RelationSelection};
pub use page::PageRequest;
