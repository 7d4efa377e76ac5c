//! Service layer: dialogue generation and the document heuristics it relies on.

pub mod dates;
pub mod dialogue;
pub mod grouping;

pub use dates::{normalize_date, DatePrecision, NormalizedDate};
pub use dialogue::{
    DialogueGenerator, GenerationError, GenerationSettings, ProgressFn,
};
pub use grouping::{group_documents, DocumentGroup};
