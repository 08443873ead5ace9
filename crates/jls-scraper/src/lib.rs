pub mod dedup;
pub mod document;
pub mod extractor;
pub mod record;
pub mod shape;
pub mod writer;

mod board;

pub use board::{JobBoard, JobBoardConfig};
pub use dedup::dedupe;
pub use extractor::{extract, ExtractionError};
pub use record::JobRecord;
pub use writer::{OutputFormat, Persister};

pub use anyhow;
