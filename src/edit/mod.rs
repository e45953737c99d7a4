pub mod batch;
pub mod engine;
pub mod grammar;

pub use batch::{Edit, EditBatch};
pub use engine::{apply_edits, BatchReport, EditOptions};
