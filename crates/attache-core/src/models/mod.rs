pub mod content;
pub mod file_record;
pub mod location;

pub use content::{ContentEncoding, FileContent};
pub use file_record::FileRecord;
pub use location::{LocalRoot, ResolvedLocation};
