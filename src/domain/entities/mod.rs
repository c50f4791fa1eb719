mod attachment;
mod physical_file;

pub use attachment::{AttachmentMetadata, LogicalAttachment};
pub use physical_file::PhysicalFile;
