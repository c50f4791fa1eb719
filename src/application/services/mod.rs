mod attachment_store;
mod physical_file_registry;

pub use attachment_store::AttachmentStore;
pub use physical_file_registry::PhysicalFileRegistry;
