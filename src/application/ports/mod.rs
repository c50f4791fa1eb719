mod attachment_repository;
mod physical_file_repository;
mod repository_error;
mod tx_scope;

pub use attachment_repository::AttachmentRepository;
pub use physical_file_repository::PhysicalFileRepository;
pub use repository_error::RepositoryError;
pub use tx_scope::{LifecycleToken, TxScope};
