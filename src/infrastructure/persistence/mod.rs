mod connection;
pub mod entity_registry;
mod postgres_attachment_repository;
mod postgres_physical_file_repository;

pub use connection::PgTransaction;
pub use entity_registry::{EntityDescriptor, EntityRegistry};
pub use postgres_attachment_repository::PostgresAttachmentRepository;
pub use postgres_physical_file_repository::PostgresPhysicalFileRepository;
