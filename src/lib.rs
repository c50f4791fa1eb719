//! # asset_store - Reference-Counted Asset Storage
//!
//! A content-addressed storage layer that keeps a reference counter on every
//! physical upload consistent with the logical attachments pointing at it.
//!
//! ## Architecture Layers
//!
//! - **Domain**: Entities (`PhysicalFile`, `LogicalAttachment`), value objects, domain errors
//! - **Application**: Ports (repository interfaces, transaction scope) and services
//! - **Infrastructure**: PostgreSQL and in-memory adapters, entity registry
//!
//! ## Key Features
//!
//! - Checksum-deduplicated physical files shared by many attachments
//! - Soft-delete and restore transitions that are the only counter mutators
//! - Explicit `TxScope` so every caller chooses transactional or independent writes
//! - Read scoping that hides soft-deleted attachments
//!
//! ## Example Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use asset_store::application::dto::{NewAttachment, NewPhysicalFile};
//! use asset_store::application::ports::TxScope;
//! use asset_store::application::services::{AttachmentStore, PhysicalFileRegistry};
//! use asset_store::domain::value_objects::{AssetType, StorageProvider};
//! use asset_store::infrastructure::memory::InMemoryAssetStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = Arc::new(InMemoryAssetStore::new());
//! let registry = PhysicalFileRegistry::new(Arc::clone(&backend));
//! let store = AttachmentStore::shared(Arc::clone(&backend));
//!
//! let upload = NewPhysicalFile {
//!     storage_provider: StorageProvider::S3,
//!     object_key: "tours/hero.jpg".to_string(),
//!     public_url: "https://cdn.example.com/tours/hero.jpg".to_string(),
//!     content_type: "image/jpeg".to_string(),
//!     file_size: 2048,
//!     checksum: "ab".repeat(32),
//! };
//!
//! let mut tx = backend.begin().await;
//! let (file, _created) = registry.resolve(upload, TxScope::WithinTransaction(&mut tx)).await?;
//! let attachment = store
//!     .create(
//!         NewAttachment::new(*file.id(), AssetType::Image),
//!         TxScope::WithinTransaction(&mut tx),
//!     )
//!     .await?;
//! tx.commit();
//!
//! store.soft_delete(&attachment, TxScope::NoTransaction).await?;
//! # Ok(())
//! # }
//! ```

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use application::{dto, ports, services};
pub use config::Config;
pub use domain::errors as domain_errors;
pub use domain::{entities, value_objects};
