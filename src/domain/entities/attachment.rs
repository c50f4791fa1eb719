use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::value_objects::{AssetType, AttachmentId, FileId, LifecycleState, Tags, Visibility};

/// Descriptive, counter-neutral attachment metadata
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct AttachmentMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Tags,
    pub visibility: Visibility,
}

/// Logical attachment aggregate root - a soft-deletable reference to one physical file
///
/// `file_id` is fixed at construction and `deleted_at` is only changed by the
/// crate's lifecycle transitions, which pair every change with a counter update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogicalAttachment {
    id: AttachmentId,
    file_id: FileId,
    asset_type: AssetType,
    metadata: AttachmentMetadata,
    deleted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl LogicalAttachment {
    /// Create new attachment in Live state
    pub(crate) fn new(file_id: FileId, asset_type: AssetType, metadata: AttachmentMetadata) -> Self {
        let now = Utc::now();
        Self {
            id: AttachmentId::new(),
            file_id,
            asset_type,
            metadata,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Reconstruct from storage (e.g., database)
    pub(crate) fn reconstruct(
        id: AttachmentId,
        file_id: FileId,
        asset_type: AssetType,
        metadata: AttachmentMetadata,
        deleted_at: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            file_id,
            asset_type,
            metadata,
            deleted_at,
            created_at,
            updated_at,
        }
    }

    /// Live -> SoftDeleted. Returns false (and changes nothing) if already deleted.
    pub(crate) fn mark_deleted(&mut self, at: DateTime<Utc>) -> bool {
        if !self.state().can_transition_to(LifecycleState::SoftDeleted) {
            return false;
        }
        self.deleted_at = Some(at);
        self.updated_at = at;
        true
    }

    /// SoftDeleted -> Live. Returns false (and changes nothing) if already live.
    pub(crate) fn mark_restored(&mut self, at: DateTime<Utc>) -> bool {
        if !self.state().can_transition_to(LifecycleState::Live) {
            return false;
        }
        self.deleted_at = None;
        self.updated_at = at;
        true
    }

    pub(crate) fn replace_metadata(&mut self, metadata: AttachmentMetadata, at: DateTime<Utc>) {
        self.metadata = metadata;
        self.updated_at = at;
    }

    pub fn state(&self) -> LifecycleState {
        if self.deleted_at.is_some() {
            LifecycleState::SoftDeleted
        } else {
            LifecycleState::Live
        }
    }

    pub fn is_live(&self) -> bool {
        self.state() == LifecycleState::Live
    }

    // Getters
    pub fn id(&self) -> &AttachmentId {
        &self.id
    }

    pub fn file_id(&self) -> &FileId {
        &self.file_id
    }

    pub fn asset_type(&self) -> AssetType {
        self.asset_type
    }

    pub fn title(&self) -> Option<&str> {
        self.metadata.title.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.metadata.description.as_deref()
    }

    pub fn tags(&self) -> &Tags {
        &self.metadata.tags
    }

    pub fn visibility(&self) -> Visibility {
        self.metadata.visibility
    }

    pub fn metadata(&self) -> &AttachmentMetadata {
        &self.metadata
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
