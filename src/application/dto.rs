use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::{
    entities::LogicalAttachment,
    value_objects::{AssetType, AttachmentId, FileId, LifecycleState, StorageProvider, Tags, Visibility},
};

/// Largest page a single `find` returns
pub const MAX_PAGE_SIZE: i64 = 1000;

/// Object keys are relative and free of control characters
static OBJECT_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^/\x00-\x1f\x7f][^\x00-\x1f\x7f]*$").expect("object key pattern compiles")
});

/// `type/subtype` with optional parameters
static CONTENT_TYPE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9!#$&^_.+-]*/[A-Za-z0-9][A-Za-z0-9!#$&^_.+-]*(\s*;.*)?$")
        .expect("content type pattern compiles")
});

/// Fields reported by the object-storage client after an upload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewPhysicalFile {
    pub storage_provider: StorageProvider,
    #[validate(length(min = 1, max = 1024), regex(path = *OBJECT_KEY_RE))]
    pub object_key: String,
    #[validate(url, length(max = 2048))]
    pub public_url: String,
    #[validate(length(min = 3, max = 255), regex(path = *CONTENT_TYPE_RE))]
    pub content_type: String,
    #[validate(range(min = 0))]
    pub file_size: i64,
    /// SHA-256 hex digest
    pub checksum: String,
}

/// Request to attach one physical file to a business record
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewAttachment {
    pub file_id: FileId,
    pub asset_type: AssetType,
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub visibility: Visibility,
}

impl NewAttachment {
    pub fn new(file_id: FileId, asset_type: AssetType) -> Self {
        Self {
            file_id,
            asset_type,
            title: None,
            description: None,
            tags: Vec::new(),
            visibility: Visibility::default(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }
}

/// Replacement for an attachment's descriptive metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateAttachmentMetadata {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub visibility: Visibility,
}

/// Criteria for attachment reads and batch transitions
///
/// `state: None` matches every row; use [`AttachmentFilter::not_deleted`] at read
/// sites that must not expose archived attachments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentFilter {
    pub ids: Option<Vec<AttachmentId>>,
    pub file_id: Option<FileId>,
    pub asset_type: Option<AssetType>,
    pub visibility: Option<Visibility>,
    /// Normalized tag the attachment must carry
    pub tag: Option<String>,
    pub state: Option<LifecycleState>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl AttachmentFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to Live attachments (`deleted_at IS NULL`)
    pub fn not_deleted(mut self) -> Self {
        self.state = Some(LifecycleState::Live);
        self
    }

    /// Restrict to SoftDeleted attachments
    pub fn deleted_only(mut self) -> Self {
        self.state = Some(LifecycleState::SoftDeleted);
        self
    }

    pub fn with_ids<I>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = AttachmentId>,
    {
        self.ids = Some(ids.into_iter().collect());
        self
    }

    pub fn for_file(mut self, file_id: FileId) -> Self {
        self.file_id = Some(file_id);
        self
    }

    pub fn of_type(mut self, asset_type: AssetType) -> Self {
        self.asset_type = Some(asset_type);
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = Some(visibility);
        self
    }

    /// Tags are matched after normalization; an unnormalizable tag matches nothing
    pub fn tagged(mut self, tag: &str) -> Self {
        self.tag = Some(Tags::normalize(tag).unwrap_or_else(|_| tag.to_string()));
        self
    }

    pub fn paginate(mut self, limit: i64, offset: i64) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }

    /// Limit clamped to `0..=MAX_PAGE_SIZE`
    pub fn effective_limit(&self) -> Option<i64> {
        self.limit.map(|l| l.clamp(0, MAX_PAGE_SIZE))
    }

    pub fn effective_offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }

    /// Row-level predicate, pagination excluded
    pub fn matches(&self, attachment: &LogicalAttachment) -> bool {
        if let Some(state) = self.state {
            if attachment.state() != state {
                return false;
            }
        }
        if let Some(ids) = &self.ids {
            if !ids.contains(attachment.id()) {
                return false;
            }
        }
        if let Some(file_id) = &self.file_id {
            if attachment.file_id() != file_id {
                return false;
            }
        }
        if let Some(asset_type) = self.asset_type {
            if attachment.asset_type() != asset_type {
                return false;
            }
        }
        if let Some(visibility) = self.visibility {
            if attachment.visibility() != visibility {
                return false;
            }
        }
        if let Some(tag) = &self.tag {
            if !attachment.tags().contains(tag) {
                return false;
            }
        }
        true
    }
}

/// Result of comparing a file's recorded counter with its live attachments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefCountReport {
    pub file_id: FileId,
    pub recorded: i64,
    pub live: i64,
}

impl RefCountReport {
    /// Positive when the counter over-counts, negative when it under-counts
    pub fn drift(&self) -> i64 {
        self.recorded - self.live
    }

    pub fn is_consistent(&self) -> bool {
        self.drift() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::AttachmentMetadata;
    use chrono::Utc;

    fn valid_upload() -> NewPhysicalFile {
        NewPhysicalFile {
            storage_provider: StorageProvider::S3,
            object_key: "employees/7/passport.pdf".to_string(),
            public_url: "https://files.example.com/employees/7/passport.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            file_size: 1024,
            checksum: "a".repeat(64),
        }
    }

    fn attachment_with(tags: &[&str], visibility: Visibility) -> LogicalAttachment {
        LogicalAttachment::new(
            FileId::new(),
            AssetType::Image,
            AttachmentMetadata {
                tags: Tags::new(tags.iter().copied()).unwrap(),
                visibility,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_new_physical_file_valid() {
        assert!(valid_upload().validate().is_ok());
    }

    #[test]
    fn test_new_physical_file_rejects_bad_fields() {
        let mut upload = valid_upload();
        upload.object_key = "/absolute/path".to_string();
        assert!(upload.validate().is_err());

        let mut upload = valid_upload();
        upload.public_url = "not a url".to_string();
        assert!(upload.validate().is_err());

        let mut upload = valid_upload();
        upload.content_type = "pdf".to_string();
        assert!(upload.validate().is_err());

        let mut upload = valid_upload();
        upload.file_size = -1;
        assert!(upload.validate().is_err());
    }

    #[test]
    fn test_content_type_with_parameters() {
        let mut upload = valid_upload();
        upload.content_type = "text/plain; charset=utf-8".to_string();
        assert!(upload.validate().is_ok());
    }

    #[test]
    fn test_new_attachment_title_length() {
        let file_id = FileId::new();
        assert!(NewAttachment::new(file_id, AssetType::Image)
            .with_title("Hero")
            .validate()
            .is_ok());
        assert!(NewAttachment::new(file_id, AssetType::Image)
            .with_title("")
            .validate()
            .is_err());
        assert!(NewAttachment::new(file_id, AssetType::Image)
            .with_title("x".repeat(256))
            .validate()
            .is_err());
    }

    #[test]
    fn test_not_deleted_excludes_soft_deleted() {
        let filter = AttachmentFilter::new().not_deleted();
        let mut attachment = attachment_with(&[], Visibility::Private);
        assert!(filter.matches(&attachment));

        attachment.mark_deleted(Utc::now());
        assert!(!filter.matches(&attachment));
        assert!(AttachmentFilter::new().deleted_only().matches(&attachment));
        assert!(AttachmentFilter::new().matches(&attachment));
    }

    #[test]
    fn test_filter_criteria_combine() {
        let attachment = attachment_with(&["Gallery"], Visibility::Public);

        assert!(AttachmentFilter::new()
            .tagged("GALLERY ")
            .with_visibility(Visibility::Public)
            .of_type(AssetType::Image)
            .matches(&attachment));
        assert!(!AttachmentFilter::new().tagged("hero").matches(&attachment));
        assert!(!AttachmentFilter::new()
            .for_file(FileId::new())
            .matches(&attachment));
        assert!(!AttachmentFilter::new()
            .with_ids(Vec::new())
            .matches(&attachment));
        assert!(AttachmentFilter::new()
            .with_ids([*attachment.id()])
            .matches(&attachment));
    }

    #[test]
    fn test_effective_limit_is_clamped() {
        assert_eq!(AttachmentFilter::new().effective_limit(), None);
        assert_eq!(
            AttachmentFilter::new().paginate(5000, -3).effective_limit(),
            Some(MAX_PAGE_SIZE)
        );
        assert_eq!(AttachmentFilter::new().paginate(10, -3).effective_offset(), 0);
    }

    #[test]
    fn test_ref_count_report_drift() {
        let report = RefCountReport {
            file_id: FileId::new(),
            recorded: 3,
            live: 2,
        };
        assert_eq!(report.drift(), 1);
        assert!(!report.is_consistent());
    }
}
