mod asset_type;
mod attachment_id;
mod checksum;
mod file_id;
mod lifecycle_state;
mod storage_provider;
mod tags;
mod visibility;

pub use asset_type::AssetType;
pub use attachment_id::AttachmentId;
pub use checksum::Checksum;
pub use file_id::FileId;
pub use lifecycle_state::LifecycleState;
pub use storage_provider::StorageProvider;
pub use tags::{Tags, MAX_TAGS, MAX_TAG_LEN};
pub use visibility::Visibility;
