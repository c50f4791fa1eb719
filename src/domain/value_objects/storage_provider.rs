use serde::{Deserialize, Serialize};

/// Backend that physically holds the uploaded bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageProvider {
    #[default]
    S3,
    Gcs,
    Local,
    /// CDN-fronted object storage
    Cdn,
}

impl StorageProvider {
    pub const ALL: [StorageProvider; 4] = [
        StorageProvider::S3,
        StorageProvider::Gcs,
        StorageProvider::Local,
        StorageProvider::Cdn,
    ];
}

impl std::fmt::Display for StorageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageProvider::S3 => write!(f, "s3"),
            StorageProvider::Gcs => write!(f, "gcs"),
            StorageProvider::Local => write!(f, "local"),
            StorageProvider::Cdn => write!(f, "cdn"),
        }
    }
}

impl std::str::FromStr for StorageProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "s3" => Ok(StorageProvider::S3),
            "gcs" => Ok(StorageProvider::Gcs),
            "local" => Ok(StorageProvider::Local),
            "cdn" => Ok(StorageProvider::Cdn),
            _ => Err(format!("Invalid storage provider: {}", s)),
        }
    }
}
