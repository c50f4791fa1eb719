use serde::{Deserialize, Serialize};

/// Coarse classification of what an attachment holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Image,
    Document,
    Video,
    Other,
}

impl std::fmt::Display for AssetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetType::Image => write!(f, "image"),
            AssetType::Document => write!(f, "document"),
            AssetType::Video => write!(f, "video"),
            AssetType::Other => write!(f, "other"),
        }
    }
}

impl std::str::FromStr for AssetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "image" => Ok(AssetType::Image),
            "document" => Ok(AssetType::Document),
            "video" => Ok(AssetType::Video),
            "other" => Ok(AssetType::Other),
            _ => Err(format!("Invalid asset type: {}", s)),
        }
    }
}
