use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;

pub const MAX_TAGS: usize = 32;
pub const MAX_TAG_LEN: usize = 64;

/// Normalized attachment tags
///
/// Tags are trimmed, lowercased and deduplicated; first-seen order is kept.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Tags(Vec<String>);

impl Tags {
    pub fn new<I, S>(tags: I) -> Result<Self, DomainError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut normalized: Vec<String> = Vec::new();
        for tag in tags {
            let tag = Self::normalize(tag.as_ref())?;
            if seen.insert(tag.clone()) {
                normalized.push(tag);
            }
            if normalized.len() > MAX_TAGS {
                return Err(DomainError::TooManyTags {
                    count: normalized.len(),
                    max: MAX_TAGS,
                });
            }
        }

        Ok(Self(normalized))
    }

    /// Wrap tags read back from storage as they are.
    ///
    /// They were normalized on the way in; re-checking them against current
    /// limits would make old rows unreadable.
    pub(crate) fn from_stored(tags: Vec<String>) -> Self {
        Self(tags)
    }

    /// Normalize a single tag the same way stored tags are normalized
    pub fn normalize(tag: &str) -> Result<String, DomainError> {
        let tag = tag.trim().to_lowercase();
        if tag.is_empty() {
            return Err(DomainError::InvalidTag("tag cannot be empty".to_string()));
        }
        if tag.chars().count() > MAX_TAG_LEN {
            return Err(DomainError::InvalidTag(format!(
                "tag exceeds {} characters",
                MAX_TAG_LEN
            )));
        }
        if tag.chars().any(char::is_control) {
            return Err(DomainError::InvalidTag(
                "tag contains control characters".to_string(),
            ));
        }
        Ok(tag)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t == tag)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<Vec<String>> for Tags {
    type Error = DomainError;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Tags> for Vec<String> {
    fn from(tags: Tags) -> Self {
        tags.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_are_normalized_and_deduplicated() {
        let tags = Tags::new(["  Beach ", "beach", "Sunset"]).unwrap();
        assert_eq!(tags.as_slice(), &["beach".to_string(), "sunset".to_string()]);
    }

    #[test]
    fn test_tags_reject_empty() {
        let err = Tags::new(["ok", "   "]).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTag(_)));
    }

    #[test]
    fn test_tags_reject_overlong() {
        let long = "x".repeat(MAX_TAG_LEN + 1);
        assert!(Tags::new([long]).is_err());
    }

    #[test]
    fn test_tags_reject_too_many() {
        let many: Vec<String> = (0..=MAX_TAGS).map(|i| format!("tag-{i}")).collect();
        let err = Tags::new(many).unwrap_err();
        assert_eq!(
            err,
            DomainError::TooManyTags {
                count: MAX_TAGS + 1,
                max: MAX_TAGS
            }
        );
    }

    #[test]
    fn test_duplicates_do_not_count_toward_limit() {
        let repeated = vec!["same"; MAX_TAGS + 10];
        assert_eq!(Tags::new(repeated).unwrap().len(), 1);
    }

    #[test]
    fn test_tags_contains() {
        let tags = Tags::new(["hero", "gallery"]).unwrap();
        assert!(tags.contains("hero"));
        assert!(!tags.contains("banner"));
    }

    #[test]
    fn test_too_many_tags_stops_before_later_input() {
        let mut many: Vec<String> = (0..=MAX_TAGS).map(|i| format!("tag-{i}")).collect();
        many.push("   ".to_string());
        assert!(matches!(
            Tags::new(many).unwrap_err(),
            DomainError::TooManyTags { .. }
        ));
    }

    #[test]
    fn test_stored_tags_skip_validation() {
        let stored: Vec<String> = (0..MAX_TAGS + 5).map(|i| format!("legacy-{i}")).collect();
        let tags = Tags::from_stored(stored);
        assert_eq!(tags.len(), MAX_TAGS + 5);
        assert!(tags.contains("legacy-0"));
    }
}
