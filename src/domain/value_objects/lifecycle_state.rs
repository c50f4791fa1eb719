use serde::{Deserialize, Serialize};

/// Attachment lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    /// Visible to readers and counted by the physical file
    Live,
    /// Archived; hidden from `not_deleted()` reads and not counted
    SoftDeleted,
}

impl LifecycleState {
    /// Check if transition is valid
    pub fn can_transition_to(&self, target: LifecycleState) -> bool {
        matches!(
            (self, target),
            (LifecycleState::Live, LifecycleState::SoftDeleted)
                | (LifecycleState::SoftDeleted, LifecycleState::Live)
        )
    }

    /// Counter delta a physical file receives when an attachment enters this state
    pub fn ref_delta(&self) -> i64 {
        match self {
            LifecycleState::Live => 1,
            LifecycleState::SoftDeleted => -1,
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleState::Live => write!(f, "LIVE"),
            LifecycleState::SoftDeleted => write!(f, "SOFT_DELETED"),
        }
    }
}

impl std::str::FromStr for LifecycleState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LIVE" => Ok(LifecycleState::Live),
            "SOFT_DELETED" => Ok(LifecycleState::SoftDeleted),
            _ => Err(format!("Invalid lifecycle state: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_lifecycle_state_transitions() {
        assert!(LifecycleState::Live.can_transition_to(LifecycleState::SoftDeleted));
        assert!(LifecycleState::SoftDeleted.can_transition_to(LifecycleState::Live));
        assert!(!LifecycleState::Live.can_transition_to(LifecycleState::Live));
        assert!(!LifecycleState::SoftDeleted.can_transition_to(LifecycleState::SoftDeleted));
    }

    #[test]
    fn test_lifecycle_state_ref_delta() {
        assert_eq!(LifecycleState::Live.ref_delta(), 1);
        assert_eq!(LifecycleState::SoftDeleted.ref_delta(), -1);
    }

    #[test]
    fn test_lifecycle_state_from_str() {
        assert_eq!(LifecycleState::from_str("LIVE").unwrap(), LifecycleState::Live);
        assert_eq!(
            LifecycleState::from_str("SOFT_DELETED").unwrap(),
            LifecycleState::SoftDeleted
        );
        assert!(LifecycleState::from_str("DELETED").is_err());
    }
}
