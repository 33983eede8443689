//! Actions available to the agent.
//!
//! Ordinals are part of the table layout: column `i` of the Q-table belongs to
//! the action whose `index()` is `i`.

use std::fmt;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of actions (columns of the Q-table).
pub const NUM_ACTIONS: usize = 7;

/// Everything the agent can decide on a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    KeepClosed = 0,
    OpenFor5s = 1,
    OpenFor10s = 2,
    OpenFor20s = 3,
    TryHalfOpen = 4,
    UsePrimary = 5,
    UseBackup = 6,
}

/// Which downstream instance receives the next call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServicePath {
    Primary,
    Backup,
}

/// Ordinal outside `[0, NUM_ACTIONS)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid action ordinal {0} (expected 0..{max})", max = NUM_ACTIONS)]
pub struct InvalidAction(pub usize);

impl Action {
    /// All actions in ordinal order.
    pub const ALL: [Action; NUM_ACTIONS] = [
        Action::KeepClosed,
        Action::OpenFor5s,
        Action::OpenFor10s,
        Action::OpenFor20s,
        Action::TryHalfOpen,
        Action::UsePrimary,
        Action::UseBackup,
    ];

    /// Column of this action in the Q-table.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Action for a Q-table column.
    pub fn from_index(idx: usize) -> Result<Self, InvalidAction> {
        Self::ALL.get(idx).copied().ok_or(InvalidAction(idx))
    }

    /// Path this action selects, if it is a path-select action.
    pub fn path(self) -> Option<ServicePath> {
        match self {
            Action::UsePrimary => Some(ServicePath::Primary),
            Action::UseBackup => Some(ServicePath::Backup),
            _ => None,
        }
    }

    /// True for the breaker-policy sub-domain.
    pub fn is_policy_select(self) -> bool {
        self.path().is_none()
    }
}

impl TryFrom<usize> for Action {
    type Error = InvalidAction;

    fn try_from(idx: usize) -> Result<Self, Self::Error> {
        Self::from_index(idx)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl fmt::Display for ServicePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServicePath::Primary => f.write_str("Primary"),
            ServicePath::Backup => f.write_str("Backup"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordinals_round_trip() {
        for (i, action) in Action::ALL.iter().enumerate() {
            assert_eq!(action.index(), i);
            assert_eq!(Action::from_index(i).unwrap(), *action);
        }
    }

    #[test]
    fn test_invalid_ordinal_is_an_error() {
        let err = Action::try_from(7).unwrap_err();
        assert_eq!(err, InvalidAction(7));
        assert!(err.to_string().contains("invalid action ordinal 7"));
    }

    #[test]
    fn test_sub_domains_are_disjoint() {
        let paths: Vec<_> = Action::ALL.iter().filter(|a| a.path().is_some()).collect();
        assert_eq!(paths, vec![&Action::UsePrimary, &Action::UseBackup]);
        assert_eq!(Action::ALL.iter().filter(|a| a.is_policy_select()).count(), 5);
    }
}
