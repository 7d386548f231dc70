//! Component lifecycle states and the transitions between them.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The lifecycle state of a component.
///
/// The normal run is `Created`, `Initializing`, `Initialized`, `Validating`,
/// `Valid`, `Preparing`, `Updated`, then `Updating` and back to `Updated`
/// until `Done`, and finally `Finishing` and `Finished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Status {
    Created,
    Initializing,
    Initialized,
    Validating,
    Valid,
    WaitingForData,
    Invalid,
    Preparing,
    Updating,
    Updated,
    Done,
    Finishing,
    Finished,
    Failed,
}

impl Status {
    /// Returns `true` if a component may move from `self` to `next`.
    ///
    /// `Finishing -> Created` is the restart edge and is only taken by
    /// components that support restarting.
    #[must_use]
    pub fn can_transition_to(self, next: Status) -> bool {
        use Status::*;
        matches!(
            (self, next),
            (Created, Initializing)
                | (Initializing, Initialized | Failed)
                | (Initialized | Valid | Invalid, Validating)
                | (Validating, Valid | Invalid)
                | (Valid, Preparing)
                | (Preparing, Updated | Failed)
                | (Updated | WaitingForData, Updating)
                | (Updating, Updated | Done | Failed | WaitingForData)
                | (Finishing, Finished | Created | Failed)
        ) || (next == Finishing && self.can_finish())
    }

    /// Returns `true` for the late states from which a component may finish.
    #[must_use]
    pub fn can_finish(self) -> bool {
        use Status::*;
        matches!(
            self,
            Initialized | Valid | Invalid | Updated | WaitingForData | Done | Failed
        )
    }

    /// Returns `true` once the component can no longer advance in this run.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Done | Status::Failed | Status::Finished)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
