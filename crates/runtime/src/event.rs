use confluence_core::Status;

use crate::handle::{ComponentId, OutputId};

/// Changes pushed to observers in the order they happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A component moved from `old` to `new`.
    StatusChanged {
        component: ComponentId,
        old: Status,
        new: Status,
    },

    /// An output moved to a new time, or a time buffer took in new values.
    ValuesChanged { output: OutputId },
}
