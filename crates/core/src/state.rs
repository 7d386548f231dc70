//! Hooks for saving and restoring the internal state of a component.
//!
//! Nothing in this workspace persists state; these traits let an external
//! state manager attach to a component's engine.

use std::fmt;

/// Identifies a state kept by [`ManageState::keep_current_state`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StateId(pub String);

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Error type returned by state managers.
pub type StateError = Box<dyn std::error::Error + Send + Sync>;

/// Keeps, restores and discards snapshots of an engine's state.
pub trait ManageState {
    /// Stores the current state and returns its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be captured.
    fn keep_current_state(&mut self) -> Result<StateId, StateError>;

    /// Restores a previously kept state.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is unknown or the state cannot be applied.
    fn restore_state(&mut self, id: &StateId) -> Result<(), StateError>;

    /// Discards a previously kept state.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is unknown.
    fn clear_state(&mut self, id: &StateId) -> Result<(), StateError>;
}

/// Converts kept states to and from bytes.
pub trait ByteStateConverter {
    /// Serializes the state with `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is unknown.
    fn to_bytes(&self, id: &StateId) -> Result<Vec<u8>, StateError>;

    /// Registers a state from bytes and returns its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes do not describe a state.
    fn from_bytes(&mut self, bytes: &[u8]) -> Result<StateId, StateError>;
}
