use confluence_core::{ManageState, StateError, StateId};

use crate::{error::RuntimeError, handle::ComponentId};

use super::Composition;

impl Composition {
    /// Asks the component's engine to keep its current state.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine has no state manager, or the manager
    /// fails.
    pub fn keep_state(&mut self, component: ComponentId) -> Result<StateId, RuntimeError> {
        self.with_state_manager(component, |manager| manager.keep_current_state())
    }

    /// Asks the component's engine to return to a kept state.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine has no state manager, or the manager
    /// does not know `id`.
    pub fn restore_state(&mut self, component: ComponentId, id: &StateId) -> Result<(), RuntimeError> {
        self.with_state_manager(component, |manager| manager.restore_state(id))
    }

    /// Asks the component's engine to discard a kept state.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine has no state manager, or the manager
    /// does not know `id`.
    pub fn clear_state(&mut self, component: ComponentId, id: &StateId) -> Result<(), RuntimeError> {
        self.with_state_manager(component, |manager| manager.clear_state(id))
    }

    fn with_state_manager<T>(
        &mut self,
        component: ComponentId,
        f: impl FnOnce(&mut dyn ManageState) -> Result<T, StateError>,
    ) -> Result<T, RuntimeError> {
        let node = self.component_mut(component)?;
        let id = node.id.clone();
        let manager = node
            .engine
            .state_manager()
            .ok_or_else(|| RuntimeError::StateUnsupported {
                component: id.clone(),
            })?;
        f(manager).map_err(|source| RuntimeError::State {
            component: id,
            source,
        })
    }
}
