use confluence_buffer::BufferConfig;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Runtime behavior of one component.
///
/// Inputs and outputs created for the component inherit
/// `store_values_in_items`, and time buffers created by its factories
/// inherit `buffer`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(default, deny_unknown_fields)
)]
pub struct RuntimeConfig {
    cascading_updates: bool,
    store_values_in_items: bool,
    buffer: BufferConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            cascading_updates: true,
            store_values_in_items: false,
            buffer: BufferConfig::default(),
        }
    }
}

impl RuntimeConfig {
    #[must_use]
    pub fn new(cascading_updates: bool, store_values_in_items: bool, buffer: BufferConfig) -> Self {
        Self {
            cascading_updates,
            store_values_in_items,
            buffer,
        }
    }

    /// Returns a copy that pulls from providers (`true`) or waits for them.
    #[must_use]
    pub fn with_cascading_updates(mut self, cascading_updates: bool) -> Self {
        self.cascading_updates = cascading_updates;
        self
    }

    /// Returns a copy that caches values in the exchange items.
    #[must_use]
    pub fn with_store_values_in_items(mut self, store_values_in_items: bool) -> Self {
        self.store_values_in_items = store_values_in_items;
        self
    }

    #[must_use]
    pub fn with_buffer(mut self, buffer: BufferConfig) -> Self {
        self.buffer = buffer;
        self
    }

    /// Returns `true` if an update pulls its inputs, recursively updating
    /// providers, instead of waiting for them to catch up.
    #[must_use]
    pub fn cascading_updates(&self) -> bool {
        self.cascading_updates
    }

    /// Returns `true` if exchange items keep their own copy of the values
    /// instead of reading and writing through to the engine.
    #[must_use]
    pub fn store_values_in_items(&self) -> bool {
        self.store_values_in_items
    }

    #[must_use]
    pub fn buffer(&self) -> &BufferConfig {
        &self.buffer
    }
}
