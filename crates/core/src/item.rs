//! Descriptions of the named data endpoints on a component.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    definition::{ElementSet, ValueDefinition},
    time_set::TimeSet,
};

/// Identity, meaning, spatial and temporal definition of an input or output.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ExchangeItem {
    pub id: String,
    pub caption: String,
    pub description: String,
    pub value_definition: ValueDefinition,
    pub element_set: ElementSet,
    pub time_set: TimeSet,
}

impl ExchangeItem {
    /// Creates an item exchanging time stamps, captioned with its id.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        value_definition: ValueDefinition,
        element_set: ElementSet,
    ) -> Self {
        let id = id.into();
        Self {
            caption: id.clone(),
            id,
            description: String::new(),
            value_definition,
            element_set,
            time_set: TimeSet::stamps(),
        }
    }

    /// Switches the item to exchanging time spans.
    #[must_use]
    pub fn with_spans(mut self) -> Self {
        self.time_set = TimeSet::spans();
        self
    }

    #[must_use]
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = caption.into();
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn element_count(&self) -> usize {
        self.element_set.element_count()
    }
}
