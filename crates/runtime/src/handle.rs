//! Index handles into a [`Composition`](crate::Composition).

use std::fmt;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub(crate) usize);

        impl $name {
            /// Returns the arena index behind the handle.
            #[must_use]
            pub fn index(self) -> usize {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

handle!(
    /// Identifies a component in its composition.
    ComponentId,
    "component"
);

handle!(
    /// Identifies an input in its composition.
    InputId,
    "input"
);

handle!(
    /// Identifies an output or adapted output in its composition.
    OutputId,
    "output"
);
