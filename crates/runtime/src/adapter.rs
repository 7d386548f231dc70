//! Adapted outputs: transformations layered on top of an output.
//!
//! An adapted output wraps exactly one adaptee, an output or another adapted
//! output, and answers queries in the adaptee's stead:
//!
//! - linear: `y = A * x + B`, also used for unit conversion
//! - wave: `y = amplitude * sin(frequency * t + phase)`
//! - spatial: values remapped onto another element set
//! - time buffer: values buffered over time and answered for any time
//!
//! Adapters are built by an [`AdaptedOutputFactory`] and registered through
//! [`Composition::create_adapted_output`](crate::Composition::create_adapted_output).

mod factory;
pub(crate) mod linear;
pub(crate) mod spatial;
pub(crate) mod time_buffer;
pub(crate) mod wave;

use std::{fmt, rc::Rc};

use confluence_buffer::SmartBuffer;
use confluence_core::{Argument, ExchangeItem};
use ndarray::Array2;

use crate::updater::ComponentUpdater;

pub use factory::{AdaptedOutputFactory, LinearFactory, SpatialFactory, TimeBufferFactory, WaveFactory};
pub use spatial::{ElementMapper, IdBasedMapper, MappingError};

/// Identifies an adapter a factory can create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterId {
    pub id: String,
    pub caption: String,
    pub description: String,
}

impl AdapterId {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        caption: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            caption: caption.into(),
            description: description.into(),
        }
    }
}

/// What an adapted output does to the values of its adaptee.
pub enum AdapterKind {
    /// `y = A * x + B` with `A` and `B` read from the arguments.
    Linear,

    /// A sine of the query time, read from the `Amplitude`, `Phase` and
    /// `Frequency` arguments.
    Wave,

    /// Remaps elements with a `target x source` matrix.
    Spatial {
        mapper: Rc<dyn ElementMapper>,
        matrix: Array2<f64>,
    },

    /// Buffers adaptee values and advances the adaptee when queried past
    /// the buffered times.
    TimeBuffer {
        buffer: SmartBuffer,
        updater: Option<Rc<dyn ComponentUpdater>>,
    },
}

impl fmt::Debug for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdapterKind::Linear => f.write_str("Linear"),
            AdapterKind::Wave => f.write_str("Wave"),
            AdapterKind::Spatial { mapper, matrix } => f
                .debug_struct("Spatial")
                .field("mapper", &mapper.id())
                .field("matrix", &matrix.dim())
                .finish(),
            AdapterKind::TimeBuffer { buffer, updater } => f
                .debug_struct("TimeBuffer")
                .field("buffer", buffer)
                .field("has_updater", &updater.is_some())
                .finish(),
        }
    }
}

/// An adapted output as built by a factory, before it is registered.
#[derive(Debug)]
pub struct Adapter {
    pub item: ExchangeItem,
    pub arguments: Vec<Argument>,
    pub kind: AdapterKind,
}

/// Describes the adapted output `adapter_id` puts on top of `adaptee`.
fn adapted_item(adaptee: &ExchangeItem, adapter_id: &str, caption: &str) -> ExchangeItem {
    ExchangeItem {
        id: format!("{}->{adapter_id}", adaptee.id),
        caption: format!("{} => {caption}", adaptee.caption),
        ..adaptee.clone()
    }
}
