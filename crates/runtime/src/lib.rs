//! Lifecycle and update runtime for coupled simulation components.
//!
//! A [`Composition`] holds components, each wrapping an [`Engine`], and the
//! links between their exchange items. Components move through the
//! [`Status`](confluence_core::Status) state machine; an update pulls the
//! values of every active input from its providers, which in turn update
//! themselves as far as needed, then advances the engine by one step.
//!
//! Outputs can be wrapped in adapted outputs built by factories: linear
//! transforms, unit conversion, spatial remapping, waves and time buffers
//! that let components with different time steps exchange values.

pub mod adapter;
mod composition;
mod config;
mod engine;
mod error;
mod event;
mod handle;
mod updater;

pub use adapter::{
    AdaptedOutputFactory, Adapter, AdapterId, AdapterKind, ElementMapper, IdBasedMapper,
    LinearFactory, MappingError, SpatialFactory, TimeBufferFactory, WaveFactory,
};
pub use composition::Composition;
pub use config::RuntimeConfig;
pub use engine::{Engine, EngineError, ExchangeItems};
pub use error::RuntimeError;
pub use event::Event;
pub use handle::{ComponentId, InputId, OutputId};
pub use updater::{ComponentUpdater, TimeComponentUpdater};
