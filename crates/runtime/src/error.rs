use confluence_buffer::BufferError;
use confluence_core::{ArgumentError, StateError, Status, TimeSetError, ValueSetError};
use thiserror::Error;

use crate::{adapter::MappingError, engine::EngineError};

/// Errors that can occur while building or running a composition.
///
/// Once a component is updating, any error moves it to [`Status::Failed`]
/// before it is returned.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("no component with index {0}")]
    UnknownComponent(usize),

    #[error("no input with index {0}")]
    UnknownInput(usize),

    #[error("no output with index {0}")]
    UnknownOutput(usize),

    #[error("input `{input}` has no provider")]
    NoProvider { input: String },

    #[error("output `{output}` offers {found} elements, `{query}` expects {expected}")]
    ElementSetMismatch {
        output: String,
        query: String,
        expected: usize,
        found: usize,
    },

    #[error(
        "component `{component}` could not reach the time required from output `{output}` by `{query}`, add a time buffer adapter"
    )]
    TimeSetMismatch {
        component: String,
        output: String,
        query: String,
    },

    #[error("output `{output}` and `{query}` mix time stamps and time spans")]
    IncompatibleTimeKinds { output: String, query: String },

    #[error("adapted output `{output}` has no time horizon")]
    MissingHorizon { output: String },

    #[error("`{query}` asks output `{output}` for values at no time")]
    EmptyQuery { output: String, query: String },

    #[error("output `{output}` has no values yet")]
    NoValues { output: String },

    #[error("no adapted output factory `{factory}` on component `{component}`")]
    UnknownFactory { component: String, factory: String },

    #[error("factory `{factory}` cannot create adapter `{adapter}` for output `{output}`")]
    UnknownAdapter {
        factory: String,
        adapter: String,
        output: String,
    },

    #[error("output `{output}` is not an adapted output")]
    NotAdapted { output: String },

    #[error("adapted output `{output}` still has consumers or adapted outputs")]
    AdapterInUse { output: String },

    #[error("component `{component}` cannot move from {from} to {to}")]
    IllegalTransition {
        component: String,
        from: Status,
        to: Status,
    },

    #[error("component `{component}` cannot {operation} while {status}")]
    InvalidStatus {
        component: String,
        status: Status,
        operation: &'static str,
    },

    #[error("component `{component}` is invalid: {}", .messages.join("; "))]
    Invalid {
        component: String,
        messages: Vec<String>,
    },

    #[error("no component could advance: {}", .components.join(", "))]
    Stalled { components: Vec<String> },

    #[error("component `{component}` changed its exchange items on re-initialization")]
    ItemsChanged { component: String },

    #[error("engine of component `{component}` failed")]
    Engine {
        component: String,
        #[source]
        source: EngineError,
    },

    #[error("time buffer `{output}` failed")]
    Buffer {
        output: String,
        #[source]
        source: BufferError,
    },

    #[error("time buffer `{output}` has no component updater")]
    NoUpdater { output: String },

    #[error("providers of input `{input}` disagree on shape: {found:?} versus {expected:?}")]
    ShapeMismatch {
        input: String,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("component `{component}` does not manage its state")]
    StateUnsupported { component: String },

    #[error("state manager of component `{component}` failed")]
    State {
        component: String,
        #[source]
        source: StateError,
    },

    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error(transparent)]
    Argument(#[from] ArgumentError),

    #[error(transparent)]
    TimeSet(#[from] TimeSetError),

    #[error(transparent)]
    ValueSet(#[from] ValueSetError),
}
