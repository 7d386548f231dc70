//! Core types for coupling simulation components.
//!
//! This crate defines the primitives every other crate exchanges:
//!
//! - [`Time`] and [`TimeSet`]: stamps, spans and ordered sets of them
//! - [`ValueSet`]: values indexed by time and element
//! - [`ExchangeItem`]: identity plus value, spatial and time definitions of
//!   an input or output
//! - [`Argument`]: named, typed configuration values
//! - [`Status`]: the component lifecycle state machine
//! - [`Observer`]: synchronous notification of changes
//! - [`ManageState`], [`ByteStateConverter`]: hooks for external state
//!   managers

pub mod argument;
pub mod definition;
mod item;
mod observer;
mod state;
mod status;
pub mod time;
mod time_set;
mod value_set;

pub use argument::{Argument, ArgumentError, ArgumentKind, ArgumentValue};
pub use definition::{
    Category, Coordinate, Dimension, DimensionBase, Element, ElementSet, ElementType, Quality,
    Quantity, Unit, ValueDefinition,
};
pub use item::ExchangeItem;
pub use observer::Observer;
pub use state::{ByteStateConverter, ManageState, StateError, StateId};
pub use status::Status;
pub use time::{EPSILON, Time, TimeError};
pub use time_set::{Interval, IntervalKey, TimeSet, TimeSetError};
pub use value_set::{ValueSet, ValueSetError};
