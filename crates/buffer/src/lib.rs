//! Temporal buffering for coupled simulation components.
//!
//! A [`SmartBuffer`] stores values produced at stamps or over spans and
//! answers queries for other times:
//!
//! - stamp from stamps: linear interpolation
//! - span from stamps: time-weighted trapezoidal average
//! - stamp from spans: the containing span
//! - span from spans: overlap-weighted average
//!
//! Outside the stored times values are extrapolated by blending the nearest
//! value with the linear trend at the boundary, controlled by the relaxation
//! factor of the [`BufferConfig`], unless extrapolation is disabled.

mod buffer;
mod config;
mod error;
mod mapping;

#[cfg(test)]
mod properties;

pub use buffer::SmartBuffer;
pub use config::{BufferConfig, ConfigError};
pub use error::BufferError;
