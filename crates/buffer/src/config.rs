use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for a [`SmartBuffer`](crate::SmartBuffer).
///
/// The relaxation factor blends extrapolation beyond the stored times:
/// 1 repeats the nearest stored value, 0 extrapolates linearly from the two
/// boundary values.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "ConfigFields", into = "ConfigFields")
)]
pub struct BufferConfig {
    relaxation_factor: f64,
    extrapolate: bool,
    size_message_frequency: usize,
}

/// Errors that can occur when validating a buffer config.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum ConfigError {
    #[error("relaxation factor must lie in [0, 1], got {0}")]
    RelaxationFactor(f64),

    #[error("size message frequency must be positive")]
    SizeMessageFrequency,
}

impl Default for BufferConfig {
    fn default() -> Self {
        // Known-good values, unwrap is safe
        Self::new(1.0, true, 1000).unwrap()
    }
}

impl BufferConfig {
    /// Creates a new config with a validated relaxation factor.
    ///
    /// # Errors
    ///
    /// Returns an error if the relaxation factor lies outside `[0, 1]` or the
    /// size message frequency is zero.
    pub fn new(
        relaxation_factor: f64,
        extrapolate: bool,
        size_message_frequency: usize,
    ) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&relaxation_factor) {
            return Err(ConfigError::RelaxationFactor(relaxation_factor));
        }
        if size_message_frequency == 0 {
            return Err(ConfigError::SizeMessageFrequency);
        }

        Ok(Self {
            relaxation_factor,
            extrapolate,
            size_message_frequency,
        })
    }

    /// Returns a copy with a different relaxation factor.
    ///
    /// # Errors
    ///
    /// Returns an error if the factor lies outside `[0, 1]`.
    pub fn with_relaxation_factor(self, relaxation_factor: f64) -> Result<Self, ConfigError> {
        Self::new(
            relaxation_factor,
            self.extrapolate,
            self.size_message_frequency,
        )
    }

    /// Returns a copy with extrapolation enabled or disabled.
    #[must_use]
    pub fn with_extrapolate(mut self, extrapolate: bool) -> Self {
        self.extrapolate = extrapolate;
        self
    }

    /// Returns the extrapolation blend weight in `[0, 1]`.
    #[must_use]
    pub fn relaxation_factor(&self) -> f64 {
        self.relaxation_factor
    }

    /// Returns `true` if queries outside the stored times are answered.
    #[must_use]
    pub fn extrapolate(&self) -> bool {
        self.extrapolate
    }

    /// Returns how many entries separate two buffer growth messages.
    #[must_use]
    pub fn size_message_frequency(&self) -> usize {
        self.size_message_frequency
    }
}

#[cfg(feature = "serde")]
#[derive(Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFields {
    relaxation_factor: f64,
    extrapolate: bool,
    size_message_frequency: usize,
}

#[cfg(feature = "serde")]
impl Default for ConfigFields {
    fn default() -> Self {
        BufferConfig::default().into()
    }
}

#[cfg(feature = "serde")]
impl TryFrom<ConfigFields> for BufferConfig {
    type Error = ConfigError;

    fn try_from(fields: ConfigFields) -> Result<Self, Self::Error> {
        Self::new(
            fields.relaxation_factor,
            fields.extrapolate,
            fields.size_message_frequency,
        )
    }
}

#[cfg(feature = "serde")]
impl From<BufferConfig> for ConfigFields {
    fn from(config: BufferConfig) -> Self {
        Self {
            relaxation_factor: config.relaxation_factor,
            extrapolate: config.extrapolate,
            size_message_frequency: config.size_message_frequency,
        }
    }
}
