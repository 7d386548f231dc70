use std::rc::Rc;

use confluence_buffer::{BufferConfig, SmartBuffer};
use confluence_core::ExchangeItem;

use crate::{
    error::RuntimeError,
    updater::{ComponentUpdater, TimeComponentUpdater},
};

use super::{
    Adapter, AdapterId, AdapterKind, ElementMapper, IdBasedMapper, adapted_item, linear,
    time_buffer, wave,
};

/// Creates adapted outputs for the outputs of a component.
///
/// A factory lists the adapters it can put on top of an adaptee, optionally
/// for a known target input, and builds them on request.
pub trait AdaptedOutputFactory {
    /// Identifies the factory within its component.
    fn id(&self) -> &str;

    /// Returns the adapters that can adapt `adaptee` for `target`.
    fn available_adapter_ids(
        &self,
        adaptee: &ExchangeItem,
        target: Option<&ExchangeItem>,
    ) -> Vec<AdapterId>;

    /// Builds the adapter `adapter_id` on top of `adaptee`.
    ///
    /// # Errors
    ///
    /// Returns an error if the factory does not offer `adapter_id` for this
    /// adaptee and target.
    fn create_adapter(
        &self,
        adapter_id: &str,
        adaptee: &ExchangeItem,
        target: Option<&ExchangeItem>,
    ) -> Result<Adapter, RuntimeError>;
}

fn unknown_adapter(factory: &str, adapter_id: &str, adaptee: &ExchangeItem) -> RuntimeError {
    RuntimeError::UnknownAdapter {
        factory: factory.to_owned(),
        adapter: adapter_id.to_owned(),
        output: adaptee.id.clone(),
    }
}

/// Offers time buffers that interpolate or extrapolate their adaptee.
///
/// The buffer advances the adaptee's component through a
/// [`TimeComponentUpdater`] when asked for times it has not reached.
#[derive(Debug, Clone)]
pub struct TimeBufferFactory {
    id: String,
    config: BufferConfig,
}

impl TimeBufferFactory {
    pub const INTERPOLATOR: &'static str = "TimeInterpolator";
    pub const EXTRAPOLATOR: &'static str = "TimeExtrapolator";

    #[must_use]
    pub fn new(id: impl Into<String>, config: BufferConfig) -> Self {
        Self {
            id: id.into(),
            config,
        }
    }
}

impl AdaptedOutputFactory for TimeBufferFactory {
    fn id(&self) -> &str {
        &self.id
    }

    fn available_adapter_ids(
        &self,
        _adaptee: &ExchangeItem,
        _target: Option<&ExchangeItem>,
    ) -> Vec<AdapterId> {
        vec![
            AdapterId::new(
                Self::INTERPOLATOR,
                "Time interpolator",
                "Buffers values and interpolates them in time",
            ),
            AdapterId::new(
                Self::EXTRAPOLATOR,
                "Time extrapolator",
                "Buffers values and extrapolates them linearly in time",
            ),
        ]
    }

    fn create_adapter(
        &self,
        adapter_id: &str,
        adaptee: &ExchangeItem,
        _target: Option<&ExchangeItem>,
    ) -> Result<Adapter, RuntimeError> {
        let (caption, config) = match adapter_id {
            Self::INTERPOLATOR => ("Time interpolator", self.config),
            Self::EXTRAPOLATOR => (
                "Time extrapolator",
                // Known-good value, cannot fail
                self.config
                    .with_relaxation_factor(0.0)
                    .unwrap_or(self.config),
            ),
            _ => return Err(unknown_adapter(&self.id, adapter_id, adaptee)),
        };

        let mut buffer = SmartBuffer::with_config(config);
        buffer.set_horizon(adaptee.time_set.horizon());
        let updater: Rc<dyn ComponentUpdater> = Rc::new(TimeComponentUpdater);

        Ok(Adapter {
            item: adapted_item(adaptee, adapter_id, caption),
            arguments: time_buffer::arguments(&config),
            kind: AdapterKind::TimeBuffer {
                buffer,
                updater: Some(updater),
            },
        })
    }
}

/// Offers `y = A * x + B`, and unit conversion toward a quantity target.
#[derive(Debug, Clone)]
pub struct LinearFactory {
    id: String,
}

impl LinearFactory {
    pub const LINEAR: &'static str = "LinearOperation";
    pub const UNIT_CONVERSION: &'static str = "UnitConversion";

    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// Returns `(A, B)` converting the adaptee's unit into the target's.
    fn conversion(adaptee: &ExchangeItem, target: Option<&ExchangeItem>) -> Option<(f64, f64)> {
        let source = adaptee.value_definition.as_quantity()?;
        let target = target?.value_definition.as_quantity()?;
        if source.unit == target.unit {
            return None;
        }
        source.unit.conversion_to(&target.unit)
    }
}

impl AdaptedOutputFactory for LinearFactory {
    fn id(&self) -> &str {
        &self.id
    }

    fn available_adapter_ids(
        &self,
        adaptee: &ExchangeItem,
        target: Option<&ExchangeItem>,
    ) -> Vec<AdapterId> {
        let mut ids = vec![AdapterId::new(
            Self::LINEAR,
            "Linear operation",
            "y = A*x + B",
        )];
        if Self::conversion(adaptee, target).is_some() {
            ids.push(AdapterId::new(
                Self::UNIT_CONVERSION,
                "Unit conversion",
                "Converts values to the unit of the target",
            ));
        }
        ids
    }

    fn create_adapter(
        &self,
        adapter_id: &str,
        adaptee: &ExchangeItem,
        target: Option<&ExchangeItem>,
    ) -> Result<Adapter, RuntimeError> {
        match adapter_id {
            Self::LINEAR => Ok(Adapter {
                item: adapted_item(adaptee, adapter_id, "Linear operation"),
                arguments: linear::arguments(),
                kind: AdapterKind::Linear,
            }),
            Self::UNIT_CONVERSION => {
                let (a, b) = Self::conversion(adaptee, target)
                    .ok_or_else(|| unknown_adapter(&self.id, adapter_id, adaptee))?;
                let mut item = adapted_item(adaptee, adapter_id, "Unit conversion");
                if let Some(target) = target {
                    item.value_definition = target.value_definition.clone();
                }
                Ok(Adapter {
                    item,
                    arguments: linear::conversion_arguments(a, b),
                    kind: AdapterKind::Linear,
                })
            }
            _ => Err(unknown_adapter(&self.id, adapter_id, adaptee)),
        }
    }
}

/// Offers a sine wave of the query time in place of the adaptee's values.
#[derive(Debug, Clone)]
pub struct WaveFactory {
    id: String,
}

impl WaveFactory {
    pub const WAVE: &'static str = "Wave";

    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl AdaptedOutputFactory for WaveFactory {
    fn id(&self) -> &str {
        &self.id
    }

    fn available_adapter_ids(
        &self,
        _adaptee: &ExchangeItem,
        _target: Option<&ExchangeItem>,
    ) -> Vec<AdapterId> {
        vec![AdapterId::new(
            Self::WAVE,
            "Wave",
            "y = Amplitude*sin(Frequency*t + Phase)",
        )]
    }

    fn create_adapter(
        &self,
        adapter_id: &str,
        adaptee: &ExchangeItem,
        _target: Option<&ExchangeItem>,
    ) -> Result<Adapter, RuntimeError> {
        if adapter_id != Self::WAVE {
            return Err(unknown_adapter(&self.id, adapter_id, adaptee));
        }
        Ok(Adapter {
            item: adapted_item(adaptee, adapter_id, "Wave"),
            arguments: wave::arguments(),
            kind: AdapterKind::Wave,
        })
    }
}

/// Offers one adapter per [`ElementMapper`] able to map the adaptee's
/// elements onto the target's.
#[derive(Clone)]
pub struct SpatialFactory {
    id: String,
    mappers: Vec<Rc<dyn ElementMapper>>,
}

impl SpatialFactory {
    /// Creates a factory with the [`IdBasedMapper`].
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_mappers(id, vec![Rc::new(IdBasedMapper)])
    }

    #[must_use]
    pub fn with_mappers(id: impl Into<String>, mappers: Vec<Rc<dyn ElementMapper>>) -> Self {
        Self {
            id: id.into(),
            mappers,
        }
    }
}

impl std::fmt::Debug for SpatialFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialFactory")
            .field("id", &self.id)
            .field(
                "mappers",
                &self.mappers.iter().map(|m| m.id()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl AdaptedOutputFactory for SpatialFactory {
    fn id(&self) -> &str {
        &self.id
    }

    fn available_adapter_ids(
        &self,
        adaptee: &ExchangeItem,
        target: Option<&ExchangeItem>,
    ) -> Vec<AdapterId> {
        let Some(target) = target else {
            return Vec::new();
        };
        self.mappers
            .iter()
            .filter(|mapper| mapper.is_available(&adaptee.element_set, &target.element_set))
            .map(|mapper| AdapterId::new(mapper.id(), mapper.id(), mapper.description()))
            .collect()
    }

    fn create_adapter(
        &self,
        adapter_id: &str,
        adaptee: &ExchangeItem,
        target: Option<&ExchangeItem>,
    ) -> Result<Adapter, RuntimeError> {
        let (Some(mapper), Some(target)) = (
            self.mappers.iter().find(|mapper| mapper.id() == adapter_id),
            target,
        ) else {
            return Err(unknown_adapter(&self.id, adapter_id, adaptee));
        };

        let matrix = mapper.mapping_matrix(&adaptee.element_set, &target.element_set)?;
        let mut item = adapted_item(adaptee, adapter_id, mapper.id());
        item.element_set = target.element_set.clone();

        Ok(Adapter {
            item,
            arguments: Vec::new(),
            kind: AdapterKind::Spatial {
                mapper: Rc::clone(mapper),
                matrix,
            },
        })
    }
}
