use std::{cell::RefCell, rc::Rc};

use confluence_core::{
    Dimension, DimensionBase, ElementSet, ExchangeItem, Time, Unit, ValueDefinition,
};
use serde::{Deserialize, Serialize};

/// Values an engine received on its input, keyed by the time it stepped to.
pub type Log = Rc<RefCell<Vec<(f64, Vec<f64>)>>>;

/// Units the test engines exchange flows in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowUnit {
    #[default]
    #[serde(rename = "m3/s")]
    CubicMetersPerSecond,

    #[serde(rename = "l/s")]
    LitersPerSecond,
}

impl FlowUnit {
    #[must_use]
    pub fn unit(self) -> Unit {
        let dimension = Dimension::dimensionless()
            .with(DimensionBase::Length, 3.0)
            .with(DimensionBase::Time, -1.0);
        match self {
            FlowUnit::CubicMetersPerSecond => Unit::si("m3/s", dimension),
            FlowUnit::LitersPerSecond => Unit::scaled("l/s", dimension, 0.001, 0.0),
        }
    }
}

fn default_elements() -> Vec<String> {
    vec!["outlet".to_owned()]
}

fn flow_item(id: &str, elements: &[String], unit: FlowUnit) -> ExchangeItem {
    ExchangeItem::new(
        id,
        ValueDefinition::quantity("Flow", unit.unit()),
        ElementSet::id_based("reaches", elements.iter().cloned()),
    )
}

fn next_time(current: f64, time_step: f64, as_stamp: bool) -> Time {
    let next = current + time_step;
    if as_stamp {
        Time::at(next)
    } else {
        Time::between(current, next).unwrap_or(Time::at(next))
    }
}

pub mod ramp {
    use std::{cell::Cell, rc::Rc};

    use confluence_core::{Argument, Time, ValueSet};
    use confluence_runtime::{Engine, EngineError, ExchangeItems};
    use serde::{Deserialize, Serialize};

    use super::{FlowUnit, default_elements, flow_item, next_time};

    /// A source whose flow grows linearly with time.
    ///
    /// Reach `i` reports `offset + slope * t + i`.
    pub struct Ramp {
        config: Config,
        current: f64,
        counters: Counters,
    }

    /// Shared counters to observe a ramp after it moved into a composition.
    #[derive(Debug, Clone, Default)]
    pub struct Counters {
        /// Time steps taken.
        pub steps: Rc<Cell<usize>>,

        /// Output values computed, one per required output and step.
        pub computed: Rc<Cell<usize>>,
    }

    /// Configuration settings for the ramp.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(deny_unknown_fields)]
    pub struct Config {
        pub time_step: f64,
        pub end_time: f64,
        pub slope: f64,

        #[serde(default)]
        pub offset: f64,

        /// Ids of the reaches the flow is reported for.
        #[serde(default = "default_elements")]
        pub elements: Vec<String>,

        #[serde(default)]
        pub unit: FlowUnit,
    }

    impl Default for Config {
        fn default() -> Self {
            Self {
                time_step: 1.0,
                end_time: 4.0,
                slope: 1.0,
                offset: 0.0,
                elements: default_elements(),
                unit: FlowUnit::default(),
            }
        }
    }

    impl Ramp {
        #[must_use]
        pub fn new(config: Config) -> Self {
            Self {
                config,
                current: 0.0,
                counters: Counters::default(),
            }
        }

        #[must_use]
        pub fn counters(&self) -> Counters {
            self.counters.clone()
        }
    }

    impl Engine for Ramp {
        fn initialize(&mut self, _arguments: &[Argument]) -> Result<ExchangeItems, EngineError> {
            if self.config.time_step <= 0.0 {
                return Err("time step must be positive".into());
            }
            self.current = 0.0;
            Ok(ExchangeItems {
                inputs: Vec::new(),
                outputs: vec![flow_item("flow", &self.config.elements, self.config.unit)],
            })
        }

        fn perform_time_step(&mut self, required_outputs: &[usize]) -> Result<(), EngineError> {
            self.counters.steps.set(self.counters.steps.get() + 1);
            self.counters
                .computed
                .set(self.counters.computed.get() + required_outputs.len());
            self.current += self.config.time_step;
            Ok(())
        }

        fn start_time(&self) -> Time {
            Time::at(0.0)
        }

        fn end_time(&self) -> Time {
            Time::at(self.config.end_time)
        }

        fn current_time(&self) -> Time {
            Time::at(self.current)
        }

        fn input_time_as(&self, as_stamp: bool) -> Time {
            next_time(self.current, self.config.time_step, as_stamp)
        }

        fn set_input_values(&mut self, _input: usize, _values: &ValueSet) -> Result<(), EngineError> {
            Err("a ramp has no inputs".into())
        }

        fn input_values(&self, _input: usize) -> Result<ValueSet, EngineError> {
            Err("a ramp has no inputs".into())
        }

        #[allow(clippy::cast_precision_loss)]
        fn output_values(&self, output: usize) -> Result<ValueSet, EngineError> {
            if output != 0 {
                return Err(format!("no output {output}").into());
            }
            let base = self.config.offset + self.config.slope * self.current;
            Ok(ValueSet::from_row(
                (0..self.config.elements.len())
                    .map(|element| base + element as f64)
                    .collect(),
            ))
        }
    }
}

pub mod recorder {
    use confluence_core::{Argument, Time, ValueSet};
    use confluence_runtime::{Engine, EngineError, ExchangeItems};
    use serde::{Deserialize, Serialize};

    use super::{FlowUnit, Log, default_elements, flow_item, next_time};

    /// A sink that logs the flow it receives at every step.
    pub struct Recorder {
        config: Config,
        current: f64,
        latest: Option<Vec<f64>>,
        log: Log,
    }

    /// Configuration settings for the recorder.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(deny_unknown_fields)]
    pub struct Config {
        pub time_step: f64,
        pub end_time: f64,

        #[serde(default = "default_elements")]
        pub elements: Vec<String>,

        #[serde(default)]
        pub unit: FlowUnit,
    }

    impl Default for Config {
        fn default() -> Self {
            Self {
                time_step: 1.0,
                end_time: 4.0,
                elements: default_elements(),
                unit: FlowUnit::default(),
            }
        }
    }

    impl Recorder {
        #[must_use]
        pub fn new(config: Config) -> Self {
            Self {
                config,
                current: 0.0,
                latest: None,
                log: Log::default(),
            }
        }

        #[must_use]
        pub fn log(&self) -> Log {
            Log::clone(&self.log)
        }
    }

    impl Engine for Recorder {
        fn initialize(&mut self, _arguments: &[Argument]) -> Result<ExchangeItems, EngineError> {
            self.current = 0.0;
            self.latest = None;
            Ok(ExchangeItems {
                inputs: vec![flow_item("flow", &self.config.elements, self.config.unit)],
                outputs: Vec::new(),
            })
        }

        fn perform_time_step(&mut self, _required_outputs: &[usize]) -> Result<(), EngineError> {
            self.current += self.config.time_step;
            if let Some(latest) = &self.latest {
                self.log.borrow_mut().push((self.current, latest.clone()));
            }
            Ok(())
        }

        fn start_time(&self) -> Time {
            Time::at(0.0)
        }

        fn end_time(&self) -> Time {
            Time::at(self.config.end_time)
        }

        fn current_time(&self) -> Time {
            Time::at(self.current)
        }

        fn input_time_as(&self, as_stamp: bool) -> Time {
            next_time(self.current, self.config.time_step, as_stamp)
        }

        fn set_input_values(&mut self, input: usize, values: &ValueSet) -> Result<(), EngineError> {
            if input != 0 {
                return Err(format!("no input {input}").into());
            }
            if values.element_count() != self.config.elements.len() {
                return Err(format!(
                    "expected {} reaches, got {}",
                    self.config.elements.len(),
                    values.element_count()
                )
                .into());
            }
            self.latest = values.element_values(0).map(|row| row.to_vec());
            Ok(())
        }

        fn input_values(&self, input: usize) -> Result<ValueSet, EngineError> {
            if input != 0 {
                return Err(format!("no input {input}").into());
            }
            self.latest
                .clone()
                .map(ValueSet::from_row)
                .ok_or_else(|| "nothing received yet".into())
        }

        fn output_values(&self, output: usize) -> Result<ValueSet, EngineError> {
            Err(format!("a recorder has no output {output}").into())
        }
    }
}

pub mod exchanger {
    use confluence_core::{Argument, Time, ValueSet};
    use confluence_runtime::{Engine, EngineError, ExchangeItems};
    use serde::{Deserialize, Serialize};

    use super::{FlowUnit, Log, default_elements, flow_item, next_time};

    /// Takes an inflow and reports an outflow of its clock plus an offset.
    ///
    /// Two exchangers wired to each other form a two-way coupling.
    pub struct Exchanger {
        config: Config,
        current: f64,
        latest: Option<f64>,
        log: Log,
    }

    /// Configuration settings for the exchanger.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(deny_unknown_fields)]
    pub struct Config {
        pub time_step: f64,
        pub end_time: f64,

        #[serde(default)]
        pub offset: f64,
    }

    impl Exchanger {
        #[must_use]
        pub fn new(config: Config) -> Self {
            Self {
                config,
                current: 0.0,
                latest: None,
                log: Log::default(),
            }
        }

        #[must_use]
        pub fn log(&self) -> Log {
            Log::clone(&self.log)
        }
    }

    impl Engine for Exchanger {
        fn initialize(&mut self, _arguments: &[Argument]) -> Result<ExchangeItems, EngineError> {
            self.current = 0.0;
            let elements = default_elements();
            Ok(ExchangeItems {
                inputs: vec![flow_item("inflow", &elements, FlowUnit::default())],
                outputs: vec![flow_item("outflow", &elements, FlowUnit::default())],
            })
        }

        fn perform_time_step(&mut self, _required_outputs: &[usize]) -> Result<(), EngineError> {
            self.current += self.config.time_step;
            if let Some(latest) = self.latest {
                self.log.borrow_mut().push((self.current, vec![latest]));
            }
            Ok(())
        }

        fn start_time(&self) -> Time {
            Time::at(0.0)
        }

        fn end_time(&self) -> Time {
            Time::at(self.config.end_time)
        }

        fn current_time(&self) -> Time {
            Time::at(self.current)
        }

        fn input_time_as(&self, as_stamp: bool) -> Time {
            next_time(self.current, self.config.time_step, as_stamp)
        }

        fn set_input_values(&mut self, _input: usize, values: &ValueSet) -> Result<(), EngineError> {
            self.latest = Some(values.value(0, 0)?);
            Ok(())
        }

        fn input_values(&self, _input: usize) -> Result<ValueSet, EngineError> {
            self.latest
                .map(ValueSet::scalar)
                .ok_or_else(|| "nothing received yet".into())
        }

        fn output_values(&self, _output: usize) -> Result<ValueSet, EngineError> {
            Ok(ValueSet::scalar(self.current + self.config.offset))
        }
    }
}
