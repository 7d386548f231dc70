use std::{cell::RefCell, rc::Rc};

use approx::assert_relative_eq;
use confluence_core::{
    Argument, Dimension, ElementSet, ExchangeItem, Status, Time, Unit, ValueDefinition, ValueSet,
};

use crate::{
    config::RuntimeConfig,
    engine::{Engine, EngineError, ExchangeItems},
    error::RuntimeError,
    event::Event,
    handle::{ComponentId, InputId, OutputId},
};

use super::Composition;

fn scalar(id: &str) -> ExchangeItem {
    ExchangeItem::new(
        id,
        ValueDefinition::quantity("Value", Unit::si("-", Dimension::dimensionless())),
        ElementSet::scalar(id),
    )
}

/// Steps from 0 to `end` by `dt`; output `k` reports the clock plus `10 * k`.
struct Stepper {
    dt: f64,
    end: f64,
    current: f64,
    inputs: Vec<&'static str>,
    outputs: Vec<&'static str>,
    received: Vec<Option<ValueSet>>,
    required: Rc<RefCell<Vec<Vec<usize>>>>,
    restart: bool,
    /// Items exchange values for the span of a step instead of its end.
    spans: bool,
    /// Outputs always refer to the start time.
    constant_outputs: bool,
}

impl Stepper {
    fn new(dt: f64, end: f64) -> Self {
        Self {
            dt,
            end,
            current: 0.0,
            inputs: Vec::new(),
            outputs: Vec::new(),
            received: Vec::new(),
            required: Rc::default(),
            restart: false,
            spans: false,
            constant_outputs: false,
        }
    }

    fn with_spans(mut self) -> Self {
        self.spans = true;
        self
    }

    fn with_inputs(mut self, ids: &[&'static str]) -> Self {
        self.inputs = ids.to_vec();
        self
    }

    fn with_outputs(mut self, ids: &[&'static str]) -> Self {
        self.outputs = ids.to_vec();
        self
    }
}

impl Engine for Stepper {
    fn initialize(&mut self, _arguments: &[Argument]) -> Result<ExchangeItems, EngineError> {
        self.current = 0.0;
        self.received = vec![None; self.inputs.len()];
        let item = |id: &&str| {
            let item = scalar(id);
            if self.spans { item.with_spans() } else { item }
        };
        Ok(ExchangeItems {
            inputs: self.inputs.iter().map(item).collect(),
            outputs: self.outputs.iter().map(item).collect(),
        })
    }

    fn perform_time_step(&mut self, required_outputs: &[usize]) -> Result<(), EngineError> {
        self.required.borrow_mut().push(required_outputs.to_vec());
        self.current += self.dt;
        Ok(())
    }

    fn start_time(&self) -> Time {
        Time::at(0.0)
    }

    fn end_time(&self) -> Time {
        Time::at(self.end)
    }

    fn current_time(&self) -> Time {
        Time::at(self.current)
    }

    fn current_time_as(&self, as_stamp: bool) -> Time {
        if as_stamp || self.current <= 0.0 {
            Time::at(self.current)
        } else {
            Time::between(self.current - self.dt, self.current).unwrap_or(Time::at(self.current))
        }
    }

    fn output_time(&self, _output: usize, as_stamp: bool) -> Option<Time> {
        if self.constant_outputs {
            Some(Time::at(0.0))
        } else {
            Some(self.current_time_as(as_stamp))
        }
    }

    fn input_time_as(&self, as_stamp: bool) -> Time {
        let next = self.current + self.dt;
        if as_stamp {
            Time::at(next)
        } else {
            Time::between(self.current, next).unwrap_or(Time::at(next))
        }
    }

    fn set_input_values(&mut self, input: usize, values: &ValueSet) -> Result<(), EngineError> {
        let slot = self.received.get_mut(input).ok_or("unknown input")?;
        *slot = Some(values.clone());
        Ok(())
    }

    fn input_values(&self, input: usize) -> Result<ValueSet, EngineError> {
        self.received
            .get(input)
            .cloned()
            .flatten()
            .ok_or_else(|| "no values received".into())
    }

    #[allow(clippy::cast_precision_loss)]
    fn output_values(&self, output: usize) -> Result<ValueSet, EngineError> {
        if output >= self.outputs.len() {
            return Err("unknown output".into());
        }
        Ok(ValueSet::scalar(self.current + 10.0 * output as f64))
    }

    fn supports_restart(&self) -> bool {
        self.restart
    }
}

fn add(composition: &mut Composition, id: &str, engine: Stepper) -> ComponentId {
    let component = composition.add_component(id, Box::new(engine));
    composition.initialize(component).unwrap();
    component
}

fn prepare_all(composition: &mut Composition) {
    for component in composition.component_ids() {
        assert!(composition.validate(component).unwrap().is_empty());
        composition.prepare(component).unwrap();
    }
}

/// A provider with one output `flow` stepping by `provider_dt`, linked to a
/// consumer with one input `flow` stepping by 1.
fn pair(provider_dt: f64) -> (Composition, ComponentId, ComponentId, OutputId, InputId) {
    let mut composition = Composition::new();
    let provider = add(
        &mut composition,
        "provider",
        Stepper::new(provider_dt, 4.0).with_outputs(&["flow"]),
    );
    let consumer = add(
        &mut composition,
        "consumer",
        Stepper::new(1.0, 4.0).with_inputs(&["flow"]),
    );
    let output = composition.find_output(provider, "flow").unwrap();
    let input = composition.find_input(consumer, "flow").unwrap();
    (composition, provider, consumer, output, input)
}

fn input_value(composition: &Composition, input: InputId) -> f64 {
    composition.input_values(input).unwrap().value(0, 0).unwrap()
}

#[test]
fn status_sequence_of_a_one_step_run() {
    use Status::*;

    let mut composition = Composition::new();
    let statuses = Rc::new(RefCell::new(vec![Created]));
    let seen = Rc::clone(&statuses);
    composition.add_observer(move |event: &Event| {
        if let Event::StatusChanged { new, .. } = event {
            seen.borrow_mut().push(*new);
        }
    });

    composition.add_component("solo", Box::new(Stepper::new(1.0, 1.0)));
    composition.run().unwrap();

    assert_eq!(
        *statuses.borrow(),
        vec![
            Created,
            Initializing,
            Initialized,
            Validating,
            Valid,
            Preparing,
            Updated,
            Updating,
            Done,
            Finishing,
            Finished
        ]
    );
}

#[test]
fn operations_check_the_status() {
    let mut composition = Composition::new();
    let component = composition.add_component("solo", Box::new(Stepper::new(1.0, 1.0)));

    assert!(matches!(
        composition.update(component),
        Err(RuntimeError::InvalidStatus {
            status: Status::Created,
            ..
        })
    ));

    composition.initialize(component).unwrap();
    assert!(matches!(
        composition.prepare(component),
        Err(RuntimeError::InvalidStatus { .. })
    ));
    assert!(matches!(
        composition.initialize(component),
        Err(RuntimeError::InvalidStatus { .. })
    ));
    assert_eq!(composition.status(component).unwrap(), Status::Initialized);
}

#[test]
fn pull_advances_the_provider() {
    let (mut composition, provider, consumer, output, input) = pair(1.0);
    composition.connect(output, input).unwrap();
    prepare_all(&mut composition);

    composition.update(consumer).unwrap();

    assert_relative_eq!(input_value(&composition, input), 1.0);
    assert_relative_eq!(composition.current_time(provider).unwrap().stamp(), 1.0);
    assert_eq!(composition.status(provider).unwrap(), Status::Updated);
    assert_eq!(composition.status(consumer).unwrap(), Status::Updated);
}

#[test]
fn direct_link_with_other_time_step_fails() {
    let (mut composition, _, consumer, output, input) = pair(2.0);
    composition.connect(output, input).unwrap();
    prepare_all(&mut composition);

    let err = composition.update(consumer).unwrap_err();
    assert!(matches!(err, RuntimeError::TimeSetMismatch { .. }));
    assert_eq!(composition.status(consumer).unwrap(), Status::Failed);
}

#[test]
fn time_buffer_interpolates_between_provider_steps() {
    let (mut composition, provider, consumer, output, input) = pair(2.0);
    let buffered = composition
        .create_adapted_output("provider-TimeBuffer", "TimeInterpolator", output, Some(input))
        .unwrap();
    composition.connect(buffered, input).unwrap();
    prepare_all(&mut composition);

    for expected in [1.0, 2.0, 3.0, 4.0] {
        composition.update(consumer).unwrap();
        assert_relative_eq!(input_value(&composition, input), expected);
    }

    assert_relative_eq!(composition.current_time(provider).unwrap().stamp(), 4.0);
    assert_eq!(composition.status(consumer).unwrap(), Status::Done);

    // Done is final for updates.
    composition.update(consumer).unwrap();
    assert_eq!(composition.status(consumer).unwrap(), Status::Done);
}

#[test]
fn inactive_outputs_are_never_computed() {
    let mut composition = Composition::new();
    let engine = Stepper::new(1.0, 2.0).with_outputs(&["used", "unused"]);
    let required = Rc::clone(&engine.required);
    let provider = add(&mut composition, "provider", engine);
    let consumer = add(
        &mut composition,
        "consumer",
        Stepper::new(1.0, 2.0).with_inputs(&["used"]),
    );
    let used = composition.find_output(provider, "used").unwrap();
    let unused = composition.find_output(provider, "unused").unwrap();
    let input = composition.find_input(consumer, "used").unwrap();
    composition.connect(used, input).unwrap();

    assert_eq!(composition.active_outputs(provider).unwrap(), vec![used]);
    assert!(!composition.is_active(unused).unwrap());

    composition.run().unwrap();
    assert_eq!(*required.borrow(), vec![vec![0], vec![0]]);
}

#[test]
fn outputs_with_an_adapted_output_are_active() {
    let mut composition = Composition::new();
    let engine = Stepper::new(1.0, 2.0).with_outputs(&["flow"]);
    let required = Rc::clone(&engine.required);
    let provider = add(&mut composition, "provider", engine);
    let output = composition.find_output(provider, "flow").unwrap();
    assert!(composition.active_outputs(provider).unwrap().is_empty());

    let buffered = composition
        .create_adapted_output("provider-TimeBuffer", "TimeInterpolator", output, None)
        .unwrap();
    assert_eq!(composition.active_outputs(provider).unwrap(), vec![output]);
    assert!(composition.is_active(output).unwrap());
    assert!(!composition.is_active(buffered).unwrap());

    prepare_all(&mut composition);
    composition.update(provider).unwrap();
    assert_eq!(*required.borrow(), vec![vec![0]]);

    composition.remove_adapted_output(buffered).unwrap();
    assert!(composition.active_outputs(provider).unwrap().is_empty());
}

#[test]
fn active_sets_follow_link_changes() {
    let (mut composition, provider, consumer, output, input) = pair(1.0);

    composition.connect(output, input).unwrap();
    assert_eq!(composition.active_inputs(consumer).unwrap(), vec![input]);
    assert_eq!(composition.active_outputs(provider).unwrap(), vec![output]);

    let linear = composition
        .create_adapted_output("provider-Linear", "LinearOperation", output, Some(input))
        .unwrap();
    composition.disconnect(output, input).unwrap();
    assert!(composition.active_inputs(consumer).unwrap().is_empty());
    assert_eq!(composition.active_outputs(provider).unwrap(), vec![output]);

    composition.connect(linear, input).unwrap();
    assert_eq!(composition.active_inputs(consumer).unwrap(), vec![input]);
    assert!(composition.is_active(linear).unwrap());

    composition.disconnect(linear, input).unwrap();
    composition.remove_adapted_output(linear).unwrap();
    assert!(composition.active_inputs(consumer).unwrap().is_empty());
    assert!(composition.active_outputs(provider).unwrap().is_empty());
}

#[test]
fn refreshing_twice_keeps_the_buffer() {
    let (mut composition, provider, consumer, output, input) = pair(1.0);
    let buffered = composition
        .create_adapted_output("provider-TimeBuffer", "TimeInterpolator", output, Some(input))
        .unwrap();
    composition.connect(buffered, input).unwrap();
    prepare_all(&mut composition);
    composition.update(consumer).unwrap();

    // Only the owner refreshes its buffers, while it prepares or updates.
    assert!(matches!(
        composition.refresh(buffered),
        Err(RuntimeError::InvalidStatus {
            status: Status::Updated,
            ..
        })
    ));

    composition.set_status(provider, Status::Updating).unwrap();
    composition.refresh(buffered).unwrap();
    let times = composition.output_time_set(buffered).unwrap();
    let values = composition.output_values(buffered).unwrap();
    assert_eq!(times.len(), 2);

    composition.refresh(buffered).unwrap();
    assert_eq!(composition.output_time_set(buffered).unwrap().times(), times.times());
    assert_eq!(composition.output_values(buffered).unwrap(), values);
}

#[test]
fn time_buffers_keep_what_consumers_still_need() {
    let (mut composition, provider, consumer, output, input) = pair(1.0);
    let buffered = composition
        .create_adapted_output("provider-TimeBuffer", "TimeInterpolator", output, Some(input))
        .unwrap();
    composition.connect(buffered, input).unwrap();
    prepare_all(&mut composition);

    for _ in 0..4 {
        composition.update(provider).unwrap();
    }
    let buffered_len = |composition: &Composition| {
        composition.output_time_set(buffered).unwrap().len()
    };
    assert_eq!(buffered_len(&composition), 5);

    // Nothing is dropped before the consumer has consumed anything.
    composition.update(consumer).unwrap();
    assert_relative_eq!(input_value(&composition, input), 1.0);
    assert_eq!(buffered_len(&composition), 5);

    // One entry before the consumer's last time is kept for interpolation.
    composition.update(consumer).unwrap();
    assert_eq!(buffered_len(&composition), 5);
    composition.update(consumer).unwrap();
    assert_relative_eq!(input_value(&composition, input), 3.0);
    let times = composition.output_time_set(buffered).unwrap();
    assert_eq!(times.len(), 4);
    assert_relative_eq!(times.first().unwrap().stamp(), 1.0);
}

#[test]
fn long_runs_keep_time_buffers_short() {
    let mut composition = Composition::new();
    let provider = add(
        &mut composition,
        "provider",
        Stepper::new(1.0, 30.0).with_outputs(&["flow"]),
    );
    let consumer = add(
        &mut composition,
        "consumer",
        Stepper::new(1.0, 30.0).with_inputs(&["flow"]),
    );
    let output = composition.find_output(provider, "flow").unwrap();
    let input = composition.find_input(consumer, "flow").unwrap();
    let buffered = composition
        .create_adapted_output("provider-TimeBuffer", "TimeInterpolator", output, Some(input))
        .unwrap();
    composition.connect(buffered, input).unwrap();

    composition.run().unwrap();

    assert_relative_eq!(input_value(&composition, input), 30.0);
    assert_eq!(composition.output_time_set(buffered).unwrap().len(), 3);
}

#[test]
fn time_buffer_averages_spans() {
    let mut composition = Composition::new();
    let provider = add(
        &mut composition,
        "provider",
        Stepper::new(2.0, 4.0).with_outputs(&["flow"]).with_spans(),
    );
    let consumer = add(
        &mut composition,
        "consumer",
        Stepper::new(1.0, 4.0).with_inputs(&["flow"]).with_spans(),
    );
    let output = composition.find_output(provider, "flow").unwrap();
    let input = composition.find_input(consumer, "flow").unwrap();
    let buffered = composition
        .create_adapted_output("provider-TimeBuffer", "TimeInterpolator", output, Some(input))
        .unwrap();
    composition.connect(buffered, input).unwrap();
    prepare_all(&mut composition);

    // The provider reports the clock at the end of each two day span.
    for expected in [2.0, 2.0, 4.0, 4.0] {
        composition.update(consumer).unwrap();
        assert_relative_eq!(input_value(&composition, input), expected);
    }

    let times = composition.output_time_set(buffered).unwrap();
    assert!(times.has_durations());
    assert_eq!(times.last(), Some(&Time::between(2.0, 4.0).unwrap()));
    assert_eq!(composition.status(consumer).unwrap(), Status::Done);
}

#[test]
fn values_change_only_with_the_output_time() {
    let mut composition = Composition::new();
    let changes = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::clone(&changes);
    composition.add_observer(move |event: &Event| {
        if let Event::ValuesChanged { output } = event {
            seen.borrow_mut().push(*output);
        }
    });

    let mut engine = Stepper::new(1.0, 3.0).with_outputs(&["level"]);
    engine.constant_outputs = true;
    let provider = add(&mut composition, "provider", engine);
    let output = composition.find_output(provider, "level").unwrap();
    composition
        .create_adapted_output("provider-Linear", "LinearOperation", output, None)
        .unwrap();
    prepare_all(&mut composition);
    for _ in 0..3 {
        composition.update(provider).unwrap();
    }

    assert_eq!(composition.status(provider).unwrap(), Status::Done);
    assert_eq!(*changes.borrow(), vec![output]);
}

#[test]
fn linear_adapter_transforms_values() {
    let (mut composition, _, consumer, output, input) = pair(1.0);
    let linear = composition
        .create_adapted_output("provider-Linear", "LinearOperation", output, Some(input))
        .unwrap();
    composition.set_argument(linear, "A", 2.0).unwrap();
    composition.set_argument(linear, "B", 1.0).unwrap();
    composition.connect(linear, input).unwrap();
    prepare_all(&mut composition);

    composition.update(consumer).unwrap();
    assert_relative_eq!(input_value(&composition, input), 3.0);
}

#[test]
fn multi_inputs_sum_their_providers() {
    let mut composition = Composition::new();
    let first = add(
        &mut composition,
        "first",
        Stepper::new(1.0, 2.0).with_outputs(&["flow"]),
    );
    let second = add(
        &mut composition,
        "second",
        Stepper::new(1.0, 2.0).with_outputs(&["other", "flow"]),
    );
    let consumer = add(
        &mut composition,
        "consumer",
        Stepper::new(1.0, 2.0).with_inputs(&["flow"]),
    );
    let first_flow = composition.find_output(first, "flow").unwrap();
    let second_flow = composition.find_output(second, "flow").unwrap();
    let input = composition.find_input(consumer, "flow").unwrap();

    // A plain input swaps providers.
    composition.connect(first_flow, input).unwrap();
    composition.connect(second_flow, input).unwrap();
    assert_eq!(composition.providers(input).unwrap(), &[second_flow]);
    assert!(composition.consumers(first_flow).unwrap().is_empty());
    assert!(composition.active_outputs(first).unwrap().is_empty());

    composition.make_multi_input(input).unwrap();
    composition.connect(first_flow, input).unwrap();
    prepare_all(&mut composition);

    composition.update(consumer).unwrap();
    assert_relative_eq!(input_value(&composition, input), 1.0 + 11.0);
}

#[test]
fn adapted_outputs_are_shared_and_removable() {
    let (mut composition, _, _, output, input) = pair(1.0);
    let buffered = composition
        .create_adapted_output("provider-TimeBuffer", "TimeInterpolator", output, None)
        .unwrap();
    let again = composition
        .create_adapted_output("provider-TimeBuffer", "TimeInterpolator", output, None)
        .unwrap();
    assert_eq!(buffered, again);
    assert_eq!(composition.adapted_outputs(output).unwrap(), &[buffered]);
    assert_eq!(composition.adaptee(buffered).unwrap(), Some(output));

    composition.connect(buffered, input).unwrap();
    assert!(matches!(
        composition.remove_adapted_output(buffered),
        Err(RuntimeError::AdapterInUse { .. })
    ));

    composition.disconnect(buffered, input).unwrap();
    composition.remove_adapted_output(buffered).unwrap();
    assert!(composition.adapted_outputs(output).unwrap().is_empty());
    assert!(matches!(
        composition.output_item(buffered),
        Err(RuntimeError::UnknownOutput(_))
    ));
    assert!(matches!(
        composition.remove_adapted_output(output),
        Err(RuntimeError::NotAdapted { .. })
    ));
}

#[test]
fn unknown_factory() {
    let (mut composition, _, _, output, _) = pair(1.0);
    let err = composition
        .create_adapted_output("consumer-Linear", "LinearOperation", output, None)
        .unwrap_err();
    assert!(matches!(err, RuntimeError::UnknownFactory { .. }));
}

#[test]
fn rejected_buffer_arguments_are_rolled_back() {
    let (mut composition, _, _, output, _) = pair(1.0);
    let buffered = composition
        .create_adapted_output("provider-TimeBuffer", "TimeInterpolator", output, None)
        .unwrap();

    assert!(composition
        .set_argument(buffered, "RelaxationFactor", 2.0)
        .is_err());
    let factor = composition.arguments(buffered).unwrap()[0].value().as_f64();
    assert_eq!(factor, Some(1.0));

    assert!(matches!(
        composition.set_argument(output, "A", 2.0),
        Err(RuntimeError::NotAdapted { .. })
    ));
}

#[test]
fn loop_mode_waits_for_the_provider() {
    let mut composition = Composition::new();
    let provider = add(
        &mut composition,
        "provider",
        Stepper::new(1.0, 4.0).with_outputs(&["flow"]),
    );
    let consumer = composition.add_component_with_config(
        "consumer",
        Box::new(Stepper::new(1.0, 4.0).with_inputs(&["flow"])),
        RuntimeConfig::default().with_cascading_updates(false),
    );
    composition.initialize(consumer).unwrap();
    let output = composition.find_output(provider, "flow").unwrap();
    let input = composition.find_input(consumer, "flow").unwrap();
    composition.connect(output, input).unwrap();
    prepare_all(&mut composition);

    composition.update(consumer).unwrap();
    assert_eq!(composition.status(consumer).unwrap(), Status::WaitingForData);
    assert_relative_eq!(composition.current_time(provider).unwrap().stamp(), 0.0);

    composition.update(provider).unwrap();
    composition.update(consumer).unwrap();
    assert_eq!(composition.status(consumer).unwrap(), Status::Updated);
    assert_relative_eq!(input_value(&composition, input), 1.0);
}

#[test]
fn stored_values_reach_the_engine_before_the_step() {
    let mut composition =
        Composition::with_config(RuntimeConfig::default().with_store_values_in_items(true));
    let provider = add(
        &mut composition,
        "provider",
        Stepper::new(1.0, 2.0).with_outputs(&["flow"]),
    );
    let consumer = add(
        &mut composition,
        "consumer",
        Stepper::new(1.0, 2.0).with_inputs(&["flow"]),
    );
    let output = composition.find_output(provider, "flow").unwrap();
    let input = composition.find_input(consumer, "flow").unwrap();
    composition.connect(output, input).unwrap();
    prepare_all(&mut composition);

    composition.update(consumer).unwrap();
    assert_relative_eq!(input_value(&composition, input), 1.0);
    assert_eq!(
        composition.output_values(output).unwrap(),
        ValueSet::scalar(1.0)
    );
}

#[test]
fn restartable_engines_return_to_created() {
    let mut composition = Composition::new();
    let mut engine = Stepper::new(1.0, 2.0);
    engine.restart = true;
    let component = composition.add_component("solo", Box::new(engine));

    composition.run().unwrap();
    assert_eq!(composition.status(component).unwrap(), Status::Created);

    composition.run().unwrap();
    assert_relative_eq!(composition.current_time(component).unwrap().stamp(), 2.0);
}

#[test]
fn state_needs_a_manager() {
    let mut composition = Composition::new();
    let component = composition.add_component("solo", Box::new(Stepper::new(1.0, 1.0)));
    assert!(matches!(
        composition.keep_state(component),
        Err(RuntimeError::StateUnsupported { .. })
    ));
}

#[test]
fn unknown_handles() {
    let composition = Composition::new();
    assert!(matches!(
        composition.status(ComponentId(3)),
        Err(RuntimeError::UnknownComponent(3))
    ));
    assert!(composition.component_id("missing").is_none());
}
