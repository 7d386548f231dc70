use std::{f64::consts::FRAC_PI_2, rc::Rc};

use approx::assert_relative_eq;
use confluence_integration_tests::{
    init_tracing,
    test_components::{
        FlowUnit, Log,
        ramp::{self, Ramp},
        recorder::{self, Recorder},
    },
};
use confluence_runtime::{
    ComponentId, Composition, IdBasedMapper, InputId, LinearFactory, OutputId, RuntimeError,
    TimeBufferFactory, WaveFactory,
};

struct Setup {
    composition: Composition,
    provider: ComponentId,
    output: OutputId,
    input: InputId,
    log: Log,
}

fn setup(ramp: ramp::Config, recorder: recorder::Config) -> Setup {
    init_tracing();

    let mut composition = Composition::new();
    let provider = composition.add_component("ramp", Box::new(Ramp::new(ramp)));
    let engine = Recorder::new(recorder);
    let log = engine.log();
    let consumer = composition.add_component("recorder", Box::new(engine));
    composition.initialize(provider).unwrap();
    composition.initialize(consumer).unwrap();

    let output = composition.find_output(provider, "flow").unwrap();
    let input = composition.find_input(consumer, "flow").unwrap();
    Setup {
        composition,
        provider,
        output,
        input,
        log,
    }
}

fn recorded(log: &Log) -> Vec<Vec<f64>> {
    log.borrow().iter().map(|(_, values)| values.clone()).collect()
}

#[test]
fn id_based_mapping_between_reach_sets() {
    let Setup {
        mut composition,
        output,
        input,
        log,
        ..
    } = setup(
        ramp::Config {
            end_time: 2.0,
            elements: vec!["a".into(), "b".into(), "c".into()],
            ..ramp::Config::default()
        },
        recorder::Config {
            end_time: 2.0,
            elements: vec!["c".into(), "a".into()],
            ..recorder::Config::default()
        },
    );

    assert!(matches!(
        composition.connect(output, input),
        Err(RuntimeError::ElementSetMismatch {
            expected: 2,
            found: 3,
            ..
        })
    ));

    let available = composition.available_adapter_ids(output, Some(input)).unwrap();
    assert!(
        available
            .iter()
            .any(|(factory, adapter)| factory == "ramp-Spatial" && adapter.id == IdBasedMapper::ID)
    );

    let mapped = composition
        .create_adapted_output("ramp-Spatial", IdBasedMapper::ID, output, Some(input))
        .unwrap();
    assert_eq!(
        composition.output_item(mapped).unwrap().element_count(),
        2
    );
    composition.connect(mapped, input).unwrap();
    composition.run().unwrap();

    // Reach `i` of the ramp reports `t + i`.
    assert_eq!(recorded(&log), vec![vec![3.0, 1.0], vec![4.0, 2.0]]);
}

#[test]
fn unit_conversion_between_flow_units() {
    let Setup {
        mut composition,
        output,
        input,
        log,
        ..
    } = setup(
        ramp::Config {
            end_time: 2.0,
            ..ramp::Config::default()
        },
        recorder::Config {
            end_time: 2.0,
            unit: FlowUnit::LitersPerSecond,
            ..recorder::Config::default()
        },
    );

    let available = composition.available_adapter_ids(output, Some(input)).unwrap();
    assert!(
        available
            .iter()
            .any(|(_, adapter)| adapter.id == LinearFactory::UNIT_CONVERSION)
    );

    let converted = composition
        .create_adapted_output(
            "ramp-Linear",
            LinearFactory::UNIT_CONVERSION,
            output,
            Some(input),
        )
        .unwrap();
    assert!(matches!(
        composition.set_argument(converted, "A", 1.0),
        Err(RuntimeError::Argument(_))
    ));
    composition.connect(converted, input).unwrap();
    composition.run().unwrap();

    let values = recorded(&log);
    assert_eq!(values.len(), 2);
    assert_relative_eq!(values[0][0], 1000.0, max_relative = 1e-12);
    assert_relative_eq!(values[1][0], 2000.0, max_relative = 1e-12);
}

#[test]
fn conversion_on_top_of_a_time_buffer() {
    let Setup {
        mut composition,
        output,
        input,
        log,
        ..
    } = setup(
        ramp::Config {
            time_step: 2.0,
            ..ramp::Config::default()
        },
        recorder::Config {
            unit: FlowUnit::LitersPerSecond,
            ..recorder::Config::default()
        },
    );

    let buffered = composition
        .create_adapted_output(
            "ramp-TimeBuffer",
            TimeBufferFactory::INTERPOLATOR,
            output,
            Some(input),
        )
        .unwrap();
    let converted = composition
        .create_adapted_output(
            "ramp-Linear",
            LinearFactory::UNIT_CONVERSION,
            buffered,
            Some(input),
        )
        .unwrap();
    assert_eq!(composition.adaptee(converted).unwrap(), Some(buffered));
    composition.connect(converted, input).unwrap();

    assert!(composition.is_active(buffered).unwrap());
    composition.run().unwrap();

    let values = recorded(&log);
    assert_eq!(values.len(), 4);
    for (step, values) in values.iter().enumerate() {
        assert_relative_eq!(values[0], 1000.0 * (step + 1) as f64, max_relative = 1e-12);
    }
}

#[test]
fn wave_replaces_the_values() {
    let Setup {
        mut composition,
        provider,
        output,
        input,
        log,
    } = setup(
        ramp::Config {
            end_time: 2.0,
            ..ramp::Config::default()
        },
        recorder::Config {
            end_time: 2.0,
            ..recorder::Config::default()
        },
    );

    composition
        .add_factory(provider, Rc::new(WaveFactory::new("ramp-Wave")))
        .unwrap();
    let wave = composition
        .create_adapted_output("ramp-Wave", WaveFactory::WAVE, output, Some(input))
        .unwrap();
    composition.set_argument(wave, "Amplitude", 2.0).unwrap();
    composition.set_argument(wave, "Frequency", FRAC_PI_2).unwrap();
    composition.connect(wave, input).unwrap();
    composition.run().unwrap();

    let values = recorded(&log);
    assert_eq!(values.len(), 2);
    assert_relative_eq!(values[0][0], 2.0, epsilon = 1e-12);
    assert_relative_eq!(values[1][0], 0.0, epsilon = 1e-12);
}
