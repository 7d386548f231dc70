use std::rc::Rc;

use confluence_buffer::SmartBuffer;
use confluence_core::{EPSILON, ExchangeItem, Status, Time, TimeSet, ValueSet};
use tracing::{trace, warn};

use crate::{
    adapter::{AdapterKind, linear, spatial, wave},
    error::RuntimeError,
    event::Event,
    handle::{ComponentId, InputId, OutputId},
    updater::{ComponentUpdater, TimeComponentUpdater},
};

use super::{Composition, OutputNode, OutputSource};

/// How an output produces values, without borrowing the composition.
#[derive(Clone, Copy)]
enum Producer {
    Engine { component: ComponentId, index: usize },
    Chain { adaptee: OutputId },
    Buffer { adaptee: OutputId },
}

impl Composition {
    /// Returns the values of an output for the times and elements of
    /// `query`.
    ///
    /// Outputs answer only for the time they were last computed at; the
    /// owning component is advanced to reach the query time if it can.
    /// Time buffers answer for any time, advancing the component when asked
    /// beyond the buffered times and extrapolating otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the query does not fit the output, or if updating
    /// the owning component fails.
    pub fn get_values(
        &mut self,
        output: OutputId,
        query: &ExchangeItem,
    ) -> Result<ValueSet, RuntimeError> {
        self.fetch(output, query, true)
    }

    /// Returns the current values of an output, one row per time of its
    /// time set.
    ///
    /// # Errors
    ///
    /// Returns an error if the output is unknown or has no values.
    pub fn output_values(&self, output: OutputId) -> Result<ValueSet, RuntimeError> {
        match self.producer(output)? {
            Producer::Engine { component, index } => {
                let node = self.output(output)?;
                if node.store_values {
                    return node.values.clone().ok_or_else(|| RuntimeError::NoValues {
                        output: node.item.id.clone(),
                    });
                }
                let owner = self.component(component)?;
                owner
                    .engine
                    .output_values(index)
                    .map_err(|source| owner.engine_error(source))
            }
            Producer::Chain { adaptee } => {
                let values = self.output_values(adaptee)?;
                let times = self.output_time_set(adaptee)?;
                self.transform(output, &values, times.times())
            }
            Producer::Buffer { .. } => Ok(self.buffer(output)?.all_values()?),
        }
    }

    /// Returns the times the current values of an output refer to.
    ///
    /// # Errors
    ///
    /// Returns an error if the output is unknown.
    pub fn output_time_set(&self, output: OutputId) -> Result<TimeSet, RuntimeError> {
        match self.producer(output)? {
            Producer::Engine { .. } => Ok(self.output(output)?.item.time_set.clone()),
            Producer::Chain { adaptee } => self.output_time_set(adaptee),
            Producer::Buffer { .. } => Ok(self.buffer(output)?.time_set().clone()),
        }
    }

    /// Returns the values an input last received.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is unknown or has not received values.
    pub fn input_values(&self, input: InputId) -> Result<ValueSet, RuntimeError> {
        let node = self.input(input)?;
        if node.store_values {
            return node.values.clone().ok_or_else(|| RuntimeError::NoValues {
                output: node.item.id.clone(),
            });
        }
        let owner = self.component(node.component)?;
        owner
            .engine
            .input_values(node.index)
            .map_err(|source| owner.engine_error(source))
    }

    /// Hands values to an input as if a provider had delivered them.
    ///
    /// Inputs that store their values hold them until the next step.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is unknown or the engine rejects the
    /// values.
    pub fn set_input_values(&mut self, input: InputId, values: ValueSet) -> Result<(), RuntimeError> {
        let node = self.input_mut(input)?;
        if node.store_values {
            node.values = Some(values);
            node.processed = false;
            let component = node.component;
            self.component_mut(component)?.pending_inputs.push(input);
            return Ok(());
        }

        let (component, index) = (node.component, node.index);
        let owner = self.component_mut(component)?;
        owner
            .engine
            .set_input_values(index, &values)
            .map_err(|source| owner.engine_error(source))
    }

    /// Sets the input's query time to what the engine needs next.
    ///
    /// Returns `false` if the engine skips the input this step.
    pub(super) fn set_input_time(&mut self, input: InputId) -> Result<bool, RuntimeError> {
        let node = self.input(input)?;
        let as_stamp = !node.item.time_set.has_durations();
        let time = self
            .component(node.component)?
            .engine
            .input_time(node.index, as_stamp);
        let Some(time) = time else {
            return Ok(false);
        };
        self.input_mut(input)?.item.time_set.set_single_time(time)?;
        Ok(true)
    }

    /// Fetches the values of every provider of an input, sums them and
    /// delivers the result.
    pub(super) fn update_input(&mut self, input: InputId, pull: bool) -> Result<(), RuntimeError> {
        if !self.set_input_time(input)? {
            return Ok(());
        }
        let node = self.input(input)?;
        let query = node.item.clone();
        let providers = node.providers.clone();
        if providers.is_empty() {
            return Err(RuntimeError::NoProvider {
                input: query.id.clone(),
            });
        }

        let mut sum: Option<ValueSet> = None;
        for provider in providers {
            trace!(%input, %provider, "pulling");
            let values = self.fetch(provider, &query, pull)?;
            match &mut sum {
                None => sum = Some(values),
                Some(sum) => {
                    if sum.add_assign(&values).is_err() {
                        return Err(RuntimeError::ShapeMismatch {
                            input: query.id.clone(),
                            expected: sum.shape(),
                            found: values.shape(),
                        });
                    }
                }
            }
        }

        match sum {
            Some(values) => self.set_input_values(input, values),
            None => Ok(()),
        }
    }

    /// Returns `true` if an output can answer `query` without updating
    /// anyone.
    ///
    /// Time buffers can answer anything within their horizon once they hold
    /// values.
    pub(super) fn can_answer(
        &self,
        output: OutputId,
        query: &ExchangeItem,
    ) -> Result<bool, RuntimeError> {
        let node = self.output(output)?;
        if node.item.element_count() != query.element_count() {
            return Ok(false);
        }
        match self.producer(output)? {
            Producer::Engine { .. } => self.time_fits(output, query),
            Producer::Chain { adaptee } => self.can_answer(adaptee, &self.adaptee_query(output, query)?),
            Producer::Buffer { .. } => {
                let buffer = self.buffer(output)?;
                let horizon =
                    buffer
                        .time_set()
                        .horizon()
                        .ok_or_else(|| RuntimeError::MissingHorizon {
                            output: node.item.id.clone(),
                        })?;
                let required = query.time_set.last().map_or(horizon.end(), Time::end);
                Ok(!buffer.is_empty() && required <= horizon.end() + EPSILON)
            }
        }
    }

    fn fetch(
        &mut self,
        output: OutputId,
        query: &ExchangeItem,
        pull: bool,
    ) -> Result<ValueSet, RuntimeError> {
        let node = self.output(output)?;
        if node.item.element_count() != query.element_count() {
            return Err(RuntimeError::ElementSetMismatch {
                output: node.item.id.clone(),
                query: query.id.clone(),
                expected: query.element_count(),
                found: node.item.element_count(),
            });
        }

        match self.producer(output)? {
            Producer::Engine { component, .. } => {
                if !self.time_fits(output, query)? && pull {
                    TimeComponentUpdater.update(self, output, query)?;
                }
                if !self.time_fits(output, query)? {
                    return Err(RuntimeError::TimeSetMismatch {
                        component: self.component(component)?.id.clone(),
                        output: self.output(output)?.item.id.clone(),
                        query: query.id.clone(),
                    });
                }
                self.output_values(output)
            }
            Producer::Chain { adaptee } => {
                let adaptee_query = self.adaptee_query(output, query)?;
                let values = self.fetch(adaptee, &adaptee_query, pull)?;
                self.transform(output, &values, query.time_set.times())
            }
            Producer::Buffer { .. } => self.fetch_buffered(output, query, pull),
        }
    }

    fn fetch_buffered(
        &mut self,
        output: OutputId,
        query: &ExchangeItem,
        pull: bool,
    ) -> Result<ValueSet, RuntimeError> {
        let Some(required) = query.time_set.last().map(Time::end) else {
            return Err(RuntimeError::EmptyQuery {
                output: self.output(output)?.item.id.clone(),
                query: query.id.clone(),
            });
        };

        if pull && self.buffered_until(output)? + EPSILON < required {
            let updater = match self.adapter_kind(output)? {
                AdapterKind::TimeBuffer {
                    updater: Some(updater),
                    ..
                } => Rc::clone(updater),
                _ => {
                    return Err(RuntimeError::NoUpdater {
                        output: self.output(output)?.item.id.clone(),
                    });
                }
            };
            updater.update(self, output, query)?;

            let available = self.buffered_until(output)?;
            if available + EPSILON < required {
                warn!(
                    output = %self.output(output)?.item.id,
                    available,
                    required,
                    "time buffer extrapolates beyond its adaptee"
                );
            }
        }

        let watermark = self.watermark(output);
        let id = self.output(output)?.item.id.clone();
        let buffer = self.buffer_mut(output)?;

        let rows = query
            .time_set
            .times()
            .iter()
            .map(|time| buffer.get_values(time))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| RuntimeError::Buffer {
                output: id.clone(),
                source,
            })?;
        if let Some(watermark) = watermark {
            buffer.clear_before(&Time::at(watermark));
        }
        Ok(ValueSet::from_rows(rows)?)
    }

    /// Publishes the values of every active engine output of a component
    /// and refreshes the adapted outputs listening to them.
    pub(super) fn process_active_outputs(&mut self, component: ComponentId) -> Result<(), RuntimeError> {
        for output in self.active_outputs(component)? {
            self.update_output(output)?;
        }
        Ok(())
    }

    fn update_output(&mut self, output: OutputId) -> Result<(), RuntimeError> {
        let Producer::Engine { component, index } = self.producer(output)? else {
            return Ok(());
        };
        let has_durations = self.output(output)?.item.time_set.has_durations();
        let time = self
            .component(component)?
            .engine
            .output_time(index, !has_durations);
        let Some(time) = time.filter(|time| time.is_span() == has_durations) else {
            trace!(%output, "no values at this time");
            return Ok(());
        };

        let values = if self.output(output)?.store_values {
            let owner = self.component(component)?;
            let values = owner
                .engine
                .output_values(index)
                .map_err(|source| owner.engine_error(source))?;
            Some(values)
        } else {
            None
        };

        let node = self.output_mut(output)?;
        let changed = node.item.time_set.times() != [time];
        node.item.time_set.set_single_time(time)?;
        if values.is_some() {
            node.values = values;
        }

        if changed {
            self.emit(Event::ValuesChanged { output });
            self.refresh_adapted_outputs(output)?;
        }
        Ok(())
    }

    /// Brings an adapted output up to date with its adaptee, then its own
    /// active adapted outputs, depth first.
    ///
    /// Only time buffers hold state; other adapters compute on demand.
    /// Refreshing again without a change of the adaptee leaves the values
    /// as they are.
    ///
    /// Components refresh their adapted outputs after every step, so calling
    /// this directly is rarely needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the output is unknown, or if a time buffer is
    /// refreshed while its owner is neither preparing nor updating.
    pub fn refresh(&mut self, output: OutputId) -> Result<(), RuntimeError> {
        if let Producer::Buffer { adaptee } = self.producer(output)? {
            let owner = self.component(self.output(output)?.component)?;
            if !matches!(owner.status, Status::Preparing | Status::Updating) {
                return Err(RuntimeError::InvalidStatus {
                    component: owner.id.clone(),
                    status: owner.status,
                    operation: "refresh",
                });
            }

            let times = self.output_time_set(adaptee)?;
            if !times.is_empty() {
                let values = self.output_values(adaptee)?;
                let id = self.output(output)?.item.id.clone();
                let buffer = self.buffer_mut(output)?;
                for (time, row) in times.times().iter().zip(values.rows()) {
                    buffer
                        .set_or_add_values(*time, row.to_vec())
                        .map_err(|source| RuntimeError::Buffer {
                            output: id.clone(),
                            source,
                        })?;
                }
                trace!(output = %id, len = buffer.len(), "time buffer refreshed");
                self.emit(Event::ValuesChanged { output });
            }
        }
        self.refresh_adapted_outputs(output)
    }

    fn refresh_adapted_outputs(&mut self, output: OutputId) -> Result<(), RuntimeError> {
        for child in self.output(output)?.adapted_outputs.clone() {
            if self.output(child)?.is_active() {
                self.refresh(child)?;
            }
        }
        Ok(())
    }

    /// The earliest time any consumer below an output will still ask for,
    /// or `None` if some consumer has not consumed anything yet.
    fn watermark(&self, output: OutputId) -> Option<f64> {
        let node = self.output(output).ok()?;
        let mut earliest = f64::INFINITY;
        for &input in &node.consumers {
            let horizon = self.inputs.get(input.0)?.item.time_set.horizon()?;
            earliest = earliest.min(horizon.stamp());
        }
        for &child in &node.adapted_outputs {
            if self.output(child).is_ok_and(OutputNode::is_active) {
                earliest = earliest.min(self.watermark(child)?);
            }
        }
        earliest.is_finite().then_some(earliest)
    }

    fn buffered_until(&self, output: OutputId) -> Result<f64, RuntimeError> {
        Ok(self
            .buffer(output)?
            .last_time()
            .map_or(f64::NEG_INFINITY, Time::end))
    }

    /// Returns `true` if the output's current times are the query's times.
    fn time_fits(&self, output: OutputId, query: &ExchangeItem) -> Result<bool, RuntimeError> {
        let node = self.output(output)?;
        let current = &node.item.time_set;
        if query.time_set.is_empty() {
            return Ok(true);
        }
        if current.has_durations() != query.time_set.has_durations() {
            return Err(RuntimeError::IncompatibleTimeKinds {
                output: node.item.id.clone(),
                query: query.id.clone(),
            });
        }
        Ok(current.times() == query.time_set.times())
    }

    /// The query to pass on to an adaptee: spatial adapters ask for the
    /// adaptee's own elements.
    fn adaptee_query(
        &self,
        output: OutputId,
        query: &ExchangeItem,
    ) -> Result<ExchangeItem, RuntimeError> {
        let mut adaptee_query = query.clone();
        if let AdapterKind::Spatial { .. } = self.adapter_kind(output)? {
            if let Some(adaptee) = self.adaptee(output)? {
                adaptee_query.element_set = self.output(adaptee)?.item.element_set.clone();
            }
        }
        Ok(adaptee_query)
    }

    fn transform(
        &self,
        output: OutputId,
        values: &ValueSet,
        times: &[Time],
    ) -> Result<ValueSet, RuntimeError> {
        let OutputSource::Adapted {
            arguments, kind, ..
        } = &self.output(output)?.source
        else {
            return Ok(values.clone());
        };
        Ok(match kind {
            AdapterKind::Linear => linear::apply(values, arguments)?,
            AdapterKind::Wave => wave::apply(values, times, arguments)?,
            AdapterKind::Spatial { matrix, .. } => spatial::apply(values, matrix)?,
            AdapterKind::TimeBuffer { .. } => values.clone(),
        })
    }

    fn producer(&self, output: OutputId) -> Result<Producer, RuntimeError> {
        let node = self.output(output)?;
        Ok(match &node.source {
            OutputSource::Engine { index } => Producer::Engine {
                component: node.component,
                index: *index,
            },
            OutputSource::Adapted {
                adaptee,
                kind: AdapterKind::TimeBuffer { .. },
                ..
            } => Producer::Buffer { adaptee: *adaptee },
            OutputSource::Adapted { adaptee, .. } => Producer::Chain { adaptee: *adaptee },
        })
    }

    fn buffer(&self, output: OutputId) -> Result<&SmartBuffer, RuntimeError> {
        match self.adapter_kind(output)? {
            AdapterKind::TimeBuffer { buffer, .. } => Ok(buffer),
            _ => Err(self.not_a_buffer(output)),
        }
    }

    fn buffer_mut(&mut self, output: OutputId) -> Result<&mut SmartBuffer, RuntimeError> {
        let err = self.not_a_buffer(output);
        match &mut self.output_mut(output)?.source {
            OutputSource::Adapted {
                kind: AdapterKind::TimeBuffer { buffer, .. },
                ..
            } => Ok(buffer),
            _ => Err(err),
        }
    }

    fn not_a_buffer(&self, output: OutputId) -> RuntimeError {
        match self.output(output) {
            Ok(node) => RuntimeError::NotAdapted {
                output: node.item.id.clone(),
            },
            Err(err) => err,
        }
    }

    fn adapter_kind(&self, output: OutputId) -> Result<&AdapterKind, RuntimeError> {
        let node = self.output(output)?;
        match &node.source {
            OutputSource::Adapted { kind, .. } => Ok(kind),
            OutputSource::Engine { .. } => Err(RuntimeError::NotAdapted {
                output: node.item.id.clone(),
            }),
        }
    }
}
