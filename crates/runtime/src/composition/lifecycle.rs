use confluence_core::{EPSILON, Status, Time};
use tracing::{debug, trace};

use crate::{
    adapter::AdapterKind,
    engine::ExchangeItems,
    error::RuntimeError,
    handle::{ComponentId, InputId, OutputId},
};

use super::{Composition, InputNode, OutputNode, OutputSource};

impl Composition {
    /// Initializes a component and registers its exchange items.
    ///
    /// Outputs without a horizon get one spanning the engine's start and end
    /// times. A restarted component must describe the same number of items
    /// as before; its links are kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the component is not in [`Status::Created`], or
    /// the engine fails to initialize.
    pub fn initialize(&mut self, component: ComponentId) -> Result<(), RuntimeError> {
        self.require(component, &[Status::Created], "initialize")?;
        self.set_status(component, Status::Initializing)?;

        let node = self.component_mut(component)?;
        let items = node
            .engine
            .initialize(&node.arguments)
            .map_err(|source| node.engine_error(source))
            .and_then(|items| self.register_items(component, items));
        if let Err(err) = items {
            self.fail(component);
            return Err(err);
        }

        self.set_status(component, Status::Initialized)
    }

    /// Validates a component and the links into it.
    ///
    /// Returns the problems found; the component ends up
    /// [`Status::Valid`] if there are none, [`Status::Invalid`] otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the component has not been initialized.
    pub fn validate(&mut self, component: ComponentId) -> Result<Vec<String>, RuntimeError> {
        self.require(
            component,
            &[Status::Initialized, Status::Valid, Status::Invalid],
            "validate",
        )?;
        self.set_status(component, Status::Validating)?;

        let mut messages = self.component_mut(component)?.engine.validate();
        for &input in &self.component(component)?.inputs {
            let input_node = &self.inputs[input.0];
            for &provider in &input_node.providers {
                let provider_node = self.output(provider)?;
                if provider_node.item.element_count() != input_node.item.element_count() {
                    messages.push(format!(
                        "input `{}` expects {} elements, provider `{}` offers {}",
                        input_node.item.id,
                        input_node.item.element_count(),
                        provider_node.item.id,
                        provider_node.item.element_count(),
                    ));
                }
            }
        }

        let next = if messages.is_empty() {
            Status::Valid
        } else {
            Status::Invalid
        };
        self.set_status(component, next)?;
        Ok(messages)
    }

    /// Prepares a valid component and publishes its initial output values.
    ///
    /// # Errors
    ///
    /// Returns an error if the component is not [`Status::Valid`], or the
    /// engine fails to prepare. The component is then [`Status::Failed`].
    pub fn prepare(&mut self, component: ComponentId) -> Result<(), RuntimeError> {
        self.require(component, &[Status::Valid], "prepare")?;
        self.set_status(component, Status::Preparing)?;

        let result = self.prepare_engine(component);
        if result.is_err() {
            self.fail(component);
        }
        result
    }

    fn prepare_engine(&mut self, component: ComponentId) -> Result<(), RuntimeError> {
        let node = self.component_mut(component)?;
        node.engine
            .prepare()
            .map_err(|source| node.engine_error(source))?;
        self.process_active_outputs(component)?;
        self.set_status(component, Status::Updated)
    }

    /// Advances a component by one time step.
    ///
    /// A component that is done, or already updating further up the call
    /// chain, is left alone. A valid component is prepared first.
    ///
    /// With cascading updates the component pulls its inputs, updating its
    /// providers as needed. Otherwise it only steps once every provider can
    /// answer, and moves to [`Status::WaitingForData`] until then.
    ///
    /// # Errors
    ///
    /// Returns an error if the component cannot update from its status, or
    /// if pulling, stepping or publishing fails. The component is then
    /// [`Status::Failed`].
    pub fn update(&mut self, component: ComponentId) -> Result<(), RuntimeError> {
        match self.status(component)? {
            Status::Done | Status::Updating => return Ok(()),
            Status::Valid => self.prepare(component)?,
            Status::Updated | Status::WaitingForData => {}
            _ => {
                return Err(self.invalid_status(component, "update"));
            }
        }

        let result = if self.component(component)?.config.cascading_updates() {
            self.pull_update(component)
        } else {
            self.loop_update(component)
        };
        if result.is_err() {
            self.fail(component);
        }
        result
    }

    /// Finishes a component.
    ///
    /// Engines that support restarting return to [`Status::Created`] and may
    /// be initialized again; others end [`Status::Finished`].
    ///
    /// # Errors
    ///
    /// Returns an error if the component cannot finish from its status, or
    /// the engine fails to finish. The component is then [`Status::Failed`].
    pub fn finish(&mut self, component: ComponentId) -> Result<(), RuntimeError> {
        if !self.status(component)?.can_finish() {
            return Err(self.invalid_status(component, "finish"));
        }
        self.set_status(component, Status::Finishing)?;

        let node = self.component_mut(component)?;
        let result = node
            .engine
            .finish()
            .map_err(|source| node.engine_error(source));
        if let Err(err) = result {
            self.fail(component);
            return Err(err);
        }

        let next = if self.component(component)?.engine.supports_restart() {
            Status::Created
        } else {
            Status::Finished
        };
        self.set_status(component, next)
    }

    /// Runs every component from creation to the end of its time horizon.
    ///
    /// Components are initialized, validated and prepared in the order they
    /// were added. With cascading updates every sink, a component without
    /// active outputs, is updated until done and pulls its providers along.
    /// Otherwise, or when every component feeds another, all components are
    /// updated in turn until they are done.
    /// Every component is finished at the end.
    ///
    /// # Errors
    ///
    /// Returns an error if a component is invalid, fails, or if no component
    /// can advance any more.
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        let components = self.component_ids();
        for &component in &components {
            if self.status(component)? == Status::Created {
                self.initialize(component)?;
            }
        }
        for &component in &components {
            let messages = self.validate(component)?;
            if !messages.is_empty() {
                return Err(RuntimeError::Invalid {
                    component: self.component(component)?.id.clone(),
                    messages,
                });
            }
        }
        for &component in &components {
            self.prepare(component)?;
        }

        let sinks: Vec<ComponentId> = components
            .iter()
            .copied()
            .filter(|&component| self.components[component.0].active_outputs.is_empty())
            .collect();
        let driven = if self.config.cascading_updates() && !sinks.is_empty() {
            sinks
        } else {
            components.clone()
        };
        debug!(components = driven.len(), "running");

        loop {
            let pending: Vec<ComponentId> = driven
                .iter()
                .copied()
                .filter(|&component| !self.components[component.0].status.is_terminal())
                .collect();
            if pending.is_empty() {
                break;
            }

            let before = self.progress();
            for &component in &pending {
                self.update(component)?;
            }
            if self.progress() == before {
                return Err(RuntimeError::Stalled {
                    components: pending
                        .iter()
                        .map(|&component| self.components[component.0].id.clone())
                        .collect(),
                });
            }
        }

        for &component in &components {
            self.finish(component)?;
        }
        Ok(())
    }

    /// Status and clock of every component, to detect a run that no longer
    /// moves.
    fn progress(&self) -> Vec<(Status, Time)> {
        self.components
            .iter()
            .map(|node| (node.status, node.engine.current_time()))
            .collect()
    }

    fn pull_update(&mut self, component: ComponentId) -> Result<(), RuntimeError> {
        self.set_status(component, Status::Updating)?;

        let active_inputs = self.active_inputs(component)?;
        for input in active_inputs {
            self.update_input(input, true)?;
        }
        self.perform_step(component)
    }

    fn loop_update(&mut self, component: ComponentId) -> Result<(), RuntimeError> {
        self.set_status(component, Status::Updating)?;

        let active_inputs = self.active_inputs(component)?;
        for &input in &active_inputs {
            if !self.set_input_time(input)? {
                continue;
            }
            let query = self.inputs[input.0].item.clone();
            for provider in self.inputs[input.0].providers.clone() {
                if !self.can_answer(provider, &query)? {
                    trace!(%input, %provider, "waiting for data");
                    return self.set_status(component, Status::WaitingForData);
                }
            }
        }

        for input in active_inputs {
            self.update_input(input, false)?;
        }
        self.perform_step(component)
    }

    /// Hands the pending input values to the engine, steps it and publishes
    /// the active outputs.
    fn perform_step(&mut self, component: ComponentId) -> Result<(), RuntimeError> {
        self.process_pending_inputs(component)?;

        let node = self.component(component)?;
        let required: Vec<usize> = node
            .active_outputs
            .iter()
            .filter_map(|&output| match self.outputs[output.0].as_ref()?.source {
                OutputSource::Engine { index } => Some(index),
                OutputSource::Adapted { .. } => None,
            })
            .collect();

        let node = self.component_mut(component)?;
        node.engine
            .perform_time_step(&required)
            .map_err(|source| node.engine_error(source))?;
        trace!(%component, time = %node.engine.current_time(), "stepped");

        self.process_active_outputs(component)?;
        self.advance_watermarks(component)?;

        let node = self.component(component)?;
        let done = node.engine.current_time().end() + EPSILON >= node.engine.end_time().end();
        self.set_status(
            component,
            if done { Status::Done } else { Status::Updated },
        )
    }

    fn process_pending_inputs(&mut self, component: ComponentId) -> Result<(), RuntimeError> {
        let pending = std::mem::take(&mut self.component_mut(component)?.pending_inputs);
        for input in pending {
            let input_node = &mut self.inputs[input.0];
            if input_node.processed {
                continue;
            }
            input_node.processed = true;
            let index = input_node.index;
            let Some(values) = input_node.values.clone() else {
                continue;
            };
            let node = self.component_mut(component)?;
            node.engine
                .set_input_values(index, &values)
                .map_err(|source| node.engine_error(source))?;
        }
        Ok(())
    }

    /// Records the time each active input just consumed as the earliest it
    /// will ask for again.
    fn advance_watermarks(&mut self, component: ComponentId) -> Result<(), RuntimeError> {
        for input in self.active_inputs(component)? {
            let time_set = &mut self.inputs[input.0].item.time_set;
            if let Some(&consumed) = time_set.first() {
                time_set.set_horizon_start(consumed);
            }
        }
        Ok(())
    }

    /// Registers the items of a first initialization, or refreshes them in
    /// place after a restart.
    fn register_items(
        &mut self,
        component: ComponentId,
        items: ExchangeItems,
    ) -> Result<(), RuntimeError> {
        let node = self.component(component)?;
        let horizon = Time::between(
            node.engine.start_time().stamp(),
            node.engine.end_time().end(),
        )
        .ok();
        let store_values = node.config.store_values_in_items();
        let ExchangeItems {
            inputs,
            mut outputs,
        } = items;
        for item in &mut outputs {
            if item.time_set.horizon().is_none() {
                item.time_set.set_horizon(horizon);
            }
        }

        let registered = !node.inputs.is_empty() || !node.outputs.is_empty();
        if registered {
            if node.inputs.len() != inputs.len() || node.outputs.len() != outputs.len() {
                return Err(RuntimeError::ItemsChanged {
                    component: node.id.clone(),
                });
            }
            let input_ids = node.inputs.clone();
            let output_ids = node.outputs.clone();
            for (input, item) in input_ids.into_iter().zip(inputs) {
                let input_node = &mut self.inputs[input.0];
                input_node.item = item;
                input_node.values = None;
                input_node.processed = true;
            }
            for (output, item) in output_ids.into_iter().zip(outputs) {
                let output_node = self.output_mut(output)?;
                output_node.item = item;
                output_node.values = None;
            }
            self.clear_time_buffers(component);
            debug!(%component, "exchange items refreshed");
            return Ok(());
        }

        let mut input_ids = Vec::with_capacity(inputs.len());
        for (index, item) in inputs.into_iter().enumerate() {
            input_ids.push(InputId(self.inputs.len()));
            self.inputs.push(InputNode {
                item,
                component,
                index,
                providers: Vec::new(),
                multi: false,
                store_values,
                values: None,
                processed: true,
            });
        }
        let mut output_ids = Vec::with_capacity(outputs.len());
        for (index, item) in outputs.into_iter().enumerate() {
            output_ids.push(OutputId(self.outputs.len()));
            self.outputs.push(Some(OutputNode {
                item,
                component,
                source: OutputSource::Engine { index },
                consumers: Vec::new(),
                adapted_outputs: Vec::new(),
                store_values,
                values: None,
            }));
        }
        debug!(
            %component,
            inputs = input_ids.len(),
            outputs = output_ids.len(),
            "exchange items registered"
        );

        let node = self.component_mut(component)?;
        node.inputs = input_ids;
        node.outputs = output_ids;
        Ok(())
    }

    fn clear_time_buffers(&mut self, component: ComponentId) {
        for node in self.outputs.iter_mut().flatten() {
            if node.component != component {
                continue;
            }
            if let OutputSource::Adapted {
                kind: AdapterKind::TimeBuffer { buffer, .. },
                ..
            } = &mut node.source
            {
                buffer.clear();
            }
        }
    }

    fn require(
        &self,
        component: ComponentId,
        allowed: &[Status],
        operation: &'static str,
    ) -> Result<(), RuntimeError> {
        if allowed.contains(&self.status(component)?) {
            Ok(())
        } else {
            Err(self.invalid_status(component, operation))
        }
    }

    fn invalid_status(&self, component: ComponentId, operation: &'static str) -> RuntimeError {
        match self.component(component) {
            Ok(node) => RuntimeError::InvalidStatus {
                component: node.id.clone(),
                status: node.status,
                operation,
            },
            Err(err) => err,
        }
    }
}
