//! Components, their exchange items, and the links between them.
//!
//! A [`Composition`] owns every component together with the inputs, outputs
//! and adapted outputs they expose. Links between them are index handles
//! into the composition, so a provider never owns its consumers and an
//! adapted output never owns its adaptee.

mod lifecycle;
mod link;
mod state;
mod values;

#[cfg(test)]
mod tests;

use std::{collections::BTreeSet, rc::Rc};

use confluence_core::{
    Argument, ArgumentValue, ExchangeItem, Observer, Status, Time, ValueSet, argument,
};
use tracing::debug;

use crate::{
    adapter::{
        AdaptedOutputFactory, AdapterKind, LinearFactory, SpatialFactory, TimeBufferFactory,
        time_buffer,
    },
    config::RuntimeConfig,
    engine::{Engine, EngineError},
    error::RuntimeError,
    event::Event,
    handle::{ComponentId, InputId, OutputId},
    updater::ComponentUpdater,
};

/// A set of coupled components and the links between their exchange items.
///
/// Exchange items are registered when a component is initialized, so links
/// are made between initialized components.
///
/// # Example
///
/// ```ignore
/// let mut composition = Composition::new();
/// let river = composition.add_component("river", Box::new(river));
/// let lake = composition.add_component("lake", Box::new(lake));
///
/// composition.initialize(river)?;
/// composition.initialize(lake)?;
///
/// let outflow = composition.find_output(river, "outflow").unwrap();
/// let inflow = composition.find_input(lake, "inflow").unwrap();
/// let buffered = composition.create_adapted_output(
///     "river-TimeBuffer",
///     "TimeInterpolator",
///     outflow,
///     Some(inflow),
/// )?;
/// composition.connect(buffered, inflow)?;
///
/// composition.run()?;
/// ```
pub struct Composition {
    config: RuntimeConfig,
    components: Vec<ComponentNode>,
    inputs: Vec<InputNode>,
    outputs: Vec<Option<OutputNode>>,
    observers: Vec<Box<dyn Observer<Event>>>,
}

struct ComponentNode {
    id: String,
    engine: Box<dyn Engine>,
    status: Status,
    config: RuntimeConfig,
    arguments: Vec<Argument>,
    inputs: Vec<InputId>,
    outputs: Vec<OutputId>,
    active_inputs: BTreeSet<InputId>,
    active_outputs: BTreeSet<OutputId>,
    pending_inputs: Vec<InputId>,
    factories: Vec<Rc<dyn AdaptedOutputFactory>>,
}

impl ComponentNode {
    fn engine_error(&self, source: EngineError) -> RuntimeError {
        RuntimeError::Engine {
            component: self.id.clone(),
            source,
        }
    }
}

struct InputNode {
    item: ExchangeItem,
    component: ComponentId,
    index: usize,
    providers: Vec<OutputId>,
    multi: bool,
    store_values: bool,
    values: Option<ValueSet>,
    processed: bool,
}

enum OutputSource {
    Engine {
        index: usize,
    },
    Adapted {
        adaptee: OutputId,
        factory: String,
        adapter: String,
        arguments: Vec<Argument>,
        kind: AdapterKind,
    },
}

struct OutputNode {
    item: ExchangeItem,
    /// The component whose engine ultimately produces the values.
    component: ComponentId,
    source: OutputSource,
    consumers: Vec<InputId>,
    adapted_outputs: Vec<OutputId>,
    store_values: bool,
    values: Option<ValueSet>,
}

impl OutputNode {
    /// An output is active while it has a consumer or an adapted output.
    fn is_active(&self) -> bool {
        !self.consumers.is_empty() || !self.adapted_outputs.is_empty()
    }
}

impl Default for Composition {
    fn default() -> Self {
        Self::with_config(RuntimeConfig::default())
    }
}

impl Composition {
    /// Creates an empty composition with the default config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty composition whose components default to `config`.
    ///
    /// The config also decides how [`Composition::run`] drives the
    /// components.
    #[must_use]
    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            config,
            components: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            observers: Vec::new(),
        }
    }

    #[must_use]
    pub fn runtime_config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Adds a component using the composition's config.
    pub fn add_component(&mut self, id: impl Into<String>, engine: Box<dyn Engine>) -> ComponentId {
        self.add_component_with_config(id, engine, self.config)
    }

    /// Adds a component in [`Status::Created`].
    ///
    /// The component gets a time buffer, a spatial and a linear factory,
    /// with ids `{id}-TimeBuffer`, `{id}-Spatial` and `{id}-Linear`.
    pub fn add_component_with_config(
        &mut self,
        id: impl Into<String>,
        engine: Box<dyn Engine>,
        config: RuntimeConfig,
    ) -> ComponentId {
        let id = id.into();
        let factories: Vec<Rc<dyn AdaptedOutputFactory>> = vec![
            Rc::new(TimeBufferFactory::new(
                format!("{id}-TimeBuffer"),
                *config.buffer(),
            )),
            Rc::new(SpatialFactory::new(format!("{id}-Spatial"))),
            Rc::new(LinearFactory::new(format!("{id}-Linear"))),
        ];

        let component = ComponentId(self.components.len());
        debug!(%component, id = %id, "component added");
        self.components.push(ComponentNode {
            arguments: engine.arguments(),
            id,
            engine,
            status: Status::Created,
            config,
            inputs: Vec::new(),
            outputs: Vec::new(),
            active_inputs: BTreeSet::new(),
            active_outputs: BTreeSet::new(),
            pending_inputs: Vec::new(),
            factories,
        });
        component
    }

    /// Adds a factory to the ones a component offers for its outputs.
    ///
    /// # Errors
    ///
    /// Returns an error if the component is unknown.
    pub fn add_factory(
        &mut self,
        component: ComponentId,
        factory: Rc<dyn AdaptedOutputFactory>,
    ) -> Result<(), RuntimeError> {
        self.component_mut(component)?.factories.push(factory);
        Ok(())
    }

    /// Registers an observer that receives every [`Event`] in order.
    pub fn add_observer(&mut self, observer: impl Observer<Event> + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Returns every component in the order they were added.
    #[must_use]
    pub fn component_ids(&self) -> Vec<ComponentId> {
        (0..self.components.len()).map(ComponentId).collect()
    }

    /// Finds a component by id.
    #[must_use]
    pub fn component_id(&self, id: &str) -> Option<ComponentId> {
        self.components
            .iter()
            .position(|node| node.id == id)
            .map(ComponentId)
    }

    /// Returns the id a component was added with.
    ///
    /// # Errors
    ///
    /// Returns an error if the component is unknown.
    pub fn component_name(&self, component: ComponentId) -> Result<&str, RuntimeError> {
        Ok(&self.component(component)?.id)
    }

    /// Returns the status of a component.
    ///
    /// # Errors
    ///
    /// Returns an error if the component is unknown.
    pub fn status(&self, component: ComponentId) -> Result<Status, RuntimeError> {
        Ok(self.component(component)?.status)
    }

    /// Returns the config of a component.
    ///
    /// # Errors
    ///
    /// Returns an error if the component is unknown.
    pub fn config(&self, component: ComponentId) -> Result<&RuntimeConfig, RuntimeError> {
        Ok(&self.component(component)?.config)
    }

    /// Returns the time a component's engine has computed up to.
    ///
    /// # Errors
    ///
    /// Returns an error if the component is unknown.
    pub fn current_time(&self, component: ComponentId) -> Result<Time, RuntimeError> {
        Ok(self.component(component)?.engine.current_time())
    }

    /// Returns the inputs of a component in engine order.
    ///
    /// # Errors
    ///
    /// Returns an error if the component is unknown.
    pub fn inputs(&self, component: ComponentId) -> Result<&[InputId], RuntimeError> {
        Ok(&self.component(component)?.inputs)
    }

    /// Returns the engine outputs of a component in engine order.
    ///
    /// Adapted outputs are reached through [`Composition::adapted_outputs`].
    ///
    /// # Errors
    ///
    /// Returns an error if the component is unknown.
    pub fn outputs(&self, component: ComponentId) -> Result<&[OutputId], RuntimeError> {
        Ok(&self.component(component)?.outputs)
    }

    /// Finds an input of a component by item id.
    #[must_use]
    pub fn find_input(&self, component: ComponentId, id: &str) -> Option<InputId> {
        self.components
            .get(component.0)?
            .inputs
            .iter()
            .copied()
            .find(|&input| self.inputs[input.0].item.id == id)
    }

    /// Finds an output or adapted output of a component by item id.
    #[must_use]
    pub fn find_output(&self, component: ComponentId, id: &str) -> Option<OutputId> {
        self.outputs
            .iter()
            .enumerate()
            .find_map(|(index, node)| {
                node.as_ref()
                    .filter(|node| node.component == component && node.item.id == id)
                    .map(|_| OutputId(index))
            })
    }

    /// Returns the description of an input, including its latest query time.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is unknown.
    pub fn input_item(&self, input: InputId) -> Result<&ExchangeItem, RuntimeError> {
        Ok(&self.input(input)?.item)
    }

    /// Returns the description of an output or adapted output.
    ///
    /// # Errors
    ///
    /// Returns an error if the output is unknown.
    pub fn output_item(&self, output: OutputId) -> Result<&ExchangeItem, RuntimeError> {
        Ok(&self.output(output)?.item)
    }

    /// Returns the active inputs of a component: those with a provider.
    ///
    /// # Errors
    ///
    /// Returns an error if the component is unknown.
    pub fn active_inputs(&self, component: ComponentId) -> Result<Vec<InputId>, RuntimeError> {
        Ok(self
            .component(component)?
            .active_inputs
            .iter()
            .copied()
            .collect())
    }

    /// Returns the active engine outputs of a component: those with a
    /// consumer or an adapted output.
    ///
    /// # Errors
    ///
    /// Returns an error if the component is unknown.
    pub fn active_outputs(&self, component: ComponentId) -> Result<Vec<OutputId>, RuntimeError> {
        Ok(self
            .component(component)?
            .active_outputs
            .iter()
            .copied()
            .collect())
    }

    /// Returns `true` if the output has a consumer or an adapted output.
    ///
    /// # Errors
    ///
    /// Returns an error if the output is unknown.
    pub fn is_active(&self, output: OutputId) -> Result<bool, RuntimeError> {
        Ok(self.output(output)?.is_active())
    }

    /// Returns the component whose engine produces an output's values.
    ///
    /// # Errors
    ///
    /// Returns an error if the output is unknown.
    pub fn owner(&self, output: OutputId) -> Result<ComponentId, RuntimeError> {
        Ok(self.output(output)?.component)
    }

    /// Returns the inputs an output provides to.
    ///
    /// # Errors
    ///
    /// Returns an error if the output is unknown.
    pub fn consumers(&self, output: OutputId) -> Result<&[InputId], RuntimeError> {
        Ok(&self.output(output)?.consumers)
    }

    /// Returns the adapted outputs layered directly on an output.
    ///
    /// # Errors
    ///
    /// Returns an error if the output is unknown.
    pub fn adapted_outputs(&self, output: OutputId) -> Result<&[OutputId], RuntimeError> {
        Ok(&self.output(output)?.adapted_outputs)
    }

    /// Returns the outputs an input pulls from.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is unknown.
    pub fn providers(&self, input: InputId) -> Result<&[OutputId], RuntimeError> {
        Ok(&self.input(input)?.providers)
    }

    /// Returns the adaptee of an adapted output, or `None` for engine
    /// outputs.
    ///
    /// # Errors
    ///
    /// Returns an error if the output is unknown.
    pub fn adaptee(&self, output: OutputId) -> Result<Option<OutputId>, RuntimeError> {
        Ok(match self.output(output)?.source {
            OutputSource::Engine { .. } => None,
            OutputSource::Adapted { adaptee, .. } => Some(adaptee),
        })
    }

    /// Returns the arguments a component's engine is initialized with.
    ///
    /// # Errors
    ///
    /// Returns an error if the component is unknown.
    pub fn component_arguments(&self, component: ComponentId) -> Result<&[Argument], RuntimeError> {
        Ok(&self.component(component)?.arguments)
    }

    /// Changes an engine argument, read at the next initialization.
    ///
    /// # Errors
    ///
    /// Returns an error if the component is unknown or the argument rejects
    /// the value.
    pub fn set_component_argument(
        &mut self,
        component: ComponentId,
        id: &str,
        value: impl Into<ArgumentValue>,
    ) -> Result<(), RuntimeError> {
        argument::set(&mut self.component_mut(component)?.arguments, id, value)?;
        Ok(())
    }

    /// Returns the arguments of an adapted output, empty for engine outputs.
    ///
    /// # Errors
    ///
    /// Returns an error if the output is unknown.
    pub fn arguments(&self, output: OutputId) -> Result<&[Argument], RuntimeError> {
        Ok(match &self.output(output)?.source {
            OutputSource::Engine { .. } => &[],
            OutputSource::Adapted { arguments, .. } => arguments,
        })
    }

    /// Changes an argument of an adapted output.
    ///
    /// Time buffers apply `RelaxationFactor` and `Extrapolate` to their
    /// buffer immediately.
    ///
    /// # Errors
    ///
    /// Returns an error, leaving the arguments unchanged, if the output is
    /// not adapted or the value is rejected.
    pub fn set_argument(
        &mut self,
        output: OutputId,
        id: &str,
        value: impl Into<ArgumentValue>,
    ) -> Result<(), RuntimeError> {
        let node = self.output_mut(output)?;
        let OutputSource::Adapted {
            arguments, kind, ..
        } = &mut node.source
        else {
            return Err(RuntimeError::NotAdapted {
                output: node.item.id.clone(),
            });
        };

        let previous = arguments.clone();
        argument::set(arguments, id, value)?;
        if let AdapterKind::TimeBuffer { buffer, .. } = kind {
            if let Err(err) = time_buffer::apply_argument(buffer, arguments, id) {
                *arguments = previous;
                return Err(err.into());
            }
        }
        Ok(())
    }

    /// Replaces the updater a time buffer uses to advance its adaptee.
    ///
    /// # Errors
    ///
    /// Returns an error if the output is not a time buffer.
    pub fn set_component_updater(
        &mut self,
        output: OutputId,
        updater: Option<Rc<dyn ComponentUpdater>>,
    ) -> Result<(), RuntimeError> {
        let node = self.output_mut(output)?;
        match &mut node.source {
            OutputSource::Adapted {
                kind: AdapterKind::TimeBuffer { updater: slot, .. },
                ..
            } => {
                *slot = updater;
                Ok(())
            }
            _ => Err(RuntimeError::NotAdapted {
                output: node.item.id.clone(),
            }),
        }
    }

    fn component(&self, component: ComponentId) -> Result<&ComponentNode, RuntimeError> {
        self.components
            .get(component.0)
            .ok_or(RuntimeError::UnknownComponent(component.0))
    }

    fn component_mut(&mut self, component: ComponentId) -> Result<&mut ComponentNode, RuntimeError> {
        self.components
            .get_mut(component.0)
            .ok_or(RuntimeError::UnknownComponent(component.0))
    }

    fn input(&self, input: InputId) -> Result<&InputNode, RuntimeError> {
        self.inputs
            .get(input.0)
            .ok_or(RuntimeError::UnknownInput(input.0))
    }

    fn input_mut(&mut self, input: InputId) -> Result<&mut InputNode, RuntimeError> {
        self.inputs
            .get_mut(input.0)
            .ok_or(RuntimeError::UnknownInput(input.0))
    }

    fn output(&self, output: OutputId) -> Result<&OutputNode, RuntimeError> {
        self.outputs
            .get(output.0)
            .and_then(Option::as_ref)
            .ok_or(RuntimeError::UnknownOutput(output.0))
    }

    fn output_mut(&mut self, output: OutputId) -> Result<&mut OutputNode, RuntimeError> {
        self.outputs
            .get_mut(output.0)
            .and_then(Option::as_mut)
            .ok_or(RuntimeError::UnknownOutput(output.0))
    }

    fn emit(&mut self, event: Event) {
        for observer in &mut self.observers {
            observer.observe(&event);
        }
    }

    /// Moves a component to `next`, enforcing the transition table.
    fn set_status(&mut self, component: ComponentId, next: Status) -> Result<(), RuntimeError> {
        let node = self.component_mut(component)?;
        let old = node.status;
        if !old.can_transition_to(next) {
            return Err(RuntimeError::IllegalTransition {
                component: node.id.clone(),
                from: old,
                to: next,
            });
        }
        node.status = next;
        debug!(component = %node.id, %old, new = %next, "status changed");
        self.emit(Event::StatusChanged {
            component,
            old,
            new: next,
        });
        Ok(())
    }

    /// Moves a component to [`Status::Failed`] where the table allows it.
    fn fail(&mut self, component: ComponentId) {
        let allowed = self
            .component(component)
            .is_ok_and(|node| node.status.can_transition_to(Status::Failed));
        if allowed {
            // The transition was just checked.
            let _ = self.set_status(component, Status::Failed);
        }
    }

    /// Brings an input's membership of its component's active inputs up to
    /// date after one of its provider links changed.
    fn track_input(&mut self, input: InputId) -> Result<(), RuntimeError> {
        let node = self.input(input)?;
        let active = !node.providers.is_empty();
        let component = node.component;

        let active_inputs = &mut self.component_mut(component)?.active_inputs;
        if active {
            active_inputs.insert(input);
        } else {
            active_inputs.remove(&input);
        }
        Ok(())
    }

    /// Brings an engine output's membership of its component's active
    /// outputs up to date after a consumer or adapted output was added or
    /// removed.
    ///
    /// Adapted outputs are not tracked: the engine output below them stays
    /// active while they exist.
    fn track_output(&mut self, output: OutputId) -> Result<(), RuntimeError> {
        let node = self.output(output)?;
        if !matches!(node.source, OutputSource::Engine { .. }) {
            return Ok(());
        }
        let active = node.is_active();
        let component = node.component;

        let active_outputs = &mut self.component_mut(component)?.active_outputs;
        if active {
            active_outputs.insert(output);
        } else {
            active_outputs.remove(&output);
        }
        Ok(())
    }
}
