use confluence_core::ExchangeItem;
use tracing::debug;

use crate::{
    adapter::AdapterId,
    error::RuntimeError,
    handle::{InputId, OutputId},
};

use super::{Composition, OutputNode, OutputSource};

impl Composition {
    /// Links an output or adapted output to an input.
    ///
    /// An input that is not a multi-input drops its previous provider.
    ///
    /// # Errors
    ///
    /// Returns an error if either handle is unknown, or the output offers a
    /// different number of elements than the input expects.
    pub fn connect(&mut self, output: OutputId, input: InputId) -> Result<(), RuntimeError> {
        let input_node = self.input(input)?;
        let output_node = self.output(output)?;
        if output_node.item.element_count() != input_node.item.element_count() {
            return Err(RuntimeError::ElementSetMismatch {
                output: output_node.item.id.clone(),
                query: input_node.item.id.clone(),
                expected: input_node.item.element_count(),
                found: output_node.item.element_count(),
            });
        }

        let replaced = if input_node.multi {
            Vec::new()
        } else {
            input_node
                .providers
                .iter()
                .copied()
                .filter(|&provider| provider != output)
                .collect()
        };
        for provider in replaced {
            self.disconnect(provider, input)?;
        }

        let input_node = self.input_mut(input)?;
        if !input_node.providers.contains(&output) {
            input_node.providers.push(output);
        }
        let output_node = self.output_mut(output)?;
        if !output_node.consumers.contains(&input) {
            output_node.consumers.push(input);
        }

        debug!(%output, %input, "connected");
        self.track_input(input)?;
        self.track_output(output)
    }

    /// Removes the link between an output and an input, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if either handle is unknown.
    pub fn disconnect(&mut self, output: OutputId, input: InputId) -> Result<(), RuntimeError> {
        self.input_mut(input)?
            .providers
            .retain(|&provider| provider != output);
        self.output_mut(output)?
            .consumers
            .retain(|&other| other != input);

        debug!(%output, %input, "disconnected");
        self.track_input(input)?;
        self.track_output(output)
    }

    /// Lets an input accept several providers, whose values are summed.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is unknown.
    pub fn make_multi_input(&mut self, input: InputId) -> Result<(), RuntimeError> {
        self.input_mut(input)?.multi = true;
        Ok(())
    }

    /// Lists the adapters the owner's factories can put on `adaptee`,
    /// optionally for a known target input, as `(factory id, adapter id)`.
    ///
    /// # Errors
    ///
    /// Returns an error if a handle is unknown.
    pub fn available_adapter_ids(
        &self,
        adaptee: OutputId,
        target: Option<InputId>,
    ) -> Result<Vec<(String, AdapterId)>, RuntimeError> {
        let adaptee_node = self.output(adaptee)?;
        let target_item = target.map(|input| self.input(input)).transpose()?;
        let target_item = target_item.map(|node| &node.item);

        let owner = self.component(adaptee_node.component)?;
        Ok(owner
            .factories
            .iter()
            .flat_map(|factory| {
                factory
                    .available_adapter_ids(&adaptee_node.item, target_item)
                    .into_iter()
                    .map(|id| (factory.id().to_owned(), id))
            })
            .collect())
    }

    /// Layers an adapted output on `adaptee`, using a factory of the
    /// adaptee's owning component.
    ///
    /// Asking twice for the same adapter on the same adaptee returns the
    /// existing adapted output.
    ///
    /// # Errors
    ///
    /// Returns an error if a handle or the factory is unknown, or the factory
    /// cannot build the adapter for this adaptee and target.
    pub fn create_adapted_output(
        &mut self,
        factory: &str,
        adapter_id: &str,
        adaptee: OutputId,
        target: Option<InputId>,
    ) -> Result<OutputId, RuntimeError> {
        let adaptee_node = self.output(adaptee)?;
        let owner = adaptee_node.component;
        let target_item: Option<&ExchangeItem> = target
            .map(|input| self.input(input))
            .transpose()?
            .map(|node| &node.item);

        let owner_node = self.component(owner)?;
        let factory_impl = owner_node
            .factories
            .iter()
            .find(|candidate| candidate.id() == factory)
            .ok_or_else(|| RuntimeError::UnknownFactory {
                component: owner_node.id.clone(),
                factory: factory.to_owned(),
            })?;
        let adapter = factory_impl.create_adapter(adapter_id, &adaptee_node.item, target_item)?;

        let existing = adaptee_node.adapted_outputs.iter().copied().find(|&child| {
            self.output(child).is_ok_and(|node| match &node.source {
                OutputSource::Adapted {
                    factory: existing_factory,
                    adapter: existing_adapter,
                    ..
                } => {
                    existing_factory == factory
                        && existing_adapter == adapter_id
                        && node.item.element_set == adapter.item.element_set
                        && node.item.value_definition == adapter.item.value_definition
                }
                OutputSource::Engine { .. } => false,
            })
        });
        if let Some(existing) = existing {
            return Ok(existing);
        }

        let store_values = adaptee_node.store_values;
        let output = OutputId(self.outputs.len());
        self.outputs.push(Some(OutputNode {
            item: adapter.item,
            component: owner,
            source: OutputSource::Adapted {
                adaptee,
                factory: factory.to_owned(),
                adapter: adapter_id.to_owned(),
                arguments: adapter.arguments,
                kind: adapter.kind,
            },
            consumers: Vec::new(),
            adapted_outputs: Vec::new(),
            store_values,
            values: None,
        }));
        self.output_mut(adaptee)?.adapted_outputs.push(output);

        debug!(%output, %adaptee, factory, adapter = adapter_id, "adapted output created");
        self.track_output(adaptee)?;
        Ok(output)
    }

    /// Removes an adapted output that nobody uses any more.
    ///
    /// # Errors
    ///
    /// Returns an error if the output is unknown, is not adapted, or still
    /// has consumers or adapted outputs.
    pub fn remove_adapted_output(&mut self, output: OutputId) -> Result<(), RuntimeError> {
        let node = self.output(output)?;
        let OutputSource::Adapted { adaptee, .. } = node.source else {
            return Err(RuntimeError::NotAdapted {
                output: node.item.id.clone(),
            });
        };
        if node.is_active() {
            return Err(RuntimeError::AdapterInUse {
                output: node.item.id.clone(),
            });
        }

        self.output_mut(adaptee)?
            .adapted_outputs
            .retain(|&child| child != output);
        self.outputs[output.0] = None;

        debug!(%output, %adaptee, "adapted output removed");
        self.track_output(adaptee)
    }
}
