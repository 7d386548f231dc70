//! The computation a component wraps.

use confluence_core::{Argument, ExchangeItem, ManageState, Time, ValueSet};

/// Error type returned by engines.
pub type EngineError = Box<dyn std::error::Error + Send + Sync>;

/// The inputs and outputs an engine exposes, in index order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExchangeItems {
    pub inputs: Vec<ExchangeItem>,
    pub outputs: Vec<ExchangeItem>,
}

/// A time-stepping computation driven by a component.
///
/// Inputs and outputs are addressed by their position in the
/// [`ExchangeItems`] returned from [`Engine::initialize`]. The composition
/// owns the lifecycle; an engine only computes.
pub trait Engine {
    /// Arguments the engine accepts, with their defaults.
    fn arguments(&self) -> Vec<Argument> {
        Vec::new()
    }

    /// Reads the arguments and describes the exchange items.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be set up.
    fn initialize(&mut self, arguments: &[Argument]) -> Result<ExchangeItems, EngineError>;

    /// Returns a message per problem that prevents running.
    fn validate(&mut self) -> Vec<String> {
        Vec::new()
    }

    /// Prepares the first time step.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot start.
    fn prepare(&mut self) -> Result<(), EngineError> {
        Ok(())
    }

    /// Advances the engine by one time step.
    ///
    /// `required_outputs` lists the outputs someone is listening to.
    ///
    /// # Errors
    ///
    /// Returns an error if the step fails.
    fn perform_time_step(&mut self, required_outputs: &[usize]) -> Result<(), EngineError>;

    /// Releases whatever the engine holds.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot shut down cleanly.
    fn finish(&mut self) -> Result<(), EngineError> {
        Ok(())
    }

    fn start_time(&self) -> Time;

    fn end_time(&self) -> Time;

    /// The time the engine has computed up to.
    fn current_time(&self) -> Time;

    /// The current time as a stamp, or as the span of the last step.
    fn current_time_as(&self, as_stamp: bool) -> Time {
        let current = self.current_time();
        if as_stamp {
            current.end_stamp()
        } else {
            current
        }
    }

    /// The time the next step needs its inputs for, as a stamp or a span.
    fn input_time_as(&self, as_stamp: bool) -> Time;

    /// The time the values of an output refer to, or `None` to skip it.
    fn output_time(&self, _output: usize, as_stamp: bool) -> Option<Time> {
        Some(self.current_time_as(as_stamp))
    }

    /// The time an input needs values for, or `None` to skip it.
    fn input_time(&self, _input: usize, as_stamp: bool) -> Option<Time> {
        Some(self.input_time_as(as_stamp))
    }

    /// Hands values for an input to the engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the values do not fit the input.
    fn set_input_values(&mut self, input: usize, values: &ValueSet) -> Result<(), EngineError>;

    /// Returns the values the engine holds for an input.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is unknown.
    fn input_values(&self, input: usize) -> Result<ValueSet, EngineError>;

    /// Returns the current values of an output.
    ///
    /// # Errors
    ///
    /// Returns an error if the output is unknown.
    fn output_values(&self, output: usize) -> Result<ValueSet, EngineError>;

    /// Returns `true` if the engine can be initialized again after finishing.
    fn supports_restart(&self) -> bool {
        false
    }

    /// Returns the engine's state manager, if it has one.
    fn state_manager(&mut self) -> Option<&mut dyn ManageState> {
        None
    }
}
