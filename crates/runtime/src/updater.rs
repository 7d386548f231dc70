//! Advancing a providing component until it can answer a query.

use confluence_core::{EPSILON, ExchangeItem, Status};
use tracing::trace;

use crate::{composition::Composition, error::RuntimeError, handle::OutputId};

/// Brings the component behind an output far enough to answer a query.
pub trait ComponentUpdater {
    /// Updates the component owning `output` so that it covers the times of
    /// `query`.
    ///
    /// Returns `true` if the component reached the last time of the query.
    ///
    /// # Errors
    ///
    /// Returns an error if an update of the component fails.
    fn update(
        &self,
        composition: &mut Composition,
        output: OutputId,
        query: &ExchangeItem,
    ) -> Result<bool, RuntimeError>;
}

/// Updates the owning component until its current time reaches the end of
/// the query's last time.
///
/// Stops early once the component is neither [`Status::Valid`] nor
/// [`Status::Updated`], e.g. when it is done or already updating further up
/// the call chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeComponentUpdater;

impl ComponentUpdater for TimeComponentUpdater {
    fn update(
        &self,
        composition: &mut Composition,
        output: OutputId,
        query: &ExchangeItem,
    ) -> Result<bool, RuntimeError> {
        let component = composition.owner(output)?;
        let Some(required) = query.time_set.last().map(|time| time.end()) else {
            return Ok(true);
        };

        let mut available = composition.current_time(component)?.end();
        while available + EPSILON < required
            && matches!(composition.status(component)?, Status::Valid | Status::Updated)
        {
            trace!(%component, %output, available, required, "updating provider");
            composition.update(component)?;

            let advanced = composition.current_time(component)?.end();
            if advanced <= available {
                // The engine did not move, another update would not either.
                break;
            }
            available = advanced;
        }
        Ok(available + EPSILON >= required)
    }
}
