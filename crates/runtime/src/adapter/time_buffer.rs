use confluence_buffer::{BufferConfig, SmartBuffer};
use confluence_core::{Argument, ArgumentError, ArgumentKind, argument};

pub(crate) const RELAXATION_FACTOR: &str = "RelaxationFactor";
pub(crate) const EXTRAPOLATE: &str = "Extrapolate";

pub(crate) fn arguments(config: &BufferConfig) -> Vec<Argument> {
    vec![
        Argument::new(RELAXATION_FACTOR, config.relaxation_factor())
            .with_caption("Relaxation factor")
            .with_description("1 holds the nearest value, 0 extrapolates linearly"),
        Argument::new(EXTRAPOLATE, config.extrapolate())
            .with_description("Answer queries outside the buffered times"),
    ]
}

/// Pushes the argument with `id` into the buffer config.
///
/// Unrelated arguments are ignored.
pub(crate) fn apply_argument(
    buffer: &mut SmartBuffer,
    arguments: &[Argument],
    id: &str,
) -> Result<(), ArgumentError> {
    match id {
        RELAXATION_FACTOR => {
            let factor = super::linear::double(arguments, RELAXATION_FACTOR)?;
            buffer
                .set_relaxation_factor(factor)
                .map_err(|_| ArgumentError::NotPossible {
                    id: RELAXATION_FACTOR.to_owned(),
                    value: factor.to_string(),
                })
        }
        EXTRAPOLATE => {
            let argument = argument::find(arguments, EXTRAPOLATE)?;
            let extrapolate =
                argument
                    .value()
                    .as_bool()
                    .ok_or_else(|| ArgumentError::TypeMismatch {
                        id: EXTRAPOLATE.to_owned(),
                        expected: ArgumentKind::Boolean,
                        found: argument.value().kind(),
                    })?;
            buffer.set_extrapolate(extrapolate);
            Ok(())
        }
        _ => Ok(()),
    }
}
