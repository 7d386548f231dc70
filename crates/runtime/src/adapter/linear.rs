use confluence_core::{Argument, ArgumentError, ArgumentKind, ValueSet, argument};

pub(crate) const A: &str = "A";
pub(crate) const B: &str = "B";

/// Writable `A` and `B` arguments for `y = A * x + B`.
pub(crate) fn arguments() -> Vec<Argument> {
    vec![
        Argument::new(A, 1.0).with_description("A in y = A*x + B"),
        Argument::new(B, 0.0).with_description("B in y = A*x + B"),
    ]
}

/// Read-only arguments fixed to a unit conversion.
pub(crate) fn conversion_arguments(a: f64, b: f64) -> Vec<Argument> {
    vec![
        Argument::new(A, a)
            .with_description("Conversion factor")
            .read_only(),
        Argument::new(B, b)
            .with_description("Conversion offset")
            .read_only(),
    ]
}

/// Applies `y = A * x + B` with the coefficients from `arguments`.
pub(crate) fn apply(values: &ValueSet, arguments: &[Argument]) -> Result<ValueSet, ArgumentError> {
    let a = double(arguments, A)?;
    let b = double(arguments, B)?;
    Ok(values.map(|x| a * x + b))
}

pub(crate) fn double(arguments: &[Argument], id: &str) -> Result<f64, ArgumentError> {
    let argument = argument::find(arguments, id)?;
    argument
        .value()
        .as_f64()
        .ok_or_else(|| ArgumentError::TypeMismatch {
            id: id.to_owned(),
            expected: ArgumentKind::Double,
            found: argument.value().kind(),
        })
}
