use confluence_core::{ElementSet, ElementType, ValueSet, ValueSetError};
use ndarray::Array2;
use thiserror::Error;

/// Builds the matrix that maps values on one element set onto another.
///
/// Implementations for geometric element types live outside this crate;
/// [`IdBasedMapper`] covers id-based element sets.
pub trait ElementMapper {
    /// Identifies the mapping method, used as the adapter id.
    fn id(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Returns `true` if the method can map `source` onto `target`.
    fn is_available(&self, source: &ElementSet, target: &ElementSet) -> bool;

    /// Returns the `target x source` mapping matrix.
    ///
    /// # Errors
    ///
    /// Returns an error if the element sets cannot be mapped.
    fn mapping_matrix(
        &self,
        source: &ElementSet,
        target: &ElementSet,
    ) -> Result<Array2<f64>, MappingError>;
}

/// Errors that can occur when building a mapping matrix.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MappingError {
    #[error("mapper `{mapper}` cannot map {from:?} elements onto {to:?} elements")]
    Unsupported {
        mapper: String,
        from: ElementType,
        to: ElementType,
    },

    #[error("target element `{element}` has no match in the source element set")]
    Unmatched { element: String },
}

/// Maps id-based elements onto elements with the same id.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdBasedMapper;

impl IdBasedMapper {
    pub const ID: &'static str = "IdBased";
}

impl ElementMapper for IdBasedMapper {
    fn id(&self) -> &str {
        Self::ID
    }

    fn description(&self) -> &str {
        "Copies values between elements with equal ids"
    }

    fn is_available(&self, source: &ElementSet, target: &ElementSet) -> bool {
        source.element_type == ElementType::IdBased
            && target.element_type == ElementType::IdBased
            && target
                .elements
                .iter()
                .all(|element| source.index_of(&element.id).is_some())
    }

    fn mapping_matrix(
        &self,
        source: &ElementSet,
        target: &ElementSet,
    ) -> Result<Array2<f64>, MappingError> {
        if source.element_type != ElementType::IdBased || target.element_type != ElementType::IdBased
        {
            return Err(MappingError::Unsupported {
                mapper: Self::ID.to_owned(),
                from: source.element_type,
                to: target.element_type,
            });
        }

        let mut matrix = Array2::zeros((target.element_count(), source.element_count()));
        for (row, element) in target.elements.iter().enumerate() {
            let column = source
                .index_of(&element.id)
                .ok_or_else(|| MappingError::Unmatched {
                    element: element.id.clone(),
                })?;
            matrix[[row, column]] = 1.0;
        }
        Ok(matrix)
    }
}

/// Maps every row of `values` through the `target x source` matrix.
pub(crate) fn apply(values: &ValueSet, matrix: &Array2<f64>) -> Result<ValueSet, ValueSetError> {
    if values.element_count() != matrix.ncols() {
        return Err(ValueSetError::ShapeMismatch {
            expected: (values.times_count(), matrix.ncols()),
            found: values.shape(),
        });
    }
    Ok(ValueSet::from(values.as_array().dot(&matrix.t())))
}
