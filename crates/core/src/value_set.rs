//! Values exchanged between providers and consumers.

use ndarray::{Array1, Array2, ArrayView1, Axis};
use thiserror::Error;

/// A two-dimensional block of values indexed by `[time][element]`.
///
/// This is the boundary type passed from outputs to inputs: one row per time
/// of the accompanying time set, one column per element of the element set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValueSet {
    values: Array2<f64>,
}

/// Errors that can occur when building or combining a [`ValueSet`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ValueSetError {
    #[error("row {row} has {found} values, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("value set has shape {found:?}, expected {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("index [{time}][{element}] is outside a value set of shape {shape:?}")]
    IndexOutOfRange {
        time: usize,
        element: usize,
        shape: (usize, usize),
    },
}

impl ValueSet {
    /// Creates a value set of zeros.
    #[must_use]
    pub fn zeros(times: usize, elements: usize) -> Self {
        Self {
            values: Array2::zeros((times, elements)),
        }
    }

    /// Creates a value set with a single time.
    #[must_use]
    pub fn from_row(row: Vec<f64>) -> Self {
        Self {
            values: Array1::from(row).insert_axis(Axis(0)),
        }
    }

    /// Creates a value set holding one value for one time and one element.
    #[must_use]
    pub fn scalar(value: f64) -> Self {
        Self::from_row(vec![value])
    }

    /// Creates a value set from one row of element values per time.
    ///
    /// # Errors
    ///
    /// Returns an error if the rows do not all have the same length.
    pub fn from_rows<R>(rows: impl IntoIterator<Item = R>) -> Result<Self, ValueSetError>
    where
        R: AsRef<[f64]>,
    {
        let mut flat = Vec::new();
        let mut expected = None;
        let mut times = 0;
        for (row, values) in rows.into_iter().enumerate() {
            let values = values.as_ref();
            let expected = *expected.get_or_insert(values.len());
            if values.len() != expected {
                return Err(ValueSetError::Ragged {
                    row,
                    expected,
                    found: values.len(),
                });
            }
            flat.extend_from_slice(values);
            times += 1;
        }
        let elements = expected.unwrap_or(0);
        let values = Array2::from_shape_vec((times, elements), flat).map_err(|_| {
            ValueSetError::ShapeMismatch {
                expected: (times, elements),
                found: (times, elements),
            }
        })?;
        Ok(Self { values })
    }

    #[must_use]
    pub fn times_count(&self) -> usize {
        self.values.nrows()
    }

    #[must_use]
    pub fn element_count(&self) -> usize {
        self.values.ncols()
    }

    /// Returns `(times_count, element_count)`.
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }

    /// Returns the value at `[time][element]`.
    ///
    /// # Errors
    ///
    /// Returns an error if either index is out of range.
    pub fn value(&self, time: usize, element: usize) -> Result<f64, ValueSetError> {
        self.values
            .get((time, element))
            .copied()
            .ok_or_else(|| self.out_of_range(time, element))
    }

    /// Sets the value at `[time][element]`.
    ///
    /// # Errors
    ///
    /// Returns an error if either index is out of range.
    pub fn set_value(&mut self, time: usize, element: usize, value: f64) -> Result<(), ValueSetError> {
        let err = self.out_of_range(time, element);
        let slot = self.values.get_mut((time, element)).ok_or(err)?;
        *slot = value;
        Ok(())
    }

    /// Returns the element values for one time.
    #[must_use]
    pub fn element_values(&self, time: usize) -> Option<ArrayView1<'_, f64>> {
        (time < self.times_count()).then(|| self.values.row(time))
    }

    /// Iterates over the rows, one per time.
    pub fn rows(&self) -> impl Iterator<Item = ArrayView1<'_, f64>> {
        self.values.axis_iter(Axis(0))
    }

    /// Returns the underlying array.
    #[must_use]
    pub fn as_array(&self) -> &Array2<f64> {
        &self.values
    }

    /// Adds `other` element-wise.
    ///
    /// # Errors
    ///
    /// Returns an error, leaving `self` unchanged, if the shapes differ.
    pub fn add_assign(&mut self, other: &ValueSet) -> Result<(), ValueSetError> {
        if self.shape() != other.shape() {
            return Err(ValueSetError::ShapeMismatch {
                expected: self.shape(),
                found: other.shape(),
            });
        }
        self.values += &other.values;
        Ok(())
    }

    /// Returns a new value set with `f` applied to every value.
    #[must_use]
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            values: self.values.mapv(f),
        }
    }

    fn out_of_range(&self, time: usize, element: usize) -> ValueSetError {
        ValueSetError::IndexOutOfRange {
            time,
            element,
            shape: self.shape(),
        }
    }
}

impl From<Array2<f64>> for ValueSet {
    fn from(values: Array2<f64>) -> Self {
        Self { values }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn builds_from_rows() {
        let values = ValueSet::from_rows([vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]).unwrap();
        assert_eq!(values.shape(), (3, 2));
        assert_relative_eq!(values.value(2, 1).unwrap(), 6.0);
        assert_eq!(
            values.element_values(1).unwrap().to_vec(),
            vec![3.0, 4.0]
        );
        assert!(values.element_values(3).is_none());
    }

    #[test]
    fn rejects_ragged_rows() {
        let err = ValueSet::from_rows([vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert_eq!(
            err,
            ValueSetError::Ragged {
                row: 1,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn empty_rows() {
        let values = ValueSet::from_rows(Vec::<Vec<f64>>::new()).unwrap();
        assert_eq!(values.shape(), (0, 0));
    }

    #[test]
    fn set_value_checks_bounds() {
        let mut values = ValueSet::zeros(1, 2);
        values.set_value(0, 1, 7.0).unwrap();
        assert_relative_eq!(values.value(0, 1).unwrap(), 7.0);

        assert_eq!(
            values.set_value(1, 0, 1.0),
            Err(ValueSetError::IndexOutOfRange {
                time: 1,
                element: 0,
                shape: (1, 2)
            })
        );
    }

    #[test]
    fn element_wise_sum() {
        let mut a = ValueSet::from_row(vec![1.0, 2.0]);
        let b = ValueSet::from_row(vec![10.0, 20.0]);
        a.add_assign(&b).unwrap();
        assert_eq!(a, ValueSet::from_row(vec![11.0, 22.0]));

        let c = ValueSet::scalar(1.0);
        assert!(matches!(
            a.add_assign(&c),
            Err(ValueSetError::ShapeMismatch { .. })
        ));
        assert_eq!(a, ValueSet::from_row(vec![11.0, 22.0]));
    }

    #[test]
    fn map_values() {
        let values = ValueSet::from_row(vec![1.0, 2.0]).map(|x| 2.0 * x + 1.0);
        assert_eq!(values, ValueSet::from_row(vec![3.0, 5.0]));
    }
}
