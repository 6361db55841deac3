//! Lock-guarded numeric vector.
//!
//! A `SharedVector` is one row or one column of a [`SharedMatrix`]. All
//! arithmetic happens in place under the vector's own reader-writer lock, so
//! row tasks running on different workers can touch different rows of the
//! same matrix without further coordination.
//!
//! Lock order: a method on `self` that also needs `other` locks `self`
//! first. When `other` is the very same vector, the operation runs inside the
//! single guard already held instead of locking twice.

use parking_lot::{RwLock, RwLockReadGuard};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::memory::matrix::SharedMatrix;

/// Whether a vector is a row slice or a column slice of its matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Row,
    Column,
}

impl Orientation {
    pub fn flipped(self) -> Self {
        match self {
            Orientation::Row => Orientation::Column,
            Orientation::Column => Orientation::Row,
        }
    }
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Orientation::Row => write!(f, "row"),
            Orientation::Column => write!(f, "column"),
        }
    }
}

#[derive(Debug)]
pub(crate) struct VectorData {
    pub(crate) values: Vec<f64>,
    pub(crate) orientation: Orientation,
}

/// A fixed-length `f64` vector behind a reader-writer lock.
#[derive(Debug)]
pub struct SharedVector {
    data: RwLock<VectorData>,
}

impl SharedVector {
    /// Create a vector holding a copy of `values`.
    pub fn new(values: &[f64], orientation: Orientation) -> Self {
        Self::from_vec(values.to_vec(), orientation)
    }

    pub fn from_vec(values: Vec<f64>, orientation: Orientation) -> Self {
        Self {
            data: RwLock::new(VectorData {
                values,
                orientation,
            }),
        }
    }

    pub fn get(&self, index: usize) -> Result<f64> {
        let data = self.data.read();
        data.values
            .get(index)
            .copied()
            .ok_or(Error::IndexOutOfRange {
                index,
                len: data.values.len(),
            })
    }

    pub fn len(&self) -> usize {
        self.data.read().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn orientation(&self) -> Orientation {
        self.data.read().orientation
    }

    /// Copy of the current values.
    pub fn to_vec(&self) -> Vec<f64> {
        self.data.read().values.clone()
    }

    /// Flip the orientation. Values are untouched.
    pub fn transpose(&self) {
        let mut data = self.data.write();
        data.orientation = data.orientation.flipped();
    }

    pub fn negate(&self) {
        let mut data = self.data.write();
        for value in data.values.iter_mut() {
            *value = -*value;
        }
    }

    /// Add `other` into `self` element by element.
    ///
    /// `a.add(&a)` doubles `a`.
    ///
    /// # Errors
    ///
    /// `DimensionMismatch` when lengths differ, `OrientationMismatch` when
    /// one is a row and the other a column.
    pub fn add(&self, other: &SharedVector) -> Result<()> {
        let mut this = self.data.write();
        if self.is_same(other) {
            for value in this.values.iter_mut() {
                *value += *value;
            }
            return Ok(());
        }

        let that = other.data.read();
        if this.values.len() != that.values.len() {
            return Err(Error::DimensionMismatch {
                expected: this.values.len(),
                actual: that.values.len(),
            });
        }
        if this.orientation != that.orientation {
            return Err(Error::OrientationMismatch);
        }

        for (lhs, rhs) in this.values.iter_mut().zip(that.values.iter()) {
            *lhs += *rhs;
        }
        Ok(())
    }

    /// Dot product of a row and a column.
    ///
    /// # Errors
    ///
    /// `OrientationMismatch` when both share an orientation (checked first),
    /// `DimensionMismatch` when lengths differ.
    pub fn dot(&self, other: &SharedVector) -> Result<f64> {
        // A vector always shares its own orientation.
        if self.is_same(other) {
            return Err(Error::OrientationMismatch);
        }

        let this = self.data.read();
        let that = other.data.read();
        if this.orientation == that.orientation {
            return Err(Error::OrientationMismatch);
        }
        if this.values.len() != that.values.len() {
            return Err(Error::DimensionMismatch {
                expected: this.values.len(),
                actual: that.values.len(),
            });
        }

        Ok(this
            .values
            .iter()
            .zip(that.values.iter())
            .map(|(a, b)| a * b)
            .sum())
    }

    /// Replace `self` with the vector-matrix product `self × matrix`.
    ///
    /// For a column-oriented matrix each vector is one column and
    /// `self.len()` must match the column length. For a row-oriented matrix
    /// `self.len()` must match the number of rows. The result has one entry
    /// per matrix column either way and keeps `self`'s orientation.
    ///
    /// Locks `self` exclusively, then every vector of `matrix` shared in
    /// ascending index order. All guards are released on every return path.
    pub fn project(&self, matrix: &SharedMatrix) -> Result<()> {
        let vectors = matrix.vectors();
        if vectors.is_empty() {
            return Err(Error::Shape("empty matrix".to_string()));
        }

        let mut this = self.data.write();
        let guards: Vec<Option<RwLockReadGuard<'_, VectorData>>> = vectors
            .iter()
            .map(|v| {
                if self.is_same(v) {
                    None
                } else {
                    Some(v.data.read())
                }
            })
            .collect();

        let product = {
            let own: &VectorData = &this;
            let views: Vec<&VectorData> = guards
                .iter()
                .map(|guard| guard.as_deref().unwrap_or(own))
                .collect();
            multiply(own, &views)
        };
        release_in_reverse(guards);

        this.values = product?;
        Ok(())
    }

    pub(crate) fn read_data(&self) -> RwLockReadGuard<'_, VectorData> {
        self.data.read()
    }

    fn is_same(&self, other: &SharedVector) -> bool {
        std::ptr::eq(self, other)
    }
}

/// Check that every view has the orientation and length of the first one.
pub(crate) fn check_uniform(views: &[&VectorData]) -> Result<()> {
    let Some(first) = views.first() else {
        return Ok(());
    };
    match views
        .iter()
        .position(|v| v.orientation != first.orientation || v.values.len() != first.values.len())
    {
        None => Ok(()),
        Some(index) => Err(Error::Shape(format!(
            "matrix vector {} does not match the shape of vector 0",
            index
        ))),
    }
}

fn multiply(own: &VectorData, views: &[&VectorData]) -> Result<Vec<f64>> {
    check_uniform(views)?;
    let n = own.values.len();
    match views[0].orientation {
        Orientation::Column => {
            let column_len = views[0].values.len();
            if column_len != n {
                return Err(Error::DimensionMismatch {
                    expected: column_len,
                    actual: n,
                });
            }
            Ok(views
                .iter()
                .map(|column| {
                    own.values
                        .iter()
                        .zip(column.values.iter())
                        .map(|(a, b)| a * b)
                        .sum()
                })
                .collect())
        }
        Orientation::Row => {
            if views.len() != n {
                return Err(Error::DimensionMismatch {
                    expected: views.len(),
                    actual: n,
                });
            }
            let width = views[0].values.len();
            Ok((0..width)
                .map(|j| {
                    views
                        .iter()
                        .zip(own.values.iter())
                        .map(|(row, x)| row.values[j] * x)
                        .sum()
                })
                .collect())
        }
    }
}

/// Drop read guards last-acquired first.
pub(crate) fn release_in_reverse<G>(mut guards: Vec<G>) {
    while let Some(guard) = guards.pop() {
        drop(guard);
    }
}
