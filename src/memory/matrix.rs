//! Matrix stored as a sequence of [`SharedVector`]s.
//!
//! A `SharedMatrix` holds its vectors either as rows or as columns. Loading
//! swaps the whole vector sequence at once; readers that grabbed the previous
//! sequence keep working on it until they let go.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::memory::vector::{check_uniform, release_in_reverse, Orientation, SharedVector, VectorData};

type Vectors = Arc<[Arc<SharedVector>]>;

#[derive(Debug)]
pub struct SharedMatrix {
    vectors: RwLock<Vectors>,
}

impl Default for SharedMatrix {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedMatrix {
    /// Create an empty matrix.
    pub fn new() -> Self {
        Self {
            vectors: RwLock::new(Arc::from(Vec::new())),
        }
    }

    /// Create a row-oriented matrix holding a copy of `rows`.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let matrix = Self::new();
        matrix.load_row_major(rows)?;
        Ok(matrix)
    }

    /// Replace the contents with one row vector per input row.
    pub fn load_row_major(&self, rows: &[Vec<f64>]) -> Result<()> {
        validate_shape(rows)?;
        let vectors: Vec<Arc<SharedVector>> = rows
            .iter()
            .map(|row| Arc::new(SharedVector::new(row, Orientation::Row)))
            .collect();
        *self.vectors.write() = Arc::from(vectors);
        Ok(())
    }

    /// Replace the contents with one column vector per input column.
    pub fn load_column_major(&self, rows: &[Vec<f64>]) -> Result<()> {
        let width = validate_shape(rows)?;
        let vectors: Vec<Arc<SharedVector>> = (0..width)
            .map(|j| {
                let column: Vec<f64> = rows.iter().map(|row| row[j]).collect();
                Arc::new(SharedVector::from_vec(column, Orientation::Column))
            })
            .collect();
        *self.vectors.write() = Arc::from(vectors);
        Ok(())
    }

    pub fn get(&self, index: usize) -> Result<Arc<SharedVector>> {
        let vectors = self.vectors.read();
        vectors
            .get(index)
            .cloned()
            .ok_or(Error::IndexOutOfRange {
                index,
                len: vectors.len(),
            })
    }

    /// Number of vectors: rows when row-oriented, columns otherwise.
    pub fn len(&self) -> usize {
        self.vectors.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Length of each contained vector, 0 for an empty matrix.
    pub fn vector_len(&self) -> usize {
        self.vectors.read().first().map_or(0, |v| v.len())
    }

    /// Orientation shared by every vector. An empty matrix reports `Row`.
    pub fn orientation(&self) -> Orientation {
        self.vectors
            .read()
            .first()
            .map_or(Orientation::Row, |v| v.orientation())
    }

    /// Snapshot of the current vector sequence.
    pub(crate) fn vectors(&self) -> Vectors {
        Arc::clone(&*self.vectors.read())
    }

    /// Copy the contents out in row-major order.
    ///
    /// Every vector is read-locked, in ascending index order, for the whole
    /// copy, then released in reverse order.
    ///
    /// # Errors
    ///
    /// `Shape` if the vectors no longer share one length and orientation,
    /// which happens after `project` resized one of them.
    pub fn read_row_major(&self) -> Result<Vec<Vec<f64>>> {
        let vectors = self.vectors();
        let guards: Vec<_> = vectors.iter().map(|v| v.read_data()).collect();

        let result = {
            let views: Vec<&VectorData> = guards.iter().map(|g| &**g).collect();
            to_rows(&views)
        };

        release_in_reverse(guards);
        result
    }
}

fn to_rows(views: &[&VectorData]) -> Result<Vec<Vec<f64>>> {
    check_uniform(views)?;
    let rows = match views.first() {
        None => Vec::new(),
        Some(first) if first.orientation == Orientation::Row => {
            views.iter().map(|v| v.values.clone()).collect()
        }
        Some(first) => (0..first.values.len())
            .map(|i| views.iter().map(|v| v.values[i]).collect())
            .collect(),
    };
    Ok(rows)
}

/// Check that `rows` is a non-empty rectangle and return its width.
fn validate_shape(rows: &[Vec<f64>]) -> Result<usize> {
    let first = rows
        .first()
        .ok_or_else(|| Error::Shape("empty matrix".to_string()))?;
    let width = first.len();
    if width == 0 {
        return Err(Error::Shape("matrix has an empty row".to_string()));
    }
    if let Some((index, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
        return Err(Error::Shape(format!(
            "matrix is not rectangular: row {} has {} columns, expected {}",
            index,
            row.len(),
            width
        )));
    }
    Ok(width)
}
