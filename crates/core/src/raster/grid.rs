//! Main Raster type

use crate::error::{Error, Result};
use crate::raster::RasterElement;
use ndarray::{Array2, ArrayView2, ArrayViewMut2};

/// A 2D raster grid.
///
/// `Raster<T>` stores values of type `T` in row-major order. Every field
/// of the simulation domain is one `Raster` of identical shape; the shared
/// cell geometry lives on the domain, not on the individual rasters.
///
/// # Type Parameters
///
/// - `T`: The cell value type, must implement [`RasterElement`]
#[derive(Debug, Clone)]
pub struct Raster<T: RasterElement> {
    /// Raster data stored in row-major order (row, col)
    data: Array2<T>,
}

impl<T: RasterElement> Raster<T> {
    /// Create a new raster filled with zeros
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            data: Array2::zeros((rows, cols)),
        }
    }

    /// Create a new raster filled with a specific value
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self {
            data: Array2::from_elem((rows, cols), value),
        }
    }

    /// Create a raster from existing row-major data
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions { rows, cols });
        }

        let array = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;

        Ok(Self { data: array })
    }

    /// Create a raster from an ndarray
    pub fn from_array(data: Array2<T>) -> Self {
        // normalize to standard layout so the flat accessors hold
        let data = if data.is_standard_layout() {
            data
        } else {
            Array2::from_shape_vec(data.dim(), data.iter().copied().collect())
                .unwrap_or_else(|_| Array2::zeros(data.dim()))
        };
        Self { data }
    }

    // Dimensions

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    // Data access

    /// Get value at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Set value at (row, col)
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        if row >= self.rows() || col >= self.cols() {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        self.data[(row, col)] = value;
        Ok(())
    }

    /// Get value at (row, col) without bounds checking
    ///
    /// # Safety
    /// Caller must ensure row < self.rows() and col < self.cols()
    pub unsafe fn get_unchecked(&self, row: usize, col: usize) -> T {
        unsafe { *self.data.uget((row, col)) }
    }

    /// Flat row-major view of the cells.
    ///
    /// Every constructor produces a standard-layout array, so this never
    /// fails in practice.
    pub fn as_slice(&self) -> &[T] {
        self.data
            .as_slice()
            .expect("raster data is stored contiguously")
    }

    /// Flat mutable row-major view of the cells
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.data
            .as_slice_mut()
            .expect("raster data is stored contiguously")
    }

    /// Get a view of the underlying data
    pub fn view(&self) -> ArrayView2<'_, T> {
        self.data.view()
    }

    /// Get a mutable view of the underlying data
    pub fn view_mut(&mut self) -> ArrayViewMut2<'_, T> {
        self.data.view_mut()
    }

    /// Get a reference to the underlying array
    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    // Bulk operations

    /// Set every cell to a value
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    /// Overwrite the raster with the values of a view of the same shape
    pub fn assign(&mut self, values: ArrayView2<'_, T>) -> Result<()> {
        if values.dim() != self.data.dim() {
            let (er, ec) = self.data.dim();
            let (ar, ac) = values.dim();
            return Err(Error::ShapeMismatch { er, ec, ar, ac });
        }
        self.data.assign(&values);
        Ok(())
    }

    /// Copy the values of another raster of the same shape
    pub fn copy_from(&mut self, other: &Raster<T>) -> Result<()> {
        self.assign(other.view())
    }

    // Reductions

    /// Sum of all cells as f64
    pub fn sum(&self) -> f64 {
        self.as_slice()
            .iter()
            .map(|v| v.to_f64().unwrap_or(0.0))
            .sum()
    }

    /// Sum of the interior cells (halo ring excluded) as f64
    pub fn interior_sum(&self) -> f64 {
        let (rows, cols) = self.shape();
        if rows < 3 || cols < 3 {
            return 0.0;
        }
        let slice = self.as_slice();
        let mut total = 0.0;
        for r in 1..rows - 1 {
            let row = &slice[r * cols + 1..r * cols + cols - 1];
            total += row.iter().map(|v| v.to_f64().unwrap_or(0.0)).sum::<f64>();
        }
        total
    }

    /// Maximum cell value, or `None` for an empty raster
    pub fn max(&self) -> Option<T> {
        self.as_slice()
            .iter()
            .copied()
            .fold(None, |acc, v| match acc {
                None => Some(v),
                Some(m) => {
                    if v > m {
                        Some(v)
                    } else {
                        Some(m)
                    }
                }
            })
    }
}
