use crate::raster::RasterNum;
use crate::{Cell, Error, GeoReference, RasterSize, Result};

/// Single band raster with dense sample storage in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseRaster<T: RasterNum> {
    meta: GeoReference,
    data: Vec<T>,
}

impl<T: RasterNum> DenseRaster<T> {
    pub fn new(meta: GeoReference, data: Vec<T>) -> Result<Self> {
        if data.len() != meta.size().cell_count() {
            return Err(Error::SizeMismatch {
                size1: (meta.rows(), meta.columns()),
                size2: (data.len(), 1),
            });
        }

        Ok(DenseRaster { meta, data })
    }

    pub fn zeros(meta: GeoReference) -> Self {
        let cell_count = meta.size().cell_count();
        DenseRaster {
            meta,
            data: vec![T::zero(); cell_count],
        }
    }

    pub fn filled_with(val: T, meta: GeoReference) -> Self {
        let cell_count = meta.size().cell_count();
        DenseRaster {
            meta,
            data: vec![val; cell_count],
        }
    }

    pub fn metadata(&self) -> &GeoReference {
        &self.meta
    }

    pub fn size(&self) -> RasterSize {
        self.meta.size()
    }

    pub fn columns(&self) -> usize {
        self.meta.columns()
    }

    pub fn rows(&self) -> usize {
        self.meta.rows()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_raw_parts(self) -> (GeoReference, Vec<T>) {
        (self.meta, self.data)
    }

    /// Value of the cell, `None` when the cell lies outside of the grid.
    pub fn cell_value(&self, cell: Cell) -> Option<T> {
        if !self.meta.is_cell_on_map(cell) {
            return None;
        }

        Some(self.data[cell.index_in_grid(self.meta.columns())])
    }

    pub fn value_at(&self, row: usize, col: usize) -> T {
        debug_assert!(row < self.rows() && col < self.columns());
        self.data[row * self.columns() + col]
    }

    pub fn set_value_at(&mut self, row: usize, col: usize, value: T) {
        debug_assert!(row < self.rows() && col < self.columns());
        let cols = self.columns();
        self.data[row * cols + col] = value;
    }

    /// Applies `op` to every sample in place.
    pub fn unary_inplace<F: Fn(&mut T)>(&mut self, op: F) {
        self.data.iter_mut().for_each(op);
    }
}
