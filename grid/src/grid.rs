use crate::{GridError, GridSpec};
use num_traits::{NumCast, ToPrimitive};
use rayon::prelude::*;
use std::fmt::Debug;

/// On-disk representation of a sample type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    Float32,
    Int32,
    UInt8,
}

/// Numeric types a [`Grid`] can hold.
pub trait Sample: Copy + PartialEq + Debug + Send + Sync + NumCast + 'static {
    const KIND: SampleKind;

    fn as_f64(self) -> f64 {
        ToPrimitive::to_f64(&self).unwrap_or(f64::NAN)
    }

    /// Returns `None` when `v` is not representable (NaN, out of
    /// range).
    fn try_from_f64(v: f64) -> Option<Self> {
        <Self as NumCast>::from(v)
    }

    fn is_nan(self) -> bool {
        false
    }
}

impl Sample for u8 {
    const KIND: SampleKind = SampleKind::UInt8;
}

impl Sample for i32 {
    const KIND: SampleKind = SampleKind::Int32;
}

impl Sample for i64 {
    const KIND: SampleKind = SampleKind::Int32;
}

impl Sample for f32 {
    const KIND: SampleKind = SampleKind::Float32;

    fn is_nan(self) -> bool {
        f32::is_nan(self)
    }
}

impl Sample for f64 {
    const KIND: SampleKind = SampleKind::Float32;

    fn is_nan(self) -> bool {
        f64::is_nan(self)
    }
}

/// A rectangular raster of samples with a nodata sentinel.
///
/// Samples are stored row-major starting at the north-west corner.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    spec: GridSpec,
    nodata: T,
    cells: Vec<T>,
}

impl<T: Sample> Grid<T> {
    /// Returns a grid with every cell set to nodata.
    pub fn new(spec: GridSpec, nodata: T) -> Self {
        Self::filled(spec, nodata, nodata)
    }

    pub fn filled(spec: GridSpec, value: T, nodata: T) -> Self {
        let cells = vec![value; spec.len()];
        Self {
            spec,
            nodata,
            cells,
        }
    }

    pub fn from_vec(spec: GridSpec, nodata: T, cells: Vec<T>) -> Result<Self, GridError> {
        if cells.len() != spec.len() {
            return Err(GridError::Dimensions {
                expected: spec.len(),
                actual: cells.len(),
            });
        }
        Ok(Self {
            spec,
            nodata,
            cells,
        })
    }

    pub fn spec(&self) -> &GridSpec {
        &self.spec
    }

    pub fn nodata(&self) -> T {
        self.nodata
    }

    /// Raw samples, nodata sentinels included.
    pub fn cells(&self) -> &[T] {
        &self.cells
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_nodata_value(&self, value: T) -> bool {
        value == self.nodata || value.is_nan()
    }

    pub fn is_nodata(&self, index: usize) -> bool {
        self.is_nodata_value(self.cells[index])
    }

    /// Returns the sample at (`col`, `row`), or `None` for nodata and
    /// out of bounds.
    pub fn get(&self, col: usize, row: usize) -> Option<T> {
        if col < self.spec.cols && row < self.spec.rows {
            self.get_index(self.spec.index(col, row))
        } else {
            None
        }
    }

    pub fn get_index(&self, index: usize) -> Option<T> {
        let value = *self.cells.get(index)?;
        (!self.is_nodata_value(value)).then_some(value)
    }

    pub fn get_raw(&self, index: usize) -> T {
        self.cells[index]
    }

    pub fn set(&mut self, col: usize, row: usize, value: T) {
        let index = self.spec.index(col, row);
        self.cells[index] = value;
    }

    pub fn set_index(&mut self, index: usize, value: T) {
        self.cells[index] = value;
    }

    pub fn set_nodata(&mut self, index: usize) {
        self.cells[index] = self.nodata;
    }

    pub fn valid_count(&self) -> usize {
        self.cells
            .iter()
            .filter(|v| !self.is_nodata_value(**v))
            .count()
    }

    /// Iterates over `(index, sample)` with nodata as `None`.
    pub fn iter(&self) -> impl Iterator<Item = (usize, Option<T>)> + '_ {
        (0..self.cells.len()).map(|idx| (idx, self.get_index(idx)))
    }

    /// Cell-wise transform. Nodata propagates, and `f` may return
    /// `None` to produce nodata.
    pub fn map<U, F>(&self, nodata: U, f: F) -> Grid<U>
    where
        U: Sample,
        F: Fn(T) -> Option<U>,
    {
        let cells = self
            .cells
            .iter()
            .map(|&v| {
                if self.is_nodata_value(v) {
                    nodata
                } else {
                    f(v).unwrap_or(nodata)
                }
            })
            .collect();
        Grid {
            spec: self.spec.clone(),
            nodata,
            cells,
        }
    }

    /// Same as [`Grid::map`], spread across the rayon thread pool.
    pub fn par_map<U, F>(&self, nodata: U, f: F) -> Grid<U>
    where
        U: Sample,
        F: Fn(T) -> Option<U> + Sync + Send,
    {
        let cells = self
            .cells
            .par_iter()
            .map(|&v| {
                if self.is_nodata_value(v) {
                    nodata
                } else {
                    f(v).unwrap_or(nodata)
                }
            })
            .collect();
        Grid {
            spec: self.spec.clone(),
            nodata,
            cells,
        }
    }

    /// Cell-wise combination of two co-registered grids. Unlike
    /// [`Grid::map`], `f` sees nodata (as `None`) on either side.
    pub fn zip_map<U, V, F>(&self, other: &Grid<U>, nodata: V, f: F) -> Result<Grid<V>, GridError>
    where
        U: Sample,
        V: Sample,
        F: Fn(Option<T>, Option<U>) -> Option<V>,
    {
        self.spec.ensure_coregistered(&other.spec)?;
        let cells = (0..self.cells.len())
            .map(|idx| f(self.get_index(idx), other.get_index(idx)).unwrap_or(nodata))
            .collect();
        Ok(Grid {
            spec: self.spec.clone(),
            nodata,
            cells,
        })
    }

    /// Lowest valid sample.
    pub fn min(&self) -> Option<T> {
        self.valid()
            .min_by(|a, b| a.as_f64().total_cmp(&b.as_f64()))
    }

    /// Highest valid sample.
    pub fn max(&self) -> Option<T> {
        self.valid()
            .max_by(|a, b| a.as_f64().total_cmp(&b.as_f64()))
    }

    fn valid(&self) -> impl Iterator<Item = T> + '_ {
        self.cells
            .iter()
            .copied()
            .filter(|v| !self.is_nodata_value(*v))
    }
}
