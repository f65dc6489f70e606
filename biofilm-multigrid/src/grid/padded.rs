//! Padded 3D scalar grid
//!
//! Interior cells are addressed with indices `1..=n` on every axis; index `0`
//! and `n + 1` are ghost cells owned by the boundary condition.

use ndarray::{Array3, ArrayView3, ArrayViewMut3, Zip, s};

/// A 3D array of values with a one-cell padding border on every axis
#[derive(Debug, Clone, PartialEq)]
pub struct PaddedGrid {
    data: Array3<f64>,
    spacing: f64,
}

impl PaddedGrid {
    /// Zero-filled grid with the given interior shape and cell size
    pub fn new(shape: [usize; 3], spacing: f64) -> Self {
        Self::filled(shape, spacing, 0.0)
    }

    /// Grid with every cell (padding included) set to `value`
    pub fn filled(shape: [usize; 3], spacing: f64, value: f64) -> Self {
        Self {
            data: Array3::from_elem((shape[0] + 2, shape[1] + 2, shape[2] + 2), value),
            spacing,
        }
    }

    /// Grid whose interior is evaluated from padded indices; padding starts at zero.
    pub fn from_fn<F>(shape: [usize; 3], spacing: f64, mut f: F) -> Self
    where
        F: FnMut([usize; 3]) -> f64,
    {
        let dim = (shape[0] + 2, shape[1] + 2, shape[2] + 2);
        let data = Array3::from_shape_fn(dim, |(i, j, k)| {
            let interior = (1..=shape[0]).contains(&i)
                && (1..=shape[1]).contains(&j)
                && (1..=shape[2]).contains(&k);
            if interior { f([i, j, k]) } else { 0.0 }
        });
        Self { data, spacing }
    }

    /// Interior shape (padding excluded)
    pub fn shape(&self) -> [usize; 3] {
        let (ni, nj, nk) = self.data.dim();
        [ni - 2, nj - 2, nk - 2]
    }

    /// True when the depth axis holds a single plane
    pub fn is_2d(&self) -> bool {
        self.shape()[2] == 1
    }

    /// Cell size
    pub fn spacing(&self) -> f64 {
        self.spacing
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize, k: usize) -> f64 {
        self.data[[i, j, k]]
    }

    #[inline]
    pub fn set(&mut self, i: usize, j: usize, k: usize, value: f64) {
        self.data[[i, j, k]] = value;
    }

    /// Whole array, padding included
    pub fn data(&self) -> &Array3<f64> {
        &self.data
    }

    /// Whole array, padding included. Intended for boundary conditions.
    pub fn data_mut(&mut self) -> &mut Array3<f64> {
        &mut self.data
    }

    /// View of the interior cells
    pub fn interior(&self) -> ArrayView3<'_, f64> {
        self.data.slice(s![1..-1, 1..-1, 1..-1])
    }

    /// Mutable view of the interior cells
    pub fn interior_mut(&mut self) -> ArrayViewMut3<'_, f64> {
        self.data.slice_mut(s![1..-1, 1..-1, 1..-1])
    }

    /// Iterate over padded indices of the interior cells, `i` fastest.
    pub fn interior_cells(&self) -> impl Iterator<Item = [usize; 3]> + use<> {
        let [ni, nj, nk] = self.shape();
        (1..=nk).flat_map(move |k| {
            (1..=nj).flat_map(move |j| (1..=ni).map(move |i| [i, j, k]))
        })
    }

    pub fn fill_interior(&mut self, value: f64) {
        self.interior_mut().fill(value);
    }

    /// Copy every cell (padding included) from a grid of the same shape.
    pub fn copy_from(&mut self, other: &PaddedGrid) {
        self.data.assign(&other.data);
    }

    /// `self += other` over the interior
    pub fn add_interior(&mut self, other: &PaddedGrid) {
        Zip::from(self.interior_mut())
            .and(other.interior())
            .for_each(|a, &b| *a += b);
    }

    /// `self -= other` over the interior
    pub fn subtract_interior(&mut self, other: &PaddedGrid) {
        Zip::from(self.interior_mut())
            .and(other.interior())
            .for_each(|a, &b| *a -= b);
    }

    /// Replace negative interior values by zero.
    pub fn clamp_negatives(&mut self) {
        self.interior_mut().mapv_inplace(|v| v.max(0.0));
    }

    /// Largest interior value
    pub fn max_value(&self) -> f64 {
        self.interior()
            .fold(f64::NEG_INFINITY, |acc, &v| acc.max(v))
    }

    /// Smallest interior value
    pub fn min_value(&self) -> f64 {
        self.interior().fold(f64::INFINITY, |acc, &v| acc.min(v))
    }

    /// Padded indices of the cell containing a continuous position, if inside.
    ///
    /// On a 2D grid the depth coordinate is ignored.
    pub fn snap_to_discrete(&self, position: [f64; 3]) -> Option<[usize; 3]> {
        let shape = self.shape();
        let mut cell = [1; 3];
        for axis in 0..3 {
            if axis == 2 && self.is_2d() {
                continue;
            }
            let c = (position[axis] / self.spacing).floor();
            if !(c >= 0.0 && c < shape[axis] as f64) {
                return None;
            }
            cell[axis] = c as usize + 1;
        }
        Some(cell)
    }

    /// Continuous position of the center of a padded cell.
    pub fn to_continuous(&self, cell: [usize; 3]) -> [f64; 3] {
        cell.map(|c| (c as f64 - 0.5) * self.spacing)
    }
}
