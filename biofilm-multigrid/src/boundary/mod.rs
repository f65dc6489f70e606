//! Boundary conditions for padded grids
//!
//! Provides:
//! - The [`BoundaryCondition`] capability the solver uses to refresh ghost cells
//! - [`DomainBoundary`]: per-face bulk (Dirichlet), zero-flux and cyclic conditions
//! - Boundary-layer classification (which cells take part in the solve)

mod layer;

pub use layer::*;

use crate::error::{MultigridError, Result};
use crate::grid::PaddedGrid;
use ndarray::Axis;
use serde::{Deserialize, Serialize};

/// Ghost-cell refresher and carrier classification consumed by the solver
pub trait BoundaryCondition {
    /// Rewrite every padding cell of `grid`. `bulk` is the value imposed on
    /// faces connected to the bulk liquid.
    fn refresh_padding(&self, grid: &mut PaddedGrid, bulk: f64);

    /// Whether the finest-level cell at padded indices `(i, j, k)` is carrier.
    fn is_carrier(&self, i: usize, j: usize, k: usize) -> bool;
}

/// A boundary condition bound to the bulk value of one field
#[derive(Clone, Copy)]
pub struct Padding<'a> {
    boundary: &'a dyn BoundaryCondition,
    bulk: f64,
}

impl<'a> Padding<'a> {
    pub fn new(boundary: &'a dyn BoundaryCondition, bulk: f64) -> Self {
        Self { boundary, bulk }
    }

    /// Value imposed on bulk faces
    pub fn bulk(&self) -> f64 {
        self.bulk
    }

    /// Same boundary, different bulk value
    pub fn with_bulk(&self, bulk: f64) -> Self {
        Self {
            boundary: self.boundary,
            bulk,
        }
    }

    pub fn refresh(&self, grid: &mut PaddedGrid) {
        self.boundary.refresh_padding(grid, self.bulk);
    }
}

impl std::fmt::Debug for Padding<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Padding").field("bulk", &self.bulk).finish()
    }
}

/// Condition applied on one face of the domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaceCondition {
    /// Ghost cells hold the bulk value (Dirichlet)
    Bulk,
    /// Ghost cells mirror the adjacent interior cell
    ZeroFlux,
    /// Ghost cells copy the opposite side of the domain
    Cyclic,
}

/// Rectangular domain with one condition per face
///
/// The vertical axis (i) runs from the substratum (`i_low`) towards the bulk
/// liquid (`i_high`). On a 2D grid the depth faces are ignored and the depth
/// padding mirrors the single plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainBoundary {
    /// Face at the substratum
    pub i_low: FaceCondition,
    /// Face towards the bulk liquid
    pub i_high: FaceCondition,
    pub j_low: FaceCondition,
    pub j_high: FaceCondition,
    pub k_low: FaceCondition,
    pub k_high: FaceCondition,
    /// Number of finest-level layers above the substratum that are carrier
    #[serde(default)]
    pub carrier_layers: usize,
}

impl DomainBoundary {
    /// Biofilm reactor slab: impermeable substratum, bulk liquid on top,
    /// periodic sides.
    pub fn biofilm() -> Self {
        Self {
            i_low: FaceCondition::ZeroFlux,
            i_high: FaceCondition::Bulk,
            j_low: FaceCondition::Cyclic,
            j_high: FaceCondition::Cyclic,
            k_low: FaceCondition::Cyclic,
            k_high: FaceCondition::Cyclic,
            carrier_layers: 0,
        }
    }

    /// Every face in contact with the bulk liquid
    pub fn all_bulk() -> Self {
        Self::uniform(FaceCondition::Bulk)
    }

    /// Closed box
    pub fn all_zero_flux() -> Self {
        Self::uniform(FaceCondition::ZeroFlux)
    }

    fn uniform(face: FaceCondition) -> Self {
        Self {
            i_low: face,
            i_high: face,
            j_low: face,
            j_high: face,
            k_low: face,
            k_high: face,
            carrier_layers: 0,
        }
    }

    /// Mark the first `layers` finest-level layers above the substratum as carrier.
    pub fn with_carrier_layers(mut self, layers: usize) -> Self {
        self.carrier_layers = layers;
        self
    }

    /// Check that cyclic faces come in pairs.
    pub fn validate(&self) -> Result<()> {
        for (axis, (low, high)) in self.faces().into_iter().enumerate() {
            if (low == FaceCondition::Cyclic) != (high == FaceCondition::Cyclic) {
                return Err(MultigridError::UnpairedCyclicFace { axis });
            }
        }
        Ok(())
    }

    fn faces(&self) -> [(FaceCondition, FaceCondition); 3] {
        [
            (self.i_low, self.i_high),
            (self.j_low, self.j_high),
            (self.k_low, self.k_high),
        ]
    }
}

impl Default for DomainBoundary {
    fn default() -> Self {
        Self::biofilm()
    }
}

impl BoundaryCondition for DomainBoundary {
    fn refresh_padding(&self, grid: &mut PaddedGrid, bulk: f64) {
        let two_d = grid.is_2d();
        let data = grid.data_mut();

        // Axes are processed in order over the full extent of the others, so
        // edges and corners end up consistent with the last axis written.
        for (axis, (low, high)) in self.faces().into_iter().enumerate() {
            let (low, high) = if axis == 2 && two_d {
                (FaceCondition::ZeroFlux, FaceCondition::ZeroFlux)
            } else {
                (low, high)
            };
            let last = data.len_of(Axis(axis)) - 1;
            write_face(data, axis, 0, last, low, bulk);
            write_face(data, axis, last, 0, high, bulk);
        }
    }

    fn is_carrier(&self, i: usize, _j: usize, _k: usize) -> bool {
        (1..=self.carrier_layers).contains(&i)
    }
}

/// Fill the ghost plane at `ghost`; `opposite` is the ghost plane on the other side.
fn write_face(
    data: &mut ndarray::Array3<f64>,
    axis: usize,
    ghost: usize,
    opposite: usize,
    face: FaceCondition,
    bulk: f64,
) {
    let source = match face {
        FaceCondition::Bulk => {
            data.index_axis_mut(Axis(axis), ghost).fill(bulk);
            return;
        }
        // Neighbouring interior plane
        FaceCondition::ZeroFlux => {
            if ghost == 0 {
                1
            } else {
                ghost - 1
            }
        }
        // Interior plane adjacent to the opposite ghost plane
        FaceCondition::Cyclic => {
            if opposite == 0 {
                1
            } else {
                opposite - 1
            }
        }
    };
    let plane = data.index_axis(Axis(axis), source).to_owned();
    data.index_axis_mut(Axis(axis), ghost).assign(&plane);
}
