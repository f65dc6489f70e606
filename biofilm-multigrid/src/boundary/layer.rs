//! Boundary-layer classification
//!
//! The boundary layer is the region where the reaction-diffusion equation is
//! actually solved. Cells outside it are frozen at the bulk concentration and
//! are never touched by relaxation or boundary-layer-aware transfers.

use super::BoundaryCondition;
use crate::error::Result;
use crate::grid::{GridConfig, PaddedGrid};
use crate::multigrid::GridHierarchy;

/// Flag value of a cell inside the boundary layer
pub const ACTIVE: f64 = 0.0;
/// Flag value of a cell held at bulk concentration
pub const FROZEN: f64 = 1.0;

const ACTIVE_THRESHOLD: f64 = 0.5;

/// Whether a classification value marks an active cell.
#[inline]
pub fn is_active(flag: f64) -> bool {
    flag < ACTIVE_THRESHOLD
}

/// Active/frozen flags at every grid level
#[derive(Debug, Clone)]
pub struct BoundaryLayerField {
    levels: GridHierarchy,
}

impl BoundaryLayerField {
    /// Every cell of every level is active.
    pub fn all_active(config: &GridConfig) -> Self {
        Self {
            levels: GridHierarchy::filled(config, ACTIVE),
        }
    }

    /// Build coarse levels from finest-level flags.
    ///
    /// A coarse cell is active when any fine cell of its restriction stencil
    /// (the coincident cell and its face neighbours) is active.
    pub fn from_finest(config: &GridConfig, finest: &PaddedGrid) -> Result<Self> {
        config.check_shape(config.finest_level(), finest)?;

        let mut levels = GridHierarchy::filled(config, FROZEN);
        let interior = finest.interior();
        levels.finest_mut().interior_mut().assign(&interior);
        for coarse in (0..config.finest_level()).rev() {
            let (coarse_grid, fine_grid) = levels.coarse_fine_mut(coarse);
            coarsen_flags(fine_grid, coarse_grid);
        }
        Ok(Self { levels })
    }

    pub fn num_levels(&self) -> usize {
        self.levels.num_levels()
    }

    /// Flags at `level`
    pub fn level(&self, level: usize) -> &PaddedGrid {
        self.levels.level(level)
    }

    #[inline]
    pub fn is_active(&self, level: usize, i: usize, j: usize, k: usize) -> bool {
        is_active(self.levels.level(level).get(i, j, k))
    }

    /// Number of active interior cells at `level`
    pub fn active_cells(&self, level: usize) -> usize {
        self.level(level)
            .interior()
            .iter()
            .filter(|&&v| is_active(v))
            .count()
    }

    /// Check that every level matches `config`.
    pub fn check_shape(&self, config: &GridConfig) -> Result<()> {
        self.levels.check_shape(config)
    }
}

fn coarsen_flags(fine: &PaddedGrid, coarse: &mut PaddedGrid) {
    let [fi, fj, fk] = fine.shape();
    let [ci, cj, ck] = coarse.shape();
    let two_d = fine.is_2d();

    for kc in 1..=ck {
        let k = if two_d { 1 } else { 2 * kc - 1 };
        for jc in 1..=cj {
            let j = 2 * jc - 1;
            for ic in 1..=ci {
                let i = 2 * ic - 1;
                let mut stencil = vec![
                    (i, j, k),
                    (i - 1, j, k),
                    (i + 1, j, k),
                    (i, j - 1, k),
                    (i, j + 1, k),
                ];
                if !two_d {
                    stencil.push((i, j, k - 1));
                    stencil.push((i, j, k + 1));
                }
                let active = stencil.into_iter().any(|(a, b, c)| {
                    (1..=fi).contains(&a)
                        && (1..=fj).contains(&b)
                        && (1..=fk).contains(&c)
                        && is_active(fine.get(a, b, c))
                });
                coarse.set(ic, jc, kc, if active { ACTIVE } else { FROZEN });
            }
        }
    }
}

/// Computes the boundary-layer classification from particulate fields
pub trait BoundaryLayer {
    /// Classify every cell of every level.
    ///
    /// `particulates` is the finest-level biomass density; any positive value
    /// marks an occupied cell.
    fn recompute(
        &self,
        config: &GridConfig,
        particulates: &PaddedGrid,
        boundary: &dyn BoundaryCondition,
    ) -> Result<BoundaryLayerField>;
}

/// Solve everywhere
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformBoundaryLayer;

impl BoundaryLayer for UniformBoundaryLayer {
    fn recompute(
        &self,
        config: &GridConfig,
        particulates: &PaddedGrid,
        _boundary: &dyn BoundaryCondition,
    ) -> Result<BoundaryLayerField> {
        config.check_shape(config.finest_level(), particulates)?;
        Ok(BoundaryLayerField::all_active(config))
    }
}

/// Active within `thickness` of any occupied or carrier cell
#[derive(Debug, Clone, Copy)]
pub struct DilatedBoundaryLayer {
    /// Boundary-layer thickness, in the same units as the grid resolution
    pub thickness: f64,
}

impl DilatedBoundaryLayer {
    pub fn new(thickness: f64) -> Self {
        Self { thickness }
    }
}

impl BoundaryLayer for DilatedBoundaryLayer {
    fn recompute(
        &self,
        config: &GridConfig,
        particulates: &PaddedGrid,
        boundary: &dyn BoundaryCondition,
    ) -> Result<BoundaryLayerField> {
        config.check_shape(config.finest_level(), particulates)?;

        let shape = config.finest_shape();
        let radius = (self.thickness / config.resolution()).max(0.0);
        let reach = radius.floor() as isize;
        let depth_reach = if config.is_2d() { 0 } else { reach };

        let mut flags = PaddedGrid::filled(shape, config.resolution(), FROZEN);
        let occupied = particulates.interior_cells().filter(|&[i, j, k]| {
            particulates.get(i, j, k) > 0.0 || boundary.is_carrier(i, j, k)
        });

        for [i, j, k] in occupied {
            for dk in -depth_reach..=depth_reach {
                for dj in -reach..=reach {
                    for di in -reach..=reach {
                        if ((di * di + dj * dj + dk * dk) as f64) > radius * radius {
                            continue;
                        }
                        let cell = [i as isize + di, j as isize + dj, k as isize + dk];
                        let inside = cell
                            .iter()
                            .zip(shape.iter())
                            .all(|(&c, &n)| c >= 1 && c <= n as isize);
                        if inside {
                            flags.set(cell[0] as usize, cell[1] as usize, cell[2] as usize, ACTIVE);
                        }
                    }
                }
            }
        }

        log::debug!(
            "boundary layer: {} of {} finest cells active",
            flags.interior().iter().filter(|&&v| is_active(v)).count(),
            shape.iter().product::<usize>()
        );
        BoundaryLayerField::from_finest(config, &flags)
    }
}
