//! Nested grid hierarchy for geometric multigrid
//!
//! One padded grid per level, from the coarsest (level 0) to the finest
//! (level `order - 1`). Shapes are fixed by the [`GridConfig`] at allocation.

use super::transfer::restrict;
use crate::boundary::Padding;
use crate::error::{MultigridError, Result};
use crate::grid::{GridConfig, PaddedGrid};

/// A scalar field stored at every multigrid level
#[derive(Debug, Clone, PartialEq)]
pub struct GridHierarchy {
    /// Levels from coarsest (0) to finest
    levels: Vec<PaddedGrid>,
}

impl GridHierarchy {
    /// Allocate zero-filled grids for every level of `config`.
    pub fn allocate(config: &GridConfig) -> Self {
        Self::filled(config, 0.0)
    }

    /// Allocate grids with every cell set to `value`.
    pub fn filled(config: &GridConfig, value: f64) -> Self {
        let levels = (0..config.order())
            .map(|level| {
                PaddedGrid::filled(config.level_shape(level), config.spacing(level), value)
            })
            .collect();
        Self { levels }
    }

    /// Build every level from a finest-level field by successive restriction.
    pub fn restrict_from_finest(
        config: &GridConfig,
        finest: &PaddedGrid,
        padding: &Padding<'_>,
    ) -> Result<Self> {
        config.check_shape(config.finest_level(), finest)?;

        let mut hierarchy = Self::allocate(config);
        let interior = finest.interior();
        hierarchy.finest_mut().interior_mut().assign(&interior);
        padding.refresh(hierarchy.finest_mut());
        for coarse in (0..config.finest_level()).rev() {
            let (coarse_grid, fine_grid) = hierarchy.coarse_fine_mut(coarse);
            restrict(fine_grid, coarse_grid, padding);
        }
        Ok(hierarchy)
    }

    /// Number of levels
    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn level(&self, level: usize) -> &PaddedGrid {
        &self.levels[level]
    }

    pub fn level_mut(&mut self, level: usize) -> &mut PaddedGrid {
        &mut self.levels[level]
    }

    /// Get finest level
    pub fn finest(&self) -> &PaddedGrid {
        &self.levels[self.levels.len() - 1]
    }

    pub fn finest_mut(&mut self) -> &mut PaddedGrid {
        let last = self.levels.len() - 1;
        &mut self.levels[last]
    }

    /// Get coarsest level
    pub fn coarsest(&self) -> &PaddedGrid {
        &self.levels[0]
    }

    pub fn coarsest_mut(&mut self) -> &mut PaddedGrid {
        &mut self.levels[0]
    }

    /// Mutable access to level `coarse` and the level just above it.
    pub fn coarse_fine_mut(&mut self, coarse: usize) -> (&mut PaddedGrid, &mut PaddedGrid) {
        let (low, high) = self.levels.split_at_mut(coarse + 1);
        (&mut low[coarse], &mut high[0])
    }

    /// Set the interior of every level to `value` and refresh the padding.
    pub fn reset(&mut self, value: f64, padding: &Padding<'_>) {
        for grid in &mut self.levels {
            grid.fill_interior(value);
            padding.refresh(grid);
        }
    }

    /// Largest interior value of the finest level
    pub fn max_value(&self) -> f64 {
        self.finest().max_value()
    }

    /// Smallest interior value of the finest level
    pub fn min_value(&self) -> f64 {
        self.finest().min_value()
    }

    /// Check that every level has the shape `config` dictates.
    pub fn check_shape(&self, config: &GridConfig) -> Result<()> {
        if self.levels.len() != config.order() {
            return Err(MultigridError::ShapeMismatch {
                expected: config.finest_shape(),
                got: self.finest().shape(),
            });
        }
        for (level, grid) in self.levels.iter().enumerate() {
            config.check_shape(level, grid)?;
        }
        Ok(())
    }
}
