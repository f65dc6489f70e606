//! Relative diffusivity field
//!
//! Scales each species' liquid diffusivity per cell: liquid, biofilm and carrier
//! cells each carry their own ratio. The finest level is classified directly;
//! coarser levels are plain restrictions of it.

use crate::boundary::{BoundaryCondition, Padding};
use crate::error::{MultigridError, Result};
use crate::grid::{GridConfig, PaddedGrid};
use crate::multigrid::GridHierarchy;
use serde::{Deserialize, Serialize};

/// Diffusivity ratios relative to pure liquid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffusivityRatios {
    pub liquid: f64,
    pub biofilm: f64,
    pub carrier: f64,
}

impl Default for DiffusivityRatios {
    fn default() -> Self {
        Self {
            liquid: 1.0,
            biofilm: 1.0,
            carrier: 1e-9,
        }
    }
}

impl DiffusivityRatios {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("liquid", self.liquid),
            ("biofilm", self.biofilm),
            ("carrier", self.carrier),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(MultigridError::InvalidSettings {
                    reason: format!(
                        "{name} diffusivity ratio must be finite and >= 0, got {value}"
                    ),
                });
            }
        }
        Ok(())
    }

    fn classify(&self, carrier: bool, particulates: f64) -> f64 {
        if carrier {
            self.carrier
        } else if particulates > 0.0 {
            self.biofilm
        } else {
            self.liquid
        }
    }
}

/// Build the relative diffusivity hierarchy from the finest-level particulate
/// occupancy and the carrier classification of `boundary`.
pub fn relative_diffusivity(
    config: &GridConfig,
    particulates: &PaddedGrid,
    boundary: &dyn BoundaryCondition,
    ratios: &DiffusivityRatios,
) -> Result<GridHierarchy> {
    config.check_shape(config.finest_level(), particulates)?;

    let finest = PaddedGrid::from_fn(config.finest_shape(), config.resolution(), |[i, j, k]| {
        ratios.classify(boundary.is_carrier(i, j, k), particulates.get(i, j, k))
    });
    GridHierarchy::restrict_from_finest(config, &finest, &Padding::new(boundary, ratios.liquid))
}
