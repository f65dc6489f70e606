//! Grid configuration and padded storage
//!
//! Grids are square/cubic with `2^k + 1` cells per side. A third axis of size 1
//! marks a 2D system, which is handled as degenerate 3D.

mod padded;

pub use padded::*;

use crate::error::{MultigridError, Result};
use serde::{Deserialize, Serialize};

/// Return the `k` such that `2^k + 1 == n`.
pub fn order_of(n: usize) -> Result<usize> {
    match n.checked_sub(1) {
        Some(m) if m.is_power_of_two() => Ok(m.trailing_zeros() as usize),
        _ => Err(MultigridError::InvalidDimension { size: n }),
    }
}

/// Raw grid dimensions, as written in configuration files
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridDimensions {
    /// Cells along the vertical axis (i)
    pub n: usize,
    /// Cells along the horizontal axis (j)
    pub m: usize,
    /// Cells along the depth axis (k); 1 for a 2D system
    #[serde(default = "default_depth")]
    pub l: usize,
    /// Finest-level cell size
    pub resolution: f64,
}

fn default_depth() -> usize {
    1
}

/// Location of the cell being processed: grid level plus padded indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    /// Grid level, 0 is the coarsest
    pub level: usize,
    /// Padded index along the first axis (1 is the first interior cell)
    pub i: usize,
    /// Padded index along the second axis
    pub j: usize,
    /// Padded index along the third axis, always 1 in 2D
    pub k: usize,
}

impl Cursor {
    pub fn new(level: usize, i: usize, j: usize, k: usize) -> Self {
        Self { level, i, j, k }
    }

    pub fn cell(&self) -> [usize; 3] {
        [self.i, self.j, self.k]
    }
}

/// Validated, immutable grid shape shared by every field of a solve
///
/// Level 0 is the coarsest grid, level `order() - 1` the finest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GridDimensions", into = "GridDimensions")]
pub struct GridConfig {
    shape: [usize; 3],
    resolution: f64,
    order: usize,
}

impl GridConfig {
    /// Validate the finest-level interior shape `n x m x l`.
    pub fn new(n: usize, m: usize, l: usize, resolution: f64) -> Result<Self> {
        if !(resolution.is_finite() && resolution > 0.0) {
            return Err(MultigridError::InvalidResolution { resolution });
        }
        for (axis, size) in [(0, n), (1, m)] {
            if size == 1 {
                return Err(MultigridError::DegenerateAxis { axis, size });
            }
        }

        let mut order = order_of(n)?.min(order_of(m)?);
        if l != 1 {
            order = order.min(order_of(l)?);
        }
        if order == 0 {
            return Err(MultigridError::GridTooSmall);
        }

        Ok(Self {
            shape: [n, m, l],
            resolution,
            order,
        })
    }

    /// Number of multigrid levels
    pub fn order(&self) -> usize {
        self.order
    }

    /// Index of the finest level
    pub fn finest_level(&self) -> usize {
        self.order - 1
    }

    /// True when the third axis is degenerate
    pub fn is_2d(&self) -> bool {
        self.shape[2] == 1
    }

    /// Finest-level cell size
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Interior shape of the finest level
    pub fn finest_shape(&self) -> [usize; 3] {
        self.shape
    }

    /// Interior shape at `level`; each coarsening maps `n` to `(n - 1) / 2 + 1`.
    pub fn level_shape(&self, level: usize) -> [usize; 3] {
        debug_assert!(level < self.order);
        let coarsening = self.finest_level() - level;
        self.shape.map(|size| {
            if size == 1 {
                1
            } else {
                ((size - 1) >> coarsening) + 1
            }
        })
    }

    /// Cell size at `level`
    pub fn spacing(&self, level: usize) -> f64 {
        let coarsening = self.finest_level() - level;
        self.resolution * (1u64 << coarsening) as f64
    }

    /// Fail unless `grid` has the interior shape of `level`.
    pub fn check_shape(&self, level: usize, grid: &PaddedGrid) -> Result<()> {
        let expected = self.level_shape(level);
        let got = grid.shape();
        if expected != got {
            return Err(MultigridError::ShapeMismatch { expected, got });
        }
        Ok(())
    }
}

impl TryFrom<GridDimensions> for GridConfig {
    type Error = MultigridError;

    fn try_from(dims: GridDimensions) -> Result<Self> {
        GridConfig::new(dims.n, dims.m, dims.l, dims.resolution)
    }
}

impl From<GridConfig> for GridDimensions {
    fn from(config: GridConfig) -> Self {
        GridDimensions {
            n: config.shape[0],
            m: config.shape[1],
            l: config.shape[2],
            resolution: config.resolution,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_of() {
        assert_eq!(order_of(2).unwrap(), 0);
        assert_eq!(order_of(3).unwrap(), 1);
        assert_eq!(order_of(9).unwrap(), 3);
        assert_eq!(order_of(129).unwrap(), 7);

        for n in [0, 1, 4, 8, 10, 31, 100] {
            let err = order_of(n).unwrap_err();
            assert!(err.is_configuration_error(), "n = {}", n);
        }
    }

    #[test]
    fn test_2d_config() {
        let config = GridConfig::new(9, 9, 1, 2.0).unwrap();
        assert!(config.is_2d());
        assert_eq!(config.order(), 3);
        assert_eq!(config.level_shape(2), [9, 9, 1]);
        assert_eq!(config.level_shape(1), [5, 5, 1]);
        assert_eq!(config.level_shape(0), [3, 3, 1]);
        assert_eq!(config.spacing(0), 8.0);
    }

    #[test]
    fn test_rectangular_uses_smallest_order() {
        let config = GridConfig::new(33, 17, 9, 1.0).unwrap();
        assert_eq!(config.order(), 3);
        assert_eq!(config.level_shape(0), [9, 5, 3]);
    }

    #[test]
    fn test_rejects_bad_shapes() {
        let err = GridConfig::new(10, 9, 1, 1.0).unwrap_err();
        assert!(err.is_configuration_error());
        assert!(matches!(
            GridConfig::new(9, 1, 9, 1.0),
            Err(MultigridError::DegenerateAxis { axis: 1, .. })
        ));
        assert!(matches!(
            GridConfig::new(9, 9, 6, 1.0),
            Err(MultigridError::InvalidDimension { size: 6 })
        ));
        assert!(matches!(
            GridConfig::new(2, 9, 1, 1.0),
            Err(MultigridError::GridTooSmall)
        ));
        assert!(matches!(
            GridConfig::new(9, 9, 1, 0.0),
            Err(MultigridError::InvalidResolution { .. })
        ));
    }

    #[test]
    fn test_json_is_validated() {
        let json = r#"{"n": 17, "m": 17, "resolution": 4.0}"#;
        let config: GridConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.order(), 4);
        assert!(config.is_2d());

        let written = serde_json::to_string(&config).unwrap();
        let back: GridConfig = serde_json::from_str(&written).unwrap();
        assert_eq!(back, config);

        let bad = r#"{"n": 12, "m": 17, "resolution": 1.0}"#;
        assert!(serde_json::from_str::<GridConfig>(bad).is_err());
    }
}
