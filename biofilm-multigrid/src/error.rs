//! Error types for the multigrid reaction-diffusion solver.
//!
//! Every failure falls into one of three categories: configuration errors
//! (invalid grid shapes or settings), numeric divergence during relaxation,
//! and precondition violations (API misuse such as solving without bulk
//! concentrations). None of them is recoverable inside the solver.

use std::fmt;
use thiserror::Error;

/// Errors raised by grid configuration, field allocation and solving.
#[derive(Debug, Error)]
pub enum MultigridError {
    /// A grid dimension is not of the form `2^k + 1`.
    #[error("invalid grid dimension {size} (must be 2^k+1)")]
    InvalidDimension {
        /// The rejected dimension
        size: usize,
    },

    /// Only the third axis may be degenerate (size 1, marking a 2D system).
    #[error("axis {axis} has size {size}; only the third axis may be 1")]
    DegenerateAxis {
        /// Axis index (0, 1 or 2)
        axis: usize,
        /// The rejected size
        size: usize,
    },

    /// The configured grid yields no multigrid level.
    #[error("grid too small: every non-degenerate axis needs at least 3 cells")]
    GridTooSmall,

    /// Grid resolution is not a positive finite number.
    #[error("invalid resolution: {resolution} (must be finite and > 0)")]
    InvalidResolution {
        /// The rejected resolution
        resolution: f64,
    },

    /// A field does not have the shape the grid configuration dictates.
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// Expected interior shape
        expected: [usize; 3],
        /// Actual interior shape
        got: [usize; 3],
    },

    /// A cyclic face has no cyclic counterpart on the same axis.
    #[error("cyclic boundary on axis {axis} must be set on both faces")]
    UnpairedCyclicFace {
        /// Axis index (0, 1 or 2)
        axis: usize,
    },

    /// Solver settings are out of range or could not be parsed.
    #[error("invalid solver settings: {reason}")]
    InvalidSettings {
        /// Human readable cause
        reason: String,
    },

    /// A solve was requested without any species.
    #[error("no species to solve for")]
    NoSpecies,

    /// A species has no (or a non-physical) bulk concentration.
    #[error("species '{species}' has no valid bulk concentration")]
    MissingBulkConcentration {
        /// Name of the species
        species: String,
    },

    /// A species diffusivity is negative or non-finite.
    #[error("species '{species}' has invalid diffusivity {value}")]
    InvalidDiffusivity {
        /// Name of the species
        species: String,
        /// The rejected diffusivity
        value: f64,
    },

    /// A solute index does not refer to a solved species.
    #[error("unknown solute index {index} ({count} solutes)")]
    UnknownSolute {
        /// Requested index
        index: usize,
        /// Number of solutes held by the solver
        count: usize,
    },

    /// Relaxation produced NaN.
    #[error("{0}")]
    NumericDivergence(Box<DivergenceReport>),
}

/// A specialized `Result` type for multigrid operations.
pub type Result<T> = std::result::Result<T, MultigridError>;

impl MultigridError {
    /// Returns `true` for invalid grid shapes, mismatched fields and bad settings.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            MultigridError::InvalidDimension { .. }
                | MultigridError::DegenerateAxis { .. }
                | MultigridError::GridTooSmall
                | MultigridError::InvalidResolution { .. }
                | MultigridError::ShapeMismatch { .. }
                | MultigridError::UnpairedCyclicFace { .. }
                | MultigridError::InvalidSettings { .. }
        )
    }

    /// Returns `true` if relaxation diverged.
    pub fn is_numeric_divergence(&self) -> bool {
        matches!(self, MultigridError::NumericDivergence(_))
    }

    /// Returns `true` for API misuse detected before or during a solve.
    pub fn is_precondition_violation(&self) -> bool {
        matches!(
            self,
            MultigridError::NoSpecies
                | MultigridError::MissingBulkConcentration { .. }
                | MultigridError::InvalidDiffusivity { .. }
                | MultigridError::UnknownSolute { .. }
        )
    }

    /// Diagnostic dump attached to a divergence, if any.
    pub fn divergence_report(&self) -> Option<&DivergenceReport> {
        match self {
            MultigridError::NumericDivergence(report) => Some(report),
            _ => None,
        }
    }
}

/// Local state of one species at the cell where relaxation diverged.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesSnapshot {
    /// Species name
    pub name: String,
    /// Concentration at the cell
    pub local: f64,
    /// Bulk concentration
    pub bulk: f64,
    /// Last reaction rate queried at the cell
    pub rate: f64,
    /// Last reaction rate derivative queried at the cell
    pub derivative: f64,
}

/// Full local diagnostic state captured when relaxation hits NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct DivergenceReport {
    /// Grid level (0 = coarsest)
    pub level: usize,
    /// Padded cell indices `(i, j, k)`
    pub cell: [usize; 3],
    /// Species being relaxed when NaN appeared
    pub species: String,
    /// Discrete operator value
    pub lop: f64,
    /// Discrete operator derivative
    pub dlop: f64,
    /// Every species at the cell
    pub snapshot: Vec<SpeciesSnapshot>,
}

impl fmt::Display for DivergenceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "numeric divergence relaxing '{}' at level {} cell ({}, {}, {}): lop = {}, dlop = {}",
            self.species, self.level, self.cell[0], self.cell[1], self.cell[2], self.lop, self.dlop
        )?;
        for s in &self.snapshot {
            writeln!(
                f,
                "  {}: local = {}, bulk = {}, rate = {}, d(rate) = {}",
                s.name, s.local, s.bulk, s.rate, s.derivative
            )?;
        }
        Ok(())
    }
}
