//! Multigrid reaction-diffusion solver for biofilm solute fields
//!
//! This crate computes steady-state solute concentrations around a biofilm on
//! nested cell-centred grids with `2^k + 1` cells per side, using full
//! multigrid with FAS V-cycles and red-black Newton Gauss-Seidel relaxation.
//!
//! # Features
//!
//! - **Grids**: 2D (degenerate third axis) and 3D padded grids with validated shapes
//! - **Boundaries**: bulk, zero-flux and cyclic faces, carrier layers, boundary-layer gating
//! - **Kinetics**: first-order decay, zero-order and multi-substrate Monod uptake, or any closure
//! - **Solver**: nested iteration with truncation-error stopping, plus a relaxation-only
//!   reference path
//!
//! # Example
//!
//! ```no_run
//! use biofilm_multigrid::{
//!     BoundaryLayerField, DomainBoundary, FirstOrderDecay, GridConfig, MultigridSolver,
//!     PaddedGrid, Problem, Solute, SolverSettings, Species,
//! };
//!
//! # fn main() -> biofilm_multigrid::Result<()> {
//! let config = GridConfig::new(33, 33, 1, 1e-6)?;
//! let boundary = DomainBoundary::biofilm();
//! let layer = BoundaryLayerField::all_active(&config);
//! let particulates = PaddedGrid::new(config.finest_shape(), config.resolution());
//!
//! let oxygen = Solute::new("oxygen", 2e-9, FirstOrderDecay::new(0, 1e-3)).with_bulk(8e-3);
//! let species: [&dyn Species; 1] = [&oxygen];
//! let problem = Problem {
//!     species: &species,
//!     boundary: &boundary,
//!     boundary_layer: &layer,
//!     particulates: &particulates,
//! };
//!
//! let mut solver = MultigridSolver::new(config, SolverSettings::default())?;
//! let report = solver.solve(&problem)?;
//! println!("converged: {}", report.converged());
//! println!("min oxygen: {}", solver.concentration(0)?.min_value());
//! # Ok(())
//! # }
//! ```

pub mod boundary;
pub mod diffusivity;
pub mod error;
pub mod grid;
pub mod multigrid;
pub mod species;

pub use boundary::{
    BoundaryCondition, BoundaryLayer, BoundaryLayerField, DilatedBoundaryLayer, DomainBoundary,
    FaceCondition, Padding, UniformBoundaryLayer,
};
pub use diffusivity::{DiffusivityRatios, relative_diffusivity};
pub use error::{DivergenceReport, MultigridError, Result, SpeciesSnapshot};
pub use grid::{Cursor, GridConfig, GridDimensions, PaddedGrid};
pub use multigrid::{
    ConvergenceMonitor, GridHierarchy, MultigridSolver, Problem, SolveMethod, SolveReport,
    SolverSettings, StageReport,
};
pub use species::{
    FirstOrderDecay, MonodUptake, NoReaction, RateDerivative, RateLaw, Site, Solute, Species,
    ZeroOrderUptake,
};

/// Library version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
