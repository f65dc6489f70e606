//! Geometric multigrid for steady reaction-diffusion
//!
//! Nested grid hierarchies, fixed-stencil transfer operators, red-black Newton
//! relaxation and a full multigrid driver with FAS V-cycles.

mod convergence;
mod cycle;
mod hierarchy;
mod smoother;
mod transfer;

pub use convergence::*;
pub use cycle::*;
pub use hierarchy::*;
pub use smoother::*;
pub use transfer::*;
