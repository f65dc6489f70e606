//! Transfer operators for multigrid
//!
//! Restriction (fine-to-coarse) uses a fixed seven-point stencil: half the
//! coincident fine value plus `1/12` of each face neighbour (`1/8` on a 2D
//! grid, where only four neighbours exist). Interpolation (coarse-to-fine)
//! copies coincident points then fills the rest by successive averaging along
//! the vertical, horizontal and depth axes.
//!
//! Fine cell `2c - 1` coincides with coarse cell `c` (padded indices).

use crate::boundary::{Padding, is_active};
use crate::grid::PaddedGrid;

/// Restrict `fine` into every interior cell of `coarse`, then refresh its padding.
pub fn restrict(fine: &PaddedGrid, coarse: &mut PaddedGrid, padding: &Padding<'_>) {
    restrict_gated(fine, coarse, None);
    padding.refresh(coarse);
}

/// Restrict only into coarse cells the boundary layer marks active.
///
/// Frozen cells keep their previous value.
pub fn restrict_boundary_layer(
    fine: &PaddedGrid,
    coarse: &mut PaddedGrid,
    coarse_layer: &PaddedGrid,
    padding: &Padding<'_>,
) {
    restrict_gated(fine, coarse, Some(coarse_layer));
    padding.refresh(coarse);
}

/// Interpolate `coarse` into every interior cell of `fine`, then refresh its padding.
pub fn interpolate(coarse: &PaddedGrid, fine: &mut PaddedGrid, padding: &Padding<'_>) {
    interpolate_gated(coarse, fine, None);
    padding.refresh(fine);
}

/// Interpolate only into fine cells the boundary layer marks active.
///
/// Frozen cells keep their previous value and are still read as neighbours.
pub fn interpolate_boundary_layer(
    coarse: &PaddedGrid,
    fine: &mut PaddedGrid,
    fine_layer: &PaddedGrid,
    padding: &Padding<'_>,
) {
    interpolate_gated(coarse, fine, Some(fine_layer));
    padding.refresh(fine);
}

fn restrict_gated(fine: &PaddedGrid, coarse: &mut PaddedGrid, gate: Option<&PaddedGrid>) {
    let [ni, nj, nk] = coarse.shape();
    let two_d = fine.is_2d();
    debug_assert_eq!(fine.shape()[0], 2 * ni - 1);
    debug_assert_eq!(fine.shape()[1], 2 * nj - 1);

    let weight = if two_d { 1.0 / 8.0 } else { 1.0 / 12.0 };

    for kc in 1..=nk {
        let k = if two_d { 1 } else { 2 * kc - 1 };
        for jc in 1..=nj {
            let j = 2 * jc - 1;
            for ic in 1..=ni {
                if let Some(layer) = gate {
                    if !is_active(layer.get(ic, jc, kc)) {
                        continue;
                    }
                }
                let i = 2 * ic - 1;

                let mut faces = fine.get(i + 1, j, k)
                    + fine.get(i - 1, j, k)
                    + fine.get(i, j + 1, k)
                    + fine.get(i, j - 1, k);
                if !two_d {
                    faces += fine.get(i, j, k + 1) + fine.get(i, j, k - 1);
                }
                coarse.set(ic, jc, kc, 0.5 * fine.get(i, j, k) + weight * faces);
            }
        }
    }
}

fn interpolate_gated(coarse: &PaddedGrid, fine: &mut PaddedGrid, gate: Option<&PaddedGrid>) {
    let [ni, nj, nk] = fine.shape();
    let [ci, cj, ck] = coarse.shape();
    let two_d = fine.is_2d();
    debug_assert_eq!(ni, 2 * ci - 1);
    debug_assert_eq!(nj, 2 * cj - 1);

    let open = |i, j, k| gate.is_none_or(|layer| is_active(layer.get(i, j, k)));
    // Depth planes holding coincident points
    let coincident_k: Vec<usize> = if two_d {
        vec![1]
    } else {
        (1..=nk).step_by(2).collect()
    };

    // Coincident points
    for kc in 1..=ck {
        let k = if two_d { 1 } else { 2 * kc - 1 };
        for jc in 1..=cj {
            for ic in 1..=ci {
                let (i, j) = (2 * ic - 1, 2 * jc - 1);
                if open(i, j, k) {
                    fine.set(i, j, k, coarse.get(ic, jc, kc));
                }
            }
        }
    }

    // Vertical pass: between coincident points along i
    for &k in &coincident_k {
        for j in (1..=nj).step_by(2) {
            for i in (2..ni).step_by(2) {
                if open(i, j, k) {
                    let value = 0.5 * (fine.get(i - 1, j, k) + fine.get(i + 1, j, k));
                    fine.set(i, j, k, value);
                }
            }
        }
    }

    // Horizontal pass: fills every remaining cell of the coincident planes
    for &k in &coincident_k {
        for j in (2..nj).step_by(2) {
            for i in 1..=ni {
                if open(i, j, k) {
                    let value = 0.5 * (fine.get(i, j - 1, k) + fine.get(i, j + 1, k));
                    fine.set(i, j, k, value);
                }
            }
        }
    }

    // Depth pass: planes between coincident planes
    if !two_d {
        for k in (2..nk).step_by(2) {
            for j in 1..=nj {
                for i in 1..=ni {
                    if open(i, j, k) {
                        let value = 0.5 * (fine.get(i, j, k - 1) + fine.get(i, j, k + 1));
                        fine.set(i, j, k, value);
                    }
                }
            }
        }
    }
}
