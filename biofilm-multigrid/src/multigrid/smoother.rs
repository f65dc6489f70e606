//! Red-black Newton Gauss-Seidel relaxation
//!
//! Relaxes the steady reaction-diffusion equation
//! `div(D grad C) + r(C) = rhs` for every solute at once. Each active cell gets
//! one Newton step on the local discrete operator (`lop`) using its derivative
//! (`dlop`); the rate law is queried with the live local concentrations of all
//! solutes, so coupled kinetics see values updated earlier in the same pass.

use crate::boundary::{Padding, is_active};
use crate::error::{DivergenceReport, MultigridError, Result, SpeciesSnapshot};
use crate::grid::{Cursor, PaddedGrid};
use crate::species::{RateDerivative, Site, Species};

/// Level-wide coefficients shared by every solute
#[derive(Debug, Clone, Copy)]
pub struct Operator<'a> {
    pub level: usize,
    pub relative_diffusivity: &'a PaddedGrid,
    pub boundary_layer: &'a PaddedGrid,
}

impl<'a> Operator<'a> {
    pub fn new(
        level: usize,
        relative_diffusivity: &'a PaddedGrid,
        boundary_layer: &'a PaddedGrid,
    ) -> Self {
        Self {
            level,
            relative_diffusivity,
            boundary_layer,
        }
    }

    fn half_inv_h2(&self) -> f64 {
        let h = self.relative_diffusivity.spacing();
        0.5 / (h * h)
    }

    /// Diffusive part of `lop` and `dlop` at `(i, j, k)`
    fn diffusion(
        &self,
        grid: &PaddedGrid,
        diffusivity: f64,
        i: usize,
        j: usize,
        k: usize,
    ) -> (f64, f64) {
        let rel = self.relative_diffusivity;
        let u = grid.get(i, j, k);
        let d_self = diffusivity * rel.get(i, j, k);

        let mut flux = 0.0;
        let mut d_faces = 0.0;
        for (a, b, c) in [
            (i + 1, j, k),
            (i - 1, j, k),
            (i, j + 1, k),
            (i, j - 1, k),
            (i, j, k + 1),
            (i, j, k - 1),
        ] {
            let d_face = diffusivity * rel.get(a, b, c);
            flux += (d_face + d_self) * (grid.get(a, b, c) - u);
            d_faces += d_face;
        }

        let scale = self.half_inv_h2();
        (flux * scale, -scale * (6.0 * d_self + d_faces))
    }
}

/// A solute being relaxed at one level
pub struct SoluteState<'a> {
    pub species: &'a dyn Species,
    pub concentration: &'a mut PaddedGrid,
    pub rhs: &'a PaddedGrid,
    pub padding: Padding<'a>,
}

/// Read-only view of a solute at one level
#[derive(Clone, Copy)]
pub struct SoluteView<'a> {
    pub species: &'a dyn Species,
    pub concentration: &'a PaddedGrid,
    pub padding: Padding<'a>,
}

/// One red-black sweep over every active cell of the level.
///
/// Padding of every solute is refreshed after each colour.
pub fn relax(op: &Operator<'_>, solutes: &mut [SoluteState<'_>]) -> Result<()> {
    let [ni, nj, nk] = op.boundary_layer.shape();
    let mut local = vec![0.0; solutes.len()];
    let mut rates = vec![RateDerivative::default(); solutes.len()];

    for color in 0..2 {
        for k in 1..=nk {
            for j in 1..=nj {
                let start = if (1 + j + k) % 2 == color { 1 } else { 2 };
                for i in (start..=ni).step_by(2) {
                    if !is_active(op.boundary_layer.get(i, j, k)) {
                        continue;
                    }
                    for (value, state) in local.iter_mut().zip(solutes.iter()) {
                        *value = state.concentration.get(i, j, k);
                    }
                    let cursor = Cursor::new(op.level, i, j, k);

                    for s in 0..solutes.len() {
                        let state = &mut solutes[s];
                        let site = Site::new(cursor, &local);
                        state.species.update_rate_and_derivative(&site, &mut rates[s]);
                        let diffusivity = state.species.diffusivity();
                        let (flux, jacobian) =
                            op.diffusion(state.concentration, diffusivity, i, j, k);
                        let lop = flux + rates[s].rate;
                        let dlop = jacobian + rates[s].derivative;

                        if lop.is_nan() || dlop.is_nan() {
                            let views: Vec<_> = solutes
                                .iter()
                                .map(|st| (st.species, st.padding.bulk()))
                                .collect();
                            return Err(divergence(cursor, s, lop, dlop, &views, &local, &rates));
                        }
                        if dlop == 0.0 {
                            continue;
                        }

                        let rhs = state.rhs.get(i, j, k);
                        let updated = (local[s] - (lop - rhs) / dlop).max(0.0);
                        state.concentration.set(i, j, k, updated);
                        local[s] = updated;
                    }
                }
            }
        }

        for state in solutes.iter_mut() {
            state.padding.refresh(state.concentration);
        }
    }
    Ok(())
}

/// Evaluate `lop` for every solute into `out`.
///
/// Frozen cells get zero. Padding of `out` follows each solute's boundary with
/// a zero bulk value.
pub fn compute_operator(
    op: &Operator<'_>,
    solutes: &[SoluteView<'_>],
    out: &mut [&mut PaddedGrid],
) -> Result<()> {
    evaluate(op, solutes, None, out)
}

/// Evaluate the residual `lop - rhs` for every solute into `out`.
pub fn compute_residual(
    op: &Operator<'_>,
    solutes: &[SoluteView<'_>],
    rhs: &[&PaddedGrid],
    out: &mut [&mut PaddedGrid],
) -> Result<()> {
    evaluate(op, solutes, Some(rhs), out)
}

fn evaluate(
    op: &Operator<'_>,
    solutes: &[SoluteView<'_>],
    rhs: Option<&[&PaddedGrid]>,
    out: &mut [&mut PaddedGrid],
) -> Result<()> {
    debug_assert_eq!(solutes.len(), out.len());
    let mut local = vec![0.0; solutes.len()];
    let mut rates = vec![RateDerivative::default(); solutes.len()];

    for grid in out.iter_mut() {
        grid.data_mut().fill(0.0);
    }

    for [i, j, k] in op.boundary_layer.interior_cells() {
        if !is_active(op.boundary_layer.get(i, j, k)) {
            continue;
        }
        for (value, view) in local.iter_mut().zip(solutes) {
            *value = view.concentration.get(i, j, k);
        }
        let cursor = Cursor::new(op.level, i, j, k);
        let site = Site::new(cursor, &local);

        for (s, view) in solutes.iter().enumerate() {
            view.species.update_rate_and_derivative(&site, &mut rates[s]);
            let diffusivity = view.species.diffusivity();
            let (flux, jacobian) = op.diffusion(view.concentration, diffusivity, i, j, k);
            let lop = flux + rates[s].rate;
            if lop.is_nan() {
                let views: Vec<_> = solutes
                    .iter()
                    .map(|v| (v.species, v.padding.bulk()))
                    .collect();
                let dlop = jacobian + rates[s].derivative;
                return Err(divergence(cursor, s, lop, dlop, &views, &local, &rates));
            }
            let value = match rhs {
                Some(rhs) => lop - rhs[s].get(i, j, k),
                None => lop,
            };
            out[s].set(i, j, k, value);
        }
    }

    for (grid, view) in out.iter_mut().zip(solutes) {
        view.padding.with_bulk(0.0).refresh(grid);
    }
    Ok(())
}

fn divergence(
    cursor: Cursor,
    solute: usize,
    lop: f64,
    dlop: f64,
    species: &[(&dyn Species, f64)],
    local: &[f64],
    rates: &[RateDerivative],
) -> MultigridError {
    let snapshot = species
        .iter()
        .zip(local.iter().zip(rates))
        .map(|(&(sp, bulk), (&value, rate))| SpeciesSnapshot {
            name: sp.name().to_string(),
            local: value,
            bulk,
            rate: rate.rate,
            derivative: rate.derivative,
        })
        .collect();
    let report = DivergenceReport {
        level: cursor.level,
        cell: cursor.cell(),
        species: species[solute].0.name().to_string(),
        lop,
        dlop,
        snapshot,
    };
    log::error!("{}", report);
    MultigridError::NumericDivergence(Box::new(report))
}
