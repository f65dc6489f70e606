//! Species capability consumed by the relaxation kernel
//!
//! A species contributes its name, diffusivity and bulk concentration, and
//! answers rate queries at a [`Site`]: the cell being relaxed together with the
//! current local concentration of every solute in the solve.

mod kinetics;

pub use kinetics::*;

use crate::error::Result;
use crate::grid::{Cursor, GridConfig};

/// Reaction rate and its derivative with respect to the species' own concentration
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RateDerivative {
    pub rate: f64,
    pub derivative: f64,
}

impl RateDerivative {
    pub fn new(rate: f64, derivative: f64) -> Self {
        Self { rate, derivative }
    }
}

/// The cell being processed and the local value of every solute there
#[derive(Debug, Clone, Copy)]
pub struct Site<'a> {
    cursor: Cursor,
    concentrations: &'a [f64],
}

impl<'a> Site<'a> {
    pub fn new(cursor: Cursor, concentrations: &'a [f64]) -> Self {
        Self {
            cursor,
            concentrations,
        }
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Local concentration of solute `index` (order of the solve's species list)
    ///
    /// Returns 0 for an index outside the solve.
    pub fn value(&self, index: usize) -> f64 {
        self.concentrations.get(index).copied().unwrap_or(0.0)
    }

    pub fn concentrations(&self) -> &'a [f64] {
        self.concentrations
    }
}

/// A solute taking part in a reaction-diffusion solve
pub trait Species {
    fn name(&self) -> &str;

    /// Diffusion coefficient in liquid
    fn diffusivity(&self) -> f64;

    /// Concentration imposed at bulk faces; `None` until set.
    fn bulk_concentration(&self) -> Option<f64>;

    /// Evaluate the net production rate and its derivative at `site`.
    fn update_rate_and_derivative(&self, site: &Site<'_>, out: &mut RateDerivative);

    /// Net production rate at `site`
    fn rate(&self, site: &Site<'_>) -> f64 {
        let mut out = RateDerivative::default();
        self.update_rate_and_derivative(site, &mut out);
        out.rate
    }

    /// Reject per-cell data (biomass, ...) that does not fit the solve's grid.
    fn check_shape(&self, _config: &GridConfig) -> Result<()> {
        Ok(())
    }
}

/// Species composed from a name, transport constants and a rate law
#[derive(Debug, Clone)]
pub struct Solute<K> {
    name: String,
    diffusivity: f64,
    bulk: Option<f64>,
    kinetics: K,
}

impl<K: RateLaw> Solute<K> {
    pub fn new(name: impl Into<String>, diffusivity: f64, kinetics: K) -> Self {
        Self {
            name: name.into(),
            diffusivity,
            bulk: None,
            kinetics,
        }
    }

    pub fn with_bulk(mut self, bulk: f64) -> Self {
        self.bulk = Some(bulk);
        self
    }

    /// Update the bulk concentration between solves.
    pub fn set_bulk(&mut self, bulk: f64) {
        self.bulk = Some(bulk);
    }

    pub fn kinetics(&self) -> &K {
        &self.kinetics
    }
}

impl<K: RateLaw> Species for Solute<K> {
    fn name(&self) -> &str {
        &self.name
    }

    fn diffusivity(&self) -> f64 {
        self.diffusivity
    }

    fn bulk_concentration(&self) -> Option<f64> {
        self.bulk
    }

    fn update_rate_and_derivative(&self, site: &Site<'_>, out: &mut RateDerivative) {
        *out = self.kinetics.evaluate(site);
    }

    fn check_shape(&self, config: &GridConfig) -> Result<()> {
        self.kinetics.check_shape(config)
    }
}
