//! Rate laws
//!
//! Rates are net production (negative for consumption). Derivatives are taken
//! with respect to the concentration of the solute the law is attached to.

use super::{RateDerivative, Site};
use crate::error::Result;
use crate::grid::GridConfig;
use crate::multigrid::GridHierarchy;
use std::sync::Arc;

/// Reaction kinetics evaluated at a single cell
pub trait RateLaw {
    fn evaluate(&self, site: &Site<'_>) -> RateDerivative;

    /// Check that any field this law reads matches the solve's grid.
    fn check_shape(&self, _config: &GridConfig) -> Result<()> {
        Ok(())
    }
}

impl<F> RateLaw for F
where
    F: Fn(&Site<'_>) -> RateDerivative,
{
    fn evaluate(&self, site: &Site<'_>) -> RateDerivative {
        self(site)
    }
}

/// Inert solute
#[derive(Debug, Clone, Copy, Default)]
pub struct NoReaction;

impl RateLaw for NoReaction {
    fn evaluate(&self, _site: &Site<'_>) -> RateDerivative {
        RateDerivative::default()
    }
}

/// `rate = -k C` everywhere in the domain
#[derive(Debug, Clone, Copy)]
pub struct FirstOrderDecay {
    /// Index of the decaying solute
    pub solute: usize,
    pub rate_constant: f64,
}

impl FirstOrderDecay {
    pub fn new(solute: usize, rate_constant: f64) -> Self {
        Self {
            solute,
            rate_constant,
        }
    }
}

impl RateLaw for FirstOrderDecay {
    fn evaluate(&self, site: &Site<'_>) -> RateDerivative {
        RateDerivative::new(
            -self.rate_constant * site.value(self.solute),
            -self.rate_constant,
        )
    }
}

/// Constant uptake per unit biomass: `rate = -q X`
#[derive(Debug, Clone)]
pub struct ZeroOrderUptake {
    pub uptake_rate: f64,
    pub biomass: Arc<GridHierarchy>,
}

impl ZeroOrderUptake {
    pub fn new(uptake_rate: f64, biomass: Arc<GridHierarchy>) -> Self {
        Self {
            uptake_rate,
            biomass,
        }
    }
}

impl RateLaw for ZeroOrderUptake {
    fn evaluate(&self, site: &Site<'_>) -> RateDerivative {
        RateDerivative::new(-self.uptake_rate * biomass_at(&self.biomass, site), 0.0)
    }

    fn check_shape(&self, config: &GridConfig) -> Result<()> {
        self.biomass.check_shape(config)
    }
}

/// One saturation factor `C / (K + C)` of a Monod expression
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonodTerm {
    pub solute: usize,
    pub half_saturation: f64,
}

impl MonodTerm {
    pub fn new(solute: usize, half_saturation: f64) -> Self {
        Self {
            solute,
            half_saturation,
        }
    }

    fn factor(&self, concentration: f64) -> f64 {
        concentration / (self.half_saturation + concentration)
    }

    fn slope(&self, concentration: f64) -> f64 {
        let denominator = self.half_saturation + concentration;
        self.half_saturation / (denominator * denominator)
    }
}

/// Multi-substrate Monod consumption:
/// `rate = -q_max * X * Π C_s / (K_s + C_s)`
///
/// `X` is read from the biomass hierarchy at the site's level, so coarse grids
/// see restricted biomass.
#[derive(Debug, Clone)]
pub struct MonodUptake {
    /// Solute this law is attached to
    pub solute: usize,
    pub max_rate: f64,
    pub limitations: Vec<MonodTerm>,
    pub biomass: Arc<GridHierarchy>,
}

impl MonodUptake {
    pub fn new(solute: usize, max_rate: f64, biomass: Arc<GridHierarchy>) -> Self {
        Self {
            solute,
            max_rate,
            limitations: Vec::new(),
            biomass,
        }
    }

    /// Add a saturation factor for `solute`.
    pub fn limited_by(mut self, solute: usize, half_saturation: f64) -> Self {
        self.limitations.push(MonodTerm::new(solute, half_saturation));
        self
    }
}

impl RateLaw for MonodUptake {
    fn evaluate(&self, site: &Site<'_>) -> RateDerivative {
        let scale = -self.max_rate * biomass_at(&self.biomass, site);
        if scale == 0.0 {
            return RateDerivative::default();
        }

        let mut product = 1.0;
        // Product rule over the factors that depend on our own solute
        let mut derivative = 0.0;
        for term in &self.limitations {
            let c = site.value(term.solute).max(0.0);
            let (f, df) = (term.factor(c), term.slope(c));
            let own = if term.solute == self.solute {
                product * df
            } else {
                0.0
            };
            derivative = derivative * f + own;
            product *= f;
        }

        RateDerivative::new(scale * product, scale * derivative)
    }

    fn check_shape(&self, config: &GridConfig) -> Result<()> {
        self.biomass.check_shape(config)
    }
}

fn biomass_at(biomass: &GridHierarchy, site: &Site<'_>) -> f64 {
    let cursor = site.cursor();
    biomass.level(cursor.level).get(cursor.i, cursor.j, cursor.k)
}
