//! Full multigrid solver with FAS V-cycles
//!
//! A solve resets every solute to its bulk concentration, relaxes the coarsest
//! grid, then walks up the hierarchy. Each stage interpolates the previous
//! stage's solution as initial guess and runs V-cycles until every solute's
//! residual at the stage level is within its truncation error.
//!
//! The coarse right-hand side follows the full approximation scheme:
//! `rhs_c = L_c(R u) - R(L u - rhs)`.

use super::convergence::{ConvergenceMonitor, compute_norm};
use super::hierarchy::GridHierarchy;
use super::smoother::{Operator, SoluteState, SoluteView, compute_operator, compute_residual, relax};
use super::transfer::{interpolate_boundary_layer, restrict_boundary_layer};
use crate::boundary::{BoundaryCondition, BoundaryLayerField, Padding};
use crate::diffusivity::{DiffusivityRatios, relative_diffusivity};
use crate::error::{MultigridError, Result};
use crate::grid::{GridConfig, PaddedGrid};
use crate::species::Species;
use serde::{Deserialize, Serialize};

/// Numeric tuning of a solve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    /// Relaxations before restricting on the way down
    pub pre_steps: usize,
    /// Relaxations after each coarse-grid correction
    pub post_steps: usize,
    /// Relaxations on the coarsest grid
    pub coarse_steps: usize,
    /// V-cycles allowed per stage
    pub max_v_cycles: usize,
    /// Fraction of the coarse FAS correction norm used as stopping threshold
    pub truncation_factor: f64,
    /// Sweeps of the relaxation-only reference path
    pub relax_only_steps: usize,
    pub diffusivity: DiffusivityRatios,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            pre_steps: 50,
            post_steps: 500,
            coarse_steps: 1000,
            max_v_cycles: 10,
            truncation_factor: 0.33,
            relax_only_steps: 5000,
            diffusivity: DiffusivityRatios::default(),
        }
    }
}

impl SolverSettings {
    pub fn with_smoothing_steps(mut self, pre_steps: usize, post_steps: usize) -> Self {
        self.pre_steps = pre_steps;
        self.post_steps = post_steps;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_v_cycles == 0 {
            return Err(MultigridError::InvalidSettings {
                reason: "max_v_cycles must be at least 1".to_string(),
            });
        }
        let factor = self.truncation_factor;
        if !(factor.is_finite() && factor > 0.0) {
            return Err(MultigridError::InvalidSettings {
                reason: format!("truncation_factor must be > 0, got {factor}"),
            });
        }
        self.diffusivity.validate()
    }

    /// Parse and validate settings from JSON; missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Self =
            serde_json::from_str(json).map_err(|e| MultigridError::InvalidSettings {
                reason: e.to_string(),
            })?;
        settings.validate()?;
        Ok(settings)
    }
}

/// Inputs of one solve
#[derive(Clone, Copy)]
pub struct Problem<'a> {
    pub species: &'a [&'a dyn Species],
    pub boundary: &'a dyn BoundaryCondition,
    pub boundary_layer: &'a BoundaryLayerField,
    /// Finest-level particulate occupancy (> 0 inside biofilm)
    pub particulates: &'a PaddedGrid,
}

/// How the fields were obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveMethod {
    VCycle,
    Relaxation,
}

/// Outcome of one nested-iteration stage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageReport {
    pub level: usize,
    pub v_cycles: usize,
    pub converged: bool,
    /// Final residual norm per solute
    pub residuals: Vec<f64>,
    pub truncation_errors: Vec<f64>,
}

/// Summary of a solve
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolveReport {
    pub method: SolveMethod,
    pub stages: Vec<StageReport>,
    /// Residual norm per solute at the finest level
    pub finest_residuals: Vec<f64>,
}

impl SolveReport {
    /// True when no stage ran out of V-cycles
    pub fn converged(&self) -> bool {
        self.stages.iter().all(|stage| stage.converged)
    }

    pub fn total_v_cycles(&self) -> usize {
        self.stages.iter().map(|stage| stage.v_cycles).sum()
    }
}

/// Buffers owned by one solute
#[derive(Debug, Clone)]
struct SoluteField {
    concentration: GridHierarchy,
    rhs: GridHierarchy,
    /// Coarse solution right after restriction
    stored: GridHierarchy,
    defect: GridHierarchy,
}

impl SoluteField {
    fn allocate(config: &GridConfig) -> Self {
        Self {
            concentration: GridHierarchy::allocate(config),
            rhs: GridHierarchy::allocate(config),
            stored: GridHierarchy::allocate(config),
            defect: GridHierarchy::allocate(config),
        }
    }
}

/// State shared by every step of one solve
struct Context<'a> {
    problem: &'a Problem<'a>,
    bulks: Vec<f64>,
    diffusivity: GridHierarchy,
}

impl<'a> Context<'a> {
    fn padding(&self, solute: usize) -> Padding<'a> {
        Padding::new(self.problem.boundary, self.bulks[solute])
    }

    fn operator(&self, level: usize) -> Operator<'_> {
        Operator::new(
            level,
            self.diffusivity.level(level),
            self.problem.boundary_layer.level(level),
        )
    }
}

/// Multigrid reaction-diffusion solver
#[derive(Debug, Clone)]
pub struct MultigridSolver {
    config: GridConfig,
    settings: SolverSettings,
    solutes: Vec<SoluteField>,
    monitor: ConvergenceMonitor,
}

impl MultigridSolver {
    pub fn new(config: GridConfig, settings: SolverSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            config,
            settings,
            solutes: Vec::new(),
            monitor: ConvergenceMonitor::new(0, config.order()),
        })
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    pub fn set_smoothing_steps(&mut self, pre_steps: usize, post_steps: usize) {
        self.settings.pre_steps = pre_steps;
        self.settings.post_steps = post_steps;
    }

    /// Number of solutes from the last solve
    pub fn num_solutes(&self) -> usize {
        self.solutes.len()
    }

    /// Finest-level concentration of `solute`
    pub fn concentration(&self, solute: usize) -> Result<&PaddedGrid> {
        Ok(self.hierarchy(solute)?.finest())
    }

    /// Every level of `solute`'s concentration
    pub fn hierarchy(&self, solute: usize) -> Result<&GridHierarchy> {
        self.solutes
            .get(solute)
            .map(|field| &field.concentration)
            .ok_or(MultigridError::UnknownSolute {
                index: solute,
                count: self.solutes.len(),
            })
    }

    /// Truncation-error bookkeeping of the last V-cycle solve
    pub fn monitor(&self) -> &ConvergenceMonitor {
        &self.monitor
    }

    /// Solve to steady state with nested iteration and V-cycles.
    pub fn solve(&mut self, problem: &Problem<'_>) -> Result<SolveReport> {
        let ctx = self.prepare(problem)?;
        let order = self.config.order();

        self.solve_coarsest(&ctx)?;

        let mut stages = Vec::with_capacity(order.saturating_sub(1));
        for outer in 1..order {
            for (s, field) in self.solutes.iter_mut().enumerate() {
                let (coarse, fine) = field.concentration.coarse_fine_mut(outer - 1);
                interpolate_boundary_layer(
                    coarse,
                    fine,
                    problem.boundary_layer.level(outer),
                    &ctx.padding(s),
                );
                field.rhs.level_mut(outer).data_mut().fill(0.0);
            }

            let mut stage = StageReport {
                level: outer,
                v_cycles: 0,
                converged: false,
                residuals: Vec::new(),
                truncation_errors: Vec::new(),
            };
            while stage.v_cycles < self.settings.max_v_cycles {
                self.v_cycle(&ctx, outer, outer)?;
                stage.v_cycles += 1;
                stage.residuals = self.residual_norms(&ctx, outer)?;
                stage.truncation_errors = self.monitor.truncation_errors(outer);
                log::debug!(
                    "stage {} v-cycle {}: residuals {:?}, truncation errors {:?}",
                    outer,
                    stage.v_cycles,
                    stage.residuals,
                    stage.truncation_errors
                );
                if self.monitor.is_converged(outer, &stage.residuals) {
                    stage.converged = true;
                    break;
                }
            }
            if !stage.converged {
                log::warn!(
                    "stage {} did not reach its truncation error after {} v-cycles",
                    outer,
                    stage.v_cycles
                );
            }
            stages.push(stage);
        }

        let finest_residuals = self.residual_norms(&ctx, self.config.finest_level())?;
        let report = SolveReport {
            method: SolveMethod::VCycle,
            stages,
            finest_residuals,
        };
        log::info!(
            "multigrid solve: {} solutes, {} stages, {} v-cycles",
            self.solutes.len(),
            report.stages.len(),
            report.total_v_cycles()
        );
        Ok(report)
    }

    /// Relax the finest level only, starting from bulk.
    ///
    /// Slow reference path; it shares the fixed point of [`Self::solve`].
    pub fn solve_by_relax(&mut self, problem: &Problem<'_>) -> Result<SolveReport> {
        let ctx = self.prepare(problem)?;
        let finest = self.config.finest_level();

        self.relax_level(&ctx, finest, self.settings.relax_only_steps)?;

        let finest_residuals = self.residual_norms(&ctx, finest)?;
        log::info!(
            "relaxation-only solve: {} solutes, {} sweeps",
            self.solutes.len(),
            self.settings.relax_only_steps
        );
        Ok(SolveReport {
            method: SolveMethod::Relaxation,
            stages: Vec::new(),
            finest_residuals,
        })
    }

    /// Check the problem, size buffers, build the diffusivity field and reset to bulk.
    fn prepare<'a>(&mut self, problem: &'a Problem<'a>) -> Result<Context<'a>> {
        if problem.species.is_empty() {
            return Err(MultigridError::NoSpecies);
        }
        let mut bulks = Vec::with_capacity(problem.species.len());
        for species in problem.species {
            let bulk = species
                .bulk_concentration()
                .filter(|b| b.is_finite() && *b >= 0.0)
                .ok_or_else(|| MultigridError::MissingBulkConcentration {
                    species: species.name().to_string(),
                })?;
            let diffusivity = species.diffusivity();
            if !(diffusivity.is_finite() && diffusivity >= 0.0) {
                return Err(MultigridError::InvalidDiffusivity {
                    species: species.name().to_string(),
                    value: diffusivity,
                });
            }
            species.check_shape(&self.config)?;
            bulks.push(bulk);
        }
        problem.boundary_layer.check_shape(&self.config)?;

        let diffusivity = relative_diffusivity(
            &self.config,
            problem.particulates,
            problem.boundary,
            &self.settings.diffusivity,
        )?;

        if self.solutes.len() != bulks.len() {
            self.solutes = (0..bulks.len())
                .map(|_| SoluteField::allocate(&self.config))
                .collect();
        }
        self.monitor = ConvergenceMonitor::new(bulks.len(), self.config.order());

        let ctx = Context {
            problem,
            bulks,
            diffusivity,
        };
        for (s, field) in self.solutes.iter_mut().enumerate() {
            let padding = ctx.padding(s);
            let zero = padding.with_bulk(0.0);
            field.concentration.reset(ctx.bulks[s], &padding);
            field.rhs.reset(0.0, &zero);
            field.stored.reset(0.0, &zero);
            field.defect.reset(0.0, &zero);
        }
        Ok(ctx)
    }

    fn v_cycle(&mut self, ctx: &Context<'_>, level: usize, outer: usize) -> Result<()> {
        if level == 0 {
            return self.solve_coarsest(ctx);
        }
        self.relax_level(ctx, level, self.settings.pre_steps)?;
        self.descend(ctx, level, outer)?;
        self.v_cycle(ctx, level - 1, outer)?;
        self.ascend(ctx, level)
    }

    /// Restart level 0 from bulk and relax it against its current rhs.
    fn solve_coarsest(&mut self, ctx: &Context<'_>) -> Result<()> {
        for (s, field) in self.solutes.iter_mut().enumerate() {
            let grid = field.concentration.coarsest_mut();
            grid.fill_interior(ctx.bulks[s]);
            ctx.padding(s).refresh(grid);
        }
        self.relax_level(ctx, 0, self.settings.coarse_steps)
    }

    /// Build the FAS problem at `level - 1` from the state at `level`.
    fn descend(&mut self, ctx: &Context<'_>, level: usize, outer: usize) -> Result<()> {
        let coarse = level - 1;

        // defect = L(u) - rhs at the fine level
        {
            let mut views = Vec::with_capacity(self.solutes.len());
            let mut rhs = Vec::with_capacity(self.solutes.len());
            let mut out = Vec::with_capacity(self.solutes.len());
            for (s, field) in self.solutes.iter_mut().enumerate() {
                views.push(SoluteView {
                    species: ctx.problem.species[s],
                    concentration: field.concentration.level(level),
                    padding: ctx.padding(s),
                });
                rhs.push(field.rhs.level(level));
                out.push(field.defect.level_mut(level));
            }
            compute_residual(&ctx.operator(level), &views, &rhs, &mut out)?;
        }

        let coarse_layer = ctx.problem.boundary_layer.level(coarse);
        for (s, field) in self.solutes.iter_mut().enumerate() {
            let padding = ctx.padding(s);
            let (u_coarse, u_fine) = field.concentration.coarse_fine_mut(coarse);
            restrict_boundary_layer(u_fine, u_coarse, coarse_layer, &padding);
            field.stored.level_mut(coarse).copy_from(u_coarse);

            let (d_coarse, d_fine) = field.defect.coarse_fine_mut(coarse);
            d_coarse.data_mut().fill(0.0);
            restrict_boundary_layer(d_fine, d_coarse, coarse_layer, &padding.with_bulk(0.0));
        }

        // rhs_c = L_c(R u) - R(defect)
        {
            let mut views = Vec::with_capacity(self.solutes.len());
            let mut out = Vec::with_capacity(self.solutes.len());
            for (s, field) in self.solutes.iter_mut().enumerate() {
                views.push(SoluteView {
                    species: ctx.problem.species[s],
                    concentration: field.concentration.level(coarse),
                    padding: ctx.padding(s),
                });
                out.push(field.rhs.level_mut(coarse));
            }
            compute_operator(&ctx.operator(coarse), &views, &mut out)?;
        }

        for (s, field) in self.solutes.iter_mut().enumerate() {
            let rhs = field.rhs.level_mut(coarse);
            rhs.subtract_interior(field.defect.level(coarse));
            if level == outer {
                let truncation = self.settings.truncation_factor * compute_norm(rhs);
                self.monitor.record_truncation(s, outer, truncation);
            }
        }
        Ok(())
    }

    /// Correct `level` with the coarse-grid change, then post-smooth.
    fn ascend(&mut self, ctx: &Context<'_>, level: usize) -> Result<()> {
        let coarse = level - 1;
        let fine_layer = ctx.problem.boundary_layer.level(level);

        for (s, field) in self.solutes.iter_mut().enumerate() {
            let padding = ctx.padding(s);
            let zero = padding.with_bulk(0.0);

            let (d_coarse, d_fine) = field.defect.coarse_fine_mut(coarse);
            d_coarse.copy_from(field.concentration.level(coarse));
            d_coarse.subtract_interior(field.stored.level(coarse));
            zero.refresh(d_coarse);

            d_fine.data_mut().fill(0.0);
            interpolate_boundary_layer(d_coarse, d_fine, fine_layer, &zero);

            let u = field.concentration.level_mut(level);
            u.add_interior(d_fine);
            u.clamp_negatives();
            padding.refresh(u);
        }

        self.relax_level(ctx, level, self.settings.post_steps)
    }

    fn relax_level(&mut self, ctx: &Context<'_>, level: usize, steps: usize) -> Result<()> {
        let op = ctx.operator(level);
        let mut states: Vec<SoluteState<'_>> = self
            .solutes
            .iter_mut()
            .enumerate()
            .map(|(s, field)| SoluteState {
                species: ctx.problem.species[s],
                concentration: field.concentration.level_mut(level),
                rhs: field.rhs.level(level),
                padding: ctx.padding(s),
            })
            .collect();

        for _ in 0..steps {
            relax(&op, &mut states)?;
        }
        Ok(())
    }

    /// Residual norm per solute at `level`; leaves the residual in the defect buffer.
    fn residual_norms(&mut self, ctx: &Context<'_>, level: usize) -> Result<Vec<f64>> {
        let mut views = Vec::with_capacity(self.solutes.len());
        let mut rhs = Vec::with_capacity(self.solutes.len());
        let mut out = Vec::with_capacity(self.solutes.len());
        for (s, field) in self.solutes.iter_mut().enumerate() {
            views.push(SoluteView {
                species: ctx.problem.species[s],
                concentration: field.concentration.level(level),
                padding: ctx.padding(s),
            });
            rhs.push(field.rhs.level(level));
            out.push(field.defect.level_mut(level));
        }
        compute_residual(&ctx.operator(level), &views, &rhs, &mut out)?;
        Ok(out.iter().map(|grid| compute_norm(grid)).collect())
    }
}
