//! Validation of the multigrid solver against analytical and reference solutions
//!
//! Covers the trivial bulk fixed point, a first-order decay slab with a known
//! closed form, agreement with the relaxation-only path, coupled Monod uptake
//! inside a biofilm, boundary-layer freezing and the failure modes of a solve.

use approx::assert_abs_diff_eq;
use biofilm_multigrid::{
    BoundaryLayer, BoundaryLayerField, DilatedBoundaryLayer, DomainBoundary, FaceCondition,
    FirstOrderDecay, GridConfig, GridHierarchy, MonodUptake, MultigridSolver, NoReaction,
    PaddedGrid, Padding, Problem, RateDerivative, Site, Solute, SolveMethod, SolverSettings,
    Species,
};
use std::sync::Arc;

/// Substratum at the bottom, bulk liquid on top, closed sides
fn slab_boundary() -> DomainBoundary {
    let mut boundary = DomainBoundary::all_zero_flux();
    boundary.i_high = FaceCondition::Bulk;
    boundary
}

/// Particulates filling every row up to `height`
fn biofilm_rows(config: &GridConfig, height: usize, density: f64) -> PaddedGrid {
    PaddedGrid::from_fn(config.finest_shape(), config.resolution(), |[i, _, _]| {
        if i <= height { density } else { 0.0 }
    })
}

/// Test the trivial fixed point: no reaction and bulk everywhere
#[test]
fn test_bulk_fixed_point_2d() {
    let config = GridConfig::new(9, 9, 1, 1.0).unwrap();
    assert_eq!(config.order(), 3);

    let boundary = DomainBoundary::biofilm();
    let layer = BoundaryLayerField::all_active(&config);
    let particulates = PaddedGrid::new(config.finest_shape(), 1.0);
    let solute = Solute::new("inert", 3.0, NoReaction).with_bulk(1.0);
    let species: [&dyn Species; 1] = [&solute];
    let problem = Problem {
        species: &species,
        boundary: &boundary,
        boundary_layer: &layer,
        particulates: &particulates,
    };

    let mut solver = MultigridSolver::new(config, SolverSettings::default()).unwrap();
    let report = solver.solve(&problem).unwrap();

    let field = solver.concentration(0).unwrap();
    for [i, j, k] in field.interior_cells() {
        assert_abs_diff_eq!(field.get(i, j, k), 1.0, epsilon = 1e-12);
    }
    assert!(report.converged());
    assert_eq!(report.stages.len(), 2);
}

/// Test first-order decay in a slab against the closed form
///
/// D C'' = k C with C'(0) = 0 and C(L) = C0 gives
/// C(x) = C0 cosh(a x) / cosh(a L), a = sqrt(k / D).
/// Cell i sits at x = (i - 1/2) h and the bulk ghost at x = L = (n + 1/2) h.
#[test]
fn test_first_order_decay_profile() {
    let n = 17;
    let h = 1.0;
    let config = GridConfig::new(n, n, 1, h).unwrap();
    let length = (n as f64 + 0.5) * h;
    let diffusivity = 1.0;
    let rate_constant = 4.0 * diffusivity / (length * length);
    let bulk = 2.0;

    let boundary = slab_boundary();
    let layer = BoundaryLayerField::all_active(&config);
    let particulates = PaddedGrid::new(config.finest_shape(), h);
    let decay = FirstOrderDecay::new(0, rate_constant);
    let solute = Solute::new("decaying", diffusivity, decay).with_bulk(bulk);
    let species: [&dyn Species; 1] = [&solute];
    let problem = Problem {
        species: &species,
        boundary: &boundary,
        boundary_layer: &layer,
        particulates: &particulates,
    };

    let mut solver = MultigridSolver::new(config, SolverSettings::default()).unwrap();
    solver.solve(&problem).unwrap();
    let field = solver.concentration(0).unwrap();

    let alpha = (rate_constant / diffusivity).sqrt();
    for i in 1..=n {
        let x = (i as f64 - 0.5) * h;
        let exact = bulk * (alpha * x).cosh() / (alpha * length).cosh();
        for j in [1, 9, 17] {
            assert_abs_diff_eq!(field.get(i, j, 1), exact, epsilon = 0.02);
        }
    }
    // Deepest point is well below bulk
    assert!(field.get(1, 9, 1) < 0.3 * bulk);
}

/// Regression: the V-cycle path and plain relaxation share the same fixed point
#[test]
fn test_v_cycle_matches_relaxation() {
    let config = GridConfig::new(17, 17, 1, 1.0).unwrap();
    let boundary = DomainBoundary::biofilm();
    let layer = BoundaryLayerField::all_active(&config);
    let particulates = PaddedGrid::new(config.finest_shape(), 1.0);
    let solute = Solute::new("decaying", 1.0, FirstOrderDecay::new(0, 0.05)).with_bulk(1.0);
    let species: [&dyn Species; 1] = [&solute];
    let problem = Problem {
        species: &species,
        boundary: &boundary,
        boundary_layer: &layer,
        particulates: &particulates,
    };

    let mut multigrid = MultigridSolver::new(config, SolverSettings::default()).unwrap();
    let report = multigrid.solve(&problem).unwrap();
    assert_eq!(report.method, SolveMethod::VCycle);

    let mut relaxation = MultigridSolver::new(config, SolverSettings::default()).unwrap();
    let reference = relaxation.solve_by_relax(&problem).unwrap();
    assert_eq!(reference.method, SolveMethod::Relaxation);
    assert!(reference.stages.is_empty());

    let a = multigrid.concentration(0).unwrap();
    let b = relaxation.concentration(0).unwrap();
    for [i, j, k] in a.interior_cells() {
        assert_abs_diff_eq!(a.get(i, j, k), b.get(i, j, k), epsilon = 1e-2);
    }
}

/// Two solutes consumed together inside a biofilm decrease with depth
#[test]
fn test_coupled_monod_uptake_is_monotone() {
    let config = GridConfig::new(17, 17, 1, 1.0).unwrap();
    let boundary = DomainBoundary::biofilm();
    let layer = BoundaryLayerField::all_active(&config);
    let height = 8;
    let particulates = biofilm_rows(&config, height, 1.0);
    let padding = Padding::new(&boundary, 0.0);
    let biomass = GridHierarchy::restrict_from_finest(&config, &particulates, &padding).unwrap();
    let biomass = Arc::new(biomass);

    let substrate_uptake = MonodUptake::new(0, 0.01, Arc::clone(&biomass))
        .limited_by(0, 0.2)
        .limited_by(1, 0.1);
    let oxygen_uptake = MonodUptake::new(1, 0.005, Arc::clone(&biomass))
        .limited_by(0, 0.2)
        .limited_by(1, 0.1);
    let substrate = Solute::new("substrate", 1.0, substrate_uptake).with_bulk(1.0);
    let oxygen = Solute::new("oxygen", 1.5, oxygen_uptake).with_bulk(0.5);
    let species: [&dyn Species; 2] = [&substrate, &oxygen];
    let problem = Problem {
        species: &species,
        boundary: &boundary,
        boundary_layer: &layer,
        particulates: &particulates,
    };

    let mut solver = MultigridSolver::new(config, SolverSettings::default()).unwrap();
    let report = solver.solve(&problem).unwrap();
    assert_eq!(report.finest_residuals.len(), 2);

    for (s, bulk) in [(0, 1.0), (1, 0.5)] {
        let field = solver.concentration(s).unwrap();
        assert!(field.min_value() >= 0.0);
        assert!(field.max_value() <= bulk + 1e-4);
        for j in [1, 8, 17] {
            for i in 1..height {
                let (lower, upper) = (field.get(i, j, 1), field.get(i + 1, j, 1));
                assert!(
                    lower <= upper + 1e-4,
                    "solute {s} not monotone at ({i}, {j}): {lower} > {upper}"
                );
            }
        }
        // Consumption is visible at the substratum
        assert!(field.get(1, 8, 1) < bulk);
    }
}

/// Cells outside the boundary layer stay exactly at bulk
#[test]
fn test_frozen_cells_keep_bulk() {
    let config = GridConfig::new(17, 17, 1, 1.0).unwrap();
    let boundary = DomainBoundary::biofilm();
    let particulates = biofilm_rows(&config, 3, 1.0);
    let layer = DilatedBoundaryLayer::new(3.0)
        .recompute(&config, &particulates, &boundary)
        .unwrap();
    let solute = Solute::new("decaying", 1.0, FirstOrderDecay::new(0, 0.05)).with_bulk(0.8);
    let species: [&dyn Species; 1] = [&solute];
    let problem = Problem {
        species: &species,
        boundary: &boundary,
        boundary_layer: &layer,
        particulates: &particulates,
    };

    let mut solver = MultigridSolver::new(config, SolverSettings::default()).unwrap();
    solver.solve(&problem).unwrap();
    let field = solver.concentration(0).unwrap();

    let finest = config.finest_level();
    for [i, j, k] in field.interior_cells() {
        if layer.is_active(finest, i, j, k) {
            assert!(field.get(i, j, k) <= 0.8 + 1e-6);
        } else {
            assert_eq!(field.get(i, j, k), 0.8);
        }
    }
    assert!(!layer.is_active(finest, 10, 5, 1));
    assert!(field.get(1, 5, 1) < 0.8);
}

/// A small 3D problem stays within [0, bulk] and dips at the centre
#[test]
fn test_decay_in_closed_cube() {
    let config = GridConfig::new(9, 9, 9, 1.0).unwrap();
    assert!(!config.is_2d());
    let boundary = DomainBoundary::all_bulk();
    let layer = BoundaryLayerField::all_active(&config);
    let particulates = PaddedGrid::new(config.finest_shape(), 1.0);
    let solute = Solute::new("decaying", 1.0, FirstOrderDecay::new(0, 0.1)).with_bulk(1.0);
    let species: [&dyn Species; 1] = [&solute];
    let problem = Problem {
        species: &species,
        boundary: &boundary,
        boundary_layer: &layer,
        particulates: &particulates,
    };

    let settings = SolverSettings::default().with_smoothing_steps(20, 100);
    let mut solver = MultigridSolver::new(config, settings).unwrap();
    solver.solve(&problem).unwrap();
    let field = solver.concentration(0).unwrap();

    assert!(field.min_value() >= 0.0);
    assert!(field.max_value() <= 1.0);
    assert!(field.get(5, 5, 5) < field.get(1, 5, 5));
    assert!(field.get(1, 5, 5) < field.get(1, 1, 1));
    assert_abs_diff_eq!(field.get(5, 5, 5), field.min_value(), epsilon = 1e-3);
}

/// NaN from a rate law aborts the solve with a diagnostic dump
#[test]
fn test_nan_rate_aborts_solve() {
    let config = GridConfig::new(9, 9, 1, 1.0).unwrap();
    let boundary = DomainBoundary::biofilm();
    let layer = BoundaryLayerField::all_active(&config);
    let particulates = PaddedGrid::new(config.finest_shape(), 1.0);
    let healthy = Solute::new("healthy", 1.0, NoReaction).with_bulk(0.3);
    let broken = Solute::new("broken", 1.0, |site: &Site<'_>| {
        RateDerivative::new(site.value(1) * f64::NAN, 0.0)
    })
    .with_bulk(2.0);
    let species: [&dyn Species; 2] = [&healthy, &broken];
    let problem = Problem {
        species: &species,
        boundary: &boundary,
        boundary_layer: &layer,
        particulates: &particulates,
    };

    let mut solver = MultigridSolver::new(config, SolverSettings::default()).unwrap();
    let err = solver.solve(&problem).unwrap_err();
    assert!(err.is_numeric_divergence());

    let report = err.divergence_report().unwrap();
    assert_eq!(report.level, 0);
    assert_eq!(report.species, "broken");
    assert_eq!(report.snapshot.len(), 2);
    assert_eq!(report.snapshot[0].name, "healthy");
    assert_abs_diff_eq!(report.snapshot[0].bulk, 0.3);
    assert_abs_diff_eq!(report.snapshot[1].local, 2.0);
    assert!(err.to_string().contains("broken"));
}

/// API misuse is reported before any work is done
#[test]
fn test_precondition_violations() {
    let config = GridConfig::new(9, 9, 1, 1.0).unwrap();
    let boundary = DomainBoundary::biofilm();
    let layer = BoundaryLayerField::all_active(&config);
    let particulates = PaddedGrid::new(config.finest_shape(), 1.0);
    let mut solver = MultigridSolver::new(config, SolverSettings::default()).unwrap();

    let none: [&dyn Species; 0] = [];
    let problem = Problem {
        species: &none,
        boundary: &boundary,
        boundary_layer: &layer,
        particulates: &particulates,
    };
    let err = solver.solve(&problem).unwrap_err();
    assert!(err.is_precondition_violation());

    let unset = Solute::new("unset", 1.0, NoReaction);
    let species: [&dyn Species; 1] = [&unset];
    let problem = Problem {
        species: &species,
        ..problem
    };
    let err = solver.solve_by_relax(&problem).unwrap_err();
    assert!(err.is_precondition_violation());
    assert!(err.to_string().contains("unset"));

    let negative = Solute::new("negative", -1.0, NoReaction).with_bulk(1.0);
    let species: [&dyn Species; 1] = [&negative];
    let problem = Problem {
        species: &species,
        ..problem
    };
    let err = solver.solve(&problem).unwrap_err();
    assert!(err.is_precondition_violation());

    let valid = Solute::new("valid", 1.0, NoReaction).with_bulk(1.0);
    let species: [&dyn Species; 1] = [&valid];
    let wrong_particulates = PaddedGrid::new([17, 17, 1], 1.0);
    let problem = Problem {
        species: &species,
        particulates: &wrong_particulates,
        ..problem
    };
    let err = solver.solve(&problem).unwrap_err();
    assert!(err.is_configuration_error());

    let other = GridConfig::new(17, 17, 1, 1.0).unwrap();
    let wrong_layer = BoundaryLayerField::all_active(&other);
    let problem = Problem {
        species: &species,
        boundary: &boundary,
        boundary_layer: &wrong_layer,
        particulates: &particulates,
    };
    let err = solver.solve(&problem).unwrap_err();
    assert!(err.is_configuration_error());
}

/// Biomass built for another grid is rejected instead of read out of bounds
#[test]
fn test_biomass_from_other_grid_is_rejected() {
    let config = GridConfig::new(17, 17, 1, 1.0).unwrap();
    let small = GridConfig::new(9, 9, 1, 1.0).unwrap();
    let boundary = slab_boundary();
    let layer = BoundaryLayerField::all_active(&config);
    let particulates = biofilm_rows(&config, 4, 1.0);
    let biomass = Arc::new(GridHierarchy::filled(&small, 1.0));

    let uptake = MonodUptake::new(0, 1.0, biomass).limited_by(0, 1.0);
    let monod = Solute::new("substrate", 1.0, uptake).with_bulk(1.0);
    let species: [&dyn Species; 1] = [&monod];
    let problem = Problem {
        species: &species,
        boundary: &boundary,
        boundary_layer: &layer,
        particulates: &particulates,
    };

    let mut solver = MultigridSolver::new(config, SolverSettings::default()).unwrap();
    let err = solver.solve(&problem).unwrap_err();
    assert!(err.is_configuration_error());
    let err = solver.solve_by_relax(&problem).unwrap_err();
    assert!(err.is_configuration_error());
}

/// Grid configuration read from JSON is validated
#[test]
fn test_grid_config_from_json() {
    let json = r#"{"n": 33, "m": 17, "resolution": 0.5}"#;
    let config: GridConfig = serde_json::from_str(json).unwrap();
    assert_eq!(config.finest_shape(), [33, 17, 1]);
    assert_eq!(config.order(), 4);
    assert_abs_diff_eq!(config.spacing(0), 4.0);

    let bad = r#"{"n": 10, "m": 9, "resolution": 1.0}"#;
    assert!(serde_json::from_str::<GridConfig>(bad).is_err());
}
