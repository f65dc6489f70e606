//! Residual norms and truncation-error bookkeeping
//!
//! A nested-iteration stage is converged once every solute's residual at the
//! stage level has dropped to the truncation error recorded for it during the
//! descent of the stage's V-cycles.

use crate::grid::PaddedGrid;

/// Euclidean norm over interior cells
pub fn compute_norm(grid: &PaddedGrid) -> f64 {
    grid.interior().iter().map(|v| v * v).sum::<f64>().sqrt()
}

/// Truncation errors per solute and per stage
#[derive(Debug, Clone, PartialEq)]
pub struct ConvergenceMonitor {
    /// `truncation[solute][stage]`
    truncation: Vec<Vec<Option<f64>>>,
}

impl ConvergenceMonitor {
    pub fn new(num_solutes: usize, num_stages: usize) -> Self {
        Self {
            truncation: vec![vec![None; num_stages]; num_solutes],
        }
    }

    /// Forget every recorded value.
    pub fn reset(&mut self) {
        for row in &mut self.truncation {
            row.fill(None);
        }
    }

    pub fn record_truncation(&mut self, solute: usize, stage: usize, value: f64) {
        self.truncation[solute][stage] = Some(value);
    }

    pub fn truncation_error(&self, solute: usize, stage: usize) -> Option<f64> {
        self.truncation.get(solute)?.get(stage).copied().flatten()
    }

    /// Recorded truncation errors of `stage`, NaN where none was recorded
    pub fn truncation_errors(&self, stage: usize) -> Vec<f64> {
        (0..self.truncation.len())
            .map(|solute| {
                self.truncation_error(solute, stage).unwrap_or(f64::NAN)
            })
            .collect()
    }

    /// True when every solute's residual is at or below its truncation error.
    pub fn is_converged(&self, stage: usize, residuals: &[f64]) -> bool {
        residuals.len() == self.truncation.len()
            && residuals
                .iter()
                .enumerate()
                .all(|(solute, &residual)| match self.truncation_error(solute, stage) {
                    Some(truncation) => residual <= truncation,
                    None => false,
                })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_norm_interior_only() {
        let mut grid = PaddedGrid::filled([3, 3, 1], 1.0, 100.0);
        grid.fill_interior(0.0);
        assert_eq!(compute_norm(&grid), 0.0);

        grid.set(2, 2, 1, 3.0);
        grid.set(1, 3, 1, -4.0);
        assert_relative_eq!(compute_norm(&grid), 5.0);
    }

    #[test]
    fn test_norm_non_negative() {
        let grid = PaddedGrid::from_fn([5, 5, 5], 1.0, |[i, j, k]| {
            i as f64 - 2.0 * j as f64 + k as f64
        });
        assert!(compute_norm(&grid) > 0.0);
    }

    #[test]
    fn test_convergence_decision() {
        let mut monitor = ConvergenceMonitor::new(2, 3);
        assert!(!monitor.is_converged(1, &[0.0, 0.0]));

        monitor.record_truncation(0, 1, 0.5);
        assert!(!monitor.is_converged(1, &[0.1, 0.1]));

        monitor.record_truncation(1, 1, 0.2);
        assert!(monitor.is_converged(1, &[0.5, 0.2]));
        assert!(!monitor.is_converged(1, &[0.5, 0.21]));
        assert!(!monitor.is_converged(2, &[0.0, 0.0]));
        assert_eq!(monitor.truncation_errors(1), vec![0.5, 0.2]);

        monitor.reset();
        assert_eq!(monitor.truncation_error(0, 1), None);
    }

    #[test]
    fn test_residual_count_must_match() {
        let mut monitor = ConvergenceMonitor::new(1, 1);
        monitor.record_truncation(0, 0, 1.0);
        assert!(monitor.is_converged(0, &[0.5]));
        assert!(!monitor.is_converged(0, &[0.5, 0.5]));
    }
}
