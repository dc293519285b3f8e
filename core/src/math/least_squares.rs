//! Levenberg–Marquardt solver for small nonlinear least-squares problems.

use crate::prelude::{ExperimentError, ExperimentResult};
use log::debug;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Model evaluated by the solver: value vector and Jacobian at a point.
pub trait LeastSquaresModel {
    fn evaluate(&mut self, point: &DVector<f64>) -> ExperimentResult<(DVector<f64>, DMatrix<f64>)>;
}

impl<F> LeastSquaresModel for F
where
    F: FnMut(&DVector<f64>) -> ExperimentResult<(DVector<f64>, DMatrix<f64>)>,
{
    fn evaluate(&mut self, point: &DVector<f64>) -> ExperimentResult<(DVector<f64>, DMatrix<f64>)> {
        self(point)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub cost_tolerance: f64,
    pub parameter_tolerance: f64,
    /// `None` lets the solver iterate until a convergence criterion holds.
    pub max_iterations: Option<usize>,
    pub initial_damping: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            cost_tolerance: 1e-15,
            parameter_tolerance: 1e-15,
            max_iterations: None,
            initial_damping: 1e-3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Optimum {
    pub point: DVector<f64>,
    pub value: DVector<f64>,
    pub cost: f64,
    pub iterations: usize,
    pub evaluations: usize,
}

const DAMPING_CEILING: f64 = 1e32;
const DAMPING_FLOOR: f64 = 1e-20;

pub struct LevenbergMarquardt {
    config: SolverConfig,
}

impl LevenbergMarquardt {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    /// Minimizes `|target - model(x)|²` starting from `start`.
    pub fn optimize<M: LeastSquaresModel + ?Sized>(
        &self,
        model: &mut M,
        start: DVector<f64>,
        target: &DVector<f64>,
    ) -> ExperimentResult<Optimum> {
        let cfg = &self.config;
        let mut point = start;
        let (mut value, mut jacobian) = model.evaluate(&point)?;
        check_shape(&value, &jacobian, target, &point)?;
        let mut residual = target - &value;
        let mut cost = residual.norm_squared();
        let mut evaluations = 1;
        let mut iterations = 0;
        let mut damping = cfg.initial_damping;

        if !cost.is_finite() {
            return Err(ExperimentError::Solver(
                "objective is not finite at the starting point".into(),
            ));
        }

        'outer: loop {
            if cost <= cfg.cost_tolerance {
                break;
            }
            if let Some(limit) = cfg.max_iterations {
                if iterations >= limit {
                    debug!("solver stopped at iteration limit {}", limit);
                    break;
                }
            }
            iterations += 1;

            let normal = jacobian.transpose() * &jacobian;
            let gradient = jacobian.transpose() * &residual;
            if gradient.amax() == 0.0 {
                break;
            }

            loop {
                let mut damped = normal.clone();
                for i in 0..damped.nrows() {
                    let diagonal = normal[(i, i)];
                    damped[(i, i)] += damping * if diagonal > 0.0 { diagonal } else { 1.0 };
                }

                let Some(step) = damped.lu().solve(&gradient) else {
                    damping *= 10.0;
                    if damping > DAMPING_CEILING {
                        break 'outer;
                    }
                    continue;
                };

                let candidate = &point + &step;
                let (candidate_value, candidate_jacobian) = model.evaluate(&candidate)?;
                evaluations += 1;
                let candidate_residual = target - &candidate_value;
                let candidate_cost = candidate_residual.norm_squared();
                let step_small = step.norm()
                    <= cfg.parameter_tolerance * (point.norm() + cfg.parameter_tolerance);

                if candidate_cost.is_finite() && candidate_cost < cost {
                    let reduction = (cost - candidate_cost) / cost;
                    point = candidate;
                    value = candidate_value;
                    jacobian = candidate_jacobian;
                    residual = candidate_residual;
                    cost = candidate_cost;
                    damping = (damping / 10.0).max(DAMPING_FLOOR);

                    if reduction <= cfg.cost_tolerance || step_small {
                        break 'outer;
                    }
                    break;
                }

                damping *= 10.0;
                if step_small || damping > DAMPING_CEILING {
                    break 'outer;
                }
            }
        }

        debug!(
            "solver finished after {} iterations ({} evaluations), cost {:e}",
            iterations, evaluations, cost
        );

        Ok(Optimum {
            point,
            value,
            cost,
            iterations,
            evaluations,
        })
    }
}

fn check_shape(
    value: &DVector<f64>,
    jacobian: &DMatrix<f64>,
    target: &DVector<f64>,
    point: &DVector<f64>,
) -> ExperimentResult<()> {
    if value.len() != target.len()
        || jacobian.nrows() != target.len()
        || jacobian.ncols() != point.len()
    {
        return Err(ExperimentError::DimensionMismatch(format!(
            "model returned {} values and a {}x{} jacobian for {} targets and {} parameters",
            value.len(),
            jacobian.nrows(),
            jacobian.ncols(),
            target.len(),
            point.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::dvector;

    #[test]
    fn fits_exponential_decay() {
        let times: Vec<f64> = (0..20).map(|i| i as f64 * 0.25).collect();
        let observed = DVector::from_iterator(
            times.len(),
            times.iter().map(|t| 3.0 * (-0.7 * t).exp()),
        );

        let mut model = |p: &DVector<f64>| -> ExperimentResult<(DVector<f64>, DMatrix<f64>)> {
            let (a, k) = (p[0], p[1]);
            let value =
                DVector::from_iterator(times.len(), times.iter().map(|t| a * (-k * t).exp()));
            let mut jacobian = DMatrix::zeros(times.len(), 2);
            for (row, t) in times.iter().enumerate() {
                jacobian[(row, 0)] = (-k * t).exp();
                jacobian[(row, 1)] = -a * t * (-k * t).exp();
            }
            Ok((value, jacobian))
        };

        let solver = LevenbergMarquardt::new(SolverConfig::default());
        let optimum = solver
            .optimize(&mut model, dvector![1.0, 0.1], &observed)
            .unwrap();
        assert!((optimum.point[0] - 3.0).abs() < 1e-6);
        assert!((optimum.point[1] - 0.7).abs() < 1e-6);
    }

    #[test]
    fn stops_at_iteration_limit() {
        let mut model = |p: &DVector<f64>| -> ExperimentResult<(DVector<f64>, DMatrix<f64>)> {
            Ok((dvector![p[0] * p[0]], DMatrix::from_element(1, 1, 2.0 * p[0])))
        };
        let config = SolverConfig {
            max_iterations: Some(2),
            ..Default::default()
        };
        let optimum = LevenbergMarquardt::new(config)
            .optimize(&mut model, dvector![10.0], &dvector![4.0])
            .unwrap();
        assert!(optimum.iterations <= 2);
    }

    #[test]
    fn rejects_mismatched_model() {
        let mut model = |_: &DVector<f64>| -> ExperimentResult<(DVector<f64>, DMatrix<f64>)> {
            Ok((dvector![1.0, 2.0], DMatrix::zeros(2, 1)))
        };
        let result = LevenbergMarquardt::new(SolverConfig::default()).optimize(
            &mut model,
            dvector![0.0],
            &dvector![1.0],
        );
        assert!(matches!(result, Err(ExperimentError::DimensionMismatch(_))));
    }
}
