use std::fmt;

use itertools::iproduct;
use log::info;
use rayon::prelude::*;
use typed_index_collections::TiVec;

use crate::instance::{Instance, InstanceError};
use crate::models::harvest::model::{
    self, HarvestModel, HarvestPlan, Objective, SolveOutcome, Thresholds,
};
use crate::models::harvest::sets_and_parameters::{DayIndex, MillIndex, Parameters, Sets};

/// A retained point of the approximate Pareto front: the three realized
/// objective values and the processed quantity aggregated by mill and by day.
#[derive(Debug, Clone, PartialEq)]
pub struct FrontPoint {
    pub environment: f64,
    pub quality: f64,
    pub profit: f64,
    pub quantity_by_mill: TiVec<MillIndex, f64>,
    pub quantity_by_day: TiVec<DayIndex, f64>,
}

impl FrontPoint {
    fn from_plan(plan: &HarvestPlan, sets: &Sets, parameters: &Parameters) -> FrontPoint {
        let mut quantity_by_mill: TiVec<MillIndex, f64> = vec![0.0; sets.F.len()].into();
        let mut quantity_by_day: TiVec<DayIndex, f64> = vec![0.0; sets.D.len()].into();
        for (&(d, f, _), &z) in &plan.z {
            quantity_by_mill[f] += z;
            quantity_by_day[d] += z;
        }

        FrontPoint {
            environment: plan.environment(parameters),
            quality: plan.quality(parameters),
            profit: plan.profit(parameters),
            quantity_by_mill,
            quantity_by_day,
        }
    }
}

#[derive(Debug)]
pub enum Error {
    /// The instance failed validation before any solve was attempted
    Instance(InstanceError),
    /// A solver failure, at a reference solve or at a grid point
    Model(model::Error),
    /// The reference optimum for this objective could not be established
    Reference(Objective),
}

impl From<InstanceError> for Error {
    fn from(e: InstanceError) -> Self {
        Error::Instance(e)
    }
}

impl From<model::Error> for Error {
    fn from(e: model::Error) -> Self {
        Error::Model(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Instance(e) => write!(f, "invalid instance: {}", e),
            Error::Model(e) => write!(f, "{}", e),
            Error::Reference(objective) => {
                write!(f, "no reference optimum for the {} objective", objective)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Instance(e) => Some(e),
            Error::Model(e) => Some(e),
            Error::Reference(_) => None,
        }
    }
}

/// Traces the approximate Pareto front of the instance: solves the quality
/// and profit reference optima, spans a threshold grid over the band
/// [0.9·opt, opt] of each, and re-solves the environment model once per
/// threshold pair. Infeasible pairs are dropped; solver failures abort the
/// exploration.
pub fn explore(
    instance: &Instance,
    q_steps: usize,
    g_steps: usize,
) -> Result<Vec<FrontPoint>, Error> {
    instance.validate()?;
    let sets = Sets::new(instance);
    let parameters = Parameters::new(instance);

    let q_opt = reference_optimum(&sets, &parameters, Objective::Quality)?;
    let g_opt = reference_optimum(&sets, &parameters, Objective::Profit)?;
    info!("reference optima: quality {}, profit {}", q_opt, g_opt);

    let grid = threshold_grid(q_opt, g_opt, q_steps, g_steps);
    info!("exploring {} threshold pairs", grid.len());

    let candidates: Vec<Option<FrontPoint>> = grid
        .par_iter()
        .map(|&thresholds| {
            let outcome =
                HarvestModel::solve(&sets, &parameters, Objective::Environment, Some(thresholds))?;
            Ok(match outcome {
                SolveOutcome::Optimal(plan) => {
                    Some(FrontPoint::from_plan(&plan, &sets, &parameters))
                }
                SolveOutcome::Infeasible => None,
            })
        })
        .collect::<Result<_, model::Error>>()?;

    let points: Vec<FrontPoint> = candidates.into_iter().flatten().collect();
    info!("retained {} of {} grid points", points.len(), grid.len());

    Ok(points)
}

fn reference_optimum(
    sets: &Sets,
    parameters: &Parameters,
    objective: Objective,
) -> Result<f64, Error> {
    match HarvestModel::solve(sets, parameters, objective, None)? {
        SolveOutcome::Optimal(plan) => Ok(plan.objective),
        SolveOutcome::Infeasible => Err(Error::Reference(objective)),
    }
}

/// Evenly spaced thresholds from 0.9·optimum up to the optimum itself. With
/// zero steps the single threshold sits at the optimum boundary.
fn band(optimum: f64, steps: usize) -> Vec<f64> {
    if steps == 0 {
        return vec![optimum];
    }
    let lo = 0.9 * optimum;
    (0..=steps)
        .map(|i| lo + (optimum - lo) * i as f64 / steps as f64)
        .collect()
}

/// All threshold pairs in row-major order: every profit threshold within
/// every quality threshold.
fn threshold_grid(q_opt: f64, g_opt: f64, q_steps: usize, g_steps: usize) -> Vec<Thresholds> {
    iproduct!(band(q_opt, q_steps), band(g_opt, g_steps))
        .map(|(quality, profit)| Thresholds { quality, profit })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::test_fixtures::toy;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn band_spans_ninety_percent_to_the_optimum() {
        assert_eq!(band(100.0, 4), vec![90.0, 92.5, 95.0, 97.5, 100.0]);
    }

    #[test]
    fn band_with_zero_steps_sits_at_the_optimum() {
        assert_eq!(band(100.0, 0), vec![100.0]);
    }

    #[test]
    fn grid_is_row_major_in_the_quality_axis() {
        let grid = threshold_grid(10.0, 20.0, 1, 1);
        assert_eq!(grid.len(), 4);
        assert_eq!(
            grid,
            vec![
                Thresholds { quality: 9.0, profit: 18.0 },
                Thresholds { quality: 9.0, profit: 20.0 },
                Thresholds { quality: 10.0, profit: 18.0 },
                Thresholds { quality: 10.0, profit: 20.0 },
            ]
        );
    }

    #[test]
    fn zero_step_exploration_yields_the_single_boundary_point() {
        let points = explore(&toy(), 0, 0).unwrap();
        assert_eq!(points.len(), 1);
        assert!(close(points[0].environment, 0.0));
        assert!(close(points[0].quality, 14.0));
        assert!(close(points[0].profit, 50.0));
        assert_eq!(points[0].quantity_by_mill.len(), 1);
        assert!(close(points[0].quantity_by_mill[MillIndex::from(0)], 20.0));
        assert!(close(points[0].quantity_by_day[DayIndex::from(0)], 20.0));
    }

    #[test]
    fn single_step_exploration_traces_the_profit_tradeoff() {
        let points = explore(&toy(), 1, 1).unwrap();
        assert_eq!(points.len(), 4);
        // Row-major over (quality, profit) thresholds: the relaxed profit
        // threshold of 45 leaves 2.5 units unvalorized
        let environment: Vec<f64> = points.iter().map(|p| p.environment).collect();
        assert!(close(environment[0], 2.5));
        assert!(close(environment[1], 0.0));
        assert!(close(environment[2], 2.5));
        assert!(close(environment[3], 0.0));
    }

    #[test]
    fn tightening_a_threshold_never_improves_the_environment_optimum() {
        let points = explore(&toy(), 1, 1).unwrap();
        // Same quality threshold, increasing profit threshold
        assert!(points[0].environment >= points[1].environment - 1e-9);
        assert!(points[2].environment >= points[3].environment - 1e-9);
    }

    #[test]
    fn repeated_exploration_is_deterministic() {
        let first = explore(&toy(), 0, 0).unwrap();
        let second = explore(&toy(), 0, 0).unwrap();
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            assert!((a.environment - b.environment).abs() < 1e-9);
            assert!((a.quality - b.quality).abs() < 1e-9);
            assert!((a.profit - b.profit).abs() < 1e-9);
        }
    }

    #[test]
    fn zero_route_capacity_forces_the_zero_front() {
        let mut instance = toy();
        instance.route_quantity_max = vec![vec![0.0]];
        let points = explore(&instance, 1, 1).unwrap();
        assert_eq!(points.len(), 4);
        for point in &points {
            assert!(close(point.environment, 0.0));
            assert!(close(point.quality, 0.0));
            assert!(close(point.profit, 0.0));
        }
    }

    #[test]
    fn invalid_instances_fail_before_any_solve() {
        let mut instance = toy();
        instance.price = vec![];
        let error = explore(&instance, 1, 1).unwrap_err();
        assert!(matches!(
            error,
            Error::Instance(InstanceError::DimensionMismatch { parameter: "price", .. })
        ));
    }
}
