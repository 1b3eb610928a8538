use std::collections::HashMap;
use std::fmt;

use derive_more::Constructor;
use grb::prelude::*;
use grb::{Expr, Status};
use itertools::iproduct;
use log::{debug, trace};

use crate::models::utils::{self, ConvertVars};

use super::sets_and_parameters::{
    DayIndex, LineIndex, MillIndex, Parameters, RouteIndex, Sets, SlotIndex,
};

/// The objective the model maximizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Objective {
    Environment,
    Quality,
    Profit,
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Objective::Environment => "environment",
            Objective::Quality => "quality",
            Objective::Profit => "profit",
        };
        f.write_str(name)
    }
}

/// Epsilon thresholds appended to the environment model when tracing the
/// front: the quality and profit expressions must reach at least these values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub quality: f64,
    pub profit: f64,
}

#[derive(Constructor)]
pub struct Variables {
    /// Quantity processed at (day, mill, line)
    pub z: HashMap<(DayIndex, MillIndex, LineIndex), Var>,
    /// Valorized share of the residual at (day, mill, line)
    pub v: HashMap<(DayIndex, MillIndex, LineIndex), Var>,
    /// Residual routed to the shared waste buffer at (day, mill, line)
    pub w: HashMap<(DayIndex, MillIndex, LineIndex), Var>,
    /// Residual emitted at (day, mill, line)
    pub e: HashMap<(DayIndex, MillIndex, LineIndex), Var>,
    /// 1 iff mill f runs line p over the horizon
    pub x: HashMap<(MillIndex, LineIndex), Var>,
    /// Rejected quantity at (day, mill)
    pub r: HashMap<(DayIndex, MillIndex), Var>,
    /// 1 iff route c loads for mill f over the slot span (i1, i2)
    pub y: HashMap<(SlotIndex, SlotIndex, RouteIndex, MillIndex), Var>,
    /// 1 iff route c transfers from mill f1 to mill f2 over the slot span (i1, i2)
    pub o: HashMap<(SlotIndex, SlotIndex, RouteIndex, MillIndex, MillIndex), Var>,
    /// 1 iff route c idles for mill f during slot i
    pub n: HashMap<(SlotIndex, RouteIndex, MillIndex), Var>,
    /// 1 iff route c hands over to mill f when restarting at slot i of day d
    pub h: HashMap<(DayIndex, SlotIndex, RouteIndex, MillIndex), Var>,
    /// 1 iff route c terminates at mill f on line p
    pub k: HashMap<(RouteIndex, MillIndex, LineIndex), Var>,
}

/// Slot spans (i1, i2) with i1 <= i2 within one day
fn spans(slots: &[SlotIndex]) -> impl Iterator<Item = (SlotIndex, SlotIndex)> + '_ {
    iproduct!(slots.iter().copied(), slots.iter().copied()).filter(|(i1, i2)| i1 <= i2)
}

/// Slot spans (i1, i2) with i1 < i2 within one day
fn strict_spans(slots: &[SlotIndex]) -> impl Iterator<Item = (SlotIndex, SlotIndex)> + '_ {
    iproduct!(slots.iter().copied(), slots.iter().copied()).filter(|(i1, i2)| i1 < i2)
}

/// Quantity route c delivers to mill f on day d: every haul span contributes
/// the loading rate times its length in slots.
fn hauled(
    sets: &Sets,
    parameters: &Parameters,
    variables: &Variables,
    d: DayIndex,
    c: RouteIndex,
    f: MillIndex,
) -> Expr {
    spans(&sets.I_d[d])
        .filter_map(|(i1, i2)| {
            variables
                .y
                .get(&(i1, i2, c, f))
                .map(|&y| parameters.R[f] * ((*i2 - *i1 + 1) as f64) * y)
        })
        .grb_sum()
}

/// Flow into state (i, c, f): hauls covering slot i, the idle carry from the
/// previous slot, and transfers ending at i. Terms whose variables do not
/// exist (slot 0 has no predecessor) simply drop out.
fn inflow(sets: &Sets, variables: &Variables, d: DayIndex, i: SlotIndex, c: RouteIndex, f: MillIndex) -> Expr {
    let slots = &sets.I_d[d];
    let hauls = spans(slots)
        .filter(|&(i1, i2)| i1 <= i && i <= i2)
        .filter_map(|(i1, i2)| variables.y.get(&(i1, i2, c, f)).copied())
        .grb_sum();
    let idle = (*i > 0)
        .then(|| variables.n.get(&(SlotIndex::from(*i - 1), c, f)).copied())
        .flatten()
        .into_iter()
        .grb_sum();
    let transfers = iproduct!(slots.iter().copied(), sets.F.iter().copied())
        .filter(|&(i1, _)| i1 < i)
        .filter_map(|(i1, f2)| variables.o.get(&(i1, i, c, f2, f)).copied())
        .grb_sum();
    hauls + idle + transfers
}

/// Flow out of state (i, c, f): hauls starting at slot i, idling through i,
/// and transfers leaving at i.
fn outflow(sets: &Sets, variables: &Variables, d: DayIndex, i: SlotIndex, c: RouteIndex, f: MillIndex) -> Expr {
    let slots = &sets.I_d[d];
    let hauls = slots
        .iter()
        .copied()
        .filter(|&i2| i2 >= i)
        .filter_map(|i2| variables.y.get(&(i, i2, c, f)).copied())
        .grb_sum();
    let idle = variables.n.get(&(i, c, f)).copied().into_iter().grb_sum();
    let transfers = iproduct!(slots.iter().copied(), sets.F.iter().copied())
        .filter(|&(i2, _)| i2 > i)
        .filter_map(|(i2, f2)| variables.o.get(&(i, i2, c, f, f2)).copied())
        .grb_sum();
    hauls + idle + transfers
}

/// Flow arriving at mill f exactly at slot i: hauls and transfers ending at
/// i, plus the idle carry from the previous slot.
fn arrivals(sets: &Sets, variables: &Variables, d: DayIndex, i: SlotIndex, c: RouteIndex, f: MillIndex) -> Expr {
    let slots = &sets.I_d[d];
    let hauls = slots
        .iter()
        .copied()
        .filter(|&i1| i1 < i)
        .filter_map(|i1| variables.y.get(&(i1, i, c, f)).copied())
        .grb_sum();
    let idle = (*i > 0)
        .then(|| variables.n.get(&(SlotIndex::from(*i - 1), c, f)).copied())
        .flatten()
        .into_iter()
        .grb_sum();
    let transfers = iproduct!(slots.iter().copied(), sets.F.iter().copied())
        .filter(|&(i1, _)| i1 < i)
        .filter_map(|(i1, f2)| variables.o.get(&(i1, i, c, f2, f)).copied())
        .grb_sum();
    hauls + idle + transfers
}

pub struct HarvestModel {}

#[allow(non_snake_case)]
impl HarvestModel {
    /// Builds the harvest and OMW planning model with the given objective.
    /// When thresholds are given, the quality and profit expressions are
    /// additionally bounded from below. Does not solve.
    pub fn build(
        sets: &Sets,
        parameters: &Parameters,
        objective: Objective,
        thresholds: Option<Thresholds>,
    ) -> grb::Result<(Model, Variables)> {
        trace!("building harvest model with {} objective", objective);

        let mut model = Model::new("harvest_omw")?;
        model.set_param(param::OutputFlag, 0)?;

        let D = &sets.D;
        let F = &sets.F;
        let P = &sets.P;
        let C = &sets.C;
        let I_d = &sets.I_d;

        //*****************CREATE VARIABLES*****************//

        let dfp: Vec<_> = iproduct!(D.iter().copied(), F.iter().copied(), P.iter().copied()).collect();
        let z = utils::cont(dfp.clone(), &mut model, "z")?;
        let v = utils::cont(dfp.clone(), &mut model, "v")?;
        let w = utils::cont(dfp.clone(), &mut model, "w")?;
        let e = utils::cont(dfp, &mut model, "e")?;

        let indices = iproduct!(F.iter().copied(), P.iter().copied()).collect();
        let x = utils::binary(indices, &mut model, "x")?;

        let indices = iproduct!(D.iter().copied(), F.iter().copied()).collect();
        let r = utils::cont(indices, &mut model, "r")?;

        let mut indices = Vec::new();
        for &d in D {
            for (i1, i2) in spans(&I_d[d]) {
                for (&c, &f) in iproduct!(C, F) {
                    indices.push((i1, i2, c, f));
                }
            }
        }
        let y = utils::binary(indices, &mut model, "y")?;

        let mut indices = Vec::new();
        for &d in D {
            for (i1, i2) in strict_spans(&I_d[d]) {
                for (&c, &f1, &f2) in iproduct!(C, F, F) {
                    indices.push((i1, i2, c, f1, f2));
                }
            }
        }
        let o = utils::binary(indices, &mut model, "o")?;

        let mut indices = Vec::new();
        for &d in D {
            for &i in &I_d[d] {
                for (&c, &f) in iproduct!(C, F) {
                    indices.push((i, c, f));
                }
            }
        }
        let n = utils::binary(indices, &mut model, "n")?;

        let mut indices = Vec::new();
        for &d in D {
            for &i in &I_d[d] {
                for (&c, &f) in iproduct!(C, F) {
                    indices.push((d, i, c, f));
                }
            }
        }
        let h = utils::binary(indices, &mut model, "h")?;

        let indices = iproduct!(C.iter().copied(), F.iter().copied(), P.iter().copied()).collect();
        let k = utils::binary(indices, &mut model, "k")?;

        let variables = Variables::new(z, v, w, e, x, r, y, o, n, h, k);

        //*****************SET OBJECTIVE*****************//

        let objective_expression = match objective {
            Objective::Environment => Self::environment_expression(sets, parameters, &variables),
            Objective::Quality => Self::quality_expression(sets, parameters, &variables),
            Objective::Profit => Self::profit_expression(sets, parameters, &variables),
        };
        model.set_objective(objective_expression, Maximize)?;

        //*****************ADD CONSTRAINTS*****************//

        // Residual split and caps
        for (&d, &f, &p) in iproduct!(D, F, P) {
            let z = variables.z[&(d, f, p)];
            let v = variables.v[&(d, f, p)];
            let w = variables.w[&(d, f, p)];
            let e = variables.e[&(d, f, p)];
            model.add_constr(
                &format!("mass_balance_{}_{}_{}", *d, *f, *p),
                c!(parameters.alpha * z == v + w + e),
            )?;
            model.add_constr(
                &format!("valorized_share_{}_{}_{}", *d, *f, *p),
                c!(v <= parameters.alpha * z),
            )?;
            model.add_constr(
                &format!("valorized_cap_{}_{}_{}", *d, *f, *p),
                c!(v <= parameters.Vmax[d][f][p]),
            )?;
            model.add_constr(
                &format!("emission_cap_{}_{}_{}", *d, *f, *p),
                c!(e <= parameters.E[f]),
            )?;
        }

        // Shared waste buffer
        for &d in D {
            let waste = iproduct!(F, P).map(|(&f, &p)| variables.w[&(d, f, p)]).grb_sum();
            model.add_constr(
                &format!("waste_buffer_{}", *d),
                c!(waste <= parameters.B_total[d]),
            )?;
        }

        // Quality acceptance and line quantity bands
        for (&d, &p) in iproduct!(D, P) {
            let total = F.iter().map(|&f| variables.z[&(d, f, p)]).grb_sum();

            let oleic = F
                .iter()
                .map(|&f| (parameters.O[d][f] - parameters.O_min[d][p]) * variables.z[&(d, f, p)])
                .grb_sum();
            model.add_constr(&format!("oil_content_floor_{}_{}", *d, *p), c!(oleic >= 0.0))?;

            let acidity = F
                .iter()
                .map(|&f| parameters.A[d][f] * variables.z[&(d, f, p)])
                .grb_sum();
            model.add_constr(
                &format!("acidity_cap_{}_{}", *d, *p),
                c!(acidity <= parameters.A_max[d][p] * total.clone()),
            )?;

            let peroxide = F
                .iter()
                .map(|&f| parameters.P[d][f] * variables.z[&(d, f, p)])
                .grb_sum();
            model.add_constr(
                &format!("peroxide_cap_{}_{}", *d, *p),
                c!(peroxide <= parameters.P_max[d][p] * total.clone()),
            )?;

            let humidity = F
                .iter()
                .map(|&f| parameters.H[d][f] * variables.z[&(d, f, p)])
                .grb_sum();
            model.add_constr(
                &format!("humidity_cap_{}_{}", *d, *p),
                c!(humidity <= parameters.H_max[d][p] * total.clone()),
            )?;

            model.add_constr(
                &format!("line_quantity_lb_{}_{}", *d, *p),
                c!(total.clone() >= parameters.QP_min[d][p]),
            )?;
            model.add_constr(
                &format!("line_quantity_ub_{}_{}", *d, *p),
                c!(total.clone() <= parameters.QP_max[d][p]),
            )?;
            model.add_constr(
                &format!("line_capacity_{}_{}", *d, *p),
                c!(total <= parameters.S[p]),
            )?;
        }

        // Route quantity bands
        for (&d, &c) in iproduct!(D, C) {
            let delivered = F
                .iter()
                .map(|&f| hauled(sets, parameters, &variables, d, c, f))
                .grb_sum();
            model.add_constr(
                &format!("route_quantity_lb_{}_{}", *d, *c),
                c!(delivered.clone() >= parameters.Q_min[d][c]),
            )?;
            model.add_constr(
                &format!("route_quantity_ub_{}_{}", *d, *c),
                c!(delivered <= parameters.Q_max[d][c]),
            )?;
        }

        // Mill flow: processed plus rejected equals delivered
        for (&d, &f) in iproduct!(D, F) {
            let processed = P.iter().map(|&p| variables.z[&(d, f, p)]).grb_sum();
            let delivered = C
                .iter()
                .map(|&c| hauled(sets, parameters, &variables, d, c, f))
                .grb_sum();
            model.add_constr(
                &format!("mill_flow_{}_{}", *d, *f),
                c!(processed + variables.r[&(d, f)] == delivered),
            )?;
        }

        // Every mill commits to exactly one line
        for &f in F {
            let active = P.iter().map(|&p| variables.x[&(f, p)]).grb_sum();
            model.add_constr(&format!("single_line_{}", *f), c!(active == 1.0))?;
        }

        // Every route performs at most one haul over the horizon
        for &c in C {
            let y = &variables.y;
            let hauls = D
                .iter()
                .flat_map(|&d| {
                    spans(&I_d[d]).flat_map(move |(i1, i2)| {
                        F.iter().filter_map(move |&f| y.get(&(i1, i2, c, f)).copied())
                    })
                })
                .grb_sum();
            model.add_constr(&format!("single_haul_{}", *c), c!(hauls <= 1.0))?;
        }

        // Processing only on the committed line
        for (&d, &f, &p) in iproduct!(D, F, P) {
            model.add_constr(
                &format!("line_link_{}_{}_{}", *d, *f, *p),
                c!(variables.z[&(d, f, p)] <= parameters.M[f] * variables.x[&(f, p)]),
            )?;
        }

        // The route leaves its first permitted start slot in exactly one
        // state. Routes whose permitted start slots are empty or reference no
        // known day get no start bookkeeping, like any other missing flow term.
        for &c in C {
            let first = sets
                .I_c0[c]
                .first()
                .and_then(|&i0| sets.day_of_slot.get(&i0).map(|&d0| (i0, d0)));
            if let Some((i0, d0)) = first {
                let start = F
                    .iter()
                    .map(|&f| outflow(sets, &variables, d0, i0, c, f) + variables.k[&(c, f, parameters.p_c[c])])
                    .grb_sum();
                model.add_constr(&format!("route_start_{}", *c), c!(start == 1.0))?;
            }
        }

        // Flow conservation through every slot
        for (&c, &d) in iproduct!(C, D) {
            for &i in &I_d[d] {
                for &f in F {
                    let flow_in = inflow(sets, &variables, d, i, c, f);
                    let flow_out = outflow(sets, &variables, d, i, c, f);
                    model.add_constr(
                        &format!("flow_{}_{}_{}", *i, *c, *f),
                        c!(flow_in == flow_out),
                    )?;
                }
            }
        }

        // At every permitted start slot, whatever arrives is handed over and
        // the handover determines how the route leaves again
        for &c in C {
            for &i in &sets.I_c0[c] {
                let d = match sets.day_of_slot.get(&i) {
                    Some(&d) => d,
                    None => continue,
                };
                let arriving = F
                    .iter()
                    .map(|&f| arrivals(sets, &variables, d, i, c, f))
                    .grb_sum();
                let handovers = F
                    .iter()
                    .filter_map(|&f| variables.h.get(&(d, i, c, f)).copied())
                    .grb_sum();
                model.add_constr(
                    &format!("segment_handover_{}_{}", *i, *c),
                    c!(arriving == handovers),
                )?;
                for &f in F {
                    let handover = variables.h[&(d, i, c, f)];
                    let restart = outflow(sets, &variables, d, i, c, f);
                    model.add_constr(
                        &format!("segment_restart_{}_{}_{}", *i, *c, *f),
                        c!(handover == restart),
                    )?;
                }
            }
        }

        if let Some(eps) = thresholds {
            let quality = Self::quality_expression(sets, parameters, &variables);
            model.add_constr("eps_quality", c!(quality >= eps.quality))?;
            let profit = Self::profit_expression(sets, parameters, &variables);
            model.add_constr("eps_profit", c!(profit >= eps.profit))?;
        }

        model.update()?;
        debug!(
            "built harvest model with {} variables",
            model.get_attr(attr::NumVars)?
        );

        Ok((model, variables))
    }

    /// Builds and optimizes, and interprets the final status. Infeasibility
    /// is a regular outcome; anything else that is not optimal is an error.
    pub fn solve(
        sets: &Sets,
        parameters: &Parameters,
        objective: Objective,
        thresholds: Option<Thresholds>,
    ) -> Result<SolveOutcome, Error> {
        let (mut model, variables) = Self::build(sets, parameters, objective, thresholds)?;
        model.optimize()?;
        let status = model.status()?;
        trace!("harvest model finished with status {:?}", status);
        match status {
            Status::Optimal => Ok(SolveOutcome::Optimal(HarvestPlan::extract(&model, &variables)?)),
            Status::Infeasible | Status::InfOrUnbd | Status::Unbounded => {
                Ok(SolveOutcome::Infeasible)
            }
            status => Err(Error::UnexpectedStatus(status)),
        }
    }

    /// Σ α·z − v over all (day, mill, line)
    fn environment_expression(sets: &Sets, parameters: &Parameters, variables: &Variables) -> Expr {
        iproduct!(&sets.D, &sets.F, &sets.P)
            .map(|(&d, &f, &p)| {
                parameters.alpha * variables.z[&(d, f, p)] - variables.v[&(d, f, p)]
            })
            .grb_sum()
    }

    /// Σ (ω1·O − ω2·A − ω3·P − ω4·H)·z over all (day, mill, line)
    fn quality_expression(sets: &Sets, parameters: &Parameters, variables: &Variables) -> Expr {
        iproduct!(&sets.D, &sets.F, &sets.P)
            .map(|(&d, &f, &p)| {
                (parameters.omega[0] * parameters.O[d][f]
                    - parameters.omega[1] * parameters.A[d][f]
                    - parameters.omega[2] * parameters.P[d][f]
                    - parameters.omega[3] * parameters.H[d][f])
                    * variables.z[&(d, f, p)]
            })
            .grb_sum()
    }

    /// Sales revenue minus processing, rejection, liquid handling and
    /// emission costs
    fn profit_expression(sets: &Sets, parameters: &Parameters, variables: &Variables) -> Expr {
        let sales = iproduct!(&sets.D, &sets.F, &sets.P)
            .map(|(&d, &f, &p)| {
                (parameters.V[d][p] * parameters.ATR[d][f] - parameters.CP[d][f][p])
                    * variables.z[&(d, f, p)]
            })
            .grb_sum();
        let rejection = iproduct!(&sets.D, &sets.F)
            .map(|(&d, &f)| parameters.CR[f] * variables.r[&(d, f)])
            .grb_sum();
        let handling = iproduct!(&sets.D, &sets.F, &sets.P)
            .map(|(&d, &f, &p)| {
                parameters.CL[p] * variables.w[&(d, f, p)]
                    - parameters.CL[p] * variables.v[&(d, f, p)]
                    + parameters.CE[f] * variables.e[&(d, f, p)]
            })
            .grb_sum();
        sales - rejection - handling
    }
}

/// Module-level solver errors. A model that merely turns out infeasible is
/// reported through [`SolveOutcome`], not here.
#[derive(Debug)]
pub enum Error {
    Solver(grb::Error),
    UnexpectedStatus(Status),
}

impl From<grb::Error> for Error {
    fn from(e: grb::Error) -> Self {
        Error::Solver(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Solver(e) => write!(f, "solver failure: {}", e),
            Error::UnexpectedStatus(status) => {
                write!(f, "solver terminated with unexpected status {:?}", status)
            }
        }
    }
}

impl std::error::Error for Error {}

#[derive(Debug)]
pub enum SolveOutcome {
    Optimal(HarvestPlan),
    Infeasible,
}

/// Realized variable values of an optimal solution, together with the
/// attained objective value.
#[derive(Debug, Clone)]
pub struct HarvestPlan {
    pub z: HashMap<(DayIndex, MillIndex, LineIndex), f64>,
    pub v: HashMap<(DayIndex, MillIndex, LineIndex), f64>,
    pub w: HashMap<(DayIndex, MillIndex, LineIndex), f64>,
    pub e: HashMap<(DayIndex, MillIndex, LineIndex), f64>,
    pub x: HashMap<(MillIndex, LineIndex), f64>,
    pub r: HashMap<(DayIndex, MillIndex), f64>,
    pub y: HashMap<(SlotIndex, SlotIndex, RouteIndex, MillIndex), f64>,
    pub o: HashMap<(SlotIndex, SlotIndex, RouteIndex, MillIndex, MillIndex), f64>,
    pub n: HashMap<(SlotIndex, RouteIndex, MillIndex), f64>,
    pub objective: f64,
}

impl HarvestPlan {
    fn extract(model: &Model, variables: &Variables) -> grb::Result<HarvestPlan> {
        Ok(HarvestPlan {
            z: variables.z.convert(model)?,
            v: variables.v.convert(model)?,
            w: variables.w.convert(model)?,
            e: variables.e.convert(model)?,
            x: variables.x.convert(model)?,
            r: variables.r.convert(model)?,
            y: variables.y.convert(model)?,
            o: variables.o.convert(model)?,
            n: variables.n.convert(model)?,
            objective: model.get_attr(attr::ObjVal)?,
        })
    }

    /// Realized environment measure, Σ α·z − v
    pub fn environment(&self, parameters: &Parameters) -> f64 {
        self.z
            .iter()
            .map(|(key, &z)| parameters.alpha * z - self.v[key])
            .sum()
    }

    /// Realized quality measure, Σ (ω1·O − ω2·A − ω3·P − ω4·H)·z
    pub fn quality(&self, parameters: &Parameters) -> f64 {
        self.z
            .iter()
            .map(|(&(d, f, _), &z)| {
                (parameters.omega[0] * parameters.O[d][f]
                    - parameters.omega[1] * parameters.A[d][f]
                    - parameters.omega[2] * parameters.P[d][f]
                    - parameters.omega[3] * parameters.H[d][f])
                    * z
            })
            .sum()
    }

    /// Realized profit: sales revenue minus processing, rejection, liquid
    /// handling and emission costs
    pub fn profit(&self, parameters: &Parameters) -> f64 {
        let sales: f64 = self
            .z
            .iter()
            .map(|(&(d, f, p), &z)| {
                (parameters.V[d][p] * parameters.ATR[d][f] - parameters.CP[d][f][p]) * z
            })
            .sum();
        let rejection: f64 = self
            .r
            .iter()
            .map(|(&(_, f), &r)| parameters.CR[f] * r)
            .sum();
        let handling: f64 = self
            .w
            .iter()
            .map(|(&(d, f, p), &w)| {
                parameters.CL[p] * (w - self.v[&(d, f, p)]) + parameters.CE[f] * self.e[&(d, f, p)]
            })
            .sum();
        sales - rejection - handling
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::test_fixtures::toy;

    fn toy_sets_and_parameters() -> (Sets, Parameters) {
        let instance = toy();
        (Sets::new(&instance), Parameters::new(&instance))
    }

    fn optimal(outcome: SolveOutcome) -> HarvestPlan {
        match outcome {
            SolveOutcome::Optimal(plan) => plan,
            SolveOutcome::Infeasible => panic!("expected an optimal plan"),
        }
    }

    #[test]
    fn toy_model_has_the_expected_variable_count() {
        let (sets, parameters) = toy_sets_and_parameters();
        let (model, _) = HarvestModel::build(&sets, &parameters, Objective::Profit, None).unwrap();
        // z, v, w, e: 4; x: 1; r: 1; y: 3 spans; o: 1; n: 2; h: 2; k: 1
        assert_eq!(model.get_attr(attr::NumVars).unwrap(), 15);
    }

    #[test]
    fn profit_optimum_matches_hand_computation() {
        let (sets, parameters) = toy_sets_and_parameters();
        let plan = optimal(
            HarvestModel::solve(&sets, &parameters, Objective::Profit, None).unwrap(),
        );
        // One haul of 20 units, all residual valorized: 2.5 * 20 = 50
        assert!((plan.objective - 50.0).abs() < 1e-6);
        assert!((plan.profit(&parameters) - plan.objective).abs() < 1e-6);
    }

    #[test]
    fn quality_optimum_matches_hand_computation() {
        let (sets, parameters) = toy_sets_and_parameters();
        let plan = optimal(
            HarvestModel::solve(&sets, &parameters, Objective::Quality, None).unwrap(),
        );
        // (1.0 - 0.1 - 0.1 - 0.1) * 20 = 14
        assert!((plan.objective - 14.0).abs() < 1e-6);
        assert!((plan.quality(&parameters) - plan.objective).abs() < 1e-6);
    }

    #[test]
    fn thresholds_trade_environment_against_profit() {
        let (sets, parameters) = toy_sets_and_parameters();
        let thresholds = Thresholds {
            quality: 12.6,
            profit: 45.0,
        };
        let plan = optimal(
            HarvestModel::solve(&sets, &parameters, Objective::Environment, Some(thresholds))
                .unwrap(),
        );
        // Profit binds at 45, which forces v = 17.5 and leaves 2.5 unvalorized
        assert!((plan.objective - 2.5).abs() < 1e-6);
        assert!(plan.quality(&parameters) >= thresholds.quality - 1e-6);
        assert!(plan.profit(&parameters) >= thresholds.profit - 1e-6);
    }

    #[test]
    fn unreachable_thresholds_are_infeasible() {
        let (sets, parameters) = toy_sets_and_parameters();
        let thresholds = Thresholds {
            quality: 15.0,
            profit: 0.0,
        };
        let outcome =
            HarvestModel::solve(&sets, &parameters, Objective::Environment, Some(thresholds))
                .unwrap();
        assert!(matches!(outcome, SolveOutcome::Infeasible));
    }

    #[test]
    fn solved_plans_respect_the_structural_constraints() {
        let (sets, parameters) = toy_sets_and_parameters();
        let plan = optimal(
            HarvestModel::solve(&sets, &parameters, Objective::Profit, None).unwrap(),
        );

        for (&(d, f, p), &z) in &plan.z {
            let split = plan.v[&(d, f, p)] + plan.w[&(d, f, p)] + plan.e[&(d, f, p)];
            assert!((parameters.alpha * z - split).abs() < 1e-6);
        }

        for &f in &sets.F {
            let active: f64 = sets.P.iter().map(|&p| plan.x[&(f, p)]).sum();
            assert!((active - 1.0).abs() < 1e-6);
        }

        for &c in &sets.C {
            let hauls: f64 = plan
                .y
                .iter()
                .filter_map(|(&(_, _, yc, _), &y)| (yc == c).then(|| y))
                .sum();
            assert!(hauls <= 1.0 + 1e-6);
        }
    }

    #[test]
    fn the_profit_plan_selects_the_spanning_haul() {
        let (sets, parameters) = toy_sets_and_parameters();
        let plan = optimal(
            HarvestModel::solve(&sets, &parameters, Objective::Profit, None).unwrap(),
        );
        // Only the haul over slots 0..=1 delivers the full 20 units; the flow
        // network must still admit it even though the route may not start
        // before slot 1
        let key = (
            SlotIndex::from(0),
            SlotIndex::from(1),
            RouteIndex::from(0),
            MillIndex::from(0),
        );
        assert!((plan.y[&key] - 1.0).abs() < 1e-6);
        for (k, &y) in &plan.y {
            if *k != key {
                assert!(y.abs() < 1e-6);
            }
        }
    }

    #[test]
    fn flow_conservation_holds_at_every_slot_and_mill() {
        let (sets, parameters) = toy_sets_and_parameters();
        let plan = optimal(
            HarvestModel::solve(&sets, &parameters, Objective::Profit, None).unwrap(),
        );

        for (&c, &d) in iproduct!(&sets.C, &sets.D) {
            let slots = &sets.I_d[d];
            for (&i, &f) in iproduct!(slots, &sets.F) {
                let flow_in: f64 = spans(slots)
                    .filter(|&(i1, i2)| i1 <= i && i <= i2)
                    .filter_map(|(i1, i2)| plan.y.get(&(i1, i2, c, f)))
                    .sum::<f64>()
                    + (*i > 0)
                        .then(|| plan.n.get(&(SlotIndex::from(*i - 1), c, f)).copied())
                        .flatten()
                        .unwrap_or(0.0)
                    + iproduct!(slots.iter().copied(), sets.F.iter().copied())
                        .filter(|&(i1, _)| i1 < i)
                        .filter_map(|(i1, f2)| plan.o.get(&(i1, i, c, f2, f)))
                        .sum::<f64>();

                let flow_out: f64 = slots
                    .iter()
                    .copied()
                    .filter(|&i2| i2 >= i)
                    .filter_map(|i2| plan.y.get(&(i, i2, c, f)))
                    .sum::<f64>()
                    + plan.n.get(&(i, c, f)).copied().unwrap_or(0.0)
                    + iproduct!(slots.iter().copied(), sets.F.iter().copied())
                        .filter(|&(i2, _)| i2 > i)
                        .filter_map(|(i2, f2)| plan.o.get(&(i, i2, c, f, f2)))
                        .sum::<f64>();

                assert!(
                    (flow_in - flow_out).abs() < 1e-6,
                    "flow imbalance at slot {} mill {}: {} in, {} out",
                    *i,
                    *f,
                    flow_in,
                    flow_out
                );
            }
        }
    }

    #[test]
    fn routes_without_start_slots_build_without_start_bookkeeping() {
        let mut instance = toy();
        instance.start_slots = vec![vec![]];
        let sets = Sets::new(&instance);
        let parameters = Parameters::new(&instance);
        let (model, _) =
            HarvestModel::build(&sets, &parameters, Objective::Profit, None).unwrap();
        assert!(model.get_attr(attr::NumVars).unwrap() > 0);
    }
}
