use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A complete problem instance for the harvest and OMW planning model.
/// Loaded from JSON and treated as immutable for the duration of a run.
///
/// Slot indices are global across the planning horizon: each time slot belongs
/// to exactly one day, and `slots[d]` lists the slots of day `d` in increasing
/// order. `start_slots[c]` lists the slots at which route `c` may begin
/// loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    /// Number of planning days
    pub days: usize,
    /// Number of processing mills
    pub mills: usize,
    /// Number of processing lines/types per mill
    pub lines: usize,
    /// Number of collection routes
    pub routes: usize,
    /// Time slots of each day
    pub slots: Vec<Vec<usize>>,
    /// Slots at which each route may start loading
    pub start_slots: Vec<Vec<usize>>,
    /// Harvest yield factor applied to every routed quantity
    pub yield_factor: f64,
    /// Weights of the four quality measures in the quality objective
    pub quality_weights: [f64; 4],
    /// Oil content indicator per (day, mill)
    pub oil_content: Vec<Vec<f64>>,
    /// Acidity indicator per (day, mill)
    pub acidity: Vec<Vec<f64>>,
    /// Peroxide indicator per (day, mill)
    pub peroxide: Vec<Vec<f64>>,
    /// Humidity indicator per (day, mill)
    pub humidity: Vec<Vec<f64>>,
    /// Minimum oil content accepted by a line, per (day, line)
    pub oil_content_floor: Vec<Vec<f64>>,
    /// Maximum acidity accepted by a line, per (day, line)
    pub acidity_cap: Vec<Vec<f64>>,
    /// Maximum peroxide value accepted by a line, per (day, line)
    pub peroxide_cap: Vec<Vec<f64>>,
    /// Maximum humidity accepted by a line, per (day, line)
    pub humidity_cap: Vec<Vec<f64>>,
    /// Unit sale price per (day, line)
    pub price: Vec<Vec<f64>>,
    /// Oil extraction rate per (day, mill)
    pub extraction_rate: Vec<Vec<f64>>,
    /// Processing cost per (day, mill, line)
    pub processing_cost: Vec<Vec<Vec<f64>>>,
    /// Disposal cost of rejected residual per mill
    pub rejection_cost: Vec<f64>,
    /// OMW liquid handling cost per line
    pub liquid_cost: Vec<f64>,
    /// Emission cost per mill
    pub emission_cost: Vec<f64>,
    /// Ceiling on the valorized fraction per (day, mill, line)
    pub valorized_cap: Vec<Vec<Vec<f64>>>,
    /// Emission cap per mill
    pub emission_cap: Vec<f64>,
    /// Waste buffer shared by all mills on a day
    pub daily_buffer: Vec<f64>,
    /// Throughput cap per line
    pub line_capacity: Vec<f64>,
    /// Lower quantity bound per (day, line)
    pub line_quantity_min: Vec<Vec<f64>>,
    /// Upper quantity bound per (day, line)
    pub line_quantity_max: Vec<Vec<f64>>,
    /// Lower quantity bound per (day, route)
    pub route_quantity_min: Vec<Vec<f64>>,
    /// Upper quantity bound per (day, route)
    pub route_quantity_max: Vec<Vec<f64>>,
    /// Big-M constant linking processed quantity to the active line, per mill
    pub big_m: Vec<f64>,
    /// Loading rate per mill, in quantity per occupied slot
    pub loading_rate: Vec<f64>,
    /// Terminal line assignment of each route
    pub terminal_line: Vec<usize>,
}

/// Construction-time failures raised before any solve is attempted. Each
/// variant names the offending set or parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceError {
    /// One of the fundamental index sets is empty
    EmptySet(&'static str),
    /// A day has no time slots
    EmptyDay(usize),
    /// A route has no permitted start slots
    EmptyStartSlots(usize),
    /// A parameter table does not match the dimensions of the index sets
    DimensionMismatch {
        parameter: &'static str,
        expected: usize,
        actual: usize,
    },
    /// A slot index appears in more than one day
    DuplicateSlot(usize),
    /// A route references a start slot that belongs to no day
    UnknownStartSlot { route: usize, slot: usize },
    /// A route's terminal line is out of range
    UnknownTerminalLine { route: usize, line: usize },
}

impl fmt::Display for InstanceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceError::EmptySet(name) => write!(f, "index set `{}` is empty", name),
            InstanceError::EmptyDay(day) => write!(f, "day {} has no time slots", day),
            InstanceError::EmptyStartSlots(route) => {
                write!(f, "route {} has no permitted start slots", route)
            }
            InstanceError::DimensionMismatch {
                parameter,
                expected,
                actual,
            } => write!(
                f,
                "parameter `{}` has the wrong dimension: expected {}, got {}",
                parameter, expected, actual
            ),
            InstanceError::DuplicateSlot(slot) => {
                write!(f, "slot {} appears in more than one day", slot)
            }
            InstanceError::UnknownStartSlot { route, slot } => {
                write!(f, "route {} may start at slot {}, which no day contains", route, slot)
            }
            InstanceError::UnknownTerminalLine { route, line } => {
                write!(f, "route {} is terminally assigned to unknown line {}", route, line)
            }
        }
    }
}

impl std::error::Error for InstanceError {}

fn check(parameter: &'static str, actual: usize, expected: usize) -> Result<(), InstanceError> {
    if actual != expected {
        return Err(InstanceError::DimensionMismatch {
            parameter,
            expected,
            actual,
        });
    }
    Ok(())
}

fn check_matrix(
    parameter: &'static str,
    table: &[Vec<f64>],
    rows: usize,
    cols: usize,
) -> Result<(), InstanceError> {
    check(parameter, table.len(), rows)?;
    for row in table {
        check(parameter, row.len(), cols)?;
    }
    Ok(())
}

fn check_cube(
    parameter: &'static str,
    table: &[Vec<Vec<f64>>],
    a: usize,
    b: usize,
    c: usize,
) -> Result<(), InstanceError> {
    check(parameter, table.len(), a)?;
    for plane in table {
        check(parameter, plane.len(), b)?;
        for row in plane {
            check(parameter, row.len(), c)?;
        }
    }
    Ok(())
}

impl Instance {
    /// Checks that every parameter table matches the dimensions implied by the
    /// index sets, and that all cross-references (start slots, terminal lines)
    /// resolve. Called before model construction so that a malformed instance
    /// fails with an identifiable cause instead of producing a wrong model.
    pub fn validate(&self) -> Result<(), InstanceError> {
        for (name, len) in [
            ("days", self.days),
            ("mills", self.mills),
            ("lines", self.lines),
            ("routes", self.routes),
        ] {
            if len == 0 {
                return Err(InstanceError::EmptySet(name));
            }
        }

        check("slots", self.slots.len(), self.days)?;
        let mut seen = HashSet::new();
        for (day, slots) in self.slots.iter().enumerate() {
            if slots.is_empty() {
                return Err(InstanceError::EmptyDay(day));
            }
            for &slot in slots {
                if !seen.insert(slot) {
                    return Err(InstanceError::DuplicateSlot(slot));
                }
            }
        }

        check("start_slots", self.start_slots.len(), self.routes)?;
        for (route, slots) in self.start_slots.iter().enumerate() {
            if slots.is_empty() {
                return Err(InstanceError::EmptyStartSlots(route));
            }
            for &slot in slots {
                if !seen.contains(&slot) {
                    return Err(InstanceError::UnknownStartSlot { route, slot });
                }
            }
        }

        check_matrix("oil_content", &self.oil_content, self.days, self.mills)?;
        check_matrix("acidity", &self.acidity, self.days, self.mills)?;
        check_matrix("peroxide", &self.peroxide, self.days, self.mills)?;
        check_matrix("humidity", &self.humidity, self.days, self.mills)?;
        check_matrix("extraction_rate", &self.extraction_rate, self.days, self.mills)?;

        check_matrix("oil_content_floor", &self.oil_content_floor, self.days, self.lines)?;
        check_matrix("acidity_cap", &self.acidity_cap, self.days, self.lines)?;
        check_matrix("peroxide_cap", &self.peroxide_cap, self.days, self.lines)?;
        check_matrix("humidity_cap", &self.humidity_cap, self.days, self.lines)?;
        check_matrix("price", &self.price, self.days, self.lines)?;
        check_matrix("line_quantity_min", &self.line_quantity_min, self.days, self.lines)?;
        check_matrix("line_quantity_max", &self.line_quantity_max, self.days, self.lines)?;

        check_cube("processing_cost", &self.processing_cost, self.days, self.mills, self.lines)?;
        check_cube("valorized_cap", &self.valorized_cap, self.days, self.mills, self.lines)?;

        check("rejection_cost", self.rejection_cost.len(), self.mills)?;
        check("emission_cost", self.emission_cost.len(), self.mills)?;
        check("emission_cap", self.emission_cap.len(), self.mills)?;
        check("big_m", self.big_m.len(), self.mills)?;
        check("loading_rate", self.loading_rate.len(), self.mills)?;

        check("liquid_cost", self.liquid_cost.len(), self.lines)?;
        check("line_capacity", self.line_capacity.len(), self.lines)?;

        check("daily_buffer", self.daily_buffer.len(), self.days)?;

        check_matrix("route_quantity_min", &self.route_quantity_min, self.days, self.routes)?;
        check_matrix("route_quantity_max", &self.route_quantity_max, self.days, self.routes)?;

        check("terminal_line", self.terminal_line.len(), self.routes)?;
        for (route, &line) in self.terminal_line.iter().enumerate() {
            if line >= self.lines {
                return Err(InstanceError::UnknownTerminalLine { route, line });
            }
        }

        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::test_fixtures::toy;
    use super::*;

    #[test]
    fn toy_instance_is_valid() {
        assert_eq!(toy().validate(), Ok(()));
    }

    #[test]
    fn empty_sets_are_rejected() {
        let mut instance = toy();
        instance.routes = 0;
        assert_eq!(instance.validate(), Err(InstanceError::EmptySet("routes")));
    }

    #[test]
    fn dimension_mismatch_names_the_parameter() {
        let mut instance = toy();
        instance.acidity = vec![];
        assert_eq!(
            instance.validate(),
            Err(InstanceError::DimensionMismatch {
                parameter: "acidity",
                expected: 1,
                actual: 0,
            })
        );
    }

    #[test]
    fn days_without_slots_are_rejected() {
        let mut instance = toy();
        instance.slots = vec![vec![]];
        assert_eq!(instance.validate(), Err(InstanceError::EmptyDay(0)));
    }

    #[test]
    fn duplicate_slots_are_rejected() {
        let mut instance = toy();
        instance.slots = vec![vec![0, 0]];
        assert_eq!(instance.validate(), Err(InstanceError::DuplicateSlot(0)));
    }

    #[test]
    fn unknown_start_slot_is_rejected() {
        let mut instance = toy();
        instance.start_slots = vec![vec![7]];
        assert_eq!(
            instance.validate(),
            Err(InstanceError::UnknownStartSlot { route: 0, slot: 7 })
        );
    }

    #[test]
    fn terminal_line_out_of_range_is_rejected() {
        let mut instance = toy();
        instance.terminal_line = vec![3];
        assert_eq!(
            instance.validate(),
            Err(InstanceError::UnknownTerminalLine { route: 0, line: 3 })
        );
    }
}
