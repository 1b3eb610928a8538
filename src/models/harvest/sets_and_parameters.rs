use std::collections::HashMap;

use derive_more::{Deref, From, Into};
use typed_index_collections::TiVec;

use crate::instance::Instance;

#[derive(Deref, Debug, PartialEq, Eq, PartialOrd, From, Into, Clone, Copy, Hash)]
pub struct DayIndex(usize);

#[derive(Deref, Debug, PartialEq, Eq, PartialOrd, From, Into, Clone, Copy, Hash)]
pub struct MillIndex(usize);

#[derive(Deref, Debug, PartialEq, Eq, PartialOrd, From, Into, Clone, Copy, Hash)]
pub struct LineIndex(usize);

#[derive(Deref, Debug, PartialEq, Eq, PartialOrd, From, Into, Clone, Copy, Hash)]
pub struct RouteIndex(usize);

#[derive(Deref, Debug, PartialEq, Eq, PartialOrd, From, Into, Clone, Copy, Hash)]
pub struct SlotIndex(usize);

#[allow(non_snake_case)]
pub struct Sets {
    /// Planning days
    pub D: Vec<DayIndex>,
    /// Processing mills
    pub F: Vec<MillIndex>,
    /// Processing lines
    pub P: Vec<LineIndex>,
    /// Collection routes
    pub C: Vec<RouteIndex>,
    /// Time slots of each day, in increasing order
    pub I_d: TiVec<DayIndex, Vec<SlotIndex>>,
    /// Slots at which each route may start loading, in increasing order
    pub I_c0: TiVec<RouteIndex, Vec<SlotIndex>>,
    /// The day that owns each slot
    pub day_of_slot: HashMap<SlotIndex, DayIndex>,
}

#[allow(non_snake_case)]
impl Sets {
    pub fn new(instance: &Instance) -> Sets {
        let I_d: TiVec<DayIndex, Vec<SlotIndex>> = instance
            .slots
            .iter()
            .map(|slots| {
                let mut slots: Vec<SlotIndex> = slots.iter().map(|&i| i.into()).collect();
                slots.sort_unstable_by_key(|i| **i);
                slots
            })
            .collect::<Vec<_>>()
            .into();

        let I_c0: TiVec<RouteIndex, Vec<SlotIndex>> = instance
            .start_slots
            .iter()
            .map(|slots| {
                let mut slots: Vec<SlotIndex> = slots.iter().map(|&i| i.into()).collect();
                slots.sort_unstable_by_key(|i| **i);
                slots
            })
            .collect::<Vec<_>>()
            .into();

        let mut day_of_slot = HashMap::new();
        for (d, slots) in I_d.iter_enumerated() {
            for &i in slots {
                day_of_slot.insert(i, d);
            }
        }

        Sets {
            D: (0..instance.days).map(DayIndex::from).collect(),
            F: (0..instance.mills).map(MillIndex::from).collect(),
            P: (0..instance.lines).map(LineIndex::from).collect(),
            C: (0..instance.routes).map(RouteIndex::from).collect(),
            I_d,
            I_c0,
            day_of_slot,
        }
    }
}

fn matrix<R, C>(table: &[Vec<f64>]) -> TiVec<R, TiVec<C, f64>> {
    table
        .iter()
        .map(|row| row.clone().into())
        .collect::<Vec<TiVec<C, f64>>>()
        .into()
}

fn cube<A, B, C>(table: &[Vec<Vec<f64>>]) -> TiVec<A, TiVec<B, TiVec<C, f64>>> {
    table
        .iter()
        .map(|plane| matrix(plane))
        .collect::<Vec<_>>()
        .into()
}

#[allow(non_snake_case)]
pub struct Parameters {
    /// Harvest yield factor applied to every processed quantity
    pub alpha: f64,
    /// Weights of oil content, acidity, peroxide and humidity in the quality measure
    pub omega: [f64; 4],
    /// Oil content of the fruit arriving at mill f on day d
    pub O: TiVec<DayIndex, TiVec<MillIndex, f64>>,
    /// Acidity of the fruit arriving at mill f on day d
    pub A: TiVec<DayIndex, TiVec<MillIndex, f64>>,
    /// Peroxide value of the fruit arriving at mill f on day d
    pub P: TiVec<DayIndex, TiVec<MillIndex, f64>>,
    /// Humidity of the fruit arriving at mill f on day d
    pub H: TiVec<DayIndex, TiVec<MillIndex, f64>>,
    /// Minimum oil content accepted by line p on day d
    pub O_min: TiVec<DayIndex, TiVec<LineIndex, f64>>,
    /// Maximum acidity accepted by line p on day d
    pub A_max: TiVec<DayIndex, TiVec<LineIndex, f64>>,
    /// Maximum peroxide value accepted by line p on day d
    pub P_max: TiVec<DayIndex, TiVec<LineIndex, f64>>,
    /// Maximum humidity accepted by line p on day d
    pub H_max: TiVec<DayIndex, TiVec<LineIndex, f64>>,
    /// Unit sale price of oil from line p on day d
    pub V: TiVec<DayIndex, TiVec<LineIndex, f64>>,
    /// Oil extraction rate at mill f on day d
    pub ATR: TiVec<DayIndex, TiVec<MillIndex, f64>>,
    /// Processing cost at mill f on line p on day d
    pub CP: TiVec<DayIndex, TiVec<MillIndex, TiVec<LineIndex, f64>>>,
    /// Disposal cost of rejected residual at mill f
    pub CR: TiVec<MillIndex, f64>,
    /// OMW liquid handling cost on line p
    pub CL: TiVec<LineIndex, f64>,
    /// Emission cost at mill f
    pub CE: TiVec<MillIndex, f64>,
    /// Ceiling on the valorized fraction at (d, f, p)
    pub Vmax: TiVec<DayIndex, TiVec<MillIndex, TiVec<LineIndex, f64>>>,
    /// Emission cap at mill f
    pub E: TiVec<MillIndex, f64>,
    /// Waste buffer shared by all mills on day d
    pub B_total: TiVec<DayIndex, f64>,
    /// Throughput cap of line p
    pub S: TiVec<LineIndex, f64>,
    /// Lower quantity bound of line p on day d
    pub QP_min: TiVec<DayIndex, TiVec<LineIndex, f64>>,
    /// Upper quantity bound of line p on day d
    pub QP_max: TiVec<DayIndex, TiVec<LineIndex, f64>>,
    /// Lower quantity bound of route c on day d
    pub Q_min: TiVec<DayIndex, TiVec<RouteIndex, f64>>,
    /// Upper quantity bound of route c on day d
    pub Q_max: TiVec<DayIndex, TiVec<RouteIndex, f64>>,
    /// Big-M linking processed quantity at mill f to its active line
    pub M: TiVec<MillIndex, f64>,
    /// Loading rate of mill f, in quantity per occupied slot
    pub R: TiVec<MillIndex, f64>,
    /// Terminal line assignment of each route
    pub p_c: TiVec<RouteIndex, LineIndex>,
}

#[allow(non_snake_case)]
impl Parameters {
    pub fn new(instance: &Instance) -> Parameters {
        Parameters {
            alpha: instance.yield_factor,
            omega: instance.quality_weights,
            O: matrix(&instance.oil_content),
            A: matrix(&instance.acidity),
            P: matrix(&instance.peroxide),
            H: matrix(&instance.humidity),
            O_min: matrix(&instance.oil_content_floor),
            A_max: matrix(&instance.acidity_cap),
            P_max: matrix(&instance.peroxide_cap),
            H_max: matrix(&instance.humidity_cap),
            V: matrix(&instance.price),
            ATR: matrix(&instance.extraction_rate),
            CP: cube(&instance.processing_cost),
            CR: instance.rejection_cost.clone().into(),
            CL: instance.liquid_cost.clone().into(),
            CE: instance.emission_cost.clone().into(),
            Vmax: cube(&instance.valorized_cap),
            E: instance.emission_cap.clone().into(),
            B_total: instance.daily_buffer.clone().into(),
            S: instance.line_capacity.clone().into(),
            QP_min: matrix(&instance.line_quantity_min),
            QP_max: matrix(&instance.line_quantity_max),
            Q_min: matrix(&instance.route_quantity_min),
            Q_max: matrix(&instance.route_quantity_max),
            M: instance.big_m.clone().into(),
            R: instance.loading_rate.clone().into(),
            p_c: instance.terminal_line.iter().map(|&p| LineIndex::from(p)).collect::<Vec<_>>().into(),
        }
    }
}
