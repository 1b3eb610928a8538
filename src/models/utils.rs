use grb::prelude::*;
use std::collections::HashMap;
use std::hash::Hash;
use std::ops::Range;

/// A semantic index tuple used as the key of a variable container. The label
/// is the underscore-joined list of the raw indices, so together with a
/// distinct base name per variable family every solver-side variable name is
/// unique.
pub trait VarKey: Copy + Eq + Hash {
    fn label(&self) -> String;
}

impl<A, B> VarKey for (A, B)
where
    A: Copy + Eq + Hash + Into<usize>,
    B: Copy + Eq + Hash + Into<usize>,
{
    fn label(&self) -> String {
        format!("{}_{}", self.0.into(), self.1.into())
    }
}

impl<A, B, C> VarKey for (A, B, C)
where
    A: Copy + Eq + Hash + Into<usize>,
    B: Copy + Eq + Hash + Into<usize>,
    C: Copy + Eq + Hash + Into<usize>,
{
    fn label(&self) -> String {
        format!("{}_{}_{}", self.0.into(), self.1.into(), self.2.into())
    }
}

impl<A, B, C, D> VarKey for (A, B, C, D)
where
    A: Copy + Eq + Hash + Into<usize>,
    B: Copy + Eq + Hash + Into<usize>,
    C: Copy + Eq + Hash + Into<usize>,
    D: Copy + Eq + Hash + Into<usize>,
{
    fn label(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            self.0.into(),
            self.1.into(),
            self.2.into(),
            self.3.into()
        )
    }
}

impl<A, B, C, D, E> VarKey for (A, B, C, D, E)
where
    A: Copy + Eq + Hash + Into<usize>,
    B: Copy + Eq + Hash + Into<usize>,
    C: Copy + Eq + Hash + Into<usize>,
    D: Copy + Eq + Hash + Into<usize>,
    E: Copy + Eq + Hash + Into<usize>,
{
    fn label(&self) -> String {
        format!(
            "{}_{}_{}_{}_{}",
            self.0.into(),
            self.1.into(),
            self.2.into(),
            self.3.into(),
            self.4.into()
        )
    }
}

/// Create one variable per key and collect them into a map. The key set is
/// given explicitly because most families are sparse in the index product
/// (spans within a day, permitted start slots).
pub fn vars<K: VarKey>(
    keys: Vec<K>,
    model: &mut Model,
    base_name: &str,
    vtype: VarType,
    bounds: &Range<f64>,
) -> grb::Result<HashMap<K, Var>> {
    let mut out = HashMap::with_capacity(keys.len());
    for key in keys {
        let var = model.add_var(
            &format!("{}_{}", base_name, key.label()),
            vtype,
            0.0,
            bounds.start,
            bounds.end,
            std::iter::empty(),
        )?;
        out.insert(key, var);
    }
    Ok(out)
}

/// Binary variables
pub fn binary<K: VarKey>(
    keys: Vec<K>,
    model: &mut Model,
    base_name: &str,
) -> grb::Result<HashMap<K, Var>> {
    vars(
        keys,
        model,
        base_name,
        VarType::Binary,
        &(f64::NEG_INFINITY..f64::INFINITY),
    )
}

/// Continuous non-negative variables
pub fn cont<K: VarKey>(
    keys: Vec<K>,
    model: &mut Model,
    base_name: &str,
) -> grb::Result<HashMap<K, Var>> {
    vars(
        keys,
        model,
        base_name,
        VarType::Continuous,
        &(0.0..f64::INFINITY),
    )
}

/// Trait that converts gurobi variables to f64
pub trait ConvertVars {
    type Out;
    fn convert(&self, model: &Model) -> grb::Result<Self::Out>;
}

impl ConvertVars for Var {
    type Out = f64;

    fn convert(&self, model: &Model) -> grb::Result<Self::Out> {
        model.get_obj_attr(attr::X, self)
    }
}

impl<K: VarKey, T: ConvertVars> ConvertVars for HashMap<K, T> {
    type Out = HashMap<K, T::Out>;

    fn convert(&self, model: &Model) -> grb::Result<Self::Out> {
        let mut out = HashMap::with_capacity(self.len());
        for (k, v) in self {
            out.insert(*k, v.convert(model)?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::harvest::sets_and_parameters::{DayIndex, MillIndex, SlotIndex};

    #[test]
    fn labels_join_indices_with_underscores() {
        let key = (DayIndex::from(3), MillIndex::from(7));
        assert_eq!(key.label(), "3_7");

        let key = (SlotIndex::from(0), SlotIndex::from(2), MillIndex::from(1));
        assert_eq!(key.label(), "0_2_1");
    }

    #[test]
    fn labels_are_injective_over_distinct_keys() {
        let a = (DayIndex::from(1), MillIndex::from(12)).label();
        let b = (DayIndex::from(11), MillIndex::from(2)).label();
        assert_ne!(a, b);
    }
}
