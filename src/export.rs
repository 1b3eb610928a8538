use std::io::{self, Write};

use itertools::Itertools;

use crate::pareto::FrontPoint;

/// Writes the front as CSV, one row of realized objective values per
/// retained point.
pub fn write_front<W: Write>(out: &mut W, points: &[FrontPoint]) -> io::Result<()> {
    writeln!(out, "Z1,Z2,Z3")?;
    for point in points {
        writeln!(
            out,
            "{},{},{}",
            point.environment, point.quality, point.profit
        )?;
    }
    Ok(())
}

/// One column per mill, one row per point, carrying the processed quantity.
pub fn write_mill_series<W: Write>(out: &mut W, points: &[FrontPoint]) -> io::Result<()> {
    let mills = points.first().map_or(0, |p| p.quantity_by_mill.len());
    writeln!(out, "{}", (0..mills).map(|f| format!("mill_{}", f)).join(","))?;
    for point in points {
        writeln!(
            out,
            "{}",
            point.quantity_by_mill.iter().map(|q| q.to_string()).join(",")
        )?;
    }
    Ok(())
}

/// One column per day, one row per point, carrying the processed quantity.
pub fn write_day_series<W: Write>(out: &mut W, points: &[FrontPoint]) -> io::Result<()> {
    let days = points.first().map_or(0, |p| p.quantity_by_day.len());
    writeln!(out, "{}", (0..days).map(|d| format!("day_{}", d)).join(","))?;
    for point in points {
        writeln!(
            out,
            "{}",
            point.quantity_by_day.iter().map(|q| q.to_string()).join(",")
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points() -> Vec<FrontPoint> {
        vec![
            FrontPoint {
                environment: 2.5,
                quality: 14.0,
                profit: 45.0,
                quantity_by_mill: vec![20.0].into(),
                quantity_by_day: vec![20.0].into(),
            },
            FrontPoint {
                environment: 0.0,
                quality: 14.0,
                profit: 50.0,
                quantity_by_mill: vec![20.0].into(),
                quantity_by_day: vec![20.0].into(),
            },
        ]
    }

    fn rendered<F: Fn(&mut Vec<u8>, &[FrontPoint]) -> io::Result<()>>(write: F) -> String {
        let mut out = Vec::new();
        write(&mut out, &points()).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn front_rows_carry_the_objective_values() {
        assert_eq!(
            rendered(|out, points| write_front(out, points)),
            "Z1,Z2,Z3\n2.5,14,45\n0,14,50\n"
        );
    }

    #[test]
    fn mill_series_has_one_column_per_mill() {
        assert_eq!(
            rendered(|out, points| write_mill_series(out, points)),
            "mill_0\n20\n20\n"
        );
    }

    #[test]
    fn day_series_has_one_column_per_day() {
        assert_eq!(
            rendered(|out, points| write_day_series(out, points)),
            "day_0\n20\n20\n"
        );
    }

    #[test]
    fn empty_fronts_still_produce_the_header() {
        let mut out = Vec::new();
        write_front(&mut out, &[]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Z1,Z2,Z3\n");
    }
}
