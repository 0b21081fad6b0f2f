//! Pittsburgh Sleep Quality Index
//!
//! Seven 0-3 components built from banded sub-scores, summed into a 0-21 total.
//! The same instrument was fielded in four waves under different column
//! prefixes; [`PsqiLayout`] names them.

use super::banding::{
    BandLadder, DISTURBANCE_SUM, DURATION_HOURS, EFFICIENCY, LATENCY_MINUTES, PAIR_SUM,
};
use covsleep_common::interval::interval_between;
use covsleep_common::{Error, IntervalPolicy, Result, Table, Value};
use tracing::debug;

const DISTURBANCE_ITEMS: [&str; 9] = ["5b", "5c", "5d", "5e", "5f", "5g", "5h", "5i", "5j"];

/// Column naming of one PSQI administration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PsqiLayout {
    /// Prefix of the item columns (`psqi_`)
    pub item_prefix: &'static str,
    /// Prefix of the derived component columns
    pub out_prefix: &'static str,
    /// Prefix of the time-in-bed columns
    pub tib_prefix: &'static str,
}

pub const ROUND1: PsqiLayout = PsqiLayout {
    item_prefix: "psqi_",
    out_prefix: "",
    tib_prefix: "",
};

pub const ROUND4: PsqiLayout = PsqiLayout {
    item_prefix: "fall_psqi_",
    out_prefix: "fall_",
    tib_prefix: "fall_",
};

pub const ROUND5: PsqiLayout = PsqiLayout {
    item_prefix: "psqi_",
    out_prefix: "Feb21_",
    tib_prefix: "",
};

pub const ROUND8: PsqiLayout = PsqiLayout {
    item_prefix: "psqi_",
    out_prefix: "Oct21_",
    tib_prefix: "Oct21_",
};

impl PsqiLayout {
    pub fn item(&self, suffix: &str) -> String {
        format!("{}{}", self.item_prefix, suffix)
    }

    pub fn output(&self, name: &str) -> String {
        format!("{}{}", self.out_prefix, name)
    }

    pub fn tib(&self) -> String {
        format!("{}PSQI_TIB", self.tib_prefix)
    }

    pub fn tib_flag(&self) -> String {
        format!("{}PSQI_TIB_12", self.tib_prefix)
    }

    pub fn efficiency(&self) -> String {
        self.output("PSQI_sleep_eff")
    }

    pub fn total(&self) -> String {
        self.output("PSQI_TOTAL")
    }

    /// Items whose 1-based codes are shifted to start at 0
    pub fn coded_items(&self) -> Vec<String> {
        let mut items: Vec<String> = ["5a"]
            .iter()
            .chain(DISTURBANCE_ITEMS.iter())
            .chain(["6", "7", "8", "9"].iter())
            .map(|s| self.item(s))
            .collect();
        items.dedup();
        items
    }

    /// Bedtime and out-of-bed clock items
    pub fn clock_items(&self) -> [String; 2] {
        [self.item("1"), self.item("3")]
    }
}

fn band(ladder: &BandLadder, value: Option<f64>) -> Option<f64> {
    value.and_then(|v| ladder.band(v))
}

fn sum(values: &[Option<f64>]) -> Option<f64> {
    values.iter().copied().sum()
}

/// Derived PSQI columns of one row
#[derive(Debug, Clone, Default, PartialEq)]
struct Components {
    duration: Option<f64>,
    disturbance: Option<f64>,
    latency_minutes: Option<f64>,
    latency: Option<f64>,
    dysfunction: Option<f64>,
    tib: Option<f64>,
    tib_flag: f64,
    efficiency: Option<f64>,
    efficiency_band: Option<f64>,
    quality: Option<f64>,
    medication: Option<f64>,
    total: Option<f64>,
}

/// Force item 5j to 0 when it or its free-text companion is missing
fn fill_other_disturbance(table: &mut Table, layout: &PsqiLayout) -> Result<()> {
    let item = layout.item("5j");
    let text = layout.item("5j2");
    let companions = table.column_values(&text)?;
    let mut values = table.column_values(&item)?;
    for (value, companion) in values.iter_mut().zip(&companions) {
        if value.is_missing() || companion.is_missing() {
            *value = Value::Number(0.0);
        }
    }
    table.set_column(&item, values)
}

fn components(table: &Table, layout: &PsqiLayout, row: usize) -> Result<Components> {
    let n = |suffix: &str| table.number(row, &layout.item(suffix));
    let hours_asleep = n("4")?;

    let disturbance_items = DISTURBANCE_ITEMS
        .iter()
        .map(|&s| n(s))
        .collect::<Result<Vec<_>>>()?;
    let latency_minutes = band(&LATENCY_MINUTES, n("2")?);

    let interval = interval_between(
        table.clock(row, &layout.item("1"))?,
        table.clock(row, &layout.item("3"))?,
        IntervalPolicy::TIME_IN_BED,
    )?;
    let tib = interval.duration_hours;
    let efficiency = match (hours_asleep, tib) {
        (Some(asleep), Some(bed)) if bed > 0.0 => Some(asleep / bed).filter(|e| *e <= 1.0),
        _ => None,
    };

    let mut c = Components {
        duration: band(&DURATION_HOURS, hours_asleep),
        disturbance: band(&DISTURBANCE_SUM, sum(&disturbance_items)),
        latency_minutes,
        latency: band(&PAIR_SUM, sum(&[latency_minutes, n("5a")?])),
        dysfunction: band(&PAIR_SUM, sum(&[n("8")?, n("9")?])),
        tib,
        tib_flag: interval.correction_flag(),
        efficiency,
        efficiency_band: band(&EFFICIENCY, efficiency),
        quality: n("6")?,
        medication: n("7")?,
        total: None,
    };
    c.total = sum(&[
        c.duration,
        c.disturbance,
        c.latency,
        c.dysfunction,
        c.efficiency_band,
        c.quality,
        c.medication,
    ]);
    if let Some(total) = c.total {
        if !(0.0..=21.0).contains(&total) {
            return Err(Error::invariant(format!(
                "{}.{} row {}: total {} outside [0, 21]",
                table.name(),
                layout.total(),
                row,
                total
            )));
        }
    }
    Ok(c)
}

/// Add every PSQI component, time in bed, efficiency and the total
pub fn score(table: &mut Table, layout: &PsqiLayout) -> Result<()> {
    fill_other_disturbance(table, layout)?;

    let rows = (0..table.len())
        .map(|row| components(table, layout, row))
        .collect::<Result<Vec<_>>>()?;

    let column = |f: fn(&Components) -> Option<f64>| -> Vec<Value> {
        rows.iter().map(|c| Value::from_option(f(c))).collect()
    };
    let outputs: Vec<(String, Vec<Value>)> = vec![
        (layout.output("PSQIDURAT"), column(|c| c.duration)),
        (layout.output("PSQIDISTB"), column(|c| c.disturbance)),
        (layout.output("psqi_2NEW"), column(|c| c.latency_minutes)),
        (layout.output("PSQILATEN"), column(|c| c.latency)),
        (layout.output("PSQIDAYDYS"), column(|c| c.dysfunction)),
        (layout.tib(), column(|c| c.tib)),
        (layout.tib_flag(), column(|c| Some(c.tib_flag))),
        (layout.efficiency(), column(|c| c.efficiency)),
        (layout.output("PSQIHSE"), column(|c| c.efficiency_band)),
        (layout.output("PSQISLPQUAL"), column(|c| c.quality)),
        (layout.output("PSQIMEDS"), column(|c| c.medication)),
        (layout.total(), column(|c| c.total)),
    ];
    for (name, values) in outputs {
        table.set_column(&name, values)?;
    }
    debug!(table = table.name(), prefix = layout.out_prefix, "Scored PSQI");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn psqi_table(values: &[(&str, &str)]) -> Table {
        let mut columns: Vec<String> = ["1", "2", "3", "4", "5a", "5j2", "6", "7", "8", "9"]
            .iter()
            .chain(DISTURBANCE_ITEMS.iter())
            .map(|s| format!("psqi_{}", s))
            .collect();
        columns.dedup();
        let row = columns
            .iter()
            .map(|c| {
                values
                    .iter()
                    .find(|(k, _)| format!("psqi_{}", k) == *c)
                    .map_or(Value::from_raw("0"), |(_, v)| Value::from_raw(v))
            })
            .collect();
        Table::from_rows("r1", columns, vec![row]).unwrap()
    }

    #[test]
    fn test_components_and_total() {
        let mut t = psqi_table(&[
            ("1", "23:00"),
            ("3", "7:00"),
            ("4", "6.5"),
            ("2", "45"),
            ("5a", "1"),
            ("5b", "2"),
            ("5j2", ""),
            ("6", "1"),
            ("7", "0"),
            ("8", "1"),
            ("9", "1"),
        ]);
        score(&mut t, &ROUND1).unwrap();
        assert_eq!(t.number(0, "PSQIDURAT").unwrap(), Some(1.0));
        assert_eq!(t.number(0, "psqi_2NEW").unwrap(), Some(2.0));
        assert_eq!(t.number(0, "PSQILATEN").unwrap(), Some(2.0));
        assert_eq!(t.number(0, "PSQIDISTB").unwrap(), Some(1.0));
        assert_eq!(t.number(0, "PSQIDAYDYS").unwrap(), Some(1.0));
        assert_eq!(t.number(0, "PSQI_TIB").unwrap(), Some(8.0));
        assert_eq!(t.number(0, "PSQI_sleep_eff").unwrap(), Some(6.5 / 8.0));
        assert_eq!(t.number(0, "PSQIHSE").unwrap(), Some(1.0));
        assert_eq!(t.number(0, "PSQI_TOTAL").unwrap(), Some(7.0));
        assert_eq!(t.number(0, "psqi_5j").unwrap(), Some(0.0));
    }

    #[test]
    fn test_missing_item_gives_missing_total() {
        let mut t = psqi_table(&[("1", "23:00"), ("3", "7:00"), ("4", "8"), ("6", "")]);
        score(&mut t, &ROUND1).unwrap();
        assert_eq!(t.number(0, "PSQIDURAT").unwrap(), Some(0.0));
        assert_eq!(t.number(0, "PSQISLPQUAL").unwrap(), None);
        assert_eq!(t.number(0, "PSQI_TOTAL").unwrap(), None);
    }

    #[test]
    fn test_efficiency_above_one_is_missing() {
        let mut t = psqi_table(&[("1", "23:00"), ("3", "5:00"), ("4", "7")]);
        score(&mut t, &ROUND1).unwrap();
        assert_eq!(t.number(0, "PSQI_TIB").unwrap(), Some(6.0));
        assert_eq!(t.number(0, "PSQI_sleep_eff").unwrap(), None);
        assert_eq!(t.number(0, "PSQIHSE").unwrap(), None);
    }

    #[test]
    fn test_layout_names() {
        assert_eq!(ROUND5.tib(), "PSQI_TIB");
        assert_eq!(ROUND5.total(), "Feb21_PSQI_TOTAL");
        assert_eq!(ROUND4.item("5j2"), "fall_psqi_5j2");
        assert_eq!(ROUND8.tib_flag(), "Oct21_PSQI_TIB_12");
        assert_eq!(ROUND1.coded_items().len(), 14);
    }
}
