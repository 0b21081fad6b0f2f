//! Munich Chronotype Questionnaire
//!
//! Work-day and free-day sleep onset/end are copied under a wave prefix, then
//! durations, midpoints, the weekly average and the sleep-corrected free-day
//! midpoint (chronotype) are derived from them.

use covsleep_common::interval::{average_weekly_duration, chronotype, interval_between, midpoint_between};
use covsleep_common::{IntervalPolicy, Result, Table, Value};
use tracing::debug;

/// Source columns and output prefix of one MCTQ administration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MctqLayout {
    pub prefix: &'static str,
    pub workdays: &'static str,
    pub work_onset: &'static str,
    pub work_end: &'static str,
    pub free_onset: &'static str,
    pub free_end: &'static str,
}

pub const ROUND1_PRE: MctqLayout = MctqLayout {
    prefix: "mtq_precovid_",
    workdays: "mtq_p2",
    work_onset: "mtq_p3",
    work_end: "mtq_p4",
    free_onset: "mtq_p5",
    free_end: "mtq_p6",
};

pub const ROUND1_POST: MctqLayout = MctqLayout {
    prefix: "mtq_postcovid_",
    workdays: "mtq_2",
    work_onset: "mtq_3",
    work_end: "mtq_4",
    free_onset: "mtq_5",
    free_end: "mtq_6",
};

pub const ROUND4: MctqLayout = MctqLayout {
    prefix: "fall_mtq_",
    workdays: "fall_mtq_2",
    work_onset: "fall_mtq_3",
    work_end: "fall_mtq_4",
    free_onset: "fall_mtq_5",
    free_end: "fall_mtq_6",
};

pub const ROUND5: MctqLayout = MctqLayout {
    prefix: "Feb21_mtq_",
    workdays: "mtq_2",
    work_onset: "mtq_3",
    work_end: "mtq_p8",
    free_onset: "mtq_p9",
    free_end: "mtq_p10",
};

pub const ROUND8: MctqLayout = MctqLayout {
    prefix: "Oct21_mtq_",
    ..ROUND5
};

impl MctqLayout {
    pub fn output(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    /// Clock-typed source columns
    pub fn clock_items(&self) -> [&'static str; 4] {
        [self.work_onset, self.work_end, self.free_onset, self.free_end]
    }
}

struct DaySleep {
    duration: Vec<Option<f64>>,
    flag: Vec<f64>,
    midpoint: Vec<Option<covsleep_common::ClockTime>>,
}

fn day_sleep(table: &Table, onset: &str, end: &str) -> Result<DaySleep> {
    let mut day = DaySleep {
        duration: Vec::with_capacity(table.len()),
        flag: Vec::with_capacity(table.len()),
        midpoint: Vec::with_capacity(table.len()),
    };
    for row in 0..table.len() {
        let on = table.clock(row, onset)?;
        let off = table.clock(row, end)?;
        let interval = interval_between(on, off, IntervalPolicy::SLEEP_PERIOD)?;
        day.duration.push(interval.duration_hours);
        day.flag.push(interval.correction_flag());
        day.midpoint
            .push(midpoint_between(on, off, IntervalPolicy::SLEEP_PERIOD)?);
    }
    Ok(day)
}

fn numbers(values: &[Option<f64>]) -> Vec<Value> {
    values.iter().map(|v| Value::from_option(*v)).collect()
}

/// Add the copied inputs and every derived MCTQ column
pub fn score(table: &mut Table, layout: &MctqLayout) -> Result<()> {
    let copies = [
        (layout.workdays, "workdays"),
        (layout.work_onset, "workday_sleeponset"),
        (layout.work_end, "workday_sleepend"),
        (layout.free_onset, "freeday_sleeponset"),
        (layout.free_end, "freeday_sleepend"),
    ];
    for (source, name) in copies {
        let values = table.column_values(source)?;
        table.set_column(&layout.output(name), values)?;
    }

    let workdays = table.numbers(layout.workdays)?;
    let freedays: Vec<Option<f64>> = workdays.iter().map(|w| w.map(|w| 7.0 - w)).collect();
    let work = day_sleep(table, layout.work_onset, layout.work_end)?;
    let free = day_sleep(table, layout.free_onset, layout.free_end)?;

    let average: Vec<Option<f64>> = (0..table.len())
        .map(|i| average_weekly_duration(work.duration[i], free.duration[i], workdays[i]))
        .collect();
    let chronotypes: Vec<Value> = (0..table.len())
        .map(|i| Value::from_option(chronotype(free.midpoint[i], work.duration[i], free.duration[i])))
        .collect();

    table.set_column(&layout.output("freedays"), numbers(&freedays))?;
    table.set_column(&layout.output("workday_sleepduration"), numbers(&work.duration))?;
    table.set_column(
        &layout.output("workday_sleepduration_12"),
        work.flag.iter().map(|f| Value::from(*f)).collect(),
    )?;
    table.set_column(&layout.output("freeday_sleepduration"), numbers(&free.duration))?;
    table.set_column(
        &layout.output("freeday_sleepduration_12"),
        free.flag.iter().map(|f| Value::from(*f)).collect(),
    )?;
    table.set_column(
        &layout.output("workday_sleepmidpoint"),
        work.midpoint.iter().map(|m| Value::from_option(*m)).collect(),
    )?;
    table.set_column(
        &layout.output("freeday_sleepmidpoint"),
        free.midpoint.iter().map(|m| Value::from_option(*m)).collect(),
    )?;
    table.set_column(&layout.output("avg_wk_sleepduration"), numbers(&average))?;
    table.set_column(&layout.output("chronotype"), chronotypes)?;

    debug!(table = table.name(), prefix = layout.prefix, "Scored MCTQ");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use covsleep_common::ClockTime;

    fn table(rows: &[[&str; 5]]) -> Table {
        Table::from_rows(
            "r4",
            ["fall_mtq_2", "fall_mtq_3", "fall_mtq_4", "fall_mtq_5", "fall_mtq_6"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            rows.iter()
                .map(|r| r.iter().map(|v| Value::from_raw(v)).collect())
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_weekly_average_and_chronotype() {
        let mut t = table(&[["5", "23:00", "7:00", "0:00", "10:00"]]);
        score(&mut t, &ROUND4).unwrap();
        assert_eq!(t.number(0, "fall_mtq_freedays").unwrap(), Some(2.0));
        assert_eq!(t.number(0, "fall_mtq_workday_sleepduration").unwrap(), Some(8.0));
        assert_eq!(t.number(0, "fall_mtq_freeday_sleepduration").unwrap(), Some(10.0));
        assert_eq!(
            t.number(0, "fall_mtq_avg_wk_sleepduration").unwrap(),
            Some((8.0 * 5.0 + 10.0 * 2.0) / 7.0)
        );
        assert_eq!(
            t.clock(0, "fall_mtq_freeday_sleepmidpoint").unwrap(),
            Some(ClockTime::from_hms(5, 0, 0).unwrap())
        );
        // 05:00 moved back by half of the 2h oversleep
        assert_eq!(
            t.clock(0, "fall_mtq_chronotype").unwrap(),
            Some(ClockTime::from_hms(4, 0, 0).unwrap())
        );
        assert_eq!(t.number(0, "fall_mtq_workdays").unwrap(), Some(5.0));
    }

    #[test]
    fn test_missing_endpoint() {
        let mut t = table(&[["5", "", "7:00", "0:00", "10:00"]]);
        score(&mut t, &ROUND4).unwrap();
        assert_eq!(t.number(0, "fall_mtq_workday_sleepduration").unwrap(), None);
        assert_eq!(t.number(0, "fall_mtq_avg_wk_sleepduration").unwrap(), None);
        // Without a work-day duration the free-day midpoint is used as is
        assert_eq!(
            t.clock(0, "fall_mtq_chronotype").unwrap(),
            Some(ClockTime::from_hms(5, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_round8_shares_round5_columns() {
        assert_eq!(ROUND8.work_end, "mtq_p8");
        assert_eq!(ROUND8.output("chronotype"), "Oct21_mtq_chronotype");
    }
}
