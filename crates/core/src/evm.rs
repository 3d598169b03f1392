//! Earned Value Management.
//!
//! Metrics are measured per WorkPackage (the lowest budget-bearing level)
//! from the progress of its Activities, then summed for the project.
//!
//! - EV (earned value)  = budget × percent complete / 100
//! - PV (planned value) = budget × planned percent / 100
//! - CPI = EV / AC, SPI = EV / PV

use rust_decimal::Decimal;
use serde::Serialize;

use crate::schedule::inclusive_days;
use crate::types::{Date, DbId, Money};

/// Decimal places kept on performance indices.
pub const INDEX_SCALE: u32 = 4;

/// Decimal places kept on percentages.
pub const PERCENT_SCALE: u32 = 2;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

// ---------------------------------------------------------------------------
// Formulas
// ---------------------------------------------------------------------------

/// `budget * percent / 100`.
pub fn earned_value(budget: Money, percent_complete: Decimal) -> Money {
    budget * percent_complete / HUNDRED
}

/// Same formula as [`earned_value`], applied to the planned percentage.
pub fn planned_value(budget: Money, planned_percent: Decimal) -> Money {
    budget * planned_percent / HUNDRED
}

/// `EV / AC`; undefined while nothing has been spent.
pub fn cost_performance_index(earned: Money, actual_cost: Money) -> Option<Decimal> {
    ratio(earned, actual_cost)
}

/// `EV / PV`; undefined before any work was planned.
pub fn schedule_performance_index(earned: Money, planned: Money) -> Option<Decimal> {
    ratio(earned, planned)
}

fn ratio(numerator: Decimal, denominator: Decimal) -> Option<Decimal> {
    if denominator.is_zero() {
        None
    } else {
        numerator
            .checked_div(denominator)
            .map(|r| r.round_dp(INDEX_SCALE))
    }
}

/// Linear planned progress of a `start..=end` span on `as_of`.
///
/// A day counts as planned once it has started, so the first day of a
/// ten-day span is 10% planned.
pub fn planned_percent(start: Date, end: Date, as_of: Date) -> Decimal {
    if as_of < start {
        return Decimal::ZERO;
    }
    if as_of >= end {
        return HUNDRED;
    }
    let total = inclusive_days(start, end);
    let elapsed = inclusive_days(start, as_of);
    (Decimal::from(elapsed) * HUNDRED / Decimal::from(total)).round_dp(PERCENT_SCALE)
}

// ---------------------------------------------------------------------------
// Rollup
// ---------------------------------------------------------------------------

/// Progress snapshot of one Activity.
#[derive(Debug, Clone, Copy)]
pub struct ActivityProgress {
    pub percent_complete: i32,
    pub duration_days: Option<i32>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
}

/// Inputs for one WorkPackage.
#[derive(Debug, Clone)]
pub struct WorkPackageInput {
    pub id: DbId,
    pub code: String,
    pub name: String,
    pub budget: Money,
    pub actual_cost: Money,
    pub activities: Vec<ActivityProgress>,
}

/// Earned-value metrics for a WorkPackage or a whole project.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvmMetrics {
    pub budget: Money,
    pub actual_cost: Money,
    pub earned_value: Money,
    pub planned_value: Money,
    pub cost_variance: Money,
    pub schedule_variance: Money,
    pub cpi: Option<Decimal>,
    pub spi: Option<Decimal>,
    pub percent_complete: Decimal,
}

impl EvmMetrics {
    fn from_values(budget: Money, actual_cost: Money, earned: Money, planned: Money) -> Self {
        let percent_complete = if budget.is_zero() {
            Decimal::ZERO
        } else {
            (earned * HUNDRED / budget).round_dp(PERCENT_SCALE)
        };
        Self {
            budget,
            actual_cost,
            earned_value: earned.round_dp(2),
            planned_value: planned.round_dp(2),
            cost_variance: (earned - actual_cost).round_dp(2),
            schedule_variance: (earned - planned).round_dp(2),
            cpi: cost_performance_index(earned, actual_cost),
            spi: schedule_performance_index(earned, planned),
            percent_complete,
        }
    }
}

/// Metrics for one WorkPackage.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkPackageMetrics {
    pub wbs_item_id: DbId,
    pub code: String,
    pub name: String,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    #[serde(flatten)]
    pub metrics: EvmMetrics,
}

/// Project-level rollup with the per-WorkPackage breakdown.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMetrics {
    pub as_of: Date,
    #[serde(flatten)]
    pub totals: EvmMetrics,
    pub work_packages: Vec<WorkPackageMetrics>,
}

/// Aggregate progress of a WorkPackage from its Activities.
///
/// Weighted by duration when every Activity has one, otherwise a plain
/// mean. The schedule span runs from the earliest start to the latest end.
pub fn work_package_progress(
    activities: &[ActivityProgress],
) -> (Decimal, Option<Date>, Option<Date>) {
    let start = activities.iter().filter_map(|a| a.start_date).min();
    let end = activities.iter().filter_map(|a| a.end_date).max();
    if activities.is_empty() {
        return (Decimal::ZERO, start, end);
    }

    let weighted = activities.iter().all(|a| a.duration_days.is_some_and(|d| d > 0));
    let (sum, weight) = activities.iter().fold(
        (Decimal::ZERO, Decimal::ZERO),
        |(sum, weight), a| {
            let w = if weighted {
                Decimal::from(a.duration_days.unwrap_or(1))
            } else {
                Decimal::ONE
            };
            (sum + Decimal::from(a.percent_complete) * w, weight + w)
        },
    );
    ((sum / weight).round_dp(PERCENT_SCALE), start, end)
}

/// Measure every WorkPackage and roll the results up to the project.
///
/// `unallocated_actual_cost` is spend posted directly to Summary items; it
/// counts toward the project's actual cost without earning value.
pub fn summarize(
    work_packages: &[WorkPackageInput],
    unallocated_actual_cost: Money,
    as_of: Date,
) -> ProjectMetrics {
    let mut budget = Money::ZERO;
    let mut actual = unallocated_actual_cost;
    let mut earned = Money::ZERO;
    let mut planned = Money::ZERO;
    let mut rows = Vec::with_capacity(work_packages.len());

    for wp in work_packages {
        let (percent, start, end) = work_package_progress(&wp.activities);
        let ev = earned_value(wp.budget, percent);
        let pv = match (start, end) {
            (Some(s), Some(e)) => planned_value(wp.budget, planned_percent(s, e, as_of)),
            _ => Money::ZERO,
        };

        budget += wp.budget;
        actual += wp.actual_cost;
        earned += ev;
        planned += pv;

        rows.push(WorkPackageMetrics {
            wbs_item_id: wp.id,
            code: wp.code.clone(),
            name: wp.name.clone(),
            start_date: start,
            end_date: end,
            metrics: EvmMetrics::from_values(wp.budget, wp.actual_cost, ev, pv),
        });
    }

    ProjectMetrics {
        as_of,
        totals: EvmMetrics::from_values(budget, actual, earned, planned),
        work_packages: rows,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> Date {
        Date::from_ymd_opt(y, m, d).unwrap()
    }

    fn activity(pct: i32, days: Option<i32>, start: Date, end: Date) -> ActivityProgress {
        ActivityProgress {
            percent_complete: pct,
            duration_days: days,
            start_date: Some(start),
            end_date: Some(end),
        }
    }

    #[test]
    fn earned_value_matches_formula_for_every_percent() {
        let budget = Decimal::new(1_234_567, 2);
        for pct in 0..=100 {
            let pct = Decimal::from(pct);
            assert_eq!(earned_value(budget, pct), budget * pct / Decimal::from(100));
        }
        assert_eq!(earned_value(budget, Decimal::ZERO), Decimal::ZERO);
        assert_eq!(earned_value(budget, Decimal::from(100)), budget);
    }

    #[test]
    fn indices_are_undefined_on_zero_denominator() {
        assert_eq!(cost_performance_index(Decimal::from(10), Decimal::ZERO), None);
        assert_eq!(schedule_performance_index(Decimal::from(10), Decimal::ZERO), None);
    }

    #[test]
    fn indices_are_rounded() {
        let cpi = cost_performance_index(Decimal::from(100), Decimal::from(300)).unwrap();
        assert_eq!(cpi, Decimal::new(3333, 4));
        let spi = schedule_performance_index(Decimal::from(150), Decimal::from(100)).unwrap();
        assert_eq!(spi, Decimal::new(15, 1));
    }

    #[test]
    fn planned_percent_is_linear_and_clamped() {
        let start = date(2024, 1, 1);
        let end = date(2024, 1, 10);
        assert_eq!(planned_percent(start, end, date(2023, 12, 31)), Decimal::ZERO);
        assert_eq!(planned_percent(start, end, start), Decimal::from(10));
        assert_eq!(planned_percent(start, end, date(2024, 1, 5)), Decimal::from(50));
        assert_eq!(planned_percent(start, end, end), Decimal::from(100));
        assert_eq!(planned_percent(start, end, date(2024, 2, 1)), Decimal::from(100));
    }

    #[test]
    fn progress_is_duration_weighted() {
        let s = date(2024, 1, 1);
        let activities = [
            activity(100, Some(3), s, date(2024, 1, 3)),
            activity(0, Some(1), s, date(2024, 1, 1)),
        ];
        let (pct, start, end) = work_package_progress(&activities);
        assert_eq!(pct, Decimal::from(75));
        assert_eq!(start, Some(s));
        assert_eq!(end, Some(date(2024, 1, 3)));
    }

    #[test]
    fn progress_falls_back_to_plain_mean() {
        let s = date(2024, 1, 1);
        let activities = [activity(100, Some(3), s, s), activity(0, None, s, s)];
        let (pct, _, _) = work_package_progress(&activities);
        assert_eq!(pct, Decimal::from(50));
    }

    #[test]
    fn empty_work_package_has_no_progress() {
        let (pct, start, end) = work_package_progress(&[]);
        assert_eq!(pct, Decimal::ZERO);
        assert!(start.is_none() && end.is_none());
    }

    #[test]
    fn summarize_rolls_up_work_packages() {
        let s = date(2024, 1, 1);
        let e = date(2024, 1, 10);
        let wps = vec![
            WorkPackageInput {
                id: 1,
                code: "1.1".into(),
                name: "Foundations".into(),
                budget: Decimal::from(1000),
                actual_cost: Decimal::from(600),
                activities: vec![activity(50, Some(10), s, e)],
            },
            WorkPackageInput {
                id: 2,
                code: "1.2".into(),
                name: "Framing".into(),
                budget: Decimal::from(2000),
                actual_cost: Decimal::ZERO,
                activities: vec![],
            },
        ];

        let metrics = summarize(&wps, Decimal::from(100), date(2024, 1, 5));

        let first = &metrics.work_packages[0].metrics;
        assert_eq!(first.earned_value, Decimal::from(500));
        assert_eq!(first.planned_value, Decimal::from(500));
        assert_eq!(first.cpi, Some(Decimal::new(8333, 4)));
        assert_eq!(first.spi, Some(Decimal::ONE));
        assert_eq!(first.cost_variance, Decimal::from(-100));

        let second = &metrics.work_packages[1].metrics;
        assert_eq!(second.planned_value, Decimal::ZERO);
        assert_eq!(second.spi, None);
        assert_eq!(second.cpi, None);

        let totals = &metrics.totals;
        assert_eq!(totals.budget, Decimal::from(3000));
        assert_eq!(totals.actual_cost, Decimal::from(700));
        assert_eq!(totals.earned_value, Decimal::from(500));
        assert_eq!(totals.percent_complete, Decimal::new(1667, 2));
    }
}
