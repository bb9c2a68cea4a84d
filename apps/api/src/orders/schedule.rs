//! Production Schedule: splits the estimated production time into workshop stages.
//!
//! Stage lengths are a fixed share of the total working days, each at least
//! one day; quality check absorbs rounding so the stages always sum to the total.
//! Weekends are skipped.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::Serialize;

/// Stage name and share of the total, in workshop order.
pub const PRODUCTION_STAGES: &[(&str, f64)] = &[
    ("design_review", 0.10),
    ("casting", 0.30),
    ("stone_setting", 0.25),
    ("polishing", 0.20),
    ("quality_check", 0.15),
];

pub const STAGE_PENDING: &str = "pending";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedStage {
    pub stage: &'static str,
    pub position: i16,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductionSchedule {
    pub stages: Vec<PlannedStage>,
    pub estimated_ship: NaiveDate,
}

fn is_working_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// `date` itself if it is a working day, otherwise the following Monday.
pub fn next_working_day(mut date: NaiveDate) -> NaiveDate {
    while !is_working_day(date) {
        date += Duration::days(1);
    }
    date
}

/// Moves forward `days` working days from a working day.
pub fn add_working_days(mut date: NaiveDate, days: u32) -> NaiveDate {
    let mut remaining = days;
    while remaining > 0 {
        date += Duration::days(1);
        if is_working_day(date) {
            remaining -= 1;
        }
    }
    date
}

fn stage_lengths(total_days: u32) -> Vec<u32> {
    let total_days = total_days.max(PRODUCTION_STAGES.len() as u32);
    let mut lengths: Vec<u32> = PRODUCTION_STAGES
        .iter()
        .map(|(_, share)| ((total_days as f64 * share).round() as u32).max(1))
        .collect();

    if let Some((last, leading)) = lengths.split_last_mut() {
        let used: u32 = leading.iter().sum();
        *last = total_days.saturating_sub(used).max(1);
    }
    lengths
}

pub fn build_production_schedule(start: NaiveDate, total_days: u32) -> ProductionSchedule {
    let mut cursor = next_working_day(start);
    let mut stages = Vec::with_capacity(PRODUCTION_STAGES.len());

    for (position, (&(stage, _), days)) in PRODUCTION_STAGES
        .iter()
        .zip(stage_lengths(total_days))
        .enumerate()
    {
        let ends_on = add_working_days(cursor, days - 1);
        stages.push(PlannedStage {
            stage,
            position: position as i16,
            starts_on: cursor,
            ends_on,
        });
        cursor = add_working_days(ends_on, 1);
    }

    ProductionSchedule {
        stages,
        estimated_ship: cursor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_shares_sum_to_one() {
        let total: f64 = PRODUCTION_STAGES.iter().map(|(_, s)| s).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_stage_lengths_sum_to_total() {
        for total in 7..=28 {
            let lengths = stage_lengths(total);
            assert_eq!(lengths.iter().sum::<u32>(), total, "total {total}");
            assert!(lengths.iter().all(|d| *d >= 1));
        }
    }

    #[test]
    fn test_stage_lengths_for_ten_days() {
        assert_eq!(stage_lengths(10), vec![1, 3, 3, 2, 1]);
    }

    #[test]
    fn test_weekend_start_moves_to_monday() {
        // 2024-06-01 is a Saturday.
        assert_eq!(next_working_day(date(2024, 6, 1)), date(2024, 6, 3));
        assert_eq!(next_working_day(date(2024, 6, 3)), date(2024, 6, 3));
    }

    #[test]
    fn test_add_working_days_skips_weekend() {
        // Friday + 1 working day = Monday.
        assert_eq!(add_working_days(date(2024, 6, 7), 1), date(2024, 6, 10));
        assert_eq!(add_working_days(date(2024, 6, 3), 0), date(2024, 6, 3));
    }

    #[test]
    fn test_schedule_is_contiguous() {
        let schedule = build_production_schedule(date(2024, 6, 3), 10);
        assert_eq!(schedule.stages.len(), 5);
        assert_eq!(schedule.stages[0].stage, "design_review");
        assert_eq!(schedule.stages[0].starts_on, date(2024, 6, 3));

        for pair in schedule.stages.windows(2) {
            assert_eq!(pair[1].starts_on, add_working_days(pair[0].ends_on, 1));
        }
        for stage in &schedule.stages {
            assert!(is_working_day(stage.starts_on));
            assert!(is_working_day(stage.ends_on));
        }
    }

    #[test]
    fn test_ten_working_days_ship_two_weeks_later() {
        let schedule = build_production_schedule(date(2024, 6, 3), 10);
        assert_eq!(schedule.stages[4].ends_on, date(2024, 6, 14));
        assert_eq!(schedule.estimated_ship, date(2024, 6, 17));
    }
}
