//! Tick generation and default tick labels
use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveDateTime};

const E10: f64 = 7.0710678118654755; // sqrt(50)
const E5: f64 = 3.1622776601683795; // sqrt(10)
const E2: f64 = std::f64::consts::SQRT_2;

/// Integer bounds and increment of nicely rounded ticks.
/// A negative increment means ticks are `i / -inc`.
fn tick_spec(start: f64, stop: f64, count: f64) -> Option<(f64, f64, f64)> {
    let step = (stop - start) / count.max(0.0);
    if !step.is_finite() || step <= 0.0 {
        return None;
    }
    let power = step.log10().floor();
    let error = step / 10f64.powf(power);
    let factor = if error >= E10 {
        10.0
    } else if error >= E5 {
        5.0
    } else if error >= E2 {
        2.0
    } else {
        1.0
    };
    let (mut i1, mut i2, inc);
    if power < 0.0 {
        let inc_ = 10f64.powf(-power) / factor;
        i1 = (start * inc_).round();
        i2 = (stop * inc_).round();
        if i1 / inc_ < start {
            i1 += 1.0;
        }
        if i2 / inc_ > stop {
            i2 -= 1.0;
        }
        inc = -inc_;
    } else {
        inc = 10f64.powf(power) * factor;
        i1 = (start / inc).round();
        i2 = (stop / inc).round();
        if i1 * inc < start {
            i1 += 1.0;
        }
        if i2 * inc > stop {
            i2 -= 1.0;
        }
    }
    if i2 < i1 && (0.5..2.0).contains(&count) {
        return tick_spec(start, stop, count * 2.0);
    }
    Some((i1, i2, inc))
}

/// Roughly `count` evenly spaced, nicely rounded values in `[start, stop]`
pub fn linear(start: f64, stop: f64, count: f64) -> Vec<f64> {
    if start == stop && count > 0.0 {
        return vec![start];
    }
    let (lo, hi, reverse) = if stop < start {
        (stop, start, true)
    } else {
        (start, stop, false)
    };
    let Some((i1, i2, inc)) = tick_spec(lo, hi, count) else {
        return vec![];
    };
    if i2 < i1 {
        return vec![];
    }
    let n = (i2 - i1 + 1.0) as usize;
    let mut ticks: Vec<f64> = (0..n)
        .map(|i| {
            let i = i1 + i as f64;
            if inc < 0.0 {
                i / -inc
            } else {
                i * inc
            }
        })
        .collect();
    if reverse {
        ticks.reverse();
    }
    ticks
}

/// Spacing between ticks produced by [linear]
pub fn step(start: f64, stop: f64, count: f64) -> f64 {
    let (lo, hi) = (start.min(stop), start.max(stop));
    match tick_spec(lo, hi, count) {
        Some((_, _, inc)) if inc < 0.0 => 1.0 / -inc,
        Some((_, _, inc)) => inc,
        None => 0.0,
    }
}

/// Extend `[start, stop]` outward to tick multiples
pub fn nice(mut start: f64, mut stop: f64, count: f64) -> (f64, f64) {
    let mut prev = 0.0;
    for _ in 0..10 {
        let inc = step(start, stop, count);
        if inc == 0.0 || inc == prev {
            break;
        }
        start = (start / inc).floor() * inc;
        stop = (stop / inc).ceil() * inc;
        prev = inc;
    }
    (start, stop)
}

/// Label numbers with the fixed precision the tick spacing needs, grouping thousands
pub fn format_number(value: f64, step: f64) -> String {
    let decimals = if step > 0.0 && step.is_finite() {
        (-(step.log10() + 1e-9).floor()).max(0.0) as usize
    } else {
        0
    };
    let text = format!("{:.*}", decimals, value);
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) if value.abs() * 10f64.powi(decimals as i32) >= 0.5 => ("−", rest),
        Some(rest) => ("", rest),
        None => ("", text.as_str()),
    };
    let (int, frac) = match digits.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (digits, None),
    };
    let mut grouped = String::new();
    for (i, c) in int.chars().enumerate() {
        if i > 0 && (int.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    match frac {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

/// Calendar interval between time ticks
#[derive(Debug, Clone, Copy, PartialEq)]
enum Interval {
    Days(i64),
    Months(u32),
    Years(i32),
}

const DAY_MS: f64 = 86_400_000.0;

const INTERVALS: &[(Interval, f64)] = &[
    (Interval::Days(1), DAY_MS),
    (Interval::Days(2), 2.0 * DAY_MS),
    (Interval::Days(7), 7.0 * DAY_MS),
    (Interval::Months(1), 30.0 * DAY_MS),
    (Interval::Months(3), 90.0 * DAY_MS),
    (Interval::Years(1), 365.0 * DAY_MS),
];

fn to_date(ms: f64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(ms as i64).map(|d| d.naive_utc())
}

/// Roughly `count` calendar-aligned dates in `[start, stop]`, given as epoch milliseconds
pub fn time(start: f64, stop: f64, count: f64) -> Vec<NaiveDateTime> {
    let (lo, hi) = (start.min(stop), start.max(stop));
    let target = (hi - lo) / count.max(1.0);
    let interval = INTERVALS
        .iter()
        .min_by(|a, b| {
            let da = (a.1 / target).ln().abs();
            let db = (b.1 / target).ln().abs();
            da.total_cmp(&db)
        })
        .map_or(Interval::Days(1), |(i, _)| *i);
    let interval = match interval {
        Interval::Years(_) => Interval::Years(
            (step(lo / (365.0 * DAY_MS), hi / (365.0 * DAY_MS), count) as i32).max(1),
        ),
        i => i,
    };

    let (Some(first), Some(last)) = (to_date(lo), to_date(hi)) else {
        return vec![];
    };
    let day = first.date();
    let mut cur: Option<NaiveDate> = match interval {
        Interval::Days(7) => {
            let back = day.weekday().num_days_from_sunday() as i64;
            Some(day - Duration::days(back))
        }
        Interval::Days(_) => Some(day),
        Interval::Months(n) => NaiveDate::from_ymd_opt(day.year(), (day.month0() / n) * n + 1, 1),
        Interval::Years(n) => NaiveDate::from_ymd_opt(day.year() - day.year().rem_euclid(n), 1, 1),
    };

    let mut ticks = vec![];
    while let Some(date) = cur {
        let Some(at) = date.and_hms_opt(0, 0, 0) else {
            break;
        };
        if at > last || ticks.len() > 1000 {
            break;
        }
        if at >= first {
            ticks.push(at);
        }
        cur = match interval {
            Interval::Days(n) => date.checked_add_signed(Duration::days(n)),
            Interval::Months(n) => date.checked_add_months(Months::new(n)),
            Interval::Years(n) => date.checked_add_months(Months::new(12 * n as u32)),
        };
    }
    ticks
}

/// Label a date at the coarsest calendar unit it starts
pub fn format_time(d: &NaiveDateTime) -> String {
    if d.month() == 1 && d.day() == 1 {
        d.format("%Y").to_string()
    } else if d.day() == 1 {
        d.format("%B").to_string()
    } else {
        d.format("%b %d").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_ticks() {
        assert_eq!(linear(0.0, 10.0, 10.0), (0..=10).map(f64::from).collect::<Vec<_>>());
        assert_eq!(linear(0.0, 1.0, 5.0), vec![0.0, 0.2, 0.4, 0.6, 0.8, 1.0]);
        assert_eq!(linear(0.0, 0.12702, 10.0).len(), 13);
        assert_eq!(linear(10.0, 0.0, 2.0), vec![10.0, 5.0, 0.0]);
        assert_eq!(linear(1.0, 1.0, 10.0), vec![1.0]);
    }

    #[test]
    fn nice_domain() {
        assert_eq!(nice(0.5, 9.7, 10.0), (0.0, 10.0));
        assert_eq!(nice(3.0, 97.0, 5.0), (0.0, 100.0));
    }

    #[test]
    fn number_labels() {
        assert_eq!(format_number(0.02, 0.01), "0.02");
        assert_eq!(format_number(0.1, 0.01), "0.10");
        assert_eq!(format_number(2500.0, 500.0), "2,500");
        assert_eq!(format_number(-20.0, 10.0), "−20");
        assert_eq!(format_number(0.0, 10.0), "0");
    }

    #[test]
    fn time_ticks() {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let stop = start + Duration::days(49);
        let ms = |d: NaiveDateTime| d.and_utc().timestamp_millis() as f64;
        let ticks = time(ms(start), ms(stop), 10.0);
        assert!(!ticks.is_empty());
        assert!(ticks.windows(2).all(|w| w[1] - w[0] == Duration::days(7)), "weekly ticks");
        assert!(ticks.iter().all(|t| *t >= start && *t <= stop));
    }

    #[test]
    fn time_labels() {
        let d = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(format_time(&d(2020, 1, 1)), "2020");
        assert_eq!(format_time(&d(2020, 3, 1)), "March");
        assert_eq!(format_time(&d(2020, 3, 15)), "Mar 15");
    }
}
