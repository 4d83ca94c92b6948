//! Dates, held as UTC timestamps with millisecond precision
use crate::types::fmt_date;
use crate::{arg, Error, Extern, Interp, Result, Val};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Timelike, Utc};

pub const METHODS: &[&str] = &[
    "getDate",
    "getDay",
    "getFullYear",
    "getHours",
    "getMilliseconds",
    "getMinutes",
    "getMonth",
    "getSeconds",
    "getTime",
    "toISOString",
    "toJSON",
    "toString",
    "valueOf",
];

fn invalid() -> Error {
    Error::Range("Invalid time value".to_string())
}

fn now() -> NaiveDateTime {
    let now = Utc::now().naive_utc();
    from_millis(now.and_utc().timestamp_millis() as f64).unwrap_or(now)
}

fn from_millis(ms: f64) -> Option<NaiveDateTime> {
    if !ms.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis(ms.trunc() as i64).map(|d| d.naive_utc())
}

/// Parse ISO forms: `2024-01-31`, `2024-01-31T10:00`, `2024-01-31T10:00:00.000Z`
fn parse(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(d) = DateTime::parse_from_rfc3339(s) {
        return Some(d.naive_utc());
    }
    let s = s.strip_suffix('Z').unwrap_or(s);
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Date from calendar parts, with months and days overflowing into the next unit
fn from_parts(parts: &[f64]) -> Option<NaiveDateTime> {
    if parts.iter().any(|p| !p.is_finite()) {
        return None;
    }
    let part = |i: usize, default: f64| parts.get(i).copied().unwrap_or(default) as i64;
    let month = part(1, 0.0);
    let year = part(0, 1970.0) + month.div_euclid(12);
    let first = NaiveDate::from_ymd_opt(year as i32, month.rem_euclid(12) as u32 + 1, 1)?
        .and_hms_opt(0, 0, 0)?;
    let offset = Duration::try_days(part(2, 1.0) - 1)?
        + Duration::try_hours(part(3, 0.0))?
        + Duration::try_minutes(part(4, 0.0))?
        + Duration::try_seconds(part(5, 0.0))?
        + Duration::try_milliseconds(part(6, 0.0))?;
    first.checked_add_signed(offset)
}

/// `new Date()`, `new Date(ms)`, `new Date(iso)`, `new Date(y, m, d, ...)`
pub(crate) fn constructor<T: Extern>(_: &mut Interp<T>, args: &[Val<T>]) -> Result<Val<T>> {
    let date = match args {
        [] => Some(now()),
        [Val::Date(d)] => Some(*d),
        [Val::Str(s)] => parse(s),
        [v] => from_millis(v.to_number()),
        parts => from_parts(&parts.iter().map(Val::to_number).collect::<Vec<_>>()),
    };
    date.map(Val::Date).ok_or_else(invalid)
}

pub(crate) fn static_member<T: Extern>(key: &str) -> Option<Val<T>> {
    match key {
        "now" => Some(Val::native("now", |_, _| {
            Ok(Val::Num(now().and_utc().timestamp_millis() as f64))
        })),
        "parse" => Some(Val::native("parse", |_, args| {
            Ok(Val::Num(
                parse(&arg(args, 0).to_js_string())
                    .map_or(f64::NAN, |d| d.and_utc().timestamp_millis() as f64),
            ))
        })),
        _ => None,
    }
}

/// Call method `name` on date
pub(crate) fn call<T: Extern>(
    _: &mut Interp<T>,
    d: &NaiveDateTime,
    name: &str,
    _args: Vec<Val<T>>,
) -> Result<Val<T>> {
    let num = |n: u32| Val::Num(n as f64);
    let result = match name {
        "getTime" | "valueOf" => Val::Num(d.and_utc().timestamp_millis() as f64),
        "getFullYear" => Val::Num(d.year() as f64),
        "getMonth" => num(d.month0()),
        "getDate" => num(d.day()),
        "getDay" => num(d.weekday().num_days_from_sunday()),
        "getHours" => num(d.hour()),
        "getMinutes" => num(d.minute()),
        "getSeconds" => num(d.second()),
        "getMilliseconds" => num(d.and_utc().timestamp_subsec_millis()),
        "toISOString" | "toJSON" => Val::Str(fmt_date(d)),
        "toString" => Val::Str(d.format("%a %b %d %Y %H:%M:%S GMT+0000").to_string()),
        _ => return Err(Error::Type(format!("{name} is not a function"))),
    };
    Ok(result)
}
