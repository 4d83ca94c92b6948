//! Scales mapping data values to visual values
use chrono::{DateTime, NaiveDateTime};
use quill::{arg, Error, Result};
use std::sync::{Arc, Mutex};

use super::color::Rgb;
use super::ticks;
use crate::value::{Extern, Interp, Val};

/// Shared handle, since scales are configured in place by chained calls
pub type ScaleRef = Arc<Mutex<Scale>>;

#[derive(Debug, Clone, PartialEq)]
pub enum Scale {
    /// `scaleLinear` and `scaleTime`
    Continuous {
        domain: Vec<f64>,
        range: Vec<Val>,
        clamp: bool,
        time: bool,
    },
    Band {
        domain: Vec<Val>,
        range: (f64, f64),
        padding_inner: f64,
        padding_outer: f64,
        align: f64,
    },
    Ordinal {
        domain: Vec<Val>,
        range: Vec<Val>,
    },
    Sequential {
        domain: (f64, f64),
        interpolator: Val,
        clamp: bool,
    },
}

impl Scale {
    pub fn linear() -> Self {
        Scale::Continuous {
            domain: vec![0.0, 1.0],
            range: vec![Val::Num(0.0), Val::Num(1.0)],
            clamp: false,
            time: false,
        }
    }

    pub fn time() -> Self {
        let jan = |y| {
            chrono::NaiveDate::from_ymd_opt(y, 1, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map_or(0.0, |d| d.and_utc().timestamp_millis() as f64)
        };
        Scale::Continuous {
            domain: vec![jan(2000), jan(2000) + 86_400_000.0],
            range: vec![Val::Num(0.0), Val::Num(1.0)],
            clamp: false,
            time: true,
        }
    }

    pub fn band() -> Self {
        Scale::Band {
            domain: vec![],
            range: (0.0, 1.0),
            padding_inner: 0.0,
            padding_outer: 0.0,
            align: 0.5,
        }
    }

    pub fn ordinal(range: Vec<Val>) -> Self {
        Scale::Ordinal {
            domain: vec![],
            range,
        }
    }

    pub fn sequential(interpolator: Val) -> Self {
        Scale::Sequential {
            domain: (0.0, 1.0),
            interpolator,
            clamp: false,
        }
    }

    pub fn into_val(self) -> Val {
        Val::Extern(Extern::Scale(Arc::new(Mutex::new(self))))
    }

    /// Position of a numeric input on a numeric range
    pub fn position(&self, x: f64) -> Option<f64> {
        match self {
            Scale::Continuous {
                domain,
                range,
                clamp,
                ..
            } => {
                let (i, t) = segment(domain, x, *clamp)?;
                let (a, b) = (range.get(i)?, range.get(i + 1)?);
                match (a, b) {
                    (Val::Num(a), Val::Num(b)) => Some(a + (b - a) * t),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Start, step, and width of bands
    pub fn bands(&self) -> Option<(f64, f64, f64)> {
        let Scale::Band {
            domain,
            range,
            padding_inner,
            padding_outer,
            align,
        } = self
        else {
            return None;
        };
        let n = domain.len() as f64;
        let (r0, r1) = *range;
        let (start, stop) = (r0.min(r1), r0.max(r1));
        let step = (stop - start) / (n - padding_inner + padding_outer * 2.0).max(1.0);
        let start = start + (stop - start - step * (n - padding_inner)) * align;
        Some((start, step, step * (1.0 - padding_inner)))
    }

    fn band_of(&self, key: &str) -> Val {
        let (Scale::Band { domain, range, .. }, Some((start, step, _))) = (self, self.bands())
        else {
            return Val::Undefined;
        };
        let n = domain.len();
        match domain.iter().position(|d| d.to_property_key() == key) {
            Some(i) if range.1 < range.0 => Val::Num(start + step * (n - 1 - i) as f64),
            Some(i) => Val::Num(start + step * i as f64),
            None => Val::Undefined,
        }
    }

    pub fn bandwidth(&self) -> f64 {
        self.bands().map_or(0.0, |(_, _, width)| width)
    }

    /// Extent of the output range
    pub fn range_extent(&self) -> (f64, f64) {
        match self {
            Scale::Continuous { range, .. } => (
                range.first().map_or(0.0, Val::to_number),
                range.last().map_or(0.0, Val::to_number),
            ),
            Scale::Band { range, .. } => *range,
            Scale::Ordinal { .. } | Scale::Sequential { .. } => (0.0, 0.0),
        }
    }

    pub fn is_time(&self) -> bool {
        matches!(self, Scale::Continuous { time: true, .. })
    }

    /// Representative domain values for axes and legends
    pub fn ticks(&self, count: f64) -> Vec<Val> {
        match self {
            Scale::Continuous {
                domain, time: true, ..
            } => {
                let (lo, hi) = bounds(domain);
                ticks::time(lo, hi, count).into_iter().map(Val::Date).collect()
            }
            Scale::Continuous { domain, .. } => {
                let (lo, hi) = bounds(domain);
                ticks::linear(lo, hi, count).into_iter().map(Val::Num).collect()
            }
            Scale::Sequential { domain, .. } => ticks::linear(domain.0, domain.1, count)
                .into_iter()
                .map(Val::Num)
                .collect(),
            Scale::Band { domain, .. } | Scale::Ordinal { domain, .. } => domain.clone(),
        }
    }

    /// Default label for a tick value
    pub fn tick_label(&self, value: &Val, count: f64) -> String {
        match (self, value) {
            (_, Val::Date(d)) => ticks::format_time(d),
            (Scale::Continuous { domain, .. }, Val::Num(n)) => {
                let (lo, hi) = bounds(domain);
                ticks::format_number(*n, ticks::step(lo, hi, count))
            }
            (Scale::Sequential { domain, .. }, Val::Num(n)) => {
                ticks::format_number(*n, ticks::step(domain.0, domain.1, count))
            }
            (_, v) => v.to_js_string(),
        }
    }

    /// Normalized position of `x` in a sequential domain
    pub fn normalize(&self, x: f64) -> Option<f64> {
        match self {
            Scale::Sequential { domain, clamp, .. } => {
                let (d0, d1) = *domain;
                let t = if d1 == d0 { 0.5 } else { (x - d0) / (d1 - d0) };
                Some(if *clamp { t.clamp(0.0, 1.0) } else { t })
            }
            _ => None,
        }
    }

    /// Interpolator of a sequential scale
    pub fn interpolator(&self) -> Option<Val> {
        match self {
            Scale::Sequential { interpolator, .. } => Some(interpolator.clone()),
            _ => None,
        }
    }

    fn domain_val(&self) -> Val {
        match self {
            Scale::Continuous { domain, time, .. } => Val::array(
                domain
                    .iter()
                    .map(|d| match time {
                        true => to_date(*d).map_or(Val::Num(f64::NAN), Val::Date),
                        false => Val::Num(*d),
                    })
                    .collect(),
            ),
            Scale::Band { domain, .. } | Scale::Ordinal { domain, .. } => Val::array(domain.clone()),
            Scale::Sequential { domain, .. } => {
                Val::array(vec![Val::Num(domain.0), Val::Num(domain.1)])
            }
        }
    }

    fn range_val(&self) -> Val {
        match self {
            Scale::Continuous { range, .. } | Scale::Ordinal { range, .. } => {
                Val::array(range.clone())
            }
            Scale::Band { range, .. } => Val::array(vec![Val::Num(range.0), Val::Num(range.1)]),
            Scale::Sequential { .. } => Val::array(vec![Val::Num(0.0), Val::Num(1.0)]),
        }
    }
}

fn to_date(ms: f64) -> Option<NaiveDateTime> {
    if !ms.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis(ms as i64).map(|d| d.naive_utc())
}

fn bounds(domain: &[f64]) -> (f64, f64) {
    (
        domain.first().copied().unwrap_or(0.0),
        domain.last().copied().unwrap_or(0.0),
    )
}

/// Segment index and offset of `x` in a piecewise domain
fn segment(domain: &[f64], x: f64, clamp: bool) -> Option<(usize, f64)> {
    if domain.len() < 2 || x.is_nan() {
        return None;
    }
    let ascending = domain[domain.len() - 1] >= domain[0];
    let last = domain.len() - 2;
    let i = (0..=last)
        .find(|&i| {
            let hi = domain[i + 1];
            if ascending {
                x <= hi
            } else {
                x >= hi
            }
        })
        .unwrap_or(last);
    let (a, b) = (domain[i], domain[i + 1]);
    let t = if b == a { 0.5 } else { (x - a) / (b - a) };
    Some((i, if clamp { t.clamp(0.0, 1.0) } else { t }))
}

/// Blend between two range values
fn blend(a: &Val, b: &Val, t: f64) -> Val {
    match (a, b) {
        (Val::Num(a), Val::Num(b)) => Val::Num(a + (b - a) * t),
        (Val::Str(x), Val::Str(y)) => match (Rgb::parse(x), Rgb::parse(y)) {
            (Some(x), Some(y)) => Val::Str(x.mix(y, t.clamp(0.0, 1.0)).to_string()),
            _ if t < 0.5 => a.clone(),
            _ => b.clone(),
        },
        _ if t < 0.5 => a.clone(),
        _ => b.clone(),
    }
}

/// Apply scale to input value
pub(crate) fn apply(scale: &ScaleRef, interp: &mut Interp, x: &Val) -> Result<Val> {
    let snapshot = scale.lock().unwrap().clone();
    let val = match &snapshot {
        Scale::Continuous {
            domain,
            range,
            clamp,
            ..
        } => match segment(domain, x.to_number(), *clamp) {
            Some((i, t)) => match (range.get(i), range.get(i + 1)) {
                (Some(a), Some(b)) => blend(a, b, t),
                _ => Val::Undefined,
            },
            None => Val::Undefined,
        },
        Scale::Band { .. } => snapshot.band_of(&x.to_property_key()),
        Scale::Ordinal { range, .. } => {
            if range.is_empty() {
                return Ok(Val::Undefined);
            }
            let key = x.to_property_key();
            let mut s = scale.lock().unwrap();
            let Scale::Ordinal { domain, .. } = &mut *s else {
                return Ok(Val::Undefined);
            };
            let idx = match domain.iter().position(|d| d.to_property_key() == key) {
                Some(idx) => idx,
                None => {
                    domain.push(x.clone());
                    domain.len() - 1
                }
            };
            range[idx % range.len()].clone()
        }
        Scale::Sequential { interpolator, .. } => match snapshot.normalize(x.to_number()) {
            Some(t) if !t.is_nan() => interp.call(interpolator, vec![Val::Num(t)])?,
            _ => Val::Undefined,
        },
    };
    Ok(val)
}

pub(crate) fn has_method(scale: &ScaleRef, name: &str) -> bool {
    let common = ["domain", "range", "copy", "ticks"];
    let specific: &[&str] = match &*scale.lock().unwrap() {
        Scale::Continuous { .. } => &["clamp", "invert", "nice", "rangeRound"],
        Scale::Band { .. } => &[
            "align",
            "bandwidth",
            "padding",
            "paddingInner",
            "paddingOuter",
            "rangeRound",
            "step",
        ],
        Scale::Ordinal { .. } => &[],
        Scale::Sequential { .. } => &["clamp", "interpolator"],
    };
    common.contains(&name) || specific.contains(&name)
}

fn numbers(interp: &mut Interp, v: &Val) -> Result<Vec<f64>> {
    Ok(interp.iterate(v)?.iter().map(Val::to_number).collect())
}

fn pair(interp: &mut Interp, v: &Val) -> Result<(f64, f64)> {
    match numbers(interp, v)?[..] {
        [a, .., b] => Ok((a, b)),
        [a] => Ok((a, a)),
        [] => Ok((0.0, 0.0)),
    }
}

pub(crate) fn call_method(scale: &ScaleRef, interp: &mut Interp, name: &str, args: Vec<Val>) -> Result<Val> {
    let this = Val::Extern(Extern::Scale(scale.clone()));
    let value = arg(&args, 0);
    let setting = !args.is_empty();

    if !setting {
        let s = scale.lock().unwrap();
        match name {
            "domain" => return Ok(s.domain_val()),
            "range" => return Ok(s.range_val()),
            "bandwidth" => return Ok(Val::Num(s.bandwidth())),
            "step" => return Ok(Val::Num(s.bands().map_or(0.0, |(_, step, _)| step))),
            "interpolator" => return Ok(s.interpolator().unwrap_or(Val::Undefined)),
            "ticks" => return Ok(Val::array(s.ticks(10.0))),
            "nice" => (),
            "copy" => return Ok(s.clone().into_val()),
            "clamp" => {
                return Ok(Val::Bool(matches!(
                    &*s,
                    Scale::Continuous { clamp: true, .. } | Scale::Sequential { clamp: true, .. }
                )))
            }
            _ => (),
        }
    }

    match name {
        "domain" => {
            let values = interp.iterate(&value)?;
            let mut s = scale.lock().unwrap();
            match &mut *s {
                Scale::Continuous { domain, .. } => {
                    *domain = values.iter().map(Val::to_number).collect()
                }
                Scale::Band { domain, .. } | Scale::Ordinal { domain, .. } => {
                    let mut unique: Vec<Val> = vec![];
                    for v in values {
                        let key = v.to_property_key();
                        if !unique.iter().any(|u| u.to_property_key() == key) {
                            unique.push(v);
                        }
                    }
                    *domain = unique;
                }
                Scale::Sequential { domain, .. } => {
                    let nums: Vec<f64> = values.iter().map(Val::to_number).collect();
                    *domain = match nums[..] {
                        [a, .., b] => (a, b),
                        _ => *domain,
                    };
                }
            }
        }
        "range" | "rangeRound" => {
            let values = interp.iterate(&value)?;
            let mut s = scale.lock().unwrap();
            match &mut *s {
                Scale::Continuous { range, .. } | Scale::Ordinal { range, .. } => *range = values,
                Scale::Band { range, .. } => {
                    let nums: Vec<f64> = values.iter().map(Val::to_number).collect();
                    if let [a, .., b] = nums[..] {
                        *range = (a, b);
                    }
                }
                Scale::Sequential { .. } => {
                    return Err(Error::Type("scale.range is not a function".to_string()))
                }
            }
        }
        "padding" | "paddingInner" | "paddingOuter" | "align" => {
            let p = value.to_number();
            if let Scale::Band {
                padding_inner,
                padding_outer,
                align,
                ..
            } = &mut *scale.lock().unwrap()
            {
                match name {
                    "padding" => {
                        *padding_inner = p.clamp(0.0, 1.0);
                        *padding_outer = p;
                    }
                    "paddingInner" => *padding_inner = p.clamp(0.0, 1.0),
                    "paddingOuter" => *padding_outer = p,
                    _ => *align = p.clamp(0.0, 1.0),
                }
            }
        }
        "clamp" => match &mut *scale.lock().unwrap() {
            Scale::Continuous { clamp, .. } | Scale::Sequential { clamp, .. } => {
                *clamp = value.truthy()
            }
            _ => (),
        },
        "interpolator" => {
            if !value.is_callable() {
                return Err(Error::Type(format!("{} is not a function", value.inspect())));
            }
            if let Scale::Sequential { interpolator, .. } = &mut *scale.lock().unwrap() {
                *interpolator = value;
            }
        }
        "nice" => {
            let count = match value {
                Val::Undefined => 10.0,
                v => v.to_number(),
            };
            if let Scale::Continuous {
                domain,
                time: false,
                ..
            } = &mut *scale.lock().unwrap()
            {
                if let (Some(first), Some(last)) = (domain.first().copied(), domain.last().copied()) {
                    let (lo, hi) = ticks::nice(first, last, count);
                    let n = domain.len();
                    domain[0] = lo;
                    domain[n - 1] = hi;
                }
            }
        }
        "ticks" => {
            let count = value.to_number();
            return Ok(Val::array(scale.lock().unwrap().ticks(count)));
        }
        "invert" => {
            let y = value.to_number();
            let s = scale.lock().unwrap();
            let Scale::Continuous { domain, range, clamp, time } = &*s else {
                return Ok(Val::Undefined);
            };
            let range: Vec<f64> = range.iter().map(Val::to_number).collect();
            let x = match segment(&range, y, *clamp) {
                Some((i, t)) if i + 1 < domain.len() => domain[i] + (domain[i + 1] - domain[i]) * t,
                _ => f64::NAN,
            };
            return Ok(match time {
                true => to_date(x).map_or(Val::Num(f64::NAN), Val::Date),
                false => Val::Num(x),
            });
        }
        "copy" | "bandwidth" | "step" => return call_method(scale, interp, name, vec![]),
        _ => return Err(Error::Type(format!("scale.{name} is not a function"))),
    }
    Ok(this)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scale(s: Scale) -> ScaleRef {
        Arc::new(Mutex::new(s))
    }

    fn nums(ns: &[f64]) -> Val {
        Val::array(ns.iter().map(|n| Val::Num(*n)).collect())
    }

    #[test]
    fn linear_maps_and_inverts() {
        let mut interp = Interp::new();
        let s = scale(Scale::linear());
        call_method(&s, &mut interp, "domain", vec![nums(&[0.0, 10.0])]).unwrap();
        call_method(&s, &mut interp, "range", vec![nums(&[100.0, 0.0])]).unwrap();
        assert_eq!(apply(&s, &mut interp, &Val::Num(2.5)), Ok(Val::Num(75.0)));
        assert_eq!(apply(&s, &mut interp, &Val::Num(20.0)), Ok(Val::Num(-100.0)));
        assert_eq!(
            call_method(&s, &mut interp, "invert", vec![Val::Num(50.0)]),
            Ok(Val::Num(5.0))
        );

        call_method(&s, &mut interp, "clamp", vec![Val::Bool(true)]).unwrap();
        assert_eq!(apply(&s, &mut interp, &Val::Num(20.0)), Ok(Val::Num(0.0)));
    }

    #[test]
    fn linear_color_range() {
        let mut interp = Interp::new();
        let s = scale(Scale::linear());
        call_method(
            &s,
            &mut interp,
            "range",
            vec![Val::array(vec![Val::string("black"), Val::string("white")])],
        )
        .unwrap();
        assert_eq!(
            apply(&s, &mut interp, &Val::Num(1.0)),
            Ok(Val::string("rgb(255, 255, 255)"))
        );
    }

    #[test]
    fn band_layout() {
        let mut interp = Interp::new();
        let s = scale(Scale::band());
        let letters = Val::array(["A", "B", "C", "D"].iter().map(|l| Val::string(l)).collect());
        call_method(&s, &mut interp, "domain", vec![letters]).unwrap();
        call_method(&s, &mut interp, "range", vec![nums(&[0.0, 100.0])]).unwrap();
        assert_eq!(apply(&s, &mut interp, &Val::string("A")), Ok(Val::Num(0.0)));
        assert_eq!(apply(&s, &mut interp, &Val::string("C")), Ok(Val::Num(50.0)));
        assert_eq!(apply(&s, &mut interp, &Val::string("Z")), Ok(Val::Undefined));
        assert_eq!(s.lock().unwrap().bandwidth(), 25.0);

        call_method(&s, &mut interp, "padding", vec![Val::Num(0.5)]).unwrap();
        // step = 100 / (4 - 0.5 + 1) and bands start half a step in
        let (start, step, width) = s.lock().unwrap().bands().unwrap();
        assert!((step - 100.0 / 4.5).abs() < 1e-9);
        assert!((width - step / 2.0).abs() < 1e-9);
        assert!((start - step / 2.0).abs() < 1e-9);
    }

    #[test]
    fn ordinal_assigns_implicitly() {
        let mut interp = Interp::new();
        let s = scale(Scale::ordinal(vec![Val::string("red"), Val::string("blue")]));
        assert_eq!(apply(&s, &mut interp, &Val::Num(3.0)), Ok(Val::string("red")));
        assert_eq!(apply(&s, &mut interp, &Val::Num(1.0)), Ok(Val::string("blue")));
        assert_eq!(apply(&s, &mut interp, &Val::Num(0.0)), Ok(Val::string("red")));
        assert_eq!(apply(&s, &mut interp, &Val::Num(3.0)), Ok(Val::string("red")));
        assert_eq!(
            call_method(&s, &mut interp, "domain", vec![]),
            Ok(nums(&[3.0, 1.0, 0.0]))
        );
    }

    #[test]
    fn sequential_calls_interpolator() {
        let mut interp = Interp::new();
        let double = interp.eval("return t => t * 2").unwrap();
        let s = scale(Scale::sequential(double));
        call_method(&s, &mut interp, "domain", vec![nums(&[0.0, 100.0])]).unwrap();
        assert_eq!(apply(&s, &mut interp, &Val::Num(25.0)), Ok(Val::Num(0.5)));
    }

    #[test]
    fn copy_is_independent() {
        let mut interp = Interp::new();
        let s = scale(Scale::linear());
        let Ok(Val::Extern(Extern::Scale(copy))) = call_method(&s, &mut interp, "copy", vec![]) else {
            panic!("copy should return a scale");
        };
        call_method(&copy, &mut interp, "domain", vec![nums(&[0.0, 2.0])]).unwrap();
        assert_eq!(apply(&s, &mut interp, &Val::Num(1.0)), Ok(Val::Num(1.0)));
        assert_eq!(apply(&copy, &mut interp, &Val::Num(1.0)), Ok(Val::Num(0.5)));
    }

    #[test]
    fn nice_and_ticks() {
        let mut interp = Interp::new();
        let s = scale(Scale::linear());
        call_method(&s, &mut interp, "domain", vec![nums(&[0.3, 9.6])]).unwrap();
        call_method(&s, &mut interp, "nice", vec![]).unwrap();
        assert_eq!(call_method(&s, &mut interp, "domain", vec![]), Ok(nums(&[0.0, 10.0])));
        assert_eq!(
            call_method(&s, &mut interp, "ticks", vec![Val::Num(2.0)]),
            Ok(nums(&[0.0, 5.0, 10.0]))
        );
    }
}
