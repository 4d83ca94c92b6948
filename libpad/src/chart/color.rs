//! Colors, color schemes, and interpolators
use crate::value::Val;

/// Ten categorical colors
pub const CATEGORY10: &[&str] = &[
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

const BLUES: &[&str] = &[
    "#f7fbff", "#deebf7", "#c6dbef", "#9ecae1", "#6baed6", "#4292c6", "#2171b5", "#08519c",
    "#08306b",
];

const GREYS: &[&str] = &[
    "#ffffff", "#f0f0f0", "#d9d9d9", "#bdbdbd", "#969696", "#737373", "#525252", "#252525",
    "#000000",
];

/// Opaque color in 8-bit channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Parse `#rgb`, `#rrggbb`, `rgb(r, g, b)`, or a handful of named colors
    pub fn parse(s: &str) -> Option<Rgb> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix('#') {
            let channel = |i: usize, len: usize| u8::from_str_radix(hex.get(i..i + len)?, 16).ok();
            return match hex.len() {
                6 => Some(Rgb(channel(0, 2)?, channel(2, 2)?, channel(4, 2)?)),
                3 => Some(Rgb(
                    channel(0, 1)? * 17,
                    channel(1, 1)? * 17,
                    channel(2, 1)? * 17,
                )),
                _ => None,
            };
        }
        if let Some(body) = s.strip_prefix("rgb(").and_then(|s| s.strip_suffix(')')) {
            let parts: Vec<u8> = body
                .split(',')
                .map(|p| p.trim().parse::<f64>().map(|v| v.round().clamp(0.0, 255.0) as u8))
                .collect::<Result<_, _>>()
                .ok()?;
            return match parts[..] {
                [r, g, b] => Some(Rgb(r, g, b)),
                _ => None,
            };
        }
        let named = match s.to_ascii_lowercase().as_str() {
            "black" => "#000000",
            "white" => "#ffffff",
            "red" => "#ff0000",
            "green" => "#008000",
            "blue" => "#0000ff",
            "steelblue" => "#4682b4",
            "orange" => "#ffa500",
            "gray" | "grey" => "#808080",
            "purple" => "#800080",
            _ => return None,
        };
        Rgb::parse(named)
    }

    /// Blend towards `other` by `t` in `[0, 1]`
    pub fn mix(self, other: Rgb, t: f64) -> Rgb {
        let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round().clamp(0.0, 255.0) as u8;
        Rgb(lerp(self.0, other.0), lerp(self.1, other.1), lerp(self.2, other.2))
    }
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rgb({}, {}, {})", self.0, self.1, self.2)
    }
}

/// Function from `t` in `[0, 1]` to an output value
#[derive(Debug, Clone, PartialEq)]
pub enum Interpolator {
    Number(f64, f64),
    Round(f64, f64),
    Rgb(Rgb, Rgb),
    /// Piecewise blend through a sequential scheme
    Scheme(&'static str, &'static [&'static str]),
}

impl Interpolator {
    pub fn blues() -> Self {
        Interpolator::Scheme("interpolateBlues", BLUES)
    }

    pub fn greys() -> Self {
        Interpolator::Scheme("interpolateGreys", GREYS)
    }

    pub fn at(&self, t: f64) -> Val {
        match self {
            Interpolator::Number(a, b) => Val::Num(a + (b - a) * t),
            Interpolator::Round(a, b) => Val::Num((a + (b - a) * t).round()),
            Interpolator::Rgb(a, b) => Val::Str(a.mix(*b, t.clamp(0.0, 1.0)).to_string()),
            Interpolator::Scheme(_, stops) => {
                let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
                let n = stops.len() - 1;
                let pos = t * n as f64;
                let i = (pos.floor() as usize).min(n - 1);
                let (a, b) = (rgb_of(stops[i]), rgb_of(stops[i + 1]));
                Val::Str(a.mix(b, pos - i as f64).to_string())
            }
        }
    }
}

fn rgb_of(hex: &str) -> Rgb {
    Rgb::parse(hex).unwrap_or(Rgb(0, 0, 0))
}

impl std::fmt::Display for Interpolator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Interpolator::Number(..) => write!(f, "interpolateNumber"),
            Interpolator::Round(..) => write!(f, "interpolateRound"),
            Interpolator::Rgb(..) => write!(f, "interpolateRgb"),
            Interpolator::Scheme(name, _) => write!(f, "{name}"),
        }
    }
}
