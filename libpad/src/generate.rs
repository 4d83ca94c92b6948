//! Random data generators and sample datasets
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use quill::{arg, Error, Result};
use rand::Rng;

use crate::value::{Interp, Val};

/// Relative frequency of letters in English text
const ALPHABET: &[(&str, f64)] = &[
    ("A", 0.08167),
    ("B", 0.01492),
    ("C", 0.02782),
    ("D", 0.04253),
    ("E", 0.12702),
    ("F", 0.02288),
    ("G", 0.02015),
    ("H", 0.06094),
    ("I", 0.06966),
    ("J", 0.00153),
    ("K", 0.00772),
    ("L", 0.04025),
    ("M", 0.02406),
    ("N", 0.06749),
    ("O", 0.07507),
    ("P", 0.01929),
    ("Q", 0.00095),
    ("R", 0.05987),
    ("S", 0.06327),
    ("T", 0.09056),
    ("U", 0.02758),
    ("V", 0.00978),
    ("W", 0.02360),
    ("X", 0.00150),
    ("Y", 0.01974),
    ("Z", 0.00074),
];

/// Trading days in the stocks sample
const STOCK_DAYS: usize = 252;

/// Upper bound on generated collection sizes
const MAX_COUNT: f64 = 1_000_000.0;

/// Deepest tree `hierarchy` builds
const MAX_DEPTH: usize = 32;

/// Number of groups `scatter` and `network` draw from
const GROUPS: u32 = 5;

fn midnight(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Count argument at `idx`, or default when absent
fn count(args: &[Val], idx: usize, default: usize) -> Result<usize> {
    match arg(args, idx) {
        Val::Undefined => Ok(default),
        v => {
            let n = v.to_number();
            if !(0.0..=MAX_COUNT).contains(&n) {
                return Err(Error::Range(format!("Invalid count: {}", v.to_js_string())));
            }
            Ok(n as usize)
        }
    }
}

fn random_vec(n: usize) -> Vec<f64> {
    let mut rng = rand::thread_rng();
    (0..n).map(|_| rng.gen::<f64>()).collect()
}

/// Daily `(date, value)` points wandering around a sine wave
pub fn time_series(n: usize, start: NaiveDateTime) -> Vec<(NaiveDateTime, f64)> {
    let mut rng = rand::thread_rng();
    (0..n)
        .map(|i| {
            let date = start + Duration::days(i as i64);
            let value = rng.gen::<f64>() * 100.0 + (i as f64 / 10.0).sin() * 20.0;
            (date, value)
        })
        .collect()
}

fn random(_interp: &mut Interp, args: &[Val]) -> Result<Val> {
    let n = count(args, 0, 100)?;
    Ok(Val::array(random_vec(n).into_iter().map(Val::Num).collect()))
}

fn time_series_native(_interp: &mut Interp, args: &[Val]) -> Result<Val> {
    let n = count(args, 0, 100)?;
    let start = match arg(args, 1) {
        Val::Undefined => midnight(2020, 1, 1),
        Val::Date(d) => d,
        v => DateTime::from_timestamp_millis(v.to_number() as i64)
            .map(|d| d.naive_utc())
            .ok_or_else(|| Error::Range("Invalid time value".to_string()))?,
    };
    let points = time_series(n, start)
        .into_iter()
        .map(|(date, value)| Val::object([("date", Val::Date(date)), ("value", Val::Num(value))]))
        .collect();
    Ok(Val::array(points))
}

fn scatter(_interp: &mut Interp, args: &[Val]) -> Result<Val> {
    let n = count(args, 0, 100)?;
    let mut rng = rand::thread_rng();
    let points = (0..n)
        .map(|_| {
            Val::object([
                ("x", Val::Num(rng.gen::<f64>() * 100.0)),
                ("y", Val::Num(rng.gen::<f64>() * 100.0)),
                ("category", Val::Num(rng.gen_range(0..GROUPS) as f64)),
            ])
        })
        .collect();
    Ok(Val::array(points))
}

fn tree(rng: &mut impl Rng, level: usize, children: usize, name: String) -> Val {
    if level == 0 {
        return Val::object([
            ("name", Val::Str(name)),
            ("value", Val::Num(rng.gen::<f64>() * 100.0)),
        ]);
    }
    let kids = (0..children)
        .map(|i| tree(rng, level - 1, children, format!("{name}-{i}")))
        .collect();
    Val::object([("name", Val::Str(name)), ("children", Val::array(kids))])
}

fn hierarchy(_interp: &mut Interp, args: &[Val]) -> Result<Val> {
    let depth = count(args, 0, 3)?;
    let children = count(args, 1, 3)?;
    if depth > MAX_DEPTH {
        return Err(Error::Range(format!(
            "hierarchy depth {depth} exceeds {MAX_DEPTH}"
        )));
    }
    let leaves = (children as f64).powi(depth as i32);
    if leaves > MAX_COUNT {
        return Err(Error::Range(format!(
            "hierarchy of depth {depth} with {children} children is too large"
        )));
    }
    Ok(tree(&mut rand::thread_rng(), depth, children, "root".to_string()))
}

fn network(_interp: &mut Interp, args: &[Val]) -> Result<Val> {
    let nodes = count(args, 0, 20)?;
    let links = count(args, 1, 30)?;
    let mut rng = rand::thread_rng();
    let node_data = (0..nodes)
        .map(|i| {
            Val::object([
                ("id", Val::Num(i as f64)),
                ("group", Val::Num(rng.gen_range(0..GROUPS) as f64)),
            ])
        })
        .collect();
    let endpoint = |rng: &mut rand::rngs::ThreadRng| {
        if nodes == 0 {
            0.0
        } else {
            rng.gen_range(0..nodes) as f64
        }
    };
    let link_data = (0..links)
        .map(|_| {
            let source = endpoint(&mut rng);
            let target = endpoint(&mut rng);
            Val::object([
                ("source", Val::Num(source)),
                ("target", Val::Num(target)),
                ("value", Val::Num(rng.gen::<f64>())),
            ])
        })
        .collect();
    Ok(Val::object([
        ("nodes", Val::array(node_data)),
        ("links", Val::array(link_data)),
    ]))
}

/// The `generateData` namespace
pub fn generators() -> Val {
    Val::object([
        ("random", Val::native("random", random)),
        ("timeSeries", Val::native("timeSeries", time_series_native)),
        ("scatter", Val::native("scatter", scatter)),
        ("hierarchy", Val::native("hierarchy", hierarchy)),
        ("network", Val::native("network", network)),
    ])
}

/// The `sampleData` namespace
pub fn samples() -> Val {
    let alphabet = ALPHABET
        .iter()
        .map(|(letter, frequency)| {
            Val::object([
                ("letter", Val::string(letter)),
                ("frequency", Val::Num(*frequency)),
            ])
        })
        .collect();
    let stocks = time_series(STOCK_DAYS, midnight(2023, 1, 1))
        .into_iter()
        .map(|(date, value)| Val::object([("date", Val::Date(date)), ("close", Val::Num(value + 100.0))]))
        .collect();
    Val::object([("alphabet", Val::array(alphabet)), ("stocks", Val::array(stocks))])
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn eval(src: &str) -> Val {
        let mut interp = Interp::new();
        interp.define_global("generateData", generators());
        interp.define_global("sampleData", samples());
        interp.eval(src).unwrap()
    }

    #[test]
    fn random_numbers() {
        assert_eq!(eval("return generateData.random().length"), Val::Num(100.0));
        assert_eq!(
            eval("return generateData.random(50).every(v => v >= 0 && v < 1)"),
            Val::Bool(true)
        );
    }

    #[test]
    fn time_series_days_apart() {
        let v = eval(
            "const s = generateData.timeSeries(3);
             return [s.length, s[1].date.getTime() - s[0].date.getTime(), s[0].date.toISOString()]",
        );
        assert_eq!(v.inspect(), "[3, 86400000, '2020-01-01T00:00:00.000Z']");
    }

    #[test]
    fn scatter_categories() {
        let v = eval(
            "return generateData.scatter(200).every(p =>
               p.x >= 0 && p.x < 100 && p.y >= 0 && p.y < 100 &&
               p.category >= 0 && p.category < 5 && Math.floor(p.category) === p.category)",
        );
        assert_eq!(v, Val::Bool(true));
    }

    #[test]
    fn hierarchy_names() {
        let v = eval(
            "const h = generateData.hierarchy(2, 2);
             return [h.name, h.children[1].name, h.children[1].children[0].name,
                     h.children[1].children[0].children]",
        );
        assert_eq!(v.inspect(), "['root', 'root-1', 'root-1-0', undefined]");
        assert_eq!(eval("return generateData.hierarchy(0).name"), Val::string("root"));
    }

    #[test]
    fn network_shape() {
        let v = eval(
            "const g = generateData.network(4, 10);
             return [g.nodes.length, g.links.length,
                     g.links.every(l => l.source < 4 && l.target < 4)]",
        );
        assert_eq!(v.inspect(), "[4, 10, true]");
    }

    #[test]
    fn samples_data() {
        let v = eval(
            "const a = sampleData.alphabet;
             return [a.length, a[4].letter, a[4].frequency, sampleData.stocks.length,
                     sampleData.stocks[0].date.toISOString()]",
        );
        assert_eq!(
            v.inspect(),
            "[26, 'E', 0.12702, 252, '2023-01-01T00:00:00.000Z']"
        );
    }

    #[test]
    fn invalid_counts() {
        let mut interp = Interp::new();
        interp.define_global("generateData", generators());
        assert!(interp.eval("return generateData.random(-1)").is_err());
        assert!(interp.eval("return generateData.hierarchy(30, 10)").is_err());
    }

    #[test]
    fn hierarchy_depth_limit() {
        let mut interp = Interp::new();
        interp.define_global("generateData", generators());
        assert_matches!(
            interp.eval("return generateData.hierarchy(20000, 1)"),
            Err(Error::Range(msg)) if msg.contains("exceeds")
        );
        let v = interp
            .eval("let h = generateData.hierarchy(32, 1); let n = 0; while (h.children) { h = h.children[0]; n++ } return n")
            .unwrap();
        assert_eq!(v, Val::Num(32.0));
    }
}
