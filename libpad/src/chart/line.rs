//! Line path generator
use quill::{arg, fmt_num, Error, Result};
use std::sync::{Arc, Mutex};

use crate::value::{Extern, Interp, Val};

pub type LineRef = Arc<Mutex<Line>>;

/// Accessors mapping data to points, defaulting to `d[0]` and `d[1]`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Line {
    x: Option<Val>,
    y: Option<Val>,
    defined: Option<Val>,
}

pub const METHODS: &[&str] = &["defined", "x", "y"];

impl Line {
    pub fn into_val(self) -> Val {
        Val::Extern(Extern::Line(Arc::new(Mutex::new(self))))
    }
}

fn coordinate(interp: &mut Interp, accessor: &Option<Val>, d: &Val, i: usize, default: usize) -> Result<f64> {
    let v = match accessor {
        Some(Val::Num(n)) => Val::Num(*n),
        Some(f) => interp.call(f, vec![d.clone(), Val::Num(i as f64)])?,
        None => interp.get_member(d, &default.to_string())?,
    };
    Ok(v.to_number())
}

/// Round to the precision paths are written with
fn round(v: f64) -> String {
    fmt_num((v * 1000.0).round() / 1000.0)
}

/// `line(data)`, the SVG path through all defined points
pub(crate) fn call(line: &LineRef, interp: &mut Interp, args: Vec<Val>) -> Result<Val> {
    let gen = line.lock().unwrap().clone();
    let data = interp.iterate(&arg(&args, 0))?;
    let mut path = String::new();
    let mut pen_down = false;
    for (i, d) in data.iter().enumerate() {
        let defined = match &gen.defined {
            Some(f) => interp.call(f, vec![d.clone(), Val::Num(i as f64)])?.truthy(),
            None => true,
        };
        if !defined {
            pen_down = false;
            continue;
        }
        let x = coordinate(interp, &gen.x, d, i, 0)?;
        let y = coordinate(interp, &gen.y, d, i, 1)?;
        path.push(if pen_down { 'L' } else { 'M' });
        path.push_str(&format!("{},{}", round(x), round(y)));
        pen_down = true;
    }
    Ok(if path.is_empty() {
        Val::Null
    } else {
        Val::Str(path)
    })
}

pub(crate) fn call_method(line: &LineRef, name: &str, args: Vec<Val>) -> Result<Val> {
    let mut gen = line.lock().unwrap();
    let slot = match name {
        "x" => &mut gen.x,
        "y" => &mut gen.y,
        "defined" => &mut gen.defined,
        _ => return Err(Error::Type(format!("line.{name} is not a function"))),
    };
    match args.into_iter().next() {
        Some(v) => {
            *slot = Some(v);
            Ok(Val::Extern(Extern::Line(line.clone())))
        }
        None => Ok(slot.clone().unwrap_or(Val::Undefined)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_accessors() {
        let mut interp = Interp::new();
        let line = Arc::new(Mutex::new(Line::default()));
        let data = interp.eval("return [[0, 1], [2.5, 3], [4, 5.0001]]").unwrap();
        assert_eq!(
            call(&line, &mut interp, vec![data]),
            Ok(Val::string("M0,1L2.5,3L4,5"))
        );
    }

    #[test]
    fn custom_accessors_and_gaps() {
        let mut interp = Interp::new();
        let line = Arc::new(Mutex::new(Line::default()));
        let x = interp.eval("return (d, i) => i * 10").unwrap();
        let y = interp.eval("return d => d.v").unwrap();
        let defined = interp.eval("return d => d.v !== null").unwrap();
        call_method(&line, "x", vec![x]).unwrap();
        call_method(&line, "y", vec![y]).unwrap();
        call_method(&line, "defined", vec![defined]).unwrap();

        let data = interp.eval("return [{v: 1}, {v: null}, {v: 3}, {v: 4}]").unwrap();
        assert_eq!(
            call(&line, &mut interp, vec![data]),
            Ok(Val::string("M0,1M20,3L30,4"))
        );
    }

    #[test]
    fn empty_data() {
        let mut interp = Interp::new();
        let line = Arc::new(Mutex::new(Line::default()));
        assert_eq!(
            call(&line, &mut interp, vec![Val::array(vec![])]),
            Ok(Val::Null)
        );
    }
}
