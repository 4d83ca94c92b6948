//! Chart kit exposed to snippets as `d3`
pub mod axis;
pub mod color;
pub mod line;
pub mod scale;
pub mod selection;
pub mod ticks;

use quill::{arg, Error, Result};
use std::cmp::Ordering;

use self::axis::{Axis, Orient};
use self::color::{Interpolator, Rgb, CATEGORY10};
use self::line::Line;
use self::scale::Scale;
use self::selection::Selection;
use crate::dom::{Document, Node};
use crate::value::{Extern, Interp, Val};

/// The `d3` namespace, bound to the document selections search
#[derive(Debug, Clone)]
pub struct Kit {
    doc: Document,
}

impl Kit {
    pub fn new(doc: &Document) -> Self {
        Self { doc: doc.clone() }
    }

    pub fn into_val(self) -> Val {
        Val::Extern(Extern::Kit(self))
    }
}

pub const METHODS: &[&str] = &[
    "axisBottom",
    "axisLeft",
    "axisRight",
    "axisTop",
    "create",
    "extent",
    "interpolateNumber",
    "interpolateRgb",
    "interpolateRound",
    "line",
    "max",
    "min",
    "scaleBand",
    "scaleLinear",
    "scaleOrdinal",
    "scaleSequential",
    "scaleTime",
    "select",
    "selectAll",
    "sum",
];

pub(crate) fn get(_kit: &Kit, key: &str) -> Option<Val> {
    let val = match key {
        "schemeCategory10" => Val::array(CATEGORY10.iter().map(|c| Val::string(c)).collect()),
        "interpolateBlues" => Val::Extern(Extern::Interpolator(Interpolator::blues())),
        "interpolateGreys" => Val::Extern(Extern::Interpolator(Interpolator::greys())),
        _ => return None,
    };
    Some(val)
}

/// Values of `data`, through `accessor` when given, skipping nullish and NaN
fn values(interp: &mut Interp, args: &[Val]) -> Result<Vec<Val>> {
    let data = interp.iterate(&arg(args, 0))?;
    let accessor = args.get(1).filter(|f| f.is_callable()).cloned();
    let mut out = vec![];
    for (i, d) in data.into_iter().enumerate() {
        let v = match &accessor {
            Some(f) => interp.call(f, vec![d, Val::Num(i as f64)])?,
            None => d,
        };
        let missing = match &v {
            Val::Str(_) => false,
            v => v.is_nullish() || v.to_number().is_nan(),
        };
        if !missing {
            out.push(v);
        }
    }
    Ok(out)
}

fn order(a: &Val, b: &Val) -> Ordering {
    match (a, b) {
        (Val::Str(x), Val::Str(y)) => x.cmp(y),
        _ => a.to_number().total_cmp(&b.to_number()),
    }
}

fn color(v: &Val) -> Result<Rgb> {
    let text = v.to_js_string();
    Rgb::parse(&text).ok_or_else(|| Error::Type(format!("invalid color: {text}")))
}

fn scale_of(v: &Val) -> Result<scale::ScaleRef> {
    match v {
        Val::Extern(Extern::Scale(s)) => Ok(s.clone()),
        v => Err(Error::Type(format!("{} is not a scale", v.inspect()))),
    }
}

pub(crate) fn call_method(kit: &Kit, interp: &mut Interp, name: &str, args: Vec<Val>) -> Result<Val> {
    let first = arg(&args, 0);
    let val = match name {
        "select" => {
            let nodes = match &first {
                Val::Extern(e) => e.as_node().into_iter().collect(),
                v => kit.doc.select(&v.to_js_string()).into_iter().collect(),
            };
            Selection::of(nodes, vec![kit.doc.root().clone()]).into_val()
        }
        "selectAll" => {
            let selector = first.to_js_string();
            let nodes = kit.doc.root().select_all(&selector);
            Selection::of(nodes, vec![kit.doc.root().clone()]).into_val()
        }
        "create" => Selection::of(vec![Node::new(&first.to_js_string())], vec![]).into_val(),

        "scaleLinear" => Scale::linear().into_val(),
        "scaleTime" => Scale::time().into_val(),
        "scaleBand" => Scale::band().into_val(),
        "scaleOrdinal" => {
            let range = match &first {
                Val::Undefined => vec![],
                v => interp.iterate(v)?,
            };
            Scale::ordinal(range).into_val()
        }
        "scaleSequential" => {
            let (domain, interpolator) = match &first {
                Val::Array(_) => (Some(first.clone()), arg(&args, 1)),
                v => (None, v.clone()),
            };
            let interpolator = match interpolator {
                Val::Undefined => Val::Extern(Extern::Interpolator(Interpolator::Number(0.0, 1.0))),
                f => f,
            };
            let scale = Scale::sequential(interpolator).into_val();
            if let Some(domain) = domain {
                interp.call_method(&scale, "domain", vec![domain])?;
            }
            scale
        }

        "max" | "min" => {
            let vals = values(interp, &args)?;
            let pick = if name == "max" {
                vals.into_iter().max_by(order)
            } else {
                vals.into_iter().min_by(order)
            };
            pick.unwrap_or(Val::Undefined)
        }
        "extent" => {
            let vals = values(interp, &args)?;
            let lo = vals.iter().min_by(|a, b| order(a, b)).cloned();
            let hi = vals.iter().max_by(|a, b| order(a, b)).cloned();
            Val::array(vec![
                lo.unwrap_or(Val::Undefined),
                hi.unwrap_or(Val::Undefined),
            ])
        }
        "sum" => {
            let total = values(interp, &args)?.iter().map(Val::to_number).sum();
            Val::Num(total)
        }

        "line" => Line::default().into_val(),
        "axisBottom" | "axisLeft" | "axisTop" | "axisRight" => {
            let orient = match name {
                "axisBottom" => Orient::Bottom,
                "axisLeft" => Orient::Left,
                "axisTop" => Orient::Top,
                _ => Orient::Right,
            };
            Axis::new(orient, scale_of(&first)?).into_val()
        }

        "interpolateRgb" => {
            let (a, b) = (color(&first)?, color(&arg(&args, 1))?);
            Val::Extern(Extern::Interpolator(Interpolator::Rgb(a, b)))
        }
        "interpolateRound" | "interpolateNumber" => {
            let (a, b) = (first.to_number(), arg(&args, 1).to_number());
            let i = if name == "interpolateRound" {
                Interpolator::Round(a, b)
            } else {
                Interpolator::Number(a, b)
            };
            Val::Extern(Extern::Interpolator(i))
        }
        _ => return Err(Error::Type(format!("d3.{name} is not a function"))),
    };
    Ok(val)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(src: &str) -> (Document, Val) {
        let doc = Document::new();
        let mut interp = Interp::new();
        interp.define_global("d3", Kit::new(&doc).into_val());
        let v = interp.eval(src).unwrap();
        (doc, v)
    }

    #[test]
    fn max_min_extent() {
        let (_, v) = run("return [d3.max([3, null, 7, 1]), d3.min([3, NaN, 7, 1]), d3.extent([])]");
        assert_eq!(v.inspect(), "[7, 1, [undefined, undefined]]");

        let (_, v) = run("return d3.max([{v: 2}, {v: 9}], d => d.v)");
        assert_eq!(v, Val::Num(9.0));
    }

    #[test]
    fn select_output() {
        let (doc, _) = run(
            "d3.select('#output').append('p').attr('class', 'note').text('hi'); return null",
        );
        assert_eq!(
            doc.output().to_markup(),
            r#"<div id="output"><p class="note">hi</p></div>"#
        );
    }

    #[test]
    fn create_detached() {
        let (doc, v) = run("return d3.create('svg').attr('width', 10).node()");
        let Val::Extern(Extern::Node(node)) = v else {
            panic!("expected node");
        };
        assert_eq!(node.to_markup(), r#"<svg width="10"></svg>"#);
        assert!(!doc.root().contains(&node));
    }

    #[test]
    fn scales_and_interpolators() {
        let (_, v) = run(
            "const x = d3.scaleLinear().domain([0, 10]).range([0, 100]); return x(2.5)",
        );
        assert_eq!(v, Val::Num(25.0));

        let (_, v) = run("return d3.interpolateRgb('#000', '#fff')(0.5)");
        assert_eq!(v, Val::string("rgb(128, 128, 128)"));

        let (_, v) = run("return d3.scaleSequential([0, 100], d3.interpolateRound(0, 10))(55)");
        assert_eq!(v, Val::Num(6.0));

        let (_, v) = run("return d3.scaleOrdinal(d3.schemeCategory10)('b')");
        assert_eq!(v, Val::string("#1f77b4"));
    }

    #[test]
    fn unknown_method() {
        let doc = Document::new();
        let mut interp = Interp::new();
        interp.define_global("d3", Kit::new(&doc).into_val());
        assert_eq!(
            interp.eval("return d3.forceSimulation()"),
            Err(Error::Type("d3.forceSimulation is not a function".to_string()))
        );
    }
}
