//! Axis generators rendered into selections with `selection.call(axis)`
use quill::{arg, fmt_num, Error, Result};
use std::sync::{Arc, Mutex};

use super::scale::{Scale, ScaleRef};
use crate::dom::Node;
use crate::value::{Extern, Interp, Val};

pub type AxisRef = Arc<Mutex<Axis>>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Orient {
    Top,
    Right,
    Bottom,
    Left,
}

#[derive(Debug, Clone)]
pub struct Axis {
    orient: Orient,
    scale: ScaleRef,
    tick_count: f64,
    tick_values: Option<Val>,
    tick_format: Option<Val>,
    tick_size_inner: f64,
    tick_size_outer: f64,
    tick_padding: f64,
}

pub const METHODS: &[&str] = &[
    "scale",
    "tickFormat",
    "tickPadding",
    "tickSize",
    "tickSizeInner",
    "tickSizeOuter",
    "tickValues",
    "ticks",
];

impl Axis {
    pub fn new(orient: Orient, scale: ScaleRef) -> Self {
        Self {
            orient,
            scale,
            tick_count: 10.0,
            tick_values: None,
            tick_format: None,
            tick_size_inner: 6.0,
            tick_size_outer: 6.0,
            tick_padding: 3.0,
        }
    }

    pub fn into_val(self) -> Val {
        Val::Extern(Extern::Axis(Arc::new(Mutex::new(self))))
    }
}

/// Tick values, positions, and labels for an axis
fn layout(axis: &Axis, interp: &mut Interp) -> Result<Vec<(f64, String)>> {
    let scale = axis.scale.lock().unwrap().clone();
    let values = match &axis.tick_values {
        Some(v) => interp.iterate(v)?,
        None => scale.ticks(axis.tick_count),
    };
    let offset = match &scale {
        Scale::Band { .. } => scale.bandwidth() / 2.0,
        _ => 0.0,
    };
    let mut ticks = vec![];
    for (i, value) in values.iter().enumerate() {
        let pos = super::scale::apply(&axis.scale, interp, value)?.to_number() + offset;
        if !pos.is_finite() {
            continue;
        }
        let label = match &axis.tick_format {
            Some(f) => interp
                .call(f, vec![value.clone(), Val::Num(i as f64)])?
                .to_js_string(),
            None => scale.tick_label(value, axis.tick_count),
        };
        ticks.push((pos, label));
    }
    Ok(ticks)
}

/// Draw axis into each node of the target selection
fn render(axis: &Axis, interp: &mut Interp, target: &Node) -> Result<()> {
    let (r0, r1) = axis.scale.lock().unwrap().range_extent();
    let vertical = matches!(axis.orient, Orient::Left | Orient::Right);
    let k = match axis.orient {
        Orient::Top | Orient::Left => -1.0,
        Orient::Bottom | Orient::Right => 1.0,
    };
    let spacing = axis.tick_size_inner.max(0.0) + axis.tick_padding;
    let outer = fmt_num(k * axis.tick_size_outer);
    let (r0, r1) = (fmt_num(r0), fmt_num(r1));

    target.set_attr("fill", "none");
    target.set_attr("font-size", "10");
    target.set_attr("font-family", "sans-serif");
    target.set_attr(
        "text-anchor",
        match axis.orient {
            Orient::Right => "start",
            Orient::Left => "end",
            _ => "middle",
        },
    );

    let domain = Node::new("path");
    domain.set_attr("class", "domain");
    domain.set_attr("stroke", "currentColor");
    let d = if vertical {
        format!("M{outer},{r0}H0V{r1}H{outer}")
    } else {
        format!("M{r0},{outer}V0H{r1}V{outer}")
    };
    domain.set_attr("d", &d);
    target.append_child(&domain);

    for (pos, label) in layout(axis, interp)? {
        let tick = Node::new("g");
        tick.set_attr("class", "tick");
        tick.set_attr("opacity", "1");
        let transform = if vertical {
            format!("translate(0,{})", fmt_num(pos))
        } else {
            format!("translate({},0)", fmt_num(pos))
        };
        tick.set_attr("transform", &transform);

        let line = Node::new("line");
        line.set_attr("stroke", "currentColor");
        line.set_attr(if vertical { "x2" } else { "y2" }, &fmt_num(k * axis.tick_size_inner));

        let text = Node::new("text");
        text.set_attr("fill", "currentColor");
        text.set_attr(if vertical { "x" } else { "y" }, &fmt_num(k * spacing));
        let dy = match axis.orient {
            Orient::Top => "0em",
            Orient::Bottom => "0.71em",
            Orient::Left | Orient::Right => "0.32em",
        };
        text.set_attr("dy", dy);
        text.set_text(&label);

        tick.append_child(&line);
        tick.append_child(&text);
        target.append_child(&tick);
    }
    Ok(())
}

/// `axis(selection)`
pub(crate) fn call(axis: &AxisRef, interp: &mut Interp, args: Vec<Val>) -> Result<Val> {
    let snapshot = axis.lock().unwrap().clone();
    let targets = match arg(&args, 0) {
        Val::Extern(Extern::Selection(s)) => s.nodes().to_vec(),
        Val::Extern(Extern::Node(n)) => vec![n],
        v => {
            return Err(Error::Type(format!(
                "axis expects a selection, got {}",
                v.inspect()
            )))
        }
    };
    for target in &targets {
        render(&snapshot, interp, target)?;
    }
    Ok(Val::Undefined)
}

pub(crate) fn call_method(axis: &AxisRef, name: &str, args: Vec<Val>) -> Result<Val> {
    let this = Val::Extern(Extern::Axis(axis.clone()));
    let value = arg(&args, 0);
    let mut a = axis.lock().unwrap();
    if args.is_empty() {
        let current = match name {
            "scale" => Val::Extern(Extern::Scale(a.scale.clone())),
            "tickFormat" => a.tick_format.clone().unwrap_or(Val::Null),
            "tickValues" => a.tick_values.clone().unwrap_or(Val::Null),
            "tickSize" | "tickSizeInner" => Val::Num(a.tick_size_inner),
            "tickSizeOuter" => Val::Num(a.tick_size_outer),
            "tickPadding" => Val::Num(a.tick_padding),
            "ticks" => return Ok(this),
            _ => return Err(Error::Type(format!("axis.{name} is not a function"))),
        };
        return Ok(current);
    }
    match name {
        "scale" => match value {
            Val::Extern(Extern::Scale(s)) => a.scale = s,
            v => return Err(Error::Type(format!("{} is not a scale", v.inspect()))),
        },
        "ticks" => {
            if let Val::Num(n) = value {
                a.tick_count = n;
            }
            if let Some(format) = args.get(1).filter(|f| f.is_callable()) {
                a.tick_format = Some(format.clone());
            }
        }
        "tickFormat" => a.tick_format = Some(value).filter(Val::is_callable),
        "tickValues" => a.tick_values = Some(value).filter(|v| !v.is_nullish()),
        "tickSize" => {
            a.tick_size_inner = value.to_number();
            a.tick_size_outer = value.to_number();
        }
        "tickSizeInner" => a.tick_size_inner = value.to_number(),
        "tickSizeOuter" => a.tick_size_outer = value.to_number(),
        "tickPadding" => a.tick_padding = value.to_number(),
        _ => return Err(Error::Type(format!("axis.{name} is not a function"))),
    }
    Ok(this)
}
