//! `Legend(color, options)`, a color key for a scale
use quill::{arg, fmt_num, Result};
use std::sync::{Arc, Mutex};

use crate::canvas::Canvas;
use crate::chart::axis::{self, Axis, Orient};
use crate::chart::color::Rgb;
use crate::chart::scale::Scale;
use crate::dom::Node;
use crate::value::{Interp, Val};

/// Samples taken from an interpolator for the color ramp
const RAMP_SAMPLES: u32 = 256;

/// Legend layout, with unset options filled in
#[derive(Debug, Clone)]
struct Options {
    title: Option<String>,
    tick_size: f64,
    width: f64,
    height: f64,
    margin_top: f64,
    margin_right: f64,
    margin_bottom: f64,
    margin_left: f64,
    ticks: f64,
    tick_format: Option<Val>,
    tick_values: Option<Val>,
}

impl Options {
    fn read(interp: &mut Interp, opts: &Val) -> Result<Self> {
        let mut get = |key: &str| -> Result<Option<Val>> {
            if opts.is_nullish() {
                return Ok(None);
            }
            let v = interp.get_member(opts, key)?;
            Ok(Some(v).filter(|v| !v.is_nullish()))
        };
        let num = |v: Option<Val>, default: f64| v.map_or(default, |v| v.to_number());

        let tick_size = num(get("tickSize")?, 6.0);
        let width = num(get("width")?, 320.0);
        Ok(Self {
            title: get("title")?.map(|v| v.to_js_string()).filter(|t| !t.is_empty()),
            tick_size,
            width,
            height: num(get("height")?, 44.0 + tick_size),
            margin_top: num(get("marginTop")?, 18.0),
            margin_right: num(get("marginRight")?, 0.0),
            margin_bottom: num(get("marginBottom")?, 16.0 + tick_size),
            margin_left: num(get("marginLeft")?, 0.0),
            ticks: num(get("ticks")?, width / 64.0),
            tick_format: get("tickFormat")?.filter(Val::is_callable),
            tick_values: get("tickValues")?,
        })
    }
}

/// Draw `n` samples of interpolator into a single row raster
fn ramp(interp: &mut Interp, color: &Val, n: u32) -> Result<Canvas> {
    let mut canvas = Canvas::new(n as f64, 1.0, 1.0)?;
    for i in 0..n {
        let t = i as f64 / (n - 1) as f64;
        let sample = interp.call(color, vec![Val::Num(t)])?;
        if let Some(fill) = Rgb::parse(&sample.to_js_string()) {
            canvas.set_fill(fill);
        }
        canvas.fill_rect(i as f64, 0.0, 1.0, 1.0);
    }
    Ok(canvas)
}

/// Interpolator of scales that blend through one
fn interpolator_of(interp: &mut Interp, color: &Val) -> Result<Option<Val>> {
    if color.is_nullish() || !interp.get_member(color, "interpolator")?.is_callable() {
        return Ok(None);
    }
    let f = interp.call_method(color, "interpolator", vec![])?;
    Ok(Some(f).filter(Val::is_callable))
}

fn domain_of(interp: &mut Interp, color: &Val) -> Result<(f64, f64)> {
    let domain = interp.call_method(color, "domain", vec![])?;
    let values = interp.iterate(&domain)?;
    let nums: Vec<f64> = values.iter().map(Val::to_number).collect();
    Ok(match nums[..] {
        [a, .., b] => (a, b),
        _ => (0.0, 1.0),
    })
}

/// Tick marks spanning the ramp, along the bottom margin
fn ticks(interp: &mut Interp, svg: &Node, o: &Options, domain: (f64, f64)) -> Result<()> {
    let x = Arc::new(Mutex::new(Scale::Continuous {
        domain: vec![domain.0, domain.1],
        range: vec![Val::Num(o.margin_left), Val::Num(o.width - o.margin_right)],
        clamp: false,
        time: false,
    }));
    let bottom = Arc::new(Mutex::new(Axis::new(Orient::Bottom, x)));
    axis::call_method(&bottom, "ticks", vec![Val::Num(o.ticks)])?;
    axis::call_method(&bottom, "tickSize", vec![Val::Num(o.tick_size)])?;
    if let Some(f) = &o.tick_format {
        axis::call_method(&bottom, "tickFormat", vec![f.clone()])?;
    }
    if let Some(v) = &o.tick_values {
        axis::call_method(&bottom, "tickValues", vec![v.clone()])?;
    }

    let g = Node::new("g");
    g.set_attr(
        "transform",
        &format!("translate(0,{})", fmt_num(o.height - o.margin_bottom)),
    );
    axis::call(&bottom, interp, vec![Val::from(g.clone())])?;
    for domain in g.select_all(".domain") {
        g.remove_child(&domain);
    }
    let y1 = fmt_num(o.margin_top + o.margin_bottom - o.height);
    for line in g.select_all("line") {
        line.set_attr("y1", &y1);
    }
    svg.append_child(&g);
    Ok(())
}

/// Build the legend `<svg>` for color scale
pub fn legend(interp: &mut Interp, args: &[Val]) -> Result<Val> {
    let color = arg(args, 0);
    let o = Options::read(interp, &arg(args, 1))?;

    let svg = Node::new("svg");
    svg.set_attr("width", &fmt_num(o.width));
    svg.set_attr("height", &fmt_num(o.height));
    svg.set_attr(
        "viewBox",
        &format!("0,0,{},{}", fmt_num(o.width), fmt_num(o.height)),
    );
    svg.set_style("overflow", "visible");
    svg.set_style("display", "block");

    if let Some(f) = interpolator_of(interp, &color)? {
        let url = ramp(interp, &f, RAMP_SAMPLES)?
            .to_data_url()
            .map_err(|e| quill::Error::UnexpectedState(format!("Failed to encode ramp - {e}")))?;
        let image = Node::new("image");
        image.set_attr("x", &fmt_num(o.margin_left));
        image.set_attr("y", &fmt_num(o.margin_top));
        image.set_attr("width", &fmt_num(o.width - o.margin_left - o.margin_right));
        image.set_attr("height", &fmt_num(o.height - o.margin_top - o.margin_bottom));
        image.set_attr("preserveAspectRatio", "none");
        image.set_attr("xlink:href", &url);
        svg.append_child(&image);

        let domain = domain_of(interp, &color)?;
        ticks(interp, &svg, &o, domain)?;
    }

    if let Some(title) = &o.title {
        let text = Node::new("text");
        text.set_attr("x", &fmt_num(o.margin_left));
        text.set_attr("y", &fmt_num(o.margin_top - 6.0));
        text.set_attr("fill", "currentColor");
        text.set_attr("text-anchor", "start");
        text.set_attr("font-weight", "bold");
        text.set_text(title);
        svg.append_child(&text);
    }

    Ok(Val::from(svg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::Kit;
    use crate::dom::Document;
    use base64::Engine;

    fn interp() -> Interp {
        let mut interp = Interp::new();
        interp.define_global("d3", Kit::new(&Document::new()).into_val());
        interp.define_global("Legend", Val::native("Legend", legend));
        interp
    }

    fn svg_of(v: Val) -> Node {
        match v {
            Val::Extern(e) => e.as_node().unwrap(),
            v => panic!("expected node, got {v:?}"),
        }
    }

    #[test]
    fn defaults() {
        let mut interp = interp();
        let svg = svg_of(interp.eval("return Legend(d3.scaleOrdinal(['red']))").unwrap());
        assert_eq!(
            svg.to_markup(),
            r#"<svg width="320" height="50" viewBox="0,0,320,50" style="overflow: visible; display: block"></svg>"#
        );
    }

    #[test]
    fn sequential_ramp() {
        let mut interp = interp();
        let svg = svg_of(
            interp
                .eval(
                    "const c = d3.scaleSequential([0, 100], d3.interpolateBlues);
                     return Legend(c, {title: 'Rate'})",
                )
                .unwrap(),
        );
        let image = &svg.select_all("image")[0];
        assert_eq!(image.attr("width").as_deref(), Some("320"));
        assert_eq!(image.attr("height").as_deref(), Some("10"));
        assert_eq!(image.attr("preserveAspectRatio").as_deref(), Some("none"));

        let href = image.attr("xlink:href").unwrap();
        let b64 = href.strip_prefix("data:image/png;base64,").unwrap();
        let png = base64::engine::general_purpose::STANDARD.decode(b64).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (256, 1));

        let labels: Vec<String> = svg.select_all(".tick").iter().map(Node::text).collect();
        assert_eq!(labels.first().map(String::as_str), Some("0"));
        assert_eq!(labels.last().map(String::as_str), Some("100"));
        assert!(svg.select_all(".domain").is_empty());

        let title = svg.select_all("text").pop().unwrap();
        assert_eq!(title.text(), "Rate");
        assert_eq!(title.attr("font-weight").as_deref(), Some("bold"));
        assert_eq!(title.attr("y").as_deref(), Some("12"));
    }

    #[test]
    fn tick_values_and_format() {
        let mut interp = interp();
        let svg = svg_of(
            interp
                .eval(
                    "return Legend(d3.scaleSequential(d3.interpolateGreys), {
                       tickValues: [0, 0.5, 1],
                       tickFormat: d => d * 100 + '%',
                     })",
                )
                .unwrap(),
        );
        let labels: Vec<String> = svg.select_all(".tick").iter().map(Node::text).collect();
        assert_eq!(labels, vec!["0%", "50%", "100%"]);
    }
}
