//! 2D drawing contexts backed by an in-memory raster
use base64::Engine;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use quill::{arg, fmt_num, Error, Result};
use std::io::Cursor;
use std::sync::{Arc, Mutex};

use crate::chart::color::Rgb;
use crate::dom::Node;
use crate::value::{Extern, Val};

/// Largest raster side, in device pixels
const MAX_SIDE: f64 = 8192.0;

pub type CanvasRef = Arc<Mutex<Canvas>>;

/// Drawing state of a `<canvas>` element
#[derive(Debug, Clone)]
pub struct Canvas {
    node: Node,
    raster: RgbaImage,
    fill: Rgb,
    scale: (f64, f64),
}

pub const METHODS: &[&str] = &["clearRect", "fillRect", "scale"];

impl Canvas {
    /// Canvas of `width x height` CSS pixels, backed by `width*dpi x height*dpi` device pixels
    pub fn new(width: f64, height: f64, dpi: f64) -> Result<Self> {
        let (w, h) = ((width * dpi).floor(), (height * dpi).floor());
        if !(0.0..=MAX_SIDE).contains(&w) || !(0.0..=MAX_SIDE).contains(&h) {
            return Err(Error::Range(format!(
                "Invalid canvas size {}x{}",
                fmt_num(w),
                fmt_num(h)
            )));
        }
        let node = Node::new("canvas");
        node.set_attr("width", &fmt_num(w));
        node.set_attr("height", &fmt_num(h));
        node.set_style("width", &format!("{}px", fmt_num(width)));
        node.set_style("height", &format!("{}px", fmt_num(height)));
        Ok(Self {
            node,
            raster: RgbaImage::new(w as u32, h as u32),
            fill: Rgb(0, 0, 0),
            scale: (dpi, dpi),
        })
    }

    pub fn canvas(&self) -> Node {
        self.node.clone()
    }

    pub fn raster(&self) -> &RgbaImage {
        &self.raster
    }

    pub fn set_fill(&mut self, fill: Rgb) {
        self.fill = fill;
    }

    fn paint(&mut self, x: f64, y: f64, w: f64, h: f64, color: Rgba<u8>) {
        let (sx, sy) = self.scale;
        let (x0, x1) = span(x * sx, (x + w) * sx, self.raster.width());
        let (y0, y1) = span(y * sy, (y + h) * sy, self.raster.height());
        for py in y0..y1 {
            for px in x0..x1 {
                self.raster.put_pixel(px, py, color);
            }
        }
    }

    pub fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        let Rgb(r, g, b) = self.fill;
        self.paint(x, y, w, h, Rgba([r, g, b, 255]));
    }

    pub fn clear_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.paint(x, y, w, h, Rgba([0, 0, 0, 0]));
    }

    /// PNG of the raster as a `data:` URL
    pub fn to_data_url(&self) -> std::result::Result<String, image::ImageError> {
        let mut png = vec![];
        DynamicImage::ImageRgba8(self.raster.clone()).write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(&png);
        Ok(format!("data:image/png;base64,{encoded}"))
    }
}

/// Pixel indices covered by `[a, b)`, clipped to `[0, limit)`
fn span(a: f64, b: f64, limit: u32) -> (u32, u32) {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    if !lo.is_finite() || !hi.is_finite() {
        return (0, 0);
    }
    let clip = |v: f64| v.round().clamp(0.0, limit as f64) as u32;
    (clip(lo), clip(hi))
}

/// `DOM.context2d(width, height, dpi)`
pub(crate) fn context2d(default_dpi: f64, args: &[Val]) -> Result<Val> {
    let dpi = match arg(args, 2) {
        Val::Undefined => default_dpi,
        v => v.to_number(),
    };
    let canvas = Canvas::new(arg(args, 0).to_number(), arg(args, 1).to_number(), dpi)?;
    Ok(Val::Extern(Extern::Context2d(Arc::new(Mutex::new(canvas)))))
}

pub(crate) fn get(ctx: &CanvasRef, key: &str) -> Option<Val> {
    let ctx = ctx.lock().unwrap();
    match key {
        "canvas" => Some(Val::from(ctx.canvas())),
        "fillStyle" => Some(Val::Str(ctx.fill.to_string())),
        _ => None,
    }
}

pub(crate) fn set(ctx: &CanvasRef, key: &str, value: Val) -> Result<()> {
    match key {
        "fillStyle" => {
            // unparseable colors are ignored
            if let Some(fill) = Rgb::parse(&value.to_js_string()) {
                ctx.lock().unwrap().set_fill(fill);
            }
            Ok(())
        }
        _ => Err(Error::Type(format!(
            "Cannot assign to property '{key}' of context2d"
        ))),
    }
}

pub(crate) fn call_method(ctx: &CanvasRef, name: &str, args: Vec<Val>) -> Result<Val> {
    let n = |i: usize| arg(&args, i).to_number();
    let mut c = ctx.lock().unwrap();
    match name {
        "fillRect" => c.fill_rect(n(0), n(1), n(2), n(3)),
        "clearRect" => c.clear_rect(n(0), n(1), n(2), n(3)),
        "scale" => {
            let sy = match arg(&args, 1) {
                Val::Undefined => n(0),
                v => v.to_number(),
            };
            c.scale = (c.scale.0 * n(0), c.scale.1 * sy);
        }
        _ => return Err(Error::Type(format!("context2d.{name} is not a function"))),
    }
    Ok(Val::Undefined)
}
