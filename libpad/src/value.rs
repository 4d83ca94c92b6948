//! Values snippets see, and the host types living inside them
use quill::Result;
use std::sync::Arc;

use crate::canvas::{self, CanvasRef};
use crate::chart::axis::{self, AxisRef};
use crate::chart::color::Interpolator;
use crate::chart::line::{self, LineRef};
use crate::chart::scale::{self, ScaleRef};
use crate::chart::selection::{self, Selection};
use crate::chart::{self as kit, Kit};
use crate::dom::{self, Node};

/// Values used in snippets
pub type Val = quill::Val<Extern>;

/// Interpreter running snippets
pub type Interp = quill::Interp<Extern>;

/// Promises produced by snippets
pub type Promise = quill::Promise<Extern>;

/// Settled outcome of a snippet promise
pub type Settled = quill::Settled<Extern>;

/// Host values exposed to snippets
#[derive(Debug, Clone)]
pub enum Extern {
    /// Renderable element
    Node(Node),
    Selection(Selection),
    Scale(ScaleRef),
    Axis(AxisRef),
    Line(LineRef),
    Interpolator(Interpolator),
    /// The `d3` namespace
    Kit(Kit),
    /// 2D drawing context over a raster
    Context2d(CanvasRef),
    /// `DOM.context2d`, carrying the default device pixel ratio
    Context2dFactory { dpi: f64 },
}

impl Extern {
    /// Element this value renders as, if any
    pub fn as_node(&self) -> Option<Node> {
        match self {
            Extern::Node(n) => Some(n.clone()),
            Extern::Selection(s) => s.nodes().first().cloned(),
            Extern::Context2d(c) => Some(c.lock().unwrap().canvas()),
            _ => None,
        }
    }
}

impl From<Node> for Val {
    fn from(node: Node) -> Self {
        Val::Extern(Extern::Node(node))
    }
}

impl PartialEq for Extern {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Extern::Node(a), Extern::Node(b)) => a == b,
            (Extern::Selection(a), Extern::Selection(b)) => a == b,
            (Extern::Scale(a), Extern::Scale(b)) => Arc::ptr_eq(a, b),
            (Extern::Axis(a), Extern::Axis(b)) => Arc::ptr_eq(a, b),
            (Extern::Line(a), Extern::Line(b)) => Arc::ptr_eq(a, b),
            (Extern::Interpolator(a), Extern::Interpolator(b)) => a == b,
            (Extern::Kit(_), Extern::Kit(_)) => true,
            (Extern::Context2d(a), Extern::Context2d(b)) => Arc::ptr_eq(a, b),
            (Extern::Context2dFactory { .. }, Extern::Context2dFactory { .. }) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for Extern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Extern::Node(n) => write!(f, "{n}"),
            Extern::Selection(s) => write!(f, "<selection of {}>", s.nodes().len()),
            Extern::Interpolator(i) => write!(f, "<{i}>"),
            e => write!(f, "<{}>", quill::Extern::type_name(e)),
        }
    }
}

impl quill::Extern for Extern {
    fn type_name(&self) -> &'static str {
        match self {
            Extern::Node(_) => "element",
            Extern::Selection(_) => "selection",
            Extern::Scale(_) => "scale",
            Extern::Axis(_) => "axis",
            Extern::Line(_) => "line",
            Extern::Interpolator(_) => "interpolator",
            Extern::Kit(_) => "d3",
            Extern::Context2d(_) => "context2d",
            Extern::Context2dFactory { .. } => "context2d",
        }
    }

    fn get(&self, key: &str) -> Option<Val> {
        match self {
            Extern::Node(n) => dom::get(n, key),
            Extern::Kit(k) => kit::get(k, key),
            Extern::Context2d(c) => canvas::get(c, key),
            _ => None,
        }
    }

    fn set(&self, key: &str, value: Val) -> Result<()> {
        match self {
            Extern::Node(n) => dom::set(n, key, value),
            Extern::Context2d(c) => canvas::set(c, key, value),
            e => Err(quill::Error::Type(format!(
                "Cannot assign to property '{key}' of {}",
                e.type_name()
            ))),
        }
    }

    fn has_method(&self, name: &str) -> bool {
        match self {
            Extern::Node(_) => dom::METHODS.contains(&name),
            Extern::Selection(_) => selection::METHODS.contains(&name),
            Extern::Scale(s) => scale::has_method(s, name),
            Extern::Axis(_) => axis::METHODS.contains(&name),
            Extern::Line(_) => line::METHODS.contains(&name),
            Extern::Kit(_) => kit::METHODS.contains(&name),
            Extern::Context2d(_) => canvas::METHODS.contains(&name),
            Extern::Interpolator(_) | Extern::Context2dFactory { .. } => false,
        }
    }

    fn call_method(&self, interp: &mut Interp, name: &str, args: Vec<Val>) -> Result<Val> {
        match self {
            Extern::Node(n) => dom::call_method(n, interp, name, args),
            Extern::Selection(s) => selection::call_method(s, interp, name, args),
            Extern::Scale(s) => scale::call_method(s, interp, name, args),
            Extern::Axis(a) => axis::call_method(a, name, args),
            Extern::Line(l) => line::call_method(l, name, args),
            Extern::Kit(k) => kit::call_method(k, interp, name, args),
            Extern::Context2d(c) => canvas::call_method(c, name, args),
            e => Err(quill::Error::Type(format!(
                "{}.{name} is not a function",
                e.type_name()
            ))),
        }
    }

    fn is_callable(&self) -> bool {
        matches!(
            self,
            Extern::Scale(_)
                | Extern::Axis(_)
                | Extern::Line(_)
                | Extern::Interpolator(_)
                | Extern::Context2dFactory { .. }
        )
    }

    fn call(&self, interp: &mut Interp, args: Vec<Val>) -> Result<Val> {
        match self {
            Extern::Scale(s) => scale::apply(s, interp, &quill::arg(&args, 0)),
            Extern::Axis(a) => axis::call(a, interp, args),
            Extern::Line(l) => line::call(l, interp, args),
            Extern::Interpolator(i) => Ok(i.at(quill::arg(&args, 0).to_number())),
            Extern::Context2dFactory { dpi } => canvas::context2d(*dpi, &args),
            e => Err(quill::Error::Type(format!("{} is not a function", e.type_name()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill::Extern as _;

    #[test]
    fn nodes_compare_by_identity() {
        let a = Node::new("svg");
        let b = Node::new("svg");
        assert_eq!(Val::from(a.clone()), Val::from(a.clone()));
        assert_ne!(Val::from(a), Val::from(b));
    }

    #[test]
    fn interpolators_are_callable() {
        let mut interp = Interp::new();
        let blues = Extern::Interpolator(Interpolator::Round(0.0, 10.0));
        assert!(blues.is_callable());
        assert_eq!(blues.call(&mut interp, vec![Val::Num(0.44)]), Ok(Val::Num(4.0)));
    }

    #[test]
    fn element_properties() {
        let mut interp = Interp::new();
        let node = Val::from(Node::new("svg"));
        interp.set_member(&node, "width", Val::Num(10.0)).unwrap();
        assert_eq!(interp.get_member(&node, "width"), Ok(Val::string("10")));
        assert_eq!(interp.get_member(&node, "tagName"), Ok(Val::string("SVG")));
    }
}
