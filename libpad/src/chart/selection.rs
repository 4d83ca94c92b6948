//! Selections of elements with data joins
use quill::{arg, Error, Result};

use crate::dom::Node;
use crate::value::{Extern, Interp, Val};

/// Ordered elements with their parents, plus data awaiting elements after a join
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Selection {
    nodes: Vec<Node>,
    /// Elements new children are appended to
    parents: Vec<Node>,
    /// Data without elements, set by `data`
    enter: Vec<Val>,
    /// Elements without data, set by `data`
    exit: Vec<Node>,
    /// Whether or not this is the placeholder selection returned by `enter`
    entering: bool,
}

pub const METHODS: &[&str] = &[
    "append", "attr", "call", "classed", "data", "datum", "each", "empty", "enter", "exit",
    "join", "merge", "node", "nodes", "remove", "select", "selectAll", "size", "style", "text",
];

impl Selection {
    pub fn of(nodes: Vec<Node>, parents: Vec<Node>) -> Self {
        Self {
            nodes,
            parents,
            ..Default::default()
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn into_val(self) -> Val {
        Val::Extern(Extern::Selection(self))
    }

    fn parent(&self) -> Option<&Node> {
        self.parents.first()
    }

    /// Append a new `tag` child to each element, or one per entering datum
    fn append(&self, tag: &str) -> Selection {
        if self.entering {
            let Some(parent) = self.parent() else {
                return Selection::default();
            };
            let nodes = self
                .enter
                .iter()
                .map(|d| {
                    let node = Node::new(tag);
                    node.set_datum(d.clone());
                    parent.append_child(&node);
                    node
                })
                .collect();
            return Selection::of(nodes, vec![parent.clone()]);
        }
        let nodes = self
            .nodes
            .iter()
            .map(|n| {
                let child = Node::new(tag);
                let datum = n.datum();
                if !datum.is_nullish() {
                    child.set_datum(datum);
                }
                n.append_child(&child);
                child
            })
            .collect();
        Selection::of(nodes, self.nodes.clone())
    }

    /// Bind data by index, splitting into update, enter, and exit
    fn data(&self, data: Vec<Val>) -> Selection {
        let bound = self.nodes.len().min(data.len());
        for (node, d) in self.nodes.iter().zip(data.iter()) {
            node.set_datum(d.clone());
        }
        let parents = if self.parents.is_empty() {
            self.nodes.clone()
        } else {
            self.parents.clone()
        };
        Selection {
            nodes: self.nodes[..bound].to_vec(),
            parents,
            enter: data[bound..].to_vec(),
            exit: self.nodes[bound..].to_vec(),
            entering: false,
        }
    }

    fn enter(&self) -> Selection {
        Selection {
            nodes: vec![],
            parents: self.parents.clone(),
            enter: self.enter.clone(),
            exit: vec![],
            entering: true,
        }
    }

    fn exit(&self) -> Selection {
        Selection::of(self.exit.clone(), self.parents.clone())
    }

    fn remove(&self) {
        for node in &self.nodes {
            for parent in &self.parents {
                if parent.remove_child(node) {
                    break;
                }
            }
        }
    }

    fn merge(&self, other: &Selection) -> Selection {
        let mut nodes = self.nodes.clone();
        nodes.extend(other.nodes.iter().filter(|n| !self.nodes.contains(n)).cloned());
        Selection::of(nodes, self.parents.clone())
    }

    fn select(&self, selector: &str) -> Selection {
        let nodes = self
            .nodes
            .iter()
            .filter_map(|n| {
                let found = n.select_all(selector).into_iter().next()?;
                let datum = n.datum();
                if !datum.is_nullish() {
                    found.set_datum(datum);
                }
                Some(found)
            })
            .collect();
        Selection::of(nodes, self.nodes.clone())
    }

    fn select_all(&self, selector: &str) -> Selection {
        let nodes = self.nodes.iter().flat_map(|n| n.select_all(selector)).collect();
        Selection::of(nodes, self.nodes.clone())
    }
}

/// Value of `v` for the element at index `i`, calling functions with `(d, i)`
fn resolve(interp: &mut Interp, v: &Val, node: &Node, i: usize) -> Result<Val> {
    if v.is_callable() {
        interp.call(v, vec![node.datum(), Val::Num(i as f64)])
    } else {
        Ok(v.clone())
    }
}

fn str_arg(args: &[Val], idx: usize) -> String {
    arg(args, idx).to_js_string()
}

pub(crate) fn call_method(sel: &Selection, interp: &mut Interp, name: &str, args: Vec<Val>) -> Result<Val> {
    let this = || Val::Extern(Extern::Selection(sel.clone()));
    let result = match name {
        "append" => sel.append(&str_arg(&args, 0)).into_val(),
        "attr" | "style" => {
            let key = str_arg(&args, 0);
            if args.len() < 2 {
                let first = sel.nodes.first();
                let current = match name {
                    "attr" => first.and_then(|n| n.attr(&key)),
                    _ => first.and_then(|n| n.style(&key)),
                };
                return Ok(current.map_or(Val::Null, Val::Str));
            }
            for (i, node) in sel.nodes.iter().enumerate() {
                match resolve(interp, &args[1], node, i)? {
                    Val::Null | Val::Undefined if name == "attr" => node.remove_attr(&key),
                    Val::Null | Val::Undefined => (),
                    v if name == "attr" => node.set_attr(&key, &v.to_js_string()),
                    v => node.set_style(&key, &v.to_js_string()),
                }
            }
            this()
        }
        "classed" => {
            let names = str_arg(&args, 0);
            for (i, node) in sel.nodes.iter().enumerate() {
                let on = resolve(interp, &arg(&args, 1), node, i)?.truthy();
                let mut classes: Vec<String> = node
                    .attr("class")
                    .unwrap_or_default()
                    .split_whitespace()
                    .map(String::from)
                    .collect();
                for name in names.split_whitespace() {
                    classes.retain(|c| c != name);
                    if on {
                        classes.push(name.to_string());
                    }
                }
                node.set_attr("class", &classes.join(" "));
            }
            this()
        }
        "text" => {
            if args.is_empty() {
                return Ok(sel
                    .nodes
                    .first()
                    .map_or(Val::Null, |n| Val::Str(n.text())));
            }
            for (i, node) in sel.nodes.iter().enumerate() {
                let text = match resolve(interp, &args[0], node, i)? {
                    Val::Null | Val::Undefined => String::new(),
                    v => v.to_js_string(),
                };
                node.set_text(&text);
            }
            this()
        }
        "datum" => {
            if args.is_empty() {
                return Ok(sel.nodes.first().map_or(Val::Undefined, Node::datum));
            }
            for node in &sel.nodes {
                node.set_datum(args[0].clone());
            }
            this()
        }
        "data" => {
            if args.is_empty() {
                return Ok(Val::array(sel.nodes.iter().map(Node::datum).collect()));
            }
            let data = match &args[0] {
                f if f.is_callable() => {
                    let d = sel.parent().map_or(Val::Undefined, Node::datum);
                    interp.call(f, vec![d, Val::Num(0.0)])?
                }
                v => v.clone(),
            };
            sel.data(interp.iterate(&data)?).into_val()
        }
        "enter" => sel.enter().into_val(),
        "exit" => sel.exit().into_val(),
        "join" => {
            let entered = sel.enter().append(&str_arg(&args, 0));
            sel.exit().remove();
            sel.merge(&entered).into_val()
        }
        "merge" => match arg(&args, 0) {
            Val::Extern(Extern::Selection(other)) => sel.merge(&other).into_val(),
            v => return Err(Error::Type(format!("{} is not a selection", v.inspect()))),
        },
        "remove" => {
            sel.remove();
            this()
        }
        "select" => match arg(&args, 0) {
            Val::Extern(Extern::Node(n)) => Selection::of(vec![n], vec![]).into_val(),
            v => sel.select(&v.to_js_string()).into_val(),
        },
        "selectAll" => sel.select_all(&str_arg(&args, 0)).into_val(),
        "call" => {
            let mut call_args = vec![this()];
            call_args.extend(args.iter().skip(1).cloned());
            interp.call(&arg(&args, 0), call_args)?;
            this()
        }
        "each" => {
            let f = arg(&args, 0);
            for (i, node) in sel.nodes.iter().enumerate() {
                interp.call(&f, vec![node.datum(), Val::Num(i as f64)])?;
            }
            this()
        }
        "node" => sel.nodes.first().map_or(Val::Null, |n| Val::from(n.clone())),
        "nodes" => Val::array(sel.nodes.iter().cloned().map(Val::from).collect()),
        "size" => Val::Num(sel.nodes.len() as f64),
        "empty" => Val::Bool(sel.nodes.is_empty()),
        _ => return Err(Error::Type(format!("selection.{name} is not a function"))),
    };
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(sel: &Val, interp: &mut Interp, name: &str, args: Vec<Val>) -> Val {
        let Val::Extern(Extern::Selection(s)) = sel else {
            panic!("expected selection, got {sel:?}");
        };
        call_method(s, interp, name, args).unwrap()
    }

    fn nums(ns: &[f64]) -> Val {
        Val::array(ns.iter().map(|n| Val::Num(*n)).collect())
    }

    #[test]
    fn append_and_attr() {
        let mut interp = Interp::new();
        let root = Node::new("div");
        let sel = Selection::of(vec![root.clone()], vec![]).into_val();
        let svg = call(&sel, &mut interp, "append", vec![Val::string("svg")]);
        call(&svg, &mut interp, "attr", vec![Val::string("width"), Val::Num(600.0)]);
        call(&svg, &mut interp, "style", vec![Val::string("display"), Val::string("block")]);
        assert_eq!(
            root.to_markup(),
            r#"<div><svg width="600" style="display: block"></svg></div>"#
        );
        assert_eq!(
            call(&svg, &mut interp, "attr", vec![Val::string("width")]),
            Val::string("600")
        );
    }

    #[test]
    fn data_join_enter() {
        let mut interp = Interp::new();
        let g = Node::new("g");
        let height = interp.eval("return (d, i) => d * 10 + i").unwrap();

        let sel = Selection::of(vec![g.clone()], vec![]).into_val();
        let bars = call(&sel, &mut interp, "selectAll", vec![Val::string(".bar")]);
        let bound = call(&bars, &mut interp, "data", vec![nums(&[1.0, 2.0, 3.0])]);
        let entered = call(&bound, &mut interp, "enter", vec![]);
        let rects = call(&entered, &mut interp, "append", vec![Val::string("rect")]);
        call(&rects, &mut interp, "attr", vec![Val::string("class"), Val::string("bar")]);
        call(&rects, &mut interp, "attr", vec![Val::string("height"), height]);

        let heights: Vec<_> = g
            .select_all(".bar")
            .iter()
            .map(|n| n.attr("height").unwrap())
            .collect();
        assert_eq!(heights, vec!["10", "21", "32"]);
    }

    #[test]
    fn data_join_update_and_exit() {
        let mut interp = Interp::new();
        let g = Node::new("g");
        let sel = Selection::of(vec![g.clone()], vec![]).into_val();
        let first = call(&sel, &mut interp, "selectAll", vec![Val::string("circle")]);
        let first = call(&first, &mut interp, "data", vec![nums(&[1.0, 2.0, 3.0])]);
        call(&first, &mut interp, "join", vec![Val::string("circle")]);
        assert_eq!(g.children().len(), 3);

        let again = call(&sel, &mut interp, "selectAll", vec![Val::string("circle")]);
        let again = call(&again, &mut interp, "data", vec![nums(&[9.0])]);
        let joined = call(&again, &mut interp, "join", vec![Val::string("circle")]);
        assert_eq!(g.children().len(), 1);
        assert_eq!(call(&joined, &mut interp, "size", vec![]), Val::Num(1.0));
        assert_eq!(g.children()[0].datum(), Val::Num(9.0));
    }

    #[test]
    fn text_and_call() {
        let mut interp = Interp::new();
        let p = Node::new("p");
        let sel = Selection::of(vec![p.clone()], vec![]).into_val();
        call(&sel, &mut interp, "datum", vec![Val::string("hi")]);
        let shout = interp.eval("return d => d.toUpperCase()").unwrap();
        call(&sel, &mut interp, "text", vec![shout]);
        assert_eq!(p.text(), "HI");

        let mark = interp
            .eval("return (s, name) => s.attr('data-mark', name)")
            .unwrap();
        call(&sel, &mut interp, "call", vec![mark, Val::string("x")]);
        assert_eq!(p.attr("data-mark").as_deref(), Some("x"));
    }

    #[test]
    fn classed_toggles() {
        let mut interp = Interp::new();
        let p = Node::new("p");
        p.set_attr("class", "a b");
        let sel = Selection::of(vec![p.clone()], vec![]).into_val();
        call(&sel, &mut interp, "classed", vec![Val::string("b"), Val::Bool(false)]);
        call(&sel, &mut interp, "classed", vec![Val::string("c"), Val::Bool(true)]);
        assert_eq!(p.attr("class").as_deref(), Some("a c"));
    }
}
