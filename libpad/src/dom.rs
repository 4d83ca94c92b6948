//! Minimal document model that snippets render into
use indexmap::IndexMap;
use quill::Error;
use std::sync::{Arc, Mutex};

use crate::value::{Interp, Val};

/// Tag of text nodes
const TEXT: &str = "#text";

/// Shared handle to an element
#[derive(Debug, Clone)]
pub struct Node(Arc<Mutex<Element>>);

/// A single element
#[derive(Debug, Clone, Default)]
pub struct Element {
    pub tag: String,
    pub attrs: IndexMap<String, String>,
    pub styles: IndexMap<String, String>,
    pub text: Option<String>,
    pub children: Vec<Node>,
    /// Data bound by a selection
    pub datum: Option<Val>,
}

/// Page holding the output sink
#[derive(Debug, Clone)]
pub struct Document {
    root: Node,
    output: Node,
}

impl Document {
    pub fn new() -> Self {
        let root = Node::new("body");
        let output = Node::new("div");
        output.set_attr("id", "output");
        root.append_child(&output);
        Self { root, output }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// The `#output` element
    pub fn output(&self) -> &Node {
        &self.output
    }

    /// Element with given id, if attached
    pub fn find_by_id(&self, id: &str) -> Option<Node> {
        self.root.find_by_id(id)
    }

    /// First attached element matching selector
    pub fn select(&self, selector: &str) -> Option<Node> {
        if self.root.matches(selector) {
            return Some(self.root.clone());
        }
        self.root.select_all(selector).into_iter().next()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Node {
    /// Create a detached element
    pub fn new(tag: &str) -> Self {
        Self(Arc::new(Mutex::new(Element {
            tag: tag.to_string(),
            ..Default::default()
        })))
    }

    pub fn tag(&self) -> String {
        self.0.lock().unwrap().tag.clone()
    }

    pub fn attr(&self, name: &str) -> Option<String> {
        self.0.lock().unwrap().attrs.get(name).cloned()
    }

    pub fn set_attr(&self, name: &str, value: &str) {
        self.0
            .lock()
            .unwrap()
            .attrs
            .insert(name.to_string(), value.to_string());
    }

    pub fn remove_attr(&self, name: &str) {
        self.0.lock().unwrap().attrs.shift_remove(name);
    }

    pub fn style(&self, name: &str) -> Option<String> {
        self.0.lock().unwrap().styles.get(name).cloned()
    }

    pub fn set_style(&self, name: &str, value: &str) {
        self.0
            .lock()
            .unwrap()
            .styles
            .insert(name.to_string(), value.to_string());
    }

    /// Replace contents with text
    pub fn set_text(&self, text: &str) {
        let mut el = self.0.lock().unwrap();
        el.children.clear();
        el.text = Some(text.to_string());
    }

    /// Concatenated text of element and descendants
    pub fn text(&self) -> String {
        let (text, children) = {
            let el = self.0.lock().unwrap();
            (el.text.clone().unwrap_or_default(), el.children.clone())
        };
        children.iter().fold(text, |acc, c| acc + &c.text())
    }

    pub fn datum(&self) -> Val {
        self.0.lock().unwrap().datum.clone().unwrap_or(Val::Undefined)
    }

    pub fn set_datum(&self, datum: Val) {
        self.0.lock().unwrap().datum = Some(datum);
    }

    pub fn children(&self) -> Vec<Node> {
        self.0.lock().unwrap().children.clone()
    }

    pub fn append_child(&self, child: &Node) {
        self.0.lock().unwrap().children.push(child.clone());
    }

    /// Detach `child`, returning whether it was present
    pub fn remove_child(&self, child: &Node) -> bool {
        let mut el = self.0.lock().unwrap();
        let before = el.children.len();
        el.children.retain(|c| c != child);
        el.children.len() != before
    }

    pub fn clear_children(&self) {
        let mut el = self.0.lock().unwrap();
        el.children.clear();
        el.text = None;
    }

    /// Whether or not `node` is this element or one of its descendants
    pub fn contains(&self, node: &Node) -> bool {
        self == node || self.children().iter().any(|c| c.contains(node))
    }

    pub fn find_by_id(&self, id: &str) -> Option<Node> {
        if self.attr("id").as_deref() == Some(id) {
            return Some(self.clone());
        }
        self.children().iter().find_map(|c| c.find_by_id(id))
    }

    /// Whether or not element matches a simple selector: `tag`, `#id`, `.class`, or `tag.class`
    pub fn matches(&self, selector: &str) -> bool {
        let el = self.0.lock().unwrap();
        if let Some(id) = selector.strip_prefix('#') {
            return el.attrs.get("id").map(String::as_str) == Some(id);
        }
        let (tag, class) = match selector.split_once('.') {
            Some((tag, class)) => (tag, Some(class)),
            None => (selector, None),
        };
        let tag_ok = tag.is_empty() || tag == "*" || el.tag == tag;
        let class_ok = class.map_or(true, |class| {
            el.attrs
                .get("class")
                .is_some_and(|c| c.split_whitespace().any(|c| c == class))
        });
        tag_ok && class_ok
    }

    /// Descendants matching selector, in document order
    pub fn select_all(&self, selector: &str) -> Vec<Node> {
        let mut found = vec![];
        for child in self.children() {
            if child.matches(selector) {
                found.push(child.clone());
            }
            found.extend(child.select_all(selector));
        }
        found
    }

    /// Serialize element and descendants
    pub fn to_markup(&self) -> String {
        let el = self.0.lock().unwrap().clone();
        if el.tag == TEXT {
            return escape(el.text.as_deref().unwrap_or_default());
        }
        let mut out = format!("<{}", el.tag);
        for (name, value) in &el.attrs {
            out.push_str(&format!(" {name}=\"{}\"", escape(value)));
        }
        if !el.styles.is_empty() {
            let styles = el
                .styles
                .iter()
                .map(|(k, v)| format!("{k}: {v}"))
                .collect::<Vec<_>>()
                .join("; ");
            out.push_str(&format!(" style=\"{}\"", escape(&styles)));
        }
        out.push('>');
        if let Some(text) = &el.text {
            out.push_str(&escape(text));
        }
        for child in &el.children {
            out.push_str(&child.to_markup());
        }
        out.push_str(&format!("</{}>", el.tag));
        out
    }

    /// Compare tag, attributes, styles, text, and children recursively
    pub fn same_structure(&self, other: &Node) -> bool {
        if self == other {
            return true;
        }
        let (a, b) = {
            let a = self.0.lock().unwrap().clone();
            let b = other.0.lock().unwrap().clone();
            (a, b)
        };
        a.tag == b.tag
            && a.attrs == b.attrs
            && a.styles == b.styles
            && a.text == b.text
            && a.children.len() == b.children.len()
            && a
                .children
                .iter()
                .zip(b.children.iter())
                .all(|(x, y)| x.same_structure(y))
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{}>", self.tag())
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Property reads on elements from snippets
pub(crate) fn get(node: &Node, key: &str) -> Option<Val> {
    let val = match key {
        "nodeType" => Val::Num(1.0),
        "tagName" | "nodeName" => Val::Str(node.tag().to_uppercase()),
        "textContent" => Val::Str(node.text()),
        "outerHTML" => Val::Str(node.to_markup()),
        "__data__" => node.datum(),
        "childElementCount" => Val::Num(node.children().len() as f64),
        "firstChild" => node
            .children()
            .first()
            .map_or(Val::Null, |c| Val::from(c.clone())),
        key => node.attr(key).map_or(Val::Undefined, Val::Str),
    };
    Some(val)
}

/// Property writes on elements from snippets
pub(crate) fn set(node: &Node, key: &str, value: Val) -> quill::Result<()> {
    match key {
        "textContent" => node.set_text(&value.to_js_string()),
        "nodeType" | "tagName" | "nodeName" | "outerHTML" => {
            return Err(Error::Type(format!(
                "Cannot assign to read only property '{key}' of element"
            )))
        }
        key => node.set_attr(key, &value.to_js_string()),
    }
    Ok(())
}

pub(crate) const METHODS: &[&str] = &[
    "append",
    "appendChild",
    "getAttribute",
    "removeAttribute",
    "removeChild",
    "setAttribute",
];

pub(crate) fn call_method(node: &Node, _interp: &mut Interp, name: &str, args: Vec<Val>) -> quill::Result<Val> {
    let text = |idx: usize| quill::arg(&args, idx).to_js_string();
    match name {
        "appendChild" | "append" => {
            for arg in &args {
                match arg {
                    Val::Extern(e) => match e.as_node() {
                        Some(child) => node.append_child(&child),
                        None => return Err(Error::Type(format!("{e} is not a node"))),
                    },
                    other => {
                        let text = Node::new(TEXT);
                        text.set_text(&other.to_js_string());
                        node.append_child(&text);
                    }
                }
            }
            Ok(args.into_iter().next().unwrap_or(Val::Undefined))
        }
        "removeChild" => match quill::arg(&args, 0) {
            Val::Extern(e) => match e.as_node() {
                Some(child) if node.remove_child(&child) => Ok(Val::from(child)),
                _ => Err(Error::Type("The node to be removed is not a child of this node".to_string())),
            },
            _ => Err(Error::Type("parameter 1 is not of type 'Node'".to_string())),
        },
        "setAttribute" => {
            node.set_attr(&text(0), &text(1));
            Ok(Val::Undefined)
        }
        "getAttribute" => Ok(node.attr(&text(0)).map_or(Val::Null, Val::Str)),
        "removeAttribute" => {
            node.remove_attr(&text(0));
            Ok(Val::Undefined)
        }
        _ => Err(Error::Type(format!("element.{name} is not a function"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_has_output() {
        let doc = Document::new();
        assert_eq!(doc.find_by_id("output"), Some(doc.output().clone()));
        assert_eq!(doc.select("#output"), Some(doc.output().clone()));
        assert_eq!(doc.select("#missing"), None);
    }

    #[test]
    fn markup() {
        let svg = Node::new("svg");
        svg.set_attr("width", "320");
        svg.set_style("overflow", "visible");
        svg.set_style("display", "block");
        let text = Node::new("text");
        text.set_text("a < b");
        svg.append_child(&text);
        assert_eq!(
            svg.to_markup(),
            r#"<svg width="320" style="overflow: visible; display: block"><text>a &lt; b</text></svg>"#
        );
    }

    #[test]
    fn selectors() {
        let g = Node::new("g");
        let bar = Node::new("rect");
        bar.set_attr("class", "bar wide");
        let dot = Node::new("circle");
        g.append_child(&bar);
        g.append_child(&dot);
        assert_eq!(g.select_all(".bar"), vec![bar.clone()]);
        assert_eq!(g.select_all("rect.wide"), vec![bar]);
        assert_eq!(g.select_all("circle"), vec![dot]);
        assert!(g.select_all(".dot").is_empty());
    }

    #[test]
    fn structural_equality() {
        let build = || {
            let svg = Node::new("svg");
            let rect = Node::new("rect");
            rect.set_attr("x", "1");
            svg.append_child(&rect);
            svg
        };
        let (a, b) = (build(), build());
        assert_ne!(a, b, "distinct elements");
        assert!(a.same_structure(&b));

        b.children()[0].set_attr("x", "2");
        assert!(!a.same_structure(&b));
    }

    #[test]
    fn clear_and_contains() {
        let doc = Document::new();
        let svg = Node::new("svg");
        doc.output().append_child(&svg);
        assert!(doc.root().contains(&svg));
        doc.output().clear_children();
        assert!(!doc.root().contains(&svg));
    }
}
