//! Names and values every snippet can reference
use indexmap::IndexMap;
use nanoid::nanoid;
use quill::Result;
use tracing::debug;

use crate::chart::Kit;
use crate::config::Config;
use crate::dom::{Document, Node};
use crate::generate;
use crate::legend::legend;
use crate::value::{Extern, Interp, Promise, Val};

/// Names bound for snippets, in parameter order
pub const NAMES: &[&str] = &[
    "d3",
    "topojson",
    "DOM",
    "Generators",
    "generateData",
    "sampleData",
    "Legend",
    "width",
    "FileAttachment",
];

const BASE36: [char; 36] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i',
    'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

/// Fixed mapping from name to value, built once and shared by every run
#[derive(Debug, Clone)]
pub struct Environment {
    bindings: IndexMap<&'static str, Val>,
}

impl Environment {
    /// Build every binding in [NAMES]
    pub fn provision(config: &Config, doc: &Document) -> Self {
        let mut bindings = IndexMap::new();
        for name in NAMES {
            let val = match *name {
                "d3" => Kit::new(doc).into_val(),
                "topojson" => Val::object([]),
                "DOM" => Val::object([
                    ("uid", Val::native("uid", uid)),
                    (
                        "context2d",
                        Val::Extern(Extern::Context2dFactory {
                            dpi: config.device_pixel_ratio,
                        }),
                    ),
                ]),
                "Generators" => Val::object([("input", Val::native("input", input))]),
                "generateData" => generate::generators(),
                "sampleData" => generate::samples(),
                "Legend" => Val::native("Legend", legend),
                "width" => Val::Num(config.width()),
                "FileAttachment" => Val::native("FileAttachment", file_attachment),
                _ => Val::Undefined,
            };
            bindings.insert(*name, val);
        }
        debug!("provisioned environment with width {}", config.width());
        Self { bindings }
    }

    /// Binding names, in parameter order
    pub fn names(&self) -> Vec<&'static str> {
        self.bindings.keys().copied().collect()
    }

    /// Binding values, in parameter order
    pub fn values(&self) -> Vec<Val> {
        self.bindings.values().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<&Val> {
        self.bindings.get(name)
    }
}

/// `DOM.uid(name)`
fn uid(_interp: &mut Interp, args: &[Val]) -> Result<Val> {
    let name = match quill::arg(args, 0) {
        Val::Undefined => String::new(),
        v => v.to_js_string(),
    };
    let id = format!("{name}-{}", nanoid!(9, &BASE36));
    let href = format!("#{id}");
    Ok(Val::object([("id", Val::Str(id)), ("href", Val::Str(href))]))
}

/// `Generators.input(element)`
fn input(_interp: &mut Interp, _args: &[Val]) -> Result<Val> {
    let node = Node::new("input");
    node.set_attr("type", "range");
    node.set_attr("min", "0");
    node.set_attr("max", "100");
    node.set_attr("value", "50");
    Ok(Val::from(node))
}

/// `FileAttachment(name)`, whose contents are always empty
fn file_attachment(_interp: &mut Interp, _args: &[Val]) -> Result<Val> {
    Ok(Val::object([
        ("text", Val::native("text", |_, _| Ok(Val::Promise(Promise::fulfilled(Val::string("")))))),
        ("json", Val::native("json", |_, _| Ok(Val::Promise(Promise::fulfilled(Val::object([])))))),
        ("csv", Val::native("csv", |_, _| Ok(Val::Promise(Promise::fulfilled(Val::array(vec![])))))),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(env: &Environment, src: &str) -> Val {
        let mut interp = Interp::new();
        let invokable = quill::compile(src, &env.names()).unwrap();
        let v = invokable.invoke(&mut interp, env.values()).unwrap();
        interp.run_jobs().unwrap();
        v
    }

    #[test]
    fn names_in_order() {
        let env = Environment::provision(&Config::default(), &Document::new());
        assert_eq!(env.names(), NAMES);
        assert_eq!(env.get("width"), Some(&Val::Num(928.0)));
    }

    #[test]
    fn dom_uid() {
        let env = Environment::provision(&Config::default(), &Document::new());
        let v = eval(&env, "const u = DOM.uid('clip'); return [u.id, u.href]");
        let Val::Array(items) = v else {
            panic!("expected array");
        };
        let items = items.lock().unwrap();
        let id = items[0].to_js_string();
        let suffix = id.strip_prefix("clip-").unwrap();
        assert_eq!(suffix.len(), 9);
        assert!(suffix.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
        assert_eq!(items[1].to_js_string(), format!("#{id}"));
    }

    #[test]
    fn context2d_uses_dpi() {
        let config = Config {
            device_pixel_ratio: 2.0,
            ..Default::default()
        };
        let env = Environment::provision(&config, &Document::new());
        let v = eval(
            &env,
            "const ctx = DOM.context2d(10, 5);
             ctx.fillStyle = 'steelblue';
             ctx.fillRect(0, 0, 10, 5);
             return [ctx.canvas.width, ctx.canvas.height, ctx.fillStyle]",
        );
        assert_eq!(v.inspect(), "['20', '10', 'rgb(70, 130, 180)']");
    }

    #[test]
    fn generators_input() {
        let env = Environment::provision(&Config::default(), &Document::new());
        let v = eval(&env, "return Generators.input().outerHTML");
        assert_eq!(
            v,
            Val::string(r#"<input type="range" min="0" max="100" value="50"></input>"#)
        );
    }

    #[test]
    fn file_attachments_resolve_empty() {
        let env = Environment::provision(&Config::default(), &Document::new());
        let v = eval(
            &env,
            "const out = [];
             const f = FileAttachment('data.csv');
             f.text().then(t => out.push(t));
             f.json().then(j => out.push(j));
             f.csv().then(c => out.push(c));
             return out",
        );
        assert_eq!(v.inspect(), "['', {}, []]");
    }

    #[test]
    fn topojson_is_empty() {
        let env = Environment::provision(&Config::default(), &Document::new());
        assert_eq!(eval(&env, "return Object.keys(topojson).length"), Val::Num(0.0));
    }
}
