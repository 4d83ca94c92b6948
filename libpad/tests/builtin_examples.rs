use pad::examples::{fallback, FALLBACKS};
use pad::{Config, ExampleSource, Node, RunStatus, Session};

fn run_example(name: &str) -> Session {
    let mut s = Session::new(Config::default(), ExampleSource::Offline);
    s.set_text(fallback(name));
    assert_eq!(s.run(), RunStatus::Succeeded, "{name}: {}", s.output());
    s
}

fn svg_of(s: &Session) -> Node {
    let children = s.output_node().children();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].tag(), "svg");
    children[0].clone()
}

#[test]
fn every_builtin_draws_an_svg() {
    for (name, _) in FALLBACKS {
        let s = run_example(name);
        let svg = svg_of(&s);
        assert_eq!(svg.attr("width").as_deref(), Some("600"));
        assert_eq!(svg.attr("height").as_deref(), Some("400"));
    }
}

#[test]
fn bar_chart() {
    let s = run_example("bar-chart");
    let bars = svg_of(&s).select_all(".bar");
    assert_eq!(bars.len(), 10);
    for bar in &bars {
        assert_eq!(bar.tag(), "rect");
        assert_eq!(bar.attr("fill").as_deref(), Some("steelblue"));
    }
    assert!(svg_of(&s).select_all(".tick").len() > 10);
}

#[test]
fn line_chart() {
    let s = run_example("line-chart");
    let paths = svg_of(&s).select_all("path");
    let line = paths
        .iter()
        .find(|p| p.attr("stroke").as_deref() == Some("steelblue"))
        .unwrap();
    let d = line.attr("d").unwrap();
    assert!(d.starts_with('M'));
    assert_eq!(d.matches('L').count(), 49);
}

#[test]
fn scatterplot() {
    let s = run_example("scatterplot");
    let dots = svg_of(&s).select_all(".dot");
    assert_eq!(dots.len(), 100);
    assert!(dots.iter().all(|d| d.attr("r").as_deref() == Some("4")));
}

#[test]
fn rerun_replaces_output() {
    let mut s = run_example("bar-chart");
    let first = svg_of(&s);
    s.run();
    let second = svg_of(&s);
    assert_ne!(first, second);
    assert!(first.same_structure(&second));
}

#[test]
fn legend_ramp() {
    let mut s = Session::new(Config::default(), ExampleSource::Offline);
    s.set_text(
        "return Legend(d3.scaleSequential([0, 100], d3.interpolateBlues), { title: 'Rate' })",
    );
    assert_eq!(s.run(), RunStatus::Succeeded);
    let svg = svg_of(&s);
    let image = svg.select_all("image");
    assert_eq!(image.len(), 1);
    let href = image[0].attr("xlink:href").unwrap();
    assert!(href.starts_with("data:image/png;base64,"));
    assert!(s.output().contains(">Rate</text>"));
}
