//! Routes execution outcomes to the output sink and run status
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::dom::Node;
use crate::exec::{ExecutionResult, RunId};
use crate::value::Interp;

/// Status shown for the latest run or example load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Idle,
    Loading,
    Running,
    Succeeded,
    Failed,
    /// Example text replaced the snippet
    Loaded,
    /// Built-in text replaced the snippet after a failed load
    FallbackLoaded,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            RunStatus::Idle => "Ready",
            RunStatus::Loading => "Loading example...",
            RunStatus::Running => "Executing...",
            RunStatus::Succeeded => "Executed successfully",
            RunStatus::Failed => "Error",
            RunStatus::Loaded => "Example loaded",
            RunStatus::FallbackLoaded => "Fallback example loaded",
        };
        write!(f, "{text}")
    }
}

#[derive(Debug)]
struct State {
    status: RunStatus,
    /// Run whose outcome the sink shows
    current: RunId,
    /// Whether or not the current run has shown an error
    failed: bool,
    output: Node,
}

/// Shared router, cloned into continuations of pending runs
#[derive(Debug, Clone)]
pub struct Router {
    state: Arc<Mutex<State>>,
}

impl Router {
    /// Router writing into `output`
    pub fn new(output: Node) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                status: RunStatus::Idle,
                current: 0,
                failed: false,
                output,
            })),
        }
    }

    pub fn status(&self) -> RunStatus {
        self.state.lock().unwrap().status
    }

    pub fn set_status(&self, status: RunStatus) {
        self.state.lock().unwrap().status = status;
    }

    pub fn output(&self) -> Node {
        self.state.lock().unwrap().output.clone()
    }

    pub fn clear_output(&self) {
        self.state.lock().unwrap().output.clear_children();
    }

    /// Start showing run `id`, discarding previous output
    pub fn begin(&self, id: RunId) {
        let mut state = self.state.lock().unwrap();
        state.current = id;
        state.failed = false;
        state.output.clear_children();
        state.status = RunStatus::Running;
    }

    /// Route outcome of run `id`. Pending outcomes are routed once they settle.
    pub fn route(&self, interp: &mut Interp, id: RunId, result: ExecutionResult) {
        match result {
            ExecutionResult::Pending(p) => {
                debug!("run {id} pending");
                let router = self.clone();
                p.on_settle(interp, move |_, settled| {
                    router.deliver(id, ExecutionResult::from_settled(settled));
                });
            }
            result => self.deliver(id, result),
        }
    }

    /// Fail run `id` after its outcome was routed, e.g. when draining its reactions errs
    pub fn fail(&self, id: RunId, message: &str) {
        self.deliver(id, ExecutionResult::Failure(message.to_string()));
    }

    fn deliver(&self, id: RunId, result: ExecutionResult) {
        let mut state = self.state.lock().unwrap();
        if id != state.current {
            debug!("dropping outcome of stale run {id} - {result:?}");
            return;
        }
        if state.failed && !matches!(result, ExecutionResult::Pending(_)) {
            debug!("run {id} already failed, dropping {result:?}");
            return;
        }
        match result {
            ExecutionResult::Node(node) => {
                if !state.output.contains(&node) {
                    state.output.append_child(&node);
                }
                state.status = RunStatus::Succeeded;
            }
            ExecutionResult::Empty => {
                state.status = RunStatus::Succeeded;
            }
            ExecutionResult::Failure(message) => {
                // A failure replaces whatever the run delivered before it
                let indicator = Node::new("div");
                indicator.set_attr("class", "error");
                indicator.set_text(&message);
                state.output.clear_children();
                state.output.append_child(&indicator);
                state.failed = true;
                state.status = RunStatus::Failed;
            }
            ExecutionResult::Pending(_) => {
                debug!("run {id} settled with a pending value");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Promise, Val};
    use tracing_test::traced_test;

    fn router() -> (Router, Node) {
        let output = Node::new("div");
        (Router::new(output.clone()), output)
    }

    #[test]
    fn status_texts() {
        assert_eq!(RunStatus::Idle.to_string(), "Ready");
        assert_eq!(RunStatus::Loading.to_string(), "Loading example...");
        assert_eq!(RunStatus::Running.to_string(), "Executing...");
        assert_eq!(RunStatus::Succeeded.to_string(), "Executed successfully");
        assert_eq!(RunStatus::Failed.to_string(), "Error");
        assert_eq!(RunStatus::Loaded.to_string(), "Example loaded");
        assert_eq!(RunStatus::FallbackLoaded.to_string(), "Fallback example loaded");
    }

    #[test]
    fn node_and_empty() {
        let (router, output) = router();
        let mut interp = Interp::new();
        router.begin(1);
        assert_eq!(router.status(), RunStatus::Running);
        let svg = Node::new("svg");
        router.route(&mut interp, 1, ExecutionResult::Node(svg.clone()));
        router.route(&mut interp, 1, ExecutionResult::Node(svg));
        assert_eq!(output.to_markup(), "<div><svg></svg></div>");
        assert_eq!(router.status(), RunStatus::Succeeded);

        router.begin(2);
        router.route(&mut interp, 2, ExecutionResult::Empty);
        assert_eq!(output.to_markup(), "<div></div>");
        assert_eq!(router.status(), RunStatus::Succeeded);
    }

    #[test]
    fn single_failure_indicator() {
        let (router, output) = router();
        let mut interp = Interp::new();
        router.begin(1);
        router.route(&mut interp, 1, ExecutionResult::Failure("boom".to_string()));
        router.fail(1, "again");
        assert_eq!(output.to_markup(), r#"<div><div class="error">boom</div></div>"#);
        assert_eq!(router.status(), RunStatus::Failed);
    }

    #[test]
    fn failure_replaces_delivered_node() {
        let (router, output) = router();
        let mut interp = Interp::new();
        router.begin(1);
        router.route(&mut interp, 1, ExecutionResult::Node(Node::new("svg")));
        assert_eq!(router.status(), RunStatus::Succeeded);
        router.fail(1, "step budget exhausted");
        assert_eq!(
            output.to_markup(),
            r#"<div><div class="error">step budget exhausted</div></div>"#
        );
        assert_eq!(router.status(), RunStatus::Failed);

        router.route(&mut interp, 1, ExecutionResult::Node(Node::new("svg")));
        router.route(&mut interp, 1, ExecutionResult::Empty);
        assert_eq!(
            output.to_markup(),
            r#"<div><div class="error">step budget exhausted</div></div>"#
        );
        assert_eq!(router.status(), RunStatus::Failed);
    }

    #[test]
    fn pending_settles_once() {
        let (router, output) = router();
        let mut interp = Interp::new();
        let p = Promise::new();
        router.begin(1);
        router.route(&mut interp, 1, ExecutionResult::Pending(p.clone()));
        interp.run_jobs().unwrap();
        assert_eq!(router.status(), RunStatus::Running);

        p.reject(&mut interp, Val::error("Error", "late"));
        p.resolve(&mut interp, Val::from(Node::new("svg"))).unwrap();
        interp.run_jobs().unwrap();
        assert_eq!(output.to_markup(), r#"<div><div class="error">late</div></div>"#);
        assert_eq!(router.status(), RunStatus::Failed);
    }

    #[test]
    #[traced_test]
    fn stale_settlements_dropped() {
        let (router, output) = router();
        let mut interp = Interp::new();
        let p = Promise::new();
        router.begin(1);
        router.route(&mut interp, 1, ExecutionResult::Pending(p.clone()));
        router.begin(2);
        router.route(&mut interp, 2, ExecutionResult::Empty);

        p.resolve(&mut interp, Val::from(Node::new("svg"))).unwrap();
        interp.run_jobs().unwrap();
        assert_eq!(output.to_markup(), "<div></div>");
        assert_eq!(router.status(), RunStatus::Succeeded);
        assert!(logs_contain("dropping outcome of stale run 1"));
    }
}
