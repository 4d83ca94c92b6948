//! Compiles and invokes snippets against the environment, classifying what they return
use quill::promise::{then_of, to_promise};
use std::thread;
use tracing::{debug, error, info_span, Span};

use crate::config::Config;
use crate::dom::Node;
use crate::env::Environment;
use crate::value::{Extern, Interp, Promise, Settled, Val};

/// Identifier of a single execution, increasing per executor
pub type RunId = u64;

/// Stack of the thread snippets are evaluated on, sized for deep call nesting
const SNIPPET_STACK_SIZE: usize = 256 * 1024 * 1024;

/// Outcome of invoking a snippet
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionResult {
    /// Element to display
    Node(Node),
    /// Value that settles later into one of the other outcomes
    Pending(Promise),
    /// Nothing to display
    Empty,
    /// Message of the error raised while compiling or running
    Failure(String),
}

impl ExecutionResult {
    /// Classify an outcome delivered by a pending result
    pub fn from_settled(settled: Settled) -> Self {
        match settled {
            Settled::Fulfilled(v) => match v {
                Val::Extern(Extern::Node(n)) => ExecutionResult::Node(n),
                _ => ExecutionResult::Empty,
            },
            Settled::Rejected(reason) => ExecutionResult::Failure(quill::message_of(&reason)),
        }
    }
}

/// Runs snippet text with the environment's names bound as parameters
pub struct Executor {
    interp: Interp,
    env: Environment,
    runs: RunId,
}

impl Executor {
    pub fn new(config: &Config, env: Environment) -> Self {
        let mut interp = Interp::new();
        interp.set_step_limit(Some(config.step_limit));
        interp.set_call_depth_limit(config.max_call_depth);
        Self {
            interp,
            env,
            runs: 0,
        }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn interp(&mut self) -> &mut Interp {
        &mut self.interp
    }

    /// Id of the latest run
    pub fn current_run(&self) -> RunId {
        self.runs
    }

    /// Allocate id of the next run
    pub fn next_run(&mut self) -> RunId {
        self.runs += 1;
        self.runs
    }

    /// Run snippet once under a fresh id
    pub fn run(&mut self, text: &str) -> (RunId, ExecutionResult) {
        let id = self.next_run();
        (id, self.execute(id, text))
    }

    /// Run snippet once as run `id`, classifying its outcome
    pub fn execute(&mut self, id: RunId, text: &str) -> ExecutionResult {
        let span = info_span!("run", id);
        let _enter = span.enter();

        if text.trim().is_empty() {
            debug!("empty snippet");
            return ExecutionResult::Empty;
        }

        self.interp.reset_budget();
        let result = match on_snippet_stack(|| self.invoke(text)) {
            Ok(result) => result,
            Err(e) => {
                let reason = self.interp.error_to_val(e);
                ExecutionResult::Failure(quill::message_of(&reason))
            }
        };
        debug!("run {id} - {result:?}");
        result
    }

    fn invoke(&mut self, text: &str) -> quill::Result<ExecutionResult> {
        let invokable = quill::compile(text, &self.env.names())?;
        let value = invokable.invoke(&mut self.interp, self.env.values())?;
        self.classify(value)
    }

    fn classify(&mut self, value: Val) -> quill::Result<ExecutionResult> {
        let result = match value {
            Val::Promise(p) => ExecutionResult::Pending(p),
            Val::Extern(Extern::Node(n)) => ExecutionResult::Node(n),
            v if then_of(&mut self.interp, &v)?.is_some() => {
                ExecutionResult::Pending(to_promise(&mut self.interp, v)?)
            }
            _ => ExecutionResult::Empty,
        };
        Ok(result)
    }

    /// Deliver queued promise reactions. Jobs left behind by a fatal error are dropped.
    pub fn drain(&mut self) -> quill::Result<()> {
        let interp = &mut self.interp;
        let drained = on_snippet_stack(|| interp.run_jobs());
        if drained.is_err() {
            self.interp.clear_jobs();
        }
        drained
    }
}

/// Evaluate `f` on a thread with [SNIPPET_STACK_SIZE] of stack
fn on_snippet_stack<R: Send>(f: impl FnOnce() -> quill::Result<R> + Send) -> quill::Result<R> {
    let span = Span::current();
    thread::scope(|s| {
        let handle = thread::Builder::new()
            .name("snippet".to_string())
            .stack_size(SNIPPET_STACK_SIZE)
            .spawn_scoped(s, move || span.in_scope(f))
            .map_err(|e| {
                error!("Failed to spawn snippet thread - {e}");
                quill::Error::UnexpectedState(format!("Failed to spawn snippet thread - {e}"))
            })?;
        handle
            .join()
            .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
    })
}
