//! Editing session: snippet text, run triggers, and the status surface
use tracing::{debug, info};

use crate::config::Config;
use crate::dom::{Document, Node};
use crate::env::Environment;
use crate::examples::{Example, ExampleSource};
use crate::exec::{Executor, RunId};
use crate::router::{Router, RunStatus};

/// Snippet being edited, with the document its runs render into
pub struct Session {
    config: Config,
    doc: Document,
    exec: Executor,
    router: Router,
    source: ExampleSource,
    text: String,
    auto_run: bool,
    loading: bool,
}

impl Session {
    /// Session with a freshly provisioned environment
    pub fn new(config: Config, source: ExampleSource) -> Self {
        let doc = Document::new();
        let env = Environment::provision(&config, &doc);
        let exec = Executor::new(&config, env);
        let router = Router::new(doc.output().clone());
        Self {
            config,
            doc,
            exec,
            router,
            source,
            text: String::new(),
            auto_run: false,
            loading: false,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn source(&self) -> &ExampleSource {
        &self.source
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Run the current text, delivering reactions that are ready before returning
    pub fn run(&mut self) -> RunStatus {
        let id = self.exec.next_run();
        self.router.begin(id);
        if self.text.trim().is_empty() {
            self.router.set_status(RunStatus::Idle);
            return self.status();
        }

        let result = self.exec.execute(id, &self.text);
        self.router.route(self.exec.interp(), id, result);
        if let Err(e) = self.exec.drain() {
            self.router.fail(id, &e.message());
        }
        info!("run {id} - {}", self.status());
        self.status()
    }

    /// Deliver reactions queued outside of [Session::run]
    pub fn drain(&mut self) {
        if let Err(e) = self.exec.drain() {
            let id = self.exec.current_run();
            self.router.fail(id, &e.message());
        }
    }

    pub fn clear_output(&mut self) {
        self.router.clear_output();
    }

    /// Flip auto-run, running immediately when switched on with text to run.
    /// Returns the new setting.
    pub fn toggle_auto_run(&mut self) -> bool {
        self.auto_run = !self.auto_run;
        debug!("auto-run {}", self.auto_run);
        if self.auto_run && !self.text.trim().is_empty() {
            self.run();
        }
        self.auto_run
    }

    /// Replace the text as the editor does. Returns whether or not a debounced run is due.
    pub fn edit(&mut self, text: &str) -> bool {
        self.text = text.to_string();
        self.auto_run
    }

    /// Replace the text without scheduling anything
    pub fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
    }

    /// Mark example `name` as loading. Returns false, doing nothing, for an empty name.
    pub fn begin_load(&mut self, name: &str) -> bool {
        if name.trim().is_empty() {
            return false;
        }
        self.loading = true;
        self.router.set_status(RunStatus::Loading);
        true
    }

    /// Install loaded example text. Returns whether or not a delayed run is due.
    pub fn finish_load(&mut self, example: Example) -> bool {
        self.text = example.text;
        self.loading = false;
        let status = if example.fallback {
            RunStatus::FallbackLoaded
        } else {
            RunStatus::Loaded
        };
        self.router.set_status(status);
        info!("{status} - {}", example.name);
        self.auto_run && !example.fallback
    }

    /// Load example `name` from the session's source. Returns whether or not a delayed run is due.
    pub async fn load_example(&mut self, name: &str) -> bool {
        if !self.begin_load(name) {
            return false;
        }
        let example = self.source.load(name).await;
        self.finish_load(example)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn status(&self) -> RunStatus {
        self.router.status()
    }

    /// The output sink
    pub fn output_node(&self) -> Node {
        self.router.output()
    }

    /// Markup of everything in the output sink
    pub fn output(&self) -> String {
        self.router
            .output()
            .children()
            .iter()
            .map(Node::to_markup)
            .collect()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn auto_run(&self) -> bool {
        self.auto_run
    }

    /// Number of runs started
    pub fn runs(&self) -> RunId {
        self.exec.current_run()
    }
}
