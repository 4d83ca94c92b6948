//! Playground task owning a [Session], with debounced auto-run
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinSet;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

use crate::config::Config;
use crate::examples::{Example, ExampleSource};
use crate::exec::RunId;
use crate::router::RunStatus;
use crate::session::Session;
use crate::{Error, Result};

/// Observable state of the playground
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub status: RunStatus,
    /// Markup of the output sink
    pub output: String,
    pub text: String,
    pub auto_run: bool,
    pub loading: bool,
    /// Runs started so far
    pub runs: RunId,
}

impl Snapshot {
    fn of(session: &Session) -> Self {
        Self {
            status: session.status(),
            output: session.output(),
            text: session.text().to_string(),
            auto_run: session.auto_run(),
            loading: session.is_loading(),
            runs: session.runs(),
        }
    }
}

/// Starts the playground task
pub fn start(config: Config, source: ExampleSource) -> PlaygroundHandle {
    let (ev_tx, mut ev_rx) = mpsc::channel(32);
    let mut playground = Playground::new(Session::new(config, source));
    let handle = PlaygroundHandle {
        ev_tx,
        snapshot_rx: playground.snapshot_tx.subscribe(),
    };
    tokio::spawn(async move {
        loop {
            tokio::select! {
                ev = ev_rx.recv() => match ev {
                    Some(ev) => playground.handle_ev(ev),
                    None => {
                        info!("Playground handle dropped - terminating");
                        break;
                    }
                },
                Some(Ok((example, tx))) = playground.loads.join_next() => {
                    playground.handle_loaded(example, tx);
                }
                _ = deadline(playground.run_at) => {
                    playground.run_at = None;
                    debug!("auto-run timer fired");
                    playground.session.run();
                }
            }
            playground.publish();
        }
    });
    handle
}

/// Resolves at `at`, or never when no timer is armed
async fn deadline(at: Option<Instant>) {
    match at {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// Handle to the playground task
#[derive(Debug, Clone)]
pub struct PlaygroundHandle {
    ev_tx: mpsc::Sender<Event>,
    snapshot_rx: watch::Receiver<Snapshot>,
}

impl PlaygroundHandle {
    async fn request<T>(&self, ev: impl FnOnce(oneshot::Sender<T>) -> Event, op: &str) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.ev_tx
            .send(ev(tx))
            .await
            .map_err(|_| Error::FailedToMessagePlayground(format!("{op} failed")))?;
        Ok(rx.await?)
    }

    /// Run the current text now
    pub async fn run(&self) -> Result<RunStatus> {
        self.request(Event::Run, "run").await
    }

    pub async fn clear_output(&self) -> Result<()> {
        self.request(Event::ClearOutput, "clear_output").await
    }

    /// Flip auto-run, returning the new setting
    pub async fn toggle_auto_run(&self) -> Result<bool> {
        self.request(Event::ToggleAutoRun, "toggle_auto_run").await
    }

    /// Replace the text as an editor input event
    pub async fn edit(&self, text: &str) -> Result<()> {
        let text = text.to_string();
        self.request(|tx| Event::Edit(text, tx), "edit").await
    }

    /// Replace the text without arming auto-run
    pub async fn set_text(&self, text: &str) -> Result<()> {
        let text = text.to_string();
        self.request(|tx| Event::SetText(text, tx), "set_text").await
    }

    /// Load example `name`, resolving with the status once loading ends
    pub async fn load_example(&self, name: &str) -> Result<RunStatus> {
        let name = name.to_string();
        self.request(|tx| Event::LoadExample(name, tx), "load_example")
            .await
    }

    /// Current state
    pub async fn snapshot(&self) -> Result<Snapshot> {
        self.request(Event::Snapshot, "snapshot").await
    }

    /// Receiver of state after every change
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot_rx.clone()
    }
}

/// Messages for [Playground]
#[derive(Debug)]
enum Event {
    Run(oneshot::Sender<RunStatus>),
    ClearOutput(oneshot::Sender<()>),
    ToggleAutoRun(oneshot::Sender<bool>),
    Edit(String, oneshot::Sender<()>),
    SetText(String, oneshot::Sender<()>),
    LoadExample(String, oneshot::Sender<RunStatus>),
    Snapshot(oneshot::Sender<Snapshot>),
}

/// The playground task
struct Playground {
    session: Session,
    /// When the pending auto-run fires
    run_at: Option<Instant>,
    loads: JoinSet<(Example, oneshot::Sender<RunStatus>)>,
    snapshot_tx: watch::Sender<Snapshot>,
}

impl Playground {
    fn new(session: Session) -> Self {
        let (snapshot_tx, _) = watch::channel(Snapshot::of(&session));
        Self {
            session,
            run_at: None,
            loads: JoinSet::new(),
            snapshot_tx,
        }
    }

    fn handle_ev(&mut self, ev: Event) {
        debug!("handle_ev - {ev:?}");
        match ev {
            Event::Run(tx) => {
                let _ = tx.send(self.session.run());
            }
            Event::ClearOutput(tx) => {
                self.session.clear_output();
                let _ = tx.send(());
            }
            Event::ToggleAutoRun(tx) => {
                let on = self.session.toggle_auto_run();
                if !on {
                    self.run_at = None;
                }
                let _ = tx.send(on);
            }
            Event::Edit(text, tx) => {
                if self.session.edit(&text) {
                    self.schedule(self.session.config().auto_run_delay());
                }
                let _ = tx.send(());
            }
            Event::SetText(text, tx) => {
                self.session.set_text(&text);
                let _ = tx.send(());
            }
            Event::LoadExample(name, tx) => {
                if !self.session.begin_load(&name) {
                    let _ = tx.send(self.session.status());
                    return;
                }
                let source = self.session.source().clone();
                self.loads.spawn(async move { (source.load(&name).await, tx) });
            }
            Event::Snapshot(tx) => {
                let _ = tx.send(Snapshot::of(&self.session));
            }
        }
    }

    fn handle_loaded(&mut self, example: Example, tx: oneshot::Sender<RunStatus>) {
        if self.session.finish_load(example) {
            self.schedule(self.session.config().example_run_delay());
        }
        let _ = tx.send(self.session.status());
    }

    /// Arm the auto-run timer, replacing any pending one
    fn schedule(&mut self, delay: std::time::Duration) {
        debug!("auto-run in {delay:?}");
        self.run_at = Some(Instant::now() + delay);
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(Snapshot::of(&self.session));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::sleep;

    fn playground() -> PlaygroundHandle {
        start(Config::default(), ExampleSource::Offline)
    }

    #[tokio::test(start_paused = true)]
    async fn debounce_coalesces_edits() {
        let pg = playground();
        assert!(pg.toggle_auto_run().await.unwrap());

        pg.edit("return 1").await.unwrap();
        sleep(Duration::from_millis(300)).await;
        pg.edit("return 12").await.unwrap();
        sleep(Duration::from_millis(300)).await;
        pg.edit("return 123").await.unwrap();

        sleep(Duration::from_millis(900)).await;
        assert_eq!(pg.snapshot().await.unwrap().runs, 0, "timer re-armed by last edit");

        sleep(Duration::from_millis(200)).await;
        let snap = pg.snapshot().await.unwrap();
        assert_eq!(snap.runs, 1);
        assert_eq!(snap.status, RunStatus::Succeeded);
    }

    #[tokio::test(start_paused = true)]
    async fn edits_without_auto_run() {
        let pg = playground();
        pg.edit("throw new Error('x')").await.unwrap();
        sleep(Duration::from_secs(5)).await;
        let snap = pg.snapshot().await.unwrap();
        assert_eq!(snap.runs, 0);
        assert_eq!(snap.status, RunStatus::Idle);

        assert_eq!(pg.run().await.unwrap(), RunStatus::Failed);
        assert_eq!(
            pg.snapshot().await.unwrap().output,
            r#"<div class="error">x</div>"#
        );
    }

    #[tokio::test(start_paused = true)]
    async fn toggle_runs_immediately() {
        let pg = playground();
        pg.set_text("return 1").await.unwrap();
        assert!(pg.toggle_auto_run().await.unwrap());
        assert_eq!(pg.snapshot().await.unwrap().runs, 1);
        assert!(!pg.toggle_auto_run().await.unwrap());
        assert_eq!(pg.snapshot().await.unwrap().runs, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn toggle_off_cancels_pending_run() {
        let pg = playground();
        assert!(pg.toggle_auto_run().await.unwrap());
        pg.edit("return 1").await.unwrap();
        sleep(Duration::from_millis(300)).await;
        assert!(!pg.toggle_auto_run().await.unwrap());

        sleep(Duration::from_secs(5)).await;
        let snap = pg.snapshot().await.unwrap();
        assert_eq!(snap.runs, 0);
        assert_eq!(snap.status, RunStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn load_example_offline() {
        let pg = playground();
        assert_eq!(
            pg.load_example("line-chart").await.unwrap(),
            RunStatus::FallbackLoaded
        );
        let snap = pg.snapshot().await.unwrap();
        assert!(!snap.loading);
        assert_eq!(snap.text, crate::examples::fallback("line-chart"));

        assert_eq!(pg.load_example("").await.unwrap(), RunStatus::FallbackLoaded);
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_see_changes() {
        let pg = playground();
        let mut rx = pg.subscribe();
        pg.set_text("return d3.create('svg').node()").await.unwrap();
        pg.run().await.unwrap();
        rx.changed().await.unwrap();
        let snap = rx.borrow_and_update().clone();
        assert_eq!(snap.output, "<svg></svg>");
    }
}
