//! Dashboard session: owns the store, feed, and widgets, and applies every
//! mutation from one event queue.
//!
//! Load results, search input, and feed ticks all arrive as `SessionEvent`s
//! and are handled one at a time, so `initialize` can never interleave with a
//! feed `append`.

use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::config::Config;
use crate::feed::{FeedTimer, SyntheticFeed};
use crate::logging::{debug, info, obj, v_bool, v_num, v_str, Domain};
use crate::model::{Metric, Mode};
use crate::render::{RenderScope, Surface, UiSync};
use crate::source::{ConnectivityStatus, LoadOutcome, SnapshotLoader};
use crate::store::TransactionStore;
use crate::view::{self, ViewModel, ViewSettings};

#[derive(Debug)]
pub enum SessionEvent {
    Loaded(LoadOutcome),
    Query(String),
    Tick { epoch: u64 },
    Reload,
    Shutdown,
}

impl SessionEvent {
    /// One line of user input: `:reload`, `:quit`, or a search query.
    pub fn from_input(line: &str) -> Self {
        match line.trim() {
            ":reload" => SessionEvent::Reload,
            ":quit" | ":q" => SessionEvent::Shutdown,
            _ => SessionEvent::Query(line.to_string()),
        }
    }

    fn tick(epoch: u64) -> Self {
        SessionEvent::Tick { epoch }
    }
}

pub struct Session<S: Surface> {
    store: TransactionStore,
    metrics: Vec<Metric>,
    status: ConnectivityStatus,
    generator: SyntheticFeed,
    timer: FeedTimer,
    ui: UiSync,
    surface: S,
    settings: ViewSettings,
    loader: Arc<SnapshotLoader>,
    reloading: bool,
    tx: UnboundedSender<SessionEvent>,
    rx: UnboundedReceiver<SessionEvent>,
}

impl<S: Surface> Session<S> {
    pub fn new(cfg: &Config, loader: SnapshotLoader, surface: S) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            store: TransactionStore::new(cfg.max_history),
            metrics: Vec::new(),
            status: ConnectivityStatus::loading(),
            generator: SyntheticFeed::new(cfg.id_seed),
            timer: FeedTimer::new(cfg.tick_period()),
            ui: UiSync::new(),
            surface,
            settings: ViewSettings {
                table_rows: cfg.table_rows,
                chart_window: cfg.chart_window,
            },
            loader: Arc::new(loader),
            reloading: false,
            tx,
            rx,
        }
    }

    /// Replace the transaction generator (seeded RNG in tests).
    pub fn with_generator(mut self, generator: SyntheticFeed) -> Self {
        self.generator = generator;
        self
    }

    /// Handle for producers outside the session (input, signals).
    pub fn sender(&self) -> UnboundedSender<SessionEvent> {
        self.tx.clone()
    }

    pub fn store(&self) -> &TransactionStore {
        &self.store
    }

    pub fn status(&self) -> &ConnectivityStatus {
        &self.status
    }

    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    pub fn timer(&self) -> &FeedTimer {
        &self.timer
    }

    pub fn ui(&self) -> &UiSync {
        &self.ui
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn view(&self) -> ViewModel {
        view::project(&self.store, &self.metrics, &self.status, self.settings)
    }

    /// Fetch a snapshot and apply it before any queued event is handled.
    pub async fn load(&mut self) {
        let outcome = self.loader.load().await;
        let _ = self.handle(SessionEvent::Loaded(outcome));
    }

    /// Perform the initial load, apply it, then drain events until shutdown.
    pub async fn run(&mut self) {
        info(Domain::System, "session_start", obj(&[("max_history", v_num(self.store.capacity() as f64))]));
        self.load().await;

        while let Some(event) = self.rx.recv().await {
            if self.handle(event).is_break() {
                break;
            }
        }
        self.timer.stop();
        info(
            Domain::System,
            "session_end",
            obj(&[("frames", v_num(self.ui.frames() as f64)), ("transactions", v_num(self.store.len() as f64))]),
        );
    }

    /// Wait for and handle a single queued event.
    pub async fn step(&mut self) -> ControlFlow<()> {
        match self.rx.recv().await {
            Some(event) => self.handle(event),
            None => ControlFlow::Break(()),
        }
    }

    pub fn handle(&mut self, event: SessionEvent) -> ControlFlow<()> {
        match event {
            SessionEvent::Loaded(outcome) => self.apply_load(outcome),
            SessionEvent::Query(query) => {
                self.store.set_filter(&query);
                debug(
                    Domain::Store,
                    "filter",
                    obj(&[("query", v_str(&query)), ("matches", v_num(self.store.filtered().len() as f64))]),
                );
                self.render(RenderScope::Data);
            }
            SessionEvent::Tick { epoch } => self.apply_tick(epoch),
            SessionEvent::Reload => self.spawn_reload(),
            SessionEvent::Shutdown => {
                self.timer.stop();
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn apply_load(&mut self, outcome: LoadOutcome) {
        self.reloading = false;
        let LoadOutcome {
            snapshot, mode, status, ..
        } = outcome;
        if mode == Mode::Demo {
            self.timer.stop();
        }
        self.store.initialize(snapshot.transactions, mode);
        self.metrics = snapshot.metrics;
        self.status = status;
        info(
            Domain::System,
            "mode",
            obj(&[
                ("mode", v_str(mode.as_str())),
                ("api_online", v_bool(self.status.api_online)),
                ("status", v_str(&self.status.text)),
            ]),
        );
        self.render(RenderScope::Full);
        if mode == Mode::Live {
            self.timer.start(self.tx.clone(), SessionEvent::tick);
        }
    }

    fn apply_tick(&mut self, epoch: u64) {
        // A tick may have been queued before the timer was disarmed.
        if !self.timer.accepts(epoch) {
            debug(Domain::Feed, "stale_tick", obj(&[("epoch", v_num(epoch as f64))]));
            return;
        }
        if self.store.mode() != Mode::Live {
            self.timer.stop();
            return;
        }
        let tx = self.generator.next();
        debug(
            Domain::Feed,
            "tick",
            obj(&[("id", v_str(&tx.id)), ("product", v_str(&tx.product)), ("amount", v_num(tx.amount))]),
        );
        if self.store.append(tx) {
            self.store.refresh();
            self.render(RenderScope::Data);
        }
    }

    fn spawn_reload(&mut self) {
        if self.reloading {
            return;
        }
        self.reloading = true;
        let loader = Arc::clone(&self.loader);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let outcome = loader.load().await;
            let _ = tx.send(SessionEvent::Loaded(outcome));
        });
    }

    fn render(&mut self, scope: RenderScope) {
        let view = self.view();
        self.ui.sync(&view, scope, &mut self.surface);
    }
}
