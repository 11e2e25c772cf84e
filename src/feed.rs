//! Synthetic transaction feed for live mode.
//!
//! `SyntheticFeed` produces transactions; `FeedTimer` owns the recurring task
//! that asks for them. Ticks are posted into the session queue rather than
//! touching the store directly, so the session stays the only writer.

use chrono::{DateTime, SecondsFormat, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};

use crate::logging::{debug, info, obj, v_num, Domain};
use crate::model::Transaction;

pub const CATALOG: &[&str] = &["RAM DDR4", "SSD 1TB", "Mouse Pro", "Monitor 24'"];
pub const MIN_AMOUNT: f64 = 20.0;
pub const MAX_AMOUNT: f64 = 170.0;

pub struct SyntheticFeed {
    catalog: Vec<String>,
    last_id: u64,
    rng: StdRng,
}

impl SyntheticFeed {
    pub fn new(id_seed: u64) -> Self {
        Self::with_rng(id_seed, StdRng::from_entropy())
    }

    pub fn with_rng(id_seed: u64, rng: StdRng) -> Self {
        Self {
            catalog: CATALOG.iter().map(|p| p.to_string()).collect(),
            last_id: id_seed,
            rng,
        }
    }

    pub fn last_id(&self) -> u64 {
        self.last_id
    }

    pub fn next(&mut self) -> Transaction {
        self.next_at(Utc::now())
    }

    pub fn next_at(&mut self, now: DateTime<Utc>) -> Transaction {
        self.last_id += 1;
        let product = self.catalog[self.rng.gen_range(0..self.catalog.len())].clone();
        let raw: f64 = self.rng.gen_range(MIN_AMOUNT..MAX_AMOUNT);
        // Rounding can land on the open upper bound.
        let amount = ((raw * 100.0).round() / 100.0).min(MAX_AMOUNT - 0.01);
        Transaction {
            id: format!("txn_{}", self.last_id),
            product,
            date: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            amount,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Running,
}

/// Cancellable recurring task handle. At most one task is alive at a time.
pub struct FeedTimer {
    period: Duration,
    epoch: u64,
    handle: Option<JoinHandle<()>>,
}

impl FeedTimer {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            epoch: 0,
            handle: None,
        }
    }

    pub fn state(&self) -> TimerState {
        if self.handle.is_some() {
            TimerState::Running
        } else {
            TimerState::Idle
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == TimerState::Running
    }

    /// True only for ticks produced by the currently armed task.
    pub fn accepts(&self, epoch: u64) -> bool {
        self.is_running() && epoch == self.epoch
    }

    /// Arm the timer. No-op when already running. Each tick sends
    /// `make(epoch)`, where `epoch` identifies this arming so late ticks from
    /// a disarmed timer can be dropped by the receiver.
    pub fn start<E, F>(&mut self, tx: UnboundedSender<E>, make: F) -> bool
    where
        E: Send + 'static,
        F: Fn(u64) -> E + Send + 'static,
    {
        if self.is_running() {
            return false;
        }
        self.epoch += 1;
        let epoch = self.epoch;
        let period = self.period;
        self.handle = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if tx.send(make(epoch)).is_err() {
                    break;
                }
            }
        }));
        info(
            Domain::Feed,
            "started",
            obj(&[
                ("epoch", v_num(epoch as f64)),
                ("period_secs", v_num(period.as_secs_f64())),
            ]),
        );
        true
    }

    /// Disarm the timer. No-op when idle.
    pub fn stop(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                handle.abort();
                debug(Domain::Feed, "stopped", obj(&[("epoch", v_num(self.epoch as f64))]));
                true
            }
            None => false,
        }
    }
}

impl Drop for FeedTimer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
