use std::collections::VecDeque;

use crate::filter;
use crate::logging::{debug, obj, v_num, v_str, warn, Domain};
use crate::model::{Mode, Transaction};

pub const DEFAULT_CAPACITY: usize = 500;

/// Authoritative in-memory transaction history plus its filtered view.
///
/// `filtered` is always re-derived from the full history, never patched
/// incrementally, so it stays correct across evictions.
#[derive(Debug, Clone)]
pub struct TransactionStore {
    transactions: VecDeque<Transaction>,
    filtered: Vec<Transaction>,
    query: String,
    mode: Mode,
    capacity: usize,
}

impl TransactionStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            transactions: VecDeque::with_capacity(capacity),
            filtered: Vec::new(),
            query: String::new(),
            mode: Mode::Demo,
            capacity: capacity.max(1),
        }
    }

    /// Replace the history wholesale. Oversized input keeps its most recent
    /// `capacity` entries.
    pub fn initialize(&mut self, transactions: Vec<Transaction>, mode: Mode) {
        self.mode = mode;
        self.transactions = transactions.into();
        self.evict_overflow();
        self.refresh();
        debug(
            Domain::Store,
            "initialize",
            obj(&[
                ("mode", v_str(mode.as_str())),
                ("len", v_num(self.transactions.len() as f64)),
            ]),
        );
    }

    /// Push to the back, evicting from the front past capacity. Refused in
    /// demo mode. Does not re-filter; call `refresh` once the batch is done.
    pub fn append(&mut self, tx: Transaction) -> bool {
        if self.mode != Mode::Live {
            warn(
                Domain::Store,
                "append_refused",
                obj(&[("id", v_str(&tx.id)), ("mode", v_str(self.mode.as_str()))]),
            );
            return false;
        }
        self.transactions.push_back(tx);
        let evicted = self.evict_overflow();
        if evicted > 0 {
            debug(Domain::Store, "evicted", obj(&[("count", v_num(evicted as f64))]));
        }
        true
    }

    pub fn set_filter(&mut self, query: &str) {
        self.query = query.to_string();
        self.refresh();
    }

    /// Re-derive `filtered` from the full history with the current query.
    pub fn refresh(&mut self) {
        self.filtered = filter::filter(&self.transactions, &self.query);
    }

    pub fn transactions(&self) -> &VecDeque<Transaction> {
        &self.transactions
    }

    pub fn filtered(&self) -> &[Transaction] {
        &self.filtered
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    fn evict_overflow(&mut self) -> usize {
        let excess = self.transactions.len().saturating_sub(self.capacity);
        self.transactions.drain(..excess);
        excess
    }
}

impl Default for TransactionStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(n: u64) -> Transaction {
        Transaction {
            id: format!("txn_{}", n),
            product: if n % 2 == 0 { "SSD 1TB" } else { "Mouse Pro" }.to_string(),
            date: "2024-01-01T10:00:00Z".to_string(),
            amount: n as f64,
        }
    }

    fn live_store() -> TransactionStore {
        let mut store = TransactionStore::default();
        store.initialize(Vec::new(), Mode::Live);
        store
    }

    #[test]
    fn test_append_then_empty_filter_mirrors_history() {
        let mut store = live_store();
        for n in 0..20 {
            assert!(store.append(tx(n)));
        }
        store.set_filter("");
        assert_eq!(store.filtered().len(), store.len());
        assert!(store.filtered().iter().eq(store.transactions().iter()));
    }

    #[test]
    fn test_retains_most_recent_500() {
        let mut store = live_store();
        for n in 0..1234 {
            store.append(tx(n));
            assert!(store.len() <= 500);
        }
        let ids: Vec<&str> = store.transactions().iter().map(|t| t.id.as_str()).collect();
        let expected: Vec<String> = (734..1234).map(|n| format!("txn_{}", n)).collect();
        assert_eq!(ids, expected.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn test_501st_append_evicts_oldest() {
        let mut store = live_store();
        for n in 0..500 {
            store.append(tx(n));
        }
        assert_eq!(store.len(), 500);
        store.append(tx(500));
        assert_eq!(store.len(), 500);
        assert_eq!(store.transactions().front().unwrap().id, "txn_1");
        assert_eq!(store.transactions().back().unwrap().id, "txn_500");
    }

    #[test]
    fn test_demo_mode_refuses_append() {
        let mut store = TransactionStore::default();
        store.initialize(vec![tx(1)], Mode::Demo);
        assert!(!store.append(tx(2)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_filter_recomputed_from_full_history() {
        let mut store = TransactionStore::new(3);
        store.initialize(Vec::new(), Mode::Live);
        store.set_filter("ssd");
        for n in 0..6 {
            store.append(tx(n));
        }
        store.refresh();
        // history is txn_3..txn_5, only txn_4 is an SSD
        let ids: Vec<&str> = store.filtered().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["txn_4"]);
        assert_eq!(store.query(), "ssd");
    }

    #[test]
    fn test_initialize_caps_oversized_snapshot() {
        let mut store = TransactionStore::new(2);
        store.initialize(vec![tx(1), tx(2), tx(3)], Mode::Demo);
        let ids: Vec<&str> = store.transactions().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["txn_2", "txn_3"]);
        assert_eq!(store.filtered().len(), 2);
    }

    #[test]
    fn test_initialize_keeps_active_query() {
        let mut store = TransactionStore::default();
        store.set_filter("mouse");
        store.initialize(vec![tx(1), tx(2), tx(3)], Mode::Live);
        assert_eq!(store.filtered().len(), 2);
    }
}
