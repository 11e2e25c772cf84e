//! Minute-bucketed sales series for the chart widget.

use chrono::{DateTime, Local, TimeZone};
use serde::Serialize;
use std::collections::HashMap;

use crate::model::Transaction;

pub const DEFAULT_WINDOW: usize = 50;
pub const INVALID_LABEL: &str = "--:--";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    pub label: String,
    pub sum: f64,
}

/// Bucket label in local wall-clock time.
pub fn label_in<Tz: TimeZone>(tz: &Tz, iso: &str) -> String
where
    Tz::Offset: std::fmt::Display,
{
    match DateTime::parse_from_rfc3339(iso) {
        Ok(dt) => dt.with_timezone(tz).format("%H:%M").to_string(),
        Err(_) => INVALID_LABEL.to_string(),
    }
}

/// Sum amounts per minute label over the last `window` entries of `working`,
/// or of `all` when `working` is empty. Buckets keep first-seen order.
pub fn aggregate_in<'a, Tz, W, A>(tz: &Tz, working: W, all: A, window: usize) -> Vec<Bucket>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
    W: IntoIterator<Item = &'a Transaction>,
    W::IntoIter: ExactSizeIterator,
    A: IntoIterator<Item = &'a Transaction>,
    A::IntoIter: ExactSizeIterator,
{
    let working = working.into_iter();
    if working.len() > 0 {
        bucketize(tz, working, window)
    } else {
        bucketize(tz, all.into_iter(), window)
    }
}

pub fn aggregate<'a, W, A>(working: W, all: A, window: usize) -> Vec<Bucket>
where
    W: IntoIterator<Item = &'a Transaction>,
    W::IntoIter: ExactSizeIterator,
    A: IntoIterator<Item = &'a Transaction>,
    A::IntoIter: ExactSizeIterator,
{
    aggregate_in(&Local, working, all, window)
}

fn bucketize<'a, Tz, I>(tz: &Tz, rows: I, window: usize) -> Vec<Bucket>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
    I: ExactSizeIterator<Item = &'a Transaction>,
{
    let skip = rows.len().saturating_sub(window);
    let mut order: Vec<(String, i128)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for tx in rows.skip(skip) {
        let label = label_in(tz, &tx.date);
        let cents = to_cents(tx.amount);
        match index.get(&label) {
            Some(&i) => order[i].1 = order[i].1.saturating_add(cents),
            None => {
                index.insert(label.clone(), order.len());
                order.push((label, cents));
            }
        }
    }

    order
        .into_iter()
        .map(|(label, cents)| Bucket {
            label,
            sum: cents as f64 / 100.0,
        })
        .collect()
}

fn to_cents(amount: f64) -> i128 {
    if amount.is_finite() {
        (amount * 100.0).round() as i128
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    fn tx(id: &str, date: &str, amount: f64) -> Transaction {
        Transaction {
            id: id.to_string(),
            product: "RAM DDR4".to_string(),
            date: date.to_string(),
            amount,
        }
    }

    #[test]
    fn test_same_minute_sums_into_one_bucket() {
        let rows = vec![
            tx("1", "2024-01-01T10:00:05Z", 5.0),
            tx("2", "2024-01-01T10:00:40Z", 7.0),
        ];
        let buckets = aggregate_in(&Utc, &rows, &rows, DEFAULT_WINDOW);
        assert_eq!(
            buckets,
            vec![Bucket {
                label: "10:00".to_string(),
                sum: 12.0
            }]
        );
    }

    #[test]
    fn test_first_seen_order_not_chronological() {
        let rows = vec![
            tx("1", "2024-01-01T10:05:00Z", 1.0),
            tx("2", "2024-01-01T09:59:00Z", 2.0),
            tx("3", "2024-01-01T10:05:30Z", 3.0),
        ];
        let labels: Vec<String> = aggregate_in(&Utc, &rows, &rows, DEFAULT_WINDOW)
            .into_iter()
            .map(|b| b.label)
            .collect();
        assert_eq!(labels, vec!["10:05", "09:59"]);
    }

    #[test]
    fn test_window_keeps_last_entries_only() {
        let rows: Vec<Transaction> = (0..60)
            .map(|m| tx(&m.to_string(), &format!("2024-01-01T11:{:02}:00Z", m % 60), 1.0))
            .collect();
        let buckets = aggregate_in(&Utc, &rows, &rows, 50);
        assert_eq!(buckets.len(), 50);
        assert_eq!(buckets[0].label, "11:10");
        assert_eq!(buckets[49].label, "11:59");
    }

    #[test]
    fn test_empty_working_set_falls_back_to_all() {
        let all = vec![tx("1", "2024-01-01T10:00:00Z", 4.0)];
        let none: Vec<Transaction> = Vec::new();
        let buckets = aggregate_in(&Utc, &none, &all, DEFAULT_WINDOW);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].sum, 4.0);
    }

    #[test]
    fn test_labels_follow_the_given_timezone() {
        let caracas = FixedOffset::west_opt(4 * 3600).unwrap();
        assert_eq!(label_in(&caracas, "2024-01-01T10:00:00Z"), "06:00");
    }

    #[test]
    fn test_unparseable_dates_share_a_bucket() {
        let rows = vec![tx("1", "yesterday", 1.5), tx("2", "", 2.5)];
        let buckets = aggregate_in(&Utc, &rows, &rows, DEFAULT_WINDOW);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].label, INVALID_LABEL);
        assert_eq!(buckets[0].sum, 4.0);
    }

    #[test]
    fn test_cent_accumulation_is_exact() {
        let rows: Vec<Transaction> = (0..10).map(|i| tx(&i.to_string(), "2024-01-01T10:00:00Z", 0.1)).collect();
        let buckets = aggregate_in(&Utc, &rows, &rows, DEFAULT_WINDOW);
        assert_eq!(buckets[0].sum, 1.0);
    }

    #[test]
    fn test_huge_amounts_do_not_overflow() {
        let rows = vec![
            tx("1", "2024-01-01T10:00:05Z", 1e17),
            tx("2", "2024-01-01T10:00:40Z", 1e17),
        ];
        let buckets = aggregate_in(&Utc, &rows, &rows, DEFAULT_WINDOW);
        assert_eq!(buckets[0].sum, 2e17);

        let rows = vec![
            tx("1", "2024-01-01T10:00:05Z", f64::MAX),
            tx("2", "2024-01-01T10:00:40Z", f64::MAX),
        ];
        let buckets = aggregate_in(&Utc, &rows, &rows, DEFAULT_WINDOW);
        assert!(buckets[0].sum.is_finite() && buckets[0].sum > 0.0);
    }
}
