//! Pure projection from dashboard state to a view model.

use chrono::{DateTime, Local, TimeZone};
use serde::Serialize;

use crate::chart::{self, Bucket};
use crate::model::{Metric, Transaction};
use crate::source::ConnectivityStatus;
use crate::store::TransactionStore;

pub const CHART_LABEL: &str = "Sales USD";

#[derive(Debug, Clone, Copy)]
pub struct ViewSettings {
    pub table_rows: usize,
    pub chart_window: usize,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            table_rows: 7,
            chart_window: chart::DEFAULT_WINDOW,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusView {
    pub api_online: bool,
    pub indicator: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardView {
    pub title: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowView {
    pub id: String,
    pub product: String,
    pub date: String,
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartView {
    pub label: String,
    pub buckets: Vec<Bucket>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewModel {
    pub status: StatusView,
    pub cards: Vec<CardView>,
    pub rows: Vec<RowView>,
    pub chart: ChartView,
}

pub fn project(
    store: &TransactionStore,
    metrics: &[Metric],
    status: &ConnectivityStatus,
    settings: ViewSettings,
) -> ViewModel {
    project_in(&Local, store, metrics, status, settings)
}

pub fn project_in<Tz>(
    tz: &Tz,
    store: &TransactionStore,
    metrics: &[Metric],
    status: &ConnectivityStatus,
    settings: ViewSettings,
) -> ViewModel
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    ViewModel {
        status: StatusView {
            api_online: status.api_online,
            indicator: status.indicator().to_string(),
            text: status.text.clone(),
        },
        cards: metrics
            .iter()
            .map(|m| CardView {
                title: m.title.clone(),
                value: m.value.to_string(),
            })
            .collect(),
        rows: recent_rows(tz, store.filtered(), settings.table_rows),
        chart: ChartView {
            label: CHART_LABEL.to_string(),
            buckets: chart::aggregate_in(tz, store.filtered(), store.transactions(), settings.chart_window),
        },
    }
}

/// Most recent `limit` entries, newest first.
fn recent_rows<Tz>(tz: &Tz, filtered: &[Transaction], limit: usize) -> Vec<RowView>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let skip = filtered.len().saturating_sub(limit);
    filtered[skip..]
        .iter()
        .rev()
        .map(|tx| RowView {
            id: tx.id.clone(),
            product: tx.product.clone(),
            date: format_date(tz, &tx.date),
            amount: format_amount(tx.amount),
        })
        .collect()
}

pub fn format_amount(amount: f64) -> String {
    format!("${:.2}", amount)
}

/// Local date and time, 24-hour clock. Unparseable input is shown as-is.
pub fn format_date<Tz>(tz: &Tz, iso: &str) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    match DateTime::parse_from_rfc3339(iso) {
        Ok(dt) => dt.with_timezone(tz).format("%d/%m/%Y %H:%M:%S").to_string(),
        Err(_) => iso.to_string(),
    }
}
