//! Snapshot payload types shared by the live endpoint and the fallback file.
//!
//! Decoding is lenient: structurally incomplete input normalizes to empty
//! values instead of failing. Only a body that is not JSON at all is an error.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Live,
    Demo,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Live => "live",
            Mode::Demo => "demo",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub product: String,
    /// ISO-8601 timestamp, kept as received.
    pub date: String,
    pub amount: f64,
}

impl Transaction {
    /// Returns `None` for entries that are not JSON objects.
    pub fn from_value(value: &Value) -> Option<Self> {
        let fields = value.as_object()?;
        Some(Self {
            id: text(fields.get("id")),
            product: text(fields.get("product")),
            date: text(fields.get("date")),
            amount: number(fields.get("amount")),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Text(String),
    Missing,
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Number(n) => f.write_str(&format_number(*n)),
            MetricValue::Text(s) => f.write_str(s),
            MetricValue::Missing => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub title: String,
    pub value: MetricValue,
}

impl Metric {
    pub fn from_value(value: &Value) -> Self {
        let title = text(value.get("title"));
        let value = match value.get("value") {
            Some(Value::Number(n)) => n.as_f64().map(MetricValue::Number).unwrap_or(MetricValue::Missing),
            Some(Value::String(s)) => MetricValue::Text(s.clone()),
            Some(Value::Bool(b)) => MetricValue::Text(b.to_string()),
            _ => MetricValue::Missing,
        };
        Self { title, value }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub metrics: Vec<Metric>,
    pub transactions: Vec<Transaction>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(body)?;
        Ok(Self::from_value(&value))
    }

    /// Missing or non-array `metrics`/`transactions` become empty.
    pub fn from_value(value: &Value) -> Self {
        let metrics = array_field(value, "metrics").map(Metric::from_value).collect();
        let transactions = array_field(value, "transactions")
            .filter_map(Transaction::from_value)
            .collect();
        Self { metrics, transactions }
    }

    /// Short content digest over transaction ids and amounts.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for tx in &self.transactions {
            hasher.update(tx.id.as_bytes());
            hasher.update(b"|");
            hasher.update(format!("{:.2}", tx.amount).as_bytes());
            hasher.update(b"\n");
        }
        let digest = hex::encode(hasher.finalize());
        digest[..16].to_string()
    }
}

fn array_field<'a>(value: &'a Value, key: &str) -> impl Iterator<Item = &'a Value> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter())
        .into_iter()
        .flatten()
}

fn text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn number(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Integral values print without a fractional part (`1.0` -> `1`).
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}
