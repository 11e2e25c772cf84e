//! Pushes a `ViewModel` into whatever widgets the surface provides.

use serde_json::Value;
use std::collections::HashSet;
use std::io::Write;

use crate::chart::Bucket;
use crate::logging::{debug, obj, v_num, v_str, warn, Domain};
use crate::view::{CardView, ChartView, RowView, StatusView, ViewModel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Status,
    Cards,
    Table,
    Chart,
}

impl Region {
    pub const ALL: [Region; 4] = [Region::Status, Region::Cards, Region::Table, Region::Chart];

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Status => "status",
            Region::Cards => "cards",
            Region::Table => "table",
            Region::Chart => "chart",
        }
    }
}

/// Which regions an update touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderScope {
    /// Load or reload: everything.
    Full,
    /// Filter change or feed tick: table and chart.
    Data,
}

impl RenderScope {
    fn includes(&self, region: Region) -> bool {
        match self {
            RenderScope::Full => true,
            RenderScope::Data => matches!(region, Region::Table | Region::Chart),
        }
    }
}

/// Render target. Any region may be absent; the sync skips it silently.
pub trait Surface {
    fn has(&self, region: Region) -> bool;
    fn draw_status(&mut self, status: &StatusView);
    fn draw_cards(&mut self, cards: &[CardView]);
    fn draw_table(&mut self, rows: &[RowView]);
    fn draw_chart(&mut self, chart: &ChartHandle);
}

/// Chart widget state, constructed on first draw and updated in place after.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartHandle {
    pub label: String,
    pub buckets: Vec<Bucket>,
    pub revision: u64,
}

impl ChartHandle {
    fn new(view: &ChartView) -> Self {
        Self {
            label: view.label.clone(),
            buckets: view.buckets.clone(),
            revision: 0,
        }
    }

    fn update(&mut self, view: &ChartView) {
        self.buckets = view.buckets.clone();
        self.revision += 1;
    }
}

#[derive(Debug, Default)]
pub struct UiSync {
    chart: Option<ChartHandle>,
    frames: u64,
}

impl UiSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chart(&self) -> Option<&ChartHandle> {
        self.chart.as_ref()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn sync(&mut self, view: &ViewModel, scope: RenderScope, surface: &mut dyn Surface) {
        self.frames += 1;
        let mut drawn = Vec::new();
        for region in Region::ALL {
            if !scope.includes(region) || !surface.has(region) {
                continue;
            }
            match region {
                Region::Status => surface.draw_status(&view.status),
                Region::Cards => surface.draw_cards(&view.cards),
                Region::Table => surface.draw_table(&view.rows),
                Region::Chart => {
                    match self.chart.as_mut() {
                        Some(chart) => chart.update(&view.chart),
                        None => self.chart = Some(ChartHandle::new(&view.chart)),
                    }
                    if let Some(chart) = self.chart.as_ref() {
                        surface.draw_chart(chart);
                    }
                }
            }
            drawn.push(Value::from(region.as_str()));
        }
        debug(
            Domain::View,
            "sync",
            obj(&[
                ("frame", v_num(self.frames as f64)),
                ("regions", Value::Array(drawn)),
                ("rows", v_num(view.rows.len() as f64)),
            ]),
        );
    }
}

const BAR_WIDTH: usize = 32;

/// Plain-text surface writing one frame per sync.
pub struct TextSurface<W: Write> {
    out: W,
    regions: HashSet<Region>,
}

impl TextSurface<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> TextSurface<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            regions: Region::ALL.into_iter().collect(),
        }
    }

    pub fn without(mut self, region: Region) -> Self {
        self.regions.remove(&region);
        self
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, region: Region, lines: &[String]) {
        let result = lines.iter().try_for_each(|l| writeln!(self.out, "{}", l)).and_then(|_| self.out.flush());
        if let Err(err) = result {
            warn(
                Domain::View,
                "write_failed",
                obj(&[("region", v_str(region.as_str())), ("error", v_str(&err.to_string()))]),
            );
        }
    }
}

impl<W: Write> Surface for TextSurface<W> {
    fn has(&self, region: Region) -> bool {
        self.regions.contains(&region)
    }

    fn draw_status(&mut self, status: &StatusView) {
        let line = format!("{}  {}", status.indicator, status.text);
        self.emit(Region::Status, &[line]);
    }

    fn draw_cards(&mut self, cards: &[CardView]) {
        let line = cards
            .iter()
            .map(|c| format!("[ {}: {} ]", c.title, c.value))
            .collect::<Vec<_>>()
            .join(" ");
        self.emit(Region::Cards, &[line]);
    }

    fn draw_table(&mut self, rows: &[RowView]) {
        let mut lines = vec![format!("{:<10} {:<14} {:<20} {:>10}", "ID", "PRODUCT", "DATE", "AMOUNT")];
        lines.extend(
            rows.iter()
                .map(|r| format!("{:<10} {:<14} {:<20} {:>10}", r.id, r.product, r.date, r.amount)),
        );
        self.emit(Region::Table, &lines);
    }

    fn draw_chart(&mut self, chart: &ChartHandle) {
        let max = chart.buckets.iter().map(|b| b.sum).fold(0.0_f64, f64::max);
        let mut lines = vec![chart.label.clone()];
        lines.extend(chart.buckets.iter().map(|b| {
            let width = if max > 0.0 {
                ((b.sum / max) * BAR_WIDTH as f64).round().max(0.0) as usize
            } else {
                0
            };
            format!("{:>5} | {:<bar$} {:.2}", b.label, "#".repeat(width), b.sum, bar = BAR_WIDTH)
        }));
        self.emit(Region::Chart, &lines);
    }
}
