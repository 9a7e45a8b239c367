use serde_json::Value;
use std::fmt;

use crate::report::row::coerce_number as coerce;

/// Rendered in place of any value that could not be loaded or computed.
pub const UNAVAILABLE: &str = "--";

/// One dashboard panel and the endpoint that feeds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanelId {
    Leads,
    Quotations,
    PurchaseOrders,
    Licenses,
}

impl PanelId {
    pub const ALL: [PanelId; 4] = [
        PanelId::Leads,
        PanelId::Quotations,
        PanelId::PurchaseOrders,
        PanelId::Licenses,
    ];

    pub fn endpoint(self) -> &'static str {
        match self {
            PanelId::Leads => "dashboard/leads-stats",
            PanelId::Quotations => "dashboard/quotations-stats",
            PanelId::PurchaseOrders => "dashboard/purchase-order-stats",
            PanelId::Licenses => "dashboard/license-summary",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PanelId::Leads => "Leads",
            PanelId::Quotations => "Quotations",
            PanelId::PurchaseOrders => "Purchase Orders",
            PanelId::Licenses => "Licenses",
        }
    }
}

impl fmt::Display for PanelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// State of a single panel.
#[derive(Debug, Clone, PartialEq)]
pub enum Panel<T> {
    Loading,
    Ready(T),
    Unavailable(String),
}

impl<T> Panel<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Panel::Ready(v) => Some(v),
            _ => None,
        }
    }

    /// Format a ready value, or `--` otherwise.
    pub fn show(&self, f: impl Fn(&T) -> String) -> String {
        self.ready().map(f).unwrap_or_else(|| UNAVAILABLE.to_string())
    }
}

/// Counts from one of the `*-stats` endpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsPanel {
    pub total: f64,
    pub current_month: f64,
    pub previous_month: f64,
    pub trend: Vec<f64>,
}

impl StatsPanel {
    /// Lenient read; `None` only when `data` is not an object.
    pub fn from_value(data: &Value) -> Option<Self> {
        let map = data.as_object()?;
        let number = |keys: &[&str]| {
            keys.iter()
                .filter_map(|k| map.get(*k))
                .find(|v| !v.is_null())
                .map(coerce)
                .unwrap_or(0.0)
        };
        let trend = ["trend", "monthly"]
            .iter()
            .find_map(|k| map.get(*k).and_then(Value::as_array))
            .map(|points| {
                points
                    .iter()
                    .map(|p| match p {
                        Value::Object(o) => o.get("count").or(o.get("value")).map(coerce).unwrap_or(0.0),
                        other => coerce(other),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            total: number(&["total", "count"]),
            current_month: number(&["currentMonth", "thisMonth"]),
            previous_month: number(&["previousMonth", "lastMonth"]),
            trend,
        })
    }

    pub fn growth(&self) -> Option<f64> {
        growth_percent(self.current_month, self.previous_month)
    }
}

/// Counts from the license summary endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseSummary {
    pub expired: u64,
    pub expiring_soon: u64,
    pub active: u64,
}

impl LicenseSummary {
    pub fn from_value(data: &Value) -> Option<Self> {
        let map = data.as_object()?;
        let count = |keys: &[&str]| {
            keys.iter()
                .filter_map(|k| map.get(*k))
                .find(|v| !v.is_null())
                .map(|v| coerce(v).max(0.0) as u64)
                .unwrap_or(0)
        };
        Some(Self {
            expired: count(&["expired"]),
            expiring_soon: count(&["expiringSoon", "expiring_soon"]),
            active: count(&["active"]),
        })
    }
}

/// `(current - previous) / previous * 100`, one decimal. `None` when there
/// is no previous value to compare against.
pub fn growth_percent(current: f64, previous: f64) -> Option<f64> {
    if previous == 0.0 {
        return None;
    }
    let pct = (current - previous) / previous * 100.0;
    Some((pct * 10.0).round() / 10.0)
}

pub fn format_growth(growth: Option<f64>) -> String {
    match growth {
        Some(g) if g > 0.0 => format!("+{g:.1}%"),
        Some(g) => format!("{g:.1}%"),
        None => UNAVAILABLE.to_string(),
    }
}

/// Block-character sparkline for a trend series.
pub fn sparkline(points: &[f64]) -> String {
    const BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
    if points.is_empty() {
        return UNAVAILABLE.to_string();
    }
    let min = points.iter().copied().fold(f64::INFINITY, f64::min);
    let max = points.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;
    points
        .iter()
        .map(|p| {
            if span == 0.0 {
                BARS[0]
            } else {
                let idx = ((p - min) / span * (BARS.len() - 1) as f64).round() as usize;
                BARS[idx.min(BARS.len() - 1)]
            }
        })
        .collect()
}

/// A fetch result for one panel, stamped with the load that asked for it.
#[derive(Debug, Clone)]
pub struct PanelUpdate {
    pub epoch: u64,
    pub panel: PanelId,
    pub data: Result<Value, String>,
}

/// Everything the dashboard shows. Panels are filled independently as
/// their fetches complete, in any order.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardModel {
    pub epoch: u64,
    pub leads: Panel<StatsPanel>,
    pub quotations: Panel<StatsPanel>,
    pub purchase_orders: Panel<StatsPanel>,
    pub licenses: Panel<LicenseSummary>,
}

impl DashboardModel {
    pub fn new(epoch: u64) -> Self {
        Self {
            epoch,
            leads: Panel::Loading,
            quotations: Panel::Loading,
            purchase_orders: Panel::Loading,
            licenses: Panel::Loading,
        }
    }

    /// Apply one result. Updates from another load are ignored and
    /// reported as `false`.
    pub fn apply(&mut self, update: PanelUpdate) -> bool {
        if update.epoch != self.epoch {
            return false;
        }

        match update.panel {
            PanelId::Leads => self.leads = stats_panel(update.data),
            PanelId::Quotations => self.quotations = stats_panel(update.data),
            PanelId::PurchaseOrders => self.purchase_orders = stats_panel(update.data),
            PanelId::Licenses => {
                self.licenses = match update.data {
                    Ok(v) => LicenseSummary::from_value(&v)
                        .map(Panel::Ready)
                        .unwrap_or_else(|| Panel::Unavailable("malformed payload".to_string())),
                    Err(reason) => Panel::Unavailable(reason),
                }
            }
        }
        true
    }

    /// Stats panels in display order.
    pub fn stats_panels(&self) -> [(PanelId, &Panel<StatsPanel>); 3] {
        [
            (PanelId::Leads, &self.leads),
            (PanelId::Quotations, &self.quotations),
            (PanelId::PurchaseOrders, &self.purchase_orders),
        ]
    }

    /// (panel, reason) for every panel that failed.
    pub fn failures(&self) -> Vec<(PanelId, &str)> {
        let mut out: Vec<(PanelId, &str)> = self
            .stats_panels()
            .into_iter()
            .filter_map(|(id, p)| match p {
                Panel::Unavailable(reason) => Some((id, reason.as_str())),
                _ => None,
            })
            .collect();
        if let Panel::Unavailable(reason) = &self.licenses {
            out.push((PanelId::Licenses, reason.as_str()));
        }
        out
    }
}

fn stats_panel(data: Result<Value, String>) -> Panel<StatsPanel> {
    match data {
        Ok(v) => StatsPanel::from_value(&v)
            .map(Panel::Ready)
            .unwrap_or_else(|| Panel::Unavailable("malformed payload".to_string())),
        Err(reason) => Panel::Unavailable(reason),
    }
}
