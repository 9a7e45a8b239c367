use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

use super::flatten::{flatten, ReportPayload, Tagging};
use super::row::ReportRow;
use crate::api::ReportSource;
use crate::error::{ReportError, Result};

/// Report endpoints the client knows how to flatten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    LicenseExpiry,
    PurchaseOrders,
}

impl ReportKind {
    pub fn endpoint(self) -> &'static str {
        match self {
            ReportKind::LicenseExpiry => "reports/license-expiry",
            ReportKind::PurchaseOrders => "reports/purchase-orders",
        }
    }

    /// License reports group by expiry bucket (`expired`, `expiringSoon`)
    /// as well as by month; purchase-order reports only by month.
    pub fn tagging(self) -> Tagging {
        match self {
            ReportKind::LicenseExpiry => Tagging::SourceBucket,
            ReportKind::PurchaseOrders => Tagging::GroupKey,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ReportKind::LicenseExpiry => "License Expiry Report",
            ReportKind::PurchaseOrders => "Purchase Order Report",
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            ReportKind::LicenseExpiry => "license-expiry",
            ReportKind::PurchaseOrders => "purchase-orders",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for ReportKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "license-expiry" | "licenses" => Ok(ReportKind::LicenseExpiry),
            "purchase-orders" | "po" => Ok(ReportKind::PurchaseOrders),
            _ => Err(format!(
                "unknown report '{s}' (expected license-expiry or purchase-orders)"
            )),
        }
    }
}

/// Server-side parameters for a report fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportParams {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl ReportParams {
    pub fn validate(&self) -> Result<()> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(ReportError::validation(
                    "date range",
                    format!("{from}..{to}"),
                    "'from' is after 'to'",
                ));
            }
        }
        Ok(())
    }

    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(from) = self.from {
            query.push(("from", from.format("%Y-%m-%d").to_string()));
        }
        if let Some(to) = self.to {
            query.push(("to", to.format("%Y-%m-%d").to_string()));
        }
        query
    }
}

/// Parse a `YYYY-MM-DD` command-line date.
pub fn parse_date_arg(field: &'static str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ReportError::validation(field, value, "expected YYYY-MM-DD"))
}

/// Fetch a report and flatten it. Validation happens before any request
/// is made; unexpected payload shapes produce an empty list.
pub fn load_report(
    source: &dyn ReportSource,
    kind: ReportKind,
    params: &ReportParams,
) -> Result<Vec<ReportRow>> {
    params.validate()?;
    let data = source.fetch_data(kind.endpoint(), &params.to_query())?;
    let rows = flatten(&ReportPayload::from_value(&data), kind.tagging());
    tracing::debug!(report = %kind, rows = rows.len(), "report loaded");
    Ok(rows)
}
