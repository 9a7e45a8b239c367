//! Filter, sort and paginate report rows in memory.

use chrono::{NaiveDate, TimeDelta};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use super::row::ReportRow;
use crate::error::{ReportError, Result};

/// Sortable columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKey {
    CustomerName,
    ProductId,
    Description,
    LicenseType,
    ExpiryDate,
    TotalPrice,
    Group,
}

impl ColumnKey {
    pub const ALL: [ColumnKey; 7] = [
        ColumnKey::CustomerName,
        ColumnKey::ProductId,
        ColumnKey::Description,
        ColumnKey::LicenseType,
        ColumnKey::ExpiryDate,
        ColumnKey::TotalPrice,
        ColumnKey::Group,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ColumnKey::CustomerName => "customerName",
            ColumnKey::ProductId => "productId",
            ColumnKey::Description => "description",
            ColumnKey::LicenseType => "licenseType",
            ColumnKey::ExpiryDate => "expiryDate",
            ColumnKey::TotalPrice => "totalPrice",
            ColumnKey::Group => "group",
        }
    }

    fn sort_key(self, row: &ReportRow) -> SortKey {
        match self {
            ColumnKey::ExpiryDate => SortKey::Timestamp(row.expiry_timestamp()),
            ColumnKey::TotalPrice => SortKey::Number(row.total_price),
            ColumnKey::CustomerName => SortKey::text(&row.customer_name),
            ColumnKey::ProductId => SortKey::text(&row.product_id),
            ColumnKey::Description => SortKey::text(&row.description),
            ColumnKey::LicenseType => SortKey::text(&row.license_type),
            ColumnKey::Group => SortKey::text(row.group_display()),
        }
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ColumnKey {
    type Err = String;

    /// Accepts camelCase, snake_case and kebab-case spellings.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let folded: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        ColumnKey::ALL
            .into_iter()
            .find(|c| c.name().to_ascii_lowercase() == folded)
            .or(match folded.as_str() {
                "customer" => Some(ColumnKey::CustomerName),
                "product" => Some(ColumnKey::ProductId),
                "expiry" => Some(ColumnKey::ExpiryDate),
                "price" | "total" => Some(ColumnKey::TotalPrice),
                _ => None,
            })
            .ok_or_else(|| {
                let names: Vec<&str> = ColumnKey::ALL.iter().map(|c| c.name()).collect();
                format!("unknown column '{s}' (expected one of: {})", names.join(", "))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => f.write_str("asc"),
            SortDirection::Desc => f.write_str("desc"),
        }
    }
}

/// Which expiry window to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    #[default]
    All,
    Expired,
    ExpiringSoon,
}

impl FromStr for FilterMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "all" => Ok(FilterMode::All),
            "expired" => Ok(FilterMode::Expired),
            "expiring-soon" | "expiringsoon" | "expiring" => Ok(FilterMode::ExpiringSoon),
            _ => Err(format!(
                "unknown mode '{s}' (expected all, expired or expiring-soon)"
            )),
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterMode::All => f.write_str("all"),
            FilterMode::Expired => f.write_str("expired"),
            FilterMode::ExpiringSoon => f.write_str("expiring-soon"),
        }
    }
}

/// What the user currently has selected in a report view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportQueryState {
    pub search_term: String,
    pub sort_by: ColumnKey,
    pub sort_direction: SortDirection,
    pub page_size: usize,
    pub page: usize,
    pub filter_mode: FilterMode,
}

impl ReportQueryState {
    pub fn new(page_size: usize) -> Self {
        Self {
            search_term: String::new(),
            sort_by: ColumnKey::ExpiryDate,
            sort_direction: SortDirection::Asc,
            page_size,
            page: 1,
            filter_mode: FilterMode::All,
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_page(self.page)?;
        validate_page_size(self.page_size)
    }
}

pub(crate) fn validate_page(page: usize) -> Result<()> {
    if page == 0 {
        return Err(ReportError::validation("page", page, "pages start at 1"));
    }
    Ok(())
}

pub(crate) fn validate_page_size(page_size: usize) -> Result<()> {
    if page_size == 0 {
        return Err(ReportError::validation(
            "page size",
            page_size,
            "must be greater than 0",
        ));
    }
    Ok(())
}

/// One page of results plus the numbers needed to render a pager.
#[derive(Debug, Clone, PartialEq)]
pub struct PaginationResult<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

/// `max(1, ceil(total_items / page_size))`
pub fn total_pages(total_items: usize, page_size: usize) -> usize {
    total_items.div_ceil(page_size.max(1)).max(1)
}

/// Case-insensitive substring search over customer, product, description
/// and license type. A blank term returns every row in order.
pub fn filter_rows<'a>(rows: &'a [ReportRow], term: &str) -> Vec<&'a ReportRow> {
    let term = term.trim();
    if term.is_empty() {
        return rows.iter().collect();
    }
    let needle = term.to_lowercase();
    rows.iter()
        .filter(|row| {
            [
                &row.customer_name,
                &row.product_id,
                &row.description,
                &row.license_type,
            ]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
        })
        .collect()
}

/// Keep rows in the requested expiry window relative to `today`, which
/// must be a UTC date like [`ReportRow::expiry_day`].
/// Rows without an expiry date only survive `FilterMode::All`.
pub fn filter_by_mode<'a>(
    rows: Vec<&'a ReportRow>,
    mode: FilterMode,
    today: NaiveDate,
    expiring_within_days: i64,
) -> Vec<&'a ReportRow> {
    let horizon = match mode {
        FilterMode::All => return rows,
        FilterMode::Expired => today,
        FilterMode::ExpiringSoon => expiry_horizon(today, expiring_within_days),
    };
    rows.into_iter()
        .filter(|row| match (mode, row.expiry_day()) {
            (FilterMode::Expired, Some(day)) => day < today,
            (FilterMode::ExpiringSoon, Some(day)) => day >= today && day <= horizon,
            _ => false,
        })
        .collect()
}

/// Last day of the expiring-soon window. Windows past the calendar's
/// range saturate at `NaiveDate::MAX`.
fn expiry_horizon(today: NaiveDate, days: i64) -> NaiveDate {
    TimeDelta::try_days(days.max(0))
        .and_then(|delta| today.checked_add_signed(delta))
        .unwrap_or(NaiveDate::MAX)
}

/// Stable sort by one column. Equal keys keep their input order in both
/// directions.
pub fn sort_rows<'a>(
    rows: &[&'a ReportRow],
    column: ColumnKey,
    direction: SortDirection,
) -> Vec<&'a ReportRow> {
    let mut keyed: Vec<(SortKey, &'a ReportRow)> =
        rows.iter().map(|row| (column.sort_key(row), *row)).collect();
    keyed.sort_by(|(a, _), (b, _)| {
        let ord = a.compare(b);
        match direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
    keyed.into_iter().map(|(_, row)| row).collect()
}

/// Slice out 1-based `page`. Out-of-range pages yield an empty item list;
/// deciding to fall back to page 1 is the caller's job.
pub fn paginate<T: Clone>(rows: &[T], page: usize, page_size: usize) -> PaginationResult<T> {
    let page_size = page_size.max(1);
    let page = page.max(1);
    let total_items = rows.len();
    let start = (page - 1).saturating_mul(page_size).min(total_items);
    let end = start.saturating_add(page_size).min(total_items);

    PaginationResult {
        items: rows[start..end].to_vec(),
        page,
        page_size,
        total_items,
        total_pages: total_pages(total_items, page_size),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum SortKey {
    Timestamp(i64),
    Number(f64),
    Text(String),
}

impl SortKey {
    fn text(s: &str) -> Self {
        SortKey::Text(s.to_lowercase())
    }

    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortKey::Timestamp(a), SortKey::Timestamp(b)) => a.cmp(b),
            (SortKey::Number(a), SortKey::Number(b)) => a.total_cmp(b),
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
            // A column always yields one kind of key.
            _ => Ordering::Equal,
        }
    }
}
