use chrono::NaiveDate;

use super::query::{
    filter_by_mode, filter_rows, paginate, sort_rows, total_pages, validate_page,
    validate_page_size, ColumnKey, FilterMode, PaginationResult, ReportQueryState,
};
use super::row::ReportRow;
use crate::error::Result;

/// Rows plus the query applied to them.
///
/// Every mutation re-checks the current page: if the row count shrank
/// below it, the view jumps back to page 1 instead of showing an empty
/// page.
#[derive(Debug, Clone)]
pub struct ReportView {
    rows: Vec<ReportRow>,
    query: ReportQueryState,
    today: NaiveDate,
    expiring_within_days: i64,
}

impl ReportView {
    pub fn new(
        rows: Vec<ReportRow>,
        query: ReportQueryState,
        today: NaiveDate,
        expiring_within_days: i64,
    ) -> Result<Self> {
        query.validate()?;
        let mut view = Self {
            rows,
            query,
            today,
            expiring_within_days,
        };
        view.reconcile_page();
        Ok(view)
    }

    pub fn query(&self) -> &ReportQueryState {
        &self.query
    }

    /// Replace the source rows (e.g. after a re-fetch). Returns true if
    /// the page was reset.
    pub fn set_rows(&mut self, rows: Vec<ReportRow>) -> bool {
        self.rows = rows;
        self.reconcile_page()
    }

    pub fn set_search(&mut self, term: &str) -> bool {
        self.query.search_term = term.to_string();
        self.reconcile_page()
    }

    pub fn set_filter_mode(&mut self, mode: FilterMode) -> bool {
        self.query.filter_mode = mode;
        self.reconcile_page()
    }

    pub fn set_page_size(&mut self, page_size: usize) -> Result<bool> {
        validate_page_size(page_size)?;
        self.query.page_size = page_size;
        Ok(self.reconcile_page())
    }

    pub fn set_page(&mut self, page: usize) -> Result<bool> {
        validate_page(page)?;
        self.query.page = page;
        Ok(self.reconcile_page())
    }

    pub fn next_page(&mut self) -> bool {
        if self.query.page < self.total_pages() {
            self.query.page += 1;
            true
        } else {
            false
        }
    }

    pub fn prev_page(&mut self) -> bool {
        if self.query.page > 1 {
            self.query.page -= 1;
            true
        } else {
            false
        }
    }

    /// Same column flips direction; a new column starts ascending.
    pub fn toggle_sort(&mut self, column: ColumnKey) {
        if self.query.sort_by == column {
            self.query.sort_direction = self.query.sort_direction.toggled();
        } else {
            self.query.sort_by = column;
            self.query.sort_direction = Default::default();
        }
    }

    /// Every row passing search and mode, in sort order. This is what
    /// "export all" writes.
    pub fn matching_rows(&self) -> Vec<&ReportRow> {
        let filtered = filter_rows(&self.rows, &self.query.search_term);
        let windowed = filter_by_mode(
            filtered,
            self.query.filter_mode,
            self.today,
            self.expiring_within_days,
        );
        sort_rows(&windowed, self.query.sort_by, self.query.sort_direction)
    }

    pub fn current_page(&self) -> PaginationResult<&ReportRow> {
        paginate(&self.matching_rows(), self.query.page, self.query.page_size)
    }

    pub fn total_pages(&self) -> usize {
        total_pages(self.matching_rows().len(), self.query.page_size)
    }

    fn reconcile_page(&mut self) -> bool {
        if self.query.page > self.total_pages() {
            tracing::debug!(
                requested = self.query.page,
                total_pages = self.total_pages(),
                "page out of range, resetting to 1"
            );
            self.query.page = 1;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::query::SortDirection;
    use serde_json::json;

    fn rows(n: usize) -> Vec<ReportRow> {
        (0..n)
            .map(|i| {
                let name = if i % 2 == 0 { format!("even {i}") } else { format!("odd {i}") };
                ReportRow::from_value(&json!({"customerName": name, "totalPrice": i}), None)
            })
            .collect()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
    }

    fn view(n: usize, page: usize) -> ReportView {
        let mut query = ReportQueryState::new(10);
        query.page = page;
        ReportView::new(rows(n), query, today(), 30).unwrap()
    }

    #[test]
    fn test_out_of_range_page_resets_on_creation() {
        let v = view(23, 4);
        assert_eq!(v.query().page, 1);
        assert_eq!(v.current_page().items.len(), 10);
    }

    #[test]
    fn test_last_page_is_partial() {
        let v = view(23, 3);
        let page = v.current_page();
        assert_eq!(page.page, 3);
        assert_eq!(page.items.len(), 3);
        assert_eq!(page.total_pages, 3);
    }

    #[test]
    fn test_search_shrink_resets_page() {
        let mut v = view(23, 3);
        // "odd" leaves 11 rows = 2 pages
        assert!(v.set_search("odd"));
        assert_eq!(v.query().page, 1);
        assert!(!v.set_search(""));
    }

    #[test]
    fn test_set_page_validates_and_resets() {
        let mut v = view(23, 1);
        assert!(v.set_page(0).is_err());
        assert!(!v.set_page(2).unwrap());
        assert!(v.set_page(9).unwrap());
        assert_eq!(v.query().page, 1);
        assert!(v.set_page_size(0).is_err());
    }

    #[test]
    fn test_next_prev_stop_at_edges() {
        let mut v = view(15, 1);
        assert!(!v.prev_page());
        assert!(v.next_page());
        assert!(!v.next_page());
        assert_eq!(v.query().page, 2);
    }

    #[test]
    fn test_toggle_sort_cycle() {
        let mut v = view(3, 1);
        v.toggle_sort(ColumnKey::TotalPrice);
        assert_eq!(v.query().sort_direction, SortDirection::Asc);
        v.toggle_sort(ColumnKey::TotalPrice);
        assert_eq!(v.query().sort_direction, SortDirection::Desc);
        assert_eq!(v.matching_rows()[0].customer_name, "even 2");
        v.toggle_sort(ColumnKey::TotalPrice);
        assert_eq!(v.query().sort_direction, SortDirection::Asc);
        v.toggle_sort(ColumnKey::CustomerName);
        assert_eq!(v.query().sort_by, ColumnKey::CustomerName);
        assert_eq!(v.query().sort_direction, SortDirection::Asc);
    }

    #[test]
    fn test_set_rows_after_refetch() {
        let mut v = view(30, 3);
        assert!(v.set_rows(rows(5)));
        assert_eq!(v.current_page().total_items, 5);
    }
}
