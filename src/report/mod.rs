pub mod debounce;
pub mod flatten;
mod loader;
pub mod query;
pub(crate) mod row;
mod view;

pub use flatten::{flatten, flatten_value, GroupEntry, ReportPayload, Tagging};
pub use loader::{load_report, parse_date_arg, ReportKind, ReportParams};
pub use query::{
    filter_by_mode, filter_rows, paginate, sort_rows, ColumnKey, FilterMode, PaginationResult,
    ReportQueryState, SortDirection,
};
pub use row::{GroupTag, ReportRow};
pub use view::ReportView;
