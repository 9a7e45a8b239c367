//! Combines the independent stats endpoints into one view-model.

mod loader;
mod model;

pub use loader::{load_dashboard, EpochCounter};
pub use model::{
    format_growth, growth_percent, sparkline, DashboardModel, LicenseSummary, Panel, PanelId,
    PanelUpdate, StatsPanel, UNAVAILABLE,
};
