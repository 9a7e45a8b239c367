use clap::{Args, Parser, Subcommand};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tabled::{settings::Style, Table, Tabled};
use tracing_subscriber::EnvFilter;

use crm_report::api::{FileSource, HttpSource, ReportSource};
use crm_report::config::{
    config_dir, init_config_dir, load_config, resolve_output_dir, Action, Config, PermissionSet,
};
use crm_report::dashboard::{
    format_growth, load_dashboard, sparkline, EpochCounter, PanelId, UNAVAILABLE,
};
use crm_report::error::Result;
use crm_report::export::{export_to_csv, ExportFormat, ExportScope};
use crm_report::pdf::export_to_pdf;
use crm_report::report::debounce::Debouncer;
use crm_report::report::{
    load_report, parse_date_arg, ColumnKey, FilterMode, ReportKind, ReportParams,
    ReportQueryState, ReportRow, ReportView, SortDirection,
};

#[derive(Parser)]
#[command(name = "crm-report")]
#[command(version, about = "Report and dashboard client for the CRM backend", long_about = None)]
struct Cli {
    /// Path to config directory (default: XDG config dir or ~/.crm-report)
    #[arg(short = 'C', long, global = true)]
    config_dir: Option<PathBuf>,

    /// Read JSON envelopes from this directory instead of calling the API
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// More log output (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct QueryArgs {
    /// Case-insensitive search over customer, product, description and license type
    #[arg(short, long)]
    search: Option<String>,

    /// Column to sort by (customerName, productId, description, licenseType, expiryDate, totalPrice, group)
    #[arg(long, value_name = "COLUMN")]
    sort_by: Option<ColumnKey>,

    /// Sort descending
    #[arg(long)]
    desc: bool,

    /// Page to show (1-based)
    #[arg(short, long, default_value_t = 1)]
    page: usize,

    /// Rows per page (default: from config)
    #[arg(long)]
    page_size: Option<usize>,

    /// Expiry window: all, expired, expiring-soon
    #[arg(long, default_value = "all")]
    mode: FilterMode,

    /// Only fetch entries from this date (YYYY-MM-DD)
    #[arg(long)]
    from: Option<String>,

    /// Only fetch entries up to this date (YYYY-MM-DD)
    #[arg(long)]
    to: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config directory with a template config.toml
    Init,

    /// Show one page of a report
    Report {
        /// license-expiry or purchase-orders
        kind: ReportKind,

        #[command(flatten)]
        query: QueryArgs,
    },

    /// Browse a report interactively, reading commands from stdin
    Browse {
        /// license-expiry or purchase-orders
        kind: ReportKind,

        #[command(flatten)]
        query: QueryArgs,
    },

    /// Export a report to CSV or PDF
    Export {
        /// license-expiry or purchase-orders
        kind: ReportKind,

        /// csv or pdf
        #[arg(short, long, default_value = "csv")]
        format: ExportFormat,

        /// Output file (default: output_dir/<report>-<date>.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Export every matching row (all) or only the selected page (page)
        #[arg(long, default_value = "all")]
        scope: ExportScope,

        #[command(flatten)]
        query: QueryArgs,
    },

    /// Show lead, quotation, purchase-order and license stats
    Dashboard,

    /// Show the permissions granted by config
    Permissions,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    // Determine config directory
    let cfg_dir = match cli.config_dir {
        Some(p) => p,
        None => config_dir()?,
    };

    let data_dir = cli.data_dir;
    match cli.command {
        Commands::Init => cmd_init(&cfg_dir),
        Commands::Report { kind, query } => {
            cmd_report(&Session::open(cfg_dir, data_dir)?, kind, &query)
        }
        Commands::Browse { kind, query } => {
            cmd_browse(&Session::open(cfg_dir, data_dir)?, kind, &query)
        }
        Commands::Export {
            kind,
            format,
            output,
            scope,
            query,
        } => cmd_export(
            &Session::open(cfg_dir, data_dir)?,
            kind,
            format,
            output,
            scope,
            &query,
        ),
        Commands::Dashboard => cmd_dashboard(&Session::open(cfg_dir, data_dir)?),
        Commands::Permissions => cmd_permissions(&Session::open(cfg_dir, data_dir)?),
    }
}

/// Config, permissions and backend, loaded once per invocation.
struct Session {
    cfg_dir: PathBuf,
    config: Config,
    permissions: PermissionSet,
    source: Box<dyn ReportSource>,
}

impl Session {
    fn open(cfg_dir: PathBuf, data_dir: Option<PathBuf>) -> Result<Self> {
        let config = load_config(&cfg_dir)?;
        let permissions = PermissionSet::from_config(config.permissions.as_ref());
        let source: Box<dyn ReportSource> = match data_dir {
            Some(dir) => Box::new(FileSource::new(dir)),
            None => Box::new(HttpSource::new(&config.api)),
        };
        Ok(Self {
            cfg_dir,
            config,
            permissions,
            source,
        })
    }

    /// Validate the query, fetch the report and build the view. The bool is
    /// true when the requested page was out of range and the view fell back
    /// to page 1.
    fn open_view(&self, kind: ReportKind, args: &QueryArgs) -> Result<(ReportView, bool)> {
        self.permissions.require("reports", Action::Read)?;

        let params = ReportParams {
            from: args
                .from
                .as_deref()
                .map(|s| parse_date_arg("--from date", s))
                .transpose()?,
            to: args
                .to
                .as_deref()
                .map(|s| parse_date_arg("--to date", s))
                .transpose()?,
        };
        params.validate()?;

        let mut query = ReportQueryState::new(
            args.page_size.unwrap_or(self.config.report.page_size),
        );
        query.search_term = args.search.clone().unwrap_or_default();
        query.sort_by = args.sort_by.unwrap_or(ColumnKey::ExpiryDate);
        query.sort_direction = if args.desc {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        };
        query.filter_mode = args.mode;
        query.page = args.page;
        query.validate()?;

        let requested_page = query.page;
        query.page = 1;

        let rows = load_report(self.source.as_ref(), kind, &params)?;
        // Expiry days are UTC dates; compare against the UTC day.
        let today = chrono::Utc::now().date_naive();
        let mut view = ReportView::new(
            rows,
            query,
            today,
            self.config.report.expiring_within_days,
        )?;
        let reset = view.set_page(requested_page)?;
        Ok((view, reset))
    }
}

/// Initialize config directory with template files
fn cmd_init(cfg_dir: &Path) -> Result<()> {
    init_config_dir(cfg_dir)?;

    println!("Initialized crm-report config at: {}", cfg_dir.display());
    println!();
    println!("Next steps:");
    println!(
        "  1. Point it at your backend:  $EDITOR {}/config.toml",
        cfg_dir.display()
    );
    println!("  2. Try a report:              crm-report report license-expiry");

    Ok(())
}

// Table row structs for tabled
#[derive(Tabled)]
struct ReportTableRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "CUSTOMER")]
    customer: String,
    #[tabled(rename = "PRODUCT")]
    product: String,
    #[tabled(rename = "DESCRIPTION")]
    description: String,
    #[tabled(rename = "LICENSE")]
    license: String,
    #[tabled(rename = "EXPIRY")]
    expiry: String,
    #[tabled(rename = "TOTAL")]
    total: String,
    #[tabled(rename = "GROUP")]
    group: String,
}

#[derive(Tabled)]
struct StatsRow {
    #[tabled(rename = "PANEL")]
    panel: String,
    #[tabled(rename = "TOTAL")]
    total: String,
    #[tabled(rename = "THIS MONTH")]
    current: String,
    #[tabled(rename = "LAST MONTH")]
    previous: String,
    #[tabled(rename = "GROWTH")]
    growth: String,
    #[tabled(rename = "TREND")]
    trend: String,
}

#[derive(Tabled)]
struct LicenseRow {
    #[tabled(rename = "EXPIRED")]
    expired: String,
    #[tabled(rename = "EXPIRING SOON")]
    expiring_soon: String,
    #[tabled(rename = "ACTIVE")]
    active: String,
}

#[derive(Tabled)]
struct PermissionRow {
    #[tabled(rename = "MODULE")]
    module: String,
    #[tabled(rename = "ACTIONS")]
    actions: String,
}

fn format_grouped_int(value: i64) -> String {
    let grouped = group_digits(&value.unsigned_abs().to_string());
    if value < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Insert thousands separators into a string of ASCII digits.
fn group_digits(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Format a money amount with two decimal places and thousands separators
fn format_amount(value: f64) -> String {
    if !value.is_finite() {
        return UNAVAILABLE.to_string();
    }
    let rounded = format!("{:.2}", value.abs());
    let (whole, frac) = rounded.split_once('.').unwrap_or((rounded.as_str(), "00"));
    let grouped = group_digits(whole);

    if value < 0.0 && rounded != "0.00" {
        format!("-{}.{}", grouped, frac)
    } else {
        format!("{}.{}", grouped, frac)
    }
}

fn format_count(value: f64) -> String {
    if !value.is_finite() {
        return UNAVAILABLE.to_string();
    }
    let rounded = format!("{:.0}", value.abs().round());
    if value < 0.0 && rounded != "0" {
        format!("-{}", group_digits(&rounded))
    } else {
        group_digits(&rounded)
    }
}

/// Render the view's current page as a table with a pager line.
fn render_page(view: &ReportView) -> String {
    let page = view.current_page();
    let mut out = String::new();

    if page.items.is_empty() {
        out.push_str("No rows match.\n");
    } else {
        let offset = (page.page - 1) * page.page_size;
        let rows: Vec<ReportTableRow> = page
            .items
            .iter()
            .enumerate()
            .map(|(i, row)| table_row(offset + i + 1, row))
            .collect();
        out.push_str(&Table::new(rows).with(Style::rounded()).to_string());
        out.push('\n');
    }

    let query = view.query();
    out.push_str(&format!(
        "Page {} of {} ({} items) | sort: {} {} | mode: {}",
        page.page,
        page.total_pages,
        page.total_items,
        query.sort_by,
        query.sort_direction,
        query.filter_mode
    ));
    if !query.search_term.trim().is_empty() {
        out.push_str(&format!(" | search: \"{}\"", query.search_term.trim()));
    }
    out
}

fn table_row(index: usize, row: &ReportRow) -> ReportTableRow {
    ReportTableRow {
        index,
        customer: row.customer_name.clone(),
        product: row.product_id.clone(),
        description: row.description.clone(),
        license: row.license_type.clone(),
        expiry: row
            .expiry_day()
            .map(|d| d.to_string())
            .unwrap_or_else(|| UNAVAILABLE.to_string()),
        total: format_amount(row.total_price),
        group: row.group_display().to_string(),
    }
}

/// Show one page of a report
fn cmd_report(session: &Session, kind: ReportKind, args: &QueryArgs) -> Result<()> {
    let (view, reset) = session.open_view(kind, args)?;

    println!("{}", kind.title());
    if reset {
        println!(
            "Page {} is out of range; showing page 1.",
            args.page
        );
    }
    println!("{}", render_page(&view));

    Ok(())
}

/// Browse a report with line commands from stdin.
///
/// Search commands are debounced: a burst of `search` lines only applies
/// the last one.
fn cmd_browse(session: &Session, kind: ReportKind, args: &QueryArgs) -> Result<()> {
    let (mut view, _) = session.open_view(kind, args)?;
    let delay = Duration::from_millis(session.config.report.search_debounce_ms);
    let mut pending_search: Debouncer<String> = Debouncer::new(delay);
    let start = Instant::now();

    println!("{}", kind.title());
    println!("{}", render_page(&view));
    println!("Commands: search <text>, sort <column>, next, prev, page <n>, size <n>, mode <mode>, quit");

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let now = start.elapsed();
        let (cmd, arg) = line.split_once(' ').unwrap_or((line, ""));
        let arg = arg.trim();

        if cmd == "search" {
            if let Some(term) = pending_search.push(now, arg.to_string()) {
                apply_search(&mut view, &term);
            }
            continue;
        }

        // Any other command settles the pending search first.
        if let Some(term) = pending_search.flush() {
            apply_search(&mut view, &term);
        }

        let changed = match cmd {
            "quit" | "q" | "exit" => break,
            "next" | "n" => view.next_page(),
            "prev" | "p" => view.prev_page(),
            "show" => true,
            "sort" => match arg.parse::<ColumnKey>() {
                Ok(column) => {
                    view.toggle_sort(column);
                    true
                }
                Err(e) => report_command_error(&e),
            },
            "page" => match arg.parse::<usize>().map_err(|e| e.to_string()) {
                Ok(page) => match view.set_page(page) {
                    Ok(reset) => {
                        if reset {
                            println!("Page {page} is out of range; showing page 1.");
                        }
                        true
                    }
                    Err(e) => report_command_error(&e.to_string()),
                },
                Err(e) => report_command_error(&e),
            },
            "size" => match arg.parse::<usize>().map_err(|e| e.to_string()) {
                Ok(size) => match view.set_page_size(size) {
                    Ok(_) => true,
                    Err(e) => report_command_error(&e.to_string()),
                },
                Err(e) => report_command_error(&e),
            },
            "mode" => match arg.parse::<FilterMode>() {
                Ok(mode) => {
                    view.set_filter_mode(mode);
                    true
                }
                Err(e) => report_command_error(&e),
            },
            other => report_command_error(&format!("unknown command '{other}'")),
        };

        if changed {
            println!("{}", render_page(&view));
        }
    }

    if let Some(term) = pending_search.flush() {
        apply_search(&mut view, &term);
    }

    Ok(())
}

fn apply_search(view: &mut ReportView, term: &str) {
    view.set_search(term);
    println!(
        "Applied search \"{}\" ({} matches)",
        term,
        view.matching_rows().len()
    );
    println!("{}", render_page(view));
}

fn report_command_error(message: &str) -> bool {
    eprintln!("error: {message}");
    false
}

/// Export a report to CSV or PDF
fn cmd_export(
    session: &Session,
    kind: ReportKind,
    format: ExportFormat,
    output: Option<PathBuf>,
    scope: ExportScope,
    args: &QueryArgs,
) -> Result<()> {
    session.permissions.require("reports", Action::Export)?;

    let (view, reset) = session.open_view(kind, args)?;
    if reset && scope == ExportScope::Page {
        println!("Page {} is out of range; exporting page 1.", args.page);
    }

    let rows: Vec<&ReportRow> = match scope {
        ExportScope::All => view.matching_rows(),
        ExportScope::Page => view.current_page().items,
    };

    let path = match output {
        Some(p) => p,
        None => {
            let output_dir =
                resolve_output_dir(&session.config.export.output_dir, &session.cfg_dir);
            let today = chrono::Local::now().format("%Y-%m-%d");
            output_dir.join(format!("{}-{}.{}", kind.slug(), today, format.extension()))
        }
    };

    let written = match format {
        ExportFormat::Csv => export_to_csv(&rows, &path)?,
        ExportFormat::Pdf => export_to_pdf(kind.title(), &rows, &path)?,
    };

    println!("Exported {} rows", rows.len());
    println!("  Saved: {}", written.display());

    Ok(())
}

/// Show the combined dashboard
fn cmd_dashboard(session: &Session) -> Result<()> {
    session.permissions.require("dashboard", Action::Read)?;

    let model = load_dashboard(session.source.as_ref(), &EpochCounter::new());

    let rows: Vec<StatsRow> = model
        .stats_panels()
        .into_iter()
        .map(|(id, panel)| StatsRow {
            panel: id.label().to_string(),
            total: panel.show(|s| format_count(s.total)),
            current: panel.show(|s| format_count(s.current_month)),
            previous: panel.show(|s| format_count(s.previous_month)),
            growth: panel.show(|s| format_growth(s.growth())),
            trend: panel.show(|s| sparkline(&s.trend)),
        })
        .collect();

    println!("Dashboard");
    println!("{}", Table::new(rows).with(Style::rounded()).to_string());

    let licenses = LicenseRow {
        expired: model.licenses.show(|l| format_grouped_int(l.expired as i64)),
        expiring_soon: model
            .licenses
            .show(|l| format_grouped_int(l.expiring_soon as i64)),
        active: model.licenses.show(|l| format_grouped_int(l.active as i64)),
    };
    println!();
    println!("{}", PanelId::Licenses.label());
    println!("{}", Table::new([licenses]).with(Style::rounded()).to_string());

    for (panel, reason) in model.failures() {
        eprintln!("warning: {panel} unavailable: {reason}");
    }

    Ok(())
}

/// Show the effective permission set
fn cmd_permissions(session: &Session) -> Result<()> {
    let entries = session.permissions.entries();
    if matches!(session.permissions, PermissionSet::Unrestricted) {
        println!("Unrestricted (no [permissions] table in config.toml)");
        return Ok(());
    }
    if entries.is_empty() {
        println!("No permissions granted.");
        return Ok(());
    }

    let rows: Vec<PermissionRow> = entries
        .into_iter()
        .map(|(module, actions)| PermissionRow { module, actions })
        .collect();
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0.0), "0.00");
        assert_eq!(format_amount(1234567.891), "1,234,567.89");
        assert_eq!(format_amount(-1500.5), "-1,500.50");
        assert_eq!(format_amount(-0.001), "0.00");
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(1520.0), "1,520");
        assert_eq!(format_count(-1234.6), "-1,235");
        assert_eq!(format_count(-0.2), "0");
        assert_eq!(format_count(1e19), "10,000,000,000,000,000,000");
    }

    #[test]
    fn test_format_amount_beyond_i64() {
        assert_eq!(format_amount(1e19), "10,000,000,000,000,000,000.00");
        assert_eq!(format_amount(-2e20), "-200,000,000,000,000,000,000.00");
        assert_eq!(format_amount(f64::NAN), "--");
    }

    #[test]
    fn test_format_grouped_int() {
        assert_eq!(format_grouped_int(999), "999");
        assert_eq!(format_grouped_int(1000), "1,000");
        assert_eq!(format_grouped_int(-25000), "-25,000");
        assert_eq!(format_grouped_int(i64::MIN), "-9,223,372,036,854,775,808");
        assert_eq!(group_digits("100000"), "100,000");
    }
}
