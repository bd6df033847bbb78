// =============================================================================
// Report output: CSV sheets + HTML dashboard
// =============================================================================

pub mod dashboard;
pub mod sheets;

use std::path::{Path, PathBuf};

pub use dashboard::write_dashboard;
pub use sheets::{summary_sheet, write_workbook, Sheet};

/// Where one report run writes its files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    /// Directory holding one CSV per sheet.
    pub workbook_dir: PathBuf,
    pub dashboard: PathBuf,
}

impl ReportPaths {
    /// `<out>/<SYM>_<QUOTE>_report_<stamp>/` and
    /// `<out>/<SYM>_<QUOTE>_dashboard_<stamp>.html`.
    pub fn new(out_dir: impl AsRef<Path>, symbol: &str, quote: &str, stamp: &str) -> Self {
        let out_dir = out_dir.as_ref();
        let prefix = format!("{}_{}", symbol.to_uppercase(), quote.to_uppercase());
        Self {
            workbook_dir: out_dir.join(format!("{prefix}_report_{stamp}")),
            dashboard: out_dir.join(format!("{prefix}_dashboard_{stamp}.html")),
        }
    }
}

/// Local wall-clock stamp used in output file names.
pub fn file_stamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}
