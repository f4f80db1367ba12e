//! Plain-text rendering of the live test report.
//!
//! Three columns, split 32% / 15% / 53% of the table width:
//!
//! ```text
//! Test Case                  Status      Description
//! ──────────────────────────────────────────────────────────
//! loginTest                  PASS        ok
//! uploadTest                 FAIL        timeout
//! ```

use smartcode_stream::{LogSummary, StreamStats, TestEvent};

pub const DEFAULT_WIDTH: usize = 100;
const MIN_WIDTH: usize = 40;

pub struct ReportTable {
    case_width: usize,
    status_width: usize,
    message_width: usize,
}

impl ReportTable {
    pub fn new(width: usize) -> Self {
        let width = width.max(MIN_WIDTH);
        let case_width = width * 32 / 100;
        let status_width = width * 15 / 100;
        Self {
            case_width,
            status_width,
            message_width: width - case_width - status_width,
        }
    }

    pub fn width(&self) -> usize {
        self.case_width + self.status_width + self.message_width
    }

    pub fn header(&self) -> String {
        format!(
            "{}{}{}\n{}",
            pad("Test Case", self.case_width),
            pad("Status", self.status_width),
            fit("Description", self.message_width),
            "─".repeat(self.width())
        )
    }

    pub fn row(&self, event: &TestEvent) -> String {
        format!(
            "{}{}{}",
            pad(&event.test_name, self.case_width),
            pad(event.status.as_str(), self.status_width),
            fit(&event.message, self.message_width)
        )
        .trim_end()
        .to_string()
    }
}

impl Default for ReportTable {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH)
    }
}

/// `text` cut to `width` characters, with an ellipsis when cut.
fn fit(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut out: String = text.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// Fitted into `width - 1` and padded so one space always separates columns.
fn pad(text: &str, width: usize) -> String {
    let cell = fit(text, width.saturating_sub(1));
    let fill = width - cell.chars().count();
    format!("{cell}{}", " ".repeat(fill))
}

pub fn summary_line(summary: LogSummary, stats: StreamStats) -> String {
    let mut line = format!(
        "{} tests: {} passed, {} failed",
        summary.total, summary.passed, summary.failed
    );
    if stats.frames_dropped > 0 {
        line.push_str(&format!(" ({} malformed frames dropped)", stats.frames_dropped));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_split() {
        let table = ReportTable::new(100);
        assert_eq!(table.case_width, 32);
        assert_eq!(table.status_width, 15);
        assert_eq!(table.message_width, 53);
        assert_eq!(table.width(), 100);
    }

    #[test]
    fn test_narrow_width_clamped() {
        assert_eq!(ReportTable::new(10).width(), MIN_WIDTH);
    }

    #[test]
    fn test_row_layout() {
        let table = ReportTable::new(100);
        let row = table.row(&TestEvent::fail("uploadTest", "timeout"));
        assert!(row.starts_with("uploadTest "));
        assert_eq!(row.find("FAIL"), Some(32));
        assert_eq!(row.find("timeout"), Some(47));
    }

    #[test]
    fn test_long_name_truncated() {
        let table = ReportTable::new(100);
        let name = "a".repeat(80);
        let row = table.row(&TestEvent::pass(name, ""));
        assert_eq!(row.chars().position(|c| c == '…'), Some(30));
        assert_eq!(row.chars().nth(32), Some('P'));
    }

    #[test]
    fn test_header_has_rule() {
        let header = ReportTable::new(60).header();
        let mut lines = header.lines();
        assert!(lines.next().unwrap().starts_with("Test Case"));
        assert_eq!(lines.next().unwrap().chars().count(), 60);
    }

    #[test]
    fn test_summary_line() {
        let summary = LogSummary { total: 3, passed: 2, failed: 1 };
        assert_eq!(
            summary_line(summary, StreamStats::default()),
            "3 tests: 2 passed, 1 failed"
        );
        let stats = StreamStats {
            frames_dropped: 2,
            ..StreamStats::default()
        };
        assert!(summary_line(summary, stats).ends_with("(2 malformed frames dropped)"));
    }
}
