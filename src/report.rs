use std::fmt::Write;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

use crate::filters::ReportRow;
use crate::models::{DashboardSummary, FieldReportCount, InternWithStats, SubmissionStatus};

pub struct DashboardInput<'a> {
    pub today: NaiveDate,
    pub offset: FixedOffset,
    pub summary: &'a DashboardSummary,
    pub interns: &'a [InternWithStats],
    pub by_field: &'a [FieldReportCount],
    pub statuses: &'a [SubmissionStatus],
    pub recent: &'a [ReportRow<'a>],
}

fn local(at: Option<DateTime<Utc>>, offset: FixedOffset) -> String {
    at.map(|at| at.with_timezone(&offset).format("%d/%m/%Y %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub fn build_report(input: &DashboardInput<'_>) -> String {
    let mut output = String::new();
    let summary = input.summary;

    let _ = writeln!(output, "# Magang Insight Hub");
    let _ = writeln!(output, "Dashboard for {}", input.today.format("%d/%m/%Y"));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Summary");
    let _ = writeln!(output, "- Interns: {}", summary.total_interns);
    let _ = writeln!(output, "- Reports: {}", summary.total_reports);
    let _ = writeln!(
        output,
        "- Reports in the last 7 days: {}",
        summary.reports_this_week
    );
    let _ = writeln!(
        output,
        "- Active interns: {} ({:.0}%)",
        summary.active_interns, summary.submission_rate
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Reports by Field");
    if input.by_field.is_empty() {
        let _ = writeln!(output, "No interns registered.");
    } else {
        for entry in input.by_field {
            let _ = writeln!(output, "- {}: {} reports", entry.field, entry.report_count);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Interns");
    if input.interns.is_empty() {
        let _ = writeln!(output, "No interns registered.");
    } else {
        for entry in input.interns {
            let _ = writeln!(
                output,
                "- {} ({}): {} reports, {} this week, last {}, rate {:.0}%",
                entry.intern.name,
                entry.intern.email,
                entry.stats.total_reports,
                entry.stats.submitted_this_week,
                local(entry.stats.last_submission, input.offset),
                entry.stats.submission_rate
            );
        }
    }

    let submitted = input.statuses.iter().filter(|s| s.has_submitted).count();
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "## Submitted Today ({}/{})",
        submitted,
        input.statuses.len()
    );
    for status in input.statuses {
        let mark = if status.has_submitted { "x" } else { " " };
        let _ = writeln!(
            output,
            "- [{}] {} (last {})",
            mark,
            status.intern.name,
            local(status.last_submission, input.offset)
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Reports");
    if input.recent.is_empty() {
        let _ = writeln!(output, "No reports submitted yet.");
    } else {
        for row in input.recent {
            let name = row.intern.map(|i| i.name.as_str()).unwrap_or("unknown intern");
            let _ = writeln!(
                output,
                "- {} on {}: {} {}",
                name,
                row.report.timestamp,
                row.report.content.urls().len(),
                row.report.content.kind()
            );
        }
    }

    output
}
