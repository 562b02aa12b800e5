use clap::ValueEnum;

use crate::models::{Report, SubmissionStatus, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum StatusFilter {
    #[default]
    All,
    Submitted,
    NotSubmitted,
}

impl StatusFilter {
    fn accepts(&self, status: &SubmissionStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Submitted => status.has_submitted,
            StatusFilter::NotSubmitted => !status.has_submitted,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReportRow<'a> {
    pub report: &'a Report,
    pub intern: Option<&'a User>,
}

pub fn join_interns<'a>(reports: &'a [Report], users: &'a [User]) -> Vec<ReportRow<'a>> {
    reports
        .iter()
        .map(|report| ReportRow {
            report,
            intern: users.iter().find(|user| user.id == report.intern_id),
        })
        .collect()
}

fn contains_ignore_case(haystack: Option<&str>, needle: &str) -> bool {
    haystack
        .map(|value| value.to_lowercase().contains(needle))
        .unwrap_or(false)
}

/// Matches on intern name (any case) or report date, then narrows by field.
pub fn filter_reports<'a>(
    rows: &[ReportRow<'a>],
    query: Option<&str>,
    field: Option<&str>,
) -> Vec<ReportRow<'a>> {
    let query = query.map(str::trim).filter(|q| !q.is_empty());
    let field = field
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_lowercase);

    rows.iter()
        .filter(|row| match query {
            None => true,
            Some(q) => {
                let needle = q.to_lowercase();
                let date = row.report.report_date;
                contains_ignore_case(row.intern.map(|i| i.name.as_str()), &needle)
                    || date.format("%d/%m/%Y").to_string().contains(q)
                    || date.format("%Y-%m-%d").to_string().contains(q)
            }
        })
        .filter(|row| match &field {
            None => true,
            Some(f) => contains_ignore_case(row.intern.and_then(|i| i.field.as_deref()), f),
        })
        .copied()
        .collect()
}

pub fn filter_status<'a>(
    rows: &'a [SubmissionStatus],
    query: Option<&str>,
    filter: StatusFilter,
) -> Vec<&'a SubmissionStatus> {
    let needle = query
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_lowercase);

    rows.iter()
        .filter(|status| match &needle {
            None => true,
            Some(q) => {
                contains_ignore_case(Some(status.intern.name.as_str()), q)
                    || contains_ignore_case(status.intern.university.as_deref(), q)
                    || contains_ignore_case(status.intern.field.as_deref(), q)
            }
        })
        .filter(|status| filter.accepts(status))
        .collect()
}
