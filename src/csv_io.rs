use std::io::{Read, Write};

use chrono::{FixedOffset, NaiveDate};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use crate::filters::ReportRow;
use crate::models::{parse_instant, Report, ReportContent, SubmissionStatus};
use crate::store::{display_timestamp, list_interns, ReportStore};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: usize,
    pub skipped: usize,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    intern_email: String,
    report_date: NaiveDate,
    content_kind: Option<String>,
    urls: String,
    created_at: String,
    id: Option<String>,
}

fn split_urls(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ';' || c.is_whitespace())
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .collect()
}

/// Appends reports from CSV. Rows naming an unknown intern or carrying an
/// unreadable `created_at` are skipped and counted.
pub async fn import_reports<R: Read>(
    store: &dyn ReportStore,
    input: R,
    offset: FixedOffset,
) -> anyhow::Result<ImportSummary> {
    let interns = list_interns(store).await?;
    let mut reader = csv::Reader::from_reader(input);
    let mut summary = ImportSummary::default();

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = match result {
            Ok(row) => row,
            Err(err) => {
                warn!(line = line + 2, %err, "skipping unreadable csv row");
                summary.skipped += 1;
                continue;
            }
        };

        let Some(intern) = interns
            .iter()
            .find(|intern| intern.email.eq_ignore_ascii_case(row.intern_email.trim()))
        else {
            warn!(line = line + 2, email = %row.intern_email, "no intern with this email");
            summary.skipped += 1;
            continue;
        };

        let Some(created) = parse_instant(&row.created_at) else {
            warn!(line = line + 2, created_at = %row.created_at, "unreadable created_at");
            summary.skipped += 1;
            continue;
        };

        let kind = row.content_kind.as_deref().unwrap_or("links").trim().to_ascii_lowercase();
        let Some(content) = ReportContent::from_parts(&kind, split_urls(&row.urls)) else {
            warn!(line = line + 2, %kind, "unknown content kind");
            summary.skipped += 1;
            continue;
        };
        if content.urls().is_empty() {
            warn!(line = line + 2, "report without links or photos");
            summary.skipped += 1;
            continue;
        }

        let report = Report {
            id: row
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| format!("import-{}", Uuid::new_v4())),
            intern_id: intern.id.clone(),
            timestamp: display_timestamp(created, offset),
            report_date: row.report_date,
            content,
            created_at: created.to_rfc3339(),
        };
        store.add_report(report).await?;
        summary.inserted += 1;
    }

    Ok(summary)
}

pub fn write_reports<W: Write>(rows: &[ReportRow<'_>], output: W) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_writer(output);
    writer.write_record([
        "Timestamp",
        "Nama",
        "Sekolah/Universitas",
        "Penempatan Bidang",
        "Tanggal Report",
        "Jumlah Foto",
    ])?;

    for row in rows {
        let intern = row.intern;
        writer.write_record([
            row.report.timestamp.clone(),
            intern.map(|i| i.name.clone()).unwrap_or_default(),
            intern.and_then(|i| i.university.clone()).unwrap_or_default(),
            intern.and_then(|i| i.field.clone()).unwrap_or_default(),
            row.report.report_date.format("%d/%m/%Y").to_string(),
            row.report.content.urls().len().to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

pub fn write_submission_status<W: Write>(
    rows: &[&SubmissionStatus],
    offset: FixedOffset,
    output: W,
) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_writer(output);
    writer.write_record([
        "Nama",
        "Email",
        "Universitas",
        "Bidang",
        "Status Laporan Hari Ini",
        "Terakhir Submit",
    ])?;

    for status in rows {
        let intern = &status.intern;
        writer.write_record([
            intern.name.clone(),
            intern.email.clone(),
            intern.university.clone().unwrap_or_else(|| "-".to_string()),
            intern.field.clone().unwrap_or_else(|| "-".to_string()),
            if status.has_submitted {
                "Sudah Submit".to_string()
            } else {
                "Belum Submit".to_string()
            },
            status
                .last_submission
                .map(|at| {
                    at.with_timezone(&offset)
                        .format("%d/%m/%Y %H:%M:%S")
                        .to_string()
                })
                .unwrap_or_else(|| "-".to_string()),
        ])?;
    }

    writer.flush()?;
    Ok(())
}
