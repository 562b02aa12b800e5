use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use clap::ValueEnum;
use tracing::warn;

use crate::models::{
    DashboardSummary, FieldReportCount, InternStats, InternWithStats, Report, SubmissionStatus,
    User,
};

pub const TRAILING_WINDOW_DAYS: i64 = 7;
pub const UNKNOWN_FIELD: &str = "Unknown";

/// How an intern's submission rate is derived from their report count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SubmissionRatePolicy {
    /// 100 once the intern has filed anything, 0 otherwise.
    Binary,
    /// Reports per whole day since the intern joined, capped at 100.
    #[default]
    #[value(name = "since-joined", alias = "ratio")]
    SinceJoined,
}

impl SubmissionRatePolicy {
    pub fn parse(value: &str) -> Option<SubmissionRatePolicy> {
        match value.trim().to_ascii_lowercase().as_str() {
            "binary" => Some(SubmissionRatePolicy::Binary),
            "since-joined" | "since_joined" | "ratio" => Some(SubmissionRatePolicy::SinceJoined),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionRatePolicy::Binary => "binary",
            SubmissionRatePolicy::SinceJoined => "since-joined",
        }
    }

    pub fn for_intern(self, intern: &User) -> SubmissionRate {
        match self {
            SubmissionRatePolicy::Binary => SubmissionRate::Binary,
            SubmissionRatePolicy::SinceJoined => SubmissionRate::SinceJoined(intern.created_at),
        }
    }
}

/// A rate policy bound to the inputs it needs for one intern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionRate {
    Binary,
    SinceJoined(DateTime<Utc>),
}

impl SubmissionRate {
    pub fn percentage(&self, total_reports: usize, now: DateTime<Utc>) -> f64 {
        match self {
            SubmissionRate::Binary => {
                if total_reports > 0 {
                    100.0
                } else {
                    0.0
                }
            }
            SubmissionRate::SinceJoined(joined_at) => {
                let days = (now - *joined_at).num_days().max(1);
                (total_reports as f64 / days as f64 * 100.0).min(100.0)
            }
        }
    }
}

pub fn window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::days(TRAILING_WINDOW_DAYS)
}

pub fn in_trailing_window(created: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    created >= window_start(now) && created <= now
}

/// Reports that can be aggregated, paired with their creation instant.
/// Records without an owner or with an unreadable timestamp are logged and skipped.
pub fn valid_reports(reports: &[Report]) -> impl Iterator<Item = (&Report, DateTime<Utc>)> {
    reports.iter().filter_map(|report| match report.checked() {
        Ok((_, created)) => Some((report, created)),
        Err(err) => {
            warn!(report_id = %report.id, %err, "skipping malformed report");
            None
        }
    })
}

/// Summary for one intern. An unknown id yields zero counts and no last submission.
///
/// `last_submission` is the greatest creation instant; when several reports share
/// it, which one supplied the value is unspecified.
pub fn compute_intern_stats(
    intern_id: &str,
    reports: &[Report],
    now: DateTime<Utc>,
    rate: SubmissionRate,
) -> InternStats {
    let mut total_reports = 0usize;
    let mut submitted_this_week = 0usize;
    let mut last_submission: Option<DateTime<Utc>> = None;

    for (report, created) in valid_reports(reports) {
        if report.intern_id != intern_id {
            continue;
        }

        total_reports += 1;
        if in_trailing_window(created, now) {
            submitted_this_week += 1;
        }
        if last_submission.map_or(true, |current| created > current) {
            last_submission = Some(created);
        }
    }

    InternStats {
        total_reports,
        submitted_this_week,
        last_submission,
        submission_rate: rate.percentage(total_reports, now),
    }
}

pub fn compute_all_intern_stats(
    users: &[User],
    reports: &[Report],
    now: DateTime<Utc>,
    policy: SubmissionRatePolicy,
) -> Vec<InternWithStats> {
    users
        .iter()
        .filter(|user| user.is_intern())
        .map(|intern| InternWithStats {
            stats: compute_intern_stats(&intern.id, reports, now, policy.for_intern(intern)),
            intern: intern.clone(),
        })
        .collect()
}

pub fn calendar_date(instant: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    instant.with_timezone(&offset).date_naive()
}

/// Whether each intern's latest report falls on `today`, in input order.
/// Report instants are read as calendar dates at `offset`.
pub fn compute_submission_status_for_all(
    users: &[User],
    reports: &[Report],
    today: NaiveDate,
    offset: FixedOffset,
) -> Vec<SubmissionStatus> {
    let mut latest: HashMap<&str, DateTime<Utc>> = HashMap::new();
    for (report, created) in valid_reports(reports) {
        let entry = latest.entry(report.intern_id.as_str()).or_insert(created);
        if created > *entry {
            *entry = created;
        }
    }

    users
        .iter()
        .filter(|user| user.is_intern())
        .map(|intern| {
            let last_submission = latest.get(intern.id.as_str()).copied();
            let has_submitted = last_submission
                .map(|created| calendar_date(created, offset) == today)
                .unwrap_or(false);
            SubmissionStatus {
                intern: intern.clone(),
                has_submitted,
                last_submission,
            }
        })
        .collect()
}

pub fn field_label(user: &User) -> &str {
    user.field
        .as_deref()
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .unwrap_or(UNKNOWN_FIELD)
}

/// Report totals per field, in the order fields are first seen.
pub fn compute_field_report_distribution(interns: &[InternWithStats]) -> Vec<FieldReportCount> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<FieldReportCount> = Vec::new();

    for entry in interns {
        let field = field_label(&entry.intern);
        match positions.get(field) {
            Some(&index) => counts[index].report_count += entry.stats.total_reports,
            None => {
                positions.insert(field, counts.len());
                counts.push(FieldReportCount {
                    field: field.to_string(),
                    report_count: entry.stats.total_reports,
                });
            }
        }
    }

    counts
}

pub fn compute_dashboard_summary(
    users: &[User],
    reports: &[Report],
    now: DateTime<Utc>,
) -> DashboardSummary {
    let intern_ids: HashSet<&str> = users
        .iter()
        .filter(|user| user.is_intern())
        .map(|user| user.id.as_str())
        .collect();

    let mut total_reports = 0usize;
    let mut reports_this_week = 0usize;
    let mut active: HashSet<&str> = HashSet::new();

    for (report, created) in valid_reports(reports) {
        total_reports += 1;
        if in_trailing_window(created, now) {
            reports_this_week += 1;
            if intern_ids.contains(report.intern_id.as_str()) {
                active.insert(report.intern_id.as_str());
            }
        }
    }

    let total_interns = intern_ids.len();
    let submission_rate = if total_interns == 0 {
        0.0
    } else {
        active.len() as f64 / total_interns as f64 * 100.0
    };

    DashboardSummary {
        total_interns,
        total_reports,
        active_interns: active.len(),
        reports_this_week,
        submission_rate,
    }
}

/// The `limit` newest aggregatable reports, newest first.
pub fn recent_reports(reports: &[Report], limit: usize) -> Vec<&Report> {
    let mut dated: Vec<(&Report, DateTime<Utc>)> = valid_reports(reports).collect();
    dated.sort_by(|a, b| b.1.cmp(&a.1));
    dated.into_iter().take(limit).map(|(report, _)| report).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ReportContent, Role};
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn intern(id: &str, field: Option<&str>, created_at: DateTime<Utc>) -> User {
        User {
            id: id.to_string(),
            name: format!("Intern {id}"),
            email: format!("{id}@example.com"),
            role: Role::Intern,
            university: Some("Universitas Negeri Semarang".to_string()),
            field: field.map(str::to_string),
            avatar: None,
            created_at,
        }
    }

    fn report(id: &str, intern_id: &str, created_at: DateTime<Utc>) -> Report {
        Report {
            id: id.to_string(),
            intern_id: intern_id.to_string(),
            timestamp: created_at.format("%d/%m/%Y %H:%M:%S").to_string(),
            report_date: created_at.date_naive(),
            content: ReportContent::Links(vec!["https://drive.google.com/file1".to_string()]),
            created_at: created_at.to_rfc3339(),
        }
    }

    fn scenario() -> (Vec<User>, Vec<Report>) {
        let users = vec![
            intern("A", Some("Bidang 2"), at(2023, 3, 15, 0, 0)),
            intern("B", Some("Bidang 4"), at(2023, 3, 20, 0, 0)),
        ];
        let reports = vec![
            report("r1", "A", at(2023, 6, 1, 9, 0)),
            report("r2", "B", at(2023, 6, 1, 10, 0)),
            report("r3", "A", at(2023, 6, 2, 8, 30)),
        ];
        (users, reports)
    }

    #[test]
    fn empty_reports_yield_zero_stats() {
        let now = at(2023, 6, 2, 12, 0);
        for rate in [SubmissionRate::Binary, SubmissionRate::SinceJoined(at(2023, 1, 1, 0, 0))] {
            let stats = compute_intern_stats("A", &[], now, rate);
            assert_eq!(stats.total_reports, 0);
            assert_eq!(stats.submitted_this_week, 0);
            assert_eq!(stats.last_submission, None);
            assert_eq!(stats.submission_rate, 0.0);
        }
    }

    #[test]
    fn stats_for_known_interns() {
        let (_, reports) = scenario();
        let now = at(2023, 6, 2, 12, 0);

        let a = compute_intern_stats("A", &reports, now, SubmissionRate::Binary);
        assert_eq!(a.total_reports, 2);
        assert_eq!(a.submitted_this_week, 2);
        assert_eq!(a.last_submission, Some(at(2023, 6, 2, 8, 30)));
        assert_eq!(a.submission_rate, 100.0);

        let b = compute_intern_stats("B", &reports, now, SubmissionRate::Binary);
        assert_eq!(b.total_reports, 1);
        assert_eq!(b.submitted_this_week, 1);
        assert_eq!(b.last_submission, Some(at(2023, 6, 1, 10, 0)));
    }

    #[test]
    fn unknown_intern_is_all_zero() {
        let (_, reports) = scenario();
        let stats = compute_intern_stats("nobody", &reports, at(2023, 6, 2, 12, 0), SubmissionRate::Binary);
        assert_eq!(stats.total_reports, 0);
        assert_eq!(stats.last_submission, None);
        assert_eq!(stats.submission_rate, 0.0);
    }

    #[test]
    fn stats_ignore_input_order() {
        let (_, mut reports) = scenario();
        let now = at(2023, 6, 2, 12, 0);
        let rate = SubmissionRate::SinceJoined(at(2023, 3, 15, 0, 0));
        let forward = compute_intern_stats("A", &reports, now, rate);
        reports.reverse();
        let backward = compute_intern_stats("A", &reports, now, rate);
        assert_eq!(forward, backward);
    }

    #[test]
    fn window_includes_both_boundaries() {
        let now = at(2023, 6, 10, 12, 0);
        let reports = vec![
            report("edge-now", "A", now),
            report("edge-start", "A", now - Duration::days(7)),
        ];
        let stats = compute_intern_stats("A", &reports, now, SubmissionRate::Binary);
        assert_eq!(stats.submitted_this_week, 2);
    }

    #[test]
    fn window_excludes_older_and_future_reports() {
        let now = at(2023, 6, 10, 12, 0);
        let reports = vec![
            report("old", "A", now - Duration::days(7) - Duration::seconds(1)),
            report("ancient", "A", at(2023, 1, 1, 0, 0)),
            report("future", "A", now + Duration::seconds(1)),
        ];
        let stats = compute_intern_stats("A", &reports, now, SubmissionRate::Binary);
        assert_eq!(stats.total_reports, 3);
        assert_eq!(stats.submitted_this_week, 0);
    }

    #[test]
    fn since_joined_rate_uses_whole_days() {
        let now = at(2023, 6, 2, 12, 0);
        let joined = at(2023, 3, 15, 0, 0);
        // 79 whole days between 2023-03-15 and 2023-06-02 12:00
        let rate = SubmissionRate::SinceJoined(joined).percentage(2, now);
        assert!((rate - 200.0 / 79.0).abs() < 1e-9);
    }

    #[test]
    fn since_joined_rate_is_capped_and_floored_at_one_day() {
        let now = at(2023, 6, 2, 12, 0);
        let joined_today = at(2023, 6, 2, 8, 0);
        assert_eq!(SubmissionRate::SinceJoined(joined_today).percentage(1, now), 100.0);
        assert_eq!(SubmissionRate::SinceJoined(joined_today).percentage(5, now), 100.0);
        let joined_ten_days_ago = now - Duration::days(10);
        let rate = SubmissionRate::SinceJoined(joined_ten_days_ago).percentage(3, now);
        assert!((rate - 30.0).abs() < 1e-9);
    }

    #[test]
    fn binary_rate_only_checks_presence() {
        let now = at(2023, 6, 2, 12, 0);
        assert_eq!(SubmissionRate::Binary.percentage(0, now), 0.0);
        assert_eq!(SubmissionRate::Binary.percentage(1, now), 100.0);
        assert_eq!(SubmissionRate::Binary.percentage(40, now), 100.0);
    }

    #[test]
    fn policy_parsing_and_binding() {
        assert_eq!(SubmissionRatePolicy::parse("Binary"), Some(SubmissionRatePolicy::Binary));
        assert_eq!(
            SubmissionRatePolicy::parse("since-joined"),
            Some(SubmissionRatePolicy::SinceJoined)
        );
        assert_eq!(SubmissionRatePolicy::parse("weekly"), None);
        assert_eq!(
            <SubmissionRatePolicy as ValueEnum>::from_str("since-joined", false),
            Ok(SubmissionRatePolicy::SinceJoined)
        );
        assert_eq!(
            <SubmissionRatePolicy as ValueEnum>::from_str("binary", false),
            Ok(SubmissionRatePolicy::Binary)
        );

        let user = intern("A", None, at(2023, 3, 15, 0, 0));
        assert_eq!(
            SubmissionRatePolicy::SinceJoined.for_intern(&user),
            SubmissionRate::SinceJoined(at(2023, 3, 15, 0, 0))
        );
        assert_eq!(SubmissionRatePolicy::Binary.for_intern(&user), SubmissionRate::Binary);
    }

    #[test]
    fn malformed_reports_are_skipped() {
        let now = at(2023, 6, 2, 12, 0);
        let mut broken = report("bad-ts", "A", now);
        broken.created_at = "kemarin sore".to_string();
        let mut orphan = report("no-owner", "", now);
        orphan.intern_id = "  ".to_string();
        let reports = vec![broken, orphan, report("good", "A", at(2023, 6, 1, 7, 0))];

        let stats = compute_intern_stats("A", &reports, now, SubmissionRate::Binary);
        assert_eq!(stats.total_reports, 1);
        assert_eq!(stats.last_submission, Some(at(2023, 6, 1, 7, 0)));

        let summary = compute_dashboard_summary(&[intern("A", None, at(2023, 1, 1, 0, 0))], &reports, now);
        assert_eq!(summary.total_reports, 1);
    }

    #[test]
    fn naive_created_at_is_read_as_utc() {
        let mut plain = report("plain", "A", at(2023, 6, 1, 0, 0));
        plain.created_at = "2023-06-01T09:15:00".to_string();
        let stats = compute_intern_stats("A", &[plain], at(2023, 6, 2, 0, 0), SubmissionRate::Binary);
        assert_eq!(stats.last_submission, Some(Utc.with_ymd_and_hms(2023, 6, 1, 9, 15, 0).unwrap()));
    }

    #[test]
    fn submitted_today_at_any_hour() {
        let users = vec![intern("A", None, at(2023, 1, 1, 0, 0))];
        let today = NaiveDate::from_ymd_opt(2023, 6, 2).unwrap();
        let utc = FixedOffset::east_opt(0).unwrap();
        for hour in [0, 12, 23] {
            let reports = vec![report("r", "A", at(2023, 6, 2, hour, 59))];
            let status = compute_submission_status_for_all(&users, &reports, today, utc);
            assert!(status[0].has_submitted, "hour {hour}");
        }
    }

    #[test]
    fn report_before_midnight_is_not_today() {
        let users = vec![intern("C", None, at(2023, 1, 1, 0, 0))];
        let reports = vec![report("r", "C", at(2023, 6, 1, 23, 59))];
        let today = NaiveDate::from_ymd_opt(2023, 6, 2).unwrap();
        let status =
            compute_submission_status_for_all(&users, &reports, today, FixedOffset::east_opt(0).unwrap());
        assert!(!status[0].has_submitted);
        assert_eq!(status[0].last_submission, Some(at(2023, 6, 1, 23, 59)));
    }

    #[test]
    fn calendar_day_follows_configured_offset() {
        let users = vec![intern("C", None, at(2023, 1, 1, 0, 0))];
        // 20:00 UTC is 03:00 the next day in WIB
        let reports = vec![report("r", "C", at(2023, 6, 1, 20, 0))];
        let today = NaiveDate::from_ymd_opt(2023, 6, 2).unwrap();
        let wib = FixedOffset::east_opt(7 * 3600).unwrap();
        let status = compute_submission_status_for_all(&users, &reports, today, wib);
        assert!(status[0].has_submitted);
    }

    #[test]
    fn status_uses_latest_report_and_keeps_intern_order() {
        let mut admin = intern("admin-1", None, at(2023, 1, 1, 0, 0));
        admin.role = Role::Admin;
        let users = vec![
            intern("Z", None, at(2023, 1, 1, 0, 0)),
            admin,
            intern("A", None, at(2023, 1, 1, 0, 0)),
        ];
        let reports = vec![
            report("a-new", "A", at(2023, 6, 2, 7, 0)),
            report("z-old", "Z", at(2023, 5, 30, 7, 0)),
            report("a-old", "A", at(2023, 5, 30, 7, 0)),
        ];
        let today = NaiveDate::from_ymd_opt(2023, 6, 2).unwrap();
        let status =
            compute_submission_status_for_all(&users, &reports, today, FixedOffset::east_opt(0).unwrap());

        let ids: Vec<&str> = status.iter().map(|row| row.intern.id.as_str()).collect();
        assert_eq!(ids, vec!["Z", "A"]);
        assert!(!status[0].has_submitted);
        assert!(status[1].has_submitted);
        assert_eq!(status[1].last_submission, Some(at(2023, 6, 2, 7, 0)));
    }

    #[test]
    fn equal_timestamps_resolve_to_the_shared_instant() {
        let users = vec![intern("A", None, at(2023, 1, 1, 0, 0))];
        let same = at(2023, 6, 2, 9, 0);
        let reports = vec![
            report("first", "A", same),
            report("older", "A", at(2023, 6, 1, 9, 0)),
            report("second", "A", same),
        ];

        let stats = compute_intern_stats("A", &reports, at(2023, 6, 2, 12, 0), SubmissionRate::Binary);
        assert_eq!(stats.total_reports, 3);
        assert_eq!(stats.last_submission, Some(same));

        let today = NaiveDate::from_ymd_opt(2023, 6, 2).unwrap();
        let status =
            compute_submission_status_for_all(&users, &reports, today, FixedOffset::east_opt(0).unwrap());
        assert!(status[0].has_submitted);
        assert_eq!(status[0].last_submission, Some(same));

        let recent = recent_reports(&reports, 2);
        let mut ids: Vec<&str> = recent.iter().map(|r| r.id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["first", "second"]);
    }

    #[test]
    fn intern_without_reports_has_not_submitted() {
        let users = vec![intern("A", None, at(2023, 1, 1, 0, 0))];
        let today = NaiveDate::from_ymd_opt(2023, 6, 2).unwrap();
        let status = compute_submission_status_for_all(&users, &[], today, FixedOffset::east_opt(0).unwrap());
        assert!(!status[0].has_submitted);
        assert_eq!(status[0].last_submission, None);
    }

    #[test]
    fn distribution_keeps_first_seen_order() {
        let now = at(2023, 6, 2, 12, 0);
        let users = vec![
            intern("1", Some("Bidang 4"), at(2023, 1, 1, 0, 0)),
            intern("2", None, at(2023, 1, 1, 0, 0)),
            intern("3", Some("Bidang 2"), at(2023, 1, 1, 0, 0)),
            intern("4", Some("Bidang 4"), at(2023, 1, 1, 0, 0)),
            intern("5", Some(""), at(2023, 1, 1, 0, 0)),
        ];
        let reports = vec![
            report("a", "1", at(2023, 6, 1, 0, 0)),
            report("b", "2", at(2023, 6, 1, 0, 0)),
            report("c", "4", at(2023, 6, 1, 0, 0)),
            report("d", "4", at(2023, 6, 2, 0, 0)),
            report("e", "5", at(2023, 6, 2, 0, 0)),
        ];
        let with_stats = compute_all_intern_stats(&users, &reports, now, SubmissionRatePolicy::Binary);
        let distribution = compute_field_report_distribution(&with_stats);

        assert_eq!(
            distribution,
            vec![
                FieldReportCount { field: "Bidang 4".to_string(), report_count: 3 },
                FieldReportCount { field: UNKNOWN_FIELD.to_string(), report_count: 2 },
                FieldReportCount { field: "Bidang 2".to_string(), report_count: 0 },
            ]
        );
    }

    #[test]
    fn dashboard_summary_counts_active_interns() {
        let (users, mut reports) = scenario();
        reports.push(report("stale", "B", at(2023, 4, 1, 0, 0)));
        reports.push(report("ghost", "deleted-intern", at(2023, 6, 2, 0, 0)));
        let summary = compute_dashboard_summary(&users, &reports, at(2023, 6, 2, 12, 0));

        assert_eq!(summary.total_interns, 2);
        assert_eq!(summary.total_reports, 5);
        assert_eq!(summary.reports_this_week, 4);
        assert_eq!(summary.active_interns, 2);
        assert_eq!(summary.submission_rate, 100.0);
    }

    #[test]
    fn dashboard_summary_without_interns() {
        let summary = compute_dashboard_summary(&[], &[], at(2023, 6, 2, 12, 0));
        assert_eq!(summary.total_interns, 0);
        assert_eq!(summary.submission_rate, 0.0);
    }

    #[test]
    fn recent_reports_are_newest_first() {
        let (_, reports) = scenario();
        let recent = recent_reports(&reports, 2);
        let ids: Vec<&str> = recent.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r3", "r2"]);
    }
}
