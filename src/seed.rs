use anyhow::Context;
use chrono::{NaiveDate, TimeZone, Utc};

use crate::models::{Field, Report, ReportContent, Role, User};

pub const ADMIN_PASSWORD: &str = "admin123";
pub const INTERN_PASSWORD: &str = "intern123";

pub const UNIVERSITIES: &[&str] = &[
    "Universitas Gadjah Mada",
    "Universitas Indonesia",
    "Institut Teknologi Bandung",
    "Universitas Negeri Semarang",
    "Universitas Diponegoro",
    "Universitas Brawijaya",
    "Institut Teknologi Sepuluh Nopember",
    "Universitas Airlangga",
    "Universitas Padjadjaran",
];

pub fn fields() -> Vec<Field> {
    [
        ("field-1", "Bidang 1 - Umum"),
        ("field-2", "Bidang 2 - Sistem Pemerintahan Berbasis Elektronik"),
        ("field-3", "Bidang 3 - Pengembangan Aplikasi"),
        ("field-4", "Bidang 4 - Pengelolaan Infrastruktur"),
        ("field-5", "Bidang 5 - Keamanan Informasi"),
    ]
    .into_iter()
    .map(|(id, name)| Field {
        id: id.to_string(),
        name: name.to_string(),
    })
    .collect()
}

fn avatar(seed: &str) -> Option<String> {
    Some(format!("https://api.dicebear.com/7.x/avataaars/svg?seed={seed}"))
}

pub fn users() -> anyhow::Result<Vec<User>> {
    let admin_created = Utc
        .with_ymd_and_hms(2023, 1, 1, 0, 0, 0)
        .single()
        .context("invalid seed date")?;

    let mut users = vec![User {
        id: "admin-1".to_string(),
        name: "Admin User".to_string(),
        email: "admin@example.com".to_string(),
        role: Role::Admin,
        university: None,
        field: None,
        avatar: avatar("admin"),
        created_at: admin_created,
    }];

    let interns = [
        ("intern-1", "Hannisa Ada Fitria", "hannisa", "Universitas Gadjah Mada", "Bidang 4 - Pengelolaan Infrastruktur", (2023, 2, 15)),
        ("intern-2", "Chantika Mutiara Pratami", "chantika", "Universitas Negeri Semarang", "Bidang 2 - Sistem Pemerintahan Berbasis Elektronik", (2023, 3, 5)),
        ("intern-3", "Syiffa Dea Rizkiansyah", "syiffa", "Universitas Negeri Semarang", "Bidang 2 - Sistem Pemerintahan Berbasis Elektronik", (2023, 4, 10)),
        ("intern-4", "Haikal Rijaldi Hidayat P.", "haikal", "Universitas Negeri Semarang", "Bidang 2 - Sistem Pemerintahan Berbasis Elektronik", (2023, 5, 20)),
        ("intern-5", "Anugrah Ridho Afriadi", "anugrah", "UNIVERSITAS NEGERI SEMARANG", "Bidang 2 - Sistem Pemerintahan Berbasis Elektronik", (2023, 6, 1)),
    ];

    for (id, name, handle, university, field, (y, m, d)) in interns {
        let created_at = Utc
            .with_ymd_and_hms(y, m, d, 0, 0, 0)
            .single()
            .context("invalid seed date")?;
        let first_name = name.split_whitespace().next().unwrap_or(handle);
        users.push(User {
            id: id.to_string(),
            name: name.to_string(),
            email: format!("{handle}@example.com"),
            role: Role::Intern,
            university: Some(university.to_string()),
            field: Some(field.to_string()),
            avatar: avatar(first_name),
            created_at,
        });
    }

    Ok(users)
}

/// Login password of a bundled account.
pub fn password(user: &User) -> &'static str {
    match user.role {
        Role::Admin => ADMIN_PASSWORD,
        Role::Intern => INTERN_PASSWORD,
    }
}

fn drive_links(count: usize) -> Vec<String> {
    (1..=count)
        .map(|n| format!("https://drive.google.com/file{n}"))
        .collect()
}

pub fn reports() -> anyhow::Result<Vec<Report>> {
    let rows = [
        ("report-1", "intern-1", "06/05/2025 11:15:59", (2025, 5, 6), "2025-05-06T11:15:59+07:00", 5),
        ("report-2", "intern-2", "06/05/2025 15:11:28", (2025, 5, 6), "2025-05-06T15:11:28+07:00", 3),
        ("report-3", "intern-3", "06/05/2025 19:50:15", (2025, 5, 6), "2025-05-06T19:50:15+07:00", 3),
        ("report-4", "intern-4", "07/05/2025 0:01:18", (2025, 5, 7), "2025-05-07T00:01:18+07:00", 3),
        ("report-5", "intern-4", "07/05/2025 0:08:46", (2025, 5, 7), "2025-05-07T00:08:46+07:00", 3),
        ("report-6", "intern-5", "07/05/2025 0:16:23", (2025, 5, 7), "2025-05-07T00:16:23+07:00", 3),
    ];

    rows.into_iter()
        .map(|(id, intern_id, timestamp, (y, m, d), created_at, links)| {
            Ok(Report {
                id: id.to_string(),
                intern_id: intern_id.to_string(),
                timestamp: timestamp.to_string(),
                report_date: NaiveDate::from_ymd_opt(y, m, d).context("invalid seed date")?,
                content: ReportContent::Links(drive_links(links)),
                created_at: created_at.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_reports_reference_seed_interns() {
        let users = users().unwrap();
        let reports = reports().unwrap();
        for report in &reports {
            assert!(users
                .iter()
                .any(|user| user.is_intern() && user.id == report.intern_id));
            assert!(report.created_instant().is_ok());
        }
    }

    #[test]
    fn seed_admin_has_no_placement() {
        let users = users().unwrap();
        let admins: Vec<&User> = users.iter().filter(|u| u.role == Role::Admin).collect();
        assert_eq!(admins.len(), 1);
        assert!(admins[0].university.is_none() && admins[0].field.is_none());
        assert_eq!(users.iter().filter(|u| u.is_intern()).count(), 5);
    }
}
