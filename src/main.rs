use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use clap::{ArgGroup, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod csv_io;
mod db;
mod filters;
mod models;
mod report;
mod seed;
mod stats;
mod store;

use crate::config::AppConfig;
use crate::filters::StatusFilter;
use crate::models::{parse_instant, NewUser, ProfileUpdate, ReportContent, Role, User};
use crate::stats::SubmissionRatePolicy;
use crate::store::{MemoryStore, ReportStore};

#[derive(Parser)]
#[command(name = "magang-insight-hub")]
#[command(about = "Internship report tracking and submission monitoring", long_about = None)]
struct Cli {
    /// How submission rates are derived
    #[arg(long, global = true, value_enum)]
    rate_policy: Option<SubmissionRatePolicy>,
    /// Offset used to decide which calendar day a report belongs to
    #[arg(long, global = true, allow_hyphen_values = true)]
    utc_offset_hours: Option<i32>,
    /// Evaluate as of this RFC 3339 instant instead of the current time
    #[arg(long, global = true)]
    now: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load the bundled interns, reports and fields
    Seed,
    #[command(flatten)]
    Store(StoreCommand),
}

#[derive(Subcommand)]
enum StoreCommand {
    /// Import reports from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Show report statistics for one intern
    Stats {
        #[arg(long)]
        intern: String,
    },
    /// List every intern with their statistics
    Interns,
    /// List the field catalog and known universities
    Fields,
    /// Show who has submitted a report today
    Status {
        #[arg(long)]
        search: Option<String>,
        #[arg(long, value_enum, default_value_t = StatusFilter::All)]
        filter: StatusFilter,
        /// Write the rows as CSV instead of printing them
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List submitted reports
    Reports {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        field: Option<String>,
        #[arg(long)]
        intern: Option<String>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Generate a markdown dashboard
    Dashboard {
        #[arg(long, default_value = "dashboard.md")]
        out: PathBuf,
        #[arg(long, default_value_t = 5)]
        recent: usize,
    },
    /// Register an intern or an admin
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        university: Option<String>,
        #[arg(long)]
        field: Option<String>,
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        admin: bool,
    },
    /// Check an email and password against stored accounts
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Show a user's profile
    Profile {
        #[arg(long)]
        user: String,
    },
    /// Edit a user's profile; an empty value clears optional entries
    UpdateProfile {
        #[arg(long)]
        user: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        university: Option<String>,
        #[arg(long)]
        field: Option<String>,
        #[arg(long)]
        avatar: Option<String>,
    },
    /// Submit a daily report for an intern
    #[command(group(
        ArgGroup::new("content")
            .args(["link", "photo"])
            .required(true)
            .multiple(false)
    ))]
    Submit {
        #[arg(long)]
        intern: String,
        /// Day the report covers (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        link: Vec<String>,
        #[arg(long)]
        photo: Vec<String>,
    },
}

struct RunContext {
    policy: SubmissionRatePolicy,
    offset: FixedOffset,
    now: DateTime<Utc>,
    today: NaiveDate,
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

async fn connect(database_url: &str) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .context("failed to connect to Postgres")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env()?;
    if let Some(policy) = cli.rate_policy {
        config.rate_policy = policy;
    }
    if let Some(hours) = cli.utc_offset_hours {
        config.utc_offset_hours = hours;
    }
    let offset = config.offset()?;
    let now: DateTime<Utc> = match cli.now.as_deref() {
        Some(value) => parse_instant(value).ok_or_else(|| anyhow!("--now is not a timestamp: {value:?}"))?,
        None => Utc::now(),
    };
    let ctx = RunContext {
        policy: config.rate_policy,
        offset,
        now,
        today: now.with_timezone(&offset).date_naive(),
    };

    let pool = match config.database_url.as_deref() {
        Some(url) => Some(connect(url).await?),
        None => None,
    };

    match cli.command {
        Commands::InitDb => {
            let pool = pool.context("DATABASE_URL must be set to initialize the schema")?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = pool.context("DATABASE_URL must be set to seed the database")?;
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Store(command) => {
            let backend: Box<dyn ReportStore> = match pool {
                Some(pool) => Box::new(db::PgStore::new(pool)),
                None => {
                    info!("DATABASE_URL not set, using bundled in-memory data");
                    Box::new(MemoryStore::seeded()?)
                }
            };
            info!(policy = ctx.policy.as_str(), today = %ctx.today, "evaluating");
            run(command, backend.as_ref(), &ctx).await?;
        }
    }

    Ok(())
}

fn print_profile(user: &User) {
    println!("{} [{}] ({})", user.name, user.id, user.role.as_str());
    println!("- Email: {}", user.email);
    println!("- University: {}", user.university.as_deref().unwrap_or("-"));
    println!("- Field: {}", user.field.as_deref().unwrap_or("-"));
    println!("- Avatar: {}", user.avatar.as_deref().unwrap_or("-"));
}

async fn run(command: StoreCommand, backend: &dyn ReportStore, ctx: &RunContext) -> anyhow::Result<()> {
    let RunContext {
        policy,
        offset,
        now,
        today,
    } = *ctx;

    match command {
        StoreCommand::Import { csv } => {
            let file = std::fs::File::open(&csv)
                .with_context(|| format!("failed to open {}", csv.display()))?;
            let summary = csv_io::import_reports(backend, file, offset).await?;
            println!(
                "Inserted {} reports from {} ({} skipped).",
                summary.inserted,
                csv.display(),
                summary.skipped
            );
        }
        StoreCommand::Stats { intern } => {
            let reports = backend.list_reports().await?;
            let Some(user) = store::find_intern(backend, &intern).await? else {
                bail!("no intern with id {intern}");
            };
            let stats = stats::compute_intern_stats(
                &intern,
                &reports,
                now,
                policy.for_intern(&user),
            );
            println!("{} ({})", user.name, user.email);
            println!("- Total reports: {}", stats.total_reports);
            println!("- Submitted in the last 7 days: {}", stats.submitted_this_week);
            match stats.last_submission {
                Some(at) => println!("- Last submission: {}", at.with_timezone(&offset)),
                None => println!("- Last submission: never"),
            }
            println!("- Submission rate: {:.0}%", stats.submission_rate);
        }
        StoreCommand::Interns => {
            let users = backend.list_users().await?;
            let reports = backend.list_reports().await?;
            let interns = stats::compute_all_intern_stats(&users, &reports, now, policy);
            if interns.is_empty() {
                println!("No interns registered.");
            }
            for entry in interns {
                println!(
                    "- {} [{}] {}: {} reports, {} this week, rate {:.0}%",
                    entry.intern.name,
                    entry.intern.id,
                    stats::field_label(&entry.intern),
                    entry.stats.total_reports,
                    entry.stats.submitted_this_week,
                    entry.stats.submission_rate
                );
            }
        }
        StoreCommand::Fields => {
            println!("Fields:");
            for field in backend.list_fields().await? {
                println!("- {} ({})", field.name, field.id);
            }
            println!("Universities:");
            for university in seed::UNIVERSITIES {
                println!("- {university}");
            }
        }
        StoreCommand::Status {
            search,
            filter,
            out,
        } => {
            let users = backend.list_users().await?;
            let reports = backend.list_reports().await?;
            let statuses = stats::compute_submission_status_for_all(&users, &reports, today, offset);
            let rows = filters::filter_status(&statuses, search.as_deref(), filter);

            if let Some(path) = out {
                let file = std::fs::File::create(&path)
                    .with_context(|| format!("failed to create {}", path.display()))?;
                csv_io::write_submission_status(&rows, offset, file)?;
                println!("Wrote {} rows to {}.", rows.len(), path.display());
                return Ok(());
            }

            let submitted = statuses.iter().filter(|s| s.has_submitted).count();
            println!("Submitted on {}: {}/{}", today, submitted, statuses.len());
            for status in rows {
                let label = if status.has_submitted {
                    "submitted"
                } else {
                    "missing"
                };
                println!("- {} ({}): {}", status.intern.name, stats::field_label(&status.intern), label);
            }
        }
        StoreCommand::Reports {
            search,
            field,
            intern,
            out,
        } => {
            let users = backend.list_users().await?;
            let reports = match intern.as_deref() {
                Some(id) => backend.list_reports_by_intern(id).await?,
                None => backend.list_reports().await?,
            };
            let joined = filters::join_interns(&reports, &users);
            let rows = filters::filter_reports(&joined, search.as_deref(), field.as_deref());

            if let Some(path) = out {
                let file = std::fs::File::create(&path)
                    .with_context(|| format!("failed to create {}", path.display()))?;
                csv_io::write_reports(&rows, file)?;
                println!("Wrote {} reports to {}.", rows.len(), path.display());
                return Ok(());
            }

            if rows.is_empty() {
                println!("No reports match.");
            }
            for row in rows {
                println!(
                    "- {} {} ({}): {} {}",
                    row.report.timestamp,
                    row.intern.map(|i| i.name.as_str()).unwrap_or("unknown intern"),
                    row.report.report_date,
                    row.report.content.urls().len(),
                    row.report.content.kind()
                );
            }
        }
        StoreCommand::Dashboard { out, recent } => {
            let users = backend.list_users().await?;
            let reports = backend.list_reports().await?;

            let summary = stats::compute_dashboard_summary(&users, &reports, now);
            let interns = stats::compute_all_intern_stats(&users, &reports, now, policy);
            let by_field = stats::compute_field_report_distribution(&interns);
            let statuses = stats::compute_submission_status_for_all(&users, &reports, today, offset);
            let newest: Vec<_> = stats::recent_reports(&reports, recent)
                .into_iter()
                .map(|report| filters::ReportRow {
                    report,
                    intern: users.iter().find(|user| user.id == report.intern_id),
                })
                .collect();

            let text = report::build_report(&report::DashboardInput {
                today,
                offset,
                summary: &summary,
                interns: &interns,
                by_field: &by_field,
                statuses: &statuses,
                recent: &newest,
            });
            std::fs::write(&out, text)?;
            println!("Dashboard written to {}.", out.display());
        }
        StoreCommand::Register {
            name,
            email,
            university,
            field,
            password,
            admin,
        } => {
            let role = if admin { Role::Admin } else { Role::Intern };
            let user = store::register_user(
                backend,
                NewUser {
                    name,
                    email,
                    role,
                    university,
                    field,
                    password,
                },
                now,
            )
            .await?;
            println!("Registered {} {} ({}).", user.role.as_str(), user.name, user.id);
        }
        StoreCommand::Login { email, password } => {
            let Some(user) = store::login(backend, &email, &password).await? else {
                bail!("invalid email or password");
            };
            println!("Signed in as {} ({}).", user.name, user.role.as_str());
        }
        StoreCommand::Profile { user } => {
            let Some(user) = store::find_user(backend, &user).await? else {
                bail!("no user with id {user}");
            };
            print_profile(&user);
        }
        StoreCommand::UpdateProfile {
            user,
            name,
            email,
            university,
            field,
            avatar,
        } => {
            let updated = backend
                .update_profile(
                    &user,
                    ProfileUpdate {
                        name,
                        email,
                        university,
                        field,
                        avatar,
                    },
                )
                .await?;
            print_profile(&updated);
        }
        StoreCommand::Submit {
            intern,
            date,
            link,
            photo,
        } => {
            let content = if photo.is_empty() {
                ReportContent::Links(link)
            } else {
                ReportContent::Photos(photo)
            };
            let report = store::submit_report(
                backend,
                &intern,
                date.unwrap_or(today),
                content,
                now,
                offset,
            )
            .await?;
            println!("Report {} submitted at {}.", report.id, report.timestamp);
        }
    }

    Ok(())
}
