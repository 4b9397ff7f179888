use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rollcall_core::report::monthly_summary;
use rollcall_core::{NewPerson, PersonId, Signature, YearMonth};
use rollcall_store::{AttendanceLedger, Registry, SqliteStore, DEFAULT_STAFF_PREFIX};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "rollcall", about = "Rollcall attendance CLI")]
struct Cli {
    /// Attendance database (default: $XDG_DATA_HOME/rollcall/attendance.db)
    #[arg(long, global = true, env = "ROLLCALL_DB_PATH")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a staff member from captured face signatures
    Register {
        /// Display name
        #[arg(short, long)]
        name: String,
        /// Role or position
        #[arg(short, long)]
        role: Option<String>,
        /// JSON file holding an array of signatures (arrays of numbers)
        #[arg(short, long)]
        signatures: PathBuf,
        /// Staff code prefix
        #[arg(long, env = "ROLLCALL_STAFF_PREFIX", default_value = DEFAULT_STAFF_PREFIX)]
        prefix: String,
    },
    /// List registered staff
    Staff,
    /// Show attendance for one day
    Day {
        /// Date (YYYY-MM-DD); defaults to today
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// Summarise attendance for a month
    Report {
        /// Month (YYYY-MM)
        #[arg(short, long)]
        month: YearMonth,
        /// Restrict to one staff code
        #[arg(short, long)]
        person: Option<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db = cli.db.unwrap_or_else(default_db_path);

    match cli.command {
        Commands::Register {
            name,
            role,
            signatures,
            prefix,
        } => {
            let signatures = read_signatures(&signatures)?;
            let store = open(&db)?.with_staff_prefix(prefix);
            let record = store.register(NewPerson {
                name,
                role,
                signatures,
            })?;
            tracing::info!(person = %record.id, db = %db.display(), "staff member registered");
            println!(
                "Registered {} as {} ({} signature(s))",
                record.name,
                record.id,
                record.signatures.len()
            );
        }
        Commands::Staff => {
            let staff = open(&db)?.all_records()?;
            if staff.is_empty() {
                println!("No staff registered");
            }
            for person in staff {
                println!(
                    "{}\t{}\t{}\t{}",
                    person.id,
                    person.name,
                    person.role.as_deref().unwrap_or("-"),
                    person.registered_at.format("%Y-%m-%d"),
                );
            }
        }
        Commands::Day { date } => {
            let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
            let store = open(&db)?;
            let events = store.events_on_date(date)?;
            if events.is_empty() {
                println!("No attendance on {date}");
            }
            for event in events {
                let name = store
                    .get(&event.person_id)?
                    .map(|p| p.name)
                    .unwrap_or_default();
                println!(
                    "{}\t{}\t{}\t{}",
                    event.time.format("%H:%M:%S"),
                    event.person_id,
                    name,
                    event.status
                );
            }
        }
        Commands::Report {
            month,
            person,
            json,
        } => {
            let store = open(&db)?;
            let events = store.events_in_month(month)?;
            let persons = store.all_records()?;
            let only = person.map(PersonId::new);
            let rows = monthly_summary(&events, &persons, month, only.as_ref());
            tracing::debug!(%month, events = events.len(), rows = rows.len(), "monthly summary built");

            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else if rows.is_empty() {
                println!("No records for {month}");
            } else {
                println!("staff\tname\tpresent\tearly\ton_time\tlate");
                for r in rows {
                    println!(
                        "{}\t{}\t{}\t{}\t{}\t{}",
                        r.person_id, r.name, r.present, r.early, r.on_time, r.late
                    );
                }
            }
        }
    }

    Ok(())
}

fn open(db: &Path) -> Result<SqliteStore> {
    tracing::debug!(path = %db.display(), "opening attendance database");
    SqliteStore::open(db).with_context(|| format!("opening {}", db.display()))
}

fn read_signatures(path: &Path) -> Result<Vec<Signature>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let signatures: Vec<Signature> = serde_json::from_str(&text)
        .with_context(|| format!("parsing signatures in {}", path.display()))?;
    tracing::debug!(count = signatures.len(), path = %path.display(), "signatures loaded");
    if signatures.is_empty() {
        bail!("{} holds no signatures", path.display());
    }
    Ok(signatures)
}

fn default_db_path() -> PathBuf {
    let data_dir = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        });
    data_dir.join("rollcall/attendance.db")
}
