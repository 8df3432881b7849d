//! Customer sync command-line driver.
//!
//! # Responsibility
//! - Open the customer store and reconcile a JSON-lines feed into it.
//! - Print one deterministic result line per feed record.
//!
//! # Invariants
//! - A conflict on one record never aborts the remaining records.
//! - Exit status is non-zero when any record failed.

use clap::Parser;
use customer_sync_core::db::open_db;
use customer_sync_core::{
    core_version, CustomerRepository, CustomerSyncService, ExternalCustomer,
    SqliteCustomerRepository, SyncConfig, SyncError,
};
use log::info;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "customer-sync")]
#[command(about = "Reconcile external customer records into the local customer store")]
#[command(version)]
struct Cli {
    /// JSON-lines feed file; reads stdin when omitted or `-`
    #[arg(value_name = "FEED")]
    feed: Option<PathBuf>,

    /// Customer store location (overrides the environment)
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Log level for file logging
    #[arg(long)]
    log_level: Option<String>,

    /// Absolute directory for rolling log files
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Totals {
    created: usize,
    updated: usize,
    conflicts: usize,
    failed: usize,
}

impl Totals {
    fn has_failures(&self) -> bool {
        self.conflicts + self.failed > 0
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = SyncConfig::from_env();
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    if let Some(dir) = cli.log_dir {
        config.log_dir = Some(dir);
    }

    if let Err(err) = config.init_logging() {
        eprintln!("error: {err}");
        return ExitCode::FAILURE;
    }
    info!(
        "event=cli_start module=cli status=ok version={} db_path={}",
        core_version(),
        config.db_path.display()
    );

    match run(&config, cli.feed) {
        Ok(totals) if totals.has_failures() => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &SyncConfig, feed: Option<PathBuf>) -> Result<Totals, Box<dyn std::error::Error>> {
    let conn = open_db(&config.db_path)?;
    let repo = SqliteCustomerRepository::try_new(&conn)?;
    let service = CustomerSyncService::new(repo);

    let reader: Box<dyn BufRead> = match feed {
        Some(path) if path.as_os_str() != "-" => Box::new(BufReader::new(File::open(path)?)),
        _ => Box::new(BufReader::new(io::stdin())),
    };

    let stdout = io::stdout();
    let totals = process_feed(&service, reader, &mut stdout.lock())?;
    Ok(totals)
}

/// Syncs every non-blank line of `reader` and writes one result line each,
/// followed by a summary line.
fn process_feed<R: CustomerRepository>(
    service: &CustomerSyncService<R>,
    reader: impl BufRead,
    out: &mut impl Write,
) -> io::Result<Totals> {
    let mut totals = Totals::default();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = index + 1;
        if line.trim().is_empty() {
            continue;
        }

        let external: ExternalCustomer = match serde_json::from_str(&line) {
            Ok(external) => external,
            Err(err) => {
                writeln!(out, "line {line_no}: invalid record: {err}")?;
                totals.failed += 1;
                continue;
            }
        };

        let external_id = external.external_id();
        match service.sync(&external) {
            Ok(true) => {
                writeln!(out, "line {line_no}: {external_id} created")?;
                totals.created += 1;
            }
            Ok(false) => {
                writeln!(out, "line {line_no}: {external_id} updated")?;
                totals.updated += 1;
            }
            Err(SyncError::Conflict(err)) => {
                writeln!(out, "line {line_no}: {external_id} conflict: {err}")?;
                totals.conflicts += 1;
            }
            Err(err) => {
                writeln!(out, "line {line_no}: {external_id} failed: {err}")?;
                totals.failed += 1;
            }
        }
    }

    writeln!(
        out,
        "summary created={} updated={} conflicts={} failed={}",
        totals.created, totals.updated, totals.conflicts, totals.failed
    )?;
    Ok(totals)
}

#[cfg(test)]
mod tests {
    use super::{process_feed, Totals};
    use customer_sync_core::db::open_db_in_memory;
    use customer_sync_core::{CustomerSyncService, SqliteCustomerRepository};

    fn run_feed(feed: &str) -> (Vec<String>, Totals, usize) {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteCustomerRepository::try_new(&conn).unwrap();
        let service = CustomerSyncService::new(&repo);

        let mut out = Vec::new();
        let totals = process_feed(&service, feed.as_bytes(), &mut out).unwrap();
        let lines = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect();
        let stored = repo.list_customers().unwrap().len();
        (lines, totals, stored)
    }

    #[test]
    fn conflict_does_not_stop_remaining_records() {
        let feed = concat!(
            r#"{"externalId":"ext-1","companyNumber":"C-1","name":"Acme"}"#,
            "\n",
            r#"{"externalId":"ext-1","name":"Ada"}"#,
            "\n",
            r#"{"externalId":"ext-1","companyNumber":"C-1","name":"Acme Ltd"}"#,
            "\n",
        );

        let (lines, totals, stored) = run_feed(feed);

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "line 1: ext-1 created");
        assert!(lines[1].starts_with("line 2: ext-1 conflict: "), "{}", lines[1]);
        assert_eq!(lines[2], "line 3: ext-1 updated");
        assert_eq!(lines[3], "summary created=1 updated=1 conflicts=1 failed=0");
        assert_eq!(
            totals,
            Totals {
                created: 1,
                updated: 1,
                conflicts: 1,
                failed: 0,
            }
        );
        assert!(totals.has_failures());
        assert_eq!(stored, 1);
    }

    #[test]
    fn malformed_line_counts_as_failed_and_blank_lines_are_skipped() {
        let feed = concat!(
            "{not json\n",
            "\n",
            r#"{"externalId":"p-1","name":"Grace"}"#,
            "\n",
        );

        let (lines, totals, stored) = run_feed(feed);

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("line 1: invalid record: "), "{}", lines[0]);
        assert_eq!(lines[1], "line 3: p-1 created");
        assert_eq!(totals.failed, 1);
        assert_eq!(totals.created, 1);
        assert!(totals.has_failures());
        assert_eq!(stored, 1);
    }

    #[test]
    fn clean_feed_has_no_failures() {
        let (_, totals, _) = run_feed(r#"{"externalId":"p-1","name":"Grace"}"#);
        assert_eq!(totals.created, 1);
        assert!(!totals.has_failures());
    }
}
