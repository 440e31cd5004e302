//! Command line entry point.
//!
//! `hausbuch import <db> <datei> <konto-id>` stages a statement file as
//! drafts; `hausbuch plan <db> <owner-id> <von> <bis>` prints the planned
//! budget grid for a month range (JJJJ-MM).

use std::env;
use std::path::Path;
use std::process::ExitCode;

use hausbuch::budget::planning::PlanningService;
use hausbuch::budget::store::SqlitePlanningRepository;
use hausbuch::budget::PeriodKey;
use hausbuch::db;
use hausbuch::drafts;
use hausbuch::statement::recognize::StatementFileFactory;

fn main() -> ExitCode {
    env_logger::init();
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("import") if args.len() >= 5 => run_import(&args[2], &args[3], &args[4]),
        Some("plan") if args.len() >= 6 => run_plan(&args[2], &args[3], &args[4], &args[5]),
        _ => {
            eprintln!("Usage: hausbuch import <db> <datei> <konto-id>");
            eprintln!("       hausbuch plan <db> <owner-id> <von JJJJ-MM> <bis JJJJ-MM>");
            ExitCode::from(1)
        }
    }
}

fn run_import(db_path: &str, file_path: &str, account_id: &str) -> ExitCode {
    if let Err(e) = db::init_database(Path::new(db_path)) {
        eprintln!("Datenbank konnte nicht geöffnet werden: {}", e);
        return ExitCode::from(2);
    }

    let bytes = match std::fs::read(file_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Datei konnte nicht gelesen werden: {}", e);
            return ExitCode::from(2);
        }
    };

    let factory = StatementFileFactory::new();
    let today = chrono::Local::now().date_naive();
    let result = match factory.parse(file_path, &bytes, today) {
        Ok(Some(result)) => result,
        Ok(None) => {
            eprintln!("Dateiformat nicht erkannt: {}", file_path);
            return ExitCode::from(4);
        }
        Err(e) => {
            eprintln!("Import fehlgeschlagen: {}", e);
            return ExitCode::from(3);
        }
    };

    let guard = match db::get_connection() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(2);
        }
    };
    let Some(conn) = guard.as_ref() else {
        eprintln!("Datenbank nicht initialisiert");
        return ExitCode::from(2);
    };

    // the import CLI creates a bare account row when none exists yet
    if let Err(e) = conn.execute(
        "INSERT OR IGNORE INTO accounts (id, name, currency) VALUES (?, 'Importkonto', 'EUR')",
        rusqlite::params![account_id],
    ) {
        eprintln!("Konto konnte nicht angelegt werden: {}", e);
        return ExitCode::from(2);
    }

    match drafts::create_drafts(conn, account_id, &result) {
        Ok(created) => {
            let previews = created.iter().filter(|d| d.is_preview).count();
            let errors = created.iter().filter(|d| d.is_error).count();
            println!(
                "{} Entwürfe angelegt ({} Vorschau, {} fehlerhaft)",
                created.len(),
                previews,
                errors
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Entwürfe konnten nicht angelegt werden: {}", e);
            ExitCode::from(3)
        }
    }
}

fn run_plan(db_path: &str, owner_id: &str, from: &str, to: &str) -> ExitCode {
    let (Some(from), Some(to)) = (parse_period(from), parse_period(to)) else {
        eprintln!("Zeitraum bitte als JJJJ-MM angeben");
        return ExitCode::from(1);
    };

    if let Err(e) = db::init_database(Path::new(db_path)) {
        eprintln!("Datenbank konnte nicht geöffnet werden: {}", e);
        return ExitCode::from(2);
    }
    let guard = match db::get_connection() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(2);
        }
    };
    let Some(conn) = guard.as_ref() else {
        eprintln!("Datenbank nicht initialisiert");
        return ExitCode::from(2);
    };

    let repository = SqlitePlanningRepository::new(conn);
    let service = PlanningService::new(&repository);
    match service.calculate_planned_values(owner_id, None, from, to) {
        Ok(values) => {
            for value in values.iter() {
                println!("{}\t{}\t{:.2}", value.purpose_id, value.period, value.amount);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Planung fehlgeschlagen: {}", e);
            ExitCode::from(3)
        }
    }
}

fn parse_period(s: &str) -> Option<PeriodKey> {
    let (year, month) = s.split_once('-')?;
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    if !(1..=12).contains(&month) {
        return None;
    }
    Some(PeriodKey::new(year, month))
}
