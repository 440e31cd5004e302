//! Standalone statement recognizer/parser probe.
//!
//! Runs recognition and parsing as a separate process so malformed files
//! (above all broken PDFs) cannot take the main application down.
//!
//! Usage: statement_probe <path_to_statement>
//! Output: recognized reader name on stderr, parse result as JSON on stdout
//! Exit codes:
//!   0 - Success
//!   1 - Invalid arguments
//!   2 - File read error
//!   3 - Parse error
//!   4 - No reader recognized the file
//!   5 - Recognized but no template matched

use std::env;
use std::fs;
use std::process::ExitCode;

use hausbuch::statement::recognize::StatementFileFactory;

/// Maximum statement file size (100 MB)
const MAX_FILE_SIZE: usize = 100 * 1024 * 1024;

fn main() -> ExitCode {
    env_logger::init();
    let args: Vec<String> = env::args().collect();

    if args.len() != 2 {
        eprintln!("Usage: statement_probe <path_to_statement>");
        return ExitCode::from(1);
    }
    let path = &args[1];

    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("READ_ERROR:{}", e);
            return ExitCode::from(2);
        }
    };
    if bytes.len() > MAX_FILE_SIZE {
        eprintln!(
            "READ_ERROR:Datei zu groß ({} MB). Maximum: {} MB",
            bytes.len() / (1024 * 1024),
            MAX_FILE_SIZE / (1024 * 1024)
        );
        return ExitCode::from(2);
    }

    let factory = StatementFileFactory::new();
    let recognized = match factory.recognize(path, &bytes) {
        Ok(Some(recognized)) => recognized,
        Ok(None) => {
            eprintln!("UNRECOGNIZED:{}", path);
            return ExitCode::from(4);
        }
        Err(e) => {
            eprintln!("PARSE_ERROR:{}", e);
            return ExitCode::from(3);
        }
    };
    eprintln!("READER:{}", recognized.reader.name());

    let today = chrono::Local::now().date_naive();
    let Some(result) = recognized.reader.parse(&recognized.content, today) else {
        eprintln!("NO_TEMPLATE_MATCHED:{}", path);
        return ExitCode::from(5);
    };

    match serde_json::to_string_pretty(&result) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("WRITE_ERROR:{}", e);
            ExitCode::from(3)
        }
    }
}
