//! CLI tool to lint CSS files and inspect their tokens.

use std::process::ExitCode;
use std::sync::Once;

use csslint_rs::{LintConfig, Linter, Scanned, Tokenizer};

static TRACING_INIT: Once = Once::new();

/// Install a log subscriber when `RUST_LOG` is set.
fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}

fn usage() -> ExitCode {
    eprintln!("Usage: csslint <command> [--config FILE] [files...]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  lint    Report problems in CSS file(s)");
    eprintln!("  tokens  Print the token stream of CSS file(s) as JSON lines");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  csslint lint style.css");
    eprintln!("  csslint lint --config csslint.json a.css b.css");
    eprintln!("  csslint tokens style.css");
    ExitCode::from(2)
}

fn main() -> ExitCode {
    init_tracing();
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        return usage();
    }

    let command = args[1].as_str();
    let mut rest = &args[2..];

    let mut config = LintConfig::default();
    if rest.first().is_some_and(|arg| arg == "--config") {
        let Some(path) = rest.get(1) else {
            eprintln!("Error: --config requires a file");
            return ExitCode::from(2);
        };
        config = match LintConfig::from_path(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{path}: {e}");
                return ExitCode::from(2);
            }
        };
        rest = &rest[2..];
    }

    if rest.is_empty() {
        eprintln!("Error: no files specified");
        return ExitCode::from(2);
    }

    let linter = Linter::with_config(&config);
    let mut had_error = false;

    for path in rest {
        match command {
            "lint" => match linter.lint_file(path) {
                Ok(report) if report.is_valid() => {
                    eprintln!("{path}: valid");
                }
                Ok(report) => {
                    for error in &report.errors {
                        println!(
                            "{path}:{}:{}: {} [{}]",
                            error.start.line, error.start.column, error.message, error.key
                        );
                    }
                    had_error = true;
                }
                Err(e) => {
                    eprintln!("{path}: {e}");
                    had_error = true;
                }
            },
            "tokens" => {
                let file = match std::fs::File::open(path) {
                    Ok(file) => file,
                    Err(e) => {
                        eprintln!("{path}: {e}");
                        had_error = true;
                        continue;
                    }
                };
                for item in Tokenizer::new(std::io::BufReader::new(file)) {
                    let line = match item {
                        Ok(Scanned::Token(token)) => serde_json::to_string(&token),
                        Ok(Scanned::Error(error)) => serde_json::to_string(&error),
                        Err(e) => {
                            eprintln!("{path}: {e}");
                            had_error = true;
                            break;
                        }
                    };
                    match line {
                        Ok(line) => println!("{line}"),
                        Err(e) => {
                            eprintln!("{path}: {e}");
                            had_error = true;
                            break;
                        }
                    }
                }
            }
            _ => {
                eprintln!("Unknown command: {command}");
                return ExitCode::from(2);
            }
        }
    }

    if had_error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
