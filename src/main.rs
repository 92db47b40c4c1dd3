//! gg-text command-line entry point.
//!
//! ## CLI Subcommands
//!
//! - `gg-text-cli tokenize --kind <kind> <files...> <text>` - Encode text, print JSON
//! - `gg-text-cli decode --kind <kind> <files...> <ids>` - Decode comma-separated ids
//! - `gg-text-cli config show [FILE]` - Print effective configuration

use std::path::Path;
use std::process::ExitCode;

use gg_text::cli::{config_cmd, tokenize_cmd, CliError, EXIT_USAGE};
use gg_text::config as gg_config;
use gg_text::telemetry;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("help");
    let rest = args.get(2..).unwrap_or(&[]);

    let config = gg_config::load();
    if let Err(e) = telemetry::init_logging(&config.log) {
        eprintln!("Logging disabled: {}", e);
    }

    match command {
        "tokenize" => report(tokenize_cmd::run_tokenize(rest, config.max_length)),
        "decode" => report(tokenize_cmd::run_decode(rest, config.max_length)),
        "config" => {
            let subcommand = rest.first().map(|s| s.as_str()).unwrap_or("show");
            match subcommand {
                "show" => report(config_cmd::run_show(rest.get(1).map(Path::new))),
                "defaults" => {
                    config_cmd::run_defaults();
                    ExitCode::SUCCESS
                }
                "validate" => ExitCode::from(config_cmd::run_validate() as u8),
                _ => {
                    eprintln!("Unknown config subcommand: {}", subcommand);
                    print_command_help("config");
                    ExitCode::from(EXIT_USAGE as u8)
                }
            }
        }
        "help" | "--help" | "-h" => {
            if let Some(subcommand) = rest.first() {
                print_command_help(subcommand);
            } else {
                print_usage();
            }
            ExitCode::SUCCESS
        }
        "version" | "--version" | "-V" => {
            println!("gg-text {}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            ExitCode::from(EXIT_USAGE as u8)
        }
    }
}

fn report(result: Result<(), CliError>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

fn print_usage() {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!(
        "gg-text - tokenizers and generation support v{}

USAGE:
    gg-text-cli [COMMAND] [OPTIONS]

COMMANDS:
    tokenize     Encode text and print ids, attention mask and type ids
    decode       Decode comma-separated token ids to text
    config       Show, validate or list default configuration
    version      Show version information
    help         Show this help message

EXAMPLES:
    gg-text-cli tokenize --kind wordpiece vocab.txt \"hello world\"
    gg-text-cli tokenize --kind bpe --preset clip vocab.json merges.txt \"a photo of a cat\"
    gg-text-cli decode --kind sentencepiece tokenizer.json 4,17,9
    gg-text-cli config show gg-text.toml

ENVIRONMENT:
    GG_TEXT_MAX_LENGTH       Default encode length (default: 512)
    GG_TEXT_MAX_NEW_TOKENS   Greedy generation budget (default: 256)
    GG_TEXT_LOG_LEVEL        Log filter (default: info)
    GG_TEXT_LOG_FORMAT       json or pretty (default: json)
    GG_TEXT_LOG_FILE         Log to this file instead of stderr
    GG_TEXT_STOP_SEQUENCES   Comma-separated stop sequences

EXIT CODES:
    0  Success
    1  Failure
    2  Usage error
",
        version
    );
}

/// Print detailed help for a specific command.
fn print_command_help(command: &str) {
    match command {
        "tokenize" | "decode" => {
            eprintln!(
                "gg-text-cli {0} - {1}

USAGE:
    gg-text-cli {0} --kind KIND [--preset PRESET] [--max-length N] FILES... INPUT

KINDS:
    wordpiece       FILES = vocab.txt
    bpe             FILES = vocab.json merges.txt   (--preset gpt2|clip)
    sentencepiece   FILES = tokenizer.json
",
                command,
                if command == "tokenize" {
                    "Encode text and print JSON"
                } else {
                    "Decode comma-separated ids"
                }
            );
        }
        "config" => {
            eprintln!(
                "gg-text-cli config - Manage configuration

USAGE:
    gg-text-cli config show [FILE]   Effective values (FILE is TOML, env overrides it)
    gg-text-cli config defaults      Built-in defaults
    gg-text-cli config validate      Check values, exit 1 on warnings
"
            );
        }
        _ => {
            eprintln!("No help for unknown command: {}", command);
            print_usage();
        }
    }
}
