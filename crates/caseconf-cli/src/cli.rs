//! caseconf CLI - resolve case-statement configuration from the command line
//!
//! Usage:
//!   caseconf resolve base.yaml local.yaml -D platform=x86_64-linux -D mode=debug
//!   caseconf table toolchains.yaml -s x86_64-linux -s debug -D prefix=/opt
//!   caseconf check base.yaml

use caseconf_core::{
    load_ordered, load_str, load_with_config_options, load_with_regexp_table, ConfigOptions,
    Mapping, Value,
};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// caseconf - Conditional configuration resolution
#[derive(Parser)]
#[command(name = "caseconf")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log case matches and merges to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve configuration files in order against an initial state
    Resolve {
        /// Configuration file(s), later files see the state left by earlier ones
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Initial state entry (name=value, value parsed as a YAML scalar)
        #[arg(short = 'D', long = "define", value_parser = parse_define)]
        defines: Vec<(String, Value)>,

        /// Prefix marking case statements
        #[arg(long, default_value = "case_")]
        case_prefix: String,

        /// Output format: yaml, json
        #[arg(short, long, default_value = "yaml")]
        format: String,

        /// Write to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Look up the values of a regexp table
    Table {
        /// Table file
        #[arg(required = true)]
        file: PathBuf,

        /// Selector matched against each pattern column, in column order
        #[arg(short, long = "selector")]
        selectors: Vec<String>,

        /// Placeholder value (name=value)
        #[arg(short = 'D', long = "define", value_parser = parse_define)]
        defines: Vec<(String, Value)>,

        /// Output format: yaml, json
        #[arg(short, long, default_value = "yaml")]
        format: String,
    },

    /// Quick syntax check without resolution
    Check {
        /// Configuration file(s) to check
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

/// Run the CLI with the process arguments
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Resolve {
            files,
            defines,
            case_prefix,
            format,
            output,
        } => cmd_resolve(&files, defines, case_prefix, &format, output),

        Commands::Table {
            file,
            selectors,
            defines,
            format,
        } => cmd_table(&file, &selectors, defines, &format),

        Commands::Check { files } => cmd_check(&files),
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .ok();
}

/// Parse `name=value`; the value is read as YAML so `true` and `3` keep their type
fn parse_define(raw: &str) -> Result<(String, Value), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", raw))?;
    if name.is_empty() {
        return Err(format!("missing name in '{}'", raw));
    }

    let value = match load_str(value) {
        Ok(Value::Null) if value.is_empty() => Value::String(String::new()),
        Ok(Value::Mapping(_) | Value::Sequence(_)) | Err(_) => Value::String(value.to_string()),
        Ok(parsed) => parsed,
    };
    Ok((name.to_string(), value))
}

fn render(value: &Value, format: &str) -> Result<String, String> {
    match format {
        "json" => serde_json::to_string_pretty(value)
            .map(|s| s + "\n")
            .map_err(|e| e.to_string()),
        "yaml" | "yml" => serde_yaml::to_string(value).map_err(|e| e.to_string()),
        other => Err(format!("Unsupported format: {}. Use yaml or json.", other)),
    }
}

fn cmd_resolve(
    files: &[PathBuf],
    defines: Vec<(String, Value)>,
    case_prefix: String,
    format: &str,
    output: Option<PathBuf>,
) -> ExitCode {
    let initial: Mapping = defines.into_iter().collect();
    let options = ConfigOptions { case_prefix };

    let value = match load_with_config_options(files, &initial, &options) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("{} Resolution failed\n", "✗".red());
            eprintln!("{}", e);
            return ExitCode::from(1);
        }
    };

    let content = match render(&value, format) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            return ExitCode::from(2);
        }
    };

    if let Some(output_path) = output {
        if let Err(e) = std::fs::write(&output_path, &content) {
            eprintln!("{}: {}", "Error writing file".red(), e);
            return ExitCode::from(2);
        }
        eprintln!("{} Wrote to {}", "✓".green(), output_path.display());
    } else {
        print!("{}", content);
    }
    ExitCode::SUCCESS
}

fn cmd_table(
    file: &Path,
    selectors: &[String],
    defines: Vec<(String, Value)>,
    format: &str,
) -> ExitCode {
    let data: Mapping = defines.into_iter().collect();

    let result = match load_with_regexp_table(file, selectors, &data) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("{} Table lookup failed\n", "✗".red());
            eprintln!("{}", e);
            return ExitCode::from(1);
        }
    };

    match render(&Value::Mapping(result), format) {
        Ok(content) => {
            print!("{}", content);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            ExitCode::from(2)
        }
    }
}

fn cmd_check(files: &[PathBuf]) -> ExitCode {
    let mut all_valid = true;

    for file in files {
        match load_ordered(file) {
            Ok(_) => println!("{} {}: valid YAML", "✓".green(), file.display()),
            Err(e) => {
                eprintln!("{} {}: {}", "✗".red(), file.display(), e);
                all_valid = false;
            }
        }
    }

    if all_valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}
