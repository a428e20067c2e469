mod config;
mod file;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use stompconf_device::{Converter, DeviceProfile, Format, RoundTrip};

use crate::config::Config;
use crate::file::FileFormat;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Document format accepted by `check`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DocumentFormat {
    Backup,
    Simple,
}

impl From<DocumentFormat> for Format {
    fn from(format: DocumentFormat) -> Self {
        match format {
            DocumentFormat::Backup => Format::Backup,
            DocumentFormat::Simple => Format::Simple,
        }
    }
}

/// MIDI foot controller configuration converter.
#[derive(Parser)]
#[command(
    name = "stompconf",
    version,
    about = "MIDI foot controller configuration converter"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Log conversion steps to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Path to a stompconf.toml file (default: ./stompconf.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Device profile, overriding the configured one
    #[arg(long, global = true)]
    profile: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a device backup into a simple, hand-editable file
    ToSimple {
        /// Path to the backup exported by the device
        backup: PathBuf,
        /// Where to write the simple file
        dest: PathBuf,
    },

    /// Convert a simple file into a complete backup for the device
    ToBackup {
        /// Path to the simple file
        simple: PathBuf,
        /// Where to write the backup
        dest: PathBuf,
    },

    /// Check that a file survives a parse/generate round trip
    Check {
        /// Path to the file to check
        file: PathBuf,
        /// Format of the file
        #[arg(long, default_value = "backup", value_enum)]
        format: DocumentFormat,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match Config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            report_error(&e.to_string(), cli.output, cli.quiet);
            process::exit(1);
        }
    };

    let profile_name = config.profile_name(cli.profile.as_deref());
    let converter = match DeviceProfile::resolve(profile_name, &config.profiles).and_then(Converter::new) {
        Ok(c) => c,
        Err(e) => {
            report_error(&e.to_string(), cli.output, cli.quiet);
            process::exit(1);
        }
    };

    match cli.command {
        Commands::ToSimple { backup, dest } => {
            cmd_convert(&converter, &backup, &dest, Format::Backup, &config, cli.output, cli.quiet);
        }
        Commands::ToBackup { simple, dest } => {
            cmd_convert(&converter, &simple, &dest, Format::Simple, &config, cli.output, cli.quiet);
        }
        Commands::Check { file, format } => {
            cmd_check(&converter, &file, format.into(), cli.output, cli.quiet);
        }
    }
}

/// Logs go to stderr; stdout carries only command results.
fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_or_exit(path: &Path, output: OutputFormat, quiet: bool) -> serde_json::Value {
    match file::load(path) {
        Ok(v) => v,
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    }
}

fn cmd_convert(
    converter: &Converter,
    source: &Path,
    dest: &Path,
    from: Format,
    config: &Config,
    output: OutputFormat,
    quiet: bool,
) {
    let raw = load_or_exit(source, output, quiet);

    let (converted, to) = match from {
        Format::Backup => (converter.to_simple(&raw), Format::Simple),
        Format::Simple => (converter.to_backup(&raw), Format::Backup),
    };
    let converted = match converted {
        Ok(v) => v,
        Err(e) => {
            let msg = format!("error converting '{}': {}", source.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    let written = match file::save(dest, &converted, config.output.format) {
        Ok(f) => f,
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    };
    info!(source = %source.display(), dest = %dest.display(), %from, %to, "converted");

    if !quiet {
        match output {
            OutputFormat::Text => {
                println!("wrote {} file {}", to, dest.display());
            }
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "written": dest.display().to_string(),
                    "format": to,
                    "encoding": written,
                    "profile": converter.profile().name,
                });
                println!("{}", json);
            }
        }
    }
}

fn cmd_check(converter: &Converter, path: &Path, format: Format, output: OutputFormat, quiet: bool) {
    let raw = load_or_exit(path, output, quiet);

    let result = match converter.check(&raw, format) {
        Ok(r) => r,
        Err(e) => {
            let msg = format!("error checking '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    match result {
        RoundTrip::Exact => {
            if !quiet {
                match output {
                    OutputFormat::Text => println!("ok"),
                    OutputFormat::Json => {
                        println!("{}", serde_json::json!({"ok": true, "format": format}));
                    }
                }
            }
        }
        RoundTrip::Diverged(at) => {
            match output {
                OutputFormat::Text => {
                    if !quiet {
                        eprintln!("round trip diverges at {}", at);
                    }
                }
                OutputFormat::Json => {
                    let json = serde_json::json!({
                        "ok": false,
                        "format": format,
                        "divergence": at.to_string(),
                    });
                    eprintln!("{}", json);
                }
            }
            process::exit(1);
        }
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => eprintln!("{}", serde_json::json!({ "error": msg })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn check_defaults_to_backup_format() {
        let cli = Cli::try_parse_from(["stompconf", "check", "dump.json"]).unwrap();
        match cli.command {
            Commands::Check { format, .. } => assert_eq!(Format::from(format), Format::Backup),
            _ => panic!("expected check"),
        }
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let cli = Cli::try_parse_from([
            "stompconf",
            "to-simple",
            "a.json",
            "b.yaml",
            "--profile",
            "mini",
            "--output",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.profile.as_deref(), Some("mini"));
        assert_eq!(cli.output, OutputFormat::Json);
    }
}
