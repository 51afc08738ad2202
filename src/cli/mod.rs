//! Command-line interface for the position log pipeline.

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info};
use std::path::PathBuf;
use std::time::Instant;

use crate::config::{default_config_path, FormatConfig};
use crate::processors::formatting::{self, FormatOutputs};

#[derive(Parser)]
#[command(name = "poslog-pipeline")]
#[command(about = "Normalize a raw position log into a formatted CSV and a binary snapshot", version)]
pub struct Cli {
    /// Path to YAML config file (defaults to config/default.yaml)
    #[arg(short = 'c', long = "conf_file", alias = "conf-file", value_name = "PATH_TO_CONF_FILE")]
    conf_file: Option<PathBuf>,

    /// Raw position log: timestamp,x,y per line
    #[arg(short = 's', long = "src_file", alias = "src-file", value_name = "PATH_TO_SRC_FILE")]
    src_file: PathBuf,

    /// Output directory (defaults to formatted/ under the project root)
    #[arg(short = 't', long = "tgt_dir", alias = "tgt-dir", value_name = "PATH_TO_TGT_DIR")]
    tgt_dir: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Create a spinner for indeterminate operations
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Print a summary box
fn print_summary(title: &str, items: &[(&str, String)]) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║ {:<62} ║", title);
    println!("╠══════════════════════════════════════════════════════════════╣");
    for (key, value) in items {
        let display_value = if value.chars().count() > 39 {
            let head: String = value.chars().take(36).collect();
            format!("{}...", head)
        } else {
            value.clone()
        };
        println!("║ {:<20}: {:<39} ║", key, display_value);
    }
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}

pub fn run() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity (must come first)
    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();

    let config = match FormatConfig::load(cli.conf_file.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    let conf_label = cli
        .conf_file
        .clone()
        .unwrap_or_else(default_config_path)
        .display()
        .to_string();
    info!("begin = {}, freq = {} Hz", config.begin, config.freq);

    cmd_create_log(&cli, &config, &conf_label);
}

fn cmd_create_log(cli: &Cli, config: &FormatConfig, conf_label: &str) {
    let start = Instant::now();

    let spinner = create_spinner("Formatting position log...");

    match formatting::create_log(&cli.src_file, cli.tgt_dir.as_deref(), config) {
        Ok(FormatOutputs {
            csv_path,
            snapshot_path,
            rows,
        }) => {
            spinner.finish_and_clear();

            let sampling = if config.resampling() {
                format!("{} Hz", config.freq)
            } else {
                "raw".to_string()
            };

            print_summary(
                "Position Log Formatted",
                &[
                    ("Config", conf_label.to_string()),
                    ("Source file", cli.src_file.display().to_string()),
                    ("CSV output", csv_path.display().to_string()),
                    ("Snapshot output", snapshot_path.display().to_string()),
                    ("Rows written", rows.to_string()),
                    ("Sampling", sampling),
                    ("Begin", config.begin.to_string()),
                    ("Duration", format!("{:.2?}", start.elapsed())),
                ],
            );
        }
        Err(e) => {
            spinner.finish_and_clear();
            error!("Formatting failed: {:#}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_short_flags() {
        let cli = Cli::try_parse_from(["poslog-pipeline", "-s", "in.csv", "-t", "out", "-c", "a.yaml"])
            .unwrap();

        assert_eq!(cli.src_file, PathBuf::from("in.csv"));
        assert_eq!(cli.tgt_dir, Some(PathBuf::from("out")));
        assert_eq!(cli.conf_file, Some(PathBuf::from("a.yaml")));
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_parse_long_flags() {
        let cli = Cli::try_parse_from([
            "poslog-pipeline",
            "--src_file",
            "in.csv",
            "--conf_file",
            "a.yaml",
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.src_file, PathBuf::from("in.csv"));
        assert_eq!(cli.conf_file, Some(PathBuf::from("a.yaml")));
        assert!(cli.tgt_dir.is_none());
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_src_file_required() {
        assert!(Cli::try_parse_from(["poslog-pipeline", "-t", "out"]).is_err());
    }
}
