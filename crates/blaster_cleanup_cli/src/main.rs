//! `blaster-cleanup` command-line entry point.
//!
//! # Responsibility
//! - Parse mode and config path, bootstrap logging, load config.
//! - Map run results to process exit codes.
//!
//! Exit codes: 0 clean run, 1 config or fatal step error, 2 run finished
//! with partially applied migrations.

use blaster_cleanup_core::{
    core_version, default_log_level, init_logging, load_config, run, MigrationOutcome, Mode,
    RunReport, StepOutcome,
};
use clap::Parser;
use log::error;
use std::path::PathBuf;
use std::process::ExitCode;

const EXIT_FAILURE: u8 = 1;
const EXIT_PARTIAL: u8 = 2;

/// Flume blaster post-indexing database transformation.
#[derive(Parser, Debug)]
#[command(version = core_version())]
struct CliArgs {
    /// all: inject, copy, then migrate; inject: replay `tx*`/`lo*` files;
    /// copy: move withdrawals into blocks; migrate: apply schema sets.
    #[arg(value_name = "all|inject|copy|migrate")]
    mode: Mode,

    /// YAML config with database paths, statements dir and tmp dir.
    config: PathBuf,

    #[arg(long)]
    log_level: Option<String>,

    /// Also write rotating log files to this directory.
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli_args = CliArgs::parse();

    let log_dir = match cli_args.log_dir.map(absolute_dir).transpose() {
        Ok(dir) => dir,
        Err(err) => {
            eprintln!("invalid --log-dir: {err}");
            return ExitCode::from(EXIT_FAILURE);
        }
    };
    let level = cli_args
        .log_level
        .unwrap_or_else(|| default_log_level().to_string());
    if let Err(err) = init_logging(&level, log_dir.as_deref()) {
        eprintln!("failed to initialize logging: {err}");
        return ExitCode::from(EXIT_FAILURE);
    }

    let config = match load_config(&cli_args.config) {
        Ok(config) => config,
        Err(err) => {
            error!("event=config_load module=cli status=error error={}", err);
            eprintln!("{err}");
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    match run(&config, cli_args.mode) {
        Ok(report) => {
            print_report(&report);
            if report.is_clean() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(EXIT_PARTIAL)
            }
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn absolute_dir(dir: PathBuf) -> std::io::Result<PathBuf> {
    if dir.is_absolute() {
        return Ok(dir);
    }
    Ok(std::env::current_dir()?.join(dir))
}

fn print_report(report: &RunReport) {
    println!("run {} ({})", report.run_id, report.mode);
    for step in &report.steps {
        let summary = match &step.outcome {
            StepOutcome::Injected { statements } => format!("injected {statements} statements"),
            StepOutcome::Copied { rows } => format!("copied {rows} rows"),
            StepOutcome::Migrated(MigrationOutcome::Applied { version }) => {
                format!("applied version {version}")
            }
            StepOutcome::Migrated(MigrationOutcome::AlreadyCurrent { current, target }) => {
                format!("already at version {current} (target {target})")
            }
            StepOutcome::Migrated(MigrationOutcome::Partial { target, failures }) => {
                for failure in failures {
                    println!(
                        "  ! {} statement #{}: {}",
                        step.step, failure.index, failure.error
                    );
                }
                format!(
                    "PARTIAL: {} statements failed, version {target} not recorded",
                    failures.len()
                )
            }
            StepOutcome::Resumed => "done in a previous run".to_string(),
        };
        println!("- {}: {summary}", step.step);
    }
}
