//! Network Speed Tester - Main CLI Application
//!
//! Runs repeated speed trials (or loads a saved run), prints a summary table
//! and exports the run to JSON/CSV.

use clap::Parser;
use network_speed_tester::{
    cli::Cli,
    config::{display_config_summary, load_config, validate_config, EnvManager, ValidationLevel},
    error::{AppError, ErrorReporter, Result},
    executor::{CollectionError, ExecutionConfig, TrialEvent, TrialExecutor},
    export::{export_as, load_path, ExportFormat},
    log_debug, log_info, log_warn,
    logging::{Logger, LoggerFactory},
    models::{Config, TrialRun},
    output::{OutputFormatter, OutputFormatterFactory},
    provider::HttpSpeedProvider,
    stats::{StatisticsConfig, StatisticsEngine},
    BUILD_TIME, GIT_COMMIT, PKG_NAME, TARGET_TRIPLE, VERSION,
};
use std::process;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
        eprintln!("{}", panic_report_hint());
        process::exit(1);
    }));

    let cli = Cli::parse();
    let reporter = ErrorReporter::new(cli.use_colors(), cli.verbose || cli.debug);

    if let Err(message) = cli.validate() {
        reporter.report_error(&AppError::validation(message));
        process::exit(1);
    }

    match run_application(cli).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            reporter.report_error(&e);
            print_error_suggestions(&e);
            process::exit(e.exit_code());
        }
    }
}

/// What to include when reporting a crash
fn panic_report_hint() -> String {
    format!(
        "Please report this issue with the command line that triggered it ({} v{}, {})",
        PKG_NAME, VERSION, GIT_COMMIT
    )
}

/// Main application logic, returning the process exit code
async fn run_application(cli: Cli) -> Result<i32> {
    if cli.example_env {
        print!("{}", EnvManager::create_example_env_content());
        return Ok(0);
    }

    if cli.debug {
        println!("{} v{} ({}, {}, built {})", PKG_NAME, VERSION, GIT_COMMIT, TARGET_TRIPLE, BUILD_TIME);
        println!("Debug mode enabled");
        println!();
    }

    let color_override = cli.color_override();
    let terminal_colors = cli.use_colors();
    let config = load_config(cli)?;
    let use_color = color_override.unwrap_or(config.enable_color && terminal_colors);
    colored::control::set_override(use_color);

    let formatter: Arc<dyn OutputFormatter> =
        Arc::from(OutputFormatterFactory::create_formatter(use_color, config.verbose || config.debug));

    for warning in validate_config(&config)? {
        if warning.level != ValidationLevel::Info || config.verbose || config.debug {
            eprintln!("{}", warning.format(use_color));
        }
    }

    if config.debug {
        println!("Configuration loaded successfully:");
        println!("{}", display_config_summary(&config));
        println!();
    }

    let factory = LoggerFactory::new(config.clone());
    let logger = factory.create_logger("MAIN").await;
    log_debug!(logger, "Session {} started", factory.session_id());

    let mut exit_code = 0;
    let run = match config.load_path {
        Some(ref path) => {
            let run = load_path(path)?;
            log_info!(logger, "Loaded {} trials from {}", run.len(), path.display());
            println!("{}", formatter.format_header(&format!("Results from {}", path.display()))?);
            run
        }
        None => match collect_trials(&config, &factory, formatter.clone()).await? {
            Ok(run) => run,
            Err(code) => return Ok(code),
        },
    };

    println!();
    if run.is_empty() {
        log_warn!(logger, "No trials to summarize");
        println!("{}", formatter.format_warning("No trials completed; there is nothing to summarize")?);
        exit_code = AppError::insufficient_data("").exit_code();
    } else {
        let engine = StatisticsEngine::new(StatisticsConfig {
            mode_precision: config.mode_precision,
        })?;
        let report = engine.summarize(&run)?;
        println!("{}", formatter.format_summary_table(&report)?);
    }

    if (config.show_history || config.load_path.is_some()) && !run.is_empty() {
        println!();
        println!("{}", formatter.format_history(&run)?);
    }

    export_outputs(&config, &run, formatter.as_ref(), &logger).await?;

    Ok(exit_code)
}

/// Select a server and run the configured trials
///
/// The inner `Err` carries the exit code of a fail-fast abort, which has
/// already been reported.
async fn collect_trials(
    config: &Config,
    factory: &LoggerFactory,
    formatter: Arc<dyn OutputFormatter>,
) -> Result<std::result::Result<TrialRun, i32>> {
    let mut provider = HttpSpeedProvider::from_config(config)?;

    println!("{}", formatter.format_header("Network Speed Test")?);
    println!("Selecting the best server from {} candidate(s)...", config.servers.len());
    let server = provider.select_best_server().await?;
    println!("{}", formatter.format_server(server)?);
    println!();

    let trial_count = config.trial_count;
    let hook_formatter = formatter.clone();
    let mut executor = TrialExecutor::new(ExecutionConfig::from(config))
        .with_logger(factory.create_trial_logger().await)
        .on_trial(move |event| {
            let line = match event {
                TrialEvent::Completed(trial) => hook_formatter.format_trial(trial, trial_count),
                TrialEvent::Skipped(skipped) => hook_formatter.format_skipped(skipped),
            };
            match line {
                Ok(line) => println!("{}", line),
                Err(e) => eprintln!("{}", e),
            }
        });

    match executor.collect(&mut provider).await {
        Ok(outcome) => {
            println!();
            println!("{}", formatter.format_outcome(&outcome)?);
            Ok(Ok(outcome.into_run()))
        }
        Err(CollectionError::Aborted(aborted)) => {
            eprintln!("{}", formatter.format_aborted(&aborted)?);
            if config.verbose || config.debug {
                eprintln!();
                eprintln!("{}", aborted.error.user_friendly_message());
            }
            Ok(Err(aborted.error.exit_code()))
        }
        Err(CollectionError::Rejected(error)) => Err(error),
    }
}

/// Write the run to every requested output
async fn export_outputs(config: &Config, run: &TrialRun, formatter: &dyn OutputFormatter, logger: &Logger) -> Result<()> {
    for output in &config.outputs {
        let format = match config.output_format {
            Some(ref format) => ExportFormat::parse(format)?,
            None => ExportFormat::from_path(output)?,
        };

        export_as(run, output, format)?;
        log_info!(logger, "Exported {} trials to {} as {}", run.len(), output.display(), format);
        println!(
            "{}",
            formatter.format_success(&format!("Saved {} trial(s) to {}", run.len(), output.display()))?
        );
    }

    Ok(())
}

/// Print helpful suggestions for common errors
fn print_error_suggestions(error: &AppError) {
    match error {
        AppError::Config(_) => {
            eprintln!();
            eprintln!("Configuration help:");
            eprintln!("  - Check your .env file format (see --example-env)");
            eprintln!("  - Server URLs must start with http:// or https://");
            eprintln!("  - Run with --debug to see the effective configuration");
        }
        AppError::Measurement(_) => {
            eprintln!();
            eprintln!("Network troubleshooting:");
            eprintln!("  - Check your internet connection");
            eprintln!("  - Try a different server with --server");
            eprintln!("  - Increase the timeout with --timeout or use smaller transfers");
            eprintln!("  - Use --best-effort to keep going past failed trials");
        }
        AppError::UnsupportedFormat(_) => {
            eprintln!();
            eprintln!("Supported formats are json and csv; pass --format or use a .json/.csv extension.");
        }
        AppError::MalformedFile(_) => {
            eprintln!();
            eprintln!("Only files written by {} (or the older three-column CSV layout) can be loaded.", PKG_NAME);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_report_hint_names_build() {
        let hint = panic_report_hint();
        assert!(hint.contains(VERSION));
        assert!(hint.contains(GIT_COMMIT));
        assert!(!hint.contains("://"));
    }
}
