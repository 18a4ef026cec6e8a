//! Configuration parsing from CLI arguments and environment variables

use crate::{
    cli::Cli,
    config::env::EnvManager,
    error::Result,
    models::Config,
    types::FailurePolicy,
};

/// Configuration parser that combines CLI arguments with environment variables
pub struct ConfigParser {
    cli: Cli,
}

impl ConfigParser {
    /// Create a new configuration parser with CLI arguments
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Parse and build the complete configuration
    pub fn parse(&self) -> Result<Config> {
        let mut config = Config::default();

        self.load_env_file()?;
        config.merge_from_env()?;
        self.apply_cli_overrides(&mut config);
        config.validate()?;

        Ok(config)
    }

    /// Load .env file if it exists
    fn load_env_file(&self) -> Result<()> {
        EnvManager::load_env_file(self.cli.debug)
    }

    /// Apply CLI argument overrides to configuration
    fn apply_cli_overrides(&self, config: &mut Config) {
        let cli = &self.cli;

        if let Some(count) = cli.count {
            config.trial_count = count;
        }

        if cli.best_effort {
            config.failure_policy = FailurePolicy::BestEffort;
        }

        if !cli.servers.is_empty() {
            config.servers = cli.servers.clone();
        }

        if let Some(bytes) = cli.download_bytes {
            config.download_bytes = bytes;
        }

        if let Some(bytes) = cli.upload_bytes {
            config.upload_bytes = bytes;
        }

        if let Some(count) = cli.ping_count {
            config.ping_count = count;
        }

        if let Some(timeout) = cli.timeout {
            config.timeout_seconds = timeout;
        }

        if cli.mode_precision.is_some() {
            config.mode_precision = cli.mode_precision;
        }

        if !cli.outputs.is_empty() {
            config.outputs = cli.outputs.clone();
        }

        if cli.format.is_some() {
            config.output_format = cli.format.clone();
        }

        if cli.load.is_some() {
            config.load_path = cli.load.clone();
        }

        config.show_history = cli.history;

        if let Some(enable_color) = cli.color_override() {
            config.enable_color = enable_color;
        }

        // CLI-only flags
        config.verbose = cli.verbose;
        config.debug = cli.debug;

        if config.debug {
            println!("Applied CLI overrides to configuration");
            println!(
                "Final config: trial_count={}, policy={}, timeout={}s, enable_color={}",
                config.trial_count, config.failure_policy, config.timeout_seconds, config.enable_color
            );
        }
    }
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<Config> {
    ConfigParser::new(cli).parse()
}

/// Display configuration summary for debug purposes
pub fn display_config_summary(config: &Config) -> String {
    let mut summary = Vec::new();

    match config.load_path {
        Some(ref path) => summary.push(format!("Loading: {}", path.display())),
        None => {
            summary.push(format!("Servers: {}", config.servers.join(", ")));
            summary.push(format!("Trial Count: {}", config.trial_count));
            summary.push(format!("Failure Policy: {}", config.failure_policy));
            summary.push(format!(
                "Transfer Sizes: {} down / {} up bytes",
                config.download_bytes, config.upload_bytes
            ));
            summary.push(format!("Ping Count: {}", config.ping_count));
            summary.push(format!("Timeout: {}s", config.timeout_seconds));
        }
    }
    if let Some(precision) = config.mode_precision {
        summary.push(format!("Mode Precision: {} decimals", precision));
    }
    if !config.outputs.is_empty() {
        let outputs: Vec<String> = config.outputs.iter().map(|p| p.display().to_string()).collect();
        summary.push(format!("Outputs: {}", outputs.join(", ")));
    }
    summary.push(format!("Color Output: {}", config.enable_color));
    summary.push(format!("Verbose: {}", config.verbose));
    summary.push(format!("Debug: {}", config.debug));

    summary.join("\n")
}
