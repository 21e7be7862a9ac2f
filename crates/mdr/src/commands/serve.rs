//! `mdr serve` command implementation.

use std::path::PathBuf;

use clap::Args;
use mdr_config::{CliSettings, Config, Engine, OutputMode};
use mdr_server::{run_server, server_config_from_mdr_config};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the serve command.
#[derive(Args)]
pub(crate) struct ServeArgs {
    /// Path to configuration file (default: auto-discover mdr.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Site root directory (overrides config).
    #[arg(long, env = "MDR_ROOT")]
    root: Option<PathBuf>,

    /// Host to bind to (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable verbose output (request and route logs).
    #[arg(short, long)]
    pub verbose: bool,
}

impl ServeArgs {
    /// Execute the serve command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the server fails to start.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            host: self.host,
            port: self.port,
            root: self.root,
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        output.highlight(&format!(
            "Starting server on {}:{}",
            config.server.host, config.server.port
        ));
        output.info(&format!("Site root: {}", config.site_resolved.root.display()));
        if let Some(path) = &config.config_path {
            output.detail(&format!("Config: {}", path.display()));
        }
        for route in config.routes.iter().filter(|r| r.config.enabled) {
            output.info(&format!(
                "Markdown: {} ({}, {})",
                route.prefix,
                engine_name(route.config.engine),
                output_name(route.config.output_mode),
            ));
        }

        let server_config = server_config_from_mdr_config(&config, self.verbose);
        run_server(server_config)
            .await
            .map_err(|e| CliError::Server(e.to_string()))?;

        Ok(())
    }
}

fn engine_name(engine: Engine) -> &'static str {
    match engine {
        Engine::Filter => "filter",
        Engine::Handler => "handler",
    }
}

fn output_name(mode: OutputMode) -> &'static str {
    match mode {
        OutputMode::Raw => "raw",
        OutputMode::Html => "html",
    }
}
