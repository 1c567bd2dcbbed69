//! Fiscal relay - connects to the event channel and forwards print jobs to fiscal printers.

mod app;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use fiscal_config::{init_logging, Config, LogConfig, Paths};

/// Fiscal relay command-line interface.
#[derive(Parser, Debug)]
#[command(name = "fiscal-relay")]
#[command(about = "Relay print jobs from the job service to local fiscal printers")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error). Defaults to the configured level
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Base directory for config and logs. Defaults to ~/.fiscal-relay
    #[arg(long, env = "FISCAL_RELAY_BASE_DIR", global = true)]
    base_dir: Option<PathBuf>,

    /// Event channel URL
    #[arg(long, global = true)]
    socket_url: Option<String>,

    /// Job listing URL
    #[arg(long, global = true)]
    api_url: Option<String>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Connect, register and relay print jobs until interrupted
    Run {
        /// Circuit identifier to register
        #[arg(long)]
        circuit_id: Option<String>,

        /// Comma separated POS identifiers to register
        #[arg(long)]
        pos_ids: Option<String>,
    },
    /// Send a diagnostic receipt to a printer
    TestPrinter {
        /// Printer address (host or host:port)
        #[arg(long, default_value = app::DEFAULT_PRINTER_IP)]
        ip: String,
    },
    /// Fetch pending jobs once and print them without dispatching
    Fetch,
}

impl Cli {
    /// Command-line values win over file and environment.
    fn apply_to(&self, config: &mut Config) {
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(url) = &self.socket_url {
            config.socket_url = url.clone();
        }
        if let Some(url) = &self.api_url {
            config.api_url = url.clone();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let paths = match &cli.base_dir {
        Some(base) => Paths::with_base_dir(base.clone()),
        None => Paths::new()?,
    };
    let mut config = Config::load(&paths)?;
    cli.apply_to(&mut config);
    config.validate()?;
    paths.ensure_dirs()?;

    init_logging(&LogConfig {
        default_level: config.log_level.clone(),
        log_path: Some(paths.relay_log_file()),
        ..Default::default()
    })?;

    match cli.command {
        Some(Commands::Run {
            circuit_id,
            pos_ids,
        }) => app::run_relay(config, circuit_id, pos_ids).await,
        None => app::run_relay(config, None, None).await,
        Some(Commands::TestPrinter { ip }) => app::test_printer(&ip).await,
        Some(Commands::Fetch) => app::fetch_once(&config).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults_to_run() {
        let cli = Cli::try_parse_from(["fiscal-relay"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.log_level.is_none());
    }

    #[test]
    fn test_cli_run_with_identity() {
        let cli = Cli::try_parse_from([
            "fiscal-relay",
            "run",
            "--circuit-id",
            "C-1",
            "--pos-ids",
            "1234,5678",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(
            cli.command,
            Some(Commands::Run {
                circuit_id: Some("C-1".to_string()),
                pos_ids: Some("1234,5678".to_string()),
            })
        );
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_cli_test_printer_default_ip() {
        let cli = Cli::try_parse_from(["fiscal-relay", "test-printer"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::TestPrinter {
                ip: "192.168.0.99".to_string()
            })
        );
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::try_parse_from([
            "fiscal-relay",
            "--socket-url",
            "wss://socket.example.com",
            "--api-url",
            "https://api.example.com/jobs",
            "fetch",
        ])
        .unwrap();
        assert_eq!(cli.command, Some(Commands::Fetch));

        let mut config = Config::default();
        cli.apply_to(&mut config);
        assert_eq!(config.socket_url, "wss://socket.example.com");
        assert_eq!(config.api_url, "https://api.example.com/jobs");
        assert_eq!(config.log_level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_saved_registration_loads() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());
        paths.ensure_dirs().unwrap();
        std::fs::write(
            paths.config_file(),
            r#"{ "circuit_id": "C-9", "pos_ids": "1,2" }"#,
        )
        .unwrap();

        let loaded = Config::load_from_file(&paths.config_file()).unwrap();
        assert_eq!(loaded.circuit_id.as_deref(), Some("C-9"));
        assert_eq!(loaded.pos_ids.as_deref(), Some("1,2"));
    }
}
