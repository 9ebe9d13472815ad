use crate::config::MgmtConfig;
use crate::console::run_console;
use crate::demo::run_demo;
use anyhow::Result;
use clap::{Parser, Subcommand};
use nexus_meta::{shared, ClusterController, ClusterSession};
use std::path::{Path, PathBuf};
use tokio::io::BufReader;

#[derive(Parser)]
#[command(name = "nexus-mgmt")]
#[command(about = "DFS Nexus cluster management CLI", long_about = None)]
pub struct Cli {
    /// Emit logs as JSON lines instead of human-readable text
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start a session and read operator commands from stdin
    Serve {
        #[arg(
            short,
            long,
            env = "NEXUS_MGMT_CONFIG",
            default_value = "/etc/nexus/mgmt.toml"
        )]
        config: PathBuf,
    },
    /// Run the ingest, failure, repair and delete walkthrough
    Demo {
        /// Placement seed for a reproducible run
        #[arg(short, long)]
        seed: Option<u64>,
    },
    /// Print the default configuration as TOML
    Config,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Serve { ref config } => Self::serve(config).await,
            Command::Demo { seed } => Self::demo(seed),
            Command::Config => Self::print_config(),
        }
    }

    async fn serve(config_path: &Path) -> Result<()> {
        let config = MgmtConfig::load_or_default(config_path)?;

        let mut controller = ClusterController::new(config.cluster.clone())?;
        let nodes = controller.bootstrap();
        tracing::info!("Cluster ready with {} DataNodes", nodes);

        let controller = shared(controller);
        let session = ClusterSession::start(controller.clone(), &config.cluster);

        let stdin = BufReader::new(tokio::io::stdin());
        let result = run_console(controller, &config, stdin, tokio::io::stdout()).await;

        session.stop().await;
        result
    }

    fn demo(seed: Option<u64>) -> Result<()> {
        for step in run_demo(seed)? {
            println!("{}", serde_json::to_string(&step)?);
        }
        Ok(())
    }

    fn print_config() -> Result<()> {
        print!("{}", MgmtConfig::default().to_toml_string()?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve_defaults() {
        let cli = Cli::try_parse_from(["nexus-mgmt", "serve"]).unwrap();
        assert!(!cli.log_json);
        match cli.command {
            Command::Serve { config } => {
                assert!(config.ends_with("mgmt.toml"));
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_parse_demo_seed() {
        let cli = Cli::try_parse_from(["nexus-mgmt", "demo", "--seed", "9", "--log-json"]).unwrap();
        assert!(cli.log_json);
        assert!(matches!(cli.command, Command::Demo { seed: Some(9) }));
    }

    #[test]
    fn test_parse_config() {
        let cli = Cli::try_parse_from(["nexus-mgmt", "config"]).unwrap();
        assert!(matches!(cli.command, Command::Config));
    }

    #[test]
    fn test_rejects_unknown_subcommand() {
        assert!(Cli::try_parse_from(["nexus-mgmt", "format"]).is_err());
    }
}
