use clap::{Parser, Subcommand};

use super::constants::{ENV_CORS_ORIGINS, ENV_DEBUG, ENV_HOST, ENV_JWT_SECRET, ENV_PORT};

#[derive(Parser)]
#[command(name = "whatsup")]
#[command(version, about = "Messaging backend", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Server host address
    #[arg(long, short = 'H', global = true, env = ENV_HOST)]
    pub host: Option<String>,

    /// Server port
    #[arg(long, short = 'p', global = true, env = ENV_PORT)]
    pub port: Option<u16>,

    /// JWT signing secret; omit to generate an ephemeral one
    #[arg(long, global = true, env = ENV_JWT_SECRET, hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Allowed CORS origins, comma-separated
    #[arg(long, global = true, env = ENV_CORS_ORIGINS)]
    pub cors_origins: Option<String>,

    /// Enable debug mode (verbose request logging)
    #[arg(long, global = true, env = ENV_DEBUG)]
    pub debug: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the server (default when no command is given)
    Start,
    /// System maintenance commands
    System {
        #[command(subcommand)]
        command: SystemCommands,
    },
}

#[derive(Subcommand)]
pub enum SystemCommands {
    /// Delete the local data directory
    Prune {
        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
}

pub fn parse() -> Cli {
    Cli::parse()
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
    fn parses_host_and_port_flags() {
        let cli = Cli::parse_from(["whatsup", "-H", "0.0.0.0", "-p", "9090"]);
        assert_eq!(cli.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(cli.port, Some(9090));
        assert!(cli.command.is_none());
    }

    #[test]
    fn parses_prune_subcommand() {
        let cli = Cli::parse_from(["whatsup", "system", "prune", "-y"]);
        assert!(matches!(
            cli.command,
            Some(Commands::System {
                command: SystemCommands::Prune { yes: true }
            })
        ));
    }
}
