//! Application configuration
//!
//! Everything resolves from CLI flags and environment variables (loaded
//! from `.env` by main); flags win over environment, environment over
//! defaults.

use super::cli::Cli;
use super::constants::{DEFAULT_HOST, DEFAULT_PORT};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Signing secret for bearer tokens; `None` means ephemeral
    pub jwt_secret: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    /// Allowed CORS origins; empty means same-origin only
    pub cors_origins: Vec<String>,
    pub debug: bool,
}

impl AppConfig {
    pub fn load(cli: &Cli) -> Self {
        let server = ServerConfig {
            host: cli
                .host
                .clone()
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: cli.port.unwrap_or(DEFAULT_PORT),
        };
        let cors_origins = cli
            .cors_origins
            .as_deref()
            .map(parse_origins)
            .unwrap_or_default();
        Self {
            server,
            auth: AuthConfig {
                jwt_secret: cli.jwt_secret.clone(),
            },
            cors_origins,
            debug: cli.debug,
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(|o| o.trim_end_matches('/').to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn defaults_apply_without_flags() {
        let cli = Cli::parse_from(["whatsup"]);
        let config = AppConfig::load(&cli);
        assert_eq!(config.server.host, DEFAULT_HOST);
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert!(config.cors_origins.is_empty());
        assert!(config.auth.jwt_secret.is_none());
    }

    #[test]
    fn origins_are_trimmed_and_normalized() {
        let cli = Cli::parse_from([
            "whatsup",
            "--cors-origins",
            "http://localhost:3000/, https://chat.example.com ,",
        ]);
        let config = AppConfig::load(&cli);
        assert_eq!(
            config.cors_origins,
            ["http://localhost:3000", "https://chat.example.com"]
        );
    }

    #[test]
    fn bind_addr_joins_host_and_port() {
        let server = ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 9090,
        };
        assert_eq!(server.bind_addr(), "0.0.0.0:9090");
    }
}
