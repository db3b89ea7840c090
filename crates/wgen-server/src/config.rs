//! Server configuration.
//!
//! Every option can come from a flag or from the environment. The model
//! variant itself is read from `MODEL_SIZE` by [`wgen_model::ModelConfig`].

use std::path::PathBuf;

use clap::Parser;
use wgen_generator::parse_max_tokens;

/// 16 MiB, the request body limit.
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// HTTP server for generating web components with a local language model.
#[derive(Debug, Clone, Parser)]
#[command(name = "wgen-server", version)]
pub struct ServerConfig {
    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// Largest accepted request body, in bytes
    #[arg(long, env = "MAX_BODY_BYTES", default_value_t = DEFAULT_MAX_BODY_BYTES)]
    pub max_body_bytes: usize,

    /// Directory with the front-end (index.html and assets), served at `/`
    #[arg(long, env = "STATIC_DIR")]
    pub static_dir: Option<PathBuf>,

    /// Maximum new tokens per generation
    #[arg(long, env = "MAX_TOKENS", default_value_t = 1024, value_parser = parse_max_tokens)]
    pub max_tokens: usize,

    /// Model variant, overrides MODEL_SIZE
    #[arg(long)]
    pub model_size: Option<String>,

    /// Run on CPU even if CUDA is available
    #[arg(long)]
    pub cpu: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            static_dir: None,
            max_tokens: 1024,
            model_size: None,
            cpu: false,
        }
    }
}

impl ServerConfig {
    /// `host:port` to bind.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr(), "0.0.0.0:5000");
        assert_eq!(config.max_body_bytes, 16 * 1024 * 1024);
    }

    #[test]
    fn test_parse_flags() {
        let config = ServerConfig::try_parse_from([
            "wgen-server",
            "--port",
            "8080",
            "--host",
            "127.0.0.1",
            "--model-size",
            "6.7b",
            "--cpu",
        ])
        .unwrap();
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
        assert_eq!(config.model_size.as_deref(), Some("6.7b"));
        assert!(config.cpu);
        assert_eq!(config.max_tokens, 1024);
    }

    #[test]
    fn test_zero_max_tokens_rejected() {
        let result = ServerConfig::try_parse_from(["wgen-server", "--max-tokens", "0"]);
        assert!(result.is_err());

        let config = ServerConfig::try_parse_from(["wgen-server", "--max-tokens", "256"]).unwrap();
        assert_eq!(config.max_tokens, 256);
    }
}
