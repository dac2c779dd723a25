// Server configuration from environment variables.

use anyhow::{Context, Result};
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let host = env::var("VERITEXT_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = match env::var("VERITEXT_PORT") {
            Ok(p) => p.parse().context("invalid VERITEXT_PORT")?,
            Err(_) => 8080,
        };
        Ok(Self { host, port })
    }
}
