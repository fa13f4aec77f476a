//! Server configuration: TOML file plus command-line overrides.
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1"
//! port = 5000
//!
//! [workspace]
//! root = "~/projects/bench"
//! allowed_roots = ["Tests", "Calibration", "src"]
//!
//! [runner]
//! program = "python3"
//! args = ["src/main.py"]
//! timeout_secs = 600
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use testdesk_kernel::KernelConfig;

use crate::constants::{DEFAULT_BIND_ADDRESS, DEFAULT_CONFIG_FILE, DEFAULT_PORT};

/// Command-line arguments.
#[derive(Parser, Debug, Default)]
#[command(name = "testdesk")]
#[command(about = "Browse, edit and run hardware test scripts over HTTP")]
pub struct Cli {
    /// TOML config file (default: ./testdesk.toml if present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Workspace root directory
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    pub bind: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Top-level directory to expose; repeat to list several
    #[arg(long = "allow-root", value_name = "NAME")]
    pub allow_roots: Vec<String>,
}

/// Full configuration for one server process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ListenConfig,

    #[serde(flatten)]
    pub kernel: KernelConfig,
}

/// Where the HTTP listener binds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

fn default_bind() -> String {
    DEFAULT_BIND_ADDRESS.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl ServerConfig {
    /// Parse a TOML document.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid config")
    }

    /// Load a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("in {}", path.display()))
    }

    /// Build the effective configuration from CLI arguments.
    ///
    /// An explicit `--config` must exist; the default file is optional.
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => Self::load(&expand_path(path))?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::load(default)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply(cli);
        Ok(config)
    }

    /// Apply CLI overrides on top of file values.
    pub fn apply(&mut self, cli: Cli) {
        if let Some(root) = cli.root {
            self.kernel.workspace.root = Some(root);
        }
        if let Some(bind) = cli.bind {
            self.server.bind = bind;
        }
        if let Some(port) = cli.port {
            self.server.port = port;
        }
        if !cli.allow_roots.is_empty() {
            self.kernel.workspace.allowed_roots = cli.allow_roots;
        }

        self.kernel.workspace.root = self.kernel.workspace.root.as_deref().map(expand_path);
    }
}

/// Expand a leading `~` to the home directory.
pub fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(raw.as_ref()).as_ref())
}
