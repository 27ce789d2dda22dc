//! CLI configuration, merged from flags, environment, and a config file

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

pub const CONFIG_FILE: &str = ".trellis.toml";
pub const DEFAULT_SERVER: &str = "http://127.0.0.1:7890";

/// Resolved configuration for one CLI invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub server: String,
    pub workspace: String,
    pub token: Option<String>,
}

/// On-disk shape of `.trellis.toml`; every field optional.
#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigFile {
    server: Option<String>,
    workspace: Option<String>,
    token: Option<String>,
}

impl Config {
    /// Merge flag over environment over config file over default.
    pub fn load(
        server: Option<String>,
        workspace: Option<String>,
        token: Option<String>,
    ) -> Result<Config> {
        Self::load_from(Path::new(CONFIG_FILE), server, workspace, token)
    }

    fn load_from(
        path: &Path,
        server: Option<String>,
        workspace: Option<String>,
        token: Option<String>,
    ) -> Result<Config> {
        let file = if path.exists() {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?
        } else {
            ConfigFile::default()
        };

        let server = server
            .or_else(|| std::env::var("TRELLIS_SERVER").ok())
            .or(file.server)
            .unwrap_or_else(|| DEFAULT_SERVER.to_string());
        let workspace = workspace
            .or_else(|| std::env::var("TRELLIS_WORKSPACE").ok())
            .or(file.workspace)
            .context(
                "no workspace id: pass --workspace, set TRELLIS_WORKSPACE, or add it to .trellis.toml",
            )?;
        let token = token
            .or_else(|| std::env::var("TRELLIS_TOKEN").ok())
            .or(file.token);

        Ok(Config {
            server,
            workspace,
            token,
        })
    }
}
