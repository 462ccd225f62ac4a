use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::Parser;

use crate::config::{DEFAULT_MAX_HOPS, DEFAULT_PARENT_TIMEOUT};

/// Sentinel accepted in place of a parent for root nodes.
pub const NO_PARENT: &str = "none";

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Run one node of a tree-shaped key/value lookup network")]
pub struct Cli {
    /// Seed preset for this node; also names its store bucket.
    pub name: String,

    /// Port to listen on. Use 0 for an ephemeral port.
    pub port: u16,

    /// Parent port, parent host:port, or `none` for a root node.
    pub parent: String,

    /// Interface to bind; also the host used for a bare parent port.
    #[arg(long, default_value = "127.0.0.1")]
    pub host: IpAddr,

    /// Directory holding the node's store (`<name>.db`).
    #[arg(long, default_value = ".")]
    pub data_dir: PathBuf,

    /// JSON file mapping preset names to seed data. Defaults to the built-in presets.
    #[arg(long, value_name = "FILE")]
    pub presets: Option<PathBuf>,

    /// How long to wait for the parent before failing a lookup.
    #[arg(long, default_value_t = DEFAULT_PARENT_TIMEOUT.as_millis() as u64)]
    pub parent_timeout_ms: u64,

    /// Maximum escalations a lookup may travel before it is rejected.
    #[arg(long, default_value_t = DEFAULT_MAX_HOPS)]
    pub max_hops: u32,
}

impl Cli {
    /// The parent address, or `None` when this node is a root.
    pub fn parent_addr(&self) -> Result<Option<String>> {
        parse_parent(&self.parent, self.host)
    }

    pub fn parent_timeout(&self) -> Duration {
        Duration::from_millis(self.parent_timeout_ms)
    }

    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.db", self.name))
    }
}

fn parse_parent(raw: &str, host: IpAddr) -> Result<Option<String>> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case(NO_PARENT) {
        return Ok(None);
    }
    if let Ok(port) = raw.parse::<u16>() {
        return Ok(Some(format!("{host}:{port}")));
    }
    let has_port = raw
        .rsplit_once(':')
        .is_some_and(|(name, port)| !name.is_empty() && port.parse::<u16>().is_ok());
    if has_port {
        return Ok(Some(raw.to_string()));
    }
    bail!("invalid parent '{raw}': expected a port, host:port, or '{NO_PARENT}'")
}
