use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use tree_lookup::{
    cli::Cli,
    config::{NodeConfig, PresetCatalog},
    node::Node,
    server,
    store::Store,
};

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let catalog = match &cli.presets {
        Some(path) => PresetCatalog::from_json_file(path)
            .with_context(|| format!("failed to load presets from {}", path.display()))?,
        None => PresetCatalog::builtin(),
    };
    let parent_addr = cli.parent_addr()?;

    let listener = TcpListener::bind((cli.host, cli.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", cli.host, cli.port))?;
    let self_addr = listener.local_addr()?.to_string();

    let config = NodeConfig::from_preset(&cli.name, self_addr.clone(), parent_addr, &catalog)?
        .with_parent_timeout(cli.parent_timeout())?
        .with_max_hops(cli.max_hops);
    match &config.parent_addr {
        None => info!("running root at http://{}", self_addr),
        Some(parent) => info!(
            "running child at http://{} with parent at http://{}",
            self_addr, parent
        ),
    }

    let store_path = cli.store_path();
    let store = Store::open(&store_path, &cli.name)
        .with_context(|| format!("failed to open store at {}", store_path.display()))?;
    let mut node = Node::new(config);
    node.initialize(store).context("failed to seed store")?;

    // The end-to-end tests read the address from the end of this line.
    info!("node {} listening on {}", cli.name, self_addr);
    server::serve_until_ctrl_c(listener, Arc::new(node)).await
}
