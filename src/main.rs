//! tosca-inventory: dynamic inventory derived from compiled TOSCA topologies.
//!
//! Speaks the dynamic-inventory script protocol: `--list` prints every group
//! and host as JSON, `--host <name>` prints that host's variables.

use clap::{ArgGroup, Parser};
use std::path::PathBuf;
use tosca_inventory_core::InventorySource;
use tosca_inventory_engine::{AnsibleInventory, Deriver};
use tracing::info;

#[derive(Parser)]
#[command(
    name = "tosca-inventory",
    version = env!("CARGO_PKG_VERSION"),
    about = "Dynamic inventory from compiled TOSCA service templates"
)]
#[command(group(ArgGroup::new("mode").required(true).args(["list", "host", "graph"])))]
struct Cli {
    /// Inventory source (must end with tosca.yaml or tosca.yml)
    #[arg(short, long)]
    inventory: PathBuf,

    /// Print all groups and hosts as JSON
    #[arg(long)]
    list: bool,

    /// Print the variables of one host as JSON
    #[arg(long)]
    host: Option<String>,

    /// Print the group tree
    #[arg(long)]
    graph: bool,

    /// Compile service templates concurrently
    #[arg(long)]
    parallel: bool,

    /// Stop at the first compilation failure
    #[arg(long)]
    fail_fast: bool,

    /// Per-template compilation timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tosca_inventory=info,tosca_inventory_engine=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if !InventorySource::verify_path(&cli.inventory) {
        anyhow::bail!(
            "{} is not an inventory source (expected a *tosca.yaml or *tosca.yml file)",
            cli.inventory.display()
        );
    }

    let mut source = InventorySource::load(&cli.inventory)?;
    source.options.parallel |= cli.parallel;
    source.options.fail_fast |= cli.fail_fast;
    if cli.timeout.is_some() {
        source.options.compile_timeout_secs = cli.timeout;
    }
    info!(
        source = %cli.inventory.display(),
        services = source.services.len(),
        "loaded inventory source"
    );

    let deriver = Deriver::from_source(&source)?;
    let groups = deriver.derive(&source.services).await.into_result()?;

    let mut inventory = AnsibleInventory::new();
    groups.emit(&mut inventory)?;

    if cli.list {
        println!("{}", serde_json::to_string_pretty(&inventory.to_list_json())?);
    } else if cli.graph {
        print!("{}", inventory.to_graph());
    } else if let Some(host) = &cli.host {
        println!("{}", serde_json::to_string_pretty(&inventory.host_vars(host))?);
    }

    Ok(())
}
