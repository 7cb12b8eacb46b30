use std::time::Duration;

use clap::Parser;
use deploy_common::types::NetworkConfig;
use deploy_scripts::{cli::Cli, utils::setup_client};
use eyre::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let Cli {
        priv_key,
        rpc_url,
        config,
        artifacts,
        receipt_poll_interval_ms,
        receipt_poll_attempts,
        command,
    } = Cli::parse();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let network = NetworkConfig::load(&config)?;
    info!("loaded {} (chain {})", network.name, network.chain_id);

    let client = setup_client(&priv_key, &rpc_url)?.with_receipt_polling(
        Duration::from_millis(receipt_poll_interval_ms),
        receipt_poll_attempts,
    );

    if let Some(report) = command.run(&client, &network, &config, &artifacts).await? {
        println!("{report}");
        if report.has_failures() {
            eyre::bail!("some contracts failed on {}", report.network);
        }
    }

    Ok(())
}
