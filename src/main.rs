use anyhow::Result;
use tracing::info;

use peregrine_uci::UciEngine;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();
    info!("peregrine starting");
    UciEngine::new().run()?;
    Ok(())
}
