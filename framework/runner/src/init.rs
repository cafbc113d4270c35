use crate::cli::LoadTunnelCli;
use clap::Parser;

/// Initialise the CLI and logging for the load tunnel runner.
pub fn init() -> LoadTunnelCli {
    env_logger::init();

    LoadTunnelCli::parse()
}
