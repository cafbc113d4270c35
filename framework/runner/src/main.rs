use load_tunnel_runner::prelude::{init, run_from_cli, LoadTunnelResult};

#[tokio::main]
async fn main() -> LoadTunnelResult<()> {
    let cli = init();

    run_from_cli(cli).await?;

    Ok(())
}
