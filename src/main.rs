use clap::Parser;
use tracing::{debug, error, info, warn};

use liveshow::config::Config;

mod log;
mod signal;

#[derive(Parser)]
#[command(version)]
struct Args {
    /// Set config file path
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let cfg = Config::parse(args.config)?;

    log::set(format!(
        "onair={},liveshow={},tower_http={}",
        cfg.log.level, cfg.log.level, cfg.log.level
    ));
    warn!("set log level : {}", cfg.log.level);
    debug!("config : {:?}", cfg);

    let listener = tokio::net::TcpListener::bind(cfg.http.listen).await?;
    info!("Server listening on {}", listener.local_addr()?);

    liveshow::serve(cfg, listener, shutdown_signal()).await?;
    info!("Server shutdown");
    Ok(())
}

async fn shutdown_signal() {
    match signal::wait_for_stop_signal().await {
        Ok(name) => info!("Received signal: {}", name),
        Err(e) => {
            error!("signal handler failed: {}", e);
            std::future::pending::<()>().await
        }
    }
}
