//! Graceful shutdown triggers.

#[cfg(unix)]
async fn wait_for_signal_impl() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut signal_terminate = signal(SignalKind::terminate())?;
    let mut signal_interrupt = signal(SignalKind::interrupt())?;

    Ok(tokio::select! {
        _ = signal_terminate.recv() => "SIGTERM",
        _ = signal_interrupt.recv() => "SIGINT",
    })
}

#[cfg(not(unix))]
async fn wait_for_signal_impl() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("CTRL_C")
}

/// Resolves once the process is asked to stop
pub(crate) async fn wait_for_stop_signal() -> std::io::Result<&'static str> {
    wait_for_signal_impl().await
}
