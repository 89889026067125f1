use tokio::signal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    CtrlC,
    Terminate,
}

/// Resolves on Ctrl+C or SIGTERM. A handler that cannot be installed never
/// fires, so the other one still can.
pub(crate) async fn shutdown_signal() {
    let interrupt = tokio::select! {
        _ = ctrl_c() => Interrupt::CtrlC,
        _ = terminate() => Interrupt::Terminate,
    };

    tracing::info!(signal = ?interrupt, "Interrupted; closing the exam session");
}

async fn ctrl_c() {
    if let Err(err) = signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn terminate() {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(err) => {
            tracing::error!(error = %err, "Failed to install SIGTERM handler");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
