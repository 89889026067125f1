use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant};

/// Work a timer asks the session owner to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Intent {
    /// One second of the countdown elapsed.
    Decrement,
    /// Autosave the displayed answer.
    Flush,
}

pub(crate) struct SessionTimers {
    shutdown_tx: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

/// Starts the countdown and autosave timers. Both fire for the first time one
/// period after the call.
pub(crate) fn spawn(
    intents: mpsc::Sender<Intent>,
    tick_period: Duration,
    autosave_period: Duration,
) -> SessionTimers {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let handles = vec![
        tokio::spawn(timer_loop(
            Intent::Decrement,
            tick_period,
            intents.clone(),
            shutdown_rx.clone(),
        )),
        tokio::spawn(timer_loop(Intent::Flush, autosave_period, intents, shutdown_rx)),
    ];

    SessionTimers { shutdown_tx, handles }
}

impl SessionTimers {
    /// Stops both timers and waits for them to exit.
    pub(crate) async fn stop(self) {
        if self.shutdown_tx.send(true).is_err() {
            tracing::debug!("Session timers already gone");
        }

        for handle in self.handles {
            if let Err(err) = handle.await {
                tracing::error!(error = %err, "Session timer join failed");
            }
        }
    }
}

async fn timer_loop(
    intent: Intent,
    period: Duration,
    intents: mpsc::Sender<Intent>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut tick = interval_at(Instant::now() + period, period);
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tick.tick() => {
                if intents.send(intent).await.is_err() {
                    tracing::debug!(?intent, "Session owner gone; timer exiting");
                    break;
                }
            }
        }
    }
}
