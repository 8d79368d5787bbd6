use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::PanelError;
use crate::net::DeviceApi;
use crate::page;
use crate::panel::Panel;
use crate::types::{ConnectionState, CURRENT_VERSION_ID};

pub struct StatusPoller {
    device: Arc<dyn DeviceApi>,
    panel: Panel,
}

impl StatusPoller {
    pub fn new(device: Arc<dyn DeviceApi>, panel: Panel) -> Self {
        StatusPoller { device, panel }
    }

    pub async fn refresh_status(&self) -> Result<(), PanelError> {
        match self.device.fetch_status().await {
            Ok(status) => {
                let mut was = ConnectionState::Connected;
                self.panel.update(|state| {
                    was = state.connection;
                    page::render_status(&mut state.page, &status);
                    // Polled id supersedes the one read at startup.
                    if status.get(CURRENT_VERSION_ID).is_some() {
                        state.versions.current = status.current_version();
                        page::render_installed_version(&mut state.page, state.versions.current);
                        page::render_version_check(&mut state.page, &state.versions);
                    }
                    state.connection = ConnectionState::Connected;
                    state.last_refresh = Some(Utc::now());
                });
                if was == ConnectionState::Disconnected {
                    info!(fields = status.iter().count(), "Connected to device");
                }
                Ok(())
            }
            Err(e) => {
                let mut was = ConnectionState::Disconnected;
                self.panel.update(|state| {
                    was = state.connection;
                    page::render_disconnected(&mut state.page);
                    state.connection = ConnectionState::Disconnected;
                });
                if was == ConnectionState::Connected {
                    warn!(error = %e, "Lost connection to device");
                } else {
                    debug!(error = %e, "Status poll failed");
                }
                Err(e)
            }
        }
    }

    // The first refresh runs immediately.
    pub fn start(self: Arc<Self>, interval: Duration) -> PollHandle {
        PollTimer::new(interval).spawn(move || {
            let poller = Arc::clone(&self);
            async move {
                // Failures are already rendered; the next tick is the retry.
                let _ = poller.refresh_status().await;
            }
        })
    }
}

// Runs a task, waits a fixed delay after it settles, and repeats. Ticks
// never overlap.
pub struct PollTimer {
    delay: Duration,
}

impl PollTimer {
    pub fn new(delay: Duration) -> Self {
        PollTimer { delay }
    }

    pub fn spawn<F, Fut>(self, mut tick: F) -> PollHandle
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();
        let delay = self.delay;

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = &mut cancel_rx => break,
                    _ = tick() => {}
                }
                tokio::select! {
                    biased;
                    _ = &mut cancel_rx => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            debug!("Poll loop stopped");
        });

        PollHandle {
            cancel: cancel_tx,
            task,
        }
    }
}

// Dropping the handle also stops the loop.
pub struct PollHandle {
    cancel: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl PollHandle {
    pub async fn cancel(self) {
        let PollHandle { cancel, task } = self;
        let _ = cancel.send(());
        if let Err(e) = task.await {
            warn!(error = %e, "Poll loop ended abnormally");
        }
    }
}
