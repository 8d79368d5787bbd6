use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

use crate::page::Page;
use crate::types::{ConnectionState, Release, VersionInfo};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PanelState {
    pub page: Page,
    pub connection: ConnectionState,
    pub versions: VersionInfo,
    pub latest_release: Option<Release>,
    pub last_refresh: Option<DateTime<Utc>>,
}

pub struct PanelEvents {
    pub state: watch::Receiver<PanelState>,
    pub alerts: mpsc::UnboundedReceiver<String>,
}

// Every write goes through `update` so a refresh is applied as a whole.
#[derive(Clone)]
pub struct Panel {
    state: Arc<watch::Sender<PanelState>>,
    alerts: mpsc::UnboundedSender<String>,
}

impl Panel {
    pub fn new() -> (Panel, PanelEvents) {
        let (state_tx, state_rx) = watch::channel(PanelState::default());
        let (alert_tx, alert_rx) = mpsc::unbounded_channel();
        let panel = Panel {
            state: Arc::new(state_tx),
            alerts: alert_tx,
        };
        let events = PanelEvents {
            state: state_rx,
            alerts: alert_rx,
        };
        (panel, events)
    }

    // Subscribers are only woken when something actually changed.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut PanelState),
    {
        self.state.send_if_modified(|state| {
            let before = state.clone();
            f(state);
            *state != before
        });
    }

    pub fn snapshot(&self) -> PanelState {
        self.state.borrow().clone()
    }

    pub fn alert(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::error!(alert = %message, "Alert raised");
        if self.alerts.send(message).is_err() {
            tracing::debug!("No front end is listening for alerts");
        }
    }
}
