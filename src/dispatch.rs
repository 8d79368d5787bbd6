use std::fmt::Display;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::PanelError;
use crate::net::DeviceApi;
use crate::panel::Panel;
use crate::poller::StatusPoller;

// Nothing is changed locally: after a request succeeds the page is
// refreshed from the device.
pub struct ActionDispatcher {
    device: Arc<dyn DeviceApi>,
    poller: Arc<StatusPoller>,
    panel: Panel,
}

impl ActionDispatcher {
    pub fn new(device: Arc<dyn DeviceApi>, poller: Arc<StatusPoller>, panel: Panel) -> Self {
        ActionDispatcher { device, poller, panel }
    }

    pub async fn send_action(&self, name: &str, value: impl Display) -> Result<(), PanelError> {
        let value = value.to_string();
        match self.device.set(name, &value).await {
            Ok(()) => {
                info!(action = name, value = %value, "Action applied");
                self.refresh().await;
                Ok(())
            }
            Err(e) => {
                warn!(action = name, value = %value, error = %e, "Action failed");
                Err(e)
            }
        }
    }

    pub async fn start_learning(&self) -> Result<(), PanelError> {
        match self.device.start_learning().await {
            Ok(()) => {
                info!("Learning mode requested");
                self.refresh().await;
                Ok(())
            }
            Err(e) => {
                self.panel
                    .alert(format!("Failed to start learning from remote: {}", e));
                Err(e)
            }
        }
    }

    pub async fn stop_learning(&self) -> Result<(), PanelError> {
        match self.device.stop_learning().await {
            Ok(()) => {
                info!("Learning mode stop requested");
                self.refresh().await;
                Ok(())
            }
            Err(e) => {
                self.panel
                    .alert(format!("Failed to stop learning from remote: {}", e));
                Err(e)
            }
        }
    }

    async fn refresh(&self) {
        // A failed refresh is already shown as a disconnected page.
        let _ = self.poller.refresh_status().await;
    }
}
