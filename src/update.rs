use std::sync::Arc;

use crate::net::{DeviceApi, ReleaseFeed};
use crate::page;
use crate::panel::Panel;
use crate::types::{Release, ReleaseId, VersionInfo};

pub struct UpdateChecker {
    device: Arc<dyn DeviceApi>,
    feed: Arc<dyn ReleaseFeed>,
    panel: Panel,
    include_prereleases: bool,
}

impl UpdateChecker {
    pub fn new(
        device: Arc<dyn DeviceApi>,
        feed: Arc<dyn ReleaseFeed>,
        panel: Panel,
        include_prereleases: bool,
    ) -> Self {
        UpdateChecker {
            device,
            feed,
            panel,
            include_prereleases,
        }
    }

    pub async fn fetch_installed_version(&self) -> Option<ReleaseId> {
        let current = match self.device.installed_version().await {
            Ok(current) => current,
            Err(e) => {
                log::error!("Failed to read installed release: {}", e);
                self.panel
                    .alert("Failed to get current version. Check connection to device!");
                None
            }
        };
        self.panel.update(|state| {
            state.versions.current = current;
            page::render_installed_version(&mut state.page, current);
        });
        current
    }

    pub async fn fetch_latest_version(&self, include_prereleases: bool) -> Option<Release> {
        match self.feed.latest_release(include_prereleases).await {
            Ok(Some(release)) => Some(release),
            Ok(None) => {
                log::warn!("Release feed returned no releases");
                None
            }
            Err(e) => {
                log::error!("Failed to query release feed: {}", e);
                self.panel
                    .alert("Failed to retrieve update information. Check internet connection.");
                None
            }
        }
    }

    pub async fn check(&self) -> VersionInfo {
        log::info!("Checking for firmware updates...");
        let current = self.fetch_installed_version().await;
        let latest = self.fetch_latest_version(self.include_prereleases).await;

        let versions = VersionInfo {
            current,
            newest: latest.as_ref().map(|release| release.id),
        };
        self.panel.update(|state| {
            state.versions = versions;
            state.latest_release = latest.clone();
            page::render_version_check(&mut state.page, &versions);
        });

        match (versions.newest, versions.update_available()) {
            (Some(newest), true) => log::info!("A new release is available: {}", newest),
            (Some(_), false) => log::info!("Device firmware is up to date."),
            (None, _) => log::info!("Latest release is unknown."),
        }
        versions
    }
}
