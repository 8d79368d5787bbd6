use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::error::PanelError;
use crate::net::{DeviceApi, ReleaseFeed};
use crate::types::{DeviceStatus, Release, ReleaseId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Status,
    Set(String, String),
    StartLearning,
    StopLearning,
    InstalledVersion,
}

pub fn unreachable(url: &str) -> PanelError {
    PanelError::Timeout { url: url.to_string() }
}

#[derive(Default)]
pub struct FakeDevice {
    calls: Mutex<Vec<Call>>,
    // Served first; `status` once drained.
    queued: Mutex<VecDeque<Result<DeviceStatus, PanelError>>>,
    status: Mutex<DeviceStatus>,
    installed: Mutex<Option<Result<Option<ReleaseId>, PanelError>>>,
    fail_actions: Mutex<bool>,
    latency: Mutex<Option<Duration>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeDevice {
    pub fn with_status(json: &str) -> Self {
        let device = FakeDevice::default();
        *device.status.lock().unwrap() = serde_json::from_str(json).unwrap();
        device
    }

    pub fn set_status(&self, json: &str) {
        *self.status.lock().unwrap() = serde_json::from_str(json).unwrap();
    }

    pub fn queue_failure(&self) {
        self.queued.lock().unwrap().push_back(Err(unreachable("/status")));
    }

    pub fn set_installed(&self, result: Result<Option<ReleaseId>, PanelError>) {
        *self.installed.lock().unwrap() = Some(result);
    }

    pub fn fail_actions(&self, fail: bool) {
        *self.fail_actions.lock().unwrap() = fail;
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = Some(latency);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == call).count()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn action_result(&self, url: &str) -> Result<(), PanelError> {
        if *self.fail_actions.lock().unwrap() {
            Err(PanelError::Status {
                url: url.to_string(),
                status: 500,
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DeviceApi for FakeDevice {
    async fn fetch_status(&self) -> Result<DeviceStatus, PanelError> {
        self.record(Call::Status);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let queued = self.queued.lock().unwrap().pop_front();
        let result = queued.unwrap_or_else(|| Ok(self.status.lock().unwrap().clone()));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), PanelError> {
        self.record(Call::Set(key.to_string(), value.to_string()));
        self.action_result("/set")
    }

    async fn start_learning(&self) -> Result<(), PanelError> {
        self.record(Call::StartLearning);
        self.action_result("/learn/start")
    }

    async fn stop_learning(&self) -> Result<(), PanelError> {
        self.record(Call::StopLearning);
        self.action_result("/learn/stop")
    }

    async fn installed_version(&self) -> Result<Option<ReleaseId>, PanelError> {
        self.record(Call::InstalledVersion);
        match self.installed.lock().unwrap().take() {
            Some(result) => result,
            None => Ok(self.status.lock().unwrap().current_version()),
        }
    }
}

pub struct FakeFeed {
    pub release: Option<Release>,
    pub fail: bool,
    pub asked_for_prereleases: Mutex<Vec<bool>>,
}

impl FakeFeed {
    pub fn with_release(id: u64) -> Self {
        FakeFeed {
            release: Some(Release {
                id: ReleaseId(id),
                tag_name: format!("v{}", id),
                html_url: format!("https://example.invalid/releases/{}", id),
                prerelease: false,
            }),
            fail: false,
            asked_for_prereleases: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        FakeFeed {
            release: None,
            fail: true,
            asked_for_prereleases: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ReleaseFeed for FakeFeed {
    async fn latest_release(&self, include_prereleases: bool) -> Result<Option<Release>, PanelError> {
        self.asked_for_prereleases.lock().unwrap().push(include_prereleases);
        if self.fail {
            return Err(unreachable("https://api.github.com"));
        }
        Ok(self.release.clone())
    }
}
