use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::Client;
use std::time::Duration;

use crate::config::{Config, EndpointLayout};
use crate::error::PanelError;
use crate::types::{self, DeviceStatus, Release, ReleaseId, AC_LEARNING};

#[async_trait]
pub trait DeviceApi: Send + Sync {
    async fn fetch_status(&self) -> Result<DeviceStatus, PanelError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), PanelError>;

    async fn start_learning(&self) -> Result<(), PanelError>;

    async fn stop_learning(&self) -> Result<(), PanelError>;

    // `None` when the device does not know its release.
    async fn installed_version(&self) -> Result<Option<ReleaseId>, PanelError>;
}

#[async_trait]
pub trait ReleaseFeed: Send + Sync {
    async fn latest_release(&self, include_prereleases: bool) -> Result<Option<Release>, PanelError>;
}

pub struct HttpDevice {
    client: Client,
    base_url: String,
    layout: EndpointLayout,
}

impl HttpDevice {
    pub fn new(config: &Config) -> Result<Self, PanelError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| PanelError::from_reqwest(&config.device_url, e))?;
        Ok(HttpDevice {
            client,
            base_url: config.device_url.trim_end_matches('/').to_string(),
            layout: config.endpoint_layout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json(&self, path: &str) -> Result<DeviceStatus, PanelError> {
        let url = self.url(path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| PanelError::from_reqwest(&url, e))?;
        response
            .json::<DeviceStatus>()
            .await
            .map_err(|e| PanelError::from_reqwest(&url, e))
    }

    async fn get_text(&self, path: &str) -> Result<String, PanelError> {
        let url = self.url(path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| PanelError::from_reqwest(&url, e))?;
        response.text().await.map_err(|e| PanelError::from_reqwest(&url, e))
    }

    fn action_request(&self, path: &str, query: &[(&str, &str)]) -> Result<reqwest::Request, PanelError> {
        let url = self.url(path);
        self.client
            .get(&url)
            .query(query)
            .build()
            .map_err(|e| PanelError::from_reqwest(&url, e))
    }

    async fn get_ok(&self, path: &str, query: &[(&str, &str)]) -> Result<(), PanelError> {
        let request = self.action_request(path, query)?;
        let url = request.url().to_string();
        self.client
            .execute(request)
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| PanelError::from_reqwest(&url, e))?;
        Ok(())
    }

    // Kept as the text the device sent, so the element shows it verbatim.
    async fn fetch_learning(&self) -> Result<String, PanelError> {
        let path = "/learn/status";
        let body = self.get_text(path).await?;
        let body = body.trim();
        match types::parse_learning_body(body) {
            Some(_) => Ok(body.to_string()),
            None => Err(PanelError::Decode {
                url: self.url(path),
                reason: format!("expected 0 or 1, got '{}'", body),
            }),
        }
    }
}

#[async_trait]
impl DeviceApi for HttpDevice {
    async fn fetch_status(&self) -> Result<DeviceStatus, PanelError> {
        match self.layout {
            EndpointLayout::Combined => self.get_json("/status").await,
            EndpointLayout::Split => {
                let (ac, other, learning) = tokio::try_join!(
                    self.get_json("/status/ac"),
                    self.get_json("/status/other"),
                    self.fetch_learning(),
                )?;
                let mut status = ac;
                status.merge(other);
                status.insert(AC_LEARNING, learning.as_str());
                Ok(status)
            }
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), PanelError> {
        self.get_ok("/set", &[(key, value)]).await
    }

    async fn start_learning(&self) -> Result<(), PanelError> {
        match self.layout {
            EndpointLayout::Combined => self.set(AC_LEARNING, "1").await,
            EndpointLayout::Split => self.get_ok("/learn/start", &[]).await,
        }
    }

    async fn stop_learning(&self) -> Result<(), PanelError> {
        match self.layout {
            EndpointLayout::Combined => self.set(AC_LEARNING, "0").await,
            EndpointLayout::Split => self.get_ok("/learn/stop", &[]).await,
        }
    }

    async fn installed_version(&self) -> Result<Option<ReleaseId>, PanelError> {
        let path = match self.layout {
            EndpointLayout::Combined => "/status",
            EndpointLayout::Split => "/status/other",
        };
        let status = self.get_json(path).await?;
        if status.get(types::CURRENT_VERSION_ID).is_none() {
            return Err(PanelError::Decode {
                url: self.url(path),
                reason: format!("missing field {}", types::CURRENT_VERSION_ID),
            });
        }
        Ok(status.current_version())
    }
}

pub struct GithubReleases {
    client: Client,
    api_url: String,
    repo: String,
}

impl GithubReleases {
    pub fn new(config: &Config) -> Result<Self, PanelError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| PanelError::from_reqwest(&config.releases_api_url, e))?;
        Ok(GithubReleases {
            client,
            api_url: config.releases_api_url.trim_end_matches('/').to_string(),
            repo: config.releases_repo.clone(),
        })
    }

    pub fn releases_url(&self, include_prereleases: bool) -> String {
        if include_prereleases {
            format!("{}/repos/{}/releases?per_page=1", self.api_url, self.repo)
        } else {
            format!("{}/repos/{}/releases/latest", self.api_url, self.repo)
        }
    }
}

#[async_trait]
impl ReleaseFeed for GithubReleases {
    async fn latest_release(&self, include_prereleases: bool) -> Result<Option<Release>, PanelError> {
        let url = self.releases_url(include_prereleases);
        log::debug!("Querying release feed at {}", url);

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/vnd.github.v3+json")
            .header(USER_AGENT, concat!("ac-panel/", env!("CARGO_PKG_VERSION")))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| PanelError::from_reqwest(&url, e))?;

        let text = response.text().await.map_err(|e| PanelError::from_reqwest(&url, e))?;
        parse_release_feed(&text, include_prereleases).map_err(|reason| PanelError::Decode { url, reason })
    }
}

// The list endpoint returns an array ordered newest first; the latest
// endpoint returns a single object.
pub fn parse_release_feed(text: &str, include_prereleases: bool) -> Result<Option<Release>, String> {
    if include_prereleases {
        let releases: Vec<Release> = serde_json::from_str(text).map_err(|e| e.to_string())?;
        Ok(releases.into_iter().next())
    } else {
        let release: Release = serde_json::from_str(text).map_err(|e| e.to_string())?;
        Ok(Some(release))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{self, Page};
    use crate::types::{LearningState, StatusValue, CURRENT_VERSION_ID};
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    struct Route {
        path: &'static str,
        status: u16,
        body: &'static str,
        delay: Duration,
    }

    fn route(path: &'static str, status: u16, body: &'static str) -> Route {
        Route {
            path,
            status,
            body,
            delay: Duration::ZERO,
        }
    }

    // Minimal HTTP/1.1 responder on a loopback port. Answers each
    // connection once from `routes` and records the request targets.
    async fn serve(routes: Vec<Route>) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let routes = Arc::new(routes);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let targets = Arc::clone(&seen);

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let routes = Arc::clone(&routes);
                let targets = Arc::clone(&targets);
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 8192];
                    let mut read = 0;
                    while !buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut buf[read..]).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => read += n,
                        }
                    }
                    let head = String::from_utf8_lossy(&buf[..read]).to_string();
                    let target = head.split_whitespace().nth(1).unwrap_or("/").to_string();
                    targets.lock().unwrap().push(target.clone());

                    let path = target.split('?').next().unwrap_or("/");
                    let (status, body, delay) = routes
                        .iter()
                        .find(|r| r.path == path)
                        .map(|r| (r.status, r.body, r.delay))
                        .unwrap_or((404, "", Duration::ZERO));
                    tokio::time::sleep(delay).await;

                    let reason = match status {
                        200 => "OK",
                        500 => "Internal Server Error",
                        _ => "Not Found",
                    };
                    let response = format!(
                        "HTTP/1.1 {} {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        reason,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        (format!("http://{}", addr), seen)
    }

    fn device(base_url: &str, layout: EndpointLayout) -> HttpDevice {
        let mut config = Config::default();
        config.device_url = base_url.to_string();
        config.endpoint_layout = layout;
        config.request_timeout_ms = 200;
        HttpDevice::new(&config).unwrap()
    }

    #[tokio::test]
    async fn split_layout_merges_three_endpoints() {
        let (base, _) = serve(vec![
            route("/status/ac", 200, r#"{"mode": "cool", "temperature": 21}"#),
            route("/status/other", 200, r#"{"current_version_id": -1, "firmware_version": "1.4.0"}"#),
            route("/learn/status", 200, "1\n"),
        ])
        .await;
        let device = device(&base, EndpointLayout::Split);

        let status = device.fetch_status().await.unwrap();
        assert_eq!(status.get("mode"), Some(&StatusValue::from("cool")));
        assert_eq!(status.get(CURRENT_VERSION_ID), Some(&StatusValue::from(-1_i64)));
        assert_eq!(status.get(AC_LEARNING), Some(&StatusValue::from("1")));
        assert_eq!(status.learning(), Some(LearningState::Active));

        let mut page = Page::default();
        page::render_status(&mut page, &status);
        assert_eq!(page.element(AC_LEARNING), Some("1"));
        assert_eq!(page.element("firmware_version"), Some("1.4.0"));
        assert!(page.learning_modal_active);

        assert_eq!(device.installed_version().await.unwrap(), None);
    }

    #[tokio::test]
    async fn unreadable_learning_body_fails_the_poll() {
        let (base, _) = serve(vec![
            route("/status/ac", 200, "{}"),
            route("/status/other", 200, "{}"),
            route("/learn/status", 200, "busy"),
        ])
        .await;
        let device = device(&base, EndpointLayout::Split);

        let err = device.fetch_status().await.unwrap_err();
        assert!(matches!(err, PanelError::Decode { .. }), "{:?}", err);
    }

    #[tokio::test]
    async fn slow_device_times_out() {
        let (base, _) = serve(vec![Route {
            path: "/status",
            status: 200,
            body: "{}",
            delay: Duration::from_millis(1500),
        }])
        .await;
        let device = device(&base, EndpointLayout::Combined);

        let err = device.fetch_status().await.unwrap_err();
        assert!(matches!(err, PanelError::Timeout { .. }), "{:?}", err);
    }

    #[tokio::test]
    async fn rejected_action_reports_its_status() {
        let (base, seen) = serve(vec![route("/set", 500, "")]).await;
        let device = device(&base, EndpointLayout::Combined);

        let err = device.set("power", "off").await.unwrap_err();
        assert!(matches!(err, PanelError::Status { status: 500, .. }), "{:?}", err);
        assert_eq!(seen.lock().unwrap().clone(), vec!["/set?power=off".to_string()]);
    }

    #[tokio::test]
    async fn combined_learning_goes_through_set() {
        let (base, seen) = serve(vec![route("/set", 200, "")]).await;
        let device = device(&base, EndpointLayout::Combined);

        device.start_learning().await.unwrap();
        device.stop_learning().await.unwrap();
        assert_eq!(
            seen.lock().unwrap().clone(),
            vec!["/set?ac_learning=1".to_string(), "/set?ac_learning=0".to_string()]
        );
    }

    #[test]
    fn latest_endpoint_is_a_single_object() {
        let release = parse_release_feed(
            r#"{"id": 71234, "tag_name": "v1.2.0", "html_url": "https://example.invalid/r/71234", "prerelease": false}"#,
            false,
        )
        .unwrap()
        .unwrap();
        assert_eq!(release.id, ReleaseId(71234));
        assert_eq!(release.tag_name, "v1.2.0");
    }

    #[test]
    fn list_endpoint_takes_newest_entry() {
        let release = parse_release_feed(
            r#"[{"id": 9, "tag_name": "v2.0.0-rc1", "prerelease": true}, {"id": 8}]"#,
            true,
        )
        .unwrap();
        assert_eq!(release.map(|r| r.id), Some(ReleaseId(9)));

        assert_eq!(parse_release_feed("[]", true).unwrap(), None);
    }

    #[test]
    fn mismatched_shape_is_a_decode_error() {
        assert!(parse_release_feed(r#"{"id": 9}"#, true).is_err());
        assert!(parse_release_feed(r#"[{"id": 9}]"#, false).is_err());
    }

    #[test]
    fn set_carries_exactly_one_query_pair() {
        let mut config = Config::default();
        config.device_url = "http://10.0.0.7/".to_string();
        let device = HttpDevice::new(&config).unwrap();

        let request = device.action_request("/set", &[("someKey", "1")]).unwrap();
        assert_eq!(request.url().as_str(), "http://10.0.0.7/set?someKey=1");

        let request = device.action_request("/learn/stop", &[]).unwrap();
        assert_eq!(request.url().as_str(), "http://10.0.0.7/learn/stop");
    }

    #[test]
    fn release_urls_follow_the_prerelease_switch() {
        let config = Config::default();
        let feed = GithubReleases::new(&config).unwrap();
        assert_eq!(
            feed.releases_url(true),
            "https://api.github.com/repos/tpanajott/ESP32_IR_AC_Controller/releases?per_page=1"
        );
        assert_eq!(
            feed.releases_url(false),
            "https://api.github.com/repos/tpanajott/ESP32_IR_AC_Controller/releases/latest"
        );
    }
}
