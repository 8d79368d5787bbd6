use thiserror::Error;

#[derive(Debug, Error)]
pub enum PanelError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("could not decode response from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl PanelError {
    pub fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        let url = url.to_string();
        if err.is_timeout() {
            PanelError::Timeout { url }
        } else if let Some(status) = err.status() {
            PanelError::Status {
                url,
                status: status.as_u16(),
            }
        } else if err.is_decode() {
            PanelError::Decode {
                url,
                reason: err.to_string(),
            }
        } else {
            PanelError::Transport { url, source: err }
        }
    }
}
