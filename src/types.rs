use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const AC_LEARNING: &str = "ac_learning";
pub const CURRENT_VERSION_ID: &str = "current_version_id";
pub const MQTT_TAG_CLASSES: &str = "mqtt_status_tag_classes";
pub const MQTT_TAG_TEXT: &str = "mqtt_status_tag_text";
pub const WIFI_TAG_CLASSES: &str = "wifi_status_tag_classes";
pub const WIFI_TAG_TEXT: &str = "wifi_status_tag_text";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum StatusValue {
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
    Other(serde_json::Value),
}

impl StatusValue {
    // Learning mode has been reported as a bool, as 0/1, and as text.
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            StatusValue::Bool(b) => Some(*b),
            StatusValue::Number(n) => n.as_i64().map(|n| n != 0),
            StatusValue::Text(s) => match s.trim() {
                "1" | "true" => Some(true),
                "0" | "false" => Some(false),
                _ => None,
            },
            StatusValue::Other(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            StatusValue::Number(n) => n.as_i64(),
            StatusValue::Text(s) => s.trim().parse().ok(),
            StatusValue::Bool(_) | StatusValue::Other(_) => None,
        }
    }
}

impl fmt::Display for StatusValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusValue::Bool(b) => write!(f, "{}", b),
            StatusValue::Number(n) => write!(f, "{}", n),
            StatusValue::Text(s) => f.write_str(s),
            StatusValue::Other(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for StatusValue {
    fn from(value: &str) -> Self {
        StatusValue::Text(value.to_string())
    }
}

impl From<i64> for StatusValue {
    fn from(value: i64) -> Self {
        StatusValue::Number(value.into())
    }
}

impl From<bool> for StatusValue {
    fn from(value: bool) -> Self {
        StatusValue::Bool(value)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct DeviceStatus(pub BTreeMap<String, StatusValue>);

impl DeviceStatus {
    pub fn get(&self, key: &str) -> Option<&StatusValue> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<StatusValue>) {
        self.0.insert(key.into(), value.into());
    }

    // Later keys win.
    pub fn merge(&mut self, other: DeviceStatus) {
        self.0.extend(other.0);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &StatusValue)> {
        self.0.iter()
    }

    pub fn learning(&self) -> Option<LearningState> {
        self.get(AC_LEARNING)
            .and_then(StatusValue::as_flag)
            .map(LearningState::from)
    }

    pub fn current_version(&self) -> Option<ReleaseId> {
        self.get(CURRENT_VERSION_ID)
            .and_then(StatusValue::as_i64)
            .and_then(ReleaseId::from_reported)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearningState {
    Active,
    Inactive,
}

impl From<bool> for LearningState {
    fn from(active: bool) -> Self {
        if active {
            LearningState::Active
        } else {
            LearningState::Inactive
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    Connected,
    #[default]
    Disconnected,
}

// Opaque firmware release identifier. Only ever compared for equality.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ReleaseId(pub u64);

// Reported by the device when it does not know which release it runs.
pub const UNKNOWN_RELEASE: i64 = -1;

impl ReleaseId {
    // Other negative values are not release ids either.
    pub fn from_reported(raw: i64) -> Option<Self> {
        match raw {
            UNKNOWN_RELEASE => None,
            raw => u64::try_from(raw).ok().map(ReleaseId),
        }
    }
}

impl fmt::Display for ReleaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub const UNKNOWN: &str = "UNKNOWN";

pub fn display_release(id: Option<ReleaseId>) -> String {
    id.map_or_else(|| UNKNOWN.to_string(), |id| id.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VersionInfo {
    pub current: Option<ReleaseId>,
    pub newest: Option<ReleaseId>,
}

impl VersionInfo {
    pub fn update_available(&self) -> bool {
        match self.newest {
            Some(newest) => self.current != Some(newest),
            None => false,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Release {
    pub id: ReleaseId,
    #[serde(default)]
    pub tag_name: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub prerelease: bool,
}

// `/learn/status` answers with a bare `0` or `1`.
pub fn parse_learning_body(body: &str) -> Option<bool> {
    StatusValue::Text(body.to_string()).as_flag()
}
