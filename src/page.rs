use std::collections::BTreeMap;

use crate::types::{
    self, DeviceStatus, LearningState, ReleaseId, StatusValue, VersionInfo, CURRENT_VERSION_ID,
    MQTT_TAG_CLASSES, MQTT_TAG_TEXT, UNKNOWN, UNKNOWN_RELEASE, WIFI_TAG_CLASSES, WIFI_TAG_TEXT,
};

pub const CONNECTED_CLASSES: &str = "tag is-success";
pub const DISCONNECTED_CLASSES: &str = "tag is-danger";
pub const UNKNOWN_TAG_CLASSES: &str = "tag is-light";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tag {
    pub classes: String,
    pub text: String,
}

impl Tag {
    pub fn new(classes: &str, text: &str) -> Self {
        Tag {
            classes: classes.to_string(),
            text: text.to_string(),
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.split_whitespace().any(|c| c == class)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub elements: BTreeMap<String, String>,
    pub connection_tag: Tag,
    pub mqtt_tag: Tag,
    pub wifi_tag: Tag,
    pub learning_modal_active: bool,
    pub controls_enabled: bool,
    pub current_version: String,
    pub latest_release: Tag,
    pub update_available: bool,
}

impl Default for Page {
    fn default() -> Self {
        Page {
            elements: BTreeMap::new(),
            connection_tag: Tag::new(UNKNOWN_TAG_CLASSES, "Connecting"),
            mqtt_tag: unknown_tag("MQTT"),
            wifi_tag: unknown_tag("WiFi"),
            learning_modal_active: false,
            controls_enabled: false,
            current_version: UNKNOWN.to_string(),
            latest_release: Tag::new("", UNKNOWN),
            update_available: false,
        }
    }
}

impl Page {
    pub fn element(&self, name: &str) -> Option<&str> {
        self.elements.get(name).map(String::as_str)
    }

    // Shares the global control toggle, so it is only clickable while connected.
    pub fn update_button_enabled(&self) -> bool {
        self.update_available && self.controls_enabled
    }
}

fn unknown_tag(label: &str) -> Tag {
    Tag::new(UNKNOWN_TAG_CLASSES, &format!("{}: {}", label, UNKNOWN))
}

fn render_value(key: &str, value: &StatusValue) -> String {
    if key == CURRENT_VERSION_ID && value.as_i64() == Some(UNKNOWN_RELEASE) {
        return UNKNOWN.to_string();
    }
    value.to_string()
}

pub fn render_status(page: &mut Page, status: &DeviceStatus) {
    for (key, value) in status.iter() {
        page.elements.insert(key.clone(), render_value(key, value));
    }

    match status.learning() {
        Some(LearningState::Active) => page.learning_modal_active = true,
        Some(LearningState::Inactive) => page.learning_modal_active = false,
        None => {}
    }

    apply_tag(&mut page.mqtt_tag, status, MQTT_TAG_CLASSES, MQTT_TAG_TEXT);
    apply_tag(&mut page.wifi_tag, status, WIFI_TAG_CLASSES, WIFI_TAG_TEXT);

    page.connection_tag = Tag::new(CONNECTED_CLASSES, "Connected");
    page.controls_enabled = true;
}

fn apply_tag(tag: &mut Tag, status: &DeviceStatus, classes_key: &str, text_key: &str) {
    if let Some(classes) = status.get(classes_key) {
        tag.classes = classes.to_string();
    }
    if let Some(text) = status.get(text_key) {
        tag.text = text.to_string();
    }
}

pub fn render_disconnected(page: &mut Page) {
    page.connection_tag = Tag::new(DISCONNECTED_CLASSES, "FAILED");
    page.mqtt_tag = unknown_tag("MQTT");
    page.wifi_tag = unknown_tag("WiFi");
    page.controls_enabled = false;
}

pub fn render_installed_version(page: &mut Page, current: Option<ReleaseId>) {
    page.current_version = types::display_release(current);
}

pub fn render_version_check(page: &mut Page, versions: &VersionInfo) {
    match versions.newest {
        None => {
            page.latest_release = Tag::new("", UNKNOWN);
            page.update_available = false;
        }
        Some(newest) => {
            let update = versions.update_available();
            let class = if update { "is-success" } else { "is-light" };
            page.latest_release = Tag::new(class, &newest.to_string());
            page.update_available = update;
        }
    }
}
