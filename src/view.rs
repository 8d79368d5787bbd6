use std::fmt::Write;

use crate::page::{Page, Tag};
use crate::panel::{PanelEvents, PanelState};

fn tag_state(tag: &Tag) -> &'static str {
    if tag.has_class("is-success") {
        "ok"
    } else if tag.has_class("is-danger") {
        "down"
    } else if tag.has_class("is-warning") {
        "degraded"
    } else {
        "?"
    }
}

pub fn summary_line(state: &PanelState) -> String {
    let page = &state.page;
    let mut line = format!(
        "[{}] {} | {} | learning: {} | controls: {}",
        page.connection_tag.text,
        page.mqtt_tag.text,
        page.wifi_tag.text,
        if page.learning_modal_active { "ACTIVE" } else { "off" },
        if page.controls_enabled { "enabled" } else { "disabled" },
    );
    if let Some(firmware) = page.element("firmware_version") {
        let _ = write!(line, " | fw {}", firmware);
    }
    if page.update_button_enabled() {
        let _ = write!(line, " | update available: {}", page.latest_release.text);
    }
    if let Some(at) = state.last_refresh {
        let _ = write!(line, " | refreshed {}", at.format("%H:%M:%S"));
    }
    line
}

pub fn full_status(state: &PanelState) -> String {
    let page = &state.page;
    let mut out = String::new();
    let _ = writeln!(out, "connection: {} ({})", page.connection_tag.text, tag_state(&page.connection_tag));
    let _ = writeln!(out, "mqtt:       {} ({})", page.mqtt_tag.text, tag_state(&page.mqtt_tag));
    let _ = writeln!(out, "wifi:       {} ({})", page.wifi_tag.text, tag_state(&page.wifi_tag));
    let _ = writeln!(out, "installed:  {}", page.current_version);
    let _ = writeln!(out, "latest:     {}", page.latest_release.text);
    if page.learning_modal_active {
        let _ = writeln!(out, "learning from remote: point the remote at the device and press a button");
    }
    let width = page.elements.keys().map(String::len).max().unwrap_or(0);
    for (name, value) in &page.elements {
        let _ = writeln!(out, "  {:width$}  {}", name, value, width = width);
    }
    out.trim_end().to_string()
}

pub fn update_report(state: &PanelState) -> String {
    let page = &state.page;
    if !page.update_available {
        return format!(
            "installed release {}, latest release {}: no update offered",
            page.current_version, page.latest_release.text
        );
    }
    let mut report = format!(
        "release {} is available (installed: {})",
        page.latest_release.text, page.current_version
    );
    if let Some(release) = &state.latest_release {
        if !release.html_url.is_empty() {
            let kind = if release.prerelease { " (prerelease)" } else { "" };
            let _ = write!(report, "\n  {}{} {}", release.tag_name, kind, release.html_url);
        }
    }
    if !page.update_button_enabled() {
        report.push_str("\n  (device unreachable, update disabled)");
    }
    report
}

pub async fn run(events: PanelEvents) {
    let PanelEvents { mut state, mut alerts } = events;
    let mut shown: Option<Page> = None;

    loop {
        tokio::select! {
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = state.borrow_and_update().clone();
                if shown.as_ref() != Some(&snapshot.page) {
                    println!("{}", summary_line(&snapshot));
                    shown = Some(snapshot.page);
                }
            }
            alert = alerts.recv() => match alert {
                Some(message) => eprintln!("ALERT: {}", message),
                None => break,
            },
        }
    }
}
