use std::sync::Arc;
use std::time::Duration;

use crate::command::{Command, HELP};
use crate::config::Config;
use crate::dispatch::ActionDispatcher;
use crate::net::{DeviceApi, ReleaseFeed};
use crate::panel::{Panel, PanelEvents};
use crate::poller::{PollHandle, StatusPoller};
use crate::update::UpdateChecker;
use crate::view;

pub enum Outcome {
    Continue(Option<String>),
    Quit,
}

pub struct App {
    panel: Panel,
    poller: Arc<StatusPoller>,
    dispatcher: ActionDispatcher,
    checker: UpdateChecker,
}

impl App {
    pub fn new(
        device: Arc<dyn DeviceApi>,
        feed: Arc<dyn ReleaseFeed>,
        config: &Config,
    ) -> (App, PanelEvents) {
        let (panel, events) = Panel::new();
        let poller = Arc::new(StatusPoller::new(device.clone(), panel.clone()));
        let dispatcher = ActionDispatcher::new(device.clone(), poller.clone(), panel.clone());
        let checker = UpdateChecker::new(device, feed, panel.clone(), config.include_prereleases);
        let app = App {
            panel,
            poller,
            dispatcher,
            checker,
        };
        (app, events)
    }

    // Version check runs to completion before polling starts.
    pub async fn start(&self, poll_interval: Duration) -> PollHandle {
        self.checker.check().await;
        Arc::clone(&self.poller).start(poll_interval)
    }

    pub async fn execute(&self, command: Command) -> Outcome {
        if command.needs_controls() && !self.panel.snapshot().page.controls_enabled {
            return Outcome::Continue(Some(
                "device is not connected, controls are disabled".to_string(),
            ));
        }

        let message = match command {
            Command::Set { key, value } => {
                match self.dispatcher.send_action(&key, &value).await {
                    Ok(()) => None,
                    Err(e) => Some(format!("action {}={} failed: {}", key, value, e)),
                }
            }
            Command::LearnStart => self.dispatcher.start_learning().await.err().map(|_| {
                "could not start learning mode".to_string()
            }),
            Command::LearnStop => self.dispatcher.stop_learning().await.err().map(|_| {
                "could not stop learning mode".to_string()
            }),
            Command::Update => {
                self.checker.check().await;
                Some(view::update_report(&self.panel.snapshot()))
            }
            Command::Status => Some(view::full_status(&self.panel.snapshot())),
            Command::Help => Some(HELP.to_string()),
            Command::Quit => return Outcome::Quit,
        };
        Outcome::Continue(message)
    }
}
