use anyhow::Result;
use std::env;
use std::sync::Arc;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

mod app;
mod command;
mod config;
mod dispatch;
mod error;
mod net;
mod page;
mod panel;
mod poller;
mod types;
mod update;
mod view;

#[cfg(test)]
mod testing;

use app::{App, Outcome};
use command::Command;
use config::Config;
use net::{GithubReleases, HttpDevice};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if env::var("LOG_FORMAT").map(|v| v == "json").unwrap_or(false) {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = match Config::load_from_file()? {
        Some(config) => {
            log::info!("Loaded config from file");
            config
        }
        None => Config::from_env()?,
    };
    log::info!("Control panel starting with config: {:?}", config);

    let device = Arc::new(HttpDevice::new(&config)?);
    let feed = Arc::new(GithubReleases::new(&config)?);
    let (app, events) = App::new(device, feed, &config);

    let view = tokio::spawn(view::run(events));
    let poll = app.start(config.poll_interval()).await;
    println!("{}", command::HELP);

    let mut lines = BufReader::new(io::stdin()).lines();
    let mut stdin_open = true;
    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        log::info!("stdin closed, panel keeps polling until interrupted");
                        stdin_open = false;
                        continue;
                    }
                    Err(e) => {
                        log::error!("Failed to read command: {}", e);
                        stdin_open = false;
                        continue;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<Command>() {
                    Ok(command) => match app.execute(command).await {
                        Outcome::Continue(Some(message)) => println!("{}", message),
                        Outcome::Continue(None) => {}
                        Outcome::Quit => break,
                    },
                    Err(e) => println!("{}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted");
                break;
            }
        }
    }

    poll.cancel().await;
    view.abort();
    log::info!("Control panel stopped");
    Ok(())
}
