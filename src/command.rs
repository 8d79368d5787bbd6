use std::str::FromStr;
use thiserror::Error;

pub const HELP: &str = "\
commands:
  set <key> <value>   change one device setting
  learn start|stop    enter or leave learn-from-remote mode
  update              re-check for a newer firmware release
  status              print every status field
  help                show this text
  quit                exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Set { key: String, value: String },
    LearnStart,
    LearnStop,
    Update,
    Status,
    Help,
    Quit,
}

impl Command {
    pub fn needs_controls(&self) -> bool {
        matches!(
            self,
            Command::Set { .. } | Command::LearnStart | Command::LearnStop
        )
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}', try 'help'")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let verb = words.next().ok_or(CommandError::Empty)?;
        let rest: Vec<&str> = words.collect();

        match (verb.to_ascii_lowercase().as_str(), rest.as_slice()) {
            ("set", [key, value @ ..]) if !value.is_empty() => Ok(Command::Set {
                key: key.to_string(),
                value: value.join(" "),
            }),
            ("set", _) => Err(CommandError::Usage("set <key> <value>")),
            ("learn", ["start"]) => Ok(Command::LearnStart),
            ("learn", ["stop"]) => Ok(Command::LearnStop),
            ("learn", _) => Err(CommandError::Usage("learn start|stop")),
            ("update", []) => Ok(Command::Update),
            ("status", []) => Ok(Command::Status),
            ("help", _) | ("?", _) => Ok(Command::Help),
            ("quit", []) | ("exit", []) => Ok(Command::Quit),
            _ => Err(CommandError::Unknown(line.trim().to_string())),
        }
    }
}
