use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static COMMAND_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([a-z]+)(?:\s+(.*?))?\s*$").expect("valid command regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Goto(String),
    Open {
        url: Option<String>,
        target: Option<String>,
    },
    Push(Option<String>),
    Replace(Option<String>),
    Click {
        href: Option<String>,
        target: Option<String>,
    },
    Listen(String),
    Insert(String),
    Mutate,
    Classify(String),
    Video(u64),
    Play(u64),
    Fullscreen(Option<u64>),
    Status,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command `{0}`")]
    Unknown(String),
    #[error("`{0}` needs an argument")]
    MissingArgument(&'static str),
    #[error("`{command}` expects a numeric id, got `{value}`")]
    BadId { command: &'static str, value: String },
}

impl Command {
    /// Parses one input line. Blank lines and `#` comments yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(None);
        }
        let Some(caps) = COMMAND_REGEX.captures(trimmed) else {
            return Err(CommandError::Unknown(trimmed.to_string()));
        };
        let name = &caps[1];
        let rest = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
        let mut args = rest.split_whitespace().map(str::to_string);

        let command = match name {
            "goto" => Command::Goto(args.next().ok_or(CommandError::MissingArgument("goto"))?),
            "open" => Command::Open {
                url: args.next(),
                target: args.next(),
            },
            "push" => Command::Push(args.next()),
            "replace" => Command::Replace(args.next()),
            "click" => Command::Click {
                href: args.next(),
                target: args.next(),
            },
            "listen" => {
                Command::Listen(args.next().ok_or(CommandError::MissingArgument("listen"))?)
            }
            "insert" => {
                if rest.is_empty() {
                    return Err(CommandError::MissingArgument("insert"));
                }
                Command::Insert(rest.to_string())
            }
            "mutate" => Command::Mutate,
            "classify" => {
                Command::Classify(args.next().ok_or(CommandError::MissingArgument("classify"))?)
            }
            "video" => Command::Video(parse_id("video", args.next())?),
            "play" => Command::Play(parse_id("play", args.next())?),
            "fullscreen" => match args.next().as_deref() {
                None | Some("exit") => Command::Fullscreen(None),
                Some(id) => {
                    Command::Fullscreen(Some(parse_id("fullscreen", Some(id.to_string()))?))
                }
            },
            "status" => Command::Status,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(Some(command))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Goto(_) => "goto",
            Command::Open { .. } => "open",
            Command::Push(_) => "push",
            Command::Replace(_) => "replace",
            Command::Click { .. } => "click",
            Command::Listen(_) => "listen",
            Command::Insert(_) => "insert",
            Command::Mutate => "mutate",
            Command::Classify(_) => "classify",
            Command::Video(_) => "video",
            Command::Play(_) => "play",
            Command::Fullscreen(_) => "fullscreen",
            Command::Status => "status",
        }
    }
}

fn parse_id(command: &'static str, value: Option<String>) -> Result<u64, CommandError> {
    let value = value.ok_or(CommandError::MissingArgument(command))?;
    value
        .parse()
        .map_err(|_| CommandError::BadId { command, value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_navigation_commands() {
        assert_eq!(
            Command::parse("goto https://example.com/").unwrap(),
            Some(Command::Goto("https://example.com/".into()))
        );
        assert_eq!(
            Command::parse("  open https://ads.example/x _blank ").unwrap(),
            Some(Command::Open {
                url: Some("https://ads.example/x".into()),
                target: Some("_blank".into()),
            })
        );
        assert_eq!(Command::parse("push").unwrap(), Some(Command::Push(None)));
        assert_eq!(
            Command::parse("insert <div class=\"ad\">x</div>").unwrap(),
            Some(Command::Insert("<div class=\"ad\">x</div>".into()))
        );
    }

    #[test]
    fn skips_blank_and_comment_lines() {
        assert_eq!(Command::parse("   ").unwrap(), None);
        assert_eq!(Command::parse("# setup").unwrap(), None);
    }

    #[test]
    fn fullscreen_accepts_id_or_exit() {
        assert_eq!(
            Command::parse("fullscreen 3").unwrap(),
            Some(Command::Fullscreen(Some(3)))
        );
        assert_eq!(
            Command::parse("fullscreen exit").unwrap(),
            Some(Command::Fullscreen(None))
        );
    }

    #[test]
    fn reports_bad_input() {
        assert_eq!(
            Command::parse("teleport now"),
            Err(CommandError::Unknown("teleport".into()))
        );
        assert_eq!(
            Command::parse("goto"),
            Err(CommandError::MissingArgument("goto"))
        );
        assert!(matches!(
            Command::parse("video abc"),
            Err(CommandError::BadId { command: "video", .. })
        ));
        assert!(Command::parse("GOTO x").is_err());
    }
}
