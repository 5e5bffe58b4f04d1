// Normalized view of a command invocation from either surface

/// A command invocation, independent of where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Prefix command typed in chat; `args` excludes the command name
    Textual { raw: String, args: Vec<String> },
    /// Slash command with arguments already typed by Discord
    Structured {
        subcommand: Option<String>,
        options: Vec<(String, String)>,
    },
}

impl Invocation {
    pub fn structured(subcommand: Option<&str>, options: Vec<(&str, String)>) -> Self {
        Invocation::Structured {
            subcommand: subcommand.map(str::to_string),
            options: options
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        }
    }

    /// How the user typed it, for logs
    pub fn describe(&self) -> String {
        match self {
            Invocation::Textual { raw, .. } => raw.clone(),
            Invocation::Structured {
                subcommand,
                options,
            } => {
                let mut parts: Vec<String> = subcommand.iter().cloned().collect();
                parts.extend(options.iter().map(|(name, value)| format!("{}:{}", name, value)));
                parts.join(" ")
            }
        }
    }

    /// Named option of a structured invocation
    pub fn option(&self, name: &str) -> Option<&str> {
        match self {
            Invocation::Structured { options, .. } => options
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str()),
            Invocation::Textual { .. } => None,
        }
    }
}

/// The parts of a chat message the text surface cares about
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub author_is_bot: bool,
    pub guild_id: Option<String>,
    pub content: String,
}

/// Split `content` into a lower-cased command name and its arguments.
///
/// Returns `None` when the prefix is missing or nothing follows it.
pub fn parse_command(prefix: &str, content: &str) -> Option<(String, Vec<String>)> {
    let rest = content.strip_prefix(prefix)?;
    let mut tokens = rest.split_whitespace();
    let name = tokens.next()?.to_lowercase();
    Some((name, tokens.map(str::to_string).collect()))
}
