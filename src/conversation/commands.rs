use std::str::FromStr;

use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Commands that can be typed in the chat loop with a leading slash.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, AsRefStr, IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
pub enum SlashCommand {
    /// Re-read the document list
    Docs,
    /// Show previously answered questions
    History,
    /// Start a fresh conversation
    Clear,
    /// Leave the chat
    Bye,
    /// Show help
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub command: SlashCommand,
    pub argument: Option<String>,
}

impl SlashCommand {
    /// User-visible description shown in help.
    pub fn description(self) -> &'static str {
        match self {
            SlashCommand::Docs => "refresh and list your uploaded documents",
            SlashCommand::History => "show your recent questions and answers",
            SlashCommand::Clear => "start a fresh conversation",
            SlashCommand::Bye => "leave the chat",
            SlashCommand::Help => "show available commands",
        }
    }

    /// Command string without the leading '/'.
    pub fn command(self) -> &'static str {
        self.into()
    }
}

/// Parse a slash command from user input
pub fn parse_slash_command(input: &str) -> Option<ParsedCommand> {
    let body = input.trim_start().strip_prefix('/')?;

    let mut parts = body.split_whitespace();
    let head = parts.next()?.to_lowercase();
    let rest: Vec<&str> = parts.collect();

    let command = SlashCommand::from_str(&head).ok().or_else(|| match head.as_str() {
        "q" | "quit" | "exit" => Some(SlashCommand::Bye),
        "d" | "documents" => Some(SlashCommand::Docs),
        "?" | "h" => Some(SlashCommand::Help),
        _ => None,
    })?;

    let argument = if rest.is_empty() {
        None
    } else {
        Some(rest.join(" "))
    };

    Some(ParsedCommand { command, argument })
}

/// Get help text for all available commands
pub fn get_help_text() -> String {
    let mut help = String::from("Available commands:\n\n");
    for command in SlashCommand::iter() {
        help.push_str(&format!("/{} - {}\n", command.command(), command.description()));
    }
    help.push_str("\nAliases: /q for /bye, /d for /docs, /? for /help");
    help
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_and_aliases() {
        assert_eq!(parse_slash_command("/docs").unwrap().command, SlashCommand::Docs);
        assert_eq!(parse_slash_command("  /Q").unwrap().command, SlashCommand::Bye);
        assert_eq!(parse_slash_command("/help me").unwrap().argument.as_deref(), Some("me"));
    }

    #[test]
    fn plain_text_and_unknown_commands_are_not_commands() {
        assert_eq!(parse_slash_command("what is /docs?"), None);
        assert_eq!(parse_slash_command("/frobnicate"), None);
        assert_eq!(parse_slash_command("/"), None);
    }

    #[test]
    fn help_lists_every_command() {
        let help = get_help_text();
        for command in SlashCommand::iter() {
            assert!(help.contains(&format!("/{}", command.command())));
        }
    }
}
