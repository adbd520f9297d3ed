//! Slash commands understood by the lobby.
//!
//! The table is a plain value built once (usually with
//! [`CommandTable::standard`]) and handed to the engine, so tests and
//! embedders can see exactly what is available.

use std::collections::BTreeMap;

/// What a command does once dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandAction {
    Connect,
    Disconnect,
    Players,
    SetName,
    Ready,
    Help,
    Exit,
}

/// One row of the command table.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub description: String,
    /// Argument synopsis shown by `/help`, e.g. `["[address]", "[port]"]`.
    pub arguments: Vec<String>,
    /// Most arguments the command accepts.
    pub max_args: usize,
    pub action: CommandAction,
}

/// Name → command, kept sorted so `/help` is alphabetical.
#[derive(Debug, Clone, Default)]
pub struct CommandTable {
    commands: BTreeMap<String, CommandSpec>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The full lobby command set, including the `/con` and `/disc`
    /// aliases.
    pub fn standard() -> Self {
        let mut table = Self::new();
        table.insert(
            "/connect",
            "Connect to server. Default: localhost:8765",
            &["[address]", "[port]"],
            CommandAction::Connect,
        );
        table.insert(
            "/con",
            "Alias of /connect",
            &["[address]", "[port]"],
            CommandAction::Connect,
        );
        table.insert(
            "/disconnect",
            "Disconnect from server",
            &[],
            CommandAction::Disconnect,
        );
        table.insert("/disc", "Alias of /disconnect", &[], CommandAction::Disconnect);
        table.insert("/players", "List players", &[], CommandAction::Players);
        table.insert(
            "/setname",
            "Set your name, or print if no argument",
            &["[NAME]"],
            CommandAction::SetName,
        );
        table.insert("/ready", "Send ready signal", &["[false]"], CommandAction::Ready);
        table.insert("/help", "Show help", &[], CommandAction::Help);
        table.insert("/exit", "Close application", &[], CommandAction::Exit);
        table
    }

    /// Adds or replaces a command. `max_args` is the number of
    /// `arguments`.
    pub fn insert(
        &mut self,
        name: &str,
        description: &str,
        arguments: &[&str],
        action: CommandAction,
    ) {
        self.commands.insert(
            name.to_string(),
            CommandSpec {
                description: description.to_string(),
                arguments: arguments.iter().map(|a| a.to_string()).collect(),
                max_args: arguments.len(),
                action,
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&CommandSpec> {
        self.commands.get(name)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// `name [args]: description` for every command, alphabetically.
    pub fn help_lines(&self) -> Vec<String> {
        self.commands
            .iter()
            .map(|(name, spec)| {
                if spec.arguments.is_empty() {
                    format!("{name}: {}", spec.description)
                } else {
                    format!("{name} {}: {}", spec.arguments.join(" "), spec.description)
                }
            })
            .collect()
    }

    /// Usage string for error replies, e.g. `/ready [false]`.
    pub fn usage(&self, name: &str) -> Option<String> {
        let spec = self.get(name)?;
        Some(if spec.arguments.is_empty() {
            name.to_string()
        } else {
            format!("{name} {}", spec.arguments.join(" "))
        })
    }
}

/// One line of user input, split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputLine<'a> {
    /// Whitespace only.
    Empty,
    /// Starts with `/`.
    Command { name: &'a str, args: Vec<&'a str> },
    /// Anything else, sent as chat verbatim.
    Chat(&'a str),
}

impl<'a> InputLine<'a> {
    pub fn parse(line: &'a str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Self::Empty;
        }
        if trimmed.starts_with('/') {
            let mut words = trimmed.split_whitespace();
            let name = words.next().unwrap_or(trimmed);
            return Self::Command {
                name,
                args: words.collect(),
            };
        }
        Self::Chat(line.trim_end_matches(['\r', '\n']))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_table_has_all_commands() {
        let table = CommandTable::standard();
        assert_eq!(table.len(), 9);
        assert_eq!(table.get("/con").unwrap().action, CommandAction::Connect);
        assert_eq!(table.get("/disc").unwrap().action, CommandAction::Disconnect);
        assert_eq!(table.get("/connect").unwrap().max_args, 2);
        assert_eq!(table.get("/ready").unwrap().max_args, 1);
        assert!(table.get("/quit").is_none());
    }

    #[test]
    fn test_help_lines_are_alphabetical() {
        let lines = CommandTable::standard().help_lines();
        let names: Vec<_> = lines
            .iter()
            .map(|l| l.split([' ', ':']).next().unwrap())
            .collect();
        assert_eq!(
            names,
            [
                "/con",
                "/connect",
                "/disc",
                "/disconnect",
                "/exit",
                "/help",
                "/players",
                "/ready",
                "/setname"
            ]
        );
        assert!(lines.contains(&"/ready [false]: Send ready signal".to_string()));
        assert!(lines.contains(&"/help: Show help".to_string()));
    }

    #[test]
    fn test_usage_includes_arguments() {
        let table = CommandTable::standard();
        assert_eq!(table.usage("/setname").as_deref(), Some("/setname [NAME]"));
        assert_eq!(table.usage("/players").as_deref(), Some("/players"));
        assert_eq!(table.usage("/nope"), None);
    }

    #[test]
    fn test_parse_command_splits_arguments() {
        assert_eq!(
            InputLine::parse("/connect  example.org 9000 "),
            InputLine::Command {
                name: "/connect",
                args: vec!["example.org", "9000"]
            }
        );
    }

    #[test]
    fn test_parse_chat_and_empty() {
        assert_eq!(InputLine::parse("   "), InputLine::Empty);
        assert_eq!(InputLine::parse("gl hf"), InputLine::Chat("gl hf"));
    }
}
