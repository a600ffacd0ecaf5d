//! Slash commands understood by the chat REPL.

/// Every slash command, for completion and hints.
pub const COMMANDS: [&str; 14] = [
    "/help", "/new", "/list", "/select", "/delete", "/rename", "/history", "/agent", "/agents",
    "/confirm", "/sign", "/send", "/status", "/quit",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Help,
    Quit,
    New,
    List,
    /// Conversation id or 1-based position in `/list`.
    Select(String),
    /// Deletes the given conversation, or the active one.
    Delete(Option<String>),
    Rename(String),
    History,
    /// Switches agent, or shows the current one.
    Agent(Option<String>),
    Agents,
    /// Confirms the payment for an action id, or as a new attempt.
    Confirm(Option<String>),
    Sign(String),
    Send { to: String, amount: String },
    Status,
}

impl ReplCommand {
    /// Parses a REPL line.
    ///
    /// Returns `None` for ordinary chat input, and `Some(Err(usage))` for a
    /// malformed command.
    pub fn parse(line: &str) -> Option<Result<Self, String>> {
        let line = line.trim();
        if line == "quit" || line == "exit" {
            return Some(Ok(Self::Quit));
        }
        let body = line.strip_prefix('/')?;
        let (name, args) = match body.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (body, ""),
        };
        Some(Self::parse_command(name, args))
    }

    fn parse_command(name: &str, args: &str) -> Result<Self, String> {
        let arg = (!args.is_empty()).then(|| args.to_string());
        let required = |usage: &str| arg.clone().ok_or_else(|| format!("usage: {}", usage));

        let command = match name {
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            "new" => Self::New,
            "list" | "ls" => Self::List,
            "select" | "open" => Self::Select(required("/select <id | number>")?),
            "delete" | "rm" => Self::Delete(arg),
            "rename" => Self::Rename(required("/rename <title>")?),
            "history" => Self::History,
            "agent" => Self::Agent(arg),
            "agents" => Self::Agents,
            "confirm" => Self::Confirm(arg),
            "sign" => Self::Sign(required("/sign <message>")?),
            "send" => {
                let mut parts = args.split_whitespace();
                match (parts.next(), parts.next(), parts.next()) {
                    (Some(to), Some(amount), None) => Self::Send {
                        to: to.to_string(),
                        amount: amount.to_string(),
                    },
                    _ => return Err("usage: /send <address> <amount>".to_string()),
                }
            }
            "status" => Self::Status,
            other => return Err(format!("unknown command '/{}', try /help", other)),
        };
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_input_is_not_a_command() {
        assert_eq!(ReplCommand::parse("buy course"), None);
        assert_eq!(ReplCommand::parse("what is 1/2?"), None);
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(ReplCommand::parse("quit"), Some(Ok(ReplCommand::Quit)));
        assert_eq!(
            ReplCommand::parse("/select 2"),
            Some(Ok(ReplCommand::Select("2".into())))
        );
        assert_eq!(ReplCommand::parse("/delete"), Some(Ok(ReplCommand::Delete(None))));
        assert_eq!(
            ReplCommand::parse("/rename  Market notes "),
            Some(Ok(ReplCommand::Rename("Market notes".into())))
        );
        assert_eq!(
            ReplCommand::parse("/send 0xabc 0.5"),
            Some(Ok(ReplCommand::Send {
                to: "0xabc".into(),
                amount: "0.5".into()
            }))
        );
    }

    #[test]
    fn test_malformed_commands_report_usage() {
        assert!(matches!(ReplCommand::parse("/select"), Some(Err(_))));
        assert!(matches!(ReplCommand::parse("/send 0xabc"), Some(Err(_))));
        assert!(matches!(ReplCommand::parse("/frobnicate"), Some(Err(_))));
    }
}
