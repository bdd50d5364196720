//! REPL-only meta-commands, checked before a line is tokenized and
//! forwarded to the engine's dispatcher.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaCommand {
    Quit,
    Clear,
    Help { command: Option<String> },
}

pub fn check_meta_command(line: &str) -> Option<MetaCommand> {
    let trimmed = line.trim();
    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let cmd = parts.next()?.to_ascii_lowercase();

    match cmd.as_str() {
        "quit" | "exit" => Some(MetaCommand::Quit),
        "clear" => Some(MetaCommand::Clear),
        "help" => Some(MetaCommand::Help { command: parts.next().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_quit_and_exit() {
        assert_eq!(check_meta_command("quit"), Some(MetaCommand::Quit));
        assert_eq!(check_meta_command("exit"), Some(MetaCommand::Quit));
    }

    #[test]
    fn help_captures_optional_command_name() {
        assert_eq!(check_meta_command("help"), Some(MetaCommand::Help { command: None }));
        assert_eq!(check_meta_command("help GET"), Some(MetaCommand::Help { command: Some("GET".to_string()) }));
    }

    #[test]
    fn ordinary_commands_are_not_meta() {
        assert_eq!(check_meta_command("SET k v"), None);
    }
}
