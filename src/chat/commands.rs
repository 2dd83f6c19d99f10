//! Backslash command parsing for the shell.
//!
//! Commands start with `\` and control the session without being sent to
//! the service.  A leading `/` is left alone because it names a local path.

/// A parsed shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    /// Cycle the instruction profile (std, short, custom).
    NextInstruction,

    /// Set and activate the custom instruction.
    System(String),

    /// Toggle search grounding.
    ToggleGoogleSearch,

    /// Toggle URL context.
    ToggleUrlContext,

    /// Cycle to the next model, or switch to a named one.
    Model(Option<String>),

    /// Clear the conversation history.
    Clear,

    /// Display session statistics.
    Stats,

    /// Save the transcript to a file.
    SaveTranscript(String),

    /// Load a transcript from a file.
    LoadTranscript(String),

    /// Display help information.
    Help,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for backslash commands.
///
/// Returns `Some(ShellCommand)` if the input is a command, or `None` if it
/// should be dispatched further.
///
/// # Examples
///
/// ```
/// # use gemshell::chat::{ShellCommand, parse_command};
/// assert_eq!(parse_command("\\search"), Some(ShellCommand::ToggleGoogleSearch));
/// assert!(parse_command("/etc/hosts").is_none());
/// assert!(parse_command("What is Rust?").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ShellCommand> {
    let input = input.trim();
    let rest = input.strip_prefix('\\')?;

    let mut parts = rest.splitn(2, char::is_whitespace);
    let command = parts.next().unwrap_or_default().to_lowercase();
    let argument = parts.next().map(str::trim).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "short" | "instruction" => no_argument(argument, ShellCommand::NextInstruction, "\\short"),
        "system" | "" => match argument {
            Some(text) => ShellCommand::System(text.to_string()),
            None => ShellCommand::Invalid("\\system requires an instruction".to_string()),
        },
        "search" | "google" => no_argument(argument, ShellCommand::ToggleGoogleSearch, "\\search"),
        "url" => no_argument(argument, ShellCommand::ToggleUrlContext, "\\url"),
        "model" => ShellCommand::Model(argument.map(str::to_string)),
        "clear" => no_argument(argument, ShellCommand::Clear, "\\clear"),
        "stats" | "status" => ShellCommand::Stats,
        "save" => match argument {
            Some(arg) => ShellCommand::SaveTranscript(arg.to_string()),
            None => ShellCommand::Invalid("\\save requires a file path".to_string()),
        },
        "load" => match argument {
            Some(arg) => ShellCommand::LoadTranscript(arg.to_string()),
            None => ShellCommand::Invalid("\\load requires a file path".to_string()),
        },
        "help" | "?" => ShellCommand::Help,
        _ => ShellCommand::Invalid(format!("Unknown command: \\{command}")),
    };

    Some(result)
}

fn no_argument(argument: Option<&str>, command: ShellCommand, name: &str) -> ShellCommand {
    match argument {
        None => command,
        Some(_) => ShellCommand::Invalid(format!("{name} takes no argument")),
    }
}

/// Returns help text describing the shell.
pub fn help_text() -> &'static str {
    r#"Type a question to ask the model, or:
  <path>                 Attach a local file (pdf, image, video, audio, text)
  <url>                  Attach a remote document
  <video link>           Attach a video by link
  exit | quit            Leave the shell (or Ctrl-D)

Commands:
  \short                 Cycle instruction profile (std, short, custom)
  \system <text>         Set and use a custom instruction (also \ <text>)
  \search                Toggle Google search grounding
  \url                   Toggle URL context
  \model [name]          Cycle models (pro, flash, lite) or pick one
  \clear                 Clear conversation history
  \stats                 Show session status
  \save <file>           Save the conversation to a file
  \load <file>           Load a conversation from a file
  \help                  Show this help message

Fenced ```json blocks in answers are extracted and printed after the answer."#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_toggles() {
        assert_eq!(parse_command("\\short"), Some(ShellCommand::NextInstruction));
        assert_eq!(parse_command("  \\SEARCH "), Some(ShellCommand::ToggleGoogleSearch));
        assert_eq!(parse_command("\\url"), Some(ShellCommand::ToggleUrlContext));
        assert_eq!(parse_command("\\clear"), Some(ShellCommand::Clear));
        assert!(matches!(
            parse_command("\\clear everything"),
            Some(ShellCommand::Invalid(msg)) if msg.contains("no argument")
        ));
    }

    #[test]
    fn parse_model() {
        assert_eq!(parse_command("\\model"), Some(ShellCommand::Model(None)));
        assert_eq!(
            parse_command("\\model   pro  "),
            Some(ShellCommand::Model(Some("pro".to_string())))
        );
    }

    #[test]
    fn parse_system() {
        assert_eq!(
            parse_command("\\system answer in German"),
            Some(ShellCommand::System("answer in German".to_string()))
        );
        assert_eq!(
            parse_command("\\ answer in German"),
            Some(ShellCommand::System("answer in German".to_string()))
        );
        assert!(matches!(
            parse_command("\\system"),
            Some(ShellCommand::Invalid(msg)) if msg.contains("requires")
        ));
        assert!(matches!(parse_command("\\"), Some(ShellCommand::Invalid(_))));
    }

    #[test]
    fn parse_transcript_commands() {
        assert_eq!(
            parse_command("\\save session.json"),
            Some(ShellCommand::SaveTranscript("session.json".to_string()))
        );
        assert_eq!(
            parse_command("\\load session.json"),
            Some(ShellCommand::LoadTranscript("session.json".to_string()))
        );
        assert!(matches!(
            parse_command("\\save"),
            Some(ShellCommand::Invalid(_))
        ));
    }

    #[test]
    fn unknown_command() {
        assert_eq!(
            parse_command("\\frobnicate"),
            Some(ShellCommand::Invalid("Unknown command: \\frobnicate".to_string()))
        );
    }

    #[test]
    fn non_commands() {
        assert_eq!(parse_command("Hello, Gemini!"), None);
        assert_eq!(parse_command("/etc/hosts"), None);
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("  "), None);
        assert_eq!(parse_command("a \\short"), None);
    }

    #[test]
    fn help_text_not_empty() {
        let help = help_text();
        assert!(help.contains("\\short"));
        assert!(help.contains("\\search"));
        assert!(help.contains("exit"));
    }
}
