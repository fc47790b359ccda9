//! Parsing of chat-prompt input.

use std::path::PathBuf;

/// One line typed at the chat prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Generate an offer on a new connection.
    Offer,
    /// Answer the offer in the buffer, or in the given file.
    Answer(Option<PathBuf>),
    /// Apply the answer or reconnection offer in the buffer, or in the given file.
    Connect(Option<PathBuf>),
    Reconnect,
    Show,
    Copy,
    Paste,
    /// Start a multi-line paste into the buffer.
    Read,
    Save,
    Load(PathBuf),
    Status,
    Help,
    Quit,
    /// Anything that is not a command.
    Chat(String),
    Empty,
}

pub const HELP: &str = "\
Commands:
  /offer             generate an offer (you start the connection)
  /answer [file]     answer the offer in the buffer or in a file
  /connect [file]    apply the answer (or reconnection offer) in the buffer or a file
  /reconnect         generate an ICE-restart offer after the connection drops
  /show              print the document buffer
  /copy              copy the buffer to the clipboard
  /paste             replace the buffer with the clipboard contents
  /read              paste a document on stdin, end with a line containing only '.'
  /save              save the buffer as <type>_<millis>.json
  /load <file>       load a document into the buffer
  /status            show connection, chat and buffer state
  /help              show this help
  /quit              close the connection and exit
Anything else is sent to your peer as a chat message.";

/// Parse one prompt line. Unknown commands come back as an error message.
///
/// Chat text is kept exactly as typed; trimming only decides what the line is.
pub fn parse(line: &str) -> Result<Input, String> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(Input::Empty);
    }
    let Some(command) = trimmed.strip_prefix('/') else {
        return Ok(Input::Chat(line.to_string()));
    };

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, Some(rest.trim()).filter(|r| !r.is_empty())),
        None => (command, None),
    };
    let path = arg.map(PathBuf::from);

    let input = match name {
        "offer" => Input::Offer,
        "answer" => Input::Answer(path),
        "connect" => Input::Connect(path),
        "reconnect" => Input::Reconnect,
        "show" => Input::Show,
        "copy" => Input::Copy,
        "paste" => Input::Paste,
        "read" => Input::Read,
        "save" => Input::Save,
        "load" => Input::Load(path.ok_or_else(|| "usage: /load <file>".to_string())?),
        "status" => Input::Status,
        "help" | "?" => Input::Help,
        "quit" | "exit" => Input::Quit,
        other => return Err(format!("Unknown command /{other}. Type /help for commands.")),
    };
    Ok(input)
}
