//! The interactive chat session.

use std::io::Write;
use std::path::{Path, PathBuf};

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, warn};

use handoff_core::{Session, SessionEvent, SignalError, SignalingDocument};

use crate::clipboard::Clipboard;
use crate::commands::{self, Input, HELP};
use crate::console::{render_event, render_status, DocumentBuffer, PasteReader};
use crate::files;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct App<W: Write> {
    session: Session,
    events: UnboundedReceiver<SessionEvent>,
    buffer: DocumentBuffer,
    clipboard: Option<Box<dyn Clipboard>>,
    save_dir: PathBuf,
    paste: Option<PasteReader>,
    out: W,
}

impl<W: Write> App<W> {
    pub fn new(
        session: Session,
        events: UnboundedReceiver<SessionEvent>,
        clipboard: Option<Box<dyn Clipboard>>,
        save_dir: PathBuf,
        out: W,
    ) -> Self {
        Self {
            session,
            events,
            buffer: DocumentBuffer::default(),
            clipboard,
            save_dir,
            paste: None,
            out,
        }
    }

    /// Wait for the next event from the connection hooks.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events.recv().await
    }

    pub fn handle_event(&mut self, event: SessionEvent) {
        if let Some(event) = self.session.handle_event(event) {
            if let Some(line) = render_event(&event) {
                self.write_line(&line);
            }
        }
    }

    /// Process one line of terminal input.
    pub async fn handle_line(&mut self, line: &str) -> Flow {
        let flow = match self.paste.as_mut() {
            Some(reader) => {
                if let Some(text) = reader.push(line) {
                    self.paste = None;
                    self.buffer.set(text);
                    self.say("Document read into the buffer.");
                }
                Flow::Continue
            }
            None => match commands::parse(line) {
                Ok(input) => self.run(input).await,
                Err(message) => {
                    self.say(message);
                    Flow::Continue
                }
            },
        };
        self.flush_events();
        flow
    }

    pub async fn shutdown(&mut self) {
        self.session.close().await;
        self.flush_events();
    }

    async fn run(&mut self, input: Input) -> Flow {
        match input {
            Input::Empty => {}
            Input::Chat(text) => {
                if self.session.send_chat(&text).await {
                    self.say(format!("Me: {text}"));
                }
            }
            Input::Offer => {
                let result = self.session.start_offer().await;
                self.present(result);
            }
            Input::Answer(path) => {
                if let Some(text) = self.document_text(
                    path.as_deref(),
                    "Paste or load your peer's offer first (/paste, /read or /load).",
                ) {
                    let result = self.session.accept_offer(&text).await;
                    self.present(result);
                }
            }
            Input::Connect(path) => {
                if let Some(text) = self.document_text(
                    path.as_deref(),
                    "Paste or load the answer (or reconnection offer) first.",
                ) {
                    if let Err(e) = self.session.complete(&text).await {
                        self.report(e);
                    }
                }
            }
            Input::Reconnect => match self.session.reconnect().await {
                Ok(Some(document)) => self.present(Ok(document)),
                Ok(None) => {}
                Err(e) => debug!(error = %e, "reconnect failed"),
            },
            Input::Show => match self.buffer.get().map(str::to_string) {
                Some(text) => self.say(text),
                None => self.say("The document buffer is empty."),
            },
            Input::Copy => self.copy(),
            Input::Paste => self.paste_clipboard(),
            Input::Read => {
                self.paste = Some(PasteReader::default());
                self.say("Paste the document, then a line containing only '.'.");
            }
            Input::Save => self.save(),
            Input::Load(path) => match files::load_snapshot(&path) {
                Ok(text) => {
                    self.buffer.set(text);
                    self.say(format!("Loaded \"{}\".", path.display()));
                }
                Err(e) => self.say(format!("{e:#}")),
            },
            Input::Status => {
                let line = render_status(
                    self.session.connection_state(),
                    self.session.channel_state(),
                    &self.buffer,
                );
                self.say(line);
            }
            Input::Help => self.say(HELP),
            Input::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    fn document_text(&mut self, path: Option<&Path>, missing: &str) -> Option<String> {
        match path {
            Some(path) => match files::load_snapshot(path) {
                Ok(text) => {
                    self.buffer.set(text.clone());
                    Some(text)
                }
                Err(e) => {
                    self.say(format!("{e:#}"));
                    None
                }
            },
            None => {
                let text = self.buffer.get().map(str::to_string);
                if text.is_none() {
                    self.say(missing);
                }
                text
            }
        }
    }

    /// Put a generated document in the buffer and print it.
    fn present(&mut self, result: handoff_core::Result<SignalingDocument>) {
        let encoded = result.and_then(|document| document.encode());
        match encoded {
            Ok(text) => {
                self.buffer.set(text.clone());
                self.say(text);
            }
            Err(e) => self.report(e),
        }
    }

    fn report(&mut self, error: SignalError) {
        warn!(error = %error, "command failed");
        self.say(format!("Error: {error}"));
    }

    fn copy(&mut self) {
        let Some(text) = self.buffer.get().map(str::to_string) else {
            self.say("Nothing to copy.");
            return;
        };
        let Some(clipboard) = self.clipboard.as_mut() else {
            self.say("Clipboard is not available; use /show or /save instead.");
            return;
        };
        match clipboard.set_text(text) {
            Ok(()) => self.say("Document copied to the clipboard."),
            Err(e) => self.say(format!("{e:#}")),
        }
    }

    fn paste_clipboard(&mut self) {
        let Some(clipboard) = self.clipboard.as_mut() else {
            self.say("Clipboard is not available; use /read or /load instead.");
            return;
        };
        match clipboard.get_text() {
            Ok(Some(text)) => {
                self.buffer.set(text);
                self.say("Clipboard pasted into the buffer.");
            }
            Ok(None) => self.say("The clipboard is empty."),
            Err(e) => self.say(format!("{e:#}")),
        }
    }

    fn save(&mut self) {
        let Some(text) = self.buffer.get().map(str::to_string) else {
            self.say("Nothing to save.");
            return;
        };
        match files::save_snapshot(&self.save_dir, &text) {
            Ok(path) => self.say(format!("Saved as {}", path.display())),
            Err(e) => self.say(format!("{e:#}")),
        }
    }

    /// Print a line after anything the hooks reported in the meantime.
    fn say(&mut self, line: impl AsRef<str>) {
        self.flush_events();
        self.write_line(line.as_ref());
    }

    fn flush_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.handle_event(event);
        }
    }

    fn write_line(&mut self, line: &str) {
        if let Err(e) = writeln!(self.out, "{line}").and_then(|_| self.out.flush()) {
            debug!(error = %e, "terminal write failed");
        }
    }
}

#[cfg(test)]
impl App<Vec<u8>> {
    fn transcript(&mut self) -> String {
        String::from_utf8_lossy(&std::mem::take(&mut self.out)).into_owned()
    }
}
