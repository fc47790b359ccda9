use anyhow::{anyhow, Result};
use arboard::Clipboard as Arboard;

/// System clipboard access for carrying signaling documents.
pub trait Clipboard {
    /// `Ok(None)` when the clipboard holds no text.
    fn get_text(&mut self) -> Result<Option<String>>;
    fn set_text(&mut self, text: String) -> Result<()>;
}

pub struct ArboardClipboard {
    inner: Arboard,
}

impl ArboardClipboard {
    pub fn new() -> Result<Self> {
        let inner = Arboard::new().map_err(|e| anyhow!("Failed to open clipboard: {}", e))?;
        Ok(Self { inner })
    }
}

impl Clipboard for ArboardClipboard {
    fn get_text(&mut self) -> Result<Option<String>> {
        match self.inner.get_text() {
            Ok(text) if text.trim().is_empty() => Ok(None),
            Ok(text) => Ok(Some(text)),
            Err(arboard::Error::ContentNotAvailable) => Ok(None),
            Err(e) => Err(anyhow!("Clipboard read failed: {}", e)),
        }
    }

    fn set_text(&mut self, text: String) -> Result<()> {
        self.inner
            .set_text(text)
            .map_err(|e| anyhow!("Clipboard write failed: {}", e))
    }
}

/// In-memory clipboard for tests.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryClipboard {
    pub text: Option<String>,
}

#[cfg(test)]
impl Clipboard for MemoryClipboard {
    fn get_text(&mut self) -> Result<Option<String>> {
        Ok(self.text.clone())
    }

    fn set_text(&mut self, text: String) -> Result<()> {
        self.text = Some(text);
        Ok(())
    }
}
