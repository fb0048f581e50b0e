//! Clipboard platforms.
//!
//! A platform accepts a set of items whose payloads are produced lazily and
//! only completes once those payloads have settled.

use std::future::Future;
use std::io::Write;
use std::sync::Arc;

use base64::Engine;
use parking_lot::Mutex;

use crate::deferred::DeferredValue;
use crate::error::ClipboardError;

pub const TEXT_PLAIN: &str = "text/plain";

/// Raw clipboard payload with its MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Blob {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            mime_type: TEXT_PLAIN.to_string(),
            bytes: text.into().into_bytes(),
        }
    }

    /// UTF-8 view of the bytes, if valid.
    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.bytes).ok()
    }
}

/// One MIME type and its not-yet-available payload.
#[derive(Debug)]
pub struct ClipboardItem {
    pub mime_type: String,
    pub payload: DeferredValue<Blob, String>,
}

impl ClipboardItem {
    pub fn new(mime_type: impl Into<String>, payload: DeferredValue<Blob, String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            payload,
        }
    }
}

/// A system clipboard that takes lazily produced payloads.
///
/// `write` commits to the write immediately and waits for the payloads. A
/// rejected payload fails the write.
pub trait ClipboardPlatform: Send + Sync + 'static {
    fn write(
        &self,
        items: Vec<ClipboardItem>,
    ) -> impl Future<Output = Result<(), ClipboardError>> + Send;
}

/// Waits for the first `text/plain` item and returns its text.
async fn settle_text(items: Vec<ClipboardItem>) -> Result<String, ClipboardError> {
    let mut text = None;
    for item in items {
        let blob = item
            .payload
            .await
            .map_err(|e| ClipboardError::Platform(e.to_string()))?;

        if item.mime_type != TEXT_PLAIN {
            tracing::debug!("Ignoring clipboard item of type {}", item.mime_type);
            continue;
        }
        if text.is_none() {
            let decoded = blob
                .as_text()
                .ok_or_else(|| ClipboardError::Platform("payload is not valid UTF-8".into()))?;
            text = Some(decoded.to_string());
        }
    }
    text.ok_or_else(|| ClipboardError::Platform("no text/plain item supplied".into()))
}

/// Clipboard kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    contents: Mutex<Option<String>>,
    failure: Option<String>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clipboard that accepts payloads but then refuses every write.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            contents: Mutex::new(None),
            failure: Some(message.into()),
        }
    }

    /// Last text written, if any.
    pub fn contents(&self) -> Option<String> {
        self.contents.lock().clone()
    }
}

impl ClipboardPlatform for MemoryClipboard {
    async fn write(&self, items: Vec<ClipboardItem>) -> Result<(), ClipboardError> {
        let text = settle_text(items).await?;
        if let Some(message) = &self.failure {
            return Err(ClipboardError::Platform(message.clone()));
        }
        *self.contents.lock() = Some(text);
        Ok(())
    }
}

/// Clipboard reached through the terminal's OSC 52 escape sequence.
pub struct Osc52Clipboard {
    output: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl Osc52Clipboard {
    pub fn stdout() -> Self {
        Self::with_writer(std::io::stdout())
    }

    pub fn with_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            output: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// OSC 52 ; c ; base64-data BEL
    pub fn encode(text: &str) -> String {
        let data = base64::engine::general_purpose::STANDARD.encode(text.as_bytes());
        format!("\x1b]52;c;{}\x07", data)
    }
}

impl ClipboardPlatform for Osc52Clipboard {
    async fn write(&self, items: Vec<ClipboardItem>) -> Result<(), ClipboardError> {
        let text = settle_text(items).await?;
        let sequence = Self::encode(&text);

        let mut output = self.output.lock();
        output.write_all(sequence.as_bytes())?;
        output.flush()?;
        tracing::debug!("Sent {} bytes to terminal clipboard", text.len());
        Ok(())
    }
}
