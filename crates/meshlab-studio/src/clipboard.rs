use meshlab_core::export::ExportError;

/// Destination for copied text.
pub trait TextClipboard {
    fn set_text(&mut self, text: String) -> Result<(), ExportError>;
}

/// The OS clipboard via `arboard`.
///
/// A fresh handle is opened per copy; on X11 the contents stay available
/// only while some handle is alive, so the last one is kept.
#[derive(Default)]
pub struct SystemClipboard {
    handle: Option<arboard::Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TextClipboard for SystemClipboard {
    fn set_text(&mut self, text: String) -> Result<(), ExportError> {
        let mut cb = arboard::Clipboard::new().map_err(|e| ExportError::Clipboard(e.to_string()))?;
        cb.set_text(text)
            .map_err(|e| ExportError::Clipboard(e.to_string()))?;
        self.handle = Some(cb);
        Ok(())
    }
}
