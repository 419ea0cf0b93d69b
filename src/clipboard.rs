use anyhow::{Context, Result};
use arboard::Clipboard;

/// Read the current clipboard text.
///
/// Returns an error if the clipboard is unavailable or holds no text.
pub fn read_clipboard() -> Result<String> {
    let mut clipboard = Clipboard::new().context("Failed to access system clipboard")?;
    clipboard
        .get_text()
        .context("Failed to read text from clipboard")
}

/// Copy text to the system clipboard.
///
/// On Linux, clipboard contents persist while the application is running.
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    let mut clipboard = Clipboard::new().context("Failed to access system clipboard")?;
    clipboard
        .set_text(text)
        .context("Failed to copy text to clipboard")?;
    Ok(())
}
