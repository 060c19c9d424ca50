//! Screen geometry.

use std::fmt;

/// Columns taken by the left and right margins.
pub const HORIZONTAL_MARGIN: u16 = 4;

/// Rows of the input editor.
pub const INPUT_HEIGHT: u16 = 4;

/// Rows around the transcript: margins, gap, error line, input border,
/// status line and help line.
pub const CHROME_HEIGHT: u16 = 8;

/// Terminal too small to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutError {
    pub width: u16,
    pub height: u16,
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "terminal size too small ({}x{}, need at least {}x{})",
            self.width,
            self.height,
            HORIZONTAL_MARGIN + 1,
            CHROME_HEIGHT + INPUT_HEIGHT + 1
        )
    }
}

impl std::error::Error for LayoutError {}

/// Transcript viewport dimensions derived from the terminal size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub transcript_width: u16,
    pub transcript_height: u16,
}

impl Layout {
    /// # Errors
    /// Returns `LayoutError` when either transcript dimension would be non-positive.
    pub fn compute(width: u16, height: u16) -> Result<Self, LayoutError> {
        let transcript_width = width.checked_sub(HORIZONTAL_MARGIN).filter(|w| *w > 0);
        let transcript_height = height
            .checked_sub(CHROME_HEIGHT + INPUT_HEIGHT)
            .filter(|h| *h > 0);

        match (transcript_width, transcript_height) {
            (Some(transcript_width), Some(transcript_height)) => Ok(Self {
                transcript_width,
                transcript_height,
            }),
            _ => Err(LayoutError { width, height }),
        }
    }
}
