/// Scroll mode for the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollMode {
    /// Auto-scroll to show latest content (bottom of transcript).
    FollowLatest,
    /// User scrolled manually; offset is line index from top.
    Anchored { offset: usize },
}

/// Scroll position plus the line count it was computed against.
#[derive(Debug, Clone)]
pub struct ScrollState {
    pub mode: ScrollMode,
    /// Total transcript lines at the current width.
    pub line_count: usize,
}

impl Default for ScrollState {
    fn default() -> Self {
        Self {
            mode: ScrollMode::FollowLatest,
            line_count: 0,
        }
    }
}

impl ScrollState {
    pub fn is_following(&self) -> bool {
        matches!(self.mode, ScrollMode::FollowLatest)
    }

    /// First visible line for a viewport of `viewport_height` lines.
    pub fn offset(&self, viewport_height: usize) -> usize {
        let max_offset = self.line_count.saturating_sub(viewport_height);
        match self.mode {
            ScrollMode::FollowLatest => max_offset,
            ScrollMode::Anchored { offset } => offset.min(max_offset),
        }
    }

    pub fn scroll_up(&mut self, lines: usize, viewport_height: usize) {
        let offset = self.offset(viewport_height).saturating_sub(lines);
        self.mode = ScrollMode::Anchored { offset };
    }

    /// Returns to follow mode once the bottom is reached.
    pub fn scroll_down(&mut self, lines: usize, viewport_height: usize) {
        if self.is_following() {
            return;
        }

        let max_offset = self.line_count.saturating_sub(viewport_height);
        let offset = (self.offset(viewport_height) + lines).min(max_offset);
        self.mode = if offset >= max_offset {
            ScrollMode::FollowLatest
        } else {
            ScrollMode::Anchored { offset }
        };
    }

    pub fn scroll_to_top(&mut self) {
        self.mode = ScrollMode::Anchored { offset: 0 };
    }

    pub fn scroll_to_bottom(&mut self) {
        self.mode = ScrollMode::FollowLatest;
    }

    pub fn page_up(&mut self, viewport_height: usize) {
        self.scroll_up(viewport_height.max(1), viewport_height);
    }

    pub fn page_down(&mut self, viewport_height: usize) {
        self.scroll_down(viewport_height.max(1), viewport_height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scroll_with(lines: usize) -> ScrollState {
        ScrollState {
            line_count: lines,
            ..ScrollState::default()
        }
    }

    #[test]
    fn test_follow_shows_bottom() {
        assert_eq!(scroll_with(30).offset(10), 20);
        assert_eq!(scroll_with(5).offset(10), 0);
    }

    #[test]
    fn test_scroll_up_then_back_down_follows() {
        let mut scroll = scroll_with(30);
        scroll.scroll_up(5, 10);
        assert_eq!(scroll.mode, ScrollMode::Anchored { offset: 15 });

        scroll.scroll_down(3, 10);
        assert_eq!(scroll.offset(10), 18);

        scroll.scroll_down(10, 10);
        assert!(scroll.is_following());
    }

    #[test]
    fn test_page_up_clamps_at_top() {
        let mut scroll = scroll_with(15);
        scroll.page_up(10);
        scroll.page_up(10);
        assert_eq!(scroll.offset(10), 0);
    }

    #[test]
    fn test_anchored_offset_clamped_after_shrink() {
        let mut scroll = scroll_with(50);
        scroll.mode = ScrollMode::Anchored { offset: 40 };
        scroll.line_count = 20;
        assert_eq!(scroll.offset(10), 10);
    }
}
