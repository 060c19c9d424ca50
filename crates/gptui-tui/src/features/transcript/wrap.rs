use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Wraps multi-paragraph text, keeping blank lines between paragraphs.
pub fn wrap_paragraphs(text: &str, width: usize) -> Vec<String> {
    text.split('\n')
        .flat_map(|paragraph| {
            if paragraph.trim().is_empty() {
                vec![String::new()]
            } else {
                wrap_text(&expand_tabs(paragraph), width)
            }
        })
        .collect()
}

/// Word-wraps a single paragraph to `width` display columns.
///
/// Words longer than the width are broken at character boundaries.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    let mut current_line = String::new();
    let mut current_width: usize = 0;

    for word in text.split_whitespace() {
        let word_width = word.width();

        if !current_line.is_empty() && current_width + 1 + word_width <= width {
            current_line.push(' ');
            current_line.push_str(word);
            current_width += 1 + word_width;
            continue;
        }

        if !current_line.is_empty() {
            lines.push(std::mem::take(&mut current_line));
        }

        if word_width > width {
            let mut broken = wrap_chars(word, width);
            if let Some(last) = broken.pop() {
                lines.extend(broken);
                current_width = last.width();
                current_line = last;
            }
        } else {
            current_line = word.to_string();
            current_width = word_width;
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}

/// Breaks a string into parts that fit within the given display width.
pub fn wrap_chars(text: &str, width: usize) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut current_width: usize = 0;

    for ch in text.chars() {
        let ch_width = ch.width().unwrap_or(0);

        if ch_width == 0 {
            current.push(ch);
            continue;
        }

        if current_width + ch_width > width && !current.is_empty() {
            parts.push(std::mem::take(&mut current));
            current_width = 0;
        }

        current.push(ch);
        current_width += ch_width;
    }

    if !current.is_empty() {
        parts.push(current);
    }

    if parts.is_empty() {
        parts.push(String::new());
    }

    parts
}

// unicode_width reports no width for tabs
fn expand_tabs(text: &str) -> String {
    text.replace('\t', "    ")
}
